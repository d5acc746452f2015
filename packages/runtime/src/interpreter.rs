//! Tree-walking interpreter for compiled expressions.
//!
//! Identifiers resolve against the scope chain first, then against the
//! explicit globals table in [`crate::builtins`]. Nothing else is reachable.

use crate::builtins;
use crate::error::{EvalError, EvalResult};
use crate::value::{Callable, Func, Obj, Value, MAX_ARRAY_LENGTH};
use sprout_expr::ast::{BinaryOp, Expression, LogicalOp, TemplatePart, UnaryOp, UpdateOp};
use sprout_expr::{compile, Span};
use std::cell::Cell;
use tracing::warn;

/// Evaluation environment: the scope chain, the optional `$event` binding,
/// and the value of `this`.
#[derive(Clone)]
pub struct Env {
    pub scope: Obj,
    pub event: Option<Value>,
    pub this: Value,
}

impl Env {
    pub fn new(scope: &Obj) -> Self {
        Self {
            scope: scope.clone(),
            event: None,
            this: Value::Object(scope.clone()),
        }
    }

    pub fn with_event(mut self, event: Option<Value>) -> Self {
        self.event = event;
        self
    }
}

/// Evaluate `expression` against `scope`. Failures are logged and
/// resolve to `undefined`.
pub fn evaluate(expression: &str, scope: &Obj, event: Option<&Value>) -> Value {
    match try_evaluate(expression, scope, event) {
        Ok(value) => value,
        Err(error) => {
            warn!(expression, %error, "Expression evaluation failed");
            Value::Undefined
        }
    }
}

/// Like [`evaluate`] but surfaces the error
pub fn try_evaluate(expression: &str, scope: &Obj, event: Option<&Value>) -> EvalResult<Value> {
    let program = compile(expression)?;
    let env = Env::new(scope).with_event(event.cloned());
    eval(&program.body, &env)
}

/// Assign `value` at dotted `path`. Resolution starts at the first scope in
/// the chain that owns the first segment. Failures are logged, leave state
/// untouched and return `undefined`.
pub fn assign(path: &str, scope: &Obj, value: Value) -> Value {
    match try_assign(path, scope, value) {
        Ok(value) => value,
        Err(error) => {
            warn!(path, %error, "Assignment failed");
            Value::Undefined
        }
    }
}

pub fn try_assign(path: &str, scope: &Obj, value: Value) -> EvalResult<Value> {
    let invalid = |reason: &str| EvalError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = path.trim().split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty path segment"));
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(invalid("empty path"));
    };

    let base = scope
        .owner_of(segments[0])
        .unwrap_or_else(|| scope.clone());
    let mut target = Value::Object(base);
    for segment in parents {
        let next = builtins::property(&target, segment).unwrap_or_default();
        if next.is_nullish() {
            return Err(invalid(&format!("'{segment}' is {}", next.to_display())));
        }
        target = next;
    }

    match &target {
        Value::Object(obj) => obj.set(*last, value.clone()),
        Value::Array(arr) => {
            let index = last
                .parse::<usize>()
                .map_err(|_| invalid("array segments must be indices"))?;
            arr.set(index, value.clone())?;
        }
        other => return Err(invalid(&format!("cannot set '{last}' on {}", other.type_of()))),
    }
    Ok(value)
}

impl Func {
    /// Invoke with `this` and `args`
    pub fn call(&self, this: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match &*self.0 {
            Callable::Native { call, .. } => call(this, args),
            Callable::Bound { target, this } => target.call(this, args),
            Callable::Closure { params, body, env } => {
                let frame = Obj::with_proto(&env.scope);
                let mut args = args.into_iter();
                for param in params {
                    frame.insert(param.clone(), args.next().unwrap_or_default());
                }
                let local = Env {
                    scope: frame,
                    event: env.event.clone(),
                    this: env.this.clone(),
                };
                eval(body, &local)
            }
        }
    }
}

/// Assignable location
enum Reference {
    Binding { name: String, owner: Option<Obj> },
    Property { base: Value, key: String },
}

impl Reference {
    fn get(&self, env: &Env, span: Span) -> EvalResult<Value> {
        match self {
            Reference::Binding { name, owner } => match owner {
                Some(owner) => Ok(owner.get_own(name).unwrap_or_default()),
                None => lookup_identifier(name, span, env),
            },
            Reference::Property { base, key } => get_property(base, key, span),
        }
    }

    fn put(&self, value: Value, env: &Env, span: Span) -> EvalResult<()> {
        match self {
            Reference::Binding { name, owner } => {
                owner.as_ref().unwrap_or(&env.scope).set(name.clone(), value);
                Ok(())
            }
            Reference::Property { base, key } => set_property(base, key, value, span),
        }
    }
}

fn resolve_reference(target: &Expression, env: &Env) -> EvalResult<Reference> {
    match target {
        Expression::Identifier { name, span } => {
            if name == "$event" {
                return Err(EvalError::type_error("Cannot assign to $event", *span));
            }
            Ok(Reference::Binding {
                name: name.clone(),
                owner: env.scope.owner_of(name),
            })
        }
        Expression::Member {
            object, property, ..
        } => Ok(Reference::Property {
            base: eval(object, env)?,
            key: property.clone(),
        }),
        Expression::Index { object, index, .. } => {
            let base = eval(object, env)?;
            let key = property_key(&eval(index, env)?);
            Ok(Reference::Property { base, key })
        }
        other => Err(EvalError::type_error(
            "Invalid left-hand side in assignment",
            other.span(),
        )),
    }
}

fn property_key(value: &Value) -> String {
    value.to_display()
}

fn lookup_identifier(name: &str, span: Span, env: &Env) -> EvalResult<Value> {
    if name == "$event" {
        return Ok(env.event.clone().unwrap_or_default());
    }
    if let Some((value, owner)) = env.scope.lookup(name) {
        return Ok(bind_if_method(value, &owner));
    }
    builtins::global(name).ok_or_else(|| EvalError::Reference {
        name: name.to_string(),
        span,
    })
}

/// Functions read off a root scope run with `this` bound to it
fn bind_if_method(value: Value, owner: &Obj) -> Value {
    match &value {
        Value::Function(func) if owner.tracking().binds_methods() => {
            Value::Function(func.bind(Value::Object(owner.clone())))
        }
        _ => value,
    }
}

pub(crate) fn get_property(base: &Value, key: &str, span: Span) -> EvalResult<Value> {
    if base.is_nullish() {
        return Err(EvalError::type_error(
            format!(
                "Cannot read properties of {} (reading '{key}')",
                base.to_display()
            ),
            span,
        ));
    }
    if let Value::Object(obj) = base {
        if let Some((value, owner)) = obj.lookup(key) {
            return Ok(bind_if_method(value, &owner));
        }
        return Ok(Value::Undefined);
    }
    Ok(builtins::property(base, key).unwrap_or_default())
}

fn set_property(base: &Value, key: &str, value: Value, span: Span) -> EvalResult<()> {
    match base {
        Value::Object(obj) => obj.set(key, value),
        Value::Array(arr) => {
            if key == "length" {
                let len = value.to_number();
                if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                    return Err(EvalError::type_error("Invalid array length", span));
                }
                if len > MAX_ARRAY_LENGTH as f64 {
                    return Err(EvalError::native("RangeError", "Invalid array length"));
                }
                arr.set_len(len as usize)?;
            } else if let Ok(index) = key.parse::<usize>() {
                arr.set(index, value)?;
            }
        }
        Value::Undefined | Value::Null => {
            return Err(EvalError::type_error(
                format!(
                    "Cannot set properties of {} (setting '{key}')",
                    base.to_display()
                ),
                span,
            ))
        }
        // Writes to primitives are dropped
        _ => {}
    }
    Ok(())
}

/// Printable name of a callee for error messages
fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::This { .. } => "this".to_string(),
        Expression::Member {
            object, property, ..
        } => format!("{}.{property}", describe(object)),
        Expression::Index { object, .. } => format!("{}[...]", describe(object)),
        Expression::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

/// Deepest nesting of evaluation frames, closure calls included
pub const MAX_EVAL_DEPTH: usize = 160;

thread_local! {
    static EVAL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One evaluation frame; released on drop
struct Frame;

impl Frame {
    fn enter() -> EvalResult<Self> {
        EVAL_DEPTH.with(|depth| {
            if depth.get() >= MAX_EVAL_DEPTH {
                return Err(EvalError::native("RangeError", "Maximum call stack size exceeded"));
            }
            depth.set(depth.get() + 1);
            Ok(Frame)
        })
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        EVAL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Evaluate an expression node
pub fn eval(expr: &Expression, env: &Env) -> EvalResult<Value> {
    let _frame = Frame::enter()?;
    eval_node(expr, env)
}

fn eval_node(expr: &Expression, env: &Env) -> EvalResult<Value> {
    match expr {
        Expression::Number { value, .. } => Ok(Value::Number(*value)),
        Expression::String { value, .. } => Ok(Value::string(value)),
        Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
        Expression::Null { .. } => Ok(Value::Null),
        Expression::Undefined { .. } => Ok(Value::Undefined),
        Expression::This { .. } => Ok(env.this.clone()),

        Expression::Template { parts, .. } => {
            let mut result = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal(s) => result.push_str(s),
                    TemplatePart::Expression(expr) => {
                        result.push_str(&eval(expr, env)?.to_display())
                    }
                }
            }
            Ok(Value::from(result))
        }

        Expression::Identifier { name, span } => lookup_identifier(name, *span, env),

        Expression::Array { elements, .. } => {
            let items = elements
                .iter()
                .map(|e| eval(e, env))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::array(items))
        }

        Expression::Object { properties, .. } => {
            let obj = Obj::new();
            for (key, value) in properties {
                obj.insert(key.clone(), eval(value, env)?);
            }
            Ok(Value::Object(obj))
        }

        Expression::Member {
            object,
            property,
            optional,
            span,
        } => {
            let base = eval(object, env)?;
            if *optional && base.is_nullish() {
                return Ok(Value::Undefined);
            }
            get_property(&base, property, *span)
        }

        Expression::Index {
            object,
            index,
            span,
        } => {
            let base = eval(object, env)?;
            let key = eval(index, env)?;
            get_property(&base, &property_key(&key), *span)
        }

        Expression::Call {
            callee,
            arguments,
            span,
        } => {
            let (function, this) = match callee.as_ref() {
                Expression::Member {
                    object,
                    property,
                    optional,
                    span,
                } => {
                    let base = eval(object, env)?;
                    if *optional && base.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    (get_property(&base, property, *span)?, base)
                }
                Expression::Index {
                    object,
                    index,
                    span,
                } => {
                    let base = eval(object, env)?;
                    let key = eval(index, env)?;
                    (get_property(&base, &property_key(&key), *span)?, base)
                }
                other => (eval(other, env)?, Value::Undefined),
            };

            let args = arguments
                .iter()
                .map(|a| eval(a, env))
                .collect::<EvalResult<Vec<_>>>()?;

            match function {
                Value::Function(func) => func.call(&this, args),
                _ => Err(EvalError::type_error(
                    format!("{} is not a function", describe(callee)),
                    *span,
                )),
            }
        }

        Expression::Unary {
            operator,
            operand,
            span,
        } => match operator {
            UnaryOp::Typeof => {
                // typeof tolerates undeclared identifiers
                if let Expression::Identifier { name, span } = operand.as_ref() {
                    return match lookup_identifier(name, *span, env) {
                        Ok(value) => Ok(Value::string(value.type_of())),
                        Err(EvalError::Reference { .. }) => Ok(Value::string("undefined")),
                        Err(other) => Err(other),
                    };
                }
                Ok(Value::string(eval(operand, env)?.type_of()))
            }
            UnaryOp::Delete => match resolve_reference(operand, env)? {
                Reference::Property { base, key } => match &base {
                    Value::Object(obj) => {
                        obj.delete(&key);
                        Ok(Value::Bool(true))
                    }
                    Value::Array(arr) => {
                        if let Ok(index) = key.parse::<usize>() {
                            if index < arr.len() {
                                arr.set(index, Value::Undefined)?;
                            }
                        }
                        Ok(Value::Bool(true))
                    }
                    _ if base.is_nullish() => Err(EvalError::type_error(
                        format!("Cannot delete property '{key}' of {}", base.to_display()),
                        *span,
                    )),
                    _ => Ok(Value::Bool(true)),
                },
                Reference::Binding { .. } => Ok(Value::Bool(false)),
            },
            UnaryOp::Not => Ok(Value::Bool(!eval(operand, env)?.truthy())),
            UnaryOp::Negate => Ok(Value::Number(-eval(operand, env)?.to_number())),
            UnaryOp::Plus => Ok(Value::Number(eval(operand, env)?.to_number())),
        },

        Expression::Update {
            operator,
            prefix,
            target,
            span,
        } => {
            let reference = resolve_reference(target, env)?;
            let old = reference.get(env, *span)?.to_number();
            let new = match operator {
                UpdateOp::Increment => old + 1.0,
                UpdateOp::Decrement => old - 1.0,
            };
            reference.put(Value::Number(new), env, *span)?;
            Ok(Value::Number(if *prefix { new } else { old }))
        }

        Expression::Binary {
            left,
            operator,
            right,
            ..
        } => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            Ok(binary(*operator, &left, &right))
        }

        Expression::Logical {
            left,
            operator,
            right,
            ..
        } => {
            let left = eval(left, env)?;
            match operator {
                LogicalOp::And if !left.truthy() => Ok(left),
                LogicalOp::Or if left.truthy() => Ok(left),
                LogicalOp::Nullish if !left.is_nullish() => Ok(left),
                _ => eval(right, env),
            }
        }

        Expression::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            if eval(test, env)?.truthy() {
                eval(consequent, env)
            } else {
                eval(alternate, env)
            }
        }

        Expression::Assign {
            target,
            operator,
            value,
            span,
        } => {
            let reference = resolve_reference(target, env)?;
            let result = match operator.binary() {
                None => eval(value, env)?,
                Some(op) => {
                    let current = reference.get(env, *span)?;
                    binary(op, &current, &eval(value, env)?)
                }
            };
            reference.put(result.clone(), env, *span)?;
            Ok(result)
        }

        Expression::Arrow { params, body, .. } => Ok(Value::Function(Func::closure(
            params.clone(),
            body.clone(),
            env.clone(),
        ))),

        Expression::Sequence { expressions, .. } => {
            let mut last = Value::Undefined;
            for expr in expressions {
                last = eval(expr, env)?;
            }
            Ok(last)
        }
    }
}

/// Values that `+` treats as strings
fn concatenates(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_)
    )
}

/// Apply a binary operator
pub fn binary(operator: BinaryOp, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOp::Add => {
            if concatenates(left) || concatenates(right) {
                Value::from(format!("{}{}", left.to_display(), right.to_display()))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Equals => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEquals => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEquals => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEquals => Value::Bool(!left.strict_eq(right)),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => Value::Bool(compare(operator, left, right)),
    }
}

fn compare(operator: BinaryOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match operator {
        BinaryOp::LessThan => ordering == Ordering::Less,
        BinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOp::GreaterThan => ordering == Ordering::Greater,
        BinaryOp::GreaterThanOrEqual => ordering != Ordering::Less,
        _ => false,
    }
}
