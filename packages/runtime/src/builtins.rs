//! Globals and built-in methods reachable from expressions.
//!
//! The globals table is explicit: `Math`, `JSON`, `String`, `Number`,
//! `Boolean`, `parseInt`, `parseFloat`, `isNaN`, `Array`, `Object`,
//! `console`, `NaN` and `Infinity`. There is no fallback to anything else.

use crate::error::{EvalError, EvalResult};
use crate::value::{format_number, parse_number, Arr, Func, Obj, Value};
use tracing::{error, info, warn};

thread_local! {
    static GLOBALS: Obj = install_globals();
}

/// Global binding by name
pub fn global(name: &str) -> Option<Value> {
    GLOBALS.with(|globals| globals.get_own(name))
}

pub fn global_names() -> Vec<String> {
    GLOBALS.with(|globals| globals.keys())
}

/// Longest string `repeat` and `padStart`/`padEnd` may build, in bytes
pub const MAX_STRING_LENGTH: usize = 1 << 28;

fn check_string_length(function: &str, len: f64) -> EvalResult<()> {
    if len > MAX_STRING_LENGTH as f64 {
        return Err(EvalError::native(function, "Invalid string length"));
    }
    Ok(())
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn native(name: &str, f: impl Fn(&Value, Vec<Value>) -> EvalResult<Value> + 'static) -> Value {
    Value::Function(Func::native(name, f))
}

fn namespace(entries: Vec<(&str, Value)>) -> Value {
    let obj = Obj::instance();
    for (key, value) in entries {
        obj.insert(key, value);
    }
    Value::Object(obj)
}

fn install_globals() -> Obj {
    let globals = Obj::instance();

    globals.insert("NaN", Value::Number(f64::NAN));
    globals.insert("Infinity", Value::Number(f64::INFINITY));

    globals.insert(
        "String",
        native("String", |_, args| {
            Ok(Value::from(args.first().map(Value::to_display).unwrap_or_default()))
        }),
    );
    globals.insert(
        "Number",
        native("Number", |_, args| {
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
        }),
    );
    globals.insert(
        "Boolean",
        native("Boolean", |_, args| Ok(Value::Bool(arg(&args, 0).truthy()))),
    );
    globals.insert(
        "parseInt",
        native("parseInt", |_, args| {
            let radix = args.get(1).map(Value::to_number).filter(|r| *r != 0.0 && !r.is_nan());
            Ok(Value::Number(parse_int(&arg(&args, 0).to_display(), radix)))
        }),
    );
    globals.insert(
        "parseFloat",
        native("parseFloat", |_, args| {
            Ok(Value::Number(parse_float(&arg(&args, 0).to_display())))
        }),
    );
    globals.insert(
        "isNaN",
        native("isNaN", |_, args| Ok(Value::Bool(arg(&args, 0).to_number().is_nan()))),
    );

    globals.insert("Math", math());
    globals.insert("JSON", json());
    globals.insert(
        "Array",
        namespace(vec![(
            "isArray",
            native("Array.isArray", |_, args| {
                Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))
            }),
        )]),
    );
    globals.insert("Object", object());
    globals.insert("console", console());

    globals
}

fn math() -> Value {
    fn unary(name: &'static str, f: fn(f64) -> f64) -> (&'static str, Value) {
        let full = format!("Math.{name}");
        (
            name,
            native(&full, move |_, args| Ok(Value::Number(f(arg(&args, 0).to_number())))),
        )
    }

    namespace(vec![
        ("PI", Value::Number(std::f64::consts::PI)),
        ("E", Value::Number(std::f64::consts::E)),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("abs", f64::abs),
        unary("sqrt", f64::sqrt),
        unary("trunc", f64::trunc),
        unary("round", |n| (n + 0.5).floor()),
        unary("sign", |n| if n == 0.0 || n.is_nan() { n } else { n.signum() }),
        (
            "pow",
            native("Math.pow", |_, args| {
                Ok(Value::Number(
                    arg(&args, 0).to_number().powf(arg(&args, 1).to_number()),
                ))
            }),
        ),
        (
            "min",
            native("Math.min", |_, args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) },
                )))
            }),
        ),
        (
            "max",
            native("Math.max", |_, args| {
                Ok(Value::Number(args.iter().map(Value::to_number).fold(
                    f64::NEG_INFINITY,
                    |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) },
                )))
            }),
        ),
    ])
}

fn json() -> Value {
    namespace(vec![
        (
            "stringify",
            native("JSON.stringify", |_, args| {
                let Some(json) = arg(&args, 0).to_json()? else {
                    return Ok(Value::Undefined);
                };
                let pretty = args.get(2).map(Value::to_number).is_some_and(|n| n > 0.0);
                let text = if pretty {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                }
                .map_err(|e| EvalError::native("JSON.stringify", e.to_string()))?;
                Ok(Value::from(text))
            }),
        ),
        (
            "parse",
            native("JSON.parse", |_, args| {
                let text = arg(&args, 0).to_display();
                let json: serde_json::Value = serde_json::from_str(&text)
                    .map_err(|e| EvalError::native("JSON.parse", e.to_string()))?;
                Ok(Value::from_json(&json))
            }),
        ),
    ])
}

fn object() -> Value {
    fn expect_obj(function: &str, value: &Value) -> EvalResult<Obj> {
        value
            .as_obj()
            .cloned()
            .ok_or_else(|| EvalError::native(function, "argument is not an object"))
    }

    namespace(vec![
        (
            "keys",
            native("Object.keys", |_, args| match arg(&args, 0) {
                Value::Array(arr) => Ok(Value::array(
                    (0..arr.len()).map(|i| Value::from(i.to_string())).collect(),
                )),
                other => {
                    let obj = expect_obj("Object.keys", &other)?;
                    Ok(Value::array(obj.keys().into_iter().map(Value::from).collect()))
                }
            }),
        ),
        (
            "values",
            native("Object.values", |_, args| {
                let obj = expect_obj("Object.values", &arg(&args, 0))?;
                Ok(Value::array(obj.entries().into_iter().map(|(_, v)| v).collect()))
            }),
        ),
        (
            "entries",
            native("Object.entries", |_, args| {
                let obj = expect_obj("Object.entries", &arg(&args, 0))?;
                Ok(Value::array(
                    obj.entries()
                        .into_iter()
                        .map(|(k, v)| Value::array(vec![Value::from(k), v]))
                        .collect(),
                ))
            }),
        ),
        (
            "assign",
            native("Object.assign", |_, args| {
                let target = expect_obj("Object.assign", &arg(&args, 0))?;
                for source in args.iter().skip(1) {
                    if let Value::Object(source) = source {
                        for (key, value) in source.entries() {
                            target.set(key, value);
                        }
                    }
                }
                Ok(Value::Object(target))
            }),
        ),
    ])
}

fn console() -> Value {
    fn message(args: &[Value]) -> String {
        args.iter()
            .map(Value::to_display)
            .collect::<Vec<_>>()
            .join(" ")
    }

    namespace(vec![
        (
            "log",
            native("console.log", |_, args| {
                info!(target: "sprout::console", "{}", message(&args));
                Ok(Value::Undefined)
            }),
        ),
        (
            "info",
            native("console.info", |_, args| {
                info!(target: "sprout::console", "{}", message(&args));
                Ok(Value::Undefined)
            }),
        ),
        (
            "warn",
            native("console.warn", |_, args| {
                warn!(target: "sprout::console", "{}", message(&args));
                Ok(Value::Undefined)
            }),
        ),
        (
            "error",
            native("console.error", |_, args| {
                error!(target: "sprout::console", "{}", message(&args));
                Ok(Value::Undefined)
            }),
        ),
    ])
}

// ---------------------------------------------------------------------------
// Properties of non-object values
// ---------------------------------------------------------------------------

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "slice",
    "substring",
    "split",
    "replace",
    "replaceAll",
    "padStart",
    "padEnd",
    "repeat",
    "charAt",
    "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "slice", "concat", "map", "filter", "find",
    "findIndex", "some", "every", "includes", "indexOf", "join", "reverse", "forEach",
];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Member lookup on any value. Objects go through their proto chain;
/// arrays, strings and numbers expose `length`, indices and built-in
/// methods as functions bound to the receiver.
pub fn property(base: &Value, key: &str) -> Option<Value> {
    match base {
        Value::Object(obj) => obj.get(key),
        Value::Array(arr) => {
            if key == "length" {
                return Some(Value::Number(arr.len() as f64));
            }
            if let Ok(index) = key.parse::<usize>() {
                return arr.get(index);
            }
            ARRAY_METHODS
                .contains(&key)
                .then(|| bound_method(base, key))
        }
        Value::String(s) => {
            if key == "length" {
                return Some(Value::Number(s.chars().count() as f64));
            }
            if let Ok(index) = key.parse::<usize>() {
                return s.chars().nth(index).map(|c| Value::from(c.to_string()));
            }
            STRING_METHODS
                .contains(&key)
                .then(|| bound_method(base, key))
        }
        Value::Number(_) => NUMBER_METHODS
            .contains(&key)
            .then(|| bound_method(base, key)),
        Value::Function(func) => (key == "name").then(|| Value::from(func.name())),
        Value::KeyMatch(key_match) => key_match.apply(key),
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Node(_) => None,
    }
}

fn bound_method(receiver: &Value, name: &str) -> Value {
    let receiver = receiver.clone();
    let method = name.to_string();
    native(name, move |_, args| call_method(&receiver, &method, args))
}

fn call_method(receiver: &Value, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    match receiver {
        Value::String(s) => string_method(s, name, args),
        Value::Array(arr) => array_method(arr, name, args),
        Value::Number(n) => number_method(*n, name, args),
        other => Err(EvalError::native(
            name,
            format!("not a method of {}", other.type_of()),
        )),
    }
}

/// Resolve a possibly negative relative index against `len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_nullish() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn char_index_of(s: &str, needle: &str) -> f64 {
    s.find(needle)
        .map_or(-1.0, |byte| s[..byte].chars().count() as f64)
}

fn pad(s: &str, target: usize, fill: &str, at_start: bool) -> String {
    let len = s.chars().count();
    if target <= len || fill.is_empty() {
        return s.to_string();
    }
    let padding: String = fill.chars().cycle().take(target - len).collect();
    if at_start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }
}

fn string_method(s: &str, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    let text = |i: usize| arg(&args, i).to_display();
    let len = s.chars().count();
    let value = match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        "includes" => Value::Bool(s.contains(text(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(text(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(text(0).as_str())),
        "indexOf" => Value::Number(char_index_of(s, &text(0))),
        "charAt" => Value::from(
            s.chars()
                .nth(relative_index(&arg(&args, 0), len, 0))
                .map(String::from)
                .unwrap_or_default(),
        ),
        "slice" => {
            let start = relative_index(&arg(&args, 0), len, 0);
            let end = relative_index(&arg(&args, 1), len, len);
            Value::from(char_slice(s, start, end))
        }
        "substring" => {
            let clamp = |v: &Value, default: usize| {
                if v.is_nullish() {
                    default
                } else {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(len)
                    }
                }
            };
            let a = clamp(&arg(&args, 0), 0);
            let b = clamp(&arg(&args, 1), len);
            Value::from(char_slice(s, a.min(b), a.max(b)))
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(sep) => {
                    let sep = sep.to_display();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::array(parts)
        }
        "replace" => Value::from(s.replacen(text(0).as_str(), &text(1), 1)),
        "replaceAll" => Value::from(s.replace(text(0).as_str(), &text(1))),
        "padStart" | "padEnd" => {
            let target = arg(&args, 0).to_number();
            let fill = if args.len() > 1 { text(1) } else { " ".to_string() };
            let widest = fill.chars().map(char::len_utf8).max().unwrap_or(1);
            if target > len as f64 && !fill.is_empty() {
                let function = format!("String.{name}");
                check_string_length(&function, s.len() as f64 + (target - len as f64) * widest as f64)?;
            }
            let target = if target.is_nan() || target < 0.0 { 0 } else { target as usize };
            Value::from(pad(s, target, &fill, name == "padStart"))
        }
        "repeat" => {
            let count = arg(&args, 0).to_number();
            if count < 0.0 || count.is_infinite() {
                return Err(EvalError::native("String.repeat", "invalid count"));
            }
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            check_string_length("String.repeat", count * s.len() as f64)?;
            Value::from(s.repeat(count as usize))
        }
        "toString" => Value::from(s),
        other => {
            return Err(EvalError::native(
                other,
                "is not a string method",
            ))
        }
    };
    Ok(value)
}

fn callback(name: &str, args: &[Value]) -> EvalResult<Func> {
    args.first()
        .and_then(Value::as_func)
        .cloned()
        .ok_or_else(|| EvalError::native(format!("Array.{name}"), "callback is not a function"))
}

fn array_method(arr: &Arr, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    let this = Value::Array(arr.clone());
    let invoke = |func: &Func, item: &Value, index: usize| {
        func.call(
            &Value::Undefined,
            vec![item.clone(), Value::Number(index as f64), this.clone()],
        )
    };

    let value = match name {
        "push" => Value::Number(arr.push(args) as f64),
        "pop" => arr.pop().unwrap_or_default(),
        "shift" => arr.shift().unwrap_or_default(),
        "unshift" => Value::Number(arr.unshift(args) as f64),
        "splice" => {
            let len = arr.len();
            let start = relative_index(&arg(&args, 0), len, 0);
            let delete_count = match args.get(1) {
                None => len - start,
                Some(v) => {
                    let n = v.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        n as usize
                    }
                }
            };
            let insert = args.into_iter().skip(2).collect();
            Value::array(arr.splice(start, delete_count, insert))
        }
        "slice" => {
            let items = arr.to_vec();
            let start = relative_index(&arg(&args, 0), items.len(), 0);
            let end = relative_index(&arg(&args, 1), items.len(), items.len());
            Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec())
        }
        "concat" => {
            let mut items = arr.to_vec();
            for value in args {
                match value {
                    Value::Array(other) => items.extend(other.to_vec()),
                    other => items.push(other),
                }
            }
            Value::array(items)
        }
        "map" => {
            let func = callback(name, &args)?;
            let mut out = Vec::with_capacity(arr.len());
            for (i, item) in arr.to_vec().iter().enumerate() {
                out.push(invoke(&func, item, i)?);
            }
            Value::array(out)
        }
        "filter" => {
            let func = callback(name, &args)?;
            let mut out = Vec::new();
            for (i, item) in arr.to_vec().iter().enumerate() {
                if invoke(&func, item, i)?.truthy() {
                    out.push(item.clone());
                }
            }
            Value::array(out)
        }
        "find" | "findIndex" => {
            let func = callback(name, &args)?;
            let mut found = None;
            for (i, item) in arr.to_vec().iter().enumerate() {
                if invoke(&func, item, i)?.truthy() {
                    found = Some((i, item.clone()));
                    break;
                }
            }
            match (name, found) {
                ("find", Some((_, item))) => item,
                ("find", None) => Value::Undefined,
                (_, Some((i, _))) => Value::Number(i as f64),
                (_, None) => Value::Number(-1.0),
            }
        }
        "some" => {
            let func = callback(name, &args)?;
            let mut result = false;
            for (i, item) in arr.to_vec().iter().enumerate() {
                if invoke(&func, item, i)?.truthy() {
                    result = true;
                    break;
                }
            }
            Value::Bool(result)
        }
        "every" => {
            let func = callback(name, &args)?;
            let mut result = true;
            for (i, item) in arr.to_vec().iter().enumerate() {
                if !invoke(&func, item, i)?.truthy() {
                    result = false;
                    break;
                }
            }
            Value::Bool(result)
        }
        "forEach" => {
            let func = callback(name, &args)?;
            for (i, item) in arr.to_vec().iter().enumerate() {
                invoke(&func, item, i)?;
            }
            Value::Undefined
        }
        "includes" => {
            let needle = arg(&args, 0);
            Value::Bool(arr.to_vec().iter().any(|v| v.same_value_zero(&needle)))
        }
        "indexOf" => {
            let needle = arg(&args, 0);
            Value::Number(
                arr.to_vec()
                    .iter()
                    .position(|v| v.strict_eq(&needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_display(),
            };
            Value::from(
                arr.to_vec()
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "reverse" => {
            arr.reverse();
            this.clone()
        }
        other => return Err(EvalError::native(other, "is not an array method")),
    };
    Ok(value)
}

fn number_method(n: f64, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    match name {
        "toFixed" => {
            let digits = arg(&args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits };
            if !(0.0..=100.0).contains(&digits) {
                return Err(EvalError::native("Number.toFixed", "digits out of range"));
            }
            if !n.is_finite() {
                return Ok(Value::from(format_number(n)));
            }
            Ok(Value::from(format!("{:.*}", digits as usize, n)))
        }
        "toString" => Ok(Value::from(format_number(n))),
        other => Err(EvalError::native(other, "is not a number method")),
    }
}

/// `parseInt`: leading integer in `radix` (10, or 16 with a `0x` prefix)
pub fn parse_int(text: &str, radix: Option<f64>) -> f64 {
    let mut s = text.trim_start();
    let negative = s.starts_with('-');
    if negative || s.starts_with('+') {
        s = &s[1..];
    }
    let mut radix = radix.map_or(10, |r| r as u32);
    if radix == 16 || radix == 10 {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = s.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    if negative {
        -value
    } else {
        value
    }
}

/// `parseFloat`: longest numeric prefix
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    for candidate in ["Infinity", "+Infinity", "-Infinity"] {
        if s.starts_with(candidate) {
            return parse_number(candidate);
        }
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}
