/// Expression evaluation against scopes, including writes and tracking
use crate::*;

fn scope(json: &str) -> Obj {
    let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
    match Value::from_json(&parsed) {
        Value::Object(obj) => obj,
        other => panic!("expected an object, got {other:?}"),
    }
}

fn num(value: Value) -> f64 {
    value.as_number().expect("expected a number")
}

fn text(value: Value) -> String {
    value.to_display()
}

#[test]
fn test_arithmetic_and_precedence() {
    let s = scope(r#"{"a": 2, "b": 3}"#);
    assert_eq!(num(evaluate("a + b * 2", &s, None)), 8.0);
    assert_eq!(num(evaluate("(a + b) * 2", &s, None)), 10.0);
    assert_eq!(num(evaluate("b % a", &s, None)), 1.0);
    assert_eq!(num(evaluate("-a + +'4'", &s, None)), 2.0);
}

#[test]
fn test_string_concatenation() {
    let s = scope(r#"{"name": "Ada", "n": 1}"#);
    assert_eq!(text(evaluate("'Hi ' + name", &s, None)), "Hi Ada");
    assert_eq!(text(evaluate("n + '1'", &s, None)), "11");
    assert_eq!(text(evaluate("`${name} has ${n + 1}`", &s, None)), "Ada has 2");
}

#[test]
fn test_logical_operators_return_operands() {
    let s = scope(r#"{"empty": "", "zero": 0, "missing": null}"#);
    assert_eq!(text(evaluate("empty || 'fallback'", &s, None)), "fallback");
    assert_eq!(num(evaluate("zero ?? 5", &s, None)), 0.0);
    assert_eq!(num(evaluate("missing ?? 5", &s, None)), 5.0);
    assert!(matches!(evaluate("missing && missing.x", &s, None), Value::Null));
}

#[test]
fn test_equality() {
    let s = scope(r#"{"one": 1}"#);
    assert!(evaluate("one == '1'", &s, None).truthy());
    assert!(!evaluate("one === '1'", &s, None).truthy());
    assert!(evaluate("null == undefined", &s, None).truthy());
    assert!(!evaluate("null === undefined", &s, None).truthy());
}

#[test]
fn test_conditional_expression() {
    let s = scope(r#"{"count": 3}"#);
    assert_eq!(text(evaluate("count > 2 ? 'many' : 'few'", &s, None)), "many");
}

#[test]
fn test_member_access() {
    let s = scope(r#"{"user": {"name": "Ada", "tags": ["a", "b"]}}"#);
    assert_eq!(text(evaluate("user.name", &s, None)), "Ada");
    assert_eq!(text(evaluate("user['name']", &s, None)), "Ada");
    assert_eq!(text(evaluate("user.tags[1]", &s, None)), "b");
    assert_eq!(num(evaluate("user.tags.length", &s, None)), 2.0);
    assert!(matches!(evaluate("user.nope?.deeper", &s, None), Value::Undefined));
}

#[test]
fn test_reading_through_nullish_is_undefined() {
    let s = scope(r#"{"user": null}"#);
    assert!(matches!(evaluate("user.name", &s, None), Value::Undefined));
    assert!(try_evaluate("user.name", &s, None).is_err());
}

#[test]
fn test_unknown_identifier_is_a_reference_error() {
    let s = Obj::new();
    assert!(matches!(
        try_evaluate("nope + 1", &s, None),
        Err(EvalError::Reference { .. })
    ));
    assert!(matches!(evaluate("nope", &s, None), Value::Undefined));
    assert_eq!(text(evaluate("typeof nope", &s, None)), "undefined");
}

#[test]
fn test_host_globals_do_not_leak() {
    let s = Obj::new();
    assert!(matches!(evaluate("window", &s, None), Value::Undefined));
    assert!(matches!(evaluate("document", &s, None), Value::Undefined));
    assert!(matches!(evaluate("Math.random", &s, None), Value::Undefined));
    assert_eq!(num(evaluate("Math.max(1, 7, 3)", &s, None)), 7.0);
}

#[test]
fn test_parse_errors_resolve_to_undefined() {
    let s = Obj::new();
    assert!(matches!(evaluate("a +", &s, None), Value::Undefined));
    assert!(matches!(try_evaluate("a +", &s, None), Err(EvalError::Parse(_))));
}

#[test]
fn test_assignment_expressions() {
    let s = scope(r#"{"count": 1, "form": {"name": ""}}"#);
    assert_eq!(num(evaluate("count += 4", &s, None)), 5.0);
    assert_eq!(num(evaluate("count++", &s, None)), 5.0);
    assert_eq!(num(evaluate("++count", &s, None)), 7.0);
    evaluate("form.name = 'Ada'", &s, None);
    assert_eq!(text(evaluate("form.name", &s, None)), "Ada");
}

#[test]
fn test_sequence_returns_last_value() {
    let s = scope(r#"{"a": 0}"#);
    assert_eq!(num(evaluate("a = 1; a = a + 1; a * 10", &s, None)), 20.0);
    assert_eq!(num(s.get("a").unwrap()), 2.0);
}

#[test]
fn test_assignment_targets_owning_scope() {
    let parent = scope(r#"{"count": 1}"#);
    let child = Obj::with_proto(&parent);
    child.insert("item", Value::from("x"));

    evaluate("count = count + 1", &child, None);
    assert_eq!(num(parent.get("count").unwrap()), 2.0);
    assert!(!child.has_own("count"));

    evaluate("fresh = 1", &child, None);
    assert!(child.has_own("fresh"));
    assert!(!parent.has_own("fresh"));
}

#[test]
fn test_arrow_functions_and_array_methods() {
    let s = scope(r#"{"todos": [{"t": "a", "done": true}, {"t": "b", "done": false}]}"#);
    assert_eq!(num(evaluate("todos.filter(x => !x.done).length", &s, None)), 1.0);
    assert_eq!(text(evaluate("todos.map(x => x.t).join('-')", &s, None)), "a-b");
    assert!(evaluate("todos.some(x => x.done)", &s, None).truthy());
    assert!(!evaluate("todos.every(x => x.done)", &s, None).truthy());
    assert_eq!(num(evaluate("todos.findIndex(x => x.t === 'b')", &s, None)), 1.0);
    assert_eq!(
        num(evaluate("((a, b) => a * b)(6, 7)", &s, None)),
        42.0
    );
}

#[test]
fn test_string_methods() {
    let s = scope(r#"{"name": "  Ada Lovelace "}"#);
    assert_eq!(text(evaluate("name.trim().toUpperCase()", &s, None)), "ADA LOVELACE");
    assert!(evaluate("name.includes('Love')", &s, None).truthy());
    assert_eq!(text(evaluate("'7'.padStart(3, '0')", &s, None)), "007");
    assert_eq!(text(evaluate("(3.14159).toFixed(2)", &s, None)), "3.14");
}

#[test]
fn test_mutating_methods_notify_observers() {
    let scheduler = Scheduler::new();
    let s = scope(r#"{"items": [1, 2]}"#);
    let root = RootId(3);
    make_reactive(&Value::Object(s.clone()), root, &scheduler, true);

    evaluate("items.push(3)", &s, None);
    assert!(scheduler.is_pending(root));
    assert_eq!(num(evaluate("items.length", &s, None)), 3.0);
}

#[test]
fn test_methods_on_root_scope_bind_this() {
    let scheduler = Scheduler::new();
    let s = Obj::instance();
    s.insert("count", Value::from(0));
    s.insert(
        "bump",
        Value::Function(Func::native("bump", |this, _| {
            let target = this.as_obj().cloned().unwrap_or_default();
            let next = target.get("count").map_or(0.0, |v| v.to_number()) + 1.0;
            target.set("count", Value::Number(next));
            Ok(Value::Undefined)
        })),
    );
    make_reactive(&Value::Object(s.clone()), RootId(1), &scheduler, true);

    let item = Obj::with_proto(&s);
    evaluate("bump(); bump()", &item, None);
    assert_eq!(num(s.get("count").unwrap()), 2.0);
}

#[test]
fn test_event_binding() {
    let s = Obj::new();
    assert!(matches!(evaluate("$event", &s, None), Value::Undefined));

    let event = Obj::from_entries([("type", Value::from("click"))]);
    let value = Value::Object(event);
    assert_eq!(text(evaluate("$event.type", &s, Some(&value))), "click");
}

#[test]
fn test_json_globals() {
    let s = scope(r#"{"data": {"b": 1, "a": [true, null]}}"#);
    assert_eq!(
        text(evaluate("JSON.stringify(data)", &s, None)),
        r#"{"b":1,"a":[true,null]}"#
    );
    assert_eq!(num(evaluate("JSON.parse('{\"x\": 4}').x", &s, None)), 4.0);
}

#[test]
fn test_assign_paths() {
    let s = scope(r#"{"form": {"user": {"name": ""}}, "rows": [1, 2]}"#);
    assign("form.user.name", &s, Value::from("Ada"));
    assert_eq!(text(evaluate("form.user.name", &s, None)), "Ada");

    assign("rows.1", &s, Value::from(9));
    assert_eq!(num(evaluate("rows[1]", &s, None)), 9.0);

    assert!(try_assign("form.missing.name", &s, Value::Null).is_err());
    assert!(matches!(assign("", &s, Value::Null), Value::Undefined));
    assert!(try_assign("rows.x", &s, Value::Null).is_err());
}

#[test]
fn test_compilation_is_cached_by_source() {
    let s = scope(r#"{"x": 1}"#);
    let source = "x + 40.5 + 0.5";
    let before = sprout_expr::cache_size();
    let _ = evaluate(source, &s, None);
    let after_first = sprout_expr::cache_size();
    let _ = evaluate(source, &s, None);
    assert_eq!(after_first, before + 1);
    assert_eq!(sprout_expr::cache_size(), after_first);
}

#[test]
fn test_oversized_array_writes_are_rejected() {
    let s = scope(r#"{"items": [1, 2]}"#);
    assert!(matches!(evaluate("items[1e15] = 1", &s, None), Value::Undefined));
    let err = try_evaluate("items.length = 1e15", &s, None).unwrap_err();
    assert!(err.to_string().contains("Invalid array length"));
    assert!(try_assign("items.1000000000000", &s, Value::from(1)).is_err());
    assert_eq!(num(evaluate("items.length", &s, None)), 2.0);

    assert_eq!(num(evaluate("items[3] = 7; items.length", &s, None)), 4.0);
    assert!(matches!(evaluate("items[2]", &s, None), Value::Undefined));
}

#[test]
fn test_runaway_recursion_is_an_error() {
    let s = scope("{}");
    let err = try_evaluate("f = () => f(); f()", &s, None).unwrap_err();
    assert!(err.to_string().contains("Maximum call stack size exceeded"));
    assert!(matches!(evaluate("g = () => g(); g()", &s, None), Value::Undefined));

    // Bounded recursion still works once the failed frames are released
    assert_eq!(num(evaluate("count = n => n > 0 ? 1 + count(n - 1) : 0; count(20)", &s, None)), 20.0);

    let nested = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
    assert!(matches!(try_evaluate(&nested, &s, None), Err(EvalError::Parse(_))));
}

#[test]
fn test_oversized_strings_are_rejected() {
    let s = scope("{}");
    assert!(matches!(evaluate("'ab'.repeat(1e15).length", &s, None), Value::Undefined));
    assert!(try_evaluate("'x'.padStart(1e15)", &s, None).is_err());
    assert!(try_evaluate("'x'.padEnd(Infinity, '-')", &s, None).is_err());

    assert_eq!(text(evaluate("'ab'.repeat(3)", &s, None)), "ababab");
    assert_eq!(text(evaluate("'7'.padStart(3, '0')", &s, None)), "007");
    assert_eq!(text(evaluate("'x'.padStart(1e15, '')", &s, None)), "x");
}

#[test]
fn test_self_capturing_closures_are_released() {
    let s = scope(r#"{"open": false, "label": "menu"}"#);
    evaluate("toggle = () => open = !open; keep = Math.max", &s, None);
    evaluate("toggle()", &s, None);
    assert!(evaluate("open", &s, None).truthy());

    assert_eq!(s.release_closures(), 1);
    assert!(s.get("toggle").is_none());
    assert!(s.get("keep").is_some());
    assert_eq!(text(evaluate("label", &s, None)), "menu");
}
