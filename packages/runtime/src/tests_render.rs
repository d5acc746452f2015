/// Binding collection and the render pass
use crate::*;
use sprout_dom::{Document, NodeId};

fn mount(html: &str) -> (Runtime, RootId) {
    let mut runtime = Runtime::new(Document::parse(html));
    let roots = runtime.mount_all();
    assert!(!roots.is_empty(), "fixture mounted nothing");
    let root = roots[0];
    (runtime, root)
}

fn by_id(runtime: &Runtime, id: &str) -> NodeId {
    runtime
        .document()
        .element_by_id(id)
        .unwrap_or_else(|| panic!("no element #{id}"))
}

fn set(runtime: &mut Runtime, root: RootId, key: &str, value: Value) {
    runtime.scope(root).unwrap().set(key, value);
    runtime.flush();
}

#[test]
fn test_text_interpolation() {
    let (runtime, _) = mount(r#"<p id="p" s-state='{"name": "Ada", "n": 2}'>Hello {name}, {n * 2}!</p>"#);
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "Hello Ada, 4!");
}

#[test]
fn test_nullish_interpolates_as_empty() {
    let (runtime, _) = mount(r#"<p id="p" s-state='{"a": null}'>[{a}][{missing}]</p>"#);
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "[][]");
}

#[test]
fn test_escaped_braces_render_literally() {
    let (runtime, _) = mount(r#"<p id="p" s-state='{"v": 1}'>{{literal}} {v}</p>"#);
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "{literal} 1");
}

#[test]
fn test_rerender_after_state_change() {
    let (mut runtime, root) = mount(r#"<p id="p" s-state='{"count": 1}'>{count}</p>"#);
    set(&mut runtime, root, "count", Value::from(5));
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "5");
}

#[test]
fn test_generic_attribute_semantics() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"on": true, "label": "x", "n": 3}'>
             <button id="b" disabled="{!on}" title="{label}" data-n="n={n}" aria-busy="{on}">go</button>
           </div>"#,
    );
    let b = by_id(&runtime, "b");
    let doc = runtime.document();
    assert!(!doc.has_attribute(b, "disabled"));
    assert_eq!(doc.attribute(b, "title"), Some("x"));
    assert_eq!(doc.attribute(b, "data-n"), Some("n=3"));
    assert_eq!(doc.attribute(b, "aria-busy"), Some(""));

    set(&mut runtime, root, "on", Value::Bool(false));
    let doc = runtime.document();
    assert_eq!(doc.attribute(b, "disabled"), Some(""));
    assert!(!doc.has_attribute(b, "aria-busy"));
}

#[test]
fn test_brace_less_form_attributes_are_expressions() {
    let (runtime, root) = mount(
        r#"<div s-state='{"greeting": "hello"}'><input id="i" value="greeting" placeholder="name"><input id="j" value="missing"><input id="l" value="greeting.length > 10"><input id="k" type="checkbox" checked></div>"#,
    );
    let i = by_id(&runtime, "i");
    let j = by_id(&runtime, "j");
    let k = by_id(&runtime, "k");
    let l = by_id(&runtime, "l");
    assert_eq!(runtime.document().attribute(i, "value"), Some("hello"));
    // Unresolvable text is a literal, as for `<option value="red">`
    assert_eq!(runtime.document().attribute(j, "value"), Some("missing"));
    assert!(!runtime.document().has_attribute(l, "value"));
    // Bare boolean attributes keep their presence
    assert_eq!(runtime.document().attribute(k, "checked"), Some(""));

    let bindings = runtime.attr_bindings(root);
    assert!(bindings.iter().any(|b| b.attribute == "value" && b.expression == "greeting"));
    // Other brace-less attributes are literal and unbound
    assert_eq!(runtime.document().attribute(i, "placeholder"), Some("name"));
    assert!(!bindings.iter().any(|b| b.attribute == "placeholder"));
}

#[test]
fn test_brace_less_disabled_follows_state() {
    let (mut runtime, root) = mount(r#"<div s-state='{"busy": false}'><button id="b" disabled="busy">go</button></div>"#);
    let b = by_id(&runtime, "b");
    assert!(!runtime.document().has_attribute(b, "disabled"));

    set(&mut runtime, root, "busy", Value::Bool(true));
    assert_eq!(runtime.document().attribute(b, "disabled"), Some(""));

    set(&mut runtime, root, "busy", Value::Bool(false));
    assert!(!runtime.document().has_attribute(b, "disabled"));
}

#[test]
fn test_class_normalisation() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"active": true, "size": "lg"}'>
             <span id="s" class="btn {size}  { {on: active, off: !active} }">x</span>
             <span id="t" class="{active && ''}">y</span>
           </div>"#,
    );
    let s = by_id(&runtime, "s");
    let t = by_id(&runtime, "t");
    assert_eq!(runtime.document().attribute(s, "class"), Some("btn lg on"));
    assert!(!runtime.document().has_attribute(t, "class"));

    set(&mut runtime, root, "active", Value::Bool(false));
    assert_eq!(runtime.document().attribute(s, "class"), Some("btn lg off"));
}

#[test]
fn test_class_from_arrays() {
    let (runtime, _) = mount(
        r#"<div s-state='{"list": ["a", ["b", null, ["c"]], false]}'><i id="i" class="{list}"></i></div>"#,
    );
    let i = by_id(&runtime, "i");
    assert_eq!(runtime.document().attribute(i, "class"), Some("a b c"));
}

#[test]
fn test_style_normalisation() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"color": "red", "extra": {"fontSize": "12px"}}'>
             <p id="p" style="color:{color}; {extra}">x</p>
           </div>"#,
    );
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().attribute(p, "style"), Some("color:red; font-size:12px"));

    let scope = runtime.scope(root).unwrap();
    scope.set("extra", Value::Null);
    runtime.flush();
    assert_eq!(runtime.document().attribute(p, "style"), Some("color:red"));
}

#[test]
fn test_empty_style_removes_attribute() {
    let (runtime, _) = mount(r#"<div s-state='{"s": null}'><p id="p" style="{s}">x</p></div>"#);
    let p = by_id(&runtime, "p");
    assert!(!runtime.document().has_attribute(p, "style"));
}

#[test]
fn test_script_and_style_text_is_not_bound() {
    let (runtime, root) = mount(
        r#"<div s-state='{"x": 1}'><script>let o = {x};</script><style>p {color: red}</style><p>{x}</p></div>"#,
    );
    assert_eq!(runtime.interp_bindings(root).len(), 1);
}

#[test]
fn test_collection_is_idempotent() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"n": 1, "open": true}'>
             <p title="{n}">{n}</p>
             <section @if="open"><b>{n}</b></section>
           </div>"#,
    );
    let attrs = runtime.attr_bindings(root);
    let interps = runtime.interp_bindings(root);
    runtime.collect_bindings_for_root(root);
    assert_eq!(runtime.attr_bindings(root), attrs);
    assert_eq!(runtime.interp_bindings(root), interps);

    // Still the same after the conditional has detached its element
    set(&mut runtime, root, "open", Value::Bool(false));
    runtime.collect_bindings_for_root(root);
    assert_eq!(runtime.attr_bindings(root), attrs);
    assert_eq!(runtime.interp_bindings(root), interps);
}

#[test]
fn test_nested_hosts_own_their_subtree() {
    let (mut runtime, outer) = mount(
        r#"<div id="outer" s-state='{"name": "outer"}'>
             <p id="a">{name}</p>
             <div id="inner" s-state='{"name": "inner"}'><p id="b">{name}</p></div>
           </div>"#,
    );
    let a = by_id(&runtime, "a");
    let b = by_id(&runtime, "b");
    assert_eq!(runtime.document().text_content(a), "outer");
    assert_eq!(runtime.document().text_content(b), "inner");

    let children = runtime.child_roots(outer);
    assert_eq!(children.len(), 1);
    assert_eq!(runtime.interp_bindings(outer).len(), 1);

    set(&mut runtime, outer, "name", Value::from("changed"));
    assert_eq!(runtime.document().text_content(b), "inner");
}

#[test]
fn test_template_anchor_is_expanded() {
    let (runtime, root) = mount(
        r#"<template id="row"><b>{label}</b></template>
           <div id="host" s-state='{"label": "hi"}'><span id="slot" template="row"></span></div>"#,
    );
    let slot = by_id(&runtime, "slot");
    assert_eq!(runtime.document().text_content(slot), "hi");
    assert_eq!(runtime.interp_bindings(root).len(), 1);
}

#[test]
fn test_missing_template_is_skipped() {
    let (runtime, _) = mount(r#"<div s-state='{}'><span id="slot" template="nope"></span></div>"#);
    let slot = by_id(&runtime, "slot");
    assert!(runtime.document().children(slot).is_empty());
}

#[test]
fn test_render_count_and_explicit_scope() {
    let (mut runtime, root) = mount(r#"<p id="p" s-state='{"v": "own"}'>{v}</p>"#);
    assert_eq!(runtime.render_count(root), 1);

    let other = Obj::from_entries([("v", Value::from("other"))]);
    runtime.render_with_scope(root, &other);
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "other");
    assert_eq!(runtime.render_count(root), 2);
}

#[test]
fn test_malformed_state_mounts_empty() {
    let (runtime, root) = mount(r#"<p id="p" s-state='{not json'>[{x}]</p>"#);
    assert!(runtime.scope(root).unwrap().is_empty());
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "[]");
}

#[test]
fn test_constructor_instance_and_props() {
    let mut runtime = Runtime::new(Document::parse(
        r#"<div id="c" s-use="Greeter" s-props='{"who": "Ada"}' s-state='{"punct": "!"}'>{greeting}{punct}</div>"#,
    ));
    runtime.registry_mut().register("Greeter", |props| {
        let who = props
            .as_obj()
            .and_then(|p| p.get("who"))
            .map(|v| v.to_display())
            .unwrap_or_default();
        let obj = Obj::instance();
        obj.insert("greeting", Value::from(format!("Hello {who}")));
        obj
    });
    let roots = runtime.mount_all();
    assert_eq!(roots.len(), 1);
    let c = by_id(&runtime, "c");
    assert_eq!(runtime.document().text_content(c), "Hello Ada!");
}

#[test]
fn test_unknown_constructor_leaves_markup() {
    let mut runtime = Runtime::new(Document::parse(r#"<div id="c" s-use="Missing">{x}</div>"#));
    assert!(runtime.mount_all().is_empty());
    let c = by_id(&runtime, "c");
    assert!(matches!(
        runtime.mount(c),
        Err(RuntimeError::UnknownConstructor { .. })
    ));
    assert_eq!(runtime.document().text_content(c), "{x}");
}

#[test]
fn test_lifecycle_hooks() {
    let mut runtime = Runtime::new(Document::parse(r#"<div id="c" s-use="Tracked"></div>"#));
    runtime.registry_mut().register("Tracked", |_| {
        let obj = Obj::instance();
        obj.insert("log", Value::array(Vec::new()));
        obj.insert(
            "onMount",
            Value::Function(Func::native("onMount", |this, _| {
                if let Some(Value::Array(log)) = this.as_obj().and_then(|o| o.get("log")) {
                    log.push(vec![Value::from("mount")]);
                }
                Ok(Value::Undefined)
            })),
        );
        obj.insert(
            "onDestroy",
            Value::Function(Func::native("onDestroy", |this, _| {
                if let Some(Value::Array(log)) = this.as_obj().and_then(|o| o.get("log")) {
                    log.push(vec![Value::from("destroy")]);
                }
                Ok(Value::Undefined)
            })),
        );
        obj
    });
    let root = runtime.mount_all()[0];
    let scope = runtime.scope(root).unwrap();
    runtime.destroy(root);

    let log = scope.get("log").unwrap();
    assert_eq!(log.to_display(), "mount,destroy");
    assert!(!runtime.is_mounted(root));
}

#[test]
fn test_destroyed_root_ignores_writes() {
    let (mut runtime, root) = mount(r#"<p id="p" s-state='{"n": 1}'>{n}</p>"#);
    let scope = runtime.scope(root).unwrap();
    runtime.destroy(root);

    scope.set("n", Value::from(2));
    assert_eq!(runtime.flush(), 0);
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().text_content(p), "1");
}

#[test]
fn test_coalesced_renders() {
    let (mut runtime, root) = mount(r#"<p s-state='{"n": 0}'>{n}</p>"#);
    let scope = runtime.scope(root).unwrap();
    for i in 1..=5 {
        scope.set("n", Value::from(i));
    }
    assert_eq!(runtime.flush(), 1);
    assert_eq!(runtime.render_count(root), 2);
}
