/// Event wiring, modifiers, `$event` and two-way binding
use crate::*;
use sprout_dom::{Document, Event, NodeId};

fn mount(html: &str) -> (Runtime, RootId) {
    let mut runtime = Runtime::new(Document::parse(html));
    let root = runtime.mount_all()[0];
    (runtime, root)
}

fn by_id(runtime: &Runtime, id: &str) -> NodeId {
    runtime
        .document()
        .element_by_id(id)
        .unwrap_or_else(|| panic!("no element #{id}"))
}

fn state(runtime: &Runtime, root: RootId, expression: &str) -> Value {
    evaluate(expression, &runtime.scope(root).unwrap(), None)
}

#[test]
fn test_click_handler_updates_state_and_dom() {
    let (mut runtime, root) = mount(r#"<div s-state='{"n": 0}'><button id="b" onclick="n++">{n}</button></div>"#);
    let b = by_id(&runtime, "b");
    assert!(!runtime.document().has_attribute(b, "onclick"));

    runtime.dispatch(Event::new("click", b));
    // Rendered synchronously by the handler
    assert_eq!(runtime.document().text_content(b), "1");
    runtime.flush();
    assert_eq!(state(&runtime, root, "n").as_number(), Some(1.0));
}

#[test]
fn test_events_bubble_to_ancestors() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"log": ""}' onclick="log += 'outer'"><p onclick="log += 'inner,'"><b id="t">x</b></p></div>"#,
    );
    let t = by_id(&runtime, "t");
    runtime.dispatch(Event::new("click", t));
    assert_eq!(state(&runtime, root, "log").to_display(), "inner,outer");
}

#[test]
fn test_stop_and_prevent_modifiers() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"log": ""}' onclick="log += 'outer'"><a id="a" onclick.stop.prevent="log += 'link'">x</a></div>"#,
    );
    let a = by_id(&runtime, "a");
    let allowed = runtime.dispatch(Event::new("click", a));
    assert!(!allowed);
    assert_eq!(state(&runtime, root, "log").to_display(), "link");
}

#[test]
fn test_once_modifier() {
    let (mut runtime, root) = mount(r#"<div s-state='{"n": 0}'><button id="b" onclick.once="n++">x</button></div>"#);
    let b = by_id(&runtime, "b");
    assert_eq!(runtime.listener_count(root), 1);
    runtime.dispatch(Event::new("click", b));
    runtime.dispatch(Event::new("click", b));
    assert_eq!(state(&runtime, root, "n").as_number(), Some(1.0));
    assert_eq!(runtime.listener_count(root), 0);
}

#[test]
fn test_key_filter_modifier() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"sent": 0}'><input id="i" onkeydown.enter="sent++"></div>"#,
    );
    let i = by_id(&runtime, "i");
    runtime.dispatch(Event::new("keydown", i).with_key("a"));
    runtime.dispatch(Event::new("keydown", i));
    assert_eq!(state(&runtime, root, "sent").as_number(), Some(0.0));
    runtime.dispatch(Event::new("keydown", i).with_key("Enter"));
    assert_eq!(state(&runtime, root, "sent").as_number(), Some(1.0));
}

#[test]
fn test_event_object() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"seen": null}'><input id="field" value="abc" oninput="seen = [$event.type, $event.target.value, $event.target.tagName, $event.target.id].join('|')"></div>"#,
    );
    let field = by_id(&runtime, "field");
    runtime.dispatch(Event::new("input", field));
    assert_eq!(state(&runtime, root, "seen").to_display(), "input|abc|INPUT|field");
}

#[test]
fn test_key_alias_chains() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"closed": false}'><input id="i" onkeydown="hit = $event.escape.prevent; closed = !!hit"></div>"#,
    );
    let i = by_id(&runtime, "i");
    let allowed = runtime.dispatch(Event::new("keydown", i).with_key("Escape"));
    assert!(!allowed);
    assert!(state(&runtime, root, "closed").truthy());

    let allowed = runtime.dispatch(Event::new("keydown", i).with_key("x"));
    assert!(allowed);
    assert!(!state(&runtime, root, "closed").truthy());
}

#[test]
fn test_global_key_listener() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"open": true}'><div id="panel" onkeydown.escape.window="open = false">x</div><input id="elsewhere"></div>"#,
    );
    let elsewhere = by_id(&runtime, "elsewhere");
    runtime.dispatch(Event::new("keydown", elsewhere).with_key("Escape"));
    assert!(!state(&runtime, root, "open").truthy());
}

#[test]
fn test_outside_click() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"open": true}'>
             <div id="menu" onclick.outside="open = false"><button id="inside">x</button></div>
             <button id="away">y</button>
           </div>"#,
    );
    let inside = by_id(&runtime, "inside");
    let away = by_id(&runtime, "away");

    runtime.dispatch(Event::new("click", inside));
    assert!(state(&runtime, root, "open").truthy());
    runtime.dispatch(Event::new("click", away));
    assert!(!state(&runtime, root, "open").truthy());
}

#[test]
fn test_outside_via_event_property() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"hits": 0}'><div id="box" onclick="hits += $event.outside ? 1 : 0"><i id="in">x</i></div><i id="out">y</i></div>"#,
    );
    let inner = by_id(&runtime, "in");
    let outer = by_id(&runtime, "out");
    runtime.dispatch(Event::new("click", inner));
    runtime.dispatch(Event::new("click", outer));
    assert_eq!(state(&runtime, root, "hits").as_number(), Some(1.0));
}

#[test]
fn test_focus_transitions_use_related_target() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"open": true}'>
             <div id="menu" onfocusout.outside="open = false"><input id="a"><input id="b"></div>
             <input id="c">
           </div>"#,
    );
    let a = by_id(&runtime, "a");
    let b = by_id(&runtime, "b");
    let c = by_id(&runtime, "c");

    runtime.dispatch(Event::new("focusout", a).with_related_target(b));
    assert!(state(&runtime, root, "open").truthy());
    runtime.dispatch(Event::new("focusout", a).with_related_target(c));
    assert!(!state(&runtime, root, "open").truthy());
}

#[test]
fn test_two_way_text_input() {
    let (mut runtime, root) = mount(r#"<div s-state='{"name": "Ada"}'><input id="i" :value="name"><p id="p">{name}</p></div>"#);
    let i = by_id(&runtime, "i");
    let p = by_id(&runtime, "p");
    assert_eq!(runtime.document().value(i), "Ada");
    assert_eq!(runtime.document().attribute(i, "s-model"), Some("name"));
    assert!(!runtime.document().has_attribute(i, ":value"));

    runtime.document_mut().set_value(i, "Grace").unwrap();
    runtime.dispatch(Event::new("input", i));
    runtime.flush();
    assert_eq!(state(&runtime, root, "name").to_display(), "Grace");
    assert_eq!(runtime.document().text_content(p), "Grace");

    runtime.scope(root).unwrap().set("name", Value::from("Linus"));
    runtime.flush();
    assert_eq!(runtime.document().value(i), "Linus");
}

#[test]
fn test_two_way_number_input() {
    let (mut runtime, root) = mount(r#"<div s-state='{"qty": 1}'><input id="i" type="number" :value="qty"></div>"#);
    let i = by_id(&runtime, "i");
    runtime.document_mut().set_value(i, "42").unwrap();
    runtime.dispatch(Event::new("input", i));
    assert_eq!(state(&runtime, root, "qty").as_number(), Some(42.0));

    runtime.document_mut().set_value(i, "").unwrap();
    runtime.dispatch(Event::new("input", i));
    assert_eq!(state(&runtime, root, "qty").as_str(), Some(""));
}

#[test]
fn test_two_way_radio_and_select() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"color": "red"}'>
             <input id="r" type="radio" value="red" :value="color">
             <input id="g" type="radio" value="green" :value="color">
             <select id="s" :value="color"><option value="red">R</option><option value="green">G</option></select>
           </div>"#,
    );
    let r = by_id(&runtime, "r");
    let g = by_id(&runtime, "g");
    let s = by_id(&runtime, "s");
    assert!(runtime.document().checked(r));
    assert!(!runtime.document().checked(g));
    assert_eq!(runtime.document().value(s), "red");

    runtime.document_mut().set_checked(g, true).unwrap();
    runtime.dispatch(Event::new("change", g));
    runtime.flush();
    assert_eq!(state(&runtime, root, "color").to_display(), "green");
    assert!(!runtime.document().checked(r));
    assert_eq!(runtime.document().value(s), "green");
}

#[test]
fn test_two_way_is_wired_once() {
    let (mut runtime, root) = mount(r#"<div s-state='{"t": ""}'><input id="i" :value="t"></div>"#);
    let before = runtime.listener_count(root);
    runtime.collect_bindings_for_root(root);
    runtime.wire_event_handlers(root);
    assert_eq!(runtime.listener_count(root), before);
}

#[test]
fn test_destroy_removes_listeners() {
    let (mut runtime, root) = mount(r#"<div s-state='{"n": 0}'><button id="b" onclick="n++">x</button></div>"#);
    let b = by_id(&runtime, "b");
    let scope = runtime.scope(root).unwrap();
    runtime.destroy(root);
    runtime.dispatch(Event::new("click", b));
    assert_eq!(scope.get("n").and_then(|v| v.as_number()), Some(0.0));
}

#[test]
fn test_destroy_releases_handler_closures() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"open": false}'><button id="b" onclick="toggle = () => open = !open; toggle()">x</button></div>"#,
    );
    let b = by_id(&runtime, "b");
    runtime.dispatch(Event::new("click", b));
    let scope = runtime.scope(root).unwrap();
    assert!(scope.get("toggle").is_some());
    assert!(scope.get("open").is_some_and(|v| v.truthy()));

    runtime.destroy(root);
    assert!(scope.get("toggle").is_none());
    assert!(scope.get("open").is_some());
}
