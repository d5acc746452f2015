/// Conditional, visibility, list and transition directives
use crate::*;
use sprout_dom::{Document, NodeId};

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

fn eval_in(runtime: &mut Runtime, root: RootId, expression: &str) {
    let scope = runtime.scope(root).unwrap();
    evaluate(expression, &scope, None);
    runtime.flush();
}

fn element_children(runtime: &Runtime, parent: NodeId) -> Vec<NodeId> {
    runtime
        .document()
        .children(parent)
        .iter()
        .copied()
        .filter(|c| runtime.document().is_element(*c))
        .collect()
}

// ---------------------------------------------------------------------------
// Conditional
// ---------------------------------------------------------------------------

#[test]
fn test_conditional_detaches_and_restores() {
    let (mut runtime, root) = mount(
        r#"<div id="host" s-state='{"open": false}'><p id="a">A</p><section id="s" @if="open">S</section><p id="b">B</p></div>"#,
    );
    let host = by_id(&runtime, "host");
    let s = by_id(&runtime, "s");
    assert!(!runtime.document().is_connected(s));
    assert_eq!(runtime.document().inner_html(host), r#"<p id="a">A</p><!--s-if--><p id="b">B</p>"#);

    eval_in(&mut runtime, root, "open = true");
    assert_eq!(
        runtime.document().inner_html(host),
        r#"<p id="a">A</p><!--s-if--><section id="s" @if="open">S</section><p id="b">B</p>"#
    );

    eval_in(&mut runtime, root, "open = false");
    assert!(!runtime.document().is_connected(s));

    // The same node comes back
    eval_in(&mut runtime, root, "open = true");
    assert_eq!(runtime.document().parent(s), Some(host));
}

#[test]
fn test_conditional_braces_are_optional() {
    let (runtime, _) = mount(r#"<div s-state='{"n": 2}'><b id="x" s-if="{n > 1}">x</b></div>"#);
    let x = by_id(&runtime, "x");
    assert!(runtime.document().is_connected(x));
}

#[test]
fn test_else_branch() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"user": null}'><p id="yes" @if="user">Hi {user.name}</p><p id="no" @else>Sign in</p></div>"#,
    );
    let yes = by_id(&runtime, "yes");
    let no = by_id(&runtime, "no");
    assert!(!runtime.document().is_connected(yes));
    assert!(!runtime.is_hidden(no));

    eval_in(&mut runtime, root, "user = {name: 'Ada'}");
    assert!(runtime.document().is_connected(yes));
    assert_eq!(runtime.document().text_content(yes), "Hi Ada");
    let doc = runtime.document();
    assert!(doc.has_attribute(no, "hidden"));
    assert_eq!(doc.attribute(no, "aria-hidden"), Some("true"));
    assert_eq!(doc.style_property(no, "display").as_deref(), Some("none"));

    eval_in(&mut runtime, root, "user = null");
    assert!(!runtime.is_hidden(no));
    assert!(runtime.document().style_property(no, "display").is_none());
}

#[test]
fn test_conditional_rewires_reinserted_subtree() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"open": false, "n": 0}'><button id="b" @if="open" onclick="n++">{n}</button></div>"#,
    );
    eval_in(&mut runtime, root, "open = true");
    let b = by_id(&runtime, "b");
    runtime.dispatch(sprout_dom::Event::new("click", b));
    runtime.flush();
    assert_eq!(runtime.document().text_content(b), "1");

    // Hiding and showing again must not double the handler
    eval_in(&mut runtime, root, "open = false");
    eval_in(&mut runtime, root, "open = true");
    runtime.dispatch(sprout_dom::Event::new("click", b));
    runtime.flush();
    assert_eq!(runtime.document().text_content(b), "2");
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[test]
fn test_show_toggles_in_place() {
    let (mut runtime, root) = mount(r#"<div s-state='{"v": false}'><p id="p" @show="v">x</p></div>"#);
    let p = by_id(&runtime, "p");
    assert!(runtime.document().is_connected(p));
    assert!(runtime.is_hidden(p));

    eval_in(&mut runtime, root, "v = true");
    assert!(!runtime.is_hidden(p));
    assert!(!runtime.document().has_attribute(p, "aria-hidden"));
}

#[test]
fn test_show_survives_style_binding_rerender() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"v": true, "color": "red", "n": 0}'>
             <p id="before" style="color:{color}" @show="v">x</p>
             <p id="after" @show="v" style="color:{color}">y</p>
             <b>{n}</b>
           </div>"#,
    );
    let before = by_id(&runtime, "before");
    let after = by_id(&runtime, "after");

    eval_in(&mut runtime, root, "v = false");
    eval_in(&mut runtime, root, "n++");
    for p in [before, after] {
        assert!(runtime.is_hidden(p));
        assert_eq!(runtime.document().style_property(p, "display").as_deref(), Some("none"));
        assert_eq!(runtime.document().style_property(p, "color").as_deref(), Some("red"));
    }

    eval_in(&mut runtime, root, "color = 'blue'");
    assert_eq!(runtime.document().style_property(before, "display").as_deref(), Some("none"));
    assert_eq!(runtime.document().style_property(before, "color").as_deref(), Some("blue"));

    eval_in(&mut runtime, root, "v = true");
    for p in [before, after] {
        assert!(!runtime.is_hidden(p));
        assert!(runtime.document().style_property(p, "display").is_none());
    }
}

#[test]
fn test_fade_transition_runs_on_the_clock() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"v": true}'><p id="p" s-show="v" s-transition="fade:200">x</p></div>"#,
    );
    let p = by_id(&runtime, "p");
    assert!(!runtime.is_hidden(p));
    assert_eq!(runtime.transition_version(p), 0);

    eval_in(&mut runtime, root, "v = false");
    // Fading out: still visible until the timer fires
    assert!(!runtime.is_hidden(p));
    assert_eq!(runtime.document().style_property(p, "opacity").as_deref(), Some("0"));

    runtime.advance_time(199);
    assert!(!runtime.is_hidden(p));
    runtime.advance_time(1);
    assert!(runtime.is_hidden(p));
    assert!(runtime.document().style_property(p, "opacity").is_none());

    eval_in(&mut runtime, root, "v = true");
    assert!(!runtime.is_hidden(p));
    assert_eq!(runtime.document().style_property(p, "opacity").as_deref(), Some("0"));
    runtime.advance_time(0);
    assert_eq!(runtime.document().style_property(p, "opacity").as_deref(), Some("1"));
    runtime.advance_time(200);
    assert!(runtime.document().style_property(p, "opacity").is_none());
    assert!(runtime.document().style_property(p, "transition").is_none());
    assert_eq!(runtime.pending_timers(), 0);
}

#[test]
fn test_stale_transition_timers_are_ignored() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"v": true}'><p id="p" @show="v" @transition="fade:100">x</p></div>"#,
    );
    let p = by_id(&runtime, "p");
    eval_in(&mut runtime, root, "v = false");
    runtime.advance_time(50);
    eval_in(&mut runtime, root, "v = true");
    assert_eq!(runtime.transition_version(p), 2);

    // The fade-out timer would have fired here
    runtime.advance_time(60);
    assert!(!runtime.is_hidden(p));
    runtime.advance_time(100);
    assert!(!runtime.is_hidden(p));
    assert!(runtime.document().style_property(p, "opacity").is_none());
}

#[test]
fn test_huge_durations_saturate() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"v": true}'><p id="p" @show="v" @transition="fade:18446744073709551615">x</p></div>"#,
    );
    let p = by_id(&runtime, "p");
    eval_in(&mut runtime, root, "v = false");
    runtime.advance_time(u64::MAX);
    assert_eq!(runtime.now(), u64::MAX);
    assert!(runtime.is_hidden(p));
    runtime.advance_time(1);
    assert_eq!(runtime.now(), u64::MAX);
}

#[test]
fn test_non_fade_transition_is_instant() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"v": true}'><p id="p" @show="v" @transition="slide:100">x</p></div>"#,
    );
    let p = by_id(&runtime, "p");
    eval_in(&mut runtime, root, "v = false");
    assert!(runtime.is_hidden(p));
    assert_eq!(runtime.pending_timers(), 0);
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn test_list_renders_items_with_aliases() {
    let (runtime, _) = mount(
        r#"<ul id="ul" s-state='{"rows": ["a", "b"]}'><li @each="rows as row, n">{n}:{row}</li></ul>"#,
    );
    let ul = by_id(&runtime, "ul");
    assert_eq!(
        runtime.document().inner_html(ul),
        "<!--s-each--><li>0:a</li><li>1:b</li>"
    );
}

#[test]
fn test_list_default_names_and_parent_scope() {
    let (runtime, _) = mount(
        r#"<ul id="ul" s-state='{"rows": [1, 2], "unit": "px"}'><li s-each="rows">{item}{unit}/{i}</li></ul>"#,
    );
    let ul = by_id(&runtime, "ul");
    assert_eq!(
        runtime.document().inner_html(ul),
        "<!--s-each--><li>1px/0</li><li>2px/1</li>"
    );
}

#[test]
fn test_non_array_renders_nothing() {
    let (runtime, _) = mount(r#"<ul id="ul" s-state='{"rows": null}'><li @each="rows">{item}</li></ul>"#);
    let ul = by_id(&runtime, "ul");
    assert_eq!(runtime.document().inner_html(ul), "<!--s-each-->");
}

#[test]
fn test_keyed_list_reuses_nodes() {
    let (mut runtime, root) = mount(
        r#"<ul id="ul" s-state='{"rows": [{"id": 1, "t": "a"}, {"id": 2, "t": "b"}, {"id": 3, "t": "c"}]}'>
             <li @each="rows as row" key="row.id">{row.t}</li>
           </ul>"#,
    );
    let ul = by_id(&runtime, "ul");
    let before = element_children(&runtime, ul);
    assert_eq!(before.len(), 3);

    eval_in(&mut runtime, root, "rows = [rows[2], rows[0]]");
    let after = element_children(&runtime, ul);
    assert_eq!(after, vec![before[2], before[0]]);
    assert_eq!(runtime.document().text_content(after[0]), "c");
    assert!(!runtime.document().is_connected(before[1]));

    // Items stay in sync through their own roots
    eval_in(&mut runtime, root, "rows[0].t = 'C'");
    assert_eq!(runtime.document().text_content(after[0]), "C");
}

#[test]
fn test_unkeyed_list_rebuilds() {
    let (mut runtime, root) = mount(r#"<ul id="ul" s-state='{"rows": [1, 2]}'><li @each="rows">{item}</li></ul>"#);
    let ul = by_id(&runtime, "ul");
    let before = element_children(&runtime, ul);

    eval_in(&mut runtime, root, "rows.push(3)");
    let after = element_children(&runtime, ul);
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|node| !before.contains(node)));
}

#[test]
fn test_unchanged_list_is_not_reconciled() {
    let (mut runtime, root) = mount(
        r#"<ul id="ul" s-state='{"rows": ["a"], "other": 0}'><li @each="rows">{item}</li></ul>"#,
    );
    let ul = by_id(&runtime, "ul");
    let before = element_children(&runtime, ul);
    let item_roots = runtime.child_roots(root);

    eval_in(&mut runtime, root, "other = 1");
    assert_eq!(element_children(&runtime, ul), before);
    assert_eq!(runtime.child_roots(root), item_roots);
}

#[test]
fn test_removed_items_are_destroyed() {
    let (mut runtime, root) = mount(
        r#"<ul id="ul" s-state='{"rows": [{"id": 1}, {"id": 2}]}'><li @each="rows as row" key="row.id">{row.id}</li></ul>"#,
    );
    assert_eq!(runtime.child_roots(root).len(), 2);
    eval_in(&mut runtime, root, "rows.splice(0, 1)");
    assert_eq!(runtime.child_roots(root).len(), 1);
    let remaining = runtime.child_roots(root)[0];
    assert_eq!(runtime.render_count(remaining), 2);
}

#[test]
fn test_list_item_handlers_reach_parent_state() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"rows": ["a", "b"], "picked": ""}'>
             <button @each="rows as row" onclick="picked = row">{row}</button>
             <p id="out">{picked}</p>
           </div>"#,
    );
    let host = runtime.root_node(root).unwrap();
    let buttons: Vec<NodeId> = element_children(&runtime, host)
        .into_iter()
        .filter(|n| runtime.document().tag_name(*n) == Some("button"))
        .collect();
    assert_eq!(buttons.len(), 2);

    runtime.dispatch(sprout_dom::Event::new("click", buttons[1]));
    runtime.flush();
    let out = by_id(&runtime, "out");
    assert_eq!(runtime.document().text_content(out), "b");
}

#[test]
fn test_destroy_drops_directive_state() {
    let (mut runtime, root) = mount(
        r#"<div s-state='{"rows": [1], "open": true}'><li @each="rows">{item}</li><p @if="open">x</p></div>"#,
    );
    assert_eq!(runtime.child_roots(root).len(), 1);
    let item = runtime.child_roots(root)[0];
    runtime.destroy(root);
    assert!(!runtime.is_mounted(item));
    assert!(runtime.roots().is_empty());
    assert_eq!(runtime.listeners.len(), 0);
    assert!(runtime.directives.lists.is_empty());
    assert!(runtime.directives.conditionals.is_empty());
    assert!(runtime.placeholders.is_empty());
}
