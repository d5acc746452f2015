//! `@show`: toggle visibility in place, optionally through a transition.

use crate::interpreter::evaluate;
use crate::runtime::Runtime;
use crate::scheduler::RootId;
use crate::value::Obj;
use sprout_dom::NodeId;
use tracing::trace;

impl Runtime {
    pub(crate) fn render_visibility(&mut self, root: RootId, element: NodeId, expression: &str, scope: &Obj) {
        let visible = evaluate(expression, scope, None).truthy();
        let previous = self.directives.visibility.insert(element, visible);

        match previous {
            // First application is always instant
            None => {
                self.track_directive(root, element);
                self.set_hidden(element, !visible);
            }
            // Unchanged: re-assert hiding, other bindings may rewrite `style`
            Some(previous) if previous == visible => {
                if !visible && !self.clock.is_animating(element) {
                    self.set_hidden(element, true);
                }
            }
            Some(_) => {
                let transition = self.transition_spec(element);
                trace!(?element, visible, ?transition, "visibility changed");
                match transition {
                    Some(spec) if spec.is_animated() => self.start_transition(element, visible, spec.duration_ms),
                    _ => self.set_hidden(element, !visible),
                }
            }
        }
    }
}
