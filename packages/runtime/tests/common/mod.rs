//! Shared fixtures for the runtime integration tests

use sprout_dom::{Document, NodeId};
use sprout_runtime::{RootId, Runtime};
use tracing_subscriber::EnvFilter;

/// Route runtime logs through the test writer. `RUST_LOG=sprout_runtime=trace`
/// shows binding and listener activity for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn mount(html: &str) -> (Runtime, RootId) {
    init_tracing();
    let mut runtime = Runtime::new(Document::parse(html));
    let roots = runtime.mount_all();
    assert_eq!(roots.len(), 1, "expected a single root");
    (runtime, roots[0])
}

pub fn by_id(runtime: &Runtime, id: &str) -> NodeId {
    runtime
        .document()
        .element_by_id(id)
        .unwrap_or_else(|| panic!("no element #{id}"))
}
