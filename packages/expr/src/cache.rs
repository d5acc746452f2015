//! Compile cache for expression strings.
//!
//! Every distinct source string is parsed exactly once per thread and the
//! resulting [`Program`] is shared by every caller afterwards. Failures are
//! remembered as well, so a broken expression bound in a hot render path is
//! not re-parsed on every pass.

use crate::ast::Program;
use crate::error::ParseResult;
use crate::parser::parse;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

thread_local! {
    static COMPILED: RefCell<HashMap<String, ParseResult<Rc<Program>>>> = RefCell::new(HashMap::new());
}

/// Compile `source`, reusing a previous result for the same string
pub fn compile(source: &str) -> ParseResult<Rc<Program>> {
    if let Some(hit) = COMPILED.with(|cache| cache.borrow().get(source).cloned()) {
        return hit;
    }

    trace!(expression = source, "compiling expression");
    let compiled = parse(source).map(Rc::new);
    COMPILED.with(|cache| {
        cache
            .borrow_mut()
            .insert(source.to_string(), compiled.clone());
    });
    compiled
}

/// Number of distinct expression strings compiled on this thread
pub fn cache_size() -> usize {
    COMPILED.with(|cache| cache.borrow().len())
}

/// Whether `source` has been compiled before
pub fn is_cached(source: &str) -> bool {
    COMPILED.with(|cache| cache.borrow().contains_key(source))
}
