//! # Sprout expressions
//!
//! The expression language embedded in Sprout markup: `{count + 1}` in text,
//! `@if="open && !busy"` on directives, `onclick="items.push(draft); draft = ''"`
//! on event handlers.
//!
//! Sources are tokenized with logos, parsed by a hand-written recursive-descent
//! parser into an [`ast::Expression`] tree, and memoised per source string by
//! [`compile`]. Evaluation lives in `sprout-runtime`; this crate is syntax only.

pub mod ast;
pub mod cache;
pub mod error;
pub mod parser;
pub mod tokenizer;

#[cfg(test)]
mod tests_parser;

pub use ast::{Expression, Program, Span, TemplatePart};
pub use cache::{cache_size, compile, is_cached};
pub use error::{format_error, ParseError, ParseResult};
pub use parser::{parse, Parser, MAX_NESTING};
pub use tokenizer::{tokenize, Token};
