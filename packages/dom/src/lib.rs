//! In-memory document tree for the Sprout runtime.
//!
//! A [`Document`] is an arena of element, text and comment nodes addressed by
//! [`NodeId`]. It carries the pieces of a browser document the runtime
//! mutates: attributes, live form properties, inline style, structure, and a
//! small HTML parser/serializer for fixtures.

pub mod document;
pub mod error;
pub mod event;
pub mod html;
pub mod node;
pub mod serializer;
pub mod style;


pub use document::Document;
pub use error::{DomError, DomResult};
pub use event::{Event, Phase};
pub use html::decode_entities;
pub use node::{is_raw_text_element, is_void_element, Attribute, Node, NodeData, NodeId};
