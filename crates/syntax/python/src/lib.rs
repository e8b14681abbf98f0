//! Python frontend.
//!
//! Uses tree-sitter for parsing Python, then lowers the CST into
//! `ast`-shaped Cinder trees ready for encoding.

mod lower;
mod strings;

pub use lower::{MAX_NESTING_DEPTH, PLACEHOLDER_KINDS, ParseError, parse};
