//! Syntax tree values and their canonical S-expression encoding.
//!
//! This crate sits between syntax frontends (Python via tree-sitter, or any
//! external parser emitting JSON trees) and whatever consumes the printed
//! text: diffing, hashing, structural comparison.
//!
//! # Output format
//!
//! A node renders as its kind followed by `:field value` pairs in schema
//! order. Strings are quoted, absent values are `nil`, sequences are plain
//! lists and kinds the schema does not know become `#<Kind>`:
//!
//! ```text
//! (If :test "x" :body ((Pass)) :orelse ())
//! ```

mod encode;
mod sexpr;
mod tree;
mod validation;
pub mod schema;

pub use encode::{Encoder, encode, to_sexp_string};
pub use schema::{Schema, SchemaError};
pub use sexpr::{SExpr, escape_str, render, render_into};
pub use tree::{Node, Tree};
pub use validation::{ValidationError, Validator, validate};

#[cfg(test)]
mod tests;
