//! Strict tree validation.
//!
//! The encoder tolerates unknown kinds and missing fields. Callers that want
//! either to be an error run [`validate`] first.

use crate::schema::Schema;
use crate::tree::Tree;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors reported by strict validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown node kind {kind} at {path}")]
    UnknownKind { kind: String, path: String },

    #[error("{kind} node at {path} has no '{field}' field")]
    MissingField {
        kind: String,
        field: String,
        path: String,
    },
}

/// Checks that every node reached by the encoder has a schema entry and
/// carries every field that entry lists.
///
/// Reports the first problem in encoding order.
pub fn validate(tree: &Tree, schema: &Schema) -> Result<(), ValidationError> {
    Validator::new(schema).validate(tree)
}

/// Strict validation against a schema, optionally accepting some kinds
/// as placeholders.
#[derive(Debug, Clone)]
pub struct Validator<'s> {
    schema: &'s Schema,
    placeholders: BTreeSet<String>,
}

impl<'s> Validator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            placeholders: BTreeSet::new(),
        }
    }

    /// Accepts nodes of these kinds without a schema entry. They still
    /// encode as `#<Kind>` and their fields are not checked.
    pub fn allow_placeholders<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.placeholders.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self, tree: &Tree) -> Result<(), ValidationError> {
        self.validate_at(tree, &mut String::new())
    }

    fn validate_at(&self, tree: &Tree, path: &mut String) -> Result<(), ValidationError> {
        match tree {
            Tree::Str(_) | Tree::Absent => Ok(()),
            Tree::Seq(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{}]", idx));
                    self.validate_at(item, path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            Tree::Node(node) => {
                let here = if path.is_empty() {
                    node.kind.clone()
                } else {
                    path.clone()
                };
                let Some(fields) = self.schema.fields(&node.kind) else {
                    if self.placeholders.contains(&node.kind) {
                        return Ok(());
                    }
                    return Err(ValidationError::UnknownKind {
                        kind: node.kind.clone(),
                        path: here,
                    });
                };

                for name in fields {
                    let value = node
                        .field(name)
                        .ok_or_else(|| ValidationError::MissingField {
                            kind: node.kind.clone(),
                            field: name.clone(),
                            path: here.clone(),
                        })?;
                    let mut child_path = format!("{}.{}", here, name);
                    self.validate_at(value, &mut child_path)?;
                }
                Ok(())
            }
        }
    }
}
