//! Schema-driven conversion from [`Tree`] to [`SExpr`].

use crate::schema::Schema;
use crate::sexpr::{SExpr, render};
use crate::tree::{Node, Tree};
use std::collections::BTreeSet;
use tracing::debug;

/// Converts trees to their canonical S-expression form.
///
/// Encoding is total: a node kind missing from the schema becomes a
/// `#<Kind>` placeholder and the rest of the tree is encoded as usual.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'s> {
    schema: &'s Schema,
}

impl<'s> Encoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn encode(&self, tree: &Tree) -> SExpr {
        match tree {
            Tree::Str(value) => SExpr::string(value.as_str()),
            Tree::Seq(items) => SExpr::List(items.iter().map(|item| self.encode(item)).collect()),
            Tree::Absent => SExpr::Nil,
            Tree::Node(node) => self.encode_node(node),
        }
    }

    fn encode_node(&self, node: &Node) -> SExpr {
        let Some(fields) = self.schema.fields(&node.kind) else {
            debug!(kind = %node.kind, "no schema entry, emitting placeholder");
            return SExpr::placeholder(node.kind.as_str());
        };

        let mut list = Vec::with_capacity(1 + 2 * fields.len());
        list.push(SExpr::symbol(node.kind.as_str()));
        for name in fields {
            list.push(SExpr::keyword(name.as_str()));
            // A field the node does not carry encodes like an explicit absence.
            list.push(node.field(name).map_or(SExpr::Nil, |value| self.encode(value)));
        }
        SExpr::List(list)
    }

    /// Collects the kinds that would be rendered as placeholders.
    ///
    /// Only fields the schema makes the encoder visit are searched, so a kind
    /// hidden inside an omitted field is not reported.
    pub fn unknown_kinds(&self, tree: &Tree) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_unknown(tree, &mut found);
        found
    }

    fn collect_unknown(&self, tree: &Tree, found: &mut BTreeSet<String>) {
        match tree {
            Tree::Str(_) | Tree::Absent => {}
            Tree::Seq(items) => {
                for item in items {
                    self.collect_unknown(item, found);
                }
            }
            Tree::Node(node) => match self.schema.fields(&node.kind) {
                Some(fields) => {
                    for value in fields.iter().filter_map(|name| node.field(name)) {
                        self.collect_unknown(value, found);
                    }
                }
                None => {
                    found.insert(node.kind.clone());
                }
            },
        }
    }
}

/// Encodes `tree` against `schema`.
pub fn encode(tree: &Tree, schema: &Schema) -> SExpr {
    Encoder::new(schema).encode(tree)
}

/// Encodes and renders `tree` as one line of text.
pub fn to_sexp_string(tree: &Tree, schema: &Schema) -> String {
    render(&encode(tree, schema))
}
