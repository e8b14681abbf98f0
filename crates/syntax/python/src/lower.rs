//! Tree-sitter based Python frontend.
//!
//! Parses source with tree-sitter-python and lowers the concrete syntax tree
//! into [`Tree`] values shaped like CPython 3.8's `ast` module: same kind
//! names, same field names, `ctx` markers on names and containers, `Index`
//! wrappers on subscripts.

use crate::strings::{Prefix, decode_escapes, unescape_braces};
use rhizome_cinder_ir::{Node, Tree};
use std::cell::Cell;
use thiserror::Error;
use tracing::debug;
use tree_sitter::{Node as CstNode, Parser, Tree as CstTree};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to load Python grammar: {0}")]
    Language(String),

    #[error("{filename}:{line}:{column}: syntax error: {message}")]
    Syntax {
        filename: String,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Statements and expressions nested deeper than this are rejected.
///
/// Left-leaning operator chains (`a + b + ...`) are lowered without
/// recursion and do not count against the limit.
pub const MAX_NESTING_DEPTH: usize = 1_000;

/// Kinds this frontend emits that the built-in schema leaves out on
/// purpose: the scalar constant nodes and the `Add` operator. They always
/// render as `#<Kind>`.
pub const PLACEHOLDER_KINDS: &[&str] = &["int", "float", "complex", "bool", "bytes", "ellipsis", "Add"];

/// Parse Python source into an `ast`-shaped tree.
///
/// `filename` is only used in error messages. Lowering a tree near
/// [`MAX_NESTING_DEPTH`] takes more stack than a default thread has; the
/// `cinder` binary runs it on a thread with a large stack.
pub fn parse(source: &str, filename: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|err| ParseError::Language(err.to_string()))?;

    let cst = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Language("parser returned no tree".into()))?;

    let ctx = LowerContext::new(source, filename);
    ctx.lower_module(&cst)
}

/// Expression context, as in `ast.Load` / `ast.Store` / `ast.Del`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Load,
    Store,
    Del,
}

impl Ctx {
    fn leaf(self) -> Tree {
        Tree::leaf(match self {
            Ctx::Load => "Load",
            Ctx::Store => "Store",
            Ctx::Del => "Del",
        })
    }
}

/// A piece of a (possibly formatted) string literal.
enum Piece {
    Text(String),
    Value(Tree),
}

/// Python scalars other than `str` and `None` become nodes named after
/// their Python type, carrying the literal text.
fn scalar(kind: &str, text: impl Into<String>) -> Tree {
    Node::new(kind).with("value", text.into()).into()
}

fn int(value: i64) -> Tree {
    scalar("int", value.to_string())
}

fn constant(value: Tree) -> Tree {
    Node::new("Constant")
        .with("value", value)
        .with("kind", Tree::Absent)
        .into()
}

fn binary_op(op: &str) -> Option<&'static str> {
    Some(match op {
        "+" => "Add",
        "-" => "Sub",
        "*" => "Mult",
        "@" => "MatMult",
        "/" => "Div",
        "%" => "Mod",
        "**" => "Pow",
        "<<" => "LShift",
        ">>" => "RShift",
        "|" => "BitOr",
        "^" => "BitXor",
        "&" => "BitAnd",
        "//" => "FloorDiv",
        _ => return None,
    })
}

fn compare_op(op: &str) -> Option<&'static str> {
    Some(match op {
        "==" => "Eq",
        "!=" | "<>" => "NotEq",
        "<" => "Lt",
        "<=" => "LtE",
        ">" => "Gt",
        ">=" => "GtE",
        "is" => "Is",
        "is not" => "IsNot",
        "in" => "In",
        "not in" => "NotIn",
        _ => return None,
    })
}

struct LowerContext<'a> {
    source: &'a str,
    filename: &'a str,
    depth: Cell<usize>,
}

impl<'a> LowerContext<'a> {
    fn new(source: &'a str, filename: &'a str) -> Self {
        Self {
            source,
            filename,
            depth: Cell::new(0),
        }
    }

    /// Runs `lower` one nesting level deeper, failing past the limit.
    fn nested<T>(
        &self,
        node: CstNode,
        lower: impl FnOnce() -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let depth = self.depth.get() + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(self.error_at(
                node,
                format!("too many nested statements or expressions (limit {})", MAX_NESTING_DEPTH),
            ));
        }
        self.depth.set(depth);
        let result = lower();
        self.depth.set(depth - 1);
        result
    }

    // ------------------------------------------------------------------
    // CST helpers
    // ------------------------------------------------------------------

    fn text(&self, node: CstNode) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn error_at(&self, node: CstNode, message: impl Into<String>) -> ParseError {
        let pos = node.start_position();
        ParseError::Syntax {
            filename: self.filename.to_string(),
            line: pos.row + 1,
            column: pos.column + 1,
            message: message.into(),
        }
    }

    /// Named children, without comments and line continuations.
    fn named<'t>(&self, node: CstNode<'t>) -> Vec<CstNode<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
            .collect()
    }

    fn children<'t>(&self, node: CstNode<'t>) -> Vec<CstNode<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).collect()
    }

    fn field<'t>(&self, node: CstNode<'t>, name: &str) -> Result<CstNode<'t>, ParseError> {
        node.child_by_field_name(name)
            .ok_or_else(|| self.error_at(node, format!("{} missing {}", node.kind(), name)))
    }

    fn fields<'t>(&self, node: CstNode<'t>, name: &str) -> Vec<CstNode<'t>> {
        let mut cursor = node.walk();
        node.children_by_field_name(name, &mut cursor).collect()
    }

    fn first_named<'t>(&self, node: CstNode<'t>) -> Result<CstNode<'t>, ParseError> {
        self.named(node)
            .into_iter()
            .next()
            .ok_or_else(|| self.error_at(node, format!("empty {}", node.kind())))
    }

    /// Whether `node` has an anonymous child token of the given kind.
    fn has_token(&self, node: CstNode, token: &str) -> bool {
        self.children(node)
            .iter()
            .any(|child| !child.is_named() && child.kind() == token)
    }

    /// Dotted names are rebuilt from their identifiers so whitespace around
    /// the dots does not leak into the output.
    fn dotted_name(&self, node: CstNode) -> String {
        if node.kind() != "dotted_name" {
            return self.text(node).to_string();
        }
        self.named(node)
            .into_iter()
            .map(|part| self.text(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn syntax_error(&self, root: CstNode) -> ParseError {
        match first_error(root) {
            Some(node) if node.is_missing() => {
                self.error_at(node, format!("expected '{}'", node.kind()))
            }
            Some(node) => {
                let snippet: String = self
                    .text(node)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(24)
                    .collect();
                if snippet.trim().is_empty() {
                    self.error_at(node, "invalid syntax")
                } else {
                    self.error_at(node, format!("invalid syntax near '{}'", snippet.trim()))
                }
            }
            None => self.error_at(root, "invalid syntax"),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn lower_module(&self, cst: &CstTree) -> Result<Tree, ParseError> {
        let root = cst.root_node();

        if root.has_error() {
            return Err(self.syntax_error(root));
        }

        Ok(Node::new("Module")
            .with("body", self.lower_block(root)?)
            .with("type_ignores", Tree::seq([]))
            .into())
    }

    fn lower_block(&self, node: CstNode) -> Result<Vec<Tree>, ParseError> {
        self.named(node)
            .into_iter()
            .map(|child| self.lower_stmt(child))
            .collect()
    }

    fn lower_stmt(&self, node: CstNode) -> Result<Tree, ParseError> {
        self.nested(node, || self.lower_stmt_kind(node))
    }

    fn lower_stmt_kind(&self, node: CstNode) -> Result<Tree, ParseError> {
        match node.kind() {
            "expression_statement" => self.lower_expression_statement(node),
            "pass_statement" => Ok(Tree::leaf("Pass")),
            "break_statement" => Ok(Tree::leaf("Break")),
            "continue_statement" => Ok(Tree::leaf("Continue")),
            "return_statement" => {
                let value = self.optional_expr(self.named(node).first().copied())?;
                Ok(Node::new("Return").with("value", value).into())
            }
            "delete_statement" => self.lower_delete(node),
            "raise_statement" => self.lower_raise(node),
            "global_statement" | "nonlocal_statement" => {
                let kind = if node.kind() == "global_statement" {
                    "Global"
                } else {
                    "Nonlocal"
                };
                let names: Vec<Tree> = self
                    .named(node)
                    .into_iter()
                    .map(|name| Tree::str(self.text(name)))
                    .collect();
                Ok(Node::new(kind).with("names", names).into())
            }
            "assert_statement" => {
                let exprs = self.named(node);
                let test = self.lower_expr(self.first_named(node)?, Ctx::Load)?;
                let msg = self.optional_expr(exprs.get(1).copied())?;
                Ok(Node::new("Assert").with("test", test).with("msg", msg).into())
            }
            "import_statement" => Ok(Node::new("Import")
                .with("names", self.lower_import_names(node))
                .into()),
            "import_from_statement" => self.lower_import_from(node),
            "future_import_statement" => Ok(Node::new("ImportFrom")
                .with("module", "__future__")
                .with("names", self.lower_import_names(node))
                .with("level", int(0))
                .into()),
            "if_statement" => self.lower_if(node),
            "for_statement" => self.lower_for(node),
            "while_statement" => {
                let orelse = self.lower_else(node.child_by_field_name("alternative"))?;
                Ok(Node::new("While")
                    .with("test", self.lower_expr(self.field(node, "condition")?, Ctx::Load)?)
                    .with("body", self.lower_block(self.field(node, "body")?)?)
                    .with("orelse", orelse)
                    .into())
            }
            "try_statement" => self.lower_try(node),
            "with_statement" => self.lower_with(node),
            "function_definition" => self.lower_function(node, Vec::new()),
            "class_definition" => self.lower_class(node, Vec::new()),
            "decorated_definition" => self.lower_decorated(node),
            "match_statement" => {
                let subject = self.optional_expr(node.child_by_field_name("subject"))?;
                Ok(Node::new("Match").with("subject", subject).into())
            }
            "type_alias_statement" => {
                let name = self.optional_type(node.child_by_field_name("left"))?;
                let value = self.optional_type(node.child_by_field_name("right"))?;
                Ok(Node::new("TypeAlias")
                    .with("name", name)
                    .with("value", value)
                    .into())
            }
            "print_statement" => Err(self.error_at(node, "missing parentheses in call to 'print'")),
            "exec_statement" => Err(self.error_at(node, "missing parentheses in call to 'exec'")),
            kind => {
                debug!(kind, "unmodelled statement");
                Ok(Tree::leaf(kind))
            }
        }
    }

    fn lower_expression_statement(&self, node: CstNode) -> Result<Tree, ParseError> {
        let children = self.named(node);
        if let [single] = children.as_slice() {
            match single.kind() {
                "assignment" => return self.lower_assignment(*single),
                "augmented_assignment" => return self.lower_aug_assignment(*single),
                _ => {}
            }
        }
        let value = self.lower_exprs(&children, node, Ctx::Load)?;
        Ok(Node::new("Expr").with("value", value).into())
    }

    fn lower_assignment(&self, node: CstNode) -> Result<Tree, ParseError> {
        let left = self.field(node, "left")?;
        let right = node.child_by_field_name("right");

        if let Some(annotation) = node.child_by_field_name("type") {
            let simple = if left.kind() == "identifier" { 1 } else { 0 };
            return Ok(Node::new("AnnAssign")
                .with("target", self.lower_expr(left, Ctx::Store)?)
                .with("annotation", self.lower_type(annotation)?)
                .with("value", self.optional_expr(right)?)
                .with("simple", int(simple))
                .into());
        }

        let mut targets = vec![self.lower_expr(left, Ctx::Store)?];
        let mut value = right.ok_or_else(|| self.error_at(node, "assignment missing value"))?;
        // `a = b = c` nests to the right.
        while value.kind() == "assignment" {
            targets.push(self.lower_expr(self.field(value, "left")?, Ctx::Store)?);
            value = self.field(value, "right")?;
        }

        Ok(Node::new("Assign")
            .with("targets", targets)
            .with("value", self.lower_expr(value, Ctx::Load)?)
            .into())
    }

    fn lower_aug_assignment(&self, node: CstNode) -> Result<Tree, ParseError> {
        let operator = self.field(node, "operator")?;
        let op_text = self.text(operator);
        let op = binary_op(op_text.trim_end_matches('='))
            .ok_or_else(|| self.error_at(operator, format!("unknown operator '{}'", op_text)))?;

        Ok(Node::new("AugAssign")
            .with("target", self.lower_expr(self.field(node, "left")?, Ctx::Store)?)
            .with("op", Tree::leaf(op))
            .with("value", self.lower_expr(self.field(node, "right")?, Ctx::Load)?)
            .into())
    }

    fn lower_delete(&self, node: CstNode) -> Result<Tree, ParseError> {
        let target = self.first_named(node)?;
        let targets = if target.kind() == "expression_list" {
            self.named(target)
                .into_iter()
                .map(|t| self.lower_expr(t, Ctx::Del))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.lower_expr(target, Ctx::Del)?]
        };
        Ok(Node::new("Delete").with("targets", targets).into())
    }

    fn lower_raise(&self, node: CstNode) -> Result<Tree, ParseError> {
        let cause = node.child_by_field_name("cause");
        let exc = self
            .named(node)
            .into_iter()
            .find(|child| Some(child.id()) != cause.map(|c| c.id()));

        Ok(Node::new("Raise")
            .with("exc", self.optional_expr(exc)?)
            .with("cause", self.optional_expr(cause)?)
            .into())
    }

    fn lower_import_names(&self, node: CstNode) -> Vec<Tree> {
        self.fields(node, "name")
            .into_iter()
            .map(|name| self.lower_alias(name))
            .collect()
    }

    fn lower_alias(&self, node: CstNode) -> Tree {
        let (name, asname) = if node.kind() == "aliased_import" {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.dotted_name(n))
                .unwrap_or_default();
            let asname = node.child_by_field_name("alias").map(|a| self.text(a));
            (name, asname)
        } else {
            (self.dotted_name(node), None)
        };
        Node::new("alias")
            .with("name", name)
            .with("asname", asname)
            .into()
    }

    fn lower_import_from(&self, node: CstNode) -> Result<Tree, ParseError> {
        let module_name = self.field(node, "module_name")?;
        let (module, level) = if module_name.kind() == "relative_import" {
            let mut level = 0;
            let mut module = None;
            for part in self.named(module_name) {
                match part.kind() {
                    "import_prefix" => level = self.text(part).matches('.').count(),
                    _ => module = Some(self.dotted_name(part)),
                }
            }
            (module, level)
        } else {
            (Some(self.dotted_name(module_name)), 0)
        };

        let wildcard = self
            .named(node)
            .into_iter()
            .any(|child| child.kind() == "wildcard_import");
        let names = if wildcard {
            vec![Node::new("alias")
                .with("name", "*")
                .with("asname", Tree::Absent)
                .into()]
        } else {
            self.lower_import_names(node)
        };

        Ok(Node::new("ImportFrom")
            .with("module", module)
            .with("names", names)
            .with("level", int(level as i64))
            .into())
    }

    fn lower_if(&self, node: CstNode) -> Result<Tree, ParseError> {
        let alternatives = self.fields(node, "alternative");
        Ok(Node::new("If")
            .with("test", self.lower_expr(self.field(node, "condition")?, Ctx::Load)?)
            .with("body", self.lower_block(self.field(node, "consequence")?)?)
            .with("orelse", self.lower_else_chain(&alternatives)?)
            .into())
    }

    /// `elif` clauses become a nested `If` as the sole `orelse` statement.
    fn lower_else_chain(&self, alternatives: &[CstNode]) -> Result<Vec<Tree>, ParseError> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Ok(Vec::new());
        };
        if first.kind() != "elif_clause" {
            return self.lower_block(self.field(*first, "body")?);
        }
        let nested = Node::new("If")
            .with("test", self.lower_expr(self.field(*first, "condition")?, Ctx::Load)?)
            .with("body", self.lower_block(self.field(*first, "consequence")?)?)
            .with("orelse", self.lower_else_chain(rest)?);
        Ok(vec![nested.into()])
    }

    fn lower_else(&self, clause: Option<CstNode>) -> Result<Vec<Tree>, ParseError> {
        match clause {
            Some(clause) => self.lower_block(self.field(clause, "body")?),
            None => Ok(Vec::new()),
        }
    }

    fn lower_for(&self, node: CstNode) -> Result<Tree, ParseError> {
        let kind = if self.has_token(node, "async") {
            "AsyncFor"
        } else {
            "For"
        };
        Ok(Node::new(kind)
            .with("target", self.lower_expr(self.field(node, "left")?, Ctx::Store)?)
            .with("iter", self.lower_expr(self.field(node, "right")?, Ctx::Load)?)
            .with("body", self.lower_block(self.field(node, "body")?)?)
            .with("orelse", self.lower_else(node.child_by_field_name("alternative"))?)
            .into())
    }

    fn lower_try(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        let mut star = false;

        for child in self.named(node) {
            match child.kind() {
                "except_clause" => handlers.push(self.lower_handler(child)?),
                "except_group_clause" => {
                    star = true;
                    handlers.push(self.lower_handler(child)?);
                }
                "else_clause" => orelse = self.lower_block(self.field(child, "body")?)?,
                "finally_clause" => {
                    if let Some(block) = self.named(child).into_iter().find(|c| c.kind() == "block") {
                        finalbody = self.lower_block(block)?;
                    }
                }
                _ => {}
            }
        }

        Ok(Node::new(if star { "TryStar" } else { "Try" })
            .with("body", self.lower_block(self.field(node, "body")?)?)
            .with("handlers", handlers)
            .with("orelse", orelse)
            .with("finalbody", finalbody)
            .into())
    }

    fn lower_handler(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut exprs = Vec::new();
        let mut body = Vec::new();
        for child in self.named(node) {
            if child.kind() == "block" {
                body = self.lower_block(child)?;
            } else {
                exprs.push(child);
            }
        }

        let (exc_type, name) = match exprs.as_slice() {
            [] => (Tree::Absent, Tree::Absent),
            // Some grammar versions read `except E as e` as one as_pattern.
            [pattern] if pattern.kind() == "as_pattern" => {
                let exc_type = self.lower_expr(self.first_named(*pattern)?, Ctx::Load)?;
                let name = pattern
                    .child_by_field_name("alias")
                    .map(|alias| self.text(alias).to_string());
                (exc_type, Tree::from(name))
            }
            [exc_type] => (self.lower_expr(*exc_type, Ctx::Load)?, Tree::Absent),
            [exc_type, name, ..] => (
                self.lower_expr(*exc_type, Ctx::Load)?,
                Tree::str(self.text(*name)),
            ),
        };

        Ok(Node::new("ExceptHandler")
            .with("type", exc_type)
            .with("name", name)
            .with("body", body)
            .into())
    }

    fn lower_with(&self, node: CstNode) -> Result<Tree, ParseError> {
        let kind = if self.has_token(node, "async") {
            "AsyncWith"
        } else {
            "With"
        };

        let mut items = Vec::new();
        for clause in self.named(node).into_iter().filter(|c| c.kind() == "with_clause") {
            for item in self.named(clause) {
                if item.kind() == "with_item" {
                    items.push(self.lower_with_item(item)?);
                }
            }
        }

        Ok(Node::new(kind)
            .with("items", items)
            .with("body", self.lower_block(self.field(node, "body")?)?)
            .into())
    }

    fn lower_with_item(&self, node: CstNode) -> Result<Tree, ParseError> {
        let value = self.field(node, "value")?;

        let (context_expr, optional_vars) = if let Some(alias) = node.child_by_field_name("alias") {
            (value, Some(alias))
        } else if value.kind() == "as_pattern" {
            (self.first_named(value)?, value.child_by_field_name("alias"))
        } else {
            (value, None)
        };

        let optional_vars = match optional_vars {
            Some(target) => self.lower_expr(target, Ctx::Store)?,
            None => Tree::Absent,
        };
        Ok(Node::new("withitem")
            .with("context_expr", self.lower_expr(context_expr, Ctx::Load)?)
            .with("optional_vars", optional_vars)
            .into())
    }

    fn lower_decorated(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut decorators = Vec::new();
        for child in self.named(node) {
            if child.kind() == "decorator" {
                decorators.push(self.lower_expr(self.first_named(child)?, Ctx::Load)?);
            }
        }

        let definition = self.field(node, "definition")?;
        match definition.kind() {
            "class_definition" => self.lower_class(definition, decorators),
            _ => self.lower_function(definition, decorators),
        }
    }

    fn lower_function(&self, node: CstNode, decorators: Vec<Tree>) -> Result<Tree, ParseError> {
        let kind = if self.has_token(node, "async") {
            "AsyncFunctionDef"
        } else {
            "FunctionDef"
        };
        let returns = self.optional_type(node.child_by_field_name("return_type"))?;

        Ok(Node::new(kind)
            .with("name", self.text(self.field(node, "name")?))
            .with("args", self.lower_parameters(node.child_by_field_name("parameters"))?)
            .with("body", self.lower_block(self.field(node, "body")?)?)
            .with("decorator_list", decorators)
            .with("returns", returns)
            .into())
    }

    fn lower_class(&self, node: CstNode, decorators: Vec<Tree>) -> Result<Tree, ParseError> {
        let (bases, keywords) = match node.child_by_field_name("superclasses") {
            Some(list) => self.lower_argument_list(list)?,
            None => (Vec::new(), Vec::new()),
        };

        Ok(Node::new("ClassDef")
            .with("name", self.text(self.field(node, "name")?))
            .with("bases", bases)
            .with("keywords", keywords)
            .with("body", self.lower_block(self.field(node, "body")?)?)
            .with("decorator_list", decorators)
            .into())
    }

    fn lower_parameters(&self, params: Option<CstNode>) -> Result<Tree, ParseError> {
        let mut sig = Signature::default();

        for param in params.map(|p| self.named(p)).unwrap_or_default() {
            match param.kind() {
                "identifier" => sig.push(self.arg(param, None)?, None),
                "typed_parameter" => {
                    let annotation = Some(self.field(param, "type")?);
                    let inner = self.first_named(param)?;
                    match inner.kind() {
                        "list_splat_pattern" => {
                            sig.vararg = self.arg(self.first_named(inner)?, annotation)?;
                            sig.keyword_only = true;
                        }
                        "dictionary_splat_pattern" => {
                            sig.kwarg = self.arg(self.first_named(inner)?, annotation)?;
                        }
                        _ => sig.push(self.arg(inner, annotation)?, None),
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let annotation = param.child_by_field_name("type");
                    let arg = self.arg(self.field(param, "name")?, annotation)?;
                    let default = self.lower_expr(self.field(param, "value")?, Ctx::Load)?;
                    sig.push(arg, Some(default));
                }
                "list_splat_pattern" => {
                    sig.vararg = self.arg(self.first_named(param)?, None)?;
                    sig.keyword_only = true;
                }
                "dictionary_splat_pattern" => {
                    sig.kwarg = self.arg(self.first_named(param)?, None)?;
                }
                "keyword_separator" => sig.keyword_only = true,
                "positional_separator" => {
                    let args = std::mem::take(&mut sig.args);
                    sig.posonlyargs.extend(args);
                }
                kind => return Err(self.error_at(param, format!("unexpected parameter {}", kind))),
            }
        }

        Ok(sig.into_tree())
    }

    fn arg(&self, name: CstNode, annotation: Option<CstNode>) -> Result<Tree, ParseError> {
        Ok(Node::new("arg")
            .with("arg", self.text(name))
            .with("annotation", self.optional_type(annotation)?)
            .into())
    }

    /// Splits call or class arguments into positional args and keywords.
    fn lower_argument_list(&self, node: CstNode) -> Result<(Vec<Tree>, Vec<Tree>), ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        for child in self.named(node) {
            match child.kind() {
                "keyword_argument" => keywords.push(
                    Node::new("keyword")
                        .with("arg", self.text(self.field(child, "name")?))
                        .with("value", self.lower_expr(self.field(child, "value")?, Ctx::Load)?)
                        .into(),
                ),
                "dictionary_splat" => keywords.push(
                    Node::new("keyword")
                        .with("arg", Tree::Absent)
                        .with("value", self.lower_expr(self.first_named(child)?, Ctx::Load)?)
                        .into(),
                ),
                _ => args.push(self.lower_expr(child, Ctx::Load)?),
            }
        }

        Ok((args, keywords))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn optional_expr(&self, node: Option<CstNode>) -> Result<Tree, ParseError> {
        match node {
            Some(node) => self.lower_expr(node, Ctx::Load),
            None => Ok(Tree::Absent),
        }
    }

    fn optional_type(&self, node: Option<CstNode>) -> Result<Tree, ParseError> {
        match node {
            Some(node) => self.lower_type(node),
            None => Ok(Tree::Absent),
        }
    }

    /// One expression as itself, several as a tuple.
    fn lower_exprs(&self, nodes: &[CstNode], parent: CstNode, ctx: Ctx) -> Result<Tree, ParseError> {
        match nodes {
            [] => Err(self.error_at(parent, format!("empty {}", parent.kind()))),
            [single] => self.lower_expr(*single, ctx),
            many => self.tuple(many, ctx),
        }
    }

    fn elements(&self, nodes: &[CstNode], ctx: Ctx) -> Result<Vec<Tree>, ParseError> {
        nodes.iter().map(|n| self.lower_expr(*n, ctx)).collect()
    }

    fn tuple(&self, nodes: &[CstNode], ctx: Ctx) -> Result<Tree, ParseError> {
        Ok(Node::new("Tuple")
            .with("elts", self.elements(nodes, ctx)?)
            .with("ctx", ctx.leaf())
            .into())
    }

    fn lower_expr(&self, node: CstNode, ctx: Ctx) -> Result<Tree, ParseError> {
        self.nested(node, || self.lower_expr_kind(node, ctx))
    }

    fn lower_expr_kind(&self, node: CstNode, ctx: Ctx) -> Result<Tree, ParseError> {
        match node.kind() {
            "identifier" | "keyword_identifier" => Ok(Node::new("Name")
                .with("id", self.text(node))
                .with("ctx", ctx.leaf())
                .into()),
            "integer" | "float" => Ok(self.lower_number(node)),
            "true" => Ok(constant(scalar("bool", "True"))),
            "false" => Ok(constant(scalar("bool", "False"))),
            "none" => Ok(constant(Tree::Absent)),
            "ellipsis" => Ok(constant(scalar("ellipsis", "..."))),
            "string" => self.lower_strings(&[node]),
            "concatenated_string" => self.lower_strings(&self.named(node)),

            "parenthesized_expression" => self.lower_expr(self.first_named(node)?, ctx),
            "as_pattern_target" => match self.named(node).first() {
                Some(inner) => self.lower_expr(*inner, ctx),
                None => Ok(Node::new("Name")
                    .with("id", self.text(node))
                    .with("ctx", ctx.leaf())
                    .into()),
            },
            "type" => self.lower_type(node),

            "binary_operator" => self.lower_bin_op(node),
            "boolean_operator" => self.lower_bool_op(node),
            "not_operator" => Ok(Node::new("UnaryOp")
                .with("op", Tree::leaf("Not"))
                .with("operand", self.lower_expr(self.field(node, "argument")?, Ctx::Load)?)
                .into()),
            "unary_operator" => {
                let operator = self.field(node, "operator")?;
                let op = match self.text(operator) {
                    "+" => "UAdd",
                    "-" => "USub",
                    "~" => "Invert",
                    other => {
                        return Err(self.error_at(operator, format!("unknown operator '{}'", other)));
                    }
                };
                Ok(Node::new("UnaryOp")
                    .with("op", Tree::leaf(op))
                    .with("operand", self.lower_expr(self.field(node, "argument")?, Ctx::Load)?)
                    .into())
            }
            "comparison_operator" => self.lower_compare(node),

            "call" => {
                let arguments = self.field(node, "arguments")?;
                let (args, keywords) = if arguments.kind() == "generator_expression" {
                    (vec![self.lower_expr(arguments, Ctx::Load)?], Vec::new())
                } else {
                    self.lower_argument_list(arguments)?
                };
                Ok(Node::new("Call")
                    .with("func", self.lower_expr(self.field(node, "function")?, Ctx::Load)?)
                    .with("args", args)
                    .with("keywords", keywords)
                    .into())
            }
            "attribute" => Ok(Node::new("Attribute")
                .with("value", self.lower_expr(self.field(node, "object")?, Ctx::Load)?)
                .with("attr", self.text(self.field(node, "attribute")?))
                .with("ctx", ctx.leaf())
                .into()),
            "subscript" => self.lower_subscript(node, ctx),

            "list" | "list_pattern" => Ok(Node::new("List")
                .with("elts", self.elements(&self.named(node), ctx)?)
                .with("ctx", ctx.leaf())
                .into()),
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                self.tuple(&self.named(node), ctx)
            }
            "set" => Ok(Node::new("Set")
                .with("elts", self.elements(&self.named(node), Ctx::Load)?)
                .into()),
            "dictionary" => self.lower_dict(node),
            "list_splat" | "list_splat_pattern" => Ok(Node::new("Starred")
                .with("value", self.lower_expr(self.first_named(node)?, ctx)?)
                .with("ctx", ctx.leaf())
                .into()),

            "list_comprehension" | "set_comprehension" | "generator_expression" => {
                let kind = match node.kind() {
                    "list_comprehension" => "ListComp",
                    "set_comprehension" => "SetComp",
                    _ => "GeneratorExp",
                };
                let body = self.field(node, "body")?;
                Ok(Node::new(kind)
                    .with("elt", self.lower_expr(body, Ctx::Load)?)
                    .with("generators", self.lower_generators(node, body)?)
                    .into())
            }
            "dictionary_comprehension" => {
                let body = self.field(node, "body")?;
                Ok(Node::new("DictComp")
                    .with("key", self.lower_expr(self.field(body, "key")?, Ctx::Load)?)
                    .with("value", self.lower_expr(self.field(body, "value")?, Ctx::Load)?)
                    .with("generators", self.lower_generators(node, body)?)
                    .into())
            }

            "conditional_expression" => {
                let parts = self.named(node);
                let [body, test, orelse] = parts.as_slice() else {
                    return Err(self.error_at(node, "malformed conditional expression"));
                };
                Ok(Node::new("IfExp")
                    .with("test", self.lower_expr(*test, Ctx::Load)?)
                    .with("body", self.lower_expr(*body, Ctx::Load)?)
                    .with("orelse", self.lower_expr(*orelse, Ctx::Load)?)
                    .into())
            }
            "lambda" => Ok(Node::new("Lambda")
                .with("args", self.lower_parameters(node.child_by_field_name("parameters"))?)
                .with("body", self.lower_expr(self.field(node, "body")?, Ctx::Load)?)
                .into()),
            "await" => Ok(Node::new("Await")
                .with("value", self.lower_expr(self.first_named(node)?, Ctx::Load)?)
                .into()),
            "yield" => {
                let values = self.named(node);
                if self.has_token(node, "from") {
                    return Ok(Node::new("YieldFrom")
                        .with("value", self.lower_exprs(&values, node, Ctx::Load)?)
                        .into());
                }
                let value = if values.is_empty() {
                    Tree::Absent
                } else {
                    self.lower_exprs(&values, node, Ctx::Load)?
                };
                Ok(Node::new("Yield").with("value", value).into())
            }
            "named_expression" => Ok(Node::new("NamedExpr")
                .with("target", self.lower_expr(self.field(node, "name")?, Ctx::Store)?)
                .with("value", self.lower_expr(self.field(node, "value")?, Ctx::Load)?)
                .into()),

            kind => {
                debug!(kind, "unmodelled expression");
                Ok(Tree::leaf(kind))
            }
        }
    }

    fn lower_number(&self, node: CstNode) -> Tree {
        let text = self.text(node);
        let kind = if text.ends_with(['j', 'J']) {
            "complex"
        } else if node.kind() == "float" {
            "float"
        } else {
            "int"
        };
        constant(scalar(kind, text))
    }

    /// Lowers a binary operator and the chain hanging off its left operand
    /// bottom-up, so `1 + 1 + ... + 1` needs no stack per term.
    fn lower_bin_op(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut spine = vec![node];
        let mut leftmost = self.field(node, "left")?;
        while leftmost.kind() == "binary_operator" {
            spine.push(leftmost);
            leftmost = self.field(leftmost, "left")?;
        }

        let mut tree = self.lower_expr(leftmost, Ctx::Load)?;
        for op_node in spine.into_iter().rev() {
            let operator = self.field(op_node, "operator")?;
            let op_text = self.text(operator);
            let op = binary_op(op_text).ok_or_else(|| {
                self.error_at(operator, format!("unknown operator '{}'", op_text))
            })?;
            tree = Node::new("BinOp")
                .with("left", tree)
                .with("op", Tree::leaf(op))
                .with("right", self.lower_expr(self.field(op_node, "right")?, Ctx::Load)?)
                .into();
        }
        Ok(tree)
    }

    /// `a and b and c` is one `BoolOp` with three values.
    fn lower_bool_op(&self, node: CstNode) -> Result<Tree, ParseError> {
        let operator = self.text(self.field(node, "operator")?);
        let op = if operator == "and" { "And" } else { "Or" };

        // Operands in source order; same-operator children are flattened.
        let mut values = Vec::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            let same_op = current.kind() == "boolean_operator"
                && current
                    .child_by_field_name("operator")
                    .is_some_and(|op| self.text(op) == operator);
            if same_op {
                pending.push(self.field(current, "right")?);
                pending.push(self.field(current, "left")?);
            } else {
                values.push(self.lower_expr(current, Ctx::Load)?);
            }
        }

        Ok(Node::new("BoolOp")
            .with("op", Tree::leaf(op))
            .with("values", values)
            .into())
    }

    fn lower_compare(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut operands = Vec::new();
        let mut ops: Vec<(CstNode, String)> = Vec::new();
        let mut last_was_op = false;

        for child in self.children(node) {
            if child.is_named() {
                if child.kind() != "comment" {
                    operands.push(child);
                    last_was_op = false;
                }
                continue;
            }
            // `not in` / `is not` may arrive as two tokens.
            match ops.last_mut() {
                Some((_, text)) if last_was_op => {
                    text.push(' ');
                    text.push_str(child.kind());
                }
                _ => ops.push((child, child.kind().to_string())),
            }
            last_was_op = true;
        }

        let Some((left, comparators)) = operands.split_first() else {
            return Err(self.error_at(node, "empty comparison"));
        };
        let ops = ops
            .iter()
            .map(|(token, text)| {
                compare_op(text)
                    .map(Tree::leaf)
                    .ok_or_else(|| self.error_at(*token, format!("unknown comparison '{}'", text)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Node::new("Compare")
            .with("left", self.lower_expr(*left, Ctx::Load)?)
            .with("ops", ops)
            .with("comparators", self.elements(comparators, Ctx::Load)?)
            .into())
    }

    fn lower_dict(&self, node: CstNode) -> Result<Tree, ParseError> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for child in self.named(node) {
            match child.kind() {
                "pair" => {
                    keys.push(self.lower_expr(self.field(child, "key")?, Ctx::Load)?);
                    values.push(self.lower_expr(self.field(child, "value")?, Ctx::Load)?);
                }
                "dictionary_splat" => {
                    keys.push(Tree::Absent);
                    values.push(self.lower_expr(self.first_named(child)?, Ctx::Load)?);
                }
                kind => return Err(self.error_at(child, format!("unexpected {} in dict", kind))),
            }
        }
        Ok(Node::new("Dict")
            .with("keys", keys)
            .with("values", values)
            .into())
    }

    fn lower_subscript(&self, node: CstNode, ctx: Ctx) -> Result<Tree, ParseError> {
        let items = self.fields(node, "subscript");
        let has_comma = self.has_token(node, ",");

        let slice = match items.as_slice() {
            [single] if !has_comma => self.lower_slice_item(*single)?,
            many if many.iter().any(|item| item.kind() == "slice") => {
                let dims = many
                    .iter()
                    .map(|item| self.lower_slice_item(*item))
                    .collect::<Result<Vec<_>, _>>()?;
                Node::new("ExtSlice").with("dims", dims).into()
            }
            many => Node::new("Index")
                .with("value", self.tuple(many, Ctx::Load)?)
                .into(),
        };

        Ok(Node::new("Subscript")
            .with("value", self.lower_expr(self.field(node, "value")?, Ctx::Load)?)
            .with("slice", slice)
            .with("ctx", ctx.leaf())
            .into())
    }

    fn lower_slice_item(&self, node: CstNode) -> Result<Tree, ParseError> {
        if node.kind() != "slice" {
            return Ok(Node::new("Index")
                .with("value", self.lower_expr(node, Ctx::Load)?)
                .into());
        }

        // Bounds are placed by how many colons precede them.
        let mut bounds = [Tree::Absent, Tree::Absent, Tree::Absent];
        let mut colons = 0;
        for child in self.children(node) {
            if !child.is_named() {
                if child.kind() == ":" {
                    colons += 1;
                }
            } else if child.kind() != "comment" && colons < bounds.len() {
                bounds[colons] = self.lower_expr(child, Ctx::Load)?;
            }
        }

        let [lower, upper, step] = bounds;
        Ok(Node::new("Slice")
            .with("lower", lower)
            .with("upper", upper)
            .with("step", step)
            .into())
    }

    /// Collects `for`/`if` clauses into `comprehension` nodes. `if` clauses
    /// attach to the closest preceding `for`.
    fn lower_generators(&self, node: CstNode, body: CstNode) -> Result<Vec<Tree>, ParseError> {
        let mut generators: Vec<(Tree, Tree, Vec<Tree>, bool)> = Vec::new();

        for clause in self.named(node) {
            if clause.id() == body.id() {
                continue;
            }
            match clause.kind() {
                "for_in_clause" => {
                    let target = self.lower_expr(self.field(clause, "left")?, Ctx::Store)?;
                    let iter = self.lower_exprs(&self.fields(clause, "right"), clause, Ctx::Load)?;
                    let is_async = self.has_token(clause, "async");
                    generators.push((target, iter, Vec::new(), is_async));
                }
                "if_clause" => {
                    let test = self.lower_expr(self.first_named(clause)?, Ctx::Load)?;
                    match generators.last_mut() {
                        Some((_, _, ifs, _)) => ifs.push(test),
                        None => return Err(self.error_at(clause, "'if' before 'for' in comprehension")),
                    }
                }
                _ => {}
            }
        }

        Ok(generators
            .into_iter()
            .map(|(target, iter, ifs, is_async)| {
                Node::new("comprehension")
                    .with("target", target)
                    .with("iter", iter)
                    .with("ifs", ifs)
                    .with("is_async", int(is_async as i64))
                    .into()
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    fn lower_type(&self, node: CstNode) -> Result<Tree, ParseError> {
        match node.kind() {
            "type" => self.lower_type(self.first_named(node)?),
            "generic_type" => {
                let parts = self.named(node);
                let Some((base, params)) = parts.split_first() else {
                    return Err(self.error_at(node, "empty generic type"));
                };
                let args: Vec<CstNode> = params
                    .iter()
                    .flat_map(|p| self.named(*p))
                    .collect();
                let value = match args.as_slice() {
                    [single] => self.lower_type(*single)?,
                    many => Node::new("Tuple")
                        .with(
                            "elts",
                            many.iter()
                                .map(|t| self.lower_type(*t))
                                .collect::<Result<Vec<_>, _>>()?,
                        )
                        .with("ctx", Ctx::Load.leaf())
                        .into(),
                };
                Ok(Node::new("Subscript")
                    .with("value", self.lower_type(*base)?)
                    .with("slice", Node::new("Index").with("value", value))
                    .with("ctx", Ctx::Load.leaf())
                    .into())
            }
            "union_type" => {
                let parts = self.named(node);
                let [left, right] = parts.as_slice() else {
                    return Err(self.error_at(node, "malformed union type"));
                };
                Ok(Node::new("BinOp")
                    .with("left", self.lower_type(*left)?)
                    .with("op", Tree::leaf("BitOr"))
                    .with("right", self.lower_type(*right)?)
                    .into())
            }
            "member_type" => {
                let parts = self.named(node);
                let [value, attr] = parts.as_slice() else {
                    return Err(self.error_at(node, "malformed member type"));
                };
                Ok(Node::new("Attribute")
                    .with("value", self.lower_type(*value)?)
                    .with("attr", self.text(*attr))
                    .with("ctx", Ctx::Load.leaf())
                    .into())
            }
            "splat_type" => Ok(Node::new("Starred")
                .with("value", self.lower_type(self.first_named(node)?)?)
                .with("ctx", Ctx::Load.leaf())
                .into()),
            _ => self.lower_expr(node, Ctx::Load),
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Lowers one literal or an implicit concatenation of several.
    fn lower_strings(&self, nodes: &[CstNode]) -> Result<Tree, ParseError> {
        let mut pieces = Vec::new();
        let mut formatted = false;
        let mut bytes = false;
        let mut unicode = false;

        for (idx, node) in nodes.iter().enumerate() {
            let prefix = self.string_prefix(*node);
            formatted |= prefix.format;
            bytes |= prefix.bytes;
            // Only the first literal's `u` prefix is recorded.
            unicode |= idx == 0 && prefix.unicode;
            self.string_pieces(*node, prefix, &mut pieces)?;
        }

        if formatted {
            return Ok(joined_str(pieces));
        }

        let text: String = pieces
            .into_iter()
            .filter_map(|piece| match piece {
                Piece::Text(text) => Some(text),
                Piece::Value(_) => None,
            })
            .collect();

        if bytes {
            return Ok(constant(scalar("bytes", text)));
        }
        Ok(Node::new("Constant")
            .with("value", text)
            .with("kind", if unicode { Tree::str("u") } else { Tree::Absent })
            .into())
    }

    fn string_prefix(&self, node: CstNode) -> Prefix {
        self.children(node)
            .into_iter()
            .find(|c| c.kind() == "string_start")
            .map(|start| Prefix::parse(self.text(start)))
            .unwrap_or_default()
    }

    /// Splits a literal's body into text and interpolations.
    fn string_pieces(
        &self,
        node: CstNode,
        prefix: Prefix,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), ParseError> {
        let children = self.children(node);
        let body_start = children
            .iter()
            .find(|c| c.kind() == "string_start")
            .map_or(node.start_byte(), |c| c.end_byte());
        let body_end = children
            .iter()
            .rev()
            .find(|c| c.kind() == "string_end")
            .map_or(node.end_byte(), |c| c.start_byte());

        let interpolations: Vec<CstNode> = children
            .into_iter()
            .filter(|c| c.kind() == "interpolation")
            .collect();
        self.literal_pieces(node, body_start, body_end, &interpolations, prefix, pieces)
    }

    /// Emits the text of `literal` between `start` and `end`, with
    /// `interpolations` (sorted, inside the range) replaced by formatted values.
    fn literal_pieces(
        &self,
        literal: CstNode,
        start: usize,
        end: usize,
        interpolations: &[CstNode],
        prefix: Prefix,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), ParseError> {
        let mut cursor = start;
        for interpolation in interpolations {
            self.push_text(literal, cursor, interpolation.start_byte(), prefix, pieces)?;
            self.lower_interpolation(*interpolation, prefix, pieces)?;
            cursor = interpolation.end_byte();
        }
        self.push_text(literal, cursor, end, prefix, pieces)
    }

    fn push_text(
        &self,
        literal: CstNode,
        start: usize,
        end: usize,
        prefix: Prefix,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), ParseError> {
        let Some(raw) = self.source.get(start..end) else {
            return Ok(());
        };
        let raw = if prefix.format {
            unescape_braces(raw)
        } else {
            raw.to_string()
        };
        let text = if prefix.raw {
            raw
        } else {
            decode_escapes(&raw, prefix.bytes)
                .map_err(|err| self.error_at(literal, err.to_string()))?
        };
        pieces.push(Piece::Text(text));
        Ok(())
    }

    fn lower_interpolation(
        &self,
        node: CstNode,
        prefix: Prefix,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), ParseError> {
        let expression = self.field(node, "expression")?;
        let conversion_node = node.child_by_field_name("type_conversion");
        let format_node = node.child_by_field_name("format_specifier");

        let mut conversion = conversion_node
            .and_then(|c| self.text(c).chars().last())
            .map_or(-1, |c| c as i64);

        // `f"{x=}"` keeps the expression text and defaults to repr.
        let debug_eq = self
            .children(node)
            .into_iter()
            .find(|c| !c.is_named() && c.kind() == "=");
        if let Some(eq) = debug_eq {
            let open = node.start_byte() + 1;
            let label = self.source.get(open..eq.end_byte()).unwrap_or("");
            pieces.push(Piece::Text(label.to_string()));
            if conversion == -1 && format_node.is_none() {
                conversion = 'r' as i64;
            }
        }

        let format_spec = match format_node {
            Some(spec) => {
                let mut spec_pieces = Vec::new();
                let nested: Vec<CstNode> = self
                    .named(spec)
                    .into_iter()
                    .filter(|c| c.kind() == "interpolation")
                    .collect();
                // Skip the leading ':'.
                let start = (spec.start_byte() + 1).min(spec.end_byte());
                let spec_prefix = Prefix {
                    raw: true,
                    ..prefix
                };
                self.literal_pieces(
                    spec,
                    start,
                    spec.end_byte(),
                    &nested,
                    spec_prefix,
                    &mut spec_pieces,
                )?;
                joined_str(spec_pieces)
            }
            None => Tree::Absent,
        };

        let value = Node::new("FormattedValue")
            .with("value", self.lower_expr(expression, Ctx::Load)?)
            .with("conversion", int(conversion))
            .with("format_spec", format_spec);
        pieces.push(Piece::Value(value.into()));
        Ok(())
    }
}

/// Builds a `JoinedStr`, merging adjacent text and dropping empty text.
fn joined_str(pieces: Vec<Piece>) -> Tree {
    let mut values = Vec::new();
    let mut text = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(chunk) => text.push_str(&chunk),
            Piece::Value(value) => {
                if !text.is_empty() {
                    values.push(constant(Tree::Str(std::mem::take(&mut text))));
                }
                values.push(value);
            }
        }
    }
    if !text.is_empty() {
        values.push(constant(Tree::Str(text)));
    }
    Node::new("JoinedStr").with("values", values).into()
}

/// Parameter lists collected into the shape of `ast.arguments`.
#[derive(Default)]
struct Signature {
    posonlyargs: Vec<Tree>,
    args: Vec<Tree>,
    vararg: Tree,
    kwonlyargs: Vec<Tree>,
    kw_defaults: Vec<Tree>,
    kwarg: Tree,
    defaults: Vec<Tree>,
    keyword_only: bool,
}

impl Signature {
    fn push(&mut self, arg: Tree, default: Option<Tree>) {
        if self.keyword_only {
            self.kwonlyargs.push(arg);
            self.kw_defaults.push(default.into());
        } else {
            self.args.push(arg);
            self.defaults.extend(default);
        }
    }

    fn into_tree(self) -> Tree {
        Node::new("arguments")
            .with("posonlyargs", self.posonlyargs)
            .with("args", self.args)
            .with("vararg", self.vararg)
            .with("kwonlyargs", self.kwonlyargs)
            .with("kw_defaults", self.kw_defaults)
            .with("kwarg", self.kwarg)
            .with("defaults", self.defaults)
            .into()
    }
}

/// First ERROR or MISSING node in document order.
fn first_error(root: CstNode) -> Option<CstNode> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        // Skip this subtree: next sibling, or the nearest ancestor's.
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
