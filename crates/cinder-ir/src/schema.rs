//! Schema table: node kind to ordered field list.
//!
//! The encoder emits exactly the fields listed here, in this order. Fields a
//! node carries but the table omits are dropped from the output, which lets
//! the table leave out positional or redundant data.
//!
//! The built-in table covers Python's abstract grammar. Extra kinds can be
//! loaded from TOML:
//!
//! ```toml
//! [kinds]
//! NamedExpr = ["target", "value"]
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Built-in Python table, grouped as in the abstract grammar.
const PYTHON: &[(&str, &[&str])] = &[
    // mod
    ("Module", &["body"]),
    ("Interactive", &["body"]),
    ("Expression", &["body"]),
    ("Suite", &["body"]),
    // stmt
    ("FunctionDef", &["name", "args", "body", "decorator_list", "returns"]),
    ("AsyncFunctionDef", &["name", "args", "body", "decorator_list", "returns"]),
    ("ClassDef", &["name", "bases", "keywords", "body", "decorator_list"]),
    ("Return", &["value"]),
    ("Delete", &["targets"]),
    ("Assign", &["targets", "value"]),
    ("AugAssign", &["target", "op", "value"]),
    ("AnnAssign", &["target", "annotation", "value", "simple"]),
    ("For", &["target", "iter", "body", "orelse"]),
    ("AsyncFor", &["target", "iter", "body", "orelse"]),
    ("While", &["test", "body", "orelse"]),
    ("If", &["test", "body", "orelse"]),
    ("With", &["items", "body"]),
    ("AsyncWith", &["items", "body"]),
    ("Raise", &["exc", "cause"]),
    ("Try", &["body", "handlers", "orelse", "finalbody"]),
    ("Assert", &["test", "msg"]),
    ("Import", &["names"]),
    ("ImportFrom", &["module", "names", "level"]),
    ("Global", &["names"]),
    ("Nonlocal", &["names"]),
    ("Expr", &["value"]),
    ("Pass", &[]),
    ("Break", &[]),
    ("Continue", &[]),
    // expr
    ("BoolOp", &["op", "values"]),
    ("BinOp", &["left", "op", "right"]),
    ("UnaryOp", &["op", "operand"]),
    ("Lambda", &["args", "body"]),
    ("IfExp", &["test", "body", "orelse"]),
    ("Dict", &["keys", "values"]),
    ("Set", &["elts"]),
    ("ListComp", &["elt", "generators"]),
    ("SetComp", &["elt", "generators"]),
    ("DictComp", &["key", "value", "generators"]),
    ("GeneratorExp", &["elt", "generators"]),
    ("Await", &["value"]),
    ("Yield", &["value"]),
    ("YieldFrom", &["value"]),
    ("Compare", &["left", "ops", "comparators"]),
    ("Call", &["func", "args", "keywords"]),
    ("Num", &["n"]),
    ("Str", &["s"]),
    ("FormattedValue", &["value", "conversion", "format_spec"]),
    ("JoinedStr", &["values"]),
    ("Bytes", &["s"]),
    ("NameConstant", &["value"]),
    ("Ellipsis", &[]),
    ("Constant", &["value"]),
    ("Attribute", &["value", "attr", "ctx"]),
    ("Subscript", &["value", "slice", "ctx"]),
    ("Starred", &["value", "ctx"]),
    ("Name", &["id", "ctx"]),
    ("List", &["elts", "ctx"]),
    ("Tuple", &["elts", "ctx"]),
    // expr_context
    ("Load", &[]),
    ("Store", &[]),
    ("Del", &[]),
    ("AugLoad", &[]),
    ("AugStore", &[]),
    ("Param", &[]),
    // slice
    ("Slice", &["lower", "upper", "step"]),
    ("ExtSlice", &["dims"]),
    ("Index", &["value"]),
    // boolop
    ("And", &[]),
    ("Or", &[]),
    // operator (no `Add`: `+` renders as `#<Add>`)
    ("Sub", &[]),
    ("Mult", &[]),
    ("MatMult", &[]),
    ("Div", &[]),
    ("Mod", &[]),
    ("Pow", &[]),
    ("LShift", &[]),
    ("RShift", &[]),
    ("BitOr", &[]),
    ("BitXor", &[]),
    ("BitAnd", &[]),
    ("FloorDiv", &[]),
    // unaryop
    ("Invert", &[]),
    ("Not", &[]),
    ("UAdd", &[]),
    ("USub", &[]),
    // cmpop
    ("Eq", &[]),
    ("NotEq", &[]),
    ("Lt", &[]),
    ("LtE", &[]),
    ("Gt", &[]),
    ("GtE", &[]),
    ("Is", &[]),
    ("IsNot", &[]),
    ("In", &[]),
    ("NotIn", &[]),
    // misc
    ("comprehension", &["target", "iter", "ifs", "is_async"]),
    ("ExceptHandler", &["type", "name", "body"]),
    (
        "arguments",
        &["args", "vararg", "kwonlyargs", "kw_defaults", "kwarg", "defaults"],
    ),
    ("arg", &["arg", "annotation"]),
    ("keyword", &["arg", "value"]),
    ("alias", &["name", "asname"]),
    ("withitem", &["context_expr", "optional_vars"]),
];

/// Errors that can occur while loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid schema file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("field '{field}' listed twice for kind {kind}")]
    DuplicateField { kind: String, field: String },
}

/// On-disk schema format.
#[derive(Debug, Clone, Default, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    kinds: BTreeMap<String, Vec<String>>,
}

/// Mapping from node kind to its ordered field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    kinds: HashMap<String, Vec<String>>,
}

impl Schema {
    /// An empty schema: every node kind is unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table for Python's abstract grammar.
    pub fn python() -> Self {
        let kinds = PYTHON
            .iter()
            .map(|(kind, fields)| {
                let fields = fields.iter().map(|f| f.to_string()).collect();
                (kind.to_string(), fields)
            })
            .collect();
        Schema { kinds }
    }

    /// Parse a schema from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(contents)?;
        let mut schema = Schema::empty();
        for (kind, fields) in file.kinds {
            schema.insert(kind, fields)?;
        }
        Ok(schema)
    }

    /// Load a schema from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Adds or replaces the entry for `kind`.
    pub fn insert(
        &mut self,
        kind: impl Into<String>,
        fields: Vec<String>,
    ) -> Result<(), SchemaError> {
        let kind = kind.into();
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: field.clone(),
                });
            }
        }
        self.kinds.insert(kind, fields);
        Ok(())
    }

    /// Merges `other` into this schema. Entries in `other` replace existing
    /// entries for the same kind wholesale.
    pub fn extend(&mut self, other: Schema) {
        self.kinds.extend(other.kinds);
    }

    /// Returns the ordered field list for `kind`.
    pub fn fields(&self, kind: &str) -> Option<&[String]> {
        self.kinds.get(kind).map(Vec::as_slice)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// All known kinds, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        let mut kinds: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_field_order() {
        let schema = Schema::python();
        assert_eq!(
            schema.fields("FunctionDef").unwrap(),
            ["name", "args", "body", "decorator_list", "returns"]
        );
        assert_eq!(schema.fields("If").unwrap(), ["test", "body", "orelse"]);
        assert!(schema.fields("Pass").unwrap().is_empty());
    }

    #[test]
    fn test_python_has_no_duplicate_kinds() {
        let schema = Schema::python();
        assert_eq!(schema.len(), PYTHON.len());
    }

    #[test]
    fn test_exact_lookup_only() {
        let schema = Schema::python();
        assert!(schema.contains("Name"));
        assert!(!schema.contains("name"));
        assert!(!schema.contains("NamedExpr"));
        assert!(!schema.contains("Match"));
    }

    #[test]
    fn test_python_operator_group_has_no_add() {
        let schema = Schema::python();
        assert!(!schema.contains("Add"));
        assert!(schema.contains("Sub"));
        assert!(schema.contains("UAdd"));
    }

    #[test]
    fn test_from_toml() {
        let schema = Schema::from_toml_str(
            r#"
            [kinds]
            NamedExpr = ["target", "value"]
            Pass = []
            "#,
        )
        .unwrap();
        assert_eq!(schema.fields("NamedExpr").unwrap(), ["target", "value"]);
        assert_eq!(schema.kinds().collect::<Vec<_>>(), ["NamedExpr", "Pass"]);
    }

    #[test]
    fn test_from_toml_rejects_duplicate_fields() {
        let err = Schema::from_toml_str("[kinds]\nCall = [\"func\", \"func\"]\n").unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref field, .. } if field == "func"));
    }

    #[test]
    fn test_from_toml_rejects_bad_syntax() {
        let err = Schema::from_toml_str("[kinds\n").unwrap_err();
        assert!(matches!(err, SchemaError::Toml(_)));
    }

    #[test]
    fn test_extend_replaces_whole_entry() {
        let mut schema = Schema::python();
        let extra = Schema::from_toml_str("[kinds]\nName = [\"id\"]\nMatch = [\"subject\"]\n").unwrap();
        schema.extend(extra);
        assert_eq!(schema.fields("Name").unwrap(), ["id"]);
        assert_eq!(schema.fields("Match").unwrap(), ["subject"]);
        assert_eq!(schema.len(), PYTHON.len() + 1);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        fs::write(&path, "[kinds]\nTypeAlias = [\"name\", \"value\"]\n").unwrap();
        let schema = Schema::from_file(&path).unwrap();
        assert!(schema.contains("TypeAlias"));

        let missing = Schema::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, SchemaError::Io(_)));
    }
}
