//! Tests for the tree encoder.

use crate::*;

fn py(tree: &Tree) -> String {
    to_sexp_string(tree, &Schema::python())
}

fn pass() -> Tree {
    Tree::leaf("Pass")
}

fn name(id: &str, ctx: &str) -> Tree {
    Node::new("Name").with("id", id).with("ctx", Tree::leaf(ctx)).into()
}

#[test]
fn test_scalars() {
    assert_eq!(py(&Tree::str("hello")), r#""hello""#);
    assert_eq!(py(&Tree::str(r#"a"b\c"#)), r#""a\"b\\c""#);
    assert_eq!(py(&Tree::str("")), r#""""#);
}

#[test]
fn test_absent_and_empty_sequence_differ() {
    assert_eq!(py(&Tree::Absent), "nil");
    assert_eq!(py(&Tree::seq([])), "()");
    assert_eq!(encode(&Tree::Absent, &Schema::python()), SExpr::Nil);
    assert_eq!(encode(&Tree::seq([]), &Schema::python()), SExpr::List(vec![]));
}

#[test]
fn test_module_with_pass() {
    let tree: Tree = Node::new("Module").with("body", vec![pass()]).into();
    assert_eq!(py(&tree), "(Module :body ((Pass)))");
}

#[test]
fn test_if_statement() {
    let tree: Tree = Node::new("If")
        .with("test", "x")
        .with("body", vec![pass()])
        .with("orelse", Tree::seq([]))
        .into();
    assert_eq!(py(&tree), r#"(If :test "x" :body ((Pass)) :orelse ())"#);
}

#[test]
fn test_field_order_follows_schema() {
    // Insert fields in reverse order; output order must not change.
    let forward: Tree = Node::new("BinOp")
        .with("left", name("a", "Load"))
        .with("op", Tree::leaf("Add"))
        .with("right", name("b", "Load"))
        .into();
    let mut reversed = Node::new("BinOp");
    for (field, value) in [
        ("right", name("b", "Load")),
        ("op", Tree::leaf("Add")),
        ("left", name("a", "Load")),
    ] {
        reversed = reversed.with(field, value);
    }

    let expected = r#"(BinOp :left (Name :id "a" :ctx (Load)) :op #<Add> :right (Name :id "b" :ctx (Load)))"#;
    assert_eq!(py(&forward), expected);
    assert_eq!(py(&reversed.into()), expected);
}

#[test]
fn test_missing_field_encodes_as_nil() {
    let tree: Tree = Node::new("Return").into();
    assert_eq!(py(&tree), "(Return :value nil)");
}

#[test]
fn test_unlisted_fields_are_dropped() {
    let tree: Tree = Node::new("Module")
        .with("body", Tree::seq([]))
        .with("type_ignores", vec![Tree::leaf("TypeIgnore")])
        .into();
    assert_eq!(py(&tree), "(Module :body ())");
}

#[test]
fn test_unknown_kind_placeholder_keeps_siblings() {
    let tree: Tree = Node::new("Module")
        .with(
            "body",
            vec![
                pass(),
                Node::new("Match").with("subject", name("x", "Load")).into(),
                Tree::leaf("Break"),
            ],
        )
        .into();
    assert_eq!(py(&tree), "(Module :body ((Pass) #<Match> (Break)))");
}

#[test]
fn test_unknown_scalar_kinds() {
    let tree: Tree = Node::new("Constant")
        .with("value", Node::new("int").with("value", "42"))
        .into();
    assert_eq!(py(&tree), "(Constant :value #<int>)");
}

#[test]
fn test_nested_sequences() {
    let tree = Tree::seq([Tree::seq([]), Tree::seq([Tree::str("a"), Tree::Absent])]);
    assert_eq!(py(&tree), r#"(() ("a" nil))"#);
}

#[test]
fn test_deterministic() {
    let tree: Tree = Node::new("Call")
        .with("func", name("f", "Load"))
        .with("args", vec![name("x", "Load")])
        .with(
            "keywords",
            vec![Tree::from(Node::new("keyword").with("arg", "k").with("value", name("y", "Load")))],
        )
        .into();
    let first = py(&tree);
    let second = py(&tree);
    assert_eq!(first, second);
    assert_eq!(
        first,
        r#"(Call :func (Name :id "f" :ctx (Load)) :args ((Name :id "x" :ctx (Load))) :keywords ((keyword :arg "k" :value (Name :id "y" :ctx (Load)))))"#
    );
}

#[test]
fn test_empty_schema_makes_everything_placeholder() {
    let tree: Tree = Node::new("Module").with("body", vec![pass()]).into();
    assert_eq!(to_sexp_string(&tree, &Schema::empty()), "#<Module>");
}

#[test]
fn test_schema_extension_replaces_placeholder() {
    let tree: Tree = Node::new("NamedExpr")
        .with("target", name("y", "Store"))
        .with("value", "v")
        .into();
    let mut schema = Schema::python();
    assert_eq!(to_sexp_string(&tree, &schema), "#<NamedExpr>");

    schema.extend(Schema::from_toml_str("[kinds]\nNamedExpr = [\"target\", \"value\"]\n").unwrap());
    assert_eq!(
        to_sexp_string(&tree, &schema),
        r#"(NamedExpr :target (Name :id "y" :ctx (Store)) :value "v")"#
    );
}

#[test]
fn test_add_operator_opt_in() {
    let tree: Tree = Node::new("BinOp")
        .with("left", name("a", "Load"))
        .with("op", Tree::leaf("Add"))
        .with("right", name("b", "Load"))
        .into();
    let mut schema = Schema::python();
    assert!(to_sexp_string(&tree, &schema).contains(":op #<Add> :right"));

    schema.extend(Schema::from_toml_str("[kinds]\nAdd = []\n").unwrap());
    assert!(to_sexp_string(&tree, &schema).contains(":op (Add) :right"));
}

#[test]
fn test_unknown_kinds_collection() {
    let tree: Tree = Node::new("Module")
        .with(
            "body",
            vec![
                Tree::from(
                    Node::new("Expr")
                        .with("value", Node::new("Constant").with("value", Tree::leaf("int"))),
                ),
                Tree::leaf("Match"),
                Tree::leaf("Match"),
            ],
        )
        // Not in Module's field list, so never visited.
        .with("type_ignores", vec![Tree::leaf("TypeIgnore")])
        .into();
    let schema = Schema::python();
    let unknown = Encoder::new(&schema).unknown_kinds(&tree);
    assert_eq!(unknown.into_iter().collect::<Vec<_>>(), ["Match", "int"]);
}

#[test]
fn test_sexpr_structure_is_reusable() {
    let tree: Tree = Node::new("Name").with("id", "x").with("ctx", Tree::leaf("Load")).into();
    let expr = encode(&tree, &Schema::python());
    assert_eq!(expr.head(), Some("Name"));
    assert_eq!(expr.field("id"), Some(&SExpr::string("x")));
    assert_eq!(expr.field("ctx").and_then(SExpr::head), Some("Load"));
}

#[test]
fn test_tree_json_roundtrip() {
    let tree: Tree = Node::new("Module")
        .with("body", vec![Tree::from(Node::new("Return").with("value", Tree::Absent))])
        .into();
    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(
        json,
        r#"{"kind":"Module","fields":{"body":[{"kind":"Return","fields":{"value":null}}]}}"#
    );
    let parsed: Tree = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, tree);
}

#[test]
fn test_tree_json_fields_optional() {
    let parsed: Tree = serde_json::from_str(r#"[{"kind": "Pass"}, "s", null, []]"#).unwrap();
    assert_eq!(
        parsed,
        Tree::seq([pass(), Tree::str("s"), Tree::Absent, Tree::seq([])])
    );
}
