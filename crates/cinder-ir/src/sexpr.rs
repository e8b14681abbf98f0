//! Rendered form and the one-line text renderer.

use std::fmt;

/// Intermediate tagged-list form produced by the encoder.
///
/// Strings are kept unescaped; quoting happens at render time so another
/// renderer can reuse the structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    /// The absence token `nil`.
    Nil,
    /// A bare symbol, used for node kind names.
    Symbol(String),
    /// A field marker, rendered with a leading colon.
    Keyword(String),
    /// A string literal, rendered quoted and escaped.
    Str(String),
    /// Stand-in for a node kind the schema does not know.
    Placeholder(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn symbol(name: impl Into<String>) -> Self {
        SExpr::Symbol(name.into())
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        SExpr::Keyword(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        SExpr::Str(value.into())
    }

    pub fn placeholder(kind: impl Into<String>) -> Self {
        SExpr::Placeholder(kind.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, SExpr::Nil)
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the kind name if this is a tagged list.
    pub fn head(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            SExpr::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Returns the value following the `:name` marker of a tagged list.
    pub fn field(&self, name: &str) -> Option<&SExpr> {
        let items = self.as_list()?;
        self.head()?;
        items[1..]
            .chunks(2)
            .find(|pair| matches!(&pair[0], SExpr::Keyword(k) if k == name))
            .and_then(|pair| pair.get(1))
    }
}

/// Quotes a string, doubling backslashes and escaping double quotes.
///
/// No other character is touched, so control characters and non-ASCII text
/// pass through verbatim.
pub fn escape_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    push_escaped(value, &mut out);
    out
}

fn push_escaped(value: &str, out: &mut String) {
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Renders an S-expression as a single line of text.
pub fn render(expr: &SExpr) -> String {
    let mut out = String::new();
    render_into(expr, &mut out);
    out
}

/// Appends the rendering of `expr` to `out`.
pub fn render_into(expr: &SExpr, out: &mut String) {
    match expr {
        SExpr::Nil => out.push_str("nil"),
        SExpr::Symbol(name) => out.push_str(name),
        SExpr::Keyword(name) => {
            out.push(':');
            out.push_str(name);
        }
        SExpr::Str(value) => push_escaped(value, out),
        SExpr::Placeholder(kind) => {
            out.push_str("#<");
            out.push_str(kind);
            out.push('>');
        }
        SExpr::List(items) => {
            out.push('(');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                render_into(item, out);
            }
            out.push(')');
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes_and_backslashes() {
        assert_eq!(escape_str(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(escape_str(""), r#""""#);
    }

    #[test]
    fn test_escape_leaves_other_characters() {
        assert_eq!(escape_str("tab\there\nü"), "\"tab\there\nü\"");
    }

    #[test]
    fn test_render_atoms() {
        assert_eq!(render(&SExpr::Nil), "nil");
        assert_eq!(render(&SExpr::symbol("Pass")), "Pass");
        assert_eq!(render(&SExpr::keyword("body")), ":body");
        assert_eq!(render(&SExpr::placeholder("Match")), "#<Match>");
    }

    #[test]
    fn test_render_lists() {
        assert_eq!(render(&SExpr::List(vec![])), "()");
        let expr = SExpr::List(vec![
            SExpr::symbol("Name"),
            SExpr::keyword("id"),
            SExpr::string("x"),
            SExpr::keyword("ctx"),
            SExpr::List(vec![SExpr::symbol("Load")]),
        ]);
        assert_eq!(expr.to_string(), r#"(Name :id "x" :ctx (Load))"#);
    }

    #[test]
    fn test_field_lookup() {
        let expr = SExpr::List(vec![
            SExpr::symbol("Return"),
            SExpr::keyword("value"),
            SExpr::Nil,
        ]);
        assert_eq!(expr.head(), Some("Return"));
        assert_eq!(expr.field("value"), Some(&SExpr::Nil));
        assert_eq!(expr.field("other"), None);
        assert_eq!(SExpr::List(vec![]).head(), None);
    }
}
