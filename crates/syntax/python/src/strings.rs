//! Python string literal handling: prefixes and escape sequences.

use thiserror::Error;

/// A `\N{...}` escape that names no character.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum EscapeError {
    #[error("unknown Unicode character name '{0}'")]
    UnknownName(String),

    #[error("malformed \\N character escape")]
    MalformedName,
}

/// Flags parsed from a literal's prefix (`rb`, `f`, `U`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Prefix {
    pub raw: bool,
    pub bytes: bool,
    pub format: bool,
    pub unicode: bool,
}

impl Prefix {
    /// Parses the `string_start` token, e.g. `rb"""` or `f'`.
    pub fn parse(start: &str) -> Self {
        let mut prefix = Prefix::default();
        for c in start.chars().take_while(|c| *c != '"' && *c != '\'') {
            match c.to_ascii_lowercase() {
                'r' => prefix.raw = true,
                'b' => prefix.bytes = true,
                'f' => prefix.format = true,
                'u' => prefix.unicode = true,
                _ => {}
            }
        }
        prefix
    }
}

/// Replaces `{{` and `}}` in f-string literal text.
pub(crate) fn unescape_braces(text: &str) -> String {
    text.replace("{{", "{").replace("}}", "}")
}

/// Decodes backslash escapes the way CPython does for non-raw literals.
///
/// Unknown escapes are kept verbatim. `\N{...}`, `\u` and `\U` only apply
/// to text literals, not bytes.
pub(crate) fn decode_escapes(raw: &str, bytes: bool) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                push_code(&mut out, value);
            }
            'x' => push_hex(&mut out, &mut chars, 'x', 2),
            'u' if !bytes => push_hex(&mut out, &mut chars, 'u', 4),
            'U' if !bytes => push_hex(&mut out, &mut chars, 'U', 8),
            'N' if !bytes => out.push(named_char(&mut chars)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

/// Reads `{NAME}` after `\N` and resolves it.
fn named_char(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<char, EscapeError> {
    if chars.next_if_eq(&'{').is_none() {
        return Err(EscapeError::MalformedName);
    }
    let mut name = String::new();
    loop {
        match chars.next() {
            Some('}') if !name.is_empty() => break,
            Some('}') | None => return Err(EscapeError::MalformedName),
            Some(c) => name.push(c),
        }
    }
    unicode_names2::character(&name).ok_or(EscapeError::UnknownName(name))
}

fn push_hex(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    width: usize,
) {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }

    match u32::from_str_radix(&digits, 16) {
        Ok(value) if digits.len() == width => push_code(out, value),
        _ => {
            // Truncated escape: keep the source text.
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

fn push_code(out: &mut String, value: u32) {
    out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(Prefix::parse("\""), Prefix::default());
        let rb = Prefix::parse("Rb'''");
        assert!(rb.raw && rb.bytes && !rb.format);
        assert!(Prefix::parse("f\"").format);
        assert!(Prefix::parse("u'").unicode);
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(decode_escapes(r#"a\nb\tc\\d\"e\'"#, false).unwrap(), "a\nb\tc\\d\"e'");
        assert_eq!(decode_escapes(r"\a\b\f\v\r", false).unwrap(), "\x07\x08\x0c\x0b\r");
    }

    #[test]
    fn test_numeric_escapes() {
        assert_eq!(decode_escapes(r"\x41\101\0", false).unwrap(), "AA\0");
        assert_eq!(decode_escapes(r"\u00e9\U0001F600", false).unwrap(), "é😀");
        assert_eq!(decode_escapes(r"\u00e9", true).unwrap(), r"\u00e9");
    }

    #[test]
    fn test_unknown_and_truncated_escapes() {
        assert_eq!(decode_escapes(r"\d\q", false).unwrap(), r"\d\q");
        assert_eq!(decode_escapes(r"\x4", false).unwrap(), r"\x4");
        assert_eq!(decode_escapes("end\\", false).unwrap(), "end\\");
    }

    #[test]
    fn test_named_escapes() {
        assert_eq!(decode_escapes(r"a\N{EM DASH}b", false).unwrap(), "a\u{2014}b");
        assert_eq!(decode_escapes(r"\N{LATIN SMALL LETTER E WITH ACUTE}", false).unwrap(), "\u{e9}");
        // Bytes have no named escapes.
        assert_eq!(decode_escapes(r"\N{EM DASH}", true).unwrap(), r"\N{EM DASH}");
    }

    #[test]
    fn test_bad_named_escapes() {
        assert_eq!(
            decode_escapes(r"\N{NO SUCH CHARACTER}", false),
            Err(EscapeError::UnknownName("NO SUCH CHARACTER".into()))
        );
        assert_eq!(decode_escapes(r"\Nx", false), Err(EscapeError::MalformedName));
        assert_eq!(decode_escapes(r"\N{}", false), Err(EscapeError::MalformedName));
        assert_eq!(decode_escapes(r"\N{EM DASH", false), Err(EscapeError::MalformedName));
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(decode_escapes("a\\\nb", false).unwrap(), "ab");
        assert_eq!(decode_escapes("a\\\r\nb", false).unwrap(), "ab");
    }

    #[test]
    fn test_braces() {
        assert_eq!(unescape_braces("{{x}}"), "{x}");
    }
}
