//! Lexical scan of query documents for type conditions.
//!
//! A query that selects fields on a union member through `... on T` (or a
//! `fragment F on T`) depends on `T` even when the cached payload happened
//! to contain no `T` entity. This is a token scan, not a parser: it only
//! has to recognise type conditions, and skips comments and strings so text
//! inside them never counts.

use std::collections::BTreeSet;

use super::keys::TypeTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Spread,
    Punct,
}

/// Collect the type names used as fragment type conditions in `document`.
pub fn fragment_type_conditions(document: &str) -> BTreeSet<TypeTag> {
    let tokens = tokenize(document);
    let mut tags = BTreeSet::new();

    for (i, token) in tokens.iter().enumerate() {
        if *token != Token::Name("on") {
            continue;
        }

        let after_spread = i >= 1 && tokens[i - 1] == Token::Spread;
        let after_fragment_name = i >= 2
            && tokens[i - 2] == Token::Name("fragment")
            && matches!(tokens[i - 1], Token::Name(_));

        if (after_spread || after_fragment_name)
            && let Some(Token::Name(name)) = tokens.get(i + 1)
        {
            tags.insert(TypeTag::from(*name));
        }
    }

    tags
}

fn tokenize(document: &str) -> Vec<Token<'_>> {
    let bytes = document.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'"' => {
                i = skip_string(bytes, i);
                tokens.push(Token::Punct);
            }
            b'.' if bytes[i..].starts_with(b"...") => {
                tokens.push(Token::Spread);
                i += 3;
            }
            b if b == b'_' || b.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && (bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Token::Name(&document[start..i]));
            }
            b if b == b'-' || b.is_ascii_digit() => {
                i += 1;
                while i < bytes.len() {
                    let c = bytes[i];
                    let exponent_sign =
                        (c == b'+' || c == b'-') && matches!(bytes[i - 1], b'e' | b'E');
                    if c.is_ascii_alphanumeric() || c == b'.' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Punct);
            }
            b if b == b',' || b.is_ascii_whitespace() => i += 1,
            _ => {
                tokens.push(Token::Punct);
                i += 1;
            }
        }
    }

    tokens
}

/// Return the index just past the string literal starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    if bytes[start..].starts_with(b"\"\"\"") {
        let mut i = start + 3;
        while i < bytes.len() {
            if bytes[i..].starts_with(b"\\\"\"\"") {
                i += 4;
            } else if bytes[i..].starts_with(b"\"\"\"") {
                return i + 3;
            } else {
                i += 1;
            }
        }
        return bytes.len();
    }

    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' | b'\n' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}
