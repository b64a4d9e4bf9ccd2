//! CSS tokenizer and block parser.
//!
//! A small hand-rolled parser: comments are stripped, then blocks are walked
//! by brace matching. Structure (selectors, nesting, declaration boundaries)
//! is recovered exactly; values are kept as raw text for the rewriter.

use smallvec::SmallVec;
use tracing::trace;

use crate::{CssError, CssItem, Declaration, GroupRule, Rule};

pub(crate) fn parse_items(css: &str) -> Result<Vec<CssItem>, CssError> {
    let clean = strip_comments(css);
    parse_block_items(&clean)
}

fn parse_block_items(input: &str) -> Result<Vec<CssItem>, CssError> {
    let mut items = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        if bytes[pos] == b'@' {
            match find_prelude_end(input, pos)? {
                PreludeEnd::Statement(semi) => {
                    items.push(CssItem::Raw(input[pos..=semi].trim().to_string()));
                    pos = semi + 1;
                }
                PreludeEnd::Block(brace) => {
                    let prelude = input[pos..brace].trim().to_string();
                    let end = find_matching_brace(input, brace)?;
                    let inner = &input[brace + 1..end];
                    if is_conditional_group(&prelude) {
                        items.push(CssItem::Group(GroupRule {
                            condition: prelude,
                            items: parse_block_items(inner)?,
                        }));
                    } else {
                        // @font-face, @keyframes etc. pass through untouched.
                        items.push(CssItem::Raw(input[pos..=end].trim().to_string()));
                    }
                    pos = end + 1;
                }
            }
        } else {
            let Some(brace) = find_unquoted(input, pos, b'{') else {
                // Trailing text without a block; real sheets end in
                // whitespace, broken ones get ignored from here on.
                trace!(rest = &input[pos..].trim(), "ignoring trailing css text");
                break;
            };
            let selector = input[pos..brace].trim().to_string();
            let end = find_matching_brace(input, brace)?;
            let declarations = parse_declaration_block(&input[brace + 1..end]);
            if !selector.is_empty() {
                items.push(CssItem::Style(Rule {
                    selector,
                    declarations,
                }));
            }
            pos = end + 1;
        }
    }

    Ok(items)
}

enum PreludeEnd {
    /// Statement at-rule terminated by `;`.
    Statement(usize),
    /// Block at-rule; index of the opening `{`.
    Block(usize),
}

fn find_prelude_end(input: &str, from: usize) -> Result<PreludeEnd, CssError> {
    let bytes = input.as_bytes();
    let mut i = from;
    let mut quote: Option<u8> = None;
    let mut parens = 0i32;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' => parens += 1,
                b')' => parens -= 1,
                b';' if parens == 0 => return Ok(PreludeEnd::Statement(i)),
                b'{' if parens == 0 => return Ok(PreludeEnd::Block(i)),
                _ => {}
            },
        }
        i += 1;
    }
    Err(CssError::ParseError(format!(
        "unterminated at-rule: {}",
        input[from..].trim()
    )))
}

/// Find the `}` matching the `{` at `open`, skipping quoted strings.
fn find_matching_brace(input: &str, open: usize) -> Result<usize, CssError> {
    let bytes = input.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    Err(CssError::ParseError("unbalanced block".to_string()))
}

fn find_unquoted(input: &str, from: usize, target: u8) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == target {
                    return Some(i);
                }
                if c == b'"' || c == b'\'' {
                    quote = Some(c);
                }
            }
        }
        i += 1;
    }
    None
}

fn is_conditional_group(prelude: &str) -> bool {
    prelude.starts_with("@media")
        || prelude.starts_with("@supports")
        || prelude.starts_with("@container")
        || prelude.starts_with("@layer")
}

fn parse_declaration_block(block: &str) -> SmallVec<[Declaration; 8]> {
    let mut declarations = SmallVec::new();
    for chunk in split_declarations(block) {
        if let Some(decl) = parse_declaration(&chunk) {
            declarations.push(decl);
        }
    }
    declarations
}

/// Split a declaration block on `;` outside quotes and parentheses
/// (semicolons appear inside `url(data:...)` values).
fn split_declarations(block: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut parens = 0i32;
    for c in block.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    parens += 1;
                    current.push(c);
                }
                ')' => {
                    parens -= 1;
                    current.push(c);
                }
                ';' if parens == 0 => {
                    out.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

fn parse_declaration(chunk: &str) -> Option<Declaration> {
    let chunk = chunk.trim();
    if chunk.is_empty() {
        return None;
    }
    let colon = chunk.find(':')?;
    let raw_property = chunk[..colon].trim();
    if raw_property.is_empty() {
        return None;
    }
    // Property names are case-insensitive; custom properties are not.
    let property = if raw_property.starts_with("--") {
        raw_property.to_string()
    } else {
        raw_property.to_ascii_lowercase()
    };

    let mut value = chunk[colon + 1..].trim();
    let mut important = false;
    if let Some(stripped) = strip_important(value) {
        value = stripped;
        important = true;
    }
    if value.is_empty() {
        return None;
    }
    Some(Declaration {
        property,
        value: value.to_string(),
        important,
    })
}

fn strip_important(value: &str) -> Option<&str> {
    let lower = value.to_ascii_lowercase();
    let idx = lower.rfind("!important")?;
    if lower[idx + "!important".len()..].trim().is_empty() {
        Some(value[..idx].trim_end())
    } else {
        None
    }
}

/// Parse an inline `style="..."` attribute value into declarations.
pub fn parse_inline_style(style: &str) -> Vec<Declaration> {
    let clean = strip_comments(style);
    split_declarations(&clean)
        .iter()
        .filter_map(|c| parse_declaration(c))
        .collect()
}

/// Remove `/* ... */` comments, leaving quoted strings intact.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    // Comments separate tokens.
                    out.push(' ');
                } else {
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    }
                    out.push(c);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a/*x*/b"), "a b");
        assert_eq!(strip_comments("a { /* c: red; */ }"), "a {   }");
        assert_eq!(
            strip_comments("content: \"/* not a comment */\";"),
            "content: \"/* not a comment */\";"
        );
    }

    #[test]
    fn test_inline_style_parsing() {
        let decls = parse_inline_style("color: red; background-color: #fff !important");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[0].value, "red");
        assert!(decls[1].important);
    }

    #[test]
    fn test_inline_style_with_url_semicolon() {
        let decls =
            parse_inline_style("background: url(data:image/png;base64,AAAA); color: red");
        assert_eq!(decls.len(), 2);
        assert!(decls[0].value.contains("base64,AAAA"));
    }

    #[test]
    fn test_custom_property_case_preserved() {
        let decls = parse_inline_style("--Accent-Color: #ff8c42; COLOR: red");
        assert_eq!(decls[0].property, "--Accent-Color");
        assert_eq!(decls[1].property, "color");
    }

    #[test]
    fn test_unbalanced_block_is_error() {
        assert!(parse_items("body { color: red;").is_err());
    }

    #[test]
    fn test_font_face_kept_raw() {
        let items =
            parse_items("@font-face { font-family: X; src: url(\"x.woff\"); }").unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], CssItem::Raw(t) if t.starts_with("@font-face")));
    }

    #[test]
    fn test_selector_with_braces_in_string() {
        let items = parse_items("a::before { content: \"{\"; color: red; }").unwrap();
        match &items[0] {
            CssItem::Style(rule) => assert_eq!(rule.declarations.len(), 2),
            other => panic!("expected style rule, got {:?}", other),
        }
    }
}
