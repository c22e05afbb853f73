//! Field-selector path expressions.
//!
//! Accepts the restricted JSONPath dialect used by metric markers:
//! `.status.replicas`, `.metadata.labels['app.kubernetes.io/name']`,
//! optionally wrapped in `{...}`. Only plain field names are allowed;
//! indices, wildcards, filters and recursive descent are rejected.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("expected a single JSONPath, got {0}")]
    MultipleChains(usize),
    #[error("unexpected JSONPath node {node:?} in {expr:?}: only field names are supported")]
    NotAField { expr: String, node: String },
    #[error("parse JSONPath {expr:?}: {reason}")]
    Syntax { expr: String, reason: String },
}

enum Node<'a> {
    Text(&'a str),
    Action(&'a str),
}

/// Resolve `expr` into its ordered field segments.
///
/// `.` and the empty expression select the object itself and resolve to no
/// segments at all.
pub fn resolve(expr: &str) -> Result<Vec<String>, PathError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Ok(Vec::new());
    }
    let template = if trimmed.starts_with('{') { trimmed.to_string() } else { format!("{{{}}}", trimmed) };
    let nodes = split_nodes(&template, expr)?;
    if nodes.len() != 1 {
        return Err(PathError::MultipleChains(nodes.len()));
    }
    match nodes[0] {
        Node::Action(body) => parse_chain(body, expr),
        Node::Text(text) => Err(PathError::NotAField { expr: expr.to_string(), node: text.to_string() }),
    }
}

/// Split a template into literal text and `{...}` actions.
fn split_nodes<'a>(template: &'a str, expr: &str) -> Result<Vec<Node<'a>>, PathError> {
    let syntax = |reason: &str| PathError::Syntax { expr: expr.to_string(), reason: reason.to_string() };
    let mut nodes = Vec::new();
    let mut start = 0usize;
    let mut open: Option<usize> = None;
    let mut quote: Option<char> = None;
    for (i, ch) in template.char_indices() {
        if let Some(q) = quote {
            if ch == q { quote = None; }
            continue;
        }
        match (ch, open) {
            ('\'' | '"', Some(_)) => quote = Some(ch),
            ('{', None) => {
                if i > start { nodes.push(Node::Text(&template[start..i])); }
                open = Some(i + 1);
            }
            ('{', Some(_)) => return Err(syntax("nested '{'")),
            ('}', Some(body_start)) => {
                nodes.push(Node::Action(&template[body_start..i]));
                open = None;
                start = i + 1;
            }
            ('}', None) => return Err(syntax("unmatched '}'")),
            _ => {}
        }
    }
    if quote.is_some() { return Err(syntax("unterminated quote")); }
    if open.is_some() { return Err(syntax("unclosed action")); }
    if start < template.len() { nodes.push(Node::Text(&template[start..])); }
    Ok(nodes)
}

fn is_terminator(c: char) -> bool {
    c == '.' || c == '[' || c.is_whitespace()
}

/// Parse the inside of one action into field names.
fn parse_chain(body: &str, expr: &str) -> Result<Vec<String>, PathError> {
    let not_field = |node: &str| PathError::NotAField { expr: expr.to_string(), node: node.to_string() };
    let chars: Vec<char> = body.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            // `$` names the root object; it only makes sense first.
            '$' if out.is_empty() => i += 1,
            '.' => {
                if chars.get(i + 1) == Some(&'.') { return Err(not_field("..")); }
                let begin = i + 1;
                let mut end = begin;
                while end < chars.len() && !is_terminator(chars[end]) { end += 1; }
                let name: String = chars[begin..end].iter().collect();
                if name == "*" { return Err(not_field("*")); }
                // A dangling '.' selects the current object.
                if !name.is_empty() { out.push(name); }
                i = end;
            }
            '[' => {
                let mut end = i + 1;
                let mut quote: Option<char> = None;
                while end < chars.len() {
                    match (chars[end], quote) {
                        (c, Some(q)) if c == q => quote = None,
                        (_, Some(_)) => {}
                        ('\'' | '"', None) => quote = Some(chars[end]),
                        (']', None) => break,
                        _ => {}
                    }
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(PathError::Syntax { expr: expr.to_string(), reason: "unclosed '['".into() });
                }
                let inner: String = chars[i + 1..end].iter().collect();
                out.push(quoted_key(&inner).ok_or_else(|| not_field(&format!("[{}]", inner)))?);
                i = end + 1;
            }
            _ => {
                let mut end = i;
                while end < chars.len() && !is_terminator(chars[end]) { end += 1; }
                let token: String = chars[i..end].iter().collect();
                return Err(not_field(&token));
            }
        }
    }
    Ok(out)
}

/// `'key'` or `"key"` -> `key`; anything else is not a field selector.
fn quoted_key(inner: &str) -> Option<String> {
    let s = inner.trim();
    let q = s.chars().next()?;
    if (q != '\'' && q != '"') || s.len() < 2 || !s.ends_with(q) { return None; }
    let key = &s[1..s.len() - 1];
    if key.contains(q) { return None; }
    Some(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_single_chain_in_order() {
        assert_eq!(resolve(".status.replicas").unwrap(), vec!["status", "replicas"]);
        assert_eq!(resolve("{.spec.size}").unwrap(), vec!["spec", "size"]);
        assert_eq!(resolve(" .a .b ").unwrap(), vec!["a", "b"]);
        assert_eq!(resolve("$.spec").unwrap(), vec!["spec"]);
    }

    #[test]
    fn self_selector_is_empty() {
        assert!(resolve(".").unwrap().is_empty());
        assert!(resolve("").unwrap().is_empty());
        assert!(resolve("{}").unwrap().is_empty());
    }

    #[test]
    fn quoted_keys_are_fields() {
        assert_eq!(
            resolve(".metadata.labels['app.kubernetes.io/name']").unwrap(),
            vec!["metadata", "labels", "app.kubernetes.io/name"]
        );
        assert_eq!(resolve(r#".a["b c"]"#).unwrap(), vec!["a", "b c"]);
    }

    #[test]
    fn rejects_multiple_chains() {
        assert_eq!(resolve(".a}{.b"), Err(PathError::MultipleChains(2)));
        assert_eq!(resolve(".a} x {.b"), Err(PathError::MultipleChains(3)));
    }

    #[test]
    fn rejects_non_field_nodes() {
        for expr in [".items[0]", ".items[*]", "..name", ".spec.*", "range", ".a[?(@.x)]"] {
            assert!(matches!(resolve(expr), Err(PathError::NotAField { .. })), "{expr}");
        }
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(resolve(".a['b"), Err(PathError::Syntax { .. })));
        assert!(matches!(resolve(".a[b"), Err(PathError::Syntax { .. })));
        assert!(matches!(resolve("{.a{.b}}"), Err(PathError::Syntax { .. })));
    }
}
