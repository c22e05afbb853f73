//! Marker argument lists: `name=foo,help="a, b",list={x,y},labelsFromPath={team: .spec.team}`.
//!
//! Values are kept as raw text and interpreted by the typed getters, so a
//! JSONPath written as `{.spec.size}` stays a string while `list={a,b}`
//! becomes a list.

use std::collections::BTreeMap;

use crate::MarkerError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    marker: String,
    /// `(key, raw value)`; `None` for bare flags like `nilIsZero`.
    values: Vec<(String, Option<String>)>,
}

impl Args {
    pub fn parse(marker: &str, input: &str) -> Result<Self, MarkerError> {
        let mut args = Args { marker: marker.to_string(), values: Vec::new() };
        for part in split_top_level(input, ',').map_err(|reason| args.syntax(reason))? {
            let part = part.trim();
            if part.is_empty() { continue; }
            let (key, value) = match find_top_level(part, '=') {
                Some(idx) => (part[..idx].trim(), Some(part[idx + 1..].trim().to_string())),
                None => (part, None),
            };
            if key.is_empty() {
                return Err(args.syntax(format!("empty argument name in {:?}", part)));
            }
            if args.values.iter().any(|(k, _)| k == key) {
                return Err(args.syntax(format!("argument {:?} given twice", key)));
            }
            args.values.push((key.to_string(), value));
        }
        Ok(args)
    }

    pub fn empty(marker: &str) -> Self {
        Args { marker: marker.to_string(), values: Vec::new() }
    }

    /// Single unnamed value, as in `+Metrics:namePrefix=foo`.
    pub fn anonymous(marker: &str, value: &str) -> Self {
        Args { marker: marker.to_string(), values: vec![(String::new(), Some(value.trim().to_string()))] }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.values.iter().map(|(k, _)| k.as_str()) }

    /// Reject arguments the marker does not declare.
    pub fn check_known(&self, allowed: &[&str]) -> Result<(), MarkerError> {
        match self.keys().find(|k| !allowed.contains(k)) {
            Some(unknown) => Err(MarkerError::UnknownArgument { marker: self.marker.clone(), arg: unknown.to_string() }),
            None => Ok(()),
        }
    }

    fn raw(&self, key: &str) -> Option<&Option<String>> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn syntax(&self, reason: impl Into<String>) -> MarkerError {
        MarkerError::Syntax { marker: self.marker.clone(), reason: reason.into() }
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> MarkerError {
        MarkerError::InvalidValue { marker: self.marker.clone(), arg: key.to_string(), reason: reason.into() }
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, MarkerError> {
        match self.raw(key) {
            None => Ok(None),
            Some(None) => Err(self.invalid(key, "requires a value")),
            Some(Some(raw)) => unquote(raw).map(Some).map_err(|r| self.invalid(key, r)),
        }
    }

    pub fn required_string(&self, key: &str) -> Result<String, MarkerError> {
        self.string(key)?.ok_or_else(|| MarkerError::MissingArgument { marker: self.marker.clone(), arg: key.to_string() })
    }

    /// Absent means `false`; a bare flag means `true`.
    pub fn bool(&self, key: &str) -> Result<bool, MarkerError> {
        match self.raw(key) {
            None => Ok(false),
            Some(None) => Ok(true),
            Some(Some(raw)) => match raw.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(self.invalid(key, format!("expected true or false, got {:?}", other))),
            },
        }
    }

    /// `{a,b,c}` or `a;b;c`.
    pub fn list(&self, key: &str) -> Result<Option<Vec<String>>, MarkerError> {
        let raw = match self.raw(key) {
            None => return Ok(None),
            Some(None) => return Err(self.invalid(key, "requires a value")),
            Some(Some(raw)) => raw,
        };
        let (body, sep) = match braced(raw) {
            Some(inner) => (inner, ','),
            None => (raw.as_str(), ';'),
        };
        let mut out = Vec::new();
        for item in split_top_level(body, sep).map_err(|r| self.invalid(key, r))? {
            let item = item.trim();
            if item.is_empty() { continue; }
            out.push(unquote(item).map_err(|r| self.invalid(key, r))?);
        }
        Ok(Some(out))
    }

    /// `{key: value, other: value}`.
    pub fn map(&self, key: &str) -> Result<BTreeMap<String, String>, MarkerError> {
        let raw = match self.raw(key) {
            None => return Ok(BTreeMap::new()),
            Some(None) => return Err(self.invalid(key, "requires a value")),
            Some(Some(raw)) => raw,
        };
        let body = braced(raw).ok_or_else(|| self.invalid(key, "expected a map like {key: value}"))?;
        let mut out = BTreeMap::new();
        for entry in split_top_level(body, ',').map_err(|r| self.invalid(key, r))? {
            let entry = entry.trim();
            if entry.is_empty() { continue; }
            let idx = find_top_level(entry, ':')
                .ok_or_else(|| self.invalid(key, format!("map entry {:?} has no ':'", entry)))?;
            let k = unquote(entry[..idx].trim()).map_err(|r| self.invalid(key, r))?;
            let v = unquote(entry[idx + 1..].trim()).map_err(|r| self.invalid(key, r))?;
            out.insert(k, v);
        }
        Ok(out)
    }
}

fn braced(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    raw.strip_prefix('{')?.strip_suffix('}')
}

/// Strip `"..."` (with escapes) or `` `...` `` quoting; bare text is returned trimmed.
fn unquote(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('`') {
        return inner.strip_suffix('`').map(str::to_string).ok_or_else(|| format!("unterminated raw string {:?}", raw));
    }
    let Some(inner) = raw.strip_prefix('"') else { return Ok(raw.to_string()) };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return Err("dangling escape".into()),
            },
            '"' => {
                return if chars.as_str().is_empty() { Ok(out) } else { Err(format!("trailing text after {:?}", raw)) };
            }
            c => out.push(c),
        }
    }
    Err(format!("unterminated string {:?}", raw))
}

/// Walks `input` tracking quotes and bracket depth; calls `on_top` for every
/// char outside quotes at depth zero.
fn scan(input: &str, mut on_top: impl FnMut(usize, char) -> bool) -> Result<(), String> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped { escaped = false; } else if c == '\\' && q == '"' { escaped = true; } else if c == q { quote = None; }
            continue;
        }
        match c {
            '"' | '`' | '\'' => quote = Some(c),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                depth -= 1;
                if depth < 0 { return Err(format!("unbalanced {:?} in {:?}", c, input)); }
            }
            _ if depth == 0 => {
                if !on_top(i, c) { return Ok(()); }
            }
            _ => {}
        }
    }
    if quote.is_some() { return Err(format!("unterminated quote in {:?}", input)); }
    if depth != 0 { return Err(format!("unbalanced brackets in {:?}", input)); }
    Ok(())
}

fn split_top_level(input: &str, sep: char) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut start = 0;
    scan(input, |i, c| {
        if c == sep {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
        true
    })?;
    parts.push(&input[start..]);
    Ok(parts)
}

fn find_top_level(input: &str, needle: char) -> Option<usize> {
    let mut found = None;
    scan(input, |i, c| {
        if c == needle { found = Some(i); false } else { true }
    })
    .ok()?;
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_arguments() {
        let args = Args::parse(
            "Metrics:gauge",
            r#"name=widget_size,help="Size of the widget, in units",JSONPath=.size,nilIsZero"#,
        )
        .unwrap();
        assert_eq!(args.required_string("name").unwrap(), "widget_size");
        assert_eq!(args.string("help").unwrap().as_deref(), Some("Size of the widget, in units"));
        assert_eq!(args.string("JSONPath").unwrap().as_deref(), Some(".size"));
        assert!(args.bool("nilIsZero").unwrap());
        assert!(!args.bool("absent").unwrap());
    }

    #[test]
    fn parses_lists_both_ways() {
        let args = Args::parse("Metrics:stateset", "list={Ready,\"Not Ready\"},other=a;b;c").unwrap();
        assert_eq!(args.list("list").unwrap().unwrap(), vec!["Ready", "Not Ready"]);
        assert_eq!(args.list("other").unwrap().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn parses_maps_with_paths() {
        let args = Args::parse(
            "Metrics:gauge",
            "name=x,labelsFromPath={team: .spec.team, app: \".metadata.labels['app,name']\"}",
        )
        .unwrap();
        let m = args.map("labelsFromPath").unwrap();
        assert_eq!(m.get("team").map(String::as_str), Some(".spec.team"));
        assert_eq!(m.get("app").map(String::as_str), Some(".metadata.labels['app,name']"));
    }

    #[test]
    fn braced_jsonpath_stays_a_string() {
        let args = Args::parse("Metrics:info", "name=x,JSONPath={.status}").unwrap();
        assert_eq!(args.string("JSONPath").unwrap().as_deref(), Some("{.status}"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(Args::parse("m", "name=a,name=b"), Err(MarkerError::Syntax { .. })));
        assert!(matches!(Args::parse("m", "name=\"open"), Err(MarkerError::Syntax { .. })));
        let args = Args::parse("m", "name=a,bogus=1").unwrap();
        assert!(matches!(args.check_known(&["name"]), Err(MarkerError::UnknownArgument { .. })));
        assert!(matches!(args.required_string("missing"), Err(MarkerError::MissingArgument { .. })));
        let args = Args::parse("m", "flag=maybe").unwrap();
        assert!(matches!(args.bool("flag"), Err(MarkerError::InvalidValue { .. })));
    }
}
