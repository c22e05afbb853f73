//! The subset of `#[serde(...)]` that decides a field's serialized key.

use metricgen_engine::Serialization;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, LitStr, Token};

/// `rename_all` rules, applied to snake_case field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenameRule {
    #[default]
    None,
    LowerCase,
    UpperCase,
    PascalCase,
    CamelCase,
    SnakeCase,
    ScreamingSnakeCase,
    KebabCase,
    ScreamingKebabCase,
}

impl RenameRule {
    pub fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => RenameRule::LowerCase,
            "UPPERCASE" => RenameRule::UpperCase,
            "PascalCase" => RenameRule::PascalCase,
            "camelCase" => RenameRule::CamelCase,
            "snake_case" => RenameRule::SnakeCase,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnakeCase,
            "kebab-case" => RenameRule::KebabCase,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebabCase,
            _ => return None,
        })
    }

    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::None | RenameRule::LowerCase | RenameRule::SnakeCase => field.to_string(),
            RenameRule::UpperCase | RenameRule::ScreamingSnakeCase => field.to_ascii_uppercase(),
            RenameRule::PascalCase => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            RenameRule::CamelCase => {
                let pascal = RenameRule::PascalCase.apply_to_field(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::KebabCase => field.replace('_', "-"),
            RenameRule::ScreamingKebabCase => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

/// Container-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerAttrs {
    pub serialized: bool,
    pub rename_all: RenameRule,
    pub transparent: bool,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = ContainerAttrs { serialized: derives_serde(attrs), ..Default::default() };
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    if let Some(rule) = serialize_name(&meta)? {
                        out.rename_all = RenameRule::parse(&rule)
                            .ok_or_else(|| meta.error(format!("unknown rename rule {rule:?}")))?;
                    }
                } else if meta.path.is_ident("transparent") {
                    out.transparent = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(out)
    }

    /// Serialization of a named field, given its identifier and attributes.
    pub fn field(&self, ident: &str, attrs: &[Attribute]) -> syn::Result<Serialization> {
        let mut rename = None;
        let mut skip = false;
        let mut flatten = false;
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if let Some(name) = serialize_name(&meta)? {
                        rename = Some(name);
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    skip = true;
                } else if meta.path.is_ident("flatten") {
                    flatten = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(if skip {
            Serialization::Skip
        } else if flatten || self.transparent {
            Serialization::Flatten
        } else {
            Serialization::Named(rename.unwrap_or_else(|| self.rename_all.apply_to_field(ident)))
        })
    }
}

/// `#[derive(Serialize)]` or `#[derive(Deserialize)]`, by last path segment.
pub fn derives_serde(attrs: &[Attribute]) -> bool {
    attrs.iter().filter(|a| a.path().is_ident("derive")).any(|attr| {
        attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
            .map(|paths| {
                paths.iter().any(|p| p.segments.last().is_some_and(|s| s.ident == "Serialize" || s.ident == "Deserialize"))
            })
            .unwrap_or(false)
    })
}

/// Value of `key = "..."` or the `serialize` half of
/// `key(serialize = "...", deserialize = "...")`.
fn serialize_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(Some(lit.value()));
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            let lit: LitStr = inner.value()?.parse()?;
            name = Some(lit.value());
        } else {
            skip_value(&inner)?;
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consume an argument this loader has no use for.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(src: &str) -> syn::ItemStruct { syn::parse_str(src).unwrap() }

    fn fields(src: &str) -> Vec<Serialization> {
        let s = item(src);
        let container = ContainerAttrs::parse(&s.attrs).unwrap();
        s.fields
            .iter()
            .map(|f| container.field(&f.ident.as_ref().unwrap().to_string(), &f.attrs).unwrap())
            .collect()
    }

    #[test]
    fn rename_rules() {
        assert_eq!(RenameRule::CamelCase.apply_to_field("ready_replicas"), "readyReplicas");
        assert_eq!(RenameRule::PascalCase.apply_to_field("ready_replicas"), "ReadyReplicas");
        assert_eq!(RenameRule::KebabCase.apply_to_field("ready_replicas"), "ready-replicas");
        assert_eq!(RenameRule::ScreamingSnakeCase.apply_to_field("ready_replicas"), "READY_REPLICAS");
        assert_eq!(RenameRule::parse("Title Case"), None);
    }

    #[test]
    fn field_tags_follow_serde() {
        let got = fields(
            r#"
            #[derive(Debug, Clone, serde::Serialize)]
            #[serde(rename_all = "camelCase", deny_unknown_fields)]
            struct WidgetStatus {
                ready_replicas: i32,
                #[serde(rename = "obsGen", default, skip_serializing_if = "Option::is_none")]
                observed_generation: Option<i64>,
                #[serde(skip)]
                cache: u8,
                #[serde(flatten)]
                extra: Extra,
                #[serde(rename(serialize = "out", deserialize = "in"), with = "crate::codec")]
                value: i32,
            }
            "#,
        );
        assert_eq!(got, vec![
            Serialization::Named("readyReplicas".into()),
            Serialization::Named("obsGen".into()),
            Serialization::Skip,
            Serialization::Flatten,
            Serialization::Named("out".into()),
        ]);
    }

    #[test]
    fn derive_detection() {
        assert!(derives_serde(&item("#[derive(Deserialize)] struct A { a: i32 }").attrs));
        assert!(!derives_serde(&item("#[derive(Debug, Clone)] struct A { a: i32 }").attrs));
    }
}
