//! Conversion of `syn` type syntax into the walker's [`TypeExpr`].

use metricgen_engine::TypeExpr;
use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type, TypePath};

const POINTERS: &[&str] = &["Option", "Box", "Rc", "Arc", "Cow"];
const SEQUENCES: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet", "BinaryHeap"];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "String", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64",
];

pub fn is_primitive(name: &str) -> bool { PRIMITIVES.contains(&name) }

fn source(ty: &impl ToTokens) -> String { ty.to_token_stream().to_string() }

pub fn type_expr(ty: &Type) -> TypeExpr {
    match ty {
        Type::Path(p) if p.qself.is_none() => path_expr(p),
        Type::Reference(r) => TypeExpr::Pointer(Box::new(type_expr(&r.elem))),
        Type::Ptr(p) => TypeExpr::Pointer(Box::new(type_expr(&p.elem))),
        Type::Array(a) => TypeExpr::Array(Box::new(type_expr(&a.elem))),
        Type::Slice(s) => TypeExpr::Array(Box::new(type_expr(&s.elem))),
        Type::Tuple(t) => TypeExpr::Tuple(t.elems.iter().map(type_expr).collect()),
        Type::Paren(p) => type_expr(&p.elem),
        Type::Group(g) => type_expr(&g.elem),
        Type::TraitObject(_) | Type::ImplTrait(_) => TypeExpr::Interface(source(ty)),
        other => TypeExpr::Unsupported(source(other)),
    }
}

fn type_args(args: &PathArguments) -> Vec<&Type> {
    match args {
        PathArguments::AngleBracketed(a) => a
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn path_expr(p: &TypePath) -> TypeExpr {
    let Some(last) = p.path.segments.last() else { return TypeExpr::Unsupported(source(p)) };
    let name = last.ident.to_string();
    let args = type_args(&last.arguments);

    match args.as_slice() {
        [inner, ..] if POINTERS.contains(&name.as_str()) => return TypeExpr::Pointer(Box::new(type_expr(inner))),
        [inner, ..] if SEQUENCES.contains(&name.as_str()) => return TypeExpr::Array(Box::new(type_expr(inner))),
        [key, value, ..] if MAPS.contains(&name.as_str()) => {
            return TypeExpr::Map { key: Box::new(type_expr(key)), value: Box::new(type_expr(value)) };
        }
        _ => {}
    }

    let qualifier: Vec<String> =
        p.path.segments.iter().take(p.path.segments.len() - 1).map(|s| s.ident.to_string()).collect();
    if qualifier.is_empty() && p.path.leading_colon.is_none() {
        TypeExpr::Ident(name)
    } else {
        TypeExpr::Qualified { qualifier, name }
    }
}

/// Every named type path mentioned in `expr`, as passed to resolution.
pub fn named_paths(expr: &TypeExpr, out: &mut Vec<Vec<String>>) {
    match expr {
        TypeExpr::Ident(name) => out.push(vec![name.clone()]),
        TypeExpr::Qualified { qualifier, name } => {
            let mut path = qualifier.clone();
            path.push(name.clone());
            out.push(path);
        }
        TypeExpr::Pointer(inner) | TypeExpr::Array(inner) => named_paths(inner, out),
        TypeExpr::Map { key, value } => {
            named_paths(key, out);
            named_paths(value, out);
        }
        TypeExpr::Tuple(elems) => elems.iter().for_each(|e| named_paths(e, out)),
        TypeExpr::Interface(_) | TypeExpr::Unsupported(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> TypeExpr { type_expr(&syn::parse_str(src).unwrap()) }

    fn ident(name: &str) -> Box<TypeExpr> { Box::new(TypeExpr::Ident(name.into())) }

    #[test]
    fn wrappers_become_pointers() {
        assert_eq!(expr("Option<Box<WidgetStatus>>"), TypeExpr::Pointer(Box::new(TypeExpr::Pointer(ident("WidgetStatus")))));
        assert_eq!(expr("&'a str"), TypeExpr::Pointer(ident("str")));
        assert_eq!(expr("std::sync::Arc<Spec>"), TypeExpr::Pointer(ident("Spec")));
    }

    #[test]
    fn containers() {
        assert_eq!(expr("Vec<Item>"), TypeExpr::Array(ident("Item")));
        assert_eq!(expr("[u8; 4]"), TypeExpr::Array(ident("u8")));
        assert_eq!(expr("BTreeMap<String, Item>"), TypeExpr::Map { key: ident("String"), value: ident("Item") });
        assert_eq!(expr("()"), TypeExpr::Tuple(Vec::new()));
    }

    #[test]
    fn qualified_paths_keep_their_qualifier() {
        assert_eq!(expr("super::common::Condition"), TypeExpr::Qualified {
            qualifier: vec!["super".into(), "common".into()],
            name: "Condition".into(),
        });
        assert!(matches!(expr("::ext::Thing"), TypeExpr::Qualified { ref qualifier, .. } if qualifier == &["ext"]));
    }

    #[test]
    fn trait_objects_are_interfaces() {
        assert!(matches!(expr("Box<dyn Hook>"), TypeExpr::Pointer(inner) if matches!(*inner, TypeExpr::Interface(_))));
        assert!(matches!(expr("fn(u8) -> u8"), TypeExpr::Unsupported(_)));
    }

    #[test]
    fn collects_nested_paths() {
        let mut out = Vec::new();
        named_paths(&expr("BTreeMap<String, Vec<common::Item>>"), &mut out);
        assert_eq!(out, vec![vec!["String".to_string()], vec!["common".to_string(), "Item".to_string()]]);
    }
}
