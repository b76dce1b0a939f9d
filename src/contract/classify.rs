use std::fmt;
use syn::{GenericArgument, PathArguments, PathSegment, Type, TypeParamBound};

/// Result shape of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// No result.
    Void,
    /// A future that completes without a payload.
    FutureVoid,
    /// Anything else, futures with a payload included.
    Value,
}

impl ReturnKind {
    /// Classify a declared return type. `None` is a method without `-> T`.
    ///
    /// Types that do not parse classify as `Value`; the synthesizer rejects
    /// them later with a precise error.
    pub fn classify(return_type: Option<&str>) -> Self {
        let Some(text) = return_type else {
            return ReturnKind::Void;
        };
        match syn::parse_str::<Type>(text) {
            Ok(ty) => Self::classify_type(&ty),
            Err(_) => ReturnKind::Value,
        }
    }

    pub fn classify_type(ty: &Type) -> Self {
        if is_unit(ty) {
            ReturnKind::Void
        } else if is_unit_future(ty) {
            ReturnKind::FutureVoid
        } else {
            ReturnKind::Value
        }
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Void => write!(f, "void"),
            ReturnKind::FutureVoid => write!(f, "future-void"),
            ReturnKind::Value => write!(f, "value"),
        }
    }
}

fn is_unit(ty: &Type) -> bool {
    match ty {
        Type::Tuple(tuple) => tuple.elems.is_empty(),
        Type::Paren(paren) => is_unit(&paren.elem),
        Type::Group(group) => is_unit(&group.elem),
        _ => false,
    }
}

fn is_unit_future(ty: &Type) -> bool {
    match ty {
        Type::Paren(paren) => is_unit_future(&paren.elem),
        Type::Group(group) => is_unit_future(&group.elem),
        Type::ImplTrait(imp) => bounds_output_unit(imp.bounds.iter()),
        Type::Path(path) => {
            let Some(last) = path.path.segments.last() else {
                return false;
            };
            match last.ident.to_string().as_str() {
                // BoxFuture<'a, T>, LocalBoxFuture<'a, T>, Ready<T>
                "BoxFuture" | "LocalBoxFuture" | "Ready" => {
                    type_args(last).last().is_some_and(|t| is_unit(t))
                }
                "Pin" => type_args(last)
                    .first()
                    .is_some_and(|inner| is_boxed_unit_future(inner)),
                _ => false,
            }
        }
        _ => false,
    }
}

fn is_boxed_unit_future(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    if last.ident != "Box" {
        return false;
    }
    match type_args(last).first() {
        Some(Type::TraitObject(object)) => bounds_output_unit(object.bounds.iter()),
        Some(Type::Paren(paren)) => match &*paren.elem {
            Type::TraitObject(object) => bounds_output_unit(object.bounds.iter()),
            _ => false,
        },
        _ => false,
    }
}

/// True when one bound is `Future<Output = ()>`.
fn bounds_output_unit<'a>(mut bounds: impl Iterator<Item = &'a TypeParamBound>) -> bool {
    bounds.any(|bound| {
        let TypeParamBound::Trait(trait_bound) = bound else {
            return false;
        };
        let Some(last) = trait_bound.path.segments.last() else {
            return false;
        };
        if last.ident != "Future" {
            return false;
        }
        let PathArguments::AngleBracketed(args) = &last.arguments else {
            return false;
        };
        args.args.iter().any(|arg| match arg {
            GenericArgument::AssocType(assoc) => assoc.ident == "Output" && is_unit(&assoc.ty),
            _ => false,
        })
    })
}

fn type_args(segment: &PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
