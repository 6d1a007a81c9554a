//! Type classification and cross-boundary mapping.
//!
//! Every native type name seen in a declaration falls into exactly one
//! [`Category`]. The category decides how the type is spelled in the C shim,
//! in the extern declarations, and on the safe side.

use serde::Serialize;

use crate::config::{is_identifier, GeneratorConfig};
use crate::model::Class;

/// Category of a native type, checked in declaration order of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Listed in the primitive table.
    Primitive,
    /// Listed in the value-struct table.
    Value,
    /// A registered class declared `/Simple`.
    SimpleStruct,
    String,
    /// `vector::T`
    Vector,
    /// `vector::vector::T`
    VectorOfVector,
    /// `Ptr::T`
    SmartHandle,
    /// Any other named type: an owned instance behind an opaque handle.
    Boxed,
    /// Not a type name at all; spelled unchanged everywhere.
    Passthrough,
}

impl Category {
    /// Crosses the boundary as an opaque `void*`.
    pub fn is_handle(self) -> bool {
        matches!(
            self,
            Category::Boxed | Category::Vector | Category::VectorOfVector | Category::SmartHandle
        )
    }

    /// Crosses the boundary as a fixed-layout struct.
    pub fn is_struct(self) -> bool {
        matches!(self, Category::Value | Category::SimpleStruct)
    }
}

/// Kind of a template instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    Vector,
    VectorOfVector,
    Ptr,
}

/// A concrete template type that needs its own wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateInstance {
    pub kind: InstanceKind,
    /// Identifier used for files, symbols, and the safe type (`VectorOfPoint`).
    pub name: String,
    /// Native spelling (`std::vector<cv::Point>`).
    pub native_type: String,
    /// Normalized type name of the element or pointee.
    pub element: String,
}

/// How one native type is spelled on each side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMapping {
    pub category: Category,
    /// Type name as declared, normalized.
    pub name: String,
    /// Fully qualified native type.
    pub native: String,
    /// Shim-side C spelling.
    pub c_type: String,
    /// Safe-side Rust type.
    pub rust_type: String,
    /// Rust type in extern declarations.
    pub rust_ffi_type: String,
    pub instance: Option<TemplateInstance>,
}

/// Read-only view of the registry that classification needs.
pub trait TypeLookup {
    fn config(&self) -> &GeneratorConfig;

    /// Registered class by scope path (`Mat`, `SimpleBlobDetector::Params`).
    fn class_named(&self, name: &str) -> Option<&Class>;

    fn is_simple_class(&self, name: &str) -> bool {
        self.class_named(name).is_some_and(|c| c.is_simple)
    }

    /// Native spelling of a named type.
    fn native_type_name(&self, name: &str) -> String {
        match self.class_named(name) {
            Some(class) => class.native_name(),
            None => self.config().native_path(name),
        }
    }
}

/// Classify a normalized native type name.
pub fn classify(lookup: &impl TypeLookup, name: &str) -> Category {
    let config = lookup.config();
    if config.primitives.contains_key(name) {
        Category::Primitive
    } else if config.value_struct(name).is_some() {
        Category::Value
    } else if lookup.is_simple_class(name) {
        Category::SimpleStruct
    } else if name == "string" {
        Category::String
    } else if name.starts_with("vector::vector::") {
        Category::VectorOfVector
    } else if name.starts_with("vector::") {
        Category::Vector
    } else if name.starts_with("Ptr::") {
        Category::SmartHandle
    } else if is_type_path(name) {
        Category::Boxed
    } else {
        Category::Passthrough
    }
}

/// Map a normalized native type name to its spellings on every side.
pub fn map_type(lookup: &impl TypeLookup, name: &str) -> TypeMapping {
    let config = lookup.config();
    let category = classify(lookup, name);
    let ident = type_ident(name);
    let mapping = |native: String, c_type: String, rust_type: String, rust_ffi_type: String| TypeMapping {
        category,
        name: name.to_string(),
        native,
        c_type,
        rust_type,
        rust_ffi_type,
        instance: None,
    };

    match category {
        Category::Primitive => match config.primitives.get(name) {
            Some(p) => mapping(
                p.c_type.clone(),
                p.c_type.clone(),
                p.rust_type.clone(),
                p.ffi_type().to_string(),
            ),
            None => passthrough(category, name),
        },
        Category::Value | Category::SimpleStruct => mapping(
            lookup.native_type_name(name),
            format!("{}_struct_{ident}", config.prefix),
            ident.clone(),
            ident,
        ),
        Category::String => mapping(
            "std::string".to_string(),
            "const char*".to_string(),
            "String".to_string(),
            "*const c_char".to_string(),
        ),
        Category::Boxed => mapping(
            lookup.native_type_name(name),
            "void*".to_string(),
            ident,
            "*mut c_void".to_string(),
        ),
        Category::Vector | Category::VectorOfVector | Category::SmartHandle => {
            let instance = template_instance(lookup, name, category);
            TypeMapping {
                category,
                name: name.to_string(),
                native: instance.native_type.clone(),
                c_type: "void*".to_string(),
                rust_type: instance.name.clone(),
                rust_ffi_type: "*mut c_void".to_string(),
                instance: Some(instance),
            }
        }
        Category::Passthrough => passthrough(category, name),
    }
}

fn passthrough(category: Category, name: &str) -> TypeMapping {
    TypeMapping {
        category,
        name: name.to_string(),
        native: name.to_string(),
        c_type: name.to_string(),
        rust_type: name.to_string(),
        rust_ffi_type: name.to_string(),
        instance: None,
    }
}

fn template_instance(lookup: &impl TypeLookup, name: &str, category: Category) -> TemplateInstance {
    let (kind, element, prefix) = match category {
        Category::VectorOfVector => (
            InstanceKind::VectorOfVector,
            name.trim_start_matches("vector::"),
            "VectorOfVectorOf",
        ),
        Category::SmartHandle => (InstanceKind::Ptr, name.trim_start_matches("Ptr::"), "PtrOf"),
        _ => (InstanceKind::Vector, name.trim_start_matches("vector::"), "VectorOf"),
    };
    let element_native = native_spelling(lookup, element);
    let native_type = match kind {
        InstanceKind::Vector => format!("std::vector<{element_native}>"),
        InstanceKind::VectorOfVector => format!("std::vector< std::vector<{element_native}> >"),
        InstanceKind::Ptr => format!("Ptr<{element_native}>"),
    };
    TemplateInstance {
        kind,
        name: format!("{prefix}{}", type_ident(element)),
        native_type,
        element: match kind {
            InstanceKind::VectorOfVector => format!("vector::{element}"),
            _ => element.to_string(),
        },
    }
}

/// Native spelling of a template element.
fn native_spelling(lookup: &impl TypeLookup, name: &str) -> String {
    match classify(lookup, name) {
        Category::Primitive | Category::Passthrough => name.to_string(),
        Category::String => "std::string".to_string(),
        Category::Vector | Category::VectorOfVector | Category::SmartHandle => {
            map_type(lookup, name).native
        }
        Category::Value | Category::SimpleStruct | Category::Boxed => lookup.native_type_name(name),
    }
}

/// Flat identifier for a scope path (`SimpleBlobDetector::Params` becomes
/// `SimpleBlobDetector_Params`).
pub fn type_ident(name: &str) -> String {
    name.replace("::", "_")
}

/// Whether `name` is a `::`-separated path of identifiers.
pub fn is_type_path(name: &str) -> bool {
    !name.is_empty() && name.split("::").all(is_identifier)
}

/// Make a C type spelling usable inside an identifier.
pub fn sanitize_c_type(c_type: &str) -> String {
    c_type.replace(['*', ' ', ':'], "_")
}

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Prefix Rust keywords with `_` so they can be used as names.
pub fn sanitize_ident(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("_{name}")
    } else {
        name.to_string()
    }
}
