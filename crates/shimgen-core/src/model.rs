//! Typed entity records built from raw declarations.
//!
//! Modifier tokens and type spellings are normalized here, once, so that
//! classification and emission only ever read typed fields.

use std::fmt;

use serde::Serialize;

use crate::declaration::{RawArgument, RawDeclaration};
use crate::names::{strip_kind_marker, EntityName};

/// Normalize a declared type spelling.
///
/// Returns the canonical native type name and whether the spelling carried a
/// trailing pointer marker. Template spellings use `_` as separator in the
/// parser output (`vector_Point`, `Ptr_FeatureDetector`); they become `::`
/// paths (`vector::Point`).
pub fn normalize_type(raw: &str) -> (String, bool) {
    let mut spelling = raw.trim();
    let mut is_pointer = false;
    if let Some(stripped) = spelling.strip_suffix('*') {
        spelling = stripped.trim_end();
        is_pointer = true;
    }
    let spelling = match spelling {
        "String" => "string",
        "Size2i" => "Size",
        other => other,
    };
    let native = if spelling == "size_t" {
        spelling.to_string()
    } else {
        spelling.replace('_', "::")
    };
    (native, is_pointer)
}

/// Data flow direction of an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

/// A function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    /// Normalized native type.
    pub native_type: String,
    pub name: String,
    /// Default value expression, if the declaration had one.
    pub default_value: Option<String>,
    pub direction: Direction,
    /// Declared with a trailing `*`.
    pub is_pointer: bool,
}

impl Argument {
    pub fn from_raw(raw: &RawArgument) -> Self {
        let (native_type, is_pointer) = normalize_type(&raw.type_name);
        let mods = crate::declaration::ModifierSet::parse(&raw.modifiers);
        let direction = if mods.is_inout {
            Direction::InOut
        } else if mods.is_output {
            Direction::Out
        } else {
            Direction::In
        };
        let default_value = Some(raw.default_value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Self {
            native_type,
            name: raw.name.clone(),
            default_value,
            direction,
            is_pointer,
        }
    }

    /// Whether the callee writes through this argument.
    pub fn is_output(&self) -> bool {
        matches!(self.direction, Direction::Out | Direction::InOut)
    }

    /// Capitalized first letter of the type, used in overload suffixes.
    pub fn type_initial(&self) -> Option<char> {
        self.native_type.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.native_type)?;
        if self.is_pointer {
            write!(f, "*")?;
        }
        write!(f, " {}", self.name)?;
        match self.direction {
            Direction::In => {}
            Direction::Out => write!(f, " [out]")?,
            Direction::InOut => write!(f, " [inout]")?,
        }
        if let Some(default) = &self.default_value {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

/// A free function, method, or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: EntityName,
    /// Local name equals the enclosing type name.
    pub is_constructor: bool,
    pub is_static: bool,
    pub is_const: bool,
    /// Normalized return type; constructors return their owning type.
    pub return_type: String,
    /// Name used in shim symbols (`=name` modifier or the local name).
    pub override_name: String,
    pub args: Vec<Argument>,
    /// Came from the configured hand-written declarations.
    pub manual: bool,
}

impl Function {
    pub fn from_raw<S: AsRef<str>>(decl: &RawDeclaration, namespaces: &[S], manual: bool) -> Self {
        let name = EntityName::resolve(decl.name(), namespaces);
        let mods = decl.modifiers();
        let is_constructor = name.is_member() && name.local_name == name.enclosing_type;
        let return_type = if is_constructor {
            name.owner_qualified()
        } else {
            normalize_type(decl.spec()).0
        };
        let override_name = mods.rename.clone().unwrap_or_else(|| name.local_name.clone());
        Self {
            is_constructor,
            is_static: mods.is_static,
            is_const: mods.is_const,
            return_type,
            override_name,
            args: decl.items().iter().map(Argument::from_raw).collect(),
            manual,
            name,
        }
    }

    /// Qualified name of the owning type, `None` for free functions.
    pub fn owner(&self) -> Option<String> {
        self.name.is_member().then(|| self.name.owner_qualified())
    }

    /// Name of the native callee inside its scope.
    pub fn native_name(&self) -> &str {
        &self.name.local_name
    }

    pub fn is_call_operator(&self) -> bool {
        self.name.local_name == "operator ()" || self.override_name == "operator ()"
    }

    pub fn default_arg_count(&self) -> usize {
        self.args.iter().filter(|a| a.default_value.is_some()).count()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FUNC <{} {}(", self.return_type, self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")?;
        if self.is_const {
            write!(f, " const")?;
        }
        if self.is_static {
            write!(f, " static")?;
        }
        write!(f, ">")
    }
}

/// A class property (field of a simple struct).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub native_type: String,
    pub name: String,
    pub read_write: bool,
}

/// How a class crosses the boundary, decided after ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Fixed layout, passed by value.
    Value,
    /// No constructor: an interface over some owned handle.
    Trait,
    /// Owned native instance behind an opaque handle.
    Boxed,
}

/// A class or struct declaration and the methods collected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Class {
    pub name: EntityName,
    /// Scope path below the namespace (`SimpleBlobDetector::Params`).
    pub qualified: String,
    /// Flat identifier used on both generated sides (`SimpleBlobDetector_Params`).
    pub ident: String,
    /// Declared `/Simple` or `/Map`.
    pub is_simple: bool,
    pub is_nested: bool,
    /// Base type name without scope.
    pub base: Option<String>,
    pub properties: Vec<Property>,
    pub methods: Vec<Function>,
}

impl Class {
    pub fn from_raw<S: AsRef<str>>(decl: &RawDeclaration, namespaces: &[S]) -> Self {
        let name = EntityName::resolve(decl.name(), namespaces);
        let qualified = name.qualified();
        let properties = decl
            .items()
            .iter()
            .map(|p| Property {
                native_type: normalize_type(&p.type_name).0,
                name: p.name.clone(),
                read_write: crate::declaration::ModifierSet::parse(&p.modifiers).read_write,
            })
            .collect();
        Self {
            ident: qualified.replace("::", "_"),
            is_simple: decl.modifiers().is_simple,
            is_nested: name.is_member(),
            base: parse_base(decl.spec()),
            properties,
            methods: Vec::new(),
            qualified,
            name,
        }
    }

    /// Fully qualified native type name (`cv::Mat`).
    pub fn native_name(&self) -> String {
        self.name.native_qualified()
    }

    pub fn has_constructor(&self) -> bool {
        self.methods.iter().any(|m| m.is_constructor)
    }

    /// Methods in emission order: constructors first, then the rest, each
    /// group in declaration order.
    pub fn methods_in_order(&self) -> Vec<&Function> {
        let (ctors, others): (Vec<&Function>, Vec<&Function>) =
            self.methods.iter().partition(|m| m.is_constructor);
        ctors.into_iter().chain(others).collect()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLASS {}", self.name)
    }
}

/// Parse a base spec such as `: cv::Algorithm` into `Algorithm`.
fn parse_base(spec: &str) -> Option<String> {
    let spec = spec.trim().trim_start_matches(':').trim();
    let first = spec.split(|c: char| c == ',' || c.is_whitespace()).find(|s| !s.is_empty())?;
    let last = first.rsplit("::").next().unwrap_or(first);
    (!last.is_empty()).then(|| last.to_string())
}

/// A named constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: EntityName,
    /// Dotted name without the kind marker (`cv.Mat.AUTO_STEP`).
    pub full_name: String,
    /// Safe-side binding name (`Mat_AUTO_STEP`).
    pub rust_name: String,
    /// Native name used for deduplication.
    pub c_name: String,
    /// Declared value expression.
    pub value: String,
}

impl Constant {
    pub fn from_raw<S: AsRef<str>>(decl: &RawDeclaration, namespaces: &[S]) -> Self {
        let name = EntityName::resolve(decl.name(), namespaces);
        let full_name = strip_kind_marker(decl.name()).to_string();
        let segments: Vec<&str> = full_name.split('.').collect();
        let rust_name = if segments.len() > 1 {
            segments[1..].join("_")
        } else {
            full_name.clone()
        };
        Self {
            c_name: name.local_name.clone(),
            value: decl.spec().trim().to_string(),
            rust_name,
            full_name,
            name,
        }
    }

    /// Fully qualified native expression naming the constant, so nested
    /// namespaces resolve regardless of the `using` directive in effect.
    pub fn native_expr(&self) -> String {
        self.name.native_qualified()
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONST {}={}", self.name.local_name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decl(name: &str, spec: &str, mods: &[&str], args: Vec<RawArgument>) -> RawDeclaration {
        RawDeclaration(
            name.to_string(),
            spec.to_string(),
            mods.iter().map(|m| m.to_string()).collect(),
            args,
        )
    }

    #[test]
    fn normalize_template_spellings() {
        assert_eq!(normalize_type("vector_Point"), ("vector::Point".to_string(), false));
        assert_eq!(
            normalize_type("vector_vector_Point2f"),
            ("vector::vector::Point2f".to_string(), false)
        );
        assert_eq!(normalize_type("Ptr_FeatureDetector"), ("Ptr::FeatureDetector".to_string(), false));
        assert_eq!(normalize_type("size_t"), ("size_t".to_string(), false));
        assert_eq!(normalize_type("String"), ("string".to_string(), false));
        assert_eq!(normalize_type("Size2i"), ("Size".to_string(), false));
        assert_eq!(normalize_type("double*"), ("double".to_string(), true));
    }

    #[test]
    fn argument_direction_requires_marker() {
        let plain = Argument::from_raw(&RawArgument::new("Mat", "src"));
        assert_eq!(plain.direction, Direction::In);
        assert!(!plain.is_output());

        let out = Argument::from_raw(&RawArgument::new("Mat", "dst").with_modifier("/O"));
        assert_eq!(out.direction, Direction::Out);
        assert!(out.is_output());

        let inout = Argument::from_raw(&RawArgument::new("Mat", "img").with_modifier("/IO"));
        assert_eq!(inout.direction, Direction::InOut);
    }

    #[test]
    fn constructor_detection() {
        let ctor = Function::from_raw(&decl("cv.Mat.Mat", "", &[], vec![]), &["cv"], false);
        assert!(ctor.is_constructor);
        assert_eq!(ctor.return_type, "Mat");
        assert_eq!(ctor.owner().as_deref(), Some("Mat"));

        let method = Function::from_raw(&decl("cv.Mat.depth", "int", &["/C"], vec![]), &["cv"], false);
        assert!(!method.is_constructor);
        assert!(method.is_const);
        assert_eq!(method.return_type, "int");
    }

    #[test]
    fn free_function_has_no_owner() {
        let func = Function::from_raw(
            &decl(
                "cv.add",
                "int",
                &[],
                vec![RawArgument::new("int", "a"), RawArgument::new("int", "b").with_default("1")],
            ),
            &["cv"],
            false,
        );
        assert!(func.owner().is_none());
        assert!(!func.is_constructor);
        assert_eq!(func.default_arg_count(), 1);
        assert_eq!(func.to_string(), "FUNC <int cv.add(int a, int b = 1)>");
    }

    #[test]
    fn rename_modifier_sets_override() {
        let func = Function::from_raw(&decl("cv.Mat.create", "void", &["=createMat"], vec![]), &["cv"], false);
        assert_eq!(func.override_name, "createMat");
        assert_eq!(func.native_name(), "create");
    }

    #[test]
    fn class_base_and_nesting() {
        let class = Class::from_raw(&decl("class cv.FeatureDetector", ": cv::Algorithm", &[], vec![]), &["cv"]);
        assert_eq!(class.base.as_deref(), Some("Algorithm"));
        assert!(!class.is_nested);
        assert_eq!(class.native_name(), "cv::FeatureDetector");

        let nested = Class::from_raw(
            &decl(
                "struct cv.SimpleBlobDetector.Params",
                "",
                &["/Simple"],
                vec![RawArgument::new("float", "minArea").with_modifier("/RW")],
            ),
            &["cv"],
        );
        assert!(nested.is_nested);
        assert!(nested.is_simple);
        assert_eq!(nested.qualified, "SimpleBlobDetector::Params");
        assert_eq!(nested.ident, "SimpleBlobDetector_Params");
        assert!(nested.properties[0].read_write);
        assert_eq!(nested.base, None);
    }

    #[test]
    fn constant_names() {
        let c = Constant::from_raw(&decl("const cv.Mat.AUTO_STEP", "0", &[], vec![]), &["cv"]);
        assert_eq!(c.full_name, "cv.Mat.AUTO_STEP");
        assert_eq!(c.rust_name, "Mat_AUTO_STEP");
        assert_eq!(c.c_name, "AUTO_STEP");
        assert_eq!(c.native_expr(), "cv::Mat::AUTO_STEP");

        let bare = Constant::from_raw(&decl("const FLAG", "1", &[], vec![]), &["cv"]);
        assert_eq!(bare.rust_name, "FLAG");
        assert_eq!(bare.native_expr(), "FLAG");

        let nested_ns = Constant::from_raw(&decl("const cv.ml.VAR_ORDERED", "0", &[], vec![]), &["cv", "cv.ml"]);
        assert_eq!(nested_ns.native_expr(), "cv::ml::VAR_ORDERED");
    }

    #[test]
    fn methods_constructors_first() {
        let mut class = Class::from_raw(&decl("class cv.Mat", "", &[], vec![]), &["cv"]);
        class.methods.push(Function::from_raw(&decl("cv.Mat.depth", "int", &[], vec![]), &["cv"], false));
        class.methods.push(Function::from_raw(&decl("cv.Mat.Mat", "", &[], vec![]), &["cv"], false));
        let order: Vec<&str> = class.methods_in_order().iter().map(|m| m.native_name()).collect();
        assert_eq!(order, vec!["Mat", "depth"]);
    }
}
