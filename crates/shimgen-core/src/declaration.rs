//! Declaration file parsing.
//!
//! A declaration file is the JSON output of the external header parser: the
//! namespaces of the source unit, the headers it came from, and one raw
//! tuple per class, function, or constant.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A complete declaration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationFile {
    /// Namespaces known to the source unit.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Native headers the declarations came from.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Raw declaration tuples, in file order.
    #[serde(default)]
    pub declarations: Vec<RawDeclaration>,
}

impl DeclarationFile {
    /// Parse a declaration file from a JSON string.
    pub fn parse(input: &str) -> Result<Self> {
        let file: DeclarationFile = serde_json::from_str(input)?;

        if let Some(bad) = file.declarations.iter().find(|d| d.name().trim().is_empty()) {
            return Err(CoreError::InvalidDeclaration {
                detail: format!("declaration with empty name: {bad:?}"),
            });
        }

        Ok(file)
    }

    /// Parse a declaration file from a path.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

/// Kind of a raw declaration, decided by its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Constant,
    Function,
}

/// One raw declaration tuple:
/// `(full_name, return_type_or_base_spec, modifiers, args_or_properties)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeclaration(
    pub String,
    pub String,
    #[serde(default)] pub Vec<String>,
    #[serde(default)] pub Vec<RawArgument>,
);

impl RawDeclaration {
    /// Full dotted name, including any kind marker.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Return type (functions), base spec (classes), or value (constants).
    pub fn spec(&self) -> &str {
        &self.1
    }

    /// Modifier tokens.
    pub fn modifiers(&self) -> ModifierSet {
        ModifierSet::parse(&self.2)
    }

    /// Arguments (functions) or properties (classes).
    pub fn items(&self) -> &[RawArgument] {
        &self.3
    }

    pub fn kind(&self) -> DeclarationKind {
        let name = self.0.trim_start();
        if name.starts_with("class ") || name.starts_with("struct ") {
            DeclarationKind::Class
        } else if name.starts_with("const ") {
            DeclarationKind::Constant
        } else {
            DeclarationKind::Function
        }
    }
}

/// One raw argument or property tuple: `(type, name, default?, modifiers?)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ArgumentRepr", into = "ArgumentRepr")]
pub struct RawArgument {
    pub type_name: String,
    pub name: String,
    pub default_value: String,
    pub modifiers: Vec<String>,
}

impl RawArgument {
    pub fn new(type_name: &str, name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            name: name.to_string(),
            default_value: String::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = value.to_string();
        self
    }

    pub fn with_modifier(mut self, token: &str) -> Self {
        self.modifiers.push(token.to_string());
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ArgumentRepr {
    Full(String, String, String, TokenList),
    Defaulted(String, String, String),
    Bare(String, String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TokenList {
    List(Vec<String>),
    Single(String),
}

impl From<ArgumentRepr> for RawArgument {
    fn from(repr: ArgumentRepr) -> Self {
        let (type_name, name, default_value, modifiers) = match repr {
            ArgumentRepr::Full(t, n, d, TokenList::List(mods)) => (t, n, d, mods),
            ArgumentRepr::Full(t, n, d, TokenList::Single(token)) => (
                t,
                n,
                d,
                token.split_whitespace().map(str::to_string).collect(),
            ),
            ArgumentRepr::Defaulted(t, n, d) => (t, n, d, Vec::new()),
            ArgumentRepr::Bare(t, n) => (t, n, String::new(), Vec::new()),
        };
        Self {
            type_name,
            name,
            default_value,
            modifiers,
        }
    }
}

impl From<RawArgument> for ArgumentRepr {
    fn from(arg: RawArgument) -> Self {
        ArgumentRepr::Full(
            arg.type_name,
            arg.name,
            arg.default_value,
            TokenList::List(arg.modifiers),
        )
    }
}

/// The closed set of modifier flags, parsed once from raw tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierSet {
    /// `/C`
    pub is_const: bool,
    /// `/S`
    pub is_static: bool,
    /// `/O`
    pub is_output: bool,
    /// `/IO`
    pub is_inout: bool,
    /// `/Simple` or `/Map`
    pub is_simple: bool,
    /// `/RW`
    pub read_write: bool,
    /// `=name`
    pub rename: Option<String>,
}

impl ModifierSet {
    /// Parse raw modifier tokens. Unknown tokens are ignored.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut set = Self::default();
        for token in tokens.iter().map(AsRef::as_ref) {
            match token {
                "/C" => set.is_const = true,
                "/S" => set.is_static = true,
                "/O" => set.is_output = true,
                "/IO" => set.is_inout = true,
                "/Simple" | "/Map" => set.is_simple = true,
                "/RW" => set.read_write = true,
                other => {
                    if let Some(name) = other.strip_prefix('=') {
                        set.rename = Some(name.to_string());
                    }
                }
            }
        }
        set
    }
}
