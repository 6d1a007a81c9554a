//! Constant bindings.
//!
//! Literal constants are bound directly. Anything else is deferred to a
//! native dump program that evaluates the expression and prints a binding
//! line in the same literal format.

use serde::Serialize;
use shimgen_core::Constant;

/// How a constant reaches the safe module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConstantBinding {
    /// `pub const NAME: &str = "...";`
    Str { name: String, value: String },
    /// `pub const NAME: i32 = ...;`, or `i64` when `wide`.
    Int { name: String, value: String, wide: bool },
    /// Evaluated natively through `expr`.
    Deferred { name: String, expr: String },
}

impl ConstantBinding {
    pub fn name(&self) -> &str {
        match self {
            ConstantBinding::Str { name, .. }
            | ConstantBinding::Int { name, .. }
            | ConstantBinding::Deferred { name, .. } => name,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, ConstantBinding::Deferred { .. })
    }

    /// The Rust binding line, `None` for deferred constants.
    pub fn render(&self) -> Option<String> {
        match self {
            ConstantBinding::Str { name, value } => Some(format!("pub const {name}: &str = {value};")),
            ConstantBinding::Int { name, value, wide } => Some(format!(
                "pub const {name}: {} = {value};",
                if *wide { "i64" } else { "i32" }
            )),
            ConstantBinding::Deferred { .. } => None,
        }
    }

    /// The dump program statement, `None` for literal constants.
    ///
    /// The value is printed as `i32` when it fits and as `i64` otherwise,
    /// the same choice [`bind`] makes for literals.
    pub fn dump_statement(&self) -> Option<String> {
        match self {
            ConstantBinding::Deferred { name, expr } => Some(format!(
                "{{ long long v = (long long)({expr}); \
                 printf(v < INT_MIN || v > INT_MAX ? \"pub const {name}: i64 = %lld;\\n\" \
                 : \"pub const {name}: i32 = %lld;\\n\", v); }}"
            )),
            _ => None,
        }
    }
}

/// Decide how a constant is bound.
pub fn bind(constant: &Constant) -> ConstantBinding {
    let name = constant.rust_name.clone();
    let value = constant.value.trim();
    if value.starts_with('"') {
        return ConstantBinding::Str {
            name,
            value: value.to_string(),
        };
    }
    match integer_value(value) {
        Some(parsed) => ConstantBinding::Int {
            name,
            value: value.to_string(),
            wide: i32::try_from(parsed).is_err(),
        },
        None => ConstantBinding::Deferred {
            name,
            expr: constant.native_expr(),
        },
    }
}

/// Parse a decimal or `0x` hexadecimal literal.
fn integer_value(literal: &str) -> Option<i128> {
    if let Some(hex) = literal.strip_prefix("0x") {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return i128::from_str_radix(hex, 16).ok();
    }
    let digits = literal.strip_prefix('-').unwrap_or(literal);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    literal.parse().ok()
}

/// Parse a binding line written by [`ConstantBinding::render`] or by the
/// dump program.
pub fn parse_binding(line: &str) -> Option<ConstantBinding> {
    let rest = line.trim().strip_prefix("pub const ")?.strip_suffix(';')?;
    let (name, rest) = rest.split_once(':')?;
    let (ty, value) = rest.split_once('=')?;
    let name = name.trim().to_string();
    let value = value.trim().to_string();
    match ty.trim() {
        "&str" | "&'static str" => Some(ConstantBinding::Str { name, value }),
        "i32" | "i64" => {
            let parsed = integer_value(&value)?;
            Some(ConstantBinding::Int {
                name,
                wide: i32::try_from(parsed).is_err(),
                value,
            })
        }
        _ => None,
    }
}

/// The constants dump program for a module.
pub fn dump_program(bindings: &[ConstantBinding], includes: &[String], namespace: &str) -> String {
    let mut text = String::new();
    text.push_str("#include <climits>\n");
    text.push_str("#include <cstdio>\n");
    for include in includes {
        text.push_str(&format!("#include \"{include}\"\n"));
    }
    if !namespace.is_empty() {
        text.push_str(&format!("using namespace {namespace};\n"));
    }
    text.push_str("int main(int argc, char** argv) {\n");
    for statement in bindings.iter().filter_map(ConstantBinding::dump_statement) {
        text.push_str(&format!("    {statement}\n"));
    }
    text.push_str("    return 0;\n");
    text.push_str("}\n");
    text
}
