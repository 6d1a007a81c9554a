//! Structured intermediate records produced by the emitters.
//!
//! Emitters decide *what* goes on each side of the boundary; the renderers
//! in [`crate::render`] only turn these records into text.

use serde::Serialize;
use shimgen_core::TemplateInstance;

use crate::constants::ConstantBinding;

/// Where a function is being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmitMode {
    /// Inherent method or free function.
    Definition,
    /// Provided method of a capability trait.
    TraitDeclaration,
}

/// Outcome of emitting one function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Emission {
    Ported(Box<FunctionIr>),
    Skipped { rendering: String, reason: String },
}

/// The `{error_msg, result}` record every shim returns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReturnRecord {
    /// Record type name (`cv_return_value_int`).
    pub name: String,
    /// C type of the `result` field.
    pub c_result: String,
    /// Rust type of the `result` field.
    pub rust_result: String,
}

/// One parameter of a shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShimParam {
    pub name: String,
    /// C declaration type.
    pub c_type: String,
    /// Rust extern declaration type.
    pub rust_type: String,
}

/// How the native callee is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NativeCall {
    /// `callee(args);`
    Void { callee: String, args: Vec<String> },
    /// `T* cpp_return_value = new T(args);`
    NewBoxed { native: String, args: Vec<String> },
    /// `T cpp_return_value(args);`
    InPlace { native: String, args: Vec<String> },
    /// `T cpp_return_value = callee(args);`
    Value {
        native: String,
        callee: String,
        args: Vec<String>,
    },
}

/// How `cpp_return_value` becomes the record's `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NativeReturn {
    Unit,
    /// Already a pointer to a fresh instance.
    Pointer,
    /// `strdup(cpp_return_value.c_str())`
    Strdup,
    /// `new T(cpp_return_value)`
    HeapCopy { native: String },
    /// `*reinterpret_cast<C*>(&cpp_return_value)`
    Reinterpret { c_type: String },
    Direct,
}

/// The native half of a ported function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShimIr {
    pub symbol: String,
    pub record: ReturnRecord,
    pub params: Vec<ShimParam>,
    pub call: NativeCall,
    pub ret: NativeReturn,
    /// Native exception type caught first.
    pub exception: String,
    /// Comment lines written above the shim.
    pub comments: Vec<String>,
}

/// How the safe wrapper turns a successful record into its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SafeWrap {
    Unit,
    /// Owned copy of a native string; the native buffer is freed.
    String,
    /// Wrapper struct around the returned handle.
    Handle { rust_type: String },
    Bool,
    Copy,
}

/// The safe half of a ported function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeFnIr {
    pub name: String,
    pub is_pub: bool,
    pub docs: Vec<String>,
    /// `&self` or `&mut self`.
    pub receiver: Option<String>,
    /// `name: Type` pairs.
    pub params: Vec<String>,
    pub return_type: String,
    /// Statements before the call (string conversions).
    pub prelude: Vec<String>,
    pub shim: String,
    pub call_args: Vec<String>,
    pub wrap: SafeWrap,
    /// Static method of a trait.
    pub where_sized: bool,
}

/// A ported function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionIr {
    /// Report rendering of the source declaration.
    pub rendering: String,
    pub default_args: usize,
    pub shim: ShimIr,
    pub safe: SafeFnIr,
}

/// A field of a fixed-layout struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIr {
    pub c_name: String,
    pub c_type: String,
    pub rust_name: String,
    pub rust_type: String,
    /// Array length for `elem[N]` fields.
    pub array_len: Option<usize>,
}

/// A fixed-layout struct shared by both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructIr {
    pub c_name: String,
    pub rust_name: String,
    pub fields: Vec<FieldIr>,
}

/// Owning wrapper around an opaque handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxedIr {
    pub ident: String,
    pub native: String,
    /// Destructor shim symbol.
    pub destructor: String,
    /// Capability traits implemented for the wrapper.
    pub traits: Vec<String>,
}

/// A capability trait and its provided methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitIr {
    pub ident: String,
    pub methods: Vec<FunctionIr>,
}

/// An inherent impl block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImplIr {
    pub ident: String,
    pub methods: Vec<FunctionIr>,
}

/// One item of the safe module, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Item {
    Struct(StructIr),
    Function(Box<FunctionIr>),
    Boxed(BoxedIr),
    Trait(TraitIr),
    Impl(ImplIr),
}

/// Shim symbols for a template instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceIr {
    pub instance: TemplateInstance,
    pub new_symbol: Option<String>,
    pub delete_symbol: String,
    pub len_symbol: Option<String>,
}

/// Everything emitted for one module, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleIr {
    pub module: String,
    /// The module other modules import shared types from.
    pub is_base: bool,
    /// Native headers the declarations came from.
    pub headers: Vec<String>,
    pub items: Vec<Item>,
    pub constants: Vec<ConstantBinding>,
    pub instances: Vec<InstanceIr>,
    /// Return records used by this module, ordered by name.
    pub records: Vec<ReturnRecord>,
}

impl ModuleIr {
    /// Every ported function, wherever it was emitted.
    pub fn functions(&self) -> Vec<&FunctionIr> {
        let mut functions = Vec::new();
        for item in &self.items {
            match item {
                Item::Function(f) => functions.push(f.as_ref()),
                Item::Trait(t) => functions.extend(&t.methods),
                Item::Impl(i) => functions.extend(&i.methods),
                Item::Struct(_) | Item::Boxed(_) => {}
            }
        }
        functions
    }

    pub fn has_deferred_constants(&self) -> bool {
        self.constants.iter().any(ConstantBinding::is_deferred)
    }
}
