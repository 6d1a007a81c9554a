//! Rust side rendering: extern declarations, the safe module, return record
//! structs, instantiation wrappers, and the shared error types.

use shimgen_core::GeneratorConfig;

use super::GENERATED_NOTICE;
use crate::ir::{
    BoxedIr, FunctionIr, ImplIr, InstanceIr, Item, ModuleIr, ReturnRecord, SafeWrap, StructIr, TraitIr,
};

/// Render `{module}.externs.rs`.
pub fn render_externs(module: &ModuleIr, config: &GeneratorConfig) -> String {
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    text.push_str("use std::os::raw::{c_char, c_void};\n");
    text.push_str("use crate::types::*;\n");
    if !module.is_base {
        text.push_str(&format!("use crate::{}::*;\n", config.base_module));
    }
    text.push_str(&format!("use crate::{}::*;\n\n", module.module));
    text.push_str("#[allow(improper_ctypes)]\n");
    text.push_str("extern \"C\" {\n");
    for item in &module.items {
        match item {
            Item::Function(f) => render_extern_fn(f, &mut text),
            Item::Trait(t) => t.methods.iter().for_each(|m| render_extern_fn(m, &mut text)),
            Item::Impl(i) => i.methods.iter().for_each(|m| render_extern_fn(m, &mut text)),
            Item::Boxed(b) => text.push_str(&format!("    pub fn {}(instance: *mut c_void);\n", b.destructor)),
            Item::Struct(_) => {}
        }
    }
    text.push_str("}\n");
    text
}

fn render_extern_fn(func: &FunctionIr, text: &mut String) {
    let params: Vec<String> = func
        .shim
        .params
        .iter()
        .map(|p| format!("{}: {}", shimgen_core::classify::sanitize_ident(&p.name), p.rust_type))
        .collect();
    text.push_str(&format!(
        "    pub fn {}({}) -> {};\n",
        func.shim.symbol,
        params.join(", "),
        func.shim.record.name
    ));
}

/// Render `{module}.rs`, the safe module.
pub fn render_safe_module(module: &ModuleIr, config: &GeneratorConfig) -> String {
    let m = &module.module;
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    text.push_str(&format!("pub mod {m} {{\n"));
    text.push_str("    #![allow(non_camel_case_types, non_snake_case, unused_imports, clippy::all)]\n");
    text.push_str("    use std::ffi::CString;\n");
    text.push_str("    use std::os::raw::{c_char, c_void};\n\n");
    text.push_str("    use crate::shim_types::{take_string, Error, Result};\n");
    text.push_str(&format!("    use crate::sys::{m} as sys;\n"));
    text.push_str("    use crate::types::*;\n");
    if !module.is_base {
        text.push_str(&format!("    use crate::{}::*;\n", config.base_module));
    }

    if !module.constants.is_empty() {
        text.push('\n');
        for line in module.constants.iter().filter_map(|c| c.render()) {
            text.push_str(&format!("    {line}\n"));
        }
        if module.has_deferred_constants() {
            text.push_str(&format!(
                "    include!(concat!(env!(\"OUT_DIR\"), \"/{m}.consts.rs\"));\n"
            ));
        }
    }

    for item in &module.items {
        text.push('\n');
        match item {
            Item::Struct(s) => render_struct(s, &mut text),
            Item::Function(f) => render_safe_fn(f, "    ", &mut text),
            Item::Boxed(b) => render_boxed(b, &mut text),
            Item::Trait(t) => render_trait(t, &mut text),
            Item::Impl(i) => render_impl(i, &mut text),
        }
    }

    text.push_str("}\n");
    text
}

fn render_struct(s: &StructIr, text: &mut String) {
    text.push_str("    #[repr(C)]\n");
    text.push_str("    #[derive(Debug, Clone, Copy, PartialEq)]\n");
    text.push_str(&format!("    pub struct {} {{\n", s.rust_name));
    for field in &s.fields {
        let ty = match field.array_len {
            Some(len) => format!("[{}; {len}]", field.rust_type),
            None => field.rust_type.clone(),
        };
        text.push_str(&format!("        pub {}: {ty},\n", field.rust_name));
    }
    text.push_str("    }\n");
}

fn render_safe_fn(func: &FunctionIr, indent: &str, text: &mut String) {
    let safe = &func.safe;
    for doc in &safe.docs {
        text.push_str(&format!("{indent}/// {doc}\n"));
    }
    let params: Vec<&str> = safe
        .receiver
        .iter()
        .chain(safe.params.iter())
        .map(String::as_str)
        .collect();
    let visibility = if safe.is_pub { "pub " } else { "" };
    let where_clause = if safe.where_sized { " where Self: Sized" } else { "" };
    text.push_str(&format!(
        "{indent}{visibility}fn {}({}) -> Result<{}>{where_clause} {{\n",
        safe.name,
        params.join(", "),
        safe.return_type
    ));
    for statement in &safe.prelude {
        text.push_str(&format!("{indent}    {statement}\n"));
    }
    text.push_str(&format!("{indent}    unsafe {{\n"));
    text.push_str(&format!(
        "{indent}        let rv = sys::{}({});\n",
        safe.shim,
        safe.call_args.join(", ")
    ));
    text.push_str(&format!("{indent}        if !rv.error_msg.is_null() {{\n"));
    text.push_str(&format!(
        "{indent}            return Err(Error::from_native(rv.error_msg));\n"
    ));
    text.push_str(&format!("{indent}        }}\n"));
    let value = match &safe.wrap {
        SafeWrap::Unit => "()".to_string(),
        SafeWrap::String => "take_string(rv.result)".to_string(),
        SafeWrap::Handle { rust_type } => format!("{rust_type} {{ ptr: rv.result }}"),
        SafeWrap::Bool => "rv.result != 0".to_string(),
        SafeWrap::Copy => "rv.result".to_string(),
    };
    text.push_str(&format!("{indent}        Ok({value})\n"));
    text.push_str(&format!("{indent}    }}\n"));
    text.push_str(&format!("{indent}}}\n"));
}

fn render_boxed(boxed: &BoxedIr, text: &mut String) {
    let ident = &boxed.ident;
    text.push_str(&format!("    pub struct {ident} {{\n"));
    text.push_str("        pub ptr: *mut c_void,\n");
    text.push_str("    }\n\n");
    text.push_str(&format!("    impl {ident} {{\n"));
    text.push_str("        pub fn as_raw(&self) -> *mut c_void {\n");
    text.push_str("            self.ptr\n");
    text.push_str("        }\n");
    text.push_str("    }\n\n");
    text.push_str(&format!("    impl Drop for {ident} {{\n"));
    text.push_str("        fn drop(&mut self) {\n");
    text.push_str(&format!("            unsafe {{ sys::{}(self.ptr) }};\n", boxed.destructor));
    text.push_str("        }\n");
    text.push_str("    }\n");
    for base in &boxed.traits {
        text.push('\n');
        text.push_str(&format!("    impl {base} for {ident} {{\n"));
        text.push_str("        fn as_raw(&self) -> *mut c_void {\n");
        text.push_str("            self.ptr\n");
        text.push_str("        }\n");
        text.push_str("    }\n");
    }
}

fn render_trait(t: &TraitIr, text: &mut String) {
    text.push_str(&format!("    pub trait {} {{\n", t.ident));
    text.push_str("        fn as_raw(&self) -> *mut c_void;\n");
    for method in &t.methods {
        text.push('\n');
        render_safe_fn(method, "        ", text);
    }
    text.push_str("    }\n");
}

fn render_impl(i: &ImplIr, text: &mut String) {
    text.push_str(&format!("    impl {} {{\n", i.ident));
    for (n, method) in i.methods.iter().enumerate() {
        if n > 0 {
            text.push('\n');
        }
        render_safe_fn(method, "        ", text);
    }
    text.push_str("    }\n");
}

/// Render `{record}.rv.rs`.
pub fn render_record_rs(record: &ReturnRecord) -> String {
    let mut text = String::new();
    text.push_str("#[repr(C)]\n");
    text.push_str("#[allow(non_camel_case_types)]\n");
    text.push_str(&format!("pub struct {} {{\n", record.name));
    text.push_str("    pub error_msg: *const std::os::raw::c_char,\n");
    text.push_str(&format!("    pub result: {},\n", qualify_raw(&record.rust_result)));
    text.push_str("}\n");
    text
}

/// Render `{Name}.type.rs` for a template instantiation.
pub fn render_instance_rs(instance: &InstanceIr) -> String {
    let name = &instance.instance.name;
    let mut text = String::new();
    text.push_str(&format!("pub struct {name} {{\n"));
    text.push_str("    pub ptr: *mut std::os::raw::c_void,\n");
    text.push_str("}\n\n");

    text.push_str("extern \"C\" {\n");
    if let Some(new_symbol) = &instance.new_symbol {
        text.push_str(&format!("    fn {new_symbol}() -> *mut std::os::raw::c_void;\n"));
    }
    text.push_str(&format!(
        "    fn {}(ptr: *mut std::os::raw::c_void);\n",
        instance.delete_symbol
    ));
    if let Some(len_symbol) = &instance.len_symbol {
        text.push_str(&format!("    fn {len_symbol}(ptr: *mut std::os::raw::c_void) -> i32;\n"));
    }
    text.push_str("}\n\n");

    text.push_str(&format!("impl {name} {{\n"));
    if let Some(new_symbol) = &instance.new_symbol {
        text.push_str("    #[allow(clippy::new_without_default)]\n");
        text.push_str(&format!("    pub fn new() -> {name} {{\n"));
        text.push_str(&format!("        {name} {{ ptr: unsafe {{ {new_symbol}() }} }}\n"));
        text.push_str("    }\n\n");
    }
    if let Some(len_symbol) = &instance.len_symbol {
        text.push_str("    pub fn len(&self) -> usize {\n");
        text.push_str(&format!("        unsafe {{ {len_symbol}(self.ptr) as usize }}\n"));
        text.push_str("    }\n\n");
        text.push_str("    pub fn is_empty(&self) -> bool {\n");
        text.push_str("        self.len() == 0\n");
        text.push_str("    }\n\n");
    }
    text.push_str("    pub fn as_raw(&self) -> *mut std::os::raw::c_void {\n");
    text.push_str("        self.ptr\n");
    text.push_str("    }\n");
    text.push_str("}\n\n");

    text.push_str(&format!("impl Drop for {name} {{\n"));
    text.push_str("    fn drop(&mut self) {\n");
    text.push_str(&format!("        unsafe {{ {}(self.ptr) }};\n", instance.delete_symbol));
    text.push_str("    }\n");
    text.push_str("}\n");
    text
}

/// Render `shim_types.rs`, shared by every generated module.
pub fn render_shim_types() -> String {
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    text.push_str(SHIM_TYPES);
    text
}

const SHIM_TYPES: &str = r#"use std::ffi::{CStr, NulError};
use std::fmt;
use std::os::raw::{c_char, c_void};

extern "C" {
    fn free(ptr: *mut c_void);
}

/// An error raised by native code, or a string that could not cross the
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub message: String,
}

impl Error {
    /// Take ownership of a native error message and free it.
    ///
    /// # Safety
    ///
    /// `msg` must be a non-null, NUL-terminated buffer allocated with `malloc`.
    pub unsafe fn from_native(msg: *const c_char) -> Self {
        Error {
            message: take_string(msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<NulError> for Error {
    fn from(err: NulError) -> Self {
        Error {
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Copy a native string and free the native buffer.
///
/// # Safety
///
/// `ptr` must be a non-null, NUL-terminated buffer allocated with `malloc`.
pub unsafe fn take_string(ptr: *const c_char) -> String {
    let value = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    free(ptr as *mut c_void);
    value
}
"#;

/// Spell raw pointer element types with their full path.
fn qualify_raw(ty: &str) -> String {
    ty.replace("c_void", "std::os::raw::c_void")
        .replace("c_char", "std::os::raw::c_char")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::ir::{NativeCall, NativeReturn, ShimIr, ShimParam, SafeFnIr};

    fn function(safe: SafeFnIr) -> FunctionIr {
        FunctionIr {
            rendering: String::new(),
            default_args: 0,
            shim: ShimIr {
                symbol: safe.shim.clone(),
                record: ReturnRecord {
                    name: "cv_return_value_int".into(),
                    c_result: "int".into(),
                    rust_result: "i32".into(),
                },
                params: vec![ShimParam {
                    name: "type".into(),
                    c_type: "int".into(),
                    rust_type: "i32".into(),
                }],
                call: NativeCall::Void {
                    callee: "cv::f".into(),
                    args: vec![],
                },
                ret: NativeReturn::Unit,
                exception: "cv::Exception".into(),
                comments: vec![],
            },
            safe,
        }
    }

    fn add() -> SafeFnIr {
        SafeFnIr {
            name: "add".into(),
            is_pub: true,
            docs: vec!["* b: default 1".into()],
            receiver: None,
            params: vec!["a: i32".into(), "b: i32".into()],
            return_type: "i32".into(),
            prelude: vec![],
            shim: "cv_core_add_II".into(),
            call_args: vec!["a".into(), "b".into()],
            wrap: SafeWrap::Copy,
            where_sized: false,
        }
    }

    #[test]
    fn safe_fn_checks_error_first() {
        let mut text = String::new();
        render_safe_fn(&function(add()), "", &mut text);
        assert_eq!(
            text,
            "/// * b: default 1\n\
             pub fn add(a: i32, b: i32) -> Result<i32> {\n\
             \x20   unsafe {\n\
             \x20       let rv = sys::cv_core_add_II(a, b);\n\
             \x20       if !rv.error_msg.is_null() {\n\
             \x20           return Err(Error::from_native(rv.error_msg));\n\
             \x20       }\n\
             \x20       Ok(rv.result)\n\
             \x20   }\n\
             }\n"
        );
    }

    #[test]
    fn trait_static_method() {
        let mut safe = add();
        safe.is_pub = false;
        safe.where_sized = true;
        safe.docs.clear();
        safe.prelude = vec!["let name = CString::new(name)?;".into()];
        safe.wrap = SafeWrap::Handle {
            rust_type: "PtrOfORB".into(),
        };
        let mut text = String::new();
        render_safe_fn(&function(safe), "", &mut text);
        assert!(text.starts_with("fn add(a: i32, b: i32) -> Result<i32> where Self: Sized {\n"));
        assert!(text.contains("    let name = CString::new(name)?;\n    unsafe {"));
        assert!(text.contains("Ok(PtrOfORB { ptr: rv.result })"));
    }

    #[test]
    fn receiver_comes_first() {
        let mut safe = add();
        safe.receiver = Some("&mut self".into());
        safe.wrap = SafeWrap::Bool;
        let mut text = String::new();
        render_safe_fn(&function(safe), "", &mut text);
        assert!(text.contains("pub fn add(&mut self, a: i32, b: i32)"));
        assert!(text.contains("Ok(rv.result != 0)"));
    }

    #[test]
    fn extern_params_are_sanitized() {
        let mut text = String::new();
        render_extern_fn(&function(add()), &mut text);
        assert_eq!(text, "    pub fn cv_core_add_II(_type: i32) -> cv_return_value_int;\n");
    }

    #[test]
    fn boxed_wrapper_drops_once() {
        let mut text = String::new();
        render_boxed(
            &BoxedIr {
                ident: "ORB".into(),
                native: "cv::ORB".into(),
                destructor: "cv_features2d_delete_ORB".into(),
                traits: vec!["Feature2D".into()],
            },
            &mut text,
        );
        assert!(text.contains("pub struct ORB {\n        pub ptr: *mut c_void,\n    }"));
        assert_eq!(text.matches("cv_features2d_delete_ORB").count(), 1);
        assert!(text.contains("impl Drop for ORB"));
        assert!(text.contains("impl Feature2D for ORB"));
    }

    #[test]
    fn record_struct() {
        let text = render_record_rs(&ReturnRecord {
            name: "cv_return_value_void_".into(),
            c_result: "void*".into(),
            rust_result: "*mut c_void".into(),
        });
        assert!(text.contains("pub struct cv_return_value_void_ {"));
        assert!(text.contains("pub result: *mut std::os::raw::c_void,"));
        assert_eq!(text.matches("error_msg").count(), 1);
    }

    #[test]
    fn shim_types_define_error_and_result() {
        let text = render_shim_types();
        assert!(text.contains("pub struct Error"));
        assert!(text.contains("pub type Result<T, E = Error>"));
        assert!(text.contains("pub unsafe fn take_string"));
    }
}
