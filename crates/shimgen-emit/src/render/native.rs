//! C/C++ side rendering: module shims, struct typedefs, return records, and
//! template instantiation shims.

use shimgen_core::{GeneratorConfig, InstanceKind};

use super::GENERATED_NOTICE;
use crate::ir::{BoxedIr, FunctionIr, InstanceIr, Item, ModuleIr, NativeCall, NativeReturn, ReturnRecord, StructIr};

/// Render `{module}.cpp`.
pub fn render_module_cpp(module: &ModuleIr, config: &GeneratorConfig) -> String {
    let guard = config.module_guard(&module.module);
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    text.push_str("#include <cstdlib>\n");
    text.push_str("#include <cstring>\n");
    text.push_str("#include <string>\n");
    if !module.is_base {
        text.push_str(&format!("#include \"{}.types.h\"\n", config.base_module));
    }
    text.push_str(&format!("#include \"{}.types.h\"\n", module.module));
    for record in &module.records {
        text.push_str(&format!("#include \"{}.type.h\"\n", record.name));
    }
    text.push('\n');
    if let Some(header) = &config.modules_header {
        text.push_str(&format!("#include \"{header}\"\n"));
    }
    text.push_str(&format!("#ifdef {guard}\n\n"));
    text.push_str(&format!("#include \"{}\"\n", config.module_header(&module.module)));
    for header in &module.headers {
        text.push_str(&format!("#include \"{header}\"\n"));
    }
    if !config.native_namespace.is_empty() {
        text.push_str(&format!("using namespace {};\n", config.native_namespace));
    }
    text.push_str("\nextern \"C\" {\n\n");

    for item in &module.items {
        match item {
            Item::Function(f) => render_shim(f, &mut text),
            Item::Boxed(b) => render_destructor(b, &mut text),
            Item::Trait(t) => t.methods.iter().for_each(|m| render_shim(m, &mut text)),
            Item::Impl(i) => i.methods.iter().for_each(|m| render_shim(m, &mut text)),
            Item::Struct(_) => {}
        }
    }

    text.push_str("} // extern \"C\"\n\n");
    text.push_str(&format!("#endif // {guard}\n"));
    text
}

fn render_shim(func: &FunctionIr, text: &mut String) {
    let shim = &func.shim;
    for comment in &shim.comments {
        text.push_str(&format!("// {comment}\n"));
    }
    let params: Vec<String> = shim
        .params
        .iter()
        .map(|p| format!("{} {}", p.c_type, p.name))
        .collect();
    text.push_str(&format!(
        "{} {}({}) {{\n",
        shim.record.name,
        shim.symbol,
        params.join(", ")
    ));
    text.push_str("    try {\n");

    match &shim.call {
        NativeCall::Void { callee, args } => {
            text.push_str(&format!("        {callee}({});\n", args.join(", ")));
        }
        NativeCall::NewBoxed { native, args } => {
            text.push_str(&format!(
                "        {native}* cpp_return_value = new {native}({});\n",
                args.join(", ")
            ));
        }
        NativeCall::InPlace { native, args } if args.is_empty() => {
            text.push_str(&format!("        {native} cpp_return_value;\n"));
        }
        NativeCall::InPlace { native, args } => {
            text.push_str(&format!("        {native} cpp_return_value({});\n", args.join(", ")));
        }
        NativeCall::Value { native, callee, args } => {
            text.push_str(&format!(
                "        {native} cpp_return_value = {callee}({});\n",
                args.join(", ")
            ));
        }
    }

    let result = match &shim.ret {
        NativeReturn::Unit => "0".to_string(),
        NativeReturn::Pointer | NativeReturn::Direct => "cpp_return_value".to_string(),
        NativeReturn::Strdup => "strdup(cpp_return_value.c_str())".to_string(),
        NativeReturn::HeapCopy { native } => format!("new {native}(cpp_return_value)"),
        NativeReturn::Reinterpret { c_type } => format!("*reinterpret_cast<{c_type}*>(&cpp_return_value)"),
    };
    text.push_str(&format!("        return {{ NULL, {result} }};\n"));
    text.push_str(&format!("    }} catch ({}& e) {{\n", shim.exception));
    text.push_str("        return { strdup(e.what()), {} };\n");
    text.push_str("    } catch (...) {\n");
    text.push_str("        return { strdup(\"unspecified error in native code\"), {} };\n");
    text.push_str("    }\n");
    text.push_str("}\n\n");
}

fn render_destructor(boxed: &BoxedIr, text: &mut String) {
    text.push_str(&format!("void {}(void* instance) {{\n", boxed.destructor));
    text.push_str(&format!("    delete ({}*) instance;\n", boxed.native));
    text.push_str("}\n\n");
}

/// Render `{module}.types.h` with the module's fixed-layout structs.
pub fn render_types_h(module: &ModuleIr, config: &GeneratorConfig) -> String {
    let guard = format!(
        "{}_{}_TYPES_H",
        config.prefix.to_uppercase(),
        module.module.to_uppercase()
    );
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    text.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
    for item in &module.items {
        if let Item::Struct(s) = item {
            render_typedef(s, &mut text);
        }
    }
    text.push_str(&format!("#endif // {guard}\n"));
    text
}

fn render_typedef(s: &StructIr, text: &mut String) {
    text.push_str(&format!("typedef struct {} {{\n", s.c_name));
    for field in &s.fields {
        match field.array_len {
            Some(len) => text.push_str(&format!("    {} {}[{len}];\n", field.c_type, field.c_name)),
            None => text.push_str(&format!("    {} {};\n", field.c_type, field.c_name)),
        }
    }
    text.push_str(&format!("}} {};\n\n", s.c_name));
}

/// Render `{record}.type.h`.
pub fn render_record_h(record: &ReturnRecord) -> String {
    let guard = format!("{}_H", record.name.to_uppercase());
    let mut text = String::new();
    text.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
    text.push_str(&format!("typedef struct {} {{\n", record.name));
    text.push_str("    char* error_msg;\n");
    text.push_str(&format!("    {} result;\n", record.c_result));
    text.push_str(&format!("}} {};\n\n", record.name));
    text.push_str(&format!("#endif // {guard}\n"));
    text
}

/// Render `{Name}.type.cpp` for a template instantiation.
pub fn render_instance_cpp(instance: &InstanceIr, module: &str, config: &GeneratorConfig) -> String {
    let native = &instance.instance.native_type;
    let mut text = String::new();
    text.push_str(GENERATED_NOTICE);
    text.push('\n');
    if instance.instance.kind != InstanceKind::Ptr {
        text.push_str("#include <vector>\n");
    }
    if let Some(header) = &config.modules_header {
        text.push_str(&format!("#include \"{header}\"\n"));
    }
    text.push_str(&format!("#include \"{}\"\n", config.module_header(module)));
    if !config.native_namespace.is_empty() {
        text.push_str(&format!("using namespace {};\n", config.native_namespace));
    }
    text.push_str("\nextern \"C\" {\n\n");
    if let Some(new_symbol) = &instance.new_symbol {
        text.push_str(&format!("void* {new_symbol}() {{\n"));
        text.push_str(&format!("    return new {native}();\n"));
        text.push_str("}\n\n");
    }
    text.push_str(&format!("void {}(void* ptr) {{\n", instance.delete_symbol));
    text.push_str(&format!("    delete (({native}*) ptr);\n"));
    text.push_str("}\n\n");
    if let Some(len_symbol) = &instance.len_symbol {
        text.push_str(&format!("int {len_symbol}(void* ptr) {{\n"));
        text.push_str(&format!("    return (int) (({native}*) ptr)->size();\n"));
        text.push_str("}\n\n");
    }
    text.push_str("} // extern \"C\"\n");
    text
}
