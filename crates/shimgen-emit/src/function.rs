//! Function emission: one shim plus one safe wrapper per ported function.

use shimgen_core::classify::sanitize_ident;
use shimgen_core::config::is_identifier;
use shimgen_core::{Argument, Category, Class, ClassKind, Function, TypeLookup, TypeMapping};

use crate::emitter::Emitter;
use crate::ir::{
    EmitMode, Emission, FunctionIr, NativeCall, NativeReturn, SafeFnIr, SafeWrap, ShimIr, ShimParam,
};

/// Both halves of one argument.
struct ArgParts {
    shim: ShimParam,
    native_arg: String,
    safe_param: String,
    prelude: Option<String>,
    call_arg: String,
}

impl Emitter<'_> {
    /// Emit a free function (`owner == None`), method, or constructor.
    pub fn emit_function(&mut self, owner: Option<&Class>, func: &Function, mode: EmitMode) -> Emission {
        if let Some(reason) = self.skip_reason(func) {
            tracing::debug!(function = %func, %reason, "function skipped");
            return Emission::Skipped {
                rendering: func.to_string(),
                reason,
            };
        }

        let ctx = self.context();
        let config = ctx.config();
        let prefix = &config.prefix;
        let module = ctx.module();
        let owner_kind = owner.map(|c| ctx.class_kind(c));

        let suffix: String = if func.args.is_empty() {
            String::new()
        } else {
            std::iter::once('_')
                .chain(func.args.iter().filter_map(Argument::type_initial))
                .collect()
        };
        let base_symbol = match owner {
            None => format!("{prefix}_{module}_{}{suffix}", func.override_name),
            Some(class) => format!("{prefix}_{module}_{}_{}{suffix}", class.ident, func.override_name),
        };

        let mut params = Vec::new();
        let mut native_args = Vec::new();
        let mut safe_params = Vec::new();
        let mut prelude = Vec::new();
        let mut call_args = Vec::new();
        let mut receiver = None;
        let mut docs = Vec::new();

        let has_instance = owner.is_some() && !func.is_constructor && !func.is_static;
        let mut callee = match owner {
            None => func.name.native_qualified(),
            Some(class) => format!("{}::{}", class.native_name(), func.native_name()),
        };

        if let (true, Some(class)) = (has_instance, owner) {
            let constness = if func.is_const { "const " } else { "" };
            let native = class.native_name();
            if owner_kind == Some(ClassKind::Value) {
                let mapping = self.map(&class.qualified);
                params.push(ShimParam {
                    name: "instance".to_string(),
                    c_type: format!("{constness}{}*", mapping.c_type),
                    rust_type: format!("{} {}", if func.is_const { "*const" } else { "*mut" }, mapping.rust_ffi_type),
                });
                call_args.push("self".to_string());
                callee = format!(
                    "reinterpret_cast<{constness}{native}*>(instance)->{}",
                    func.native_name()
                );
            } else {
                params.push(ShimParam {
                    name: "instance".to_string(),
                    c_type: format!("{constness}void*"),
                    rust_type: if func.is_const { "*const c_void" } else { "*mut c_void" }.to_string(),
                });
                call_args.push("self.as_raw()".to_string());
                callee = format!("(({constness}{native}*) instance)->{}", func.native_name());
            }
            receiver = Some(if func.is_const { "&self" } else { "&mut self" }.to_string());
        }

        for arg in &func.args {
            let parts = self.argument(arg);
            if let Some(default) = &arg.default_value {
                docs.push(format!("* {}: default {default}", sanitize_ident(&arg.name)));
            }
            params.push(parts.shim);
            native_args.push(parts.native_arg);
            safe_params.push(parts.safe_param);
            prelude.extend(parts.prelude);
            call_args.push(parts.call_arg);
        }

        let result = self.map(&func.return_type);
        let record = self.record_for(&result);

        let (call, ret) = if func.is_constructor {
            let native = owner.map(Class::native_name).unwrap_or_else(|| result.native.clone());
            if owner_kind == Some(ClassKind::Value) || result.category.is_struct() {
                (
                    NativeCall::InPlace {
                        native,
                        args: native_args,
                    },
                    NativeReturn::Reinterpret {
                        c_type: result.c_type.clone(),
                    },
                )
            } else {
                (
                    NativeCall::NewBoxed {
                        native,
                        args: native_args,
                    },
                    NativeReturn::Pointer,
                )
            }
        } else if func.return_type == "void" {
            (
                NativeCall::Void {
                    callee,
                    args: native_args,
                },
                NativeReturn::Unit,
            )
        } else {
            let ret = match result.category {
                Category::String => NativeReturn::Strdup,
                c if c.is_handle() => NativeReturn::HeapCopy {
                    native: result.native.clone(),
                },
                c if c.is_struct() => NativeReturn::Reinterpret {
                    c_type: result.c_type.clone(),
                },
                _ => NativeReturn::Direct,
            };
            (
                NativeCall::Value {
                    native: result.native.clone(),
                    callee,
                    args: native_args,
                },
                ret,
            )
        };

        let (return_type, wrap) = safe_result(&result);
        let symbol = self.claim_symbol(&base_symbol);
        let name = config
            .renames
            .get(&base_symbol)
            .cloned()
            .unwrap_or_else(|| {
                if func.is_constructor {
                    "new".to_string()
                } else {
                    func.override_name.clone()
                }
            });

        let kind = if func.is_constructor {
            "(constructor)"
        } else if owner.is_some() {
            "(method)"
        } else {
            "(function)"
        };
        let comments = vec![
            format!(
                "{} {kind} {}",
                func.name.native_qualified(),
                if func.is_const { "(const)" } else { "(mut)" }
            ),
            func.to_string(),
        ];

        tracing::debug!(function = %func, %symbol, "function ported");
        Emission::Ported(Box::new(FunctionIr {
            rendering: func.to_string(),
            default_args: func.default_arg_count(),
            shim: ShimIr {
                symbol: symbol.clone(),
                record,
                params,
                call,
                ret,
                exception: config.native_exception.clone(),
                comments,
            },
            safe: SafeFnIr {
                name: sanitize_ident(&name),
                is_pub: mode == EmitMode::Definition,
                docs,
                receiver,
                params: safe_params,
                return_type,
                prelude,
                shim: symbol,
                call_args,
                wrap,
                where_sized: mode == EmitMode::TraitDeclaration && func.is_static,
            },
        }))
    }

    /// Record a method whose owning class was never registered.
    pub fn skip_orphan(&self, func: &Function) -> Emission {
        let owner = func.owner().unwrap_or_default();
        tracing::debug!(function = %func, %owner, "method of unregistered class skipped");
        Emission::Skipped {
            rendering: func.to_string(),
            reason: format!("owning class {owner} is not registered"),
        }
    }

    fn skip_reason(&self, func: &Function) -> Option<String> {
        let ctx = self.context();
        if func.is_call_operator() {
            return Some("can not map operator () yet".to_string());
        }
        if !is_identifier(&func.override_name) {
            return Some(format!("can not map {} yet", func.override_name));
        }
        if let Some(arg) = func.args.iter().find(|a| ctx.is_ignored_type(&a.native_type)) {
            return Some(format!("can not map type {} yet", arg.native_type));
        }
        if let Some(arg) = func
            .args
            .iter()
            .find(|a| a.is_output() && self.category(&a.native_type) == Category::String)
        {
            return Some(format!("can not map output string argument {} yet", arg.name));
        }
        if !func.is_constructor {
            if ctx.is_ignored_type(&func.return_type) {
                return Some(format!("can not map return type {} yet", func.return_type));
            }
            if ctx.is_trait(&func.return_type) {
                return Some(format!(
                    "can not return capability trait {} by value",
                    func.return_type
                ));
            }
        }
        None
    }

    fn argument(&mut self, arg: &Argument) -> ArgParts {
        let mapping = self.map(&arg.native_type);
        let out = arg.is_output();
        let handle = mapping.category.is_handle();
        let by_pointer = out && !handle;
        let name = &arg.name;
        let rust_name = sanitize_ident(name);

        let (c_type, extern_type) = if mapping.category == Category::String {
            ("const char*".to_string(), "*const c_char".to_string())
        } else if by_pointer {
            (
                format!("{}*", storage_c_type(&mapping)),
                format!("*mut {}", storage_rust_type(&mapping)),
            )
        } else {
            (mapping.c_type.clone(), mapping.rust_ffi_type.clone())
        };

        let native_arg = match mapping.category {
            _ if handle => {
                if arg.is_pointer {
                    format!("(({}*) {name})", mapping.native)
                } else {
                    format!("*(({}*) {name})", mapping.native)
                }
            }
            Category::String => name.clone(),
            c if c.is_struct() => match (by_pointer, arg.is_pointer) {
                (true, true) => format!("reinterpret_cast<{}*>({name})", mapping.native),
                (true, false) => format!("*reinterpret_cast<{}*>({name})", mapping.native),
                (false, true) => format!("reinterpret_cast<{}*>(&{name})", mapping.native),
                (false, false) => format!("*reinterpret_cast<{}*>(&{name})", mapping.native),
            },
            _ => match (by_pointer, arg.is_pointer) {
                (true, false) => format!("*{name}"),
                (false, true) => format!("&{name}"),
                _ => name.clone(),
            },
        };

        let mut prelude = None;
        let (safe_type, call_arg) = match mapping.category {
            Category::String => {
                prelude = Some(format!("let {rust_name} = CString::new({rust_name})?;"));
                ("&str".to_string(), format!("{rust_name}.as_ptr()"))
            }
            _ if handle => {
                let dyn_kw = if self.context().is_trait(&arg.native_type) {
                    "dyn "
                } else {
                    ""
                };
                let reference = if out { "&mut " } else { "&" };
                (
                    format!("{reference}{dyn_kw}{}", mapping.rust_type),
                    format!("{rust_name}.as_raw()"),
                )
            }
            _ if by_pointer => (
                format!("&mut {}", storage_rust_type(&mapping)),
                rust_name.clone(),
            ),
            _ if mapping.rust_type != mapping.rust_ffi_type => (
                mapping.rust_type.clone(),
                format!("{rust_name} as {}", mapping.rust_ffi_type),
            ),
            _ => (mapping.rust_type.clone(), rust_name.clone()),
        };

        ArgParts {
            shim: ShimParam {
                name: name.clone(),
                c_type,
                rust_type: extern_type,
            },
            native_arg,
            safe_param: format!("{rust_name}: {safe_type}"),
            prelude,
            call_arg,
        }
    }
}

/// C storage type behind a pointer; native `bool` keeps its own width.
pub(crate) fn storage_c_type(mapping: &TypeMapping) -> String {
    if mapping.name == "bool" {
        "bool".to_string()
    } else {
        mapping.c_type.clone()
    }
}

/// Rust storage type matching [`storage_c_type`].
pub(crate) fn storage_rust_type(mapping: &TypeMapping) -> String {
    if mapping.name == "bool" {
        "bool".to_string()
    } else {
        mapping.rust_ffi_type.clone()
    }
}

fn safe_result(result: &TypeMapping) -> (String, SafeWrap) {
    if result.name == "void" {
        return ("()".to_string(), SafeWrap::Unit);
    }
    match result.category {
        Category::String => ("String".to_string(), SafeWrap::String),
        c if c.is_handle() => (
            result.rust_type.clone(),
            SafeWrap::Handle {
                rust_type: result.rust_type.clone(),
            },
        ),
        _ if result.name == "bool" => ("bool".to_string(), SafeWrap::Bool),
        _ => (result.rust_type.clone(), SafeWrap::Copy),
    }
}
