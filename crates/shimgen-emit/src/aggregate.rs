//! Aggregate emission: structs, owning wrappers, traits, impl blocks, and
//! template instantiations, assembled in module order.

use std::collections::HashSet;

use shimgen_core::model::normalize_type;
use shimgen_core::classify::sanitize_ident;
use shimgen_core::{Class, ClassKind, InstanceKind, TemplateInstance, TypeLookup, ValueStruct};

use crate::emitter::Emitter;
use crate::function::{storage_c_type, storage_rust_type};
use crate::ir::{
    BoxedIr, EmitMode, Emission, FieldIr, FunctionIr, ImplIr, InstanceIr, Item, StructIr, TraitIr,
};
use crate::report::GenerationReport;

/// Safe-side names already taken within one scope.
#[derive(Default)]
struct NameScope(HashSet<String>);

impl NameScope {
    /// Claim `name`, suffixing `_1`, `_2`, ... when it is already taken.
    fn claim(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 0;
        while !self.0.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{name}_{n}");
        }
        candidate
    }
}

impl Emitter<'_> {
    /// Emit every item of the module in order, recording each function in
    /// `report`.
    #[tracing::instrument(level = "debug", skip_all, fields(module = self.context().module()))]
    pub fn emit_items(&mut self, report: &mut GenerationReport) -> Vec<Item> {
        let ctx = self.context();
        let mut items = Vec::new();

        for value in ctx.module_value_structs() {
            items.push(Item::Struct(self.value_struct(value)));
        }
        for class in ctx.classes() {
            if class.is_simple && ctx.config().value_struct(&class.qualified).is_none() {
                items.push(Item::Struct(self.simple_class(class)));
            }
        }

        let mut scope = NameScope::default();
        for func in ctx.functions() {
            if let Some(ir) = self.function_in_scope(None, func, EmitMode::Definition, &mut scope, report) {
                items.push(Item::Function(Box::new(ir)));
            }
        }

        let mut boxed_done = HashSet::new();
        for name in ctx.config().forced_boxed(ctx.module()) {
            if !boxed_done.insert(name.clone()) {
                continue;
            }
            let boxed = match ctx.class_named(name) {
                Some(class) => self.boxed(class),
                None => BoxedIr {
                    ident: name.replace("::", "_"),
                    native: ctx.config().native_path(name),
                    destructor: self.destructor_symbol(&name.replace("::", "_")),
                    traits: Vec::new(),
                },
            };
            items.push(Item::Boxed(boxed));
        }

        for class in ctx.classes() {
            let kind = ctx.class_kind(class);
            match kind {
                ClassKind::Trait => {
                    let methods = self.methods(class, EmitMode::TraitDeclaration, report);
                    items.push(Item::Trait(TraitIr {
                        ident: class.ident.clone(),
                        methods,
                    }));
                }
                ClassKind::Boxed | ClassKind::Value => {
                    if kind == ClassKind::Boxed && boxed_done.insert(class.qualified.clone()) {
                        items.push(Item::Boxed(self.boxed(class)));
                    }
                    let methods = self.methods(class, EmitMode::Definition, report);
                    if !methods.is_empty() {
                        items.push(Item::Impl(ImplIr {
                            ident: class.ident.clone(),
                            methods,
                        }));
                    }
                }
            }
        }

        for func in ctx.orphans() {
            report.record(&self.skip_orphan(func));
        }

        items
    }

    fn methods(&mut self, class: &Class, mode: EmitMode, report: &mut GenerationReport) -> Vec<FunctionIr> {
        let mut scope = NameScope::default();
        scope.claim("as_raw");
        class
            .methods_in_order()
            .into_iter()
            .filter_map(|func| self.function_in_scope(Some(class), func, mode, &mut scope, report))
            .collect()
    }

    fn function_in_scope(
        &mut self,
        owner: Option<&Class>,
        func: &shimgen_core::Function,
        mode: EmitMode,
        scope: &mut NameScope,
        report: &mut GenerationReport,
    ) -> Option<FunctionIr> {
        let emission = self.emit_function(owner, func, mode);
        report.record(&emission);
        match emission {
            Emission::Ported(mut ir) => {
                ir.safe.name = scope.claim(&ir.safe.name);
                Some(*ir)
            }
            Emission::Skipped { .. } => None,
        }
    }

    /// A struct from the built-in value table.
    pub fn value_struct(&mut self, value: &ValueStruct) -> StructIr {
        let fields = value
            .fields
            .iter()
            .map(|(name, ty)| self.field(name, ty))
            .collect();
        StructIr {
            c_name: format!("{}_struct_{}", self.prefix(), value.name),
            rust_name: value.name.clone(),
            fields,
        }
    }

    /// A struct laid out from a simple class's properties.
    pub fn simple_class(&mut self, class: &Class) -> StructIr {
        let fields = class
            .properties
            .iter()
            .map(|p| self.field(&p.name, &p.native_type))
            .collect();
        StructIr {
            c_name: format!("{}_struct_{}", self.prefix(), class.ident),
            rust_name: class.ident.clone(),
            fields,
        }
    }

    fn field(&mut self, name: &str, native_type: &str) -> FieldIr {
        let (element, array_len) = split_array(native_type);
        let mapping = self.map(&normalize_type(element).0);
        FieldIr {
            c_name: name.to_string(),
            c_type: storage_c_type(&mapping),
            rust_name: sanitize_ident(name),
            rust_type: storage_rust_type(&mapping),
            array_len,
        }
    }

    /// The owning wrapper of a boxed class.
    pub fn boxed(&self, class: &Class) -> BoxedIr {
        BoxedIr {
            ident: class.ident.clone(),
            native: class.native_name(),
            destructor: self.destructor_symbol(&class.ident),
            traits: self.context().trait_ancestors(class),
        }
    }

    fn destructor_symbol(&self, ident: &str) -> String {
        format!("{}_{}_delete_{ident}", self.prefix(), self.context().module())
    }

    /// Shim symbols for a template instantiation.
    pub fn instance_ir(&self, instance: &TemplateInstance) -> InstanceIr {
        let prefix = self.prefix();
        let name = &instance.name;
        let is_vector = instance.kind != InstanceKind::Ptr;
        InstanceIr {
            instance: instance.clone(),
            new_symbol: is_vector.then(|| format!("{prefix}_new_{name}")),
            delete_symbol: format!("{prefix}_delete_{name}"),
            len_symbol: is_vector.then(|| format!("{prefix}_{name}_len")),
        }
    }
}

/// Split `elem[N]` into the element type and array length.
fn split_array(native_type: &str) -> (&str, Option<usize>) {
    let trimmed = native_type.trim();
    if let Some((element, rest)) = trimmed.split_once('[') {
        if let Some(len) = rest.strip_suffix(']').and_then(|n| n.trim().parse().ok()) {
            return (element.trim(), Some(len));
        }
    }
    (trimmed, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shimgen_core::{DeclarationFile, GenerationContext, GeneratorConfig, RawArgument, RawDeclaration};

    fn decl(name: &str, spec: &str, mods: &[&str], args: Vec<RawArgument>) -> RawDeclaration {
        RawDeclaration(
            name.to_string(),
            spec.to_string(),
            mods.iter().map(|m| m.to_string()).collect(),
            args,
        )
    }

    fn context(config: GeneratorConfig, module: &str, declarations: Vec<RawDeclaration>) -> GenerationContext {
        let mut ctx = GenerationContext::new(config, module).unwrap();
        ctx.ingest_file(&DeclarationFile {
            namespaces: vec!["cv".to_string()],
            headers: vec![],
            declarations,
        });
        ctx.finish();
        ctx
    }

    #[test]
    fn value_struct_fields() {
        let ctx = context(GeneratorConfig::default(), "core", vec![]);
        let mut emitter = Emitter::new(&ctx);
        let scalar = emitter.value_struct(ctx.config().value_struct("Scalar").unwrap());
        assert_eq!(scalar.c_name, "cv_struct_Scalar");
        assert_eq!(
            scalar.fields,
            vec![FieldIr {
                c_name: "data".into(),
                c_type: "double".into(),
                rust_name: "data".into(),
                rust_type: "f64".into(),
                array_len: Some(4),
            }]
        );

        let term = emitter.value_struct(ctx.config().value_struct("TermCriteria").unwrap());
        assert_eq!(term.fields[0].rust_name, "_type");
        assert_eq!(term.fields[0].c_name, "type");
    }

    #[test]
    fn simple_class_fields() {
        let ctx = context(
            GeneratorConfig::default(),
            "features2d",
            vec![decl(
                "struct cv.KeyPoint",
                "",
                &["/Simple"],
                vec![
                    RawArgument::new("Point2f", "pt").with_modifier("/RW"),
                    RawArgument::new("float", "size"),
                    RawArgument::new("bool", "valid"),
                ],
            )],
        );
        let mut emitter = Emitter::new(&ctx);
        let class = ctx.class_named("KeyPoint").unwrap();
        let ir = emitter.simple_class(class);
        let fields: Vec<(&str, &str)> = ir
            .fields
            .iter()
            .map(|f| (f.c_type.as_str(), f.rust_type.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![("cv_struct_Point2f", "Point2f"), ("float", "f32"), ("bool", "bool")]
        );
    }

    #[test]
    fn module_item_order() {
        let mut config = GeneratorConfig::default();
        config
            .forced_boxed
            .insert("features2d".into(), vec!["Feature2D".into(), "Feature2D".into()]);
        let ctx = context(
            config,
            "features2d",
            vec![
                decl("cv.drawKeypoints", "void", &[], vec![RawArgument::new("Mat", "image")]),
                decl("struct cv.KeyPoint", "", &["/Simple"], vec![RawArgument::new("float", "size")]),
                decl("class cv.FeatureDetector", ": cv::Algorithm", &[], vec![]),
                decl("cv.FeatureDetector.empty", "bool", &["/C"], vec![]),
                decl("class cv.ORB", ": cv::FeatureDetector", &[], vec![]),
                decl("cv.ORB.ORB", "", &[], vec![]),
                decl("cv.Gone.run", "void", &[], vec![]),
            ],
        );
        let mut emitter = Emitter::new(&ctx);
        let mut report = GenerationReport::new("features2d");
        let items = emitter.emit_items(&mut report);

        let kinds: Vec<String> = items
            .iter()
            .map(|item| match item {
                Item::Struct(s) => format!("struct {}", s.rust_name),
                Item::Function(f) => format!("fn {}", f.safe.name),
                Item::Boxed(b) => format!("boxed {}", b.ident),
                Item::Trait(t) => format!("trait {}", t.ident),
                Item::Impl(i) => format!("impl {}", i.ident),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "struct KeyPoint",
                "fn drawKeypoints",
                "boxed Feature2D",
                "trait FeatureDetector",
                "boxed ORB",
                "impl ORB",
            ]
        );

        let Item::Boxed(orb) = &items[4] else {
            panic!("expected boxed ORB");
        };
        assert_eq!(orb.destructor, "cv_features2d_delete_ORB");
        assert_eq!(orb.traits, vec!["FeatureDetector".to_string(), "Algorithm".to_string()]);

        assert_eq!(report.ported.len(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "owning class Gone is not registered");
    }

    #[test]
    fn overloads_get_distinct_names() {
        let ctx = context(
            GeneratorConfig::default(),
            "imgproc",
            vec![
                decl("cv.blur", "void", &[], vec![RawArgument::new("Mat", "src")]),
                decl("cv.blur", "void", &[], vec![RawArgument::new("Mat", "src"), RawArgument::new("int", "k")]),
            ],
        );
        let mut emitter = Emitter::new(&ctx);
        let mut report = GenerationReport::new("imgproc");
        let names: Vec<String> = emitter
            .emit_items(&mut report)
            .into_iter()
            .filter_map(|item| match item {
                Item::Function(f) => Some(f.safe.name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["blur".to_string(), "blur_1".to_string()]);
    }

    #[test]
    fn instance_symbols() {
        let ctx = context(GeneratorConfig::default(), "core", vec![]);
        let mut emitter = Emitter::new(&ctx);
        let vector = emitter.map("vector::Point").instance.unwrap();
        let ir = emitter.instance_ir(&vector);
        assert_eq!(ir.new_symbol.as_deref(), Some("cv_new_VectorOfPoint"));
        assert_eq!(ir.delete_symbol, "cv_delete_VectorOfPoint");
        assert_eq!(ir.len_symbol.as_deref(), Some("cv_VectorOfPoint_len"));

        let ptr = emitter.map("Ptr::ORB").instance.unwrap();
        let ir = emitter.instance_ir(&ptr);
        assert_eq!(ir.new_symbol, None);
        assert_eq!(ir.len_symbol, None);
    }

    #[test]
    fn array_types() {
        assert_eq!(split_array("double[4]"), ("double", Some(4)));
        assert_eq!(split_array("int"), ("int", None));
    }
}
