//! The per-module declaration registry.
//!
//! A [`GenerationContext`] is filled once from declaration files, then read
//! by the emitter. Registration follows first-wins semantics everywhere:
//! the first class or constant seen under a key is kept and later ones are
//! dropped.

use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::classify::TypeLookup;
use crate::config::{compile_anchored, GeneratorConfig};
use crate::declaration::{DeclarationFile, DeclarationKind, RawDeclaration};
use crate::error::Result;
use crate::model::{Class, ClassKind, Constant, Function};
use crate::names::EntityName;

/// A declaration dropped before emission, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub entity: String,
    pub reason: String,
}

/// Registry of everything known about one module.
#[derive(Debug)]
pub struct GenerationContext {
    config: GeneratorConfig,
    module: String,
    namespaces: Vec<String>,
    headers: Vec<String>,
    classes: IndexMap<String, Class>,
    functions: Vec<Function>,
    orphans: Vec<Function>,
    constants: IndexMap<String, Constant>,
    exclusions: Vec<Exclusion>,
    manual_owners: HashSet<String>,
    constant_filters: Vec<Regex>,
    declarations_seen: usize,
}

impl GenerationContext {
    /// Create an empty registry for `module`.
    pub fn new(config: GeneratorConfig, module: &str) -> Result<Self> {
        config.validate()?;
        let constant_filters = config
            .ignored_constants
            .iter()
            .map(|p| compile_anchored(p))
            .collect::<Result<Vec<_>>>()?;

        let mut namespaces = Vec::new();
        if !config.native_namespace.is_empty() {
            namespaces.push(config.native_namespace.replace("::", "."));
        }

        let manual_owners = config
            .manual_declarations(module)
            .iter()
            .filter(|d| d.kind() == DeclarationKind::Function)
            .map(|d| EntityName::resolve(d.name(), &namespaces))
            .filter(|n| n.is_member())
            .map(|n| n.owner_qualified())
            .collect();

        Ok(Self {
            config,
            module: module.to_string(),
            namespaces,
            headers: Vec::new(),
            classes: IndexMap::new(),
            functions: Vec::new(),
            orphans: Vec::new(),
            constants: IndexMap::new(),
            exclusions: Vec::new(),
            manual_owners,
            constant_filters,
            declarations_seen: 0,
        })
    }

    /// Register every declaration of a file.
    ///
    /// Classes are registered before functions so that methods find their
    /// owner regardless of declaration order within the file.
    pub fn ingest_file(&mut self, file: &DeclarationFile) {
        for ns in &file.namespaces {
            if !self.namespaces.contains(ns) {
                self.namespaces.push(ns.clone());
            }
        }
        for header in &file.headers {
            if !self.headers.contains(header) {
                self.headers.push(header.clone());
            }
        }

        let (classes, rest): (Vec<&RawDeclaration>, Vec<&RawDeclaration>) = file
            .declarations
            .iter()
            .partition(|d| d.kind() == DeclarationKind::Class);
        for decl in classes.into_iter().chain(rest) {
            self.ingest(decl, false);
        }
    }

    /// Register the configured hand-written declarations, then attach
    /// methods whose owner was registered after them.
    pub fn finish(&mut self) {
        let manual = self.config.manual_declarations(&self.module).to_vec();
        let (classes, rest): (Vec<&RawDeclaration>, Vec<&RawDeclaration>) =
            manual.iter().partition(|d| d.kind() == DeclarationKind::Class);
        for decl in classes.into_iter().chain(rest) {
            self.ingest(decl, true);
        }

        for func in std::mem::take(&mut self.orphans) {
            let owner = func.owner().unwrap_or_default();
            match self.classes.get_mut(&owner) {
                Some(class) => class.methods.push(func),
                None => self.orphans.push(func),
            }
        }
    }

    /// Register a single declaration.
    pub fn ingest(&mut self, decl: &RawDeclaration, manual: bool) {
        self.declarations_seen += 1;
        match decl.kind() {
            DeclarationKind::Class => self.add_class(Class::from_raw(decl, &self.namespaces)),
            DeclarationKind::Constant => self.add_constant(Constant::from_raw(decl, &self.namespaces)),
            DeclarationKind::Function => {
                self.add_function(Function::from_raw(decl, &self.namespaces, manual))
            }
        }
    }

    fn add_class(&mut self, class: Class) {
        if self.config.is_ignored_class(&class.qualified) {
            self.exclude(class.to_string(), "class is on the ignore list");
            return;
        }
        if self.classes.contains_key(&class.qualified) {
            tracing::debug!(class = %class, "duplicate class declaration dropped");
            return;
        }
        self.classes.insert(class.qualified.clone(), class);
    }

    fn add_constant(&mut self, constant: Constant) {
        if self.constant_filters.iter().any(|re| re.is_match(&constant.c_name)) {
            self.exclude(constant.to_string(), "constant is on the ignore list");
            return;
        }
        if self.constants.contains_key(&constant.c_name) {
            tracing::debug!(constant = %constant, "duplicate constant dropped");
            return;
        }
        self.constants.insert(constant.c_name.clone(), constant);
    }

    fn add_function(&mut self, func: Function) {
        let Some(owner) = func.owner() else {
            self.functions.push(func);
            return;
        };
        if self.config.is_ignored_class(&owner) {
            self.exclude(func.to_string(), &format!("owning class {owner} is ignored"));
        } else if self.manual_owners.contains(&owner) && !func.manual {
            self.exclude(func.to_string(), "hand-written override");
        } else if let Some(class) = self.classes.get_mut(&owner) {
            class.methods.push(func);
        } else {
            self.orphans.push(func);
        }
    }

    fn exclude(&mut self, entity: String, reason: &str) {
        tracing::debug!(%entity, reason, "declaration excluded");
        self.exclusions.push(Exclusion {
            entity,
            reason: reason.to_string(),
        });
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn is_base_module(&self) -> bool {
        self.module == self.config.base_module
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    /// Free functions in declaration order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Methods whose owning class never got registered.
    pub fn orphans(&self) -> &[Function] {
        &self.orphans
    }

    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants.values()
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn declarations_seen(&self) -> usize {
        self.declarations_seen
    }

    /// Value structs from the built-in table that belong to this module.
    pub fn module_value_structs(&self) -> impl Iterator<Item = &crate::config::ValueStruct> {
        self.config
            .value_structs
            .iter()
            .filter(move |v| v.module == self.module)
    }

    /// How a registered class crosses the boundary.
    pub fn class_kind(&self, class: &Class) -> ClassKind {
        if class.is_simple || self.config.value_struct(&class.qualified).is_some() {
            ClassKind::Value
        } else if self.config.forced_boxed(&self.module).contains(&class.ident) || class.has_constructor() {
            ClassKind::Boxed
        } else {
            ClassKind::Trait
        }
    }

    /// Whether `name` names a registered class emitted as a trait.
    pub fn is_trait(&self, name: &str) -> bool {
        self.class_named(name)
            .is_some_and(|c| self.class_kind(c) == ClassKind::Trait)
    }

    /// Whether any scope segment of a type is on the ignore list.
    pub fn is_ignored_type(&self, name: &str) -> bool {
        name.split("::").any(|segment| self.config.is_ignored_class(segment))
    }

    /// Trait identifiers a class implements, nearest first.
    ///
    /// The walk follows registered bases. A base that is not registered here
    /// is assumed to be a trait from another module and ends the walk.
    pub fn trait_ancestors(&self, class: &Class) -> Vec<String> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([class.qualified.clone()]);
        let mut next = class.base.clone();
        while let Some(base) = next.take() {
            if !visited.insert(base.clone()) {
                break;
            }
            match self.class_named(&base) {
                Some(parent) => {
                    if self.class_kind(parent) == ClassKind::Trait {
                        found.push(parent.ident.clone());
                    }
                    next = parent.base.clone();
                }
                None => {
                    if !self.is_ignored_type(&base) {
                        found.push(base.replace("::", "_"));
                    }
                }
            }
        }
        found
    }
}

impl TypeLookup for GenerationContext {
    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn class_named(&self, name: &str) -> Option<&Class> {
        let ns_prefix = format!("{}::", self.config.native_namespace);
        let name = name.strip_prefix(ns_prefix.as_str()).unwrap_or(name);
        self.classes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::RawArgument;
    use pretty_assertions::assert_eq;

    fn decl(name: &str, spec: &str, mods: &[&str], args: Vec<RawArgument>) -> RawDeclaration {
        RawDeclaration(
            name.to_string(),
            spec.to_string(),
            mods.iter().map(|m| m.to_string()).collect(),
            args,
        )
    }

    fn file(declarations: Vec<RawDeclaration>) -> DeclarationFile {
        DeclarationFile {
            namespaces: vec!["cv".to_string()],
            headers: vec!["opencv2/features2d/features2d.hpp".to_string()],
            declarations,
        }
    }

    fn context(module: &str) -> GenerationContext {
        GenerationContext::new(GeneratorConfig::default(), module).unwrap()
    }

    #[test]
    fn methods_attach_to_registered_class() {
        let mut ctx = context("features2d");
        ctx.ingest_file(&file(vec![
            decl("cv.FeatureDetector.empty", "bool", &["/C"], vec![]),
            decl("class cv.FeatureDetector", ": cv::Algorithm", &[], vec![]),
            decl("cv.drawKeypoints", "void", &[], vec![]),
        ]));
        ctx.finish();

        let class = ctx.class_named("FeatureDetector").unwrap();
        assert_eq!(class.methods.len(), 1);
        assert_eq!(ctx.functions().len(), 1);
        assert!(ctx.orphans().is_empty());
        assert_eq!(ctx.declarations_seen(), 3);
    }

    #[test]
    fn first_class_registration_wins() {
        let mut ctx = context("features2d");
        ctx.ingest_file(&file(vec![
            decl("class cv.KeyPoint", "", &["/Simple"], vec![]),
            decl("class cv.KeyPoint", "", &[], vec![]),
        ]));
        assert_eq!(ctx.classes().count(), 1);
        assert!(ctx.class_named("KeyPoint").unwrap().is_simple);
    }

    #[test]
    fn ignored_classes_and_their_methods_are_excluded() {
        let mut ctx = context("core");
        ctx.ingest_file(&file(vec![
            decl("class cv.FileStorage", "", &[], vec![]),
            decl("cv.FileStorage.open", "bool", &[], vec![]),
        ]));
        assert_eq!(ctx.classes().count(), 0);
        assert_eq!(ctx.exclusions().len(), 2);
        assert!(ctx.orphans().is_empty());
    }

    #[test]
    fn denylisted_constants_are_excluded() {
        let mut ctx = context("core");
        ctx.ingest_file(&file(vec![
            decl("const cv.CV_PI", "3.14", &[], vec![]),
            decl("const cv.CV_PI_2", "1.57", &[], vec![]),
            decl("const cv.CV_8U", "0", &[], vec![]),
            decl("const cv.Other.CV_8U", "1", &[], vec![]),
        ]));
        let names: Vec<&str> = ctx.constants().map(|c| c.c_name.as_str()).collect();
        assert_eq!(names, vec!["CV_8U"]);
        assert_eq!(ctx.constants().next().unwrap().value, "0");
        assert_eq!(ctx.exclusions().len(), 2);
    }

    #[test]
    fn manual_declarations_replace_parsed_methods() {
        let mut ctx = context("core");
        ctx.ingest_file(&file(vec![
            decl("class cv.Mat", "", &[], vec![]),
            decl("cv.Mat.row", "Mat", &["/C"], vec![RawArgument::new("int", "y")]),
        ]));
        ctx.finish();

        let mat = ctx.class_named("Mat").unwrap();
        assert!(mat.methods.iter().all(|m| m.manual));
        assert_eq!(mat.methods.len(), 5);
        assert!(ctx
            .exclusions()
            .iter()
            .any(|e| e.reason == "hand-written override"));
        assert_eq!(ctx.class_kind(mat), ClassKind::Boxed);
    }

    #[test]
    fn unregistered_owner_stays_orphan() {
        let mut ctx = context("video");
        ctx.ingest_file(&file(vec![decl("cv.Missing.run", "void", &[], vec![])]));
        ctx.finish();
        assert_eq!(ctx.orphans().len(), 1);
    }

    #[test]
    fn class_kinds() {
        let mut ctx = context("features2d");
        ctx.ingest_file(&file(vec![
            decl("class cv.Algorithm", "", &[], vec![]),
            decl("class cv.BRISK", ": cv::FeatureDetector", &[], vec![]),
            decl("class cv.FeatureDetector", ": cv::Algorithm", &[], vec![]),
            decl("cv.BRISK.BRISK", "", &[], vec![]),
            decl("struct cv.KeyPoint", "", &["/Simple"], vec![]),
        ]));
        let brisk = ctx.class_named("BRISK").unwrap();
        assert_eq!(ctx.class_kind(brisk), ClassKind::Boxed);
        assert!(ctx.is_trait("FeatureDetector"));
        assert!(ctx.is_trait("cv::Algorithm"));
        assert_eq!(ctx.class_kind(ctx.class_named("KeyPoint").unwrap()), ClassKind::Value);
        assert_eq!(
            ctx.trait_ancestors(brisk),
            vec!["FeatureDetector".to_string(), "Algorithm".to_string()]
        );
    }

    #[test]
    fn unregistered_base_ends_the_walk() {
        let mut ctx = context("video");
        ctx.ingest_file(&file(vec![
            decl("class cv.BackgroundSubtractor", ": cv::Algorithm", &[], vec![]),
        ]));
        let class = ctx.class_named("BackgroundSubtractor").unwrap();
        assert_eq!(ctx.trait_ancestors(class), vec!["Algorithm".to_string()]);
    }

    #[test]
    fn cyclic_bases_terminate() {
        let mut ctx = context("video");
        ctx.ingest_file(&file(vec![
            decl("class cv.A", ": cv::B", &[], vec![]),
            decl("class cv.B", ": cv::A", &[], vec![]),
        ]));
        let a = ctx.class_named("A").unwrap();
        assert_eq!(ctx.trait_ancestors(a), vec!["B".to_string()]);
    }

    #[test]
    fn ignored_types() {
        let ctx = context("core");
        assert!(ctx.is_ignored_type("FileNode"));
        assert!(ctx.is_ignored_type("Ptr::FileStorage"));
        assert!(!ctx.is_ignored_type("vector::Point"));
    }

    #[test]
    fn namespaces_and_headers_are_merged() {
        let mut ctx = context("ml");
        ctx.ingest_file(&file(vec![]));
        ctx.ingest_file(&DeclarationFile {
            namespaces: vec!["cv".to_string(), "cv.ml".to_string()],
            headers: vec!["opencv2/ml/ml.hpp".to_string()],
            declarations: vec![],
        });
        assert_eq!(ctx.namespaces(), &["cv".to_string(), "cv.ml".to_string()]);
        assert_eq!(ctx.headers().len(), 2);
    }
}
