//! Shared emission state for one module.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use shimgen_core::classify::sanitize_c_type;
use shimgen_core::{map_type, Category, GenerationContext, TemplateInstance, TypeLookup, TypeMapping};

use crate::ir::ReturnRecord;

/// Emission state scoped to one module run.
///
/// The registry is only read. Template instantiations and return records
/// discovered while mapping types are cached here, keyed by name, so each
/// is emitted once.
pub struct Emitter<'a> {
    ctx: &'a GenerationContext,
    instances: IndexMap<String, TemplateInstance>,
    records: BTreeMap<String, ReturnRecord>,
    symbols: HashSet<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(ctx: &'a GenerationContext) -> Self {
        Self {
            ctx,
            instances: IndexMap::new(),
            records: BTreeMap::new(),
            symbols: HashSet::new(),
        }
    }

    pub fn context(&self) -> &'a GenerationContext {
        self.ctx
    }

    pub fn prefix(&self) -> &'a str {
        &self.ctx.config().prefix
    }

    /// Map a type, caching any template instantiation it needs.
    pub fn map(&mut self, name: &str) -> TypeMapping {
        let mapping = map_type(self.ctx, name);
        if let Some(instance) = &mapping.instance {
            if !self.instances.contains_key(&instance.name) {
                tracing::debug!(instance = %instance.name, "template instantiation registered");
                self.instances.insert(instance.name.clone(), instance.clone());
            }
        }
        mapping
    }

    /// The return record for a result mapping, registered on first use.
    pub fn record_for(&mut self, result: &TypeMapping) -> ReturnRecord {
        let (c_result, rust_result) = if result.name == "void" {
            ("int".to_string(), "i32".to_string())
        } else {
            (result.c_type.clone(), result.rust_ffi_type.clone())
        };
        let sane = if result.name == "void" {
            "void".to_string()
        } else {
            sanitize_c_type(&c_result)
        };
        let record = ReturnRecord {
            name: format!("{}_return_value_{sane}", self.prefix()),
            c_result,
            rust_result,
        };
        self.records
            .entry(record.name.clone())
            .or_insert_with(|| record.clone());
        record
    }

    /// Claim a shim symbol for this module, suffixing `_1`, `_2`, ... when
    /// an earlier overload already took it.
    pub fn claim_symbol(&mut self, symbol: &str) -> String {
        let mut candidate = symbol.to_string();
        let mut n = 0;
        while !self.symbols.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{symbol}_{n}");
        }
        if n > 0 {
            tracing::debug!(%symbol, renamed = %candidate, "shim symbol collision");
        }
        candidate
    }

    /// Instantiations in discovery order.
    pub fn instances(&self) -> impl Iterator<Item = &TemplateInstance> {
        self.instances.values()
    }

    /// Return records ordered by name.
    pub fn records(&self) -> impl Iterator<Item = &ReturnRecord> {
        self.records.values()
    }

    pub(crate) fn category(&self, name: &str) -> Category {
        shimgen_core::classify(self.ctx, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shimgen_core::GeneratorConfig;

    #[test]
    fn instances_are_cached_once() {
        let ctx = GenerationContext::new(GeneratorConfig::default(), "core").unwrap();
        let mut emitter = Emitter::new(&ctx);
        emitter.map("vector::Point");
        emitter.map("vector::Point");
        emitter.map("Ptr::Feature");
        let names: Vec<&str> = emitter.instances().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["VectorOfPoint", "PtrOfFeature"]);
    }

    #[test]
    fn records_share_c_types() {
        let ctx = GenerationContext::new(GeneratorConfig::default(), "core").unwrap();
        let mut emitter = Emitter::new(&ctx);
        let int = emitter.map("int");
        let boolean = emitter.map("bool");
        let void = emitter.map("void");
        let mat = emitter.map("Mat");
        assert_eq!(emitter.record_for(&int).name, "cv_return_value_int");
        assert_eq!(emitter.record_for(&boolean).name, "cv_return_value_int");
        let unit = emitter.record_for(&void);
        assert_eq!(unit.name, "cv_return_value_void");
        assert_eq!(unit.c_result, "int");
        assert_eq!(emitter.record_for(&mat).name, "cv_return_value_void_");
        assert_eq!(emitter.records().count(), 3);
    }

    #[test]
    fn colliding_symbols_get_suffixes() {
        let ctx = GenerationContext::new(GeneratorConfig::default(), "core").unwrap();
        let mut emitter = Emitter::new(&ctx);
        assert_eq!(emitter.claim_symbol("cv_core_scale_I"), "cv_core_scale_I");
        assert_eq!(emitter.claim_symbol("cv_core_scale_I"), "cv_core_scale_I_1");
        assert_eq!(emitter.claim_symbol("cv_core_scale_I"), "cv_core_scale_I_2");
        assert_eq!(emitter.claim_symbol("cv_core_scale_D"), "cv_core_scale_D");
    }
}
