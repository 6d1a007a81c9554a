//! One module, end to end.

use shimgen_core::{DeclarationFile, GenerationContext, GeneratorConfig};

use crate::artifacts::ModuleArtifacts;
use crate::constants::bind;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::ir::ModuleIr;
use crate::report::GenerationReport;

/// Everything produced for one module.
#[derive(Debug, Clone)]
pub struct ModuleOutput {
    pub ir: ModuleIr,
    pub report: GenerationReport,
    pub artifacts: ModuleArtifacts,
}

/// Generate `module` from its declaration files, merged in order.
///
/// Nothing is written; see [`ModuleArtifacts::write_to`].
#[tracing::instrument(skip(config, files), fields(file_count = files.len()))]
pub fn generate_module(config: &GeneratorConfig, module: &str, files: &[DeclarationFile]) -> Result<ModuleOutput> {
    let mut ctx = GenerationContext::new(config.clone(), module)?;
    for file in files {
        ctx.ingest_file(file);
    }
    ctx.finish();

    let mut report = GenerationReport::new(module);
    report.excluded = ctx.exclusions().to_vec();
    report.declarations_seen = ctx.declarations_seen();

    let mut emitter = Emitter::new(&ctx);
    let items = emitter.emit_items(&mut report);
    let instances = emitter.instances().map(|i| emitter.instance_ir(i)).collect();
    let records = emitter.records().cloned().collect();
    let constants = ctx.constants().map(bind).collect();

    let ir = ModuleIr {
        module: module.to_string(),
        is_base: ctx.is_base_module(),
        headers: ctx.headers().to_vec(),
        items,
        constants,
        instances,
        records,
    };
    let artifacts = ModuleArtifacts::render(&ir, &report, config);

    tracing::info!(
        module,
        declarations = ctx.declarations_seen(),
        ported = report.ported.len(),
        skipped = report.skipped.len(),
        excluded = report.excluded.len(),
        files = artifacts.files.len(),
        "module generated"
    );

    Ok(ModuleOutput { ir, report, artifacts })
}
