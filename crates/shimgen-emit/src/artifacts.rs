//! The files produced for one module.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use shimgen_core::GeneratorConfig;

use crate::constants::dump_program;
use crate::error::{EmitError, Result};
use crate::ir::ModuleIr;
use crate::render::{native, safe};
use crate::report::GenerationReport;

/// Rendered files keyed by file name, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleArtifacts {
    pub files: BTreeMap<String, String>,
}

impl ModuleArtifacts {
    /// Render every file of a module.
    pub fn render(module: &ModuleIr, report: &GenerationReport, config: &GeneratorConfig) -> Self {
        let m = &module.module;
        let mut files = BTreeMap::new();

        files.insert(format!("{m}.cpp"), native::render_module_cpp(module, config));
        files.insert(format!("{m}.types.h"), native::render_types_h(module, config));
        files.insert(format!("{m}.consts.cpp"), consts_program(module, config));
        files.insert(format!("{m}.externs.rs"), safe::render_externs(module, config));
        files.insert(format!("{m}.rs"), safe::render_safe_module(module, config));
        files.insert(format!("{m}.txt"), report.to_string());

        for record in &module.records {
            files.insert(format!("{}.type.h", record.name), native::render_record_h(record));
            files.insert(format!("{}.rv.rs", record.name), safe::render_record_rs(record));
        }
        for instance in &module.instances {
            let name = &instance.instance.name;
            files.insert(
                format!("{name}.type.cpp"),
                native::render_instance_cpp(instance, m, config),
            );
            files.insert(format!("{name}.type.rs"), safe::render_instance_rs(instance));
        }
        files.insert("shim_types.rs".to_string(), safe::render_shim_types());

        Self { files }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Write every file into `dir`, creating it when missing.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| EmitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut written = Vec::with_capacity(self.files.len());
        for (name, contents) in &self.files {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|source| EmitError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
        tracing::debug!(dir = %dir.display(), count = written.len(), "artifacts written");
        Ok(written)
    }
}

fn consts_program(module: &ModuleIr, config: &GeneratorConfig) -> String {
    let mut includes = Vec::new();
    if let Some(header) = &config.modules_header {
        includes.push(header.clone());
    }
    includes.push(config.module_header(&module.module));
    includes.extend(module.headers.iter().cloned());
    dump_program(&module.constants, &includes, &config.native_namespace)
}
