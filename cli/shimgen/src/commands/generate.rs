//! `shimgen generate`: one module from explicit files, or a directory of
//! modules.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use shimgen_core::{DeclarationFile, GeneratorConfig};
use shimgen_emit::generate_module;

/// Generate `module` from `files`, merged in order, into `out`.
pub fn run(config: &GeneratorConfig, module: &str, files: &[PathBuf], out: &Path) -> Result<()> {
    if files.is_empty() {
        bail!("no declaration files given for module '{module}'");
    }
    let declarations = files
        .iter()
        .map(|path| DeclarationFile::load(path).with_context(|| format!("loading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    generate_one(config, module, &declarations, out)
}

/// Generate one module per `*.json` file in `dir`, named after the file stem.
pub fn run_batch(config: &GeneratorConfig, dir: &Path, out: &Path) -> Result<()> {
    let files = declaration_files(dir)?;
    if files.is_empty() {
        bail!("no declaration files found in {}", dir.display());
    }
    for path in &files {
        let Some(module) = path.file_stem().and_then(|s| s.to_str()) else {
            bail!("cannot derive a module name from {}", path.display());
        };
        let declarations =
            DeclarationFile::load(path).with_context(|| format!("loading {}", path.display()))?;
        generate_one(config, module, &[declarations], out)?;
    }
    println!("Generated {} modules into {}", files.len(), out.display());
    Ok(())
}

fn generate_one(config: &GeneratorConfig, module: &str, declarations: &[DeclarationFile], out: &Path) -> Result<()> {
    let output = generate_module(config, module, declarations)
        .with_context(|| format!("generating module '{module}'"))?;
    output
        .artifacts
        .write_to(out)
        .with_context(|| format!("writing module '{module}'"))?;
    println!(
        "{module}: {} ported, {} skipped, {} excluded -> {}",
        output.report.ported.len(),
        output.report.skipped.len(),
        output.report.excluded.len(),
        out.display()
    );
    Ok(())
}

/// `*.json` files of `dir`, sorted by name.
fn declaration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
