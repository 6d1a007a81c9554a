//! Per-module generation report.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use shimgen_core::Exclusion;

use crate::ir::Emission;

/// A function that was considered but not ported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub rendering: String,
    pub reason: String,
}

/// What happened to every declaration of a module.
///
/// Ported and skipped entries together cover every function considered for
/// generation. Excluded declarations were dropped at ingestion and are not
/// counted as considered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub module: String,
    pub ported: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
    pub excluded: Vec<Exclusion>,
    /// Raw declarations ingested, manual ones included.
    pub declarations_seen: usize,
    /// Ported functions keyed by their default-argument count.
    pub default_args: BTreeMap<usize, usize>,
}

impl GenerationReport {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Default::default()
        }
    }

    /// Account for one emitted function.
    pub fn record(&mut self, emission: &Emission) {
        match emission {
            Emission::Ported(ir) => {
                self.ported.push(ir.rendering.clone());
                *self.default_args.entry(ir.default_args).or_default() += 1;
            }
            Emission::Skipped { rendering, reason } => self.skipped.push(SkippedEntry {
                rendering: rendering.clone(),
                reason: reason.clone(),
            }),
        }
    }

    pub fn considered(&self) -> usize {
        self.ported.len() + self.skipped.len()
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.considered();
        writeln!(f, "PORTED FUNCs LIST ({} of {total}):", self.ported.len())?;
        writeln!(f)?;
        for entry in &self.ported {
            writeln!(f, "{entry}")?;
        }

        writeln!(f)?;
        writeln!(f, "SKIPPED FUNCs LIST ({} of {total}):", self.skipped.len())?;
        writeln!(f)?;
        for entry in &self.skipped {
            writeln!(f, "{}", entry.rendering)?;
            writeln!(f, "   {}", entry.reason)?;
        }

        writeln!(f)?;
        writeln!(f, "EXCLUDED ({}):", self.excluded.len())?;
        writeln!(f)?;
        for entry in &self.excluded {
            writeln!(f, "{}", entry.entity)?;
            writeln!(f, "   {}", entry.reason)?;
        }

        writeln!(f)?;
        writeln!(f, "DEFAULT ARGS HISTOGRAM:")?;
        for (args, funcs) in &self.default_args {
            writeln!(f, "{args} def args - {funcs} funcs")?;
        }

        writeln!(f)?;
        writeln!(f, "{} declarations seen", self.declarations_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_display() {
        let mut report = GenerationReport::new("core");
        report.ported.push("FUNC <int cv.add(int a, int b = 1)>".into());
        report.default_args.insert(1, 1);
        report.skipped.push(SkippedEntry {
            rendering: "FUNC <void cv.Algorithm.operator ()()>".into(),
            reason: "can not map operator () yet".into(),
        });
        report.excluded.push(Exclusion {
            entity: "CLASS cv.FileStorage".into(),
            reason: "class is on the ignore list".into(),
        });

        let output = report.to_string();
        assert!(output.starts_with("PORTED FUNCs LIST (1 of 2):\n\nFUNC <int cv.add"));
        assert!(output.contains("SKIPPED FUNCs LIST (1 of 2):"));
        assert!(output.contains("   can not map operator () yet\n"));
        assert!(output.contains("EXCLUDED (1):\n\nCLASS cv.FileStorage\n"));
        assert!(output.contains("DEFAULT ARGS HISTOGRAM:\n1 def args - 1 funcs\n"));
        assert_eq!(report.considered(), 2);
    }

    #[test]
    fn empty_report_has_all_sections() {
        let output = GenerationReport::new("video").to_string();
        assert!(output.contains("PORTED FUNCs LIST (0 of 0):"));
        assert!(output.contains("EXCLUDED (0):"));
        assert!(output.ends_with("DEFAULT ARGS HISTOGRAM:\n\n0 declarations seen\n"));
    }
}
