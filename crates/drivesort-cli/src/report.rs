//! End-of-run summary and small listing helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use drivesort_ai::gemini::ModelInfo;
use drivesort_core::Method;

const LABEL_WIDTH: usize = 22;

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Non-folder items handled.
    pub processed: usize,
    /// Folders left in place.
    pub skipped: usize,
    /// Moves that succeeded (or were planned, in a dry run).
    pub moved: usize,
    /// Of `moved`, how many went to the review folder.
    pub flagged: usize,
    /// Files whose folder or move step failed.
    pub failed: usize,
    /// Result count per method label.
    pub by_method: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record_method(&mut self, method: &Method) {
        *self.by_method.entry(method.to_string()).or_default() += 1;
    }
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "  {label:<width$}{value}", width = LABEL_WIDTH)
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "── Summary ──")?;
        row(f, "Processed", self.processed)?;
        row(f, "Skipped (folders)", self.skipped)?;
        row(f, "Moved", self.moved)?;
        row(f, "Flagged for review", self.flagged)?;
        row(f, "Failed", self.failed)?;
        row(f, "Elapsed", format_args!("{:.1}s", self.elapsed.as_secs_f64()))?;

        if !self.by_method.is_empty() {
            writeln!(f)?;
            writeln!(f, "── By method ──")?;
            for (method, count) in &self.by_method {
                row(f, method, count)?;
            }
        }
        Ok(())
    }
}

/// One line per model: short name, then display name when it differs.
pub fn format_models(models: &[ModelInfo]) -> String {
    let mut out = String::new();
    for m in models {
        let short = m.name.trim_start_matches("models/");
        if m.display_name.is_empty() || m.display_name == short {
            out.push_str(&format!("  {short}\n"));
        } else {
            out.push_str(&format!("  {short:<32}{}\n", m.display_name));
        }
    }
    out
}
