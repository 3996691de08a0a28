//! Serializable summaries of target re-evaluations.

use serde::{Deserialize, Serialize};

/// Summary of one target re-evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteReport {
    /// `owner.attribute` label of the target.
    pub target: String,
    /// Name of the function whose code was replaced.
    pub function: String,
    /// Transpiler patch names, in application order.
    pub transpilers: Vec<String>,
    /// Prefix patch names, in call order.
    pub prefixes: Vec<String>,
    /// Postfix patch names, in call order.
    pub postfixes: Vec<String>,
    /// Instruction count of the pristine baseline.
    pub baseline_instructions: usize,
    /// Instruction count of the installed code.
    pub installed_instructions: usize,
}

impl RewriteReport {
    /// Number of enabled patches that took part in the rewrite.
    pub fn patch_count(&self) -> usize {
        self.transpilers.len() + self.prefixes.len() + self.postfixes.len()
    }

    /// Pretty JSON rendering for logs and tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
