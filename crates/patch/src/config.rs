//! Rewrite configuration: the reserved result key and synthesized local names.

use serde::{Deserialize, Serialize};

/// Names the engine reserves when it synthesizes scaffolding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Key under which postfix hooks find (and may replace) the pending return value.
    pub result_key: String,
    /// Local holding the map handed to prefix hooks.
    pub prefix_state: String,
    /// Local holding the map handed to postfix hooks.
    pub postfix_state: String,
    /// Local parking the pending return value while the postfix map is built.
    pub pending_result: String,
}

impl RewriteConfig {
    /// True if `local` is one of the synthesized scaffolding locals.
    pub fn is_synthesized(&self, local: &str) -> bool {
        local == self.prefix_state || local == self.postfix_state || local == self.pending_result
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            result_key: "__result".into(),
            prefix_state: "__weft_prefix_state".into(),
            postfix_state: "__weft_postfix_state".into(),
            pending_result: "__weft_pending".into(),
        }
    }
}
