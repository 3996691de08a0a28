//! Pristine code of every target seen so far.
//!
//! Recomputation always starts from the baseline, so re-patching never stacks scaffolding on
//! top of previously installed scaffolding.

use crate::patch::PatchTarget;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;
use weft_core::{CodeObject, FunctionHandle, Value};

/// The function object of a target and the code it carried when first observed.
#[derive(Clone, Debug)]
pub struct Baseline {
    pub function: FunctionHandle,
    pub code: Rc<CodeObject>,
}

#[derive(Default)]
pub struct BaselineCache {
    entries: HashMap<PatchTarget, Baseline>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `target`, recording its baseline on first sight.
    ///
    /// Returns `None` when the owner lacks the attribute, or when a first capture finds something
    /// other than an interpreted function.
    pub fn get_or_capture(&mut self, target: &PatchTarget) -> Option<Baseline> {
        let Some(value) = target.owner().lookup(target.attribute()) else {
            debug!("{} does not resolve, skipping", target.label());
            return None;
        };

        if let Some(baseline) = self.entries.get(target) {
            return Some(baseline.clone());
        }

        let Value::Function(function) = value else {
            debug!(
                "{} is a {}, not a patchable function",
                target.label(),
                value.type_name()
            );
            return None;
        };

        let baseline = Baseline {
            code: function.code(),
            function,
        };
        debug!(
            "Captured baseline for {} ({} instructions)",
            target.label(),
            baseline.code.len()
        );
        self.entries.insert(target.clone(), baseline.clone());
        Some(baseline)
    }

    /// Reads a recorded baseline without capturing.
    pub fn get(&self, target: &PatchTarget) -> Option<&Baseline> {
        self.entries.get(target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
