//! Named, shareable patch collections.

use crate::engine;
use crate::patch::{Patch, PatchTarget};
use crate::registry::{Inner, PatchList};
use crate::report::RewriteReport;
use crate::Result;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A named list of patches plus the operations that (re)apply them.
///
/// Handlers are interned by name in their [`Registry`](crate::Registry): two handles obtained
/// under the same name share one list.
#[derive(Clone)]
pub struct PatchHandler {
    name: Rc<str>,
    patches: PatchList,
    inner: Rc<Inner>,
}

impl PatchHandler {
    pub(crate) fn new(name: &str, patches: PatchList, inner: Rc<Inner>) -> Self {
        Self {
            name: Rc::from(name),
            patches,
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the owned patches in registration order.
    pub fn patches(&self) -> Vec<Rc<Patch>> {
        self.patches.borrow().clone()
    }

    /// Appends a patch without applying it.
    pub fn push(&self, patch: Patch) -> Rc<Patch> {
        let patch = Rc::new(patch);
        self.patches.borrow_mut().push(patch.clone());
        patch
    }

    /// Drops every owned patch without re-evaluating targets.
    pub fn clear(&self) {
        self.patches.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.patches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.borrow().is_empty()
    }

    /// Distinct targets referenced by owned patches, enabled or not, in first-seen order.
    pub fn targets(&self) -> Vec<PatchTarget> {
        let mut targets: Vec<PatchTarget> = Vec::new();
        for patch in self.patches.borrow().iter() {
            if !targets.contains(patch.target()) {
                targets.push(patch.target().clone());
            }
        }
        targets
    }

    /// Recomputes and installs every target this handler touches.
    ///
    /// Each target is rebuilt from every enabled patch registered for it in any handler, not
    /// just this one. Targets that do not resolve are skipped.
    pub fn patch_all(&self) -> Result<Vec<RewriteReport>> {
        let mut reports = Vec::new();
        for target in self.targets() {
            if let Some(report) = engine::rewrite(&self.inner, &target)? {
                reports.push(report);
            }
        }
        debug!(
            "Handler {} re-evaluated {} targets",
            self.name,
            reports.len()
        );
        Ok(reports)
    }

    /// Disables every owned patch, then re-evaluates.
    pub fn unpatch_all(&self) -> Result<Vec<RewriteReport>> {
        for patch in self.patches.borrow().iter() {
            patch.set_enabled(false);
        }
        self.patch_all()
    }

    /// Removes this handler from its registry, then undoes its patches.
    ///
    /// Requesting the same name afterwards yields a fresh, empty handler.
    pub fn destroy(self) -> Result<Vec<RewriteReport>> {
        {
            let mut handlers = self.inner.handlers.borrow_mut();
            if handlers
                .get(self.name.as_ref())
                .is_some_and(|list| Rc::ptr_eq(list, &self.patches))
            {
                handlers.shift_remove(self.name.as_ref());
            }
        }
        debug!("Destroyed handler {}", self.name);
        self.unpatch_all()
    }
}

impl fmt::Debug for PatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchHandler")
            .field("name", &self.name)
            .field("patches", &self.len())
            .finish()
    }
}
