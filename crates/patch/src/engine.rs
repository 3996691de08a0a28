//! Per-target recomputation: gather, order, rewrite, assemble, install.

use crate::patch::{Hook, Patch, PatchTarget};
use crate::registry::Inner;
use crate::report::RewriteReport;
use crate::{Result, postfix, prefix};
use std::cmp::Reverse;
use std::rc::Rc;
use tracing::{debug, info};
use weft_core::{assemble, decode};

/// Enabled patches for `target` across every handler, in registration order.
fn collect(inner: &Inner, target: &PatchTarget) -> Vec<Rc<Patch>> {
    inner
        .handlers
        .borrow()
        .values()
        .flat_map(|list| list.borrow().clone())
        .filter(|patch| patch.is_enabled() && patch.target() == target)
        .collect()
}

fn names(patches: &[Rc<Patch>]) -> Vec<String> {
    patches.iter().map(|p| p.name().to_string()).collect()
}

/// Rebuilds the code of `target` from its baseline and every enabled patch, then installs it.
///
/// Returns `Ok(None)` when the target does not resolve to a patchable function.
pub(crate) fn rewrite(inner: &Inner, target: &PatchTarget) -> Result<Option<RewriteReport>> {
    let Some(baseline) = inner.baselines.borrow_mut().get_or_capture(target) else {
        return Ok(None);
    };

    let mut patches = collect(inner, target);
    // Stable: equal priorities keep registration order
    patches.sort_by_key(|patch| Reverse(patch.priority()));

    let (mut transpilers, mut prefixes, mut postfixes) = (Vec::new(), Vec::new(), Vec::new());
    for patch in patches {
        match patch.hook() {
            Hook::Transpiler(_) => transpilers.push(patch),
            Hook::Prefix(_) => prefixes.push(patch),
            Hook::Postfix(_) => postfixes.push(patch),
        }
    }
    debug!(
        "Rewriting {}: {} transpilers, {} prefixes, {} postfixes",
        target.label(),
        transpilers.len(),
        prefixes.len(),
        postfixes.len()
    );

    let mut program = decode(&baseline.code)?;
    for patch in &transpilers {
        if let Hook::Transpiler(hook) = patch.hook() {
            debug!("Applying transpiler {}", patch.name());
            program = hook(program)?;
        }
    }

    let config = &inner.config;
    if !prefixes.is_empty() {
        let hooks = prefixes
            .iter()
            .filter_map(|patch| match patch.hook() {
                Hook::Prefix(hook) => Some(hook.clone()),
                _ => None,
            })
            .collect();
        prefix::scaffold(&mut program, prefix::combine(hooks), config);
    }
    if !postfixes.is_empty() {
        let hooks = postfixes
            .iter()
            .filter_map(|patch| match patch.hook() {
                Hook::Postfix(hook) => Some(hook.clone()),
                _ => None,
            })
            .collect();
        postfix::scaffold(&mut program, postfix::combine(hooks), config);
    }

    let code = assemble(&program)?;
    let report = RewriteReport {
        target: target.label(),
        function: baseline.function.name().to_string(),
        transpilers: names(&transpilers),
        prefixes: names(&prefixes),
        postfixes: names(&postfixes),
        baseline_instructions: baseline.code.len(),
        installed_instructions: code.len(),
    };

    baseline.function.install(Rc::new(code));
    info!(
        "Installed {} ({} -> {} instructions, {} patches)",
        report.target,
        report.baseline_instructions,
        report.installed_instructions,
        report.patch_count()
    );
    if let Ok(json) = report.to_json() {
        debug!("{}", json);
    }

    Ok(Some(report))
}
