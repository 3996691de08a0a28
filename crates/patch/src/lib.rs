//! Prefix, postfix and transpiler hooks for weft functions.
//!
//! Hooks are registered against `(owner, attribute)` targets through a [`Registry`]. Every
//! change re-derives the target's code from its pristine baseline: transpilers run first, then
//! prefix and postfix scaffolding is synthesized around the result, and the assembled code is
//! swapped into the live function in place.

pub mod baseline;
pub mod config;
pub mod engine;
pub mod handler;
pub mod patch;
pub mod postfix;
pub mod prefix;
pub mod registry;
pub mod report;

pub use baseline::{Baseline, BaselineCache};
pub use config::RewriteConfig;
pub use handler::PatchHandler;
pub use patch::{Hook, HookKind, Patch, PatchBuilder, PatchTarget, PostfixFn, PrefixFn, TranspilerFn};
pub use registry::{ANONYMOUS, PatchOptions, Registry};
pub use report::RewriteReport;

use thiserror::Error;

/// Patch error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A patch was described with zero or several hooks.
    #[error("invalid patch configuration: {0}")]
    Configuration(String),

    /// Decoding, a transpiler, or assembly failed.
    #[error(transparent)]
    Core(#[from] weft_core::Error),
}

/// Patch result type
pub type Result<T> = std::result::Result<T, Error>;
