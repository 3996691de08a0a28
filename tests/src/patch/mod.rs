//! Patch engine tests against real compiled functions.

mod handlers;
mod hooks;
mod ordering;
mod transpiler;
