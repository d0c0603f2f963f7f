//! Sandboxed execution of model-generated Python.
//!
//! Code flows through two layers:
//!
//! - [`SecurityPolicy`] - a deny-list pre-filter (emptiness, length, regex
//!   patterns, function names) that rejects code before any process starts
//! - [`CodeRunner`] - runs validated code; [`PythonRunner`] starts a fresh,
//!   resource-limited `python -I` process per run with a restricted namespace
//!
//! [`SandboxExecutor`] ties them together and maps every outcome to an
//! [`ExecutionResult`].

mod bootstrap;
mod executor;
mod policy;
mod runner;

pub use bootstrap::{FAULT_EXIT_CODE, NamespaceSpec};
pub use executor::{ExecutionResult, SandboxExecutor};
pub use policy::{RiskLevel, SecurityPolicy, ValidationOutcome};
pub use runner::{CodeRunner, ProcessLimits, PythonRunner, RunOutput};
