//! This module contains all the specific error implementation for the crate
//!
//! Hopefully like this errors are easier to catch and manage from another crate.
//! Every failure of the offload pipeline is an [`OffloadError`]; the
//! [`crate::orchestrator::Orchestrator`] wraps it in a [`StageError`] so the caller knows
//! which stage of the run was being entered when it happened.

use crate::orchestrator::Stage;
use thiserror::Error;

pub type OffloadResult<T> = Result<T, OffloadError>;

#[derive(Debug, Error)]
pub enum OffloadError {
    #[error("No accelerator available: {0}")]
    AcceleratorUnavailable(String),
    #[error("Kernel program failed to build:\n{log}")]
    CompileError { log: String },
    #[error("Entry point `{entry_point}` not found in the kernel program (available: {available:?})")]
    EntryPointNotFound {
        entry_point: String,
        available: Vec<String>,
    },
    #[error("Kernel `{entry_point}` could not be created: {log}")]
    KernelCreation { entry_point: String, log: String },
    #[error("Out of device memory while allocating {requested} bytes: {detail}")]
    OutOfDeviceMemory { requested: u64, detail: String },
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
    #[error("Invalid argument {index}: {reason}")]
    InvalidArgument { index: u32, reason: String },
    #[error("Dispatch rejected: {0}")]
    DispatchRejected(String),
    #[error("Problem extent {extent} in dimension {dimension} is not divisible by the local size {local}")]
    IndivisibleWorkSize {
        dimension: usize,
        extent: u32,
        local: u32,
    },
    #[error("Invalid dispatch geometry: {0}")]
    InvalidGeometry(String),
    #[error("Expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("The device buffer has been released")]
    BufferReleased,
    #[error("Buffer mapping failed: {0}")]
    BufferMapping(String),
    #[error("Handle belongs to execution context {owner}, not to context {context}")]
    ForeignHandle { owner: u64, context: u64 },
    #[error("The execution context has already been released")]
    ContextReleased,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure of one orchestrated run, tagged with the stage that was being entered
#[derive(Debug, Error)]
#[error("stage {stage:?} failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: OffloadError,
}

impl StageError {
    pub fn new(stage: Stage, error: OffloadError) -> Self {
        StageError { stage, error }
    }

    /// True when the run failed because the kernel source did not build.
    ///
    /// The binary uses it to tell a broken kernel file apart from other failures.
    pub fn is_compile_error(&self) -> bool {
        matches!(self.error, OffloadError::CompileError { .. })
    }
}
