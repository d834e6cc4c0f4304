//! Purpose: Seam between the resource layer and the geometric cutting algorithm.
//! Exports: `Kernel`, `KernelRequest`, `KernelMesh`, `KernelOutput`, `KernelError`, `PlanarKernel`.
//! Role: Dispatch hands validated inputs to a kernel and wraps whatever it returns into records.
//! Invariants: A kernel never touches the component store; it only returns flattened meshes.
//! Invariants: A failed cut returns `KernelError` and produces no output at all.
//! Notes: `PlanarKernel` is the built-in implementation; other kernels plug in via `Context::with_kernel`.

mod plane;

use std::collections::TryReserveError;
use std::error::Error as StdError;
use std::fmt;

use crate::core::component::ComponentKind;
use crate::core::flags::{DebugSeverity, DebugType, DispatchFlags};
use crate::core::scheduler::Scheduler;
use crate::core::validate::InputMesh;

pub use plane::PlanarKernel;

#[derive(Clone, Copy, Debug)]
pub struct KernelRequest<'a> {
    pub source: &'a InputMesh,
    pub cut: &'a InputMesh,
    /// Dispatch flags with every filter group already defaulted.
    pub flags: DispatchFlags,
    pub general_position_constant: f64,
    pub general_position_attempts: u32,
}

/// One geometric result. Provenance maps are always filled; dispatch decides what to keep.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelMesh {
    pub kind: ComponentKind,
    pub vertices: Vec<f64>,
    pub face_indices: Vec<u32>,
    pub face_sizes: Vec<u32>,
    pub vertex_map: Vec<u32>,
    pub face_map: Vec<u32>,
    pub seam_vertices: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelOutput {
    pub meshes: Vec<KernelMesh>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KernelError {
    message: String,
    out_of_memory: bool,
}

impl KernelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            out_of_memory: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` when the cut stopped because an output buffer could not be allocated.
    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }
}

impl From<TryReserveError> for KernelError {
    fn from(err: TryReserveError) -> Self {
        Self {
            message: format!("allocation failed: {err}"),
            out_of_memory: true,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for KernelError {}

/// Diagnostics sink handed to a kernel for the duration of one cut.
pub type KernelLog<'a> = dyn FnMut(DebugType, DebugSeverity, &str) + 'a;

pub trait Kernel: Send + Sync {
    fn cut(
        &self,
        request: &KernelRequest<'_>,
        scheduler: &dyn Scheduler,
        log: &mut KernelLog<'_>,
    ) -> Result<KernelOutput, KernelError>;
}
