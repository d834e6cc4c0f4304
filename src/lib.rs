//! Purpose: Mesh-cutting resource layer: contexts, connected components, and the C ABI over them.
//! Exports: `api` (registry, context, config), `kernel` (cutting seam), `abi`, `logging`.
//! Role: Library crate built as rlib for Rust callers and cdylib/staticlib for C callers.
//! Invariants: Rust callers own an explicit `api::Registry`; only `abi` holds a process-wide one.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod api;
pub mod core;
pub mod kernel;
pub mod logging;
