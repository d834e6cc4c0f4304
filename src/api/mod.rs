//! Purpose: Define the public Rust API boundary for meshcut.
//! Exports: `Registry`, `Context`, `ContextConfig`, and the core types their operations take.
//! Role: Stable surface used by Rust callers and by the C ABI layer.
//! Invariants: Callers reach contexts only through a `Registry` they own.
//! Invariants: Internal store and router types stay behind `Context` methods.

pub mod config;
mod context;
mod registry;

pub use crate::core::component::{ComponentKind, ConnectedComponent};
pub use crate::core::debug::{DebugCallback, DebugMessage};
pub use crate::core::error::{Error, ErrorKind, to_status_code};
pub use crate::core::flags::{
    ComponentType, ComponentTypeFilter, ContextFlags, DebugSeverity, DebugSource, DebugType,
    DispatchFlags, FragmentLocation, InputOrigin, PatchLocation, SealType, SeamOrigin,
    WindingOrder,
};
pub use crate::core::handle::{ComponentHandle, ContextHandle};
pub use crate::core::mesh::UNDEFINED_INDEX;
pub use crate::core::query::DataSelector;
pub use crate::core::state::{InfoKey, StateKey};
pub use crate::core::validate::{MeshInput, VertexArray};
pub use config::ContextConfig;
pub use context::{Context, message_id};
pub use registry::Registry;
