//! Purpose: One isolated cutting session and every operation that targets it.
//! Exports: `Context`.
//! Role: Owns the component store, debug router, scheduler, bound state, and kernel.
//! Invariants: Every fallible operation either fully succeeds or leaves the context unchanged.
//! Invariants: Dispatch validates both meshes before the kernel runs and stores results atomically.
//! Invariants: Queries follow the two-phase protocol: size with `None`, then fill a big-enough slice.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use crate::api::config::ContextConfig;
use crate::core::component::ConnectedComponent;
use crate::core::debug::{DebugCallback, DebugRouter};
use crate::core::error::{Error, ErrorKind, try_to_vec, try_vec};
use crate::core::flags::{
    ComponentTypeFilter, ContextFlags, DebugSeverity, DebugSource, DebugType, DispatchFlags,
};
use crate::core::handle::{ComponentHandle, ContextHandle, HandleAllocator};
use crate::core::mesh::IndexArrayMesh;
use crate::core::query::{DataSelector, Payload, component_payload, fill};
use crate::core::scheduler::{Scheduler, build_scheduler, for_each_chunk};
use crate::core::state::{BoundState, InfoKey, StateKey};
use crate::core::store::ComponentStore;
use crate::core::validate::{MeshInput, VertexArray, validate_mesh};
use crate::kernel::{Kernel, KernelMesh, KernelRequest, PlanarKernel};

/// Router message ids for events raised by this layer.
pub mod message_id {
    pub const API_ERROR: u32 = 1;
    pub const DISPATCH_SUMMARY: u32 = 2;
    pub const KERNEL: u32 = 100;
}

pub struct Context {
    handle: ContextHandle,
    flags: ContextFlags,
    config: ContextConfig,
    store: ComponentStore,
    router: DebugRouter,
    scheduler: Box<dyn Scheduler>,
    state: BoundState,
    kernel: Arc<dyn Kernel>,
}

impl Context {
    pub(crate) fn new(
        handle: ContextHandle,
        flags: ContextFlags,
        config: ContextConfig,
        ids: Arc<HandleAllocator>,
    ) -> Result<Self, Error> {
        let scheduler = build_scheduler(
            flags.contains(ContextFlags::MULTI_THREADED),
            config.worker_threads,
        )?;
        Ok(Self {
            handle,
            flags,
            config,
            store: ComponentStore::new(ids),
            router: DebugRouter::new(),
            scheduler,
            state: BoundState::new(
                config.general_position_constant,
                config.general_position_attempts,
            ),
            kernel: Arc::new(PlanarKernel),
        })
    }

    /// Swaps the cutting algorithm used by later dispatches.
    pub fn with_kernel(mut self, kernel: Arc<dyn Kernel>) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn bound_state(&self) -> &BoundState {
        &self.state
    }

    pub fn num_components(&self) -> usize {
        self.store.len()
    }

    pub fn set_debug_callback(&mut self, callback: Option<DebugCallback>) {
        self.router.set_callback(callback);
    }

    pub fn set_debug_filter(
        &mut self,
        sources: DebugSource,
        kinds: DebugType,
        severities: DebugSeverity,
        enabled: bool,
    ) {
        self.router.set_filter(sources, kinds, severities, enabled);
    }

    /// Reports a failed operation to the client's debug channel.
    pub fn log_error(&mut self, operation: &str, err: &Error) {
        self.router.log(
            DebugSource::API,
            DebugType::ERROR,
            message_id::API_ERROR,
            DebugSeverity::HIGH,
            &format!("{operation}: {err}"),
        );
    }

    /// Cuts `source` with `cut` and stores every produced component.
    ///
    /// Returns the number of components added. Prior components stay valid unless
    /// `REPLACE_COMPONENTS` is set, in which case they are released in the same step
    /// that stores the new ones.
    pub fn dispatch(
        &mut self,
        flags: DispatchFlags,
        source: &MeshInput<'_>,
        cut: &MeshInput<'_>,
    ) -> Result<usize, Error> {
        let span = tracing::info_span!("dispatch", context = %self.handle, flags = flags.bits());
        let _enter = span.enter();

        check_vertex_flags(flags, source, cut)?;
        let source = validate_mesh(source, "source")?;
        let cut = validate_mesh(cut, "cut")?;
        let request = KernelRequest {
            source: &source,
            cut: &cut,
            flags: (flags - DispatchFlags::FILTER_ALL) | flags.effective_filters(),
            general_position_constant: self.state.general_position_constant,
            general_position_attempts: self.state.general_position_attempts,
        };

        let debug = self.flags.contains(ContextFlags::DEBUG);
        let router = &mut self.router;
        let mut sink = |kind: DebugType, severity: DebugSeverity, text: &str| {
            if severity == DebugSeverity::NOTIFICATION && !debug {
                tracing::debug!(target: "meshcut::kernel", "{text}");
                return;
            }
            router.log(DebugSource::KERNEL, kind, message_id::KERNEL, severity, text);
        };
        let output = self
            .kernel
            .cut(&request, self.scheduler.as_ref(), &mut sink)
            .map_err(|err| {
                tracing::warn!(error = %err, "kernel failed");
                let kind = if err.is_out_of_memory() {
                    ErrorKind::OutOfMemory
                } else {
                    ErrorKind::KernelFailure
                };
                Error::new(kind)
                    .with_message(err.message().to_string())
                    .with_source(err)
            })?;

        let records = build_records(self.scheduler.as_ref(), &output.meshes, flags)?;
        let added = records.len();
        if flags.contains(DispatchFlags::REPLACE_COMPONENTS) {
            let released = self.store.release(&[])?;
            tracing::debug!(released, "replaced prior components");
        }
        self.store.insert_all(records);

        tracing::info!(added, total = self.store.len(), "dispatch complete");
        if debug {
            self.router.log(
                DebugSource::API,
                DebugType::OTHER,
                message_id::DISPATCH_SUMMARY,
                DebugSeverity::NOTIFICATION,
                &format!("dispatch stored {added} connected components"),
            );
        }
        Ok(added)
    }

    /// Handles matching `filter` in insertion order.
    ///
    /// With `None` only the count is returned. A destination shorter than the count
    /// fails with `BufferTooSmall` and is left untouched.
    pub fn connected_components(
        &self,
        filter: ComponentTypeFilter,
        dst: Option<&mut [ComponentHandle]>,
    ) -> Result<usize, Error> {
        let handles = self.store.enumerate(filter);
        let Some(dst) = dst else {
            return Ok(handles.len());
        };
        if dst.len() < handles.len() {
            return Err(Error::new(ErrorKind::BufferTooSmall)
                .with_message(format!("destination holds {} handles", dst.len()))
                .with_required(handles.len() as u64));
        }
        dst[..handles.len()].copy_from_slice(&handles);
        Ok(handles.len())
    }

    pub fn component_handles(&self, filter: ComponentTypeFilter) -> Vec<ComponentHandle> {
        self.store.enumerate(filter)
    }

    pub fn component(&self, handle: ComponentHandle) -> Result<&ConnectedComponent, Error> {
        self.store.get(handle)
    }

    /// Byte count of one component array, copied into `dst` when given.
    pub fn component_data(
        &mut self,
        handle: ComponentHandle,
        selector: DataSelector,
        dst: Option<&mut [u8]>,
    ) -> Result<usize, Error> {
        let winding = self.state.winding_order;
        let record = self.store.get_mut(handle)?;
        let payload = component_payload(record, selector, winding)?;
        fill(&payload, dst)
    }

    pub fn bind_state(&mut self, key: StateKey, value: &[u8]) -> Result<(), Error> {
        self.state.bind(key, value)?;
        tracing::debug!(context = %self.handle, ?key, "bound state");
        Ok(())
    }

    pub fn info(&self, key: InfoKey, dst: Option<&mut [u8]>) -> Result<usize, Error> {
        let bytes = match key {
            InfoKey::Flags => self.flags.bits().to_ne_bytes().to_vec(),
            InfoKey::WorkerThreads => {
                (self.scheduler.worker_threads() as u32).to_ne_bytes().to_vec()
            }
            InfoKey::State(key) => self.state.encode(key),
        };
        fill(&Payload::Bytes(&bytes), dst)
    }

    /// Releases the named components, or all of them when `handles` is empty.
    pub fn release_components(&mut self, handles: &[ComponentHandle]) -> Result<usize, Error> {
        let released = self.store.release(handles)?;
        tracing::debug!(context = %self.handle, released, "released components");
        Ok(released)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("handle", &self.handle)
            .field("flags", &self.flags)
            .field("components", &self.store.len())
            .field("worker_threads", &self.scheduler.worker_threads())
            .field("state", &self.state)
            .finish()
    }
}

fn check_vertex_flags(
    flags: DispatchFlags,
    source: &MeshInput<'_>,
    cut: &MeshInput<'_>,
) -> Result<(), Error> {
    let float = flags.contains(DispatchFlags::VERTEX_ARRAY_FLOAT);
    let double = flags.contains(DispatchFlags::VERTEX_ARRAY_DOUBLE);
    if float == double {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("exactly one vertex array type flag is required"));
    }
    for mesh in [source, cut] {
        let matches = match mesh.vertices {
            VertexArray::Float(_) => float,
            VertexArray::Double(_) => double,
        };
        if !matches {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("vertex array type does not match the dispatch flags"));
        }
    }
    Ok(())
}

/// Wraps kernel meshes into records, one work item per chunk of meshes.
fn build_records(
    scheduler: &dyn Scheduler,
    meshes: &[KernelMesh],
    flags: DispatchFlags,
) -> Result<Vec<ConnectedComponent>, Error> {
    let mut slots: Vec<Option<Result<ConnectedComponent, Error>>> = try_vec(meshes.len())?;
    slots.resize_with(meshes.len(), || None);
    for_each_chunk(scheduler, meshes, &mut slots, 1, |_, mesh, slot| {
        *slot = Some(build_record(mesh, flags));
    });
    let mut records = try_vec(meshes.len())?;
    for slot in slots {
        let record = slot.unwrap_or_else(|| {
            Err(Error::new(ErrorKind::KernelFailure).with_message("component was not built"))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn build_record(mesh: &KernelMesh, flags: DispatchFlags) -> Result<ConnectedComponent, Error> {
    let invalid = |err: Error| {
        if err.kind() == ErrorKind::InvalidArgument {
            Error::new(ErrorKind::KernelFailure)
                .with_message("kernel produced an inconsistent mesh")
                .with_source(err)
        } else {
            err
        }
    };
    let mut record = IndexArrayMesh::from_faces(
        try_to_vec(&mesh.vertices)?,
        try_to_vec(&mesh.face_indices)?,
        try_to_vec(&mesh.face_sizes)?,
    )
    .and_then(|record| record.with_seam_vertices(try_to_vec(&mesh.seam_vertices)?))
    .map_err(invalid)?;
    if flags.contains(DispatchFlags::INCLUDE_VERTEX_MAP) {
        record = record
            .with_vertex_map(try_to_vec(&mesh.vertex_map)?)
            .map_err(invalid)?;
    }
    if flags.contains(DispatchFlags::INCLUDE_FACE_MAP) {
        record = record
            .with_face_map(try_to_vec(&mesh.face_map)?)
            .map_err(invalid)?;
    }
    if flags.contains(DispatchFlags::INCLUDE_TRIANGULATION) {
        record.ensure_triangulation()?;
    }
    Ok(ConnectedComponent::new(mesh.kind, record))
}
