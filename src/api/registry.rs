//! Purpose: Explicit owner of live contexts and the handle allocator they share.
//! Exports: `Registry`.
//! Role: Resolves context handles for every operation; the only cross-context shared state.
//! Invariants: The map lock is held only to insert, look up, or remove entries.
//! Invariants: After `shutdown`, creation fails with `NotSupported` and the map stays empty.
//! Notes: Context operations lock the context itself, never the registry map.
#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::config::ContextConfig;
use crate::api::context::Context;
use crate::core::error::{Error, ErrorKind};
use crate::core::flags::ContextFlags;
use crate::core::handle::{ContextHandle, HandleAllocator};
use crate::kernel::Kernel;

type SharedContext = Arc<Mutex<Context>>;

#[derive(Default)]
struct Entries {
    contexts: HashMap<ContextHandle, SharedContext>,
    shut_down: bool,
}

pub struct Registry {
    ids: Arc<HandleAllocator>,
    config: ContextConfig,
    entries: Mutex<Entries>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            ids: Arc::new(HandleAllocator::new()),
            config,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.lock().contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_context(&self, flags: ContextFlags) -> Result<ContextHandle, Error> {
        self.create_context_with(flags, None)
    }

    /// Creates a context that cuts with `kernel` instead of the built-in planar kernel.
    pub fn create_context_with_kernel(
        &self,
        flags: ContextFlags,
        kernel: Arc<dyn Kernel>,
    ) -> Result<ContextHandle, Error> {
        self.create_context_with(flags, Some(kernel))
    }

    fn create_context_with(
        &self,
        flags: ContextFlags,
        kernel: Option<Arc<dyn Kernel>>,
    ) -> Result<ContextHandle, Error> {
        if self.entries.lock().shut_down {
            return Err(shut_down());
        }
        let handle = self.ids.next_context();
        let mut context = Context::new(handle, flags, self.config, Arc::clone(&self.ids))?;
        if let Some(kernel) = kernel {
            context = context.with_kernel(kernel);
        }

        let mut entries = self.entries.lock();
        if entries.shut_down {
            return Err(shut_down());
        }
        entries
            .contexts
            .insert(handle, Arc::new(Mutex::new(context)));
        tracing::info!(context = %handle, flags = flags.bits(), "created context");
        Ok(handle)
    }

    /// Destroys the context and every component it still owns.
    pub fn release_context(&self, handle: ContextHandle) -> Result<(), Error> {
        let removed = self.entries.lock().contexts.remove(&handle);
        match removed {
            Some(context) => {
                let components = context.lock().num_components();
                tracing::info!(context = %handle, components, "released context");
                Ok(())
            }
            None => Err(unknown(handle)),
        }
    }

    /// Runs `op` with exclusive access to one live context.
    pub fn with_context<R>(
        &self,
        handle: ContextHandle,
        op: impl FnOnce(&mut Context) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let context = self
            .entries
            .lock()
            .contexts
            .get(&handle)
            .cloned()
            .ok_or_else(|| unknown(handle))?;
        let mut guard = context.lock();
        op(&mut guard)
    }

    /// Stops accepting new contexts and releases the live ones; returns how many were live.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<SharedContext> = {
            let mut entries = self.entries.lock();
            entries.shut_down = true;
            entries.contexts.drain().map(|(_, context)| context).collect()
        };
        if !drained.is_empty() {
            tracing::warn!(leaked = drained.len(), "registry shut down with live contexts");
        }
        drained.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.entries.lock().shut_down
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("Registry")
            .field("contexts", &entries.contexts.len())
            .field("shut_down", &entries.shut_down)
            .field("config", &self.config)
            .finish()
    }
}

fn unknown(handle: ContextHandle) -> Error {
    Error::new(ErrorKind::InvalidHandle)
        .with_message("unknown context")
        .with_handle(handle.to_raw())
}

fn shut_down() -> Error {
    Error::new(ErrorKind::NotSupported).with_message("registry has been shut down")
}
