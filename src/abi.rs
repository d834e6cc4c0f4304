//! Purpose: C ABI bridge (libmeshcut) over a lazily created process registry.
//! Exports: `mc_*` functions and the `mc_debug_callback` type.
//! Role: Handle-and-status-code surface for non-Rust callers.
//! Invariants: Every function returns 0 or a `to_status_code` value and never unwinds.
//! Invariants: Handles are raw `u64`; 0 is the null handle and is always `InvalidHandle`.
//! Invariants: The context handle is resolved before any other argument is parsed.
//! Invariants: Size-only calls pass a null buffer, zero capacity, and a non-null size pointer.
//! Notes: Debug callbacks run while the context is locked and must not re-enter the same context.
#![allow(clippy::result_large_err)]
#![allow(non_camel_case_types)]

use std::any::Any;
use std::ffi::{c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use crate::api::{
    ComponentHandle, ComponentTypeFilter, ContextConfig, ContextFlags, ContextHandle,
    DataSelector, DebugCallback, DebugSeverity, DebugSource, DebugType, DispatchFlags, Error,
    ErrorKind, InfoKey, MeshInput, Registry, StateKey, VertexArray, to_status_code,
};
use crate::core::flags::parse_flags;

/// `(source, type, id, severity, length, message, user_data)`; `message` is NUL-terminated.
pub type mc_debug_callback = Option<
    unsafe extern "C" fn(
        source: u32,
        kind: u32,
        id: u32,
        severity: u32,
        length: usize,
        message: *const c_char,
        user_data: *mut c_void,
    ),
>;

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let config = ContextConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring invalid MESHCUT_* environment");
        ContextConfig::default()
    });
    Registry::with_config(config)
});

fn registry() -> &'static Registry {
    &REGISTRY
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_init_tracing() -> i32 {
    guard("mc_init_tracing", 0, || {
        crate::logging::init_tracing();
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_create_context(flags: u32, out_context: *mut u64) -> i32 {
    guard("mc_create_context", 0, || {
        if out_context.is_null() {
            return Err(invalid("out_context is null"));
        }
        let flags: ContextFlags = parse_flags(flags, "context flags")?;
        let handle = registry().create_context(flags)?;
        unsafe {
            *out_context = handle.to_raw();
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_release_context(context: u64) -> i32 {
    guard("mc_release_context", 0, || {
        registry().release_context(ContextHandle::from_raw(context)?)
    })
}

struct UserData(*mut c_void);

// The pointer is opaque to us and only ever handed back to the client's callback.
unsafe impl Send for UserData {}

impl UserData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_debug_message_callback(
    context: u64,
    callback: mc_debug_callback,
    user_data: *mut c_void,
) -> i32 {
    guard("mc_debug_message_callback", context, || {
        let callback: Option<DebugCallback> = callback.map(|callback| {
            let user_data = UserData(user_data);
            Box::new(move |message: &crate::api::DebugMessage<'_>| {
                let mut text = Vec::with_capacity(message.text.len() + 1);
                text.extend_from_slice(message.text.as_bytes());
                text.push(0);
                unsafe {
                    callback(
                        message.source.bits(),
                        message.kind.bits(),
                        message.id,
                        message.severity.bits(),
                        message.text.len(),
                        text.as_ptr().cast(),
                        user_data.get(),
                    );
                }
            }) as DebugCallback
        });
        with_context(context, |ctx| {
            ctx.set_debug_callback(callback);
            Ok(())
        })
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_debug_message_control(
    context: u64,
    source: u32,
    kind: u32,
    severity: u32,
    enabled: u8,
) -> i32 {
    guard("mc_debug_message_control", context, || {
        with_context(context, |ctx| {
            let source: DebugSource = parse_flags(source, "debug source")?;
            let kind: DebugType = parse_flags(kind, "debug type")?;
            let severity: DebugSeverity = parse_flags(severity, "debug severity")?;
            ctx.set_debug_filter(source, kind, severity, enabled != 0);
            Ok(())
        })
    })
}

/// One input mesh as raw client arrays. `face_sizes` may be null for all-triangle meshes.
struct RawMesh {
    vertices: *const c_void,
    face_indices: *const u32,
    face_sizes: *const u32,
    num_vertices: u32,
    num_faces: u32,
}

impl RawMesh {
    /// # Safety
    /// Every non-null pointer must be valid for the counts the caller passed.
    unsafe fn borrow<'a>(&self, flags: DispatchFlags, which: &str) -> Result<MeshInput<'a>, Error> {
        let num_values = self.num_vertices as usize * 3;
        let vertices = if flags.contains(DispatchFlags::VERTEX_ARRAY_FLOAT) {
            VertexArray::Float(unsafe { raw_slice(self.vertices.cast::<f32>(), num_values, which)? })
        } else {
            VertexArray::Double(unsafe { raw_slice(self.vertices.cast::<f64>(), num_values, which)? })
        };
        let face_sizes = if self.face_sizes.is_null() {
            None
        } else {
            Some(unsafe { raw_slice(self.face_sizes, self.num_faces as usize, which)? })
        };
        let num_indices = match face_sizes {
            Some(sizes) => sizes.iter().map(|&size| size as usize).sum(),
            None => self.num_faces as usize * 3,
        };
        let face_indices = unsafe { raw_slice(self.face_indices, num_indices, which)? };
        Ok(MeshInput {
            vertices,
            face_indices,
            face_sizes,
        })
    }
}

#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn mc_dispatch(
    context: u64,
    flags: u32,
    src_vertices: *const c_void,
    src_face_indices: *const u32,
    src_face_sizes: *const u32,
    num_src_vertices: u32,
    num_src_faces: u32,
    cut_vertices: *const c_void,
    cut_face_indices: *const u32,
    cut_face_sizes: *const u32,
    num_cut_vertices: u32,
    num_cut_faces: u32,
) -> i32 {
    let source = RawMesh {
        vertices: src_vertices,
        face_indices: src_face_indices,
        face_sizes: src_face_sizes,
        num_vertices: num_src_vertices,
        num_faces: num_src_faces,
    };
    let cut = RawMesh {
        vertices: cut_vertices,
        face_indices: cut_face_indices,
        face_sizes: cut_face_sizes,
        num_vertices: num_cut_vertices,
        num_faces: num_cut_faces,
    };
    guard("mc_dispatch", context, || {
        with_context(context, |ctx| {
            let flags: DispatchFlags = parse_flags(flags, "dispatch flags")?;
            let source = unsafe { source.borrow(flags, "source mesh")? };
            let cut = unsafe { cut.borrow(flags, "cut mesh")? };
            ctx.dispatch(flags, &source, &cut).map(|_| ())
        })
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_get_connected_components(
    context: u64,
    filter: u32,
    capacity: u32,
    out_handles: *mut u64,
    out_count: *mut u32,
) -> i32 {
    guard("mc_get_connected_components", context, || {
        let (size_only, handles) = with_context(context, |ctx| {
            let filter: ComponentTypeFilter = parse_flags(filter, "component type filter")?;
            let size_only =
                check_destination(out_handles.cast(), capacity as usize, out_count.cast())?;
            Ok((size_only, ctx.component_handles(filter)))
        })?;
        let count = u32::try_from(handles.len())
            .map_err(|_| invalid("component count exceeds u32"))?;
        write_out(out_count, count);
        if size_only {
            return Ok(());
        }
        if (capacity as usize) < handles.len() {
            return Err(Error::new(ErrorKind::BufferTooSmall)
                .with_message(format!("capacity {capacity} handles"))
                .with_required(u64::from(count)));
        }
        let dst = unsafe { std::slice::from_raw_parts_mut(out_handles, handles.len()) };
        for (slot, handle) in dst.iter_mut().zip(&handles) {
            *slot = handle.to_raw();
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_get_connected_component_data(
    context: u64,
    component: u64,
    selector: u32,
    capacity: usize,
    out_data: *mut c_void,
    out_size: *mut usize,
) -> i32 {
    guard("mc_get_connected_component_data", context, || {
        let result = with_context(context, |ctx| {
            let component = ComponentHandle::from_raw(component)?;
            let selector = DataSelector::from_raw(selector)?;
            let dst = destination(out_data, capacity, out_size)?;
            ctx.component_data(component, selector, dst)
        });
        report_size(result, out_size)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_get_info(
    context: u64,
    key: u32,
    capacity: usize,
    out_data: *mut c_void,
    out_size: *mut usize,
) -> i32 {
    guard("mc_get_info", context, || {
        let result = with_context(context, |ctx| {
            let key = InfoKey::from_raw(key)?;
            let dst = destination(out_data, capacity, out_size)?;
            ctx.info(key, dst)
        });
        report_size(result, out_size)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn mc_bind_state(context: u64, key: u32, size: usize, value: *const c_void) -> i32 {
    guard("mc_bind_state", context, || {
        with_context(context, |ctx| {
            let key = StateKey::from_raw(key)?;
            let value = unsafe { raw_slice(value.cast::<u8>(), size, "state value")? };
            ctx.bind_state(key, value)
        })
    })
}

/// Releases `count` named components, or all of the context's components when `count` is 0.
#[unsafe(no_mangle)]
pub extern "C" fn mc_release_connected_components(
    context: u64,
    count: u32,
    handles: *const u64,
) -> i32 {
    guard("mc_release_connected_components", context, || {
        let raw = unsafe { raw_slice(handles, count as usize, "component handles")? };
        let handles = raw
            .iter()
            .map(|&raw| ComponentHandle::from_raw(raw))
            .collect::<Result<Vec<_>, _>>()?;
        with_context(context, |ctx| ctx.release_components(&handles).map(|_| ()))
    })
}

fn with_context<R>(
    context: u64,
    op: impl FnOnce(&mut crate::api::Context) -> Result<R, Error>,
) -> Result<R, Error> {
    registry().with_context(ContextHandle::from_raw(context)?, op)
}

/// Runs one ABI call: converts panics to `KernelFailure` and errors to status codes.
fn guard(operation: &'static str, context: u64, body: impl FnOnce() -> Result<(), Error>) -> i32 {
    let result = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        Err(Error::new(ErrorKind::KernelFailure)
            .with_message(format!("panic: {}", panic_message(payload.as_ref()))))
    });
    match result {
        Ok(()) => 0,
        Err(err) => fail(operation, context, err),
    }
}

fn fail(operation: &'static str, context: u64, err: Error) -> i32 {
    tracing::debug!(operation, error = %err, "call failed");
    if let Ok(handle) = ContextHandle::from_raw(context) {
        let logged = panic::catch_unwind(AssertUnwindSafe(|| {
            registry().with_context(handle, |ctx| {
                ctx.log_error(operation, &err);
                Ok(())
            })
        }));
        if logged.is_err() {
            tracing::warn!(operation, "debug callback panicked while reporting an error");
        }
    }
    to_status_code(err.kind())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn invalid(message: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message(message.to_string())
}

/// # Safety
/// A non-null `ptr` must be valid for `len` reads of `T`.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize, what: &str) -> Result<&'a [T], Error> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(invalid(&format!("{what} is null")));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// `true` for a size-only call. Rejects a null buffer paired with a non-zero capacity.
fn check_destination(data: *mut u8, capacity: usize, size: *mut u8) -> Result<bool, Error> {
    if data.is_null() {
        if capacity != 0 {
            return Err(invalid("buffer is null but capacity is non-zero"));
        }
        if size.is_null() {
            return Err(invalid("size-only call needs a non-null size pointer"));
        }
        return Ok(true);
    }
    Ok(false)
}

fn destination<'a>(
    data: *mut c_void,
    capacity: usize,
    out_size: *mut usize,
) -> Result<Option<&'a mut [u8]>, Error> {
    if check_destination(data.cast(), capacity, out_size.cast())? {
        return Ok(None);
    }
    Ok(Some(unsafe {
        std::slice::from_raw_parts_mut(data.cast::<u8>(), capacity)
    }))
}

/// Writes the byte count on success, and the required count on `BufferTooSmall`.
fn report_size(result: Result<usize, Error>, out_size: *mut usize) -> Result<(), Error> {
    match result {
        Ok(size) => {
            write_out(out_size, size);
            Ok(())
        }
        Err(err) => {
            if err.kind() == ErrorKind::BufferTooSmall {
                if let Some(required) = err.required() {
                    write_out(out_size, required as usize);
                }
            }
            Err(err)
        }
    }
}

fn write_out<T>(ptr: *mut T, value: T) {
    if !ptr.is_null() {
        unsafe {
            *ptr = value;
        }
    }
}
