// Debug router behaviour through both the Rust API and the C callback surface.
use std::ffi::{CStr, c_char, c_void};
use std::ptr;
use std::sync::{Arc, Mutex};

use meshcut::abi::{
    mc_create_context, mc_debug_message_callback, mc_debug_message_control,
    mc_get_connected_component_data, mc_release_context,
};
use meshcut::api::{
    ContextFlags, DebugMessage, DebugSeverity, DebugSource, DebugType, DispatchFlags, ErrorKind,
    MeshInput, Registry, message_id, to_status_code,
};

const CUBE_VERTICES: [f64; 24] = [
    -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0,
    -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0,
];
const CUBE_FACES: [u32; 36] = [
    0, 3, 2, 0, 1, 3, 1, 7, 3, 1, 5, 7, 5, 6, 7, 5, 4, 6, 4, 2, 6, 4, 0, 2, 2, 7, 6, 2, 3, 7, 4,
    1, 0, 4, 5, 1,
];
const FAR_PLANE: [f64; 12] = [
    5.0, -2.0, -2.0, 5.0, 2.0, -2.0, 5.0, 2.0, 2.0, 5.0, -2.0, 2.0,
];
const PLANE_FACES: [u32; 6] = [0, 1, 2, 0, 2, 3];

type Received = Arc<Mutex<Vec<(DebugSource, DebugType, u32, DebugSeverity, String)>>>;

fn collecting_context(
    registry: &Registry,
    flags: ContextFlags,
) -> (meshcut::api::ContextHandle, Received) {
    let received: Received = Arc::default();
    let sink = Arc::clone(&received);
    let context = registry.create_context(flags).expect("create");
    registry
        .with_context(context, |ctx| {
            ctx.set_debug_callback(Some(Box::new(move |message: &DebugMessage<'_>| {
                sink.lock().expect("lock").push((
                    message.source,
                    message.kind,
                    message.id,
                    message.severity,
                    message.text.to_string(),
                ));
            })));
            Ok(())
        })
        .expect("callback");
    (context, received)
}

fn dispatch_far_plane(registry: &Registry, context: meshcut::api::ContextHandle) {
    registry
        .with_context(context, |ctx| {
            ctx.dispatch(
                DispatchFlags::VERTEX_ARRAY_DOUBLE,
                &MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES),
                &MeshInput::triangles(&FAR_PLANE, &PLANE_FACES),
            )
        })
        .expect("dispatch");
}

#[test]
fn nothing_is_routed_until_filters_are_enabled() {
    let registry = Registry::new();
    let (context, received) = collecting_context(&registry, ContextFlags::DEBUG);
    dispatch_far_plane(&registry, context);
    assert!(received.lock().expect("lock").is_empty());

    registry
        .with_context(context, |ctx| {
            ctx.set_debug_filter(DebugSource::ALL, DebugType::ALL, DebugSeverity::ALL, true);
            Ok(())
        })
        .expect("filter");
    dispatch_far_plane(&registry, context);
    let messages = received.lock().expect("lock").clone();
    assert!(messages.iter().any(|m| m.0 == DebugSource::KERNEL && m.2 == message_id::KERNEL));
    assert!(messages.iter().any(|m| m.2 == message_id::DISPATCH_SUMMARY));
    assert!(messages.iter().all(|m| m.3 == DebugSeverity::NOTIFICATION));
}

#[test]
fn notifications_need_the_debug_flag() {
    let registry = Registry::new();
    let (context, received) = collecting_context(&registry, ContextFlags::empty());
    registry
        .with_context(context, |ctx| {
            ctx.set_debug_filter(DebugSource::ALL, DebugType::ALL, DebugSeverity::ALL, true);
            Ok(())
        })
        .expect("filter");
    dispatch_far_plane(&registry, context);
    assert!(received.lock().expect("lock").is_empty());
}

#[test]
fn disabling_a_filter_drops_matching_events() {
    let registry = Registry::new();
    let (context, received) = collecting_context(&registry, ContextFlags::DEBUG);
    registry
        .with_context(context, |ctx| {
            ctx.set_debug_filter(DebugSource::ALL, DebugType::ALL, DebugSeverity::ALL, true);
            ctx.set_debug_filter(
                DebugSource::KERNEL,
                DebugType::empty(),
                DebugSeverity::empty(),
                false,
            );
            Ok(())
        })
        .expect("filter");
    dispatch_far_plane(&registry, context);
    let messages = received.lock().expect("lock").clone();
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| m.0 == DebugSource::API));
}

struct Collected {
    messages: Mutex<Vec<(u32, u32, String)>>,
}

unsafe extern "C" fn collect(
    _source: u32,
    kind: u32,
    _id: u32,
    severity: u32,
    length: usize,
    message: *const c_char,
    user_data: *mut c_void,
) {
    let collected = unsafe { &*(user_data as *const Collected) };
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
    assert_eq!(text.len(), length);
    collected
        .messages
        .lock()
        .expect("lock")
        .push((kind, severity, text));
}

#[test]
fn abi_errors_reach_the_callback() {
    let collected = Box::new(Collected {
        messages: Mutex::new(Vec::new()),
    });
    let user_data = &*collected as *const Collected as *mut c_void;

    let mut context = 0u64;
    assert_eq!(mc_create_context(0, &mut context), 0);
    assert_eq!(mc_debug_message_callback(context, Some(collect), user_data), 0);
    assert_eq!(
        mc_debug_message_control(
            context,
            DebugSource::ALL.bits(),
            DebugType::ERROR.bits(),
            DebugSeverity::HIGH.bits(),
            1
        ),
        0
    );

    let status =
        mc_get_connected_component_data(context, 9_999_999, 0x4, 0, ptr::null_mut(), &mut 0usize);
    assert_eq!(status, to_status_code(ErrorKind::InvalidHandle));

    {
        let messages = collected.messages.lock().expect("lock");
        assert_eq!(messages.len(), 1);
        let (kind, severity, text) = &messages[0];
        assert_eq!(*kind, DebugType::ERROR.bits());
        assert_eq!(*severity, DebugSeverity::HIGH.bits());
        assert!(text.contains("mc_get_connected_component_data"));
    }

    assert_eq!(mc_debug_message_callback(context, None, ptr::null_mut()), 0);
    assert_eq!(mc_release_context(context), 0);
}

#[test]
fn panicking_callback_leaves_dispatch_intact() {
    let registry = Registry::new();
    let context = registry.create_context(ContextFlags::DEBUG).expect("create");
    let components = registry
        .with_context(context, |ctx| {
            ctx.set_debug_callback(Some(Box::new(|_: &DebugMessage<'_>| {
                panic!("client callback failed");
            })));
            ctx.set_debug_filter(DebugSource::ALL, DebugType::ALL, DebugSeverity::ALL, true);
            ctx.dispatch(
                DispatchFlags::VERTEX_ARRAY_DOUBLE,
                &MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES),
                &MeshInput::triangles(&FAR_PLANE, &PLANE_FACES),
            )?;
            Ok(ctx.num_components())
        })
        .expect("dispatch survives the callback");
    assert_eq!(components, 2);
    registry.release_context(context).expect("release");
}
