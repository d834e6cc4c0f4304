// Registry concurrency and lifecycle through the Rust API.
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use meshcut::api::{
    ComponentTypeFilter, ContextFlags, DataSelector, DispatchFlags, ErrorKind,
    MeshInput, Registry,
};

const CUBE_VERTICES: [f64; 24] = [
    -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0,
    -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0,
];
const CUBE_FACES: [u32; 36] = [
    0, 3, 2, 0, 1, 3, 1, 7, 3, 1, 5, 7, 5, 6, 7, 5, 4, 6, 4, 2, 6, 4, 0, 2, 2, 7, 6, 2, 3, 7, 4,
    1, 0, 4, 5, 1,
];
const PLANE_VERTICES: [f64; 12] = [
    0.4, -2.0, -2.0, 0.4, 2.0, -2.0, 0.4, 2.0, 2.0, 0.4, -2.0, 2.0,
];
const PLANE_FACES: [u32; 6] = [0, 1, 2, 0, 2, 3];

fn cut_cube(registry: &Registry, flags: ContextFlags) -> (usize, Vec<u64>) {
    let context = registry.create_context(flags).expect("create");
    let result = registry
        .with_context(context, |ctx| {
            ctx.dispatch(
                DispatchFlags::VERTEX_ARRAY_DOUBLE | DispatchFlags::FILTER_ALL,
                &MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES),
                &MeshInput::triangles(&PLANE_VERTICES, &PLANE_FACES),
            )?;
            let handles = ctx.component_handles(ComponentTypeFilter::ALL);
            let fragments = ctx.component_handles(ComponentTypeFilter::FRAGMENT).len();
            Ok((fragments, handles.iter().map(|h| h.to_raw()).collect()))
        })
        .expect("dispatch");
    registry.release_context(context).expect("release");
    result
}

#[test]
fn concurrent_contexts_are_independent() {
    let registry = Arc::new(Registry::new());
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || cut_cube(&registry, ContextFlags::empty()))
        })
        .collect();

    let mut seen = HashSet::new();
    for worker in workers {
        let (fragments, handles) = worker.join().expect("join");
        assert_eq!(fragments, 4);
        for handle in handles {
            assert!(seen.insert(handle), "component handle {handle} issued twice");
        }
    }
    assert!(registry.is_empty());
}

#[cfg(feature = "multi-threaded")]
#[test]
fn worker_pool_matches_inline_results() {
    let registry = Registry::with_config(
        meshcut::api::ContextConfig::from_json_str(r#"{"worker_threads": 2}"#).expect("config"),
    );
    let inline = cut_cube(&registry, ContextFlags::empty());
    let pooled = cut_cube(&registry, ContextFlags::MULTI_THREADED);
    assert_eq!(inline.0, pooled.0);
    assert_eq!(inline.1.len(), pooled.1.len());

    let context = registry
        .create_context(ContextFlags::MULTI_THREADED)
        .expect("create");
    let threads = registry
        .with_context(context, |ctx| {
            let mut bytes = [0u8; 4];
            ctx.info(meshcut::api::InfoKey::WorkerThreads, Some(&mut bytes))?;
            Ok(u32::from_ne_bytes(bytes))
        })
        .expect("info");
    assert_eq!(threads, 2);
    registry.release_context(context).expect("release");
}

#[test]
fn releasing_a_context_invalidates_its_components() {
    let registry = Registry::new();
    let context = registry.create_context(ContextFlags::empty()).expect("create");
    let fragment = registry
        .with_context(context, |ctx| {
            ctx.dispatch(
                DispatchFlags::VERTEX_ARRAY_DOUBLE,
                &MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES),
                &MeshInput::triangles(&PLANE_VERTICES, &PLANE_FACES),
            )?;
            Ok(ctx.component_handles(ComponentTypeFilter::FRAGMENT)[0])
        })
        .expect("dispatch");
    registry.release_context(context).expect("release");

    let err = registry
        .with_context(context, |ctx| ctx.component_data(fragment, DataSelector::Face, None))
        .expect_err("released");
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
}

#[test]
fn components_do_not_cross_contexts() {
    let registry = Registry::new();
    let a = registry.create_context(ContextFlags::empty()).expect("a");
    let b = registry.create_context(ContextFlags::empty()).expect("b");
    let handle = registry
        .with_context(a, |ctx| {
            ctx.dispatch(
                DispatchFlags::VERTEX_ARRAY_DOUBLE,
                &MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES),
                &MeshInput::triangles(&PLANE_VERTICES, &PLANE_FACES),
            )?;
            Ok(ctx.component_handles(ComponentTypeFilter::ALL)[0])
        })
        .expect("dispatch");
    let err = registry
        .with_context(b, |ctx| ctx.release_components(&[handle]))
        .expect_err("foreign handle");
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    assert_eq!(registry.shutdown(), 2);
}

#[test]
fn shutdown_releases_live_contexts() {
    let registry = Registry::new();
    let live = registry.create_context(ContextFlags::empty()).expect("live");
    let gone = registry.create_context(ContextFlags::empty()).expect("gone");
    registry.release_context(gone).expect("release");

    assert_eq!(registry.shutdown(), 1);
    assert!(registry.is_shut_down());
    let err = registry
        .with_context(live, |ctx| Ok(ctx.num_components()))
        .expect_err("released by shutdown");
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    let err = registry
        .create_context(ContextFlags::empty())
        .expect_err("closed");
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}
