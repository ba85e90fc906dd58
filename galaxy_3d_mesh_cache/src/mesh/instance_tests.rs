use super::*;
use std::collections::HashSet;
use glam::Vec3;
use crate::error::Error;
use crate::mesh::{MeshCacheConfig, PipelineDomain};
use crate::mock::{subsets_payload, unit_box, MockBackend, MockLoadMode};

// ============================================================================
// HELPERS
// ============================================================================

/// Backend serving "cube.mesh" (2 unit-box subsets, synchronous) and
/// "slow.mesh" (same payload, never resolves)
fn backend() -> MockBackend {
    let backend = MockBackend::new();
    {
        let mut loader = backend.loader.lock().unwrap();
        loader.register("cube.mesh", subsets_payload(&[unit_box(), unit_box()]), MockLoadMode::Immediate);
        loader.register("slow.mesh", subsets_payload(&[unit_box(), unit_box()]), MockLoadMode::Stuck);
    }
    backend
}

fn setup(config: MeshCacheConfig) -> (MockBackend, MeshCache, MeshAssetHandle) {
    let backend = backend();
    let mut cache = backend.cache(config).unwrap();
    let asset = cache.acquire_asset("cube.mesh", PipelineDomain::Opaque, "").unwrap();
    (backend, cache, asset)
}

fn unit_radius() -> f32 {
    Vec3::splat(0.5).length()
}

// ============================================================================
// CREATION / DESTRUCTION TESTS
// ============================================================================

#[test]
fn test_create_on_loaded_asset() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 42, true).unwrap();

    let instance = cache.instance(handle).unwrap();
    assert_eq!(instance.handle(), handle);
    assert_eq!(instance.asset(), asset);
    assert_eq!(instance.render_id(), 42);
    assert!(instance.is_visible());
    assert_eq!(instance.state(), LoadingState::Loaded);
    assert_eq!(instance.submesh_states().len(), 2);
    assert!(instance.world_sphere().is_some());
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 2);
}

#[test]
fn test_create_on_pending_asset() {
    let (_backend, mut cache, _) = setup(MeshCacheConfig::default());
    let slow = cache.acquire_asset("slow.mesh", PipelineDomain::Opaque, "").unwrap();
    let handle = cache.create_instance(slow, Mat4::IDENTITY, 0, true).unwrap();

    let instance = cache.instance(handle).unwrap();
    assert_eq!(instance.state(), LoadingState::Pending);
    assert!(instance.submesh_states().is_empty());
    assert_eq!(cache.stats().instances_pending, 1);
}

#[test]
fn test_create_with_stale_asset_fails() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    cache.release_asset(asset).unwrap();
    let err = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap_err();
    assert!(matches!(err, Error::InvalidHandle(_)));
    assert_eq!(cache.instance_count(), 0);
}

#[test]
fn test_non_finite_model_is_rejected() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let mut model = Mat4::IDENTITY;
    model.w_axis.x = f32::NAN;

    let err = cache.create_instance(asset, model, 0, true).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
    assert_eq!(cache.instance_count(), 0);
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 1);
}

#[test]
fn test_instance_table_capacity() {
    let config = MeshCacheConfig { max_instances: 2, ..Default::default() };
    let (_backend, mut cache, asset) = setup(config);
    cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    cache.create_instance(asset, Mat4::IDENTITY, 1, true).unwrap();

    let err = cache.create_instance(asset, Mat4::IDENTITY, 2, true).unwrap_err();
    assert!(matches!(err, Error::OutOfCapacity(_)));
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 3);
}

#[test]
fn test_destroy_last_owner_tears_down_asset() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    cache.release_asset(asset).unwrap();
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 1);

    cache.destroy_instance(handle).unwrap();
    assert_eq!(cache.asset_count(), 0);
    assert_eq!(cache.instance_count(), 0);
    assert_eq!(backend.geometries.lock().unwrap().live_count(), 0);
}

#[test]
fn test_extra_release_cannot_take_instance_reference() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    assert_eq!(cache.asset(asset).unwrap().instance_refs(), 1);

    cache.release_asset(asset).unwrap();
    let err = cache.release_asset(asset).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));

    // The instance keeps its asset and geometry alive
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 1);
    assert_eq!(cache.asset_state(asset).unwrap(), LoadingState::Loaded);
    assert_eq!(cache.visible_ready_instances().count(), 1);
    assert!(backend.geometries.lock().unwrap().live_count() > 0);

    cache.destroy_instance(handle).unwrap();
    assert_eq!(cache.asset_count(), 0);
    assert_eq!(backend.geometries.lock().unwrap().live_count(), 0);
}

#[test]
fn test_destroy_twice_fails() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    cache.destroy_instance(handle).unwrap();
    assert!(matches!(cache.destroy_instance(handle), Err(Error::InvalidHandle(_))));
    assert_eq!(cache.asset_ref_count(asset).unwrap(), 1);
}

#[test]
fn test_stale_instance_handle_after_reuse() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let old = cache.create_instance(asset, Mat4::IDENTITY, 1, true).unwrap();
    cache.destroy_instance(old).unwrap();
    let new = cache.create_instance(asset, Mat4::IDENTITY, 2, true).unwrap();

    assert_eq!(old.id(), new.id());
    assert!(matches!(cache.instance(old), Err(Error::InvalidHandle(_))));
    assert!(matches!(cache.set_instance_visible(old, false), Err(Error::InvalidHandle(_))));
    assert_eq!(cache.instance(new).unwrap().render_id(), 2);
}

#[test]
fn test_dense_iteration_after_interleaving() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let mut live: Vec<MeshInstanceHandle> = Vec::new();
    for round in 0..6u32 {
        for i in 0..5u32 {
            live.push(cache.create_instance(asset, Mat4::IDENTITY, round * 10 + i, true).unwrap());
        }
        // Destroy every third live instance
        let doomed: Vec<_> = live.iter().copied().step_by(3).collect();
        for handle in &doomed {
            cache.destroy_instance(*handle).unwrap();
        }
        live.retain(|h| !doomed.contains(h));
    }

    let handles = cache.live_instance_handles();
    let unique: HashSet<_> = handles.iter().copied().collect();
    let expected: HashSet<_> = live.iter().copied().collect();
    assert_eq!(handles.len(), unique.len());
    assert_eq!(unique, expected);
    assert_eq!(cache.instance_count() as usize, live.len());
    assert_eq!(cache.instances().count(), live.len());
    assert_eq!(cache.asset_ref_count(asset).unwrap() as usize, live.len() + 1);
}

// ============================================================================
// BOUNDS TESTS
// ============================================================================

#[test]
fn test_translation_moves_center_only() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let t = Vec3::new(1.0, 2.0, 3.0);
    let handle = cache.create_instance(asset, Mat4::from_translation(t), 0, true).unwrap();

    let sphere = *cache.instance(handle).unwrap().world_sphere().unwrap();
    assert!((sphere.center - t).length() < 1e-5);
    assert!((sphere.radius - unit_radius()).abs() < 1e-5);
}

#[test]
fn test_uniform_scale_scales_radius() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::from_scale(Vec3::splat(3.0)), 0, true).unwrap();

    let sphere = *cache.instance(handle).unwrap().world_sphere().unwrap();
    assert!((sphere.radius - unit_radius() * 3.0).abs() < 1e-5);
}

#[test]
fn test_set_transform_recomputes_bounds() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();

    let model = Mat4::from_scale_rotation_translation(
        Vec3::new(1.0, 4.0, 2.0),
        glam::Quat::IDENTITY,
        Vec3::new(0.0, -5.0, 0.0),
    );
    cache.set_instance_transform(handle, model).unwrap();

    let instance = cache.instance(handle).unwrap();
    assert_eq!(*instance.model(), model);
    let sphere = instance.world_sphere().unwrap();
    assert!((sphere.center - Vec3::new(0.0, -5.0, 0.0)).length() < 1e-5);
    assert!((sphere.radius - unit_radius() * 4.0).abs() < 1e-5);
}

#[test]
fn test_set_transform_on_pending_keeps_bounds_empty() {
    let (_backend, mut cache, _) = setup(MeshCacheConfig::default());
    let slow = cache.acquire_asset("slow.mesh", PipelineDomain::Opaque, "").unwrap();
    let handle = cache.create_instance(slow, Mat4::IDENTITY, 0, true).unwrap();

    cache.set_instance_transform(handle, Mat4::from_translation(Vec3::X)).unwrap();
    assert!(cache.instance(handle).unwrap().world_sphere().is_none());

    let mut bad = Mat4::IDENTITY;
    bad.x_axis.y = f32::INFINITY;
    assert!(matches!(cache.set_instance_transform(handle, bad), Err(Error::InvalidParameter(_))));
}

// ============================================================================
// VISIBILITY / RENDER ID TESTS
// ============================================================================

#[test]
fn test_visible_ready_instances() {
    let (_backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let slow = cache.acquire_asset("slow.mesh", PipelineDomain::Opaque, "").unwrap();

    let shown = cache.create_instance(asset, Mat4::IDENTITY, 1, true).unwrap();
    let hidden = cache.create_instance(asset, Mat4::IDENTITY, 2, true).unwrap();
    cache.create_instance(slow, Mat4::IDENTITY, 3, true).unwrap();

    cache.set_instance_visible(hidden, false).unwrap();
    cache.set_instance_render_id(shown, 99).unwrap();

    let ready: Vec<u32> = cache.visible_ready_instances().map(|i| i.render_id()).collect();
    assert_eq!(ready, vec![99]);
    assert!(!cache.instance(hidden).unwrap().is_visible());
}

// ============================================================================
// PIPELINE BIND STATE TESTS
// ============================================================================

#[test]
fn test_refresh_pipeline_caches_bind_state() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let pipeline = backend.pipelines.lock().unwrap().create_pipeline();
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();

    assert!(cache.refresh_pipeline(handle, 0, pipeline).unwrap());
    assert!(!cache.refresh_pipeline(handle, 0, pipeline).unwrap());
    assert!(!cache.refresh_pipeline(handle, 0, pipeline).unwrap());

    let state = cache.instance(handle).unwrap().submesh_states()[0];
    assert_eq!(state.pipeline(), pipeline);
    assert!(state.bind_state().is_some());
    assert!(!state.is_dirty());

    let pipelines = backend.pipelines.lock().unwrap();
    assert_eq!(pipelines.acquire_calls(), 1);
    assert_eq!(pipelines.live_state_count(), 1);
}

#[test]
fn test_refresh_pipeline_switch_releases_old_state() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let (first, second) = {
        let mut pipelines = backend.pipelines.lock().unwrap();
        (pipelines.create_pipeline(), pipelines.create_pipeline())
    };
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();

    cache.refresh_pipeline(handle, 1, first).unwrap();
    assert!(cache.refresh_pipeline(handle, 1, second).unwrap());

    assert_eq!(cache.instance(handle).unwrap().submesh_states()[1].pipeline(), second);
    let pipelines = backend.pipelines.lock().unwrap();
    assert_eq!(pipelines.live_state_count(), 1);
    assert_eq!(pipelines.mismatched_releases(), 0);
}

#[test]
fn test_failed_acquire_keeps_previous_binding() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let (first, second) = {
        let mut pipelines = backend.pipelines.lock().unwrap();
        (pipelines.create_pipeline(), pipelines.create_pipeline())
    };
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    cache.refresh_pipeline(handle, 0, first).unwrap();

    backend.pipelines.lock().unwrap().set_fail_acquire(true);
    assert!(cache.refresh_pipeline(handle, 0, second).is_err());

    let state = cache.instance(handle).unwrap().submesh_states()[0];
    assert_eq!(state.pipeline(), first);
    assert!(state.bind_state().is_some());
    assert_eq!(backend.pipelines.lock().unwrap().live_state_count(), 1);
}

#[test]
fn test_refresh_pipeline_argument_errors() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let pipeline = backend.pipelines.lock().unwrap().create_pipeline();
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();

    assert!(matches!(
        cache.refresh_pipeline(handle, 0, PipelineHandle::INVALID),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        cache.refresh_pipeline(handle, 2, pipeline),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        cache.refresh_pipeline(MeshInstanceHandle::INVALID, 0, pipeline),
        Err(Error::InvalidHandle(_))
    ));

    let slow = cache.acquire_asset("slow.mesh", PipelineDomain::Opaque, "").unwrap();
    let pending = cache.create_instance(slow, Mat4::IDENTITY, 0, true).unwrap();
    assert!(matches!(
        cache.refresh_pipeline(pending, 0, pipeline),
        Err(Error::ResourceNotLoaded(_))
    ));
    assert_eq!(backend.pipelines.lock().unwrap().acquire_calls(), 0);
}

#[test]
fn test_invalidate_pipeline_forces_rebind() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let (first, second) = {
        let mut pipelines = backend.pipelines.lock().unwrap();
        (pipelines.create_pipeline(), pipelines.create_pipeline())
    };
    let a = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    let b = cache.create_instance(asset, Mat4::IDENTITY, 1, true).unwrap();
    cache.refresh_pipeline(a, 0, first).unwrap();
    cache.refresh_pipeline(a, 1, first).unwrap();
    cache.refresh_pipeline(b, 0, second).unwrap();

    assert_eq!(cache.invalidate_pipeline(first), 2);
    assert!(cache.instance(a).unwrap().submesh_states()[0].is_dirty());
    assert!(!cache.instance(b).unwrap().submesh_states()[0].is_dirty());

    assert!(cache.refresh_pipeline(a, 0, first).unwrap());
    assert!(!cache.refresh_pipeline(b, 0, second).unwrap());
    assert_eq!(backend.pipelines.lock().unwrap().live_state_count(), 3);
}

#[test]
fn test_destroy_releases_bind_states() {
    let (backend, mut cache, asset) = setup(MeshCacheConfig::default());
    let pipeline = backend.pipelines.lock().unwrap().create_pipeline();
    let handle = cache.create_instance(asset, Mat4::IDENTITY, 0, true).unwrap();
    cache.refresh_pipeline(handle, 0, pipeline).unwrap();
    cache.refresh_pipeline(handle, 1, pipeline).unwrap();
    assert_eq!(cache.bound_state_count(), 2);
    assert_eq!(cache.stats().bound_states, 2);

    cache.destroy_instance(handle).unwrap();
    assert_eq!(backend.pipelines.lock().unwrap().live_state_count(), 0);
    assert_eq!(cache.bound_state_count(), 0);
}
