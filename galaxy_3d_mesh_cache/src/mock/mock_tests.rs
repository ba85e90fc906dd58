use super::*;
use crate::error::Error;
use crate::loader::{LoadOutcome, LoadStatus, ResolvedResource, ResourceKind, ResourceLoader, UnloadTarget};
use crate::registry::{
    GeometryConfig, GeometryRegistry, IndexFormat, MaterialInfo, MaterialRegistry, PipelineRegistry,
};

fn pending_token(outcome: LoadOutcome) -> crate::loader::LoadToken {
    match outcome {
        LoadOutcome::Pending(token) => token,
        other => panic!("expected a pending load, got {:?}", other),
    }
}

// ============================================================================
// Fixture tests
// ============================================================================

#[test]
fn test_box_geometry_counts() {
    let geometry = box_geometry(unit_box());
    assert_eq!(geometry.vertex_count(), 8);
    assert_eq!(geometry.index_count(), 36);
    assert_eq!(geometry.index_format, IndexFormat::U32);
}

#[test]
fn test_merged_payload_layout() {
    let parts = [(unit_box(), Some("stone")), (unit_box(), None)];
    match merged_payload(&parts, IndexFormat::U16) {
        crate::loader::MeshPayload::Merged { buffer, ranges } => {
            assert_eq!(buffer.vertex_count(), 16);
            assert_eq!(buffer.index_count(), 72);
            assert_eq!(buffer.index_data.len(), 144);
            assert_eq!(ranges[1].first_index, 36);
            assert_eq!(ranges[1].vertex_offset, 8);
            assert_eq!(ranges[0].material.as_deref(), Some("stone"));
        }
        other => panic!("expected a merged payload, got {:?}", other),
    }
}

// ============================================================================
// MockLoader tests
// ============================================================================

#[test]
fn test_loader_immediate_and_unknown() {
    let mut loader = MockLoader::new();
    loader.register("a.mesh", subsets_payload(&[unit_box()]), MockLoadMode::Immediate);

    assert!(matches!(
        loader.load(ResourceKind::Mesh, "a.mesh").unwrap(),
        LoadOutcome::Resolved(ResolvedResource::Mesh(_))
    ));
    assert!(matches!(
        loader.load(ResourceKind::Mesh, "b.mesh"),
        Err(Error::ResourceNotLoaded(_))
    ));
    assert!(loader.load(ResourceKind::Texture, "a.mesh").is_err());
    assert_eq!(loader.load_calls("a.mesh"), 2);
    assert_eq!(loader.total_load_calls(), 3);
}

#[test]
fn test_loader_deferred_progression() {
    let mut loader = MockLoader::new();
    loader.register("a.mesh", subsets_payload(&[unit_box()]), MockLoadMode::Deferred { polls: 3 });
    let token = pending_token(loader.load(ResourceKind::Mesh, "a.mesh").unwrap());

    assert_eq!(loader.poll(token), LoadStatus::Queued);
    assert_eq!(loader.poll(token), LoadStatus::GpuPending);
    assert_eq!(loader.poll(token), LoadStatus::Ready);
    assert!(matches!(loader.try_get_resolved(token), Some(ResolvedResource::Mesh(_))));

    loader.unload(UnloadTarget::Token(token));
    assert!(!loader.is_in_flight(token));
    assert!(matches!(loader.poll(token), LoadStatus::Failed(_)));
    assert!(loader.try_get_resolved(token).is_none());
}

#[test]
fn test_loader_failure_modes() {
    let mut loader = MockLoader::new();
    let payload = subsets_payload(&[unit_box()]);
    loader.register("fail.mesh", payload.clone(), MockLoadMode::Fails { after_polls: 2, reason: "eof".into() });
    loader.register("wrong.mesh", payload.clone(), MockLoadMode::WrongType);
    loader.register("stuck.mesh", payload, MockLoadMode::Stuck);

    let fail = pending_token(loader.load(ResourceKind::Mesh, "fail.mesh").unwrap());
    assert_eq!(loader.poll(fail), LoadStatus::CpuPending);
    assert_eq!(loader.poll(fail), LoadStatus::Failed("eof".to_string()));

    let wrong = pending_token(loader.load(ResourceKind::Mesh, "wrong.mesh").unwrap());
    assert_eq!(loader.poll(wrong), LoadStatus::Ready);
    assert!(matches!(
        loader.try_get_resolved(wrong),
        Some(ResolvedResource::Other(ResourceKind::Texture))
    ));

    let stuck = pending_token(loader.load(ResourceKind::Mesh, "stuck.mesh").unwrap());
    assert!(loader.poll(stuck).is_in_flight());
    assert_eq!(loader.in_flight_count(), 3);
}

// ============================================================================
// Registry tests
// ============================================================================

#[test]
fn test_geometry_registry_refcounts() {
    let mut geometries = MockGeometryRegistry::new();
    let config = GeometryConfig { name: "g".to_string(), data: box_geometry(unit_box()) };
    let handle = geometries.create(config.clone()).unwrap();

    assert!(matches!(geometries.create(config), Err(Error::InvalidParameter(_))));
    assert_eq!(geometries.acquire_by_name("g").unwrap(), handle);
    assert_eq!(geometries.ref_count(handle), Some(2));
    assert_eq!(geometries.get(handle).unwrap().index_count, 36);
    assert_eq!(geometries.name(handle), Some("g"));

    geometries.release(handle);
    geometries.release(handle);
    assert_eq!(geometries.live_count(), 0);
    assert!(geometries.acquire_by_name("g").unwrap_err().is_not_loaded());
}

#[test]
fn test_material_registry_refcounts() {
    let mut materials = MockMaterialRegistry::new();
    let info = MaterialInfo { texture_slots: vec![], alpha_cutoff: 0.25 };
    let handle = materials.register("leaf", info.clone()).unwrap();

    assert_eq!(materials.acquire("leaf").unwrap(), handle);
    materials.add_ref(handle).unwrap();
    assert_eq!(materials.ref_count(handle), Some(2));
    assert_eq!(materials.get(handle), Some(info));
    assert!(materials.acquire("bark").unwrap_err().is_not_loaded());

    materials.release(handle);
    materials.release(handle);
    materials.release(handle);
    assert_eq!(materials.total_refs(), 0);
}

#[test]
fn test_pipeline_registry_states() {
    let mut pipelines = MockPipelineRegistry::new();
    let a = pipelines.create_pipeline();
    let b = pipelines.create_pipeline();

    let state = pipelines.acquire_instance_state(a).unwrap();
    assert_eq!(pipelines.live_state_count(), 1);
    pipelines.release_instance_state(b, state);
    assert_eq!(pipelines.mismatched_releases(), 1);
    assert_eq!(pipelines.live_state_count(), 0);

    let unknown = crate::registry::PipelineHandle::from_raw(9, 1);
    assert!(matches!(pipelines.acquire_instance_state(unknown), Err(Error::InvalidHandle(_))));
}

#[test]
fn test_backend_builds_cache() {
    let backend = MockBackend::new();
    let cache = backend.cache(crate::mesh::MeshCacheConfig::default()).unwrap();
    assert_eq!(cache.asset_count(), 0);
    assert_eq!(cache.config().load_arena_pool_size, 8);
}
