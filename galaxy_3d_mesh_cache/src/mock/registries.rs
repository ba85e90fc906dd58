/// Mock geometry, material and pipeline registries.
///
/// Each registry keeps exact reference counts so tests can check that the
/// cache gives back everything it takes.

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::{engine_bail, engine_warn};
use crate::registry::{
    BindStateHandle, GeometryConfig, GeometryData, GeometryHandle, GeometryInfo,
    GeometryRegistry, MaterialHandle, MaterialInfo, MaterialRegistry, PipelineHandle,
    PipelineRegistry,
};
use crate::utils::{Handle, SlotTable};

const LOG_SOURCE: &str = "galaxy3d::MockRegistry";

fn retag<A, B>(handle: Handle<A>) -> Handle<B> {
    Handle::from_raw(handle.id(), handle.generation())
}

// ============================================================================
// Mock Geometry Registry
// ============================================================================

struct MockGeometry {
    name: String,
    data: GeometryData,
    refs: u32,
}

/// In-memory geometry registry
pub struct MockGeometryRegistry {
    table: SlotTable<MockGeometry>,
    by_name: FxHashMap<String, GeometryHandle>,
    create_calls: u32,
    fail_creates: bool,
}

impl MockGeometryRegistry {
    pub fn new() -> Self {
        Self {
            table: SlotTable::new("geometry", 4096),
            by_name: FxHashMap::default(),
            create_calls: 0,
            fail_creates: false,
        }
    }

    /// Make every following `create` fail
    pub fn set_fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    /// Number of `create` calls (successful or not)
    pub fn create_calls(&self) -> u32 {
        self.create_calls
    }

    /// Live geometries
    pub fn live_count(&self) -> u32 {
        self.table.len()
    }

    /// Sum of reference counts over live geometries
    pub fn total_refs(&self) -> u32 {
        self.table.iter().map(|(_, geometry)| geometry.refs).sum()
    }

    pub fn ref_count(&self, handle: GeometryHandle) -> Option<u32> {
        self.table.get(retag(handle)).ok().map(|geometry| geometry.refs)
    }

    pub fn data(&self, handle: GeometryHandle) -> Option<&GeometryData> {
        self.table.get(retag(handle)).ok().map(|geometry| &geometry.data)
    }

    pub fn name(&self, handle: GeometryHandle) -> Option<&str> {
        self.table.get(retag(handle)).ok().map(|geometry| geometry.name.as_str())
    }
}

impl Default for MockGeometryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryRegistry for MockGeometryRegistry {
    fn acquire_by_name(&mut self, name: &str) -> Result<GeometryHandle> {
        let Some(&handle) = self.by_name.get(name) else {
            engine_bail!(LOG_SOURCE, ResourceNotLoaded, "Geometry '{}' not found", name);
        };
        self.acquire(handle)?;
        Ok(handle)
    }

    fn create(&mut self, config: GeometryConfig) -> Result<GeometryHandle> {
        self.create_calls += 1;
        if self.fail_creates {
            engine_bail!(LOG_SOURCE, ResourceCreationFailed, "Geometry '{}' creation failed", config.name);
        }
        if self.by_name.contains_key(&config.name) {
            engine_bail!(LOG_SOURCE, InvalidParameter, "Geometry '{}' already exists", config.name);
        }
        let name = config.name.clone();
        let handle = retag(self.table.insert(MockGeometry {
            name: config.name,
            data: config.data,
            refs: 1,
        })?);
        self.by_name.insert(name, handle);
        Ok(handle)
    }

    fn acquire(&mut self, handle: GeometryHandle) -> Result<()> {
        self.table.get_mut(retag(handle))?.refs += 1;
        Ok(())
    }

    fn release(&mut self, handle: GeometryHandle) {
        let Ok(geometry) = self.table.get_mut(retag(handle)) else {
            engine_warn!(LOG_SOURCE, "Release of unknown geometry {:?}", handle);
            return;
        };
        geometry.refs -= 1;
        if geometry.refs == 0 {
            if let Ok(geometry) = self.table.remove(retag(handle)) {
                self.by_name.remove(&geometry.name);
            }
        }
    }

    fn get(&self, handle: GeometryHandle) -> Option<GeometryInfo> {
        let geometry = self.table.get(retag(handle)).ok()?;
        Some(GeometryInfo {
            vertex_count: geometry.data.vertex_count(),
            index_count: geometry.data.index_count(),
            bounds: geometry.data.bounds,
        })
    }
}

// ============================================================================
// Mock Material Registry
// ============================================================================

struct MockMaterial {
    info: MaterialInfo,
    refs: u32,
    failing: bool,
}

/// In-memory material registry; registered materials live for the registry's lifetime
pub struct MockMaterialRegistry {
    table: SlotTable<MockMaterial>,
    by_name: FxHashMap<String, MaterialHandle>,
}

impl MockMaterialRegistry {
    pub fn new() -> Self {
        Self {
            table: SlotTable::new("material", 1024),
            by_name: FxHashMap::default(),
        }
    }

    /// Register a material with no outstanding reference
    pub fn register(&mut self, name: &str, info: MaterialInfo) -> Result<MaterialHandle> {
        let handle = retag(self.table.insert(MockMaterial { info, refs: 0, failing: false })?);
        self.by_name.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Make acquisitions of `name` fail hard
    pub fn set_failing(&mut self, name: &str, failing: bool) {
        if let Some(&handle) = self.by_name.get(name) {
            if let Ok(material) = self.table.get_mut(retag(handle)) {
                material.failing = failing;
            }
        }
    }

    pub fn ref_count(&self, handle: MaterialHandle) -> Option<u32> {
        self.table.get(retag(handle)).ok().map(|material| material.refs)
    }

    /// Sum of reference counts over every material
    pub fn total_refs(&self) -> u32 {
        self.table.iter().map(|(_, material)| material.refs).sum()
    }
}

impl Default for MockMaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialRegistry for MockMaterialRegistry {
    fn acquire(&mut self, name: &str) -> Result<MaterialHandle> {
        let Some(&handle) = self.by_name.get(name) else {
            engine_bail!(LOG_SOURCE, ResourceNotLoaded, "Material '{}' not found", name);
        };
        self.add_ref(handle)?;
        Ok(handle)
    }

    fn add_ref(&mut self, handle: MaterialHandle) -> Result<()> {
        let material = self.table.get_mut(retag(handle))?;
        if material.failing {
            engine_bail!(LOG_SOURCE, ResourceCreationFailed, "Material {:?} is failing", handle);
        }
        material.refs += 1;
        Ok(())
    }

    fn release(&mut self, handle: MaterialHandle) {
        match self.table.get_mut(retag(handle)) {
            Ok(material) if material.refs > 0 => material.refs -= 1,
            _ => engine_warn!(LOG_SOURCE, "Unbalanced release of material {:?}", handle),
        }
    }

    fn get(&self, handle: MaterialHandle) -> Option<MaterialInfo> {
        self.table.get(retag(handle)).ok().map(|material| material.info.clone())
    }
}

// ============================================================================
// Mock Pipeline Registry
// ============================================================================

/// In-memory pipeline registry tracking live bind states
#[derive(Default)]
pub struct MockPipelineRegistry {
    pipelines: u32,
    next_state: u64,
    live_states: FxHashMap<BindStateHandle, PipelineHandle>,
    acquire_calls: u32,
    mismatched_releases: u32,
    fail_acquire: bool,
}

impl MockPipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new pipeline handle
    pub fn create_pipeline(&mut self) -> PipelineHandle {
        self.pipelines += 1;
        PipelineHandle::from_raw(self.pipelines, 1)
    }

    /// Make every following `acquire_instance_state` fail
    pub fn set_fail_acquire(&mut self, fail: bool) {
        self.fail_acquire = fail;
    }

    /// Bind states created and not yet released
    pub fn live_state_count(&self) -> usize {
        self.live_states.len()
    }

    pub fn acquire_calls(&self) -> u32 {
        self.acquire_calls
    }

    /// Releases naming a pipeline other than the one the state was created for
    pub fn mismatched_releases(&self) -> u32 {
        self.mismatched_releases
    }
}

impl PipelineRegistry for MockPipelineRegistry {
    fn acquire_instance_state(&mut self, pipeline: PipelineHandle) -> Result<BindStateHandle> {
        self.acquire_calls += 1;
        if self.fail_acquire {
            engine_bail!(LOG_SOURCE, ResourceCreationFailed, "Bind state creation failed for {:?}", pipeline);
        }
        if !pipeline.is_valid() || pipeline.id() > self.pipelines {
            engine_bail!(LOG_SOURCE, InvalidHandle, "Unknown pipeline {:?}", pipeline);
        }
        self.next_state += 1;
        let state = BindStateHandle(self.next_state);
        self.live_states.insert(state, pipeline);
        Ok(state)
    }

    fn release_instance_state(&mut self, pipeline: PipelineHandle, state: BindStateHandle) {
        match self.live_states.remove(&state) {
            Some(owner) if owner == pipeline => {}
            Some(_) => self.mismatched_releases += 1,
            None => engine_warn!(LOG_SOURCE, "Release of unknown bind state {:?}", state),
        }
    }
}
