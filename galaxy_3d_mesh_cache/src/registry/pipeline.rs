/// Pipeline registry interface (per-instance bind state only).

use crate::error::Result;
use crate::utils::Handle;

/// Tag type for pipeline handles
pub enum PipelineTag {}

/// Pipeline issued by the pipeline registry
pub type PipelineHandle = Handle<PipelineTag>;

/// Opaque per-pipeline descriptor state owned by the pipeline registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindStateHandle(pub u64);

/// Pipeline registry collaborator
pub trait PipelineRegistry: Send {
    /// Create bind state for one submesh of one instance drawn with `pipeline`
    fn acquire_instance_state(&mut self, pipeline: PipelineHandle) -> Result<BindStateHandle>;

    /// Destroy bind state previously returned by `acquire_instance_state`
    fn release_instance_state(&mut self, pipeline: PipelineHandle, state: BindStateHandle);
}
