/// Payload builders for tests and tools.
///
/// Geometry is a plain position-only box: 8 corners, 12 triangles.

use std::sync::Arc;
use glam::Vec3;
use crate::loader::{MeshPayload, MeshSubset, SubmeshRange};
use crate::mesh::{BoundingBox, PipelineDomain};
use crate::registry::{GeometryData, IndexFormat};

/// Triangle list of a box over its 8 corners
const BOX_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // -z
    4, 6, 5, 6, 4, 7, // +z
    0, 4, 5, 5, 1, 0, // -y
    3, 2, 6, 6, 7, 3, // +y
    0, 3, 7, 7, 4, 0, // -x
    1, 5, 6, 6, 2, 1, // +x
];

const BOX_VERTEX_STRIDE: u32 = 12;

fn box_corners(bounds: &BoundingBox) -> [Vec3; 8] {
    let (a, b) = (bounds.min, bounds.max);
    [
        Vec3::new(a.x, a.y, a.z),
        Vec3::new(b.x, a.y, a.z),
        Vec3::new(b.x, b.y, a.z),
        Vec3::new(a.x, b.y, a.z),
        Vec3::new(a.x, a.y, b.z),
        Vec3::new(b.x, a.y, b.z),
        Vec3::new(b.x, b.y, b.z),
        Vec3::new(a.x, b.y, b.z),
    ]
}

fn index_bytes(indices: &[u32], format: IndexFormat) -> Arc<[u8]> {
    match format {
        IndexFormat::U32 => Arc::from(bytemuck::cast_slice::<u32, u8>(indices)),
        IndexFormat::U16 => {
            let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            Arc::from(bytemuck::cast_slice::<u16, u8>(&narrow))
        }
    }
}

/// Standalone box geometry with 32-bit indices
pub fn box_geometry(bounds: BoundingBox) -> GeometryData {
    let corners = box_corners(&bounds);
    GeometryData {
        vertex_data: Arc::from(bytemuck::cast_slice::<Vec3, u8>(&corners)),
        vertex_stride: BOX_VERTEX_STRIDE,
        index_data: index_bytes(&BOX_INDICES, IndexFormat::U32),
        index_format: IndexFormat::U32,
        bounds,
    }
}

/// One standalone subset per box, without materials
pub fn subsets_payload(boxes: &[BoundingBox]) -> MeshPayload {
    MeshPayload::Subsets(
        boxes
            .iter()
            .map(|&bounds| MeshSubset {
                geometry: box_geometry(bounds),
                material: None,
                shader_override: String::new(),
                domain: PipelineDomain::Opaque,
            })
            .collect(),
    )
}

/// A merged buffer holding one box per part, each part an index range with
/// an optional material name. Range `i` uses base vertex `8 * i`.
pub fn merged_payload(parts: &[(BoundingBox, Option<&str>)], format: IndexFormat) -> MeshPayload {
    let mut vertices: Vec<Vec3> = Vec::with_capacity(parts.len() * 8);
    let mut indices: Vec<u32> = Vec::with_capacity(parts.len() * BOX_INDICES.len());
    let mut bounds = BoundingBox::EMPTY;
    let mut ranges = Vec::with_capacity(parts.len());

    for (part, (part_bounds, material)) in parts.iter().enumerate() {
        ranges.push(SubmeshRange {
            first_index: indices.len() as u32,
            index_count: BOX_INDICES.len() as u32,
            vertex_offset: (part * 8) as i32,
            material: material.map(str::to_string),
            shader_override: String::new(),
            domain: PipelineDomain::Opaque,
            bounds: *part_bounds,
        });
        vertices.extend_from_slice(&box_corners(part_bounds));
        indices.extend_from_slice(&BOX_INDICES);
        bounds = bounds.union(part_bounds);
    }

    MeshPayload::Merged {
        buffer: GeometryData {
            vertex_data: Arc::from(bytemuck::cast_slice::<Vec3, u8>(&vertices)),
            vertex_stride: BOX_VERTEX_STRIDE,
            index_data: index_bytes(&indices, format),
            index_format: format,
            bounds,
        },
        ranges,
    }
}

/// Unit box centered on the origin
pub fn unit_box() -> BoundingBox {
    BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5))
}
