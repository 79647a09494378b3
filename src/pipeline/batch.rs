//! Mesh section to draw batch translation

use crate::error::{RenderError, RenderResult};
use crate::render_graph::DrawGeometry;
use crate::resources::{MaterialRef, MeshAsset, VertexLayoutKind};
use crate::FeatureLevel;
use glam::Mat4;

/// One drawable section of the selected LOD
#[derive(Clone)]
pub struct MeshBatch {
    pub geometry: DrawGeometry,
    pub vertex_layout: VertexLayoutKind,
    pub material: MaterialRef,
    pub lod_index: usize,
    pub section_index: usize,
    /// The base pass never feeds shadow depth
    pub cast_shadow: bool,
    pub needs_world_position_offset: bool,
    /// Set when the transform flips winding
    pub reverse_culling: bool,
}

impl std::fmt::Debug for MeshBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshBatch")
            .field("material", &self.material.name())
            .field("lod_index", &self.lod_index)
            .field("section_index", &self.section_index)
            .field("num_primitives", &self.geometry.num_primitives)
            .field("reverse_culling", &self.reverse_culling)
            .finish()
    }
}

/// Features some batch of a request needs from the scene data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequiredFeatures {
    pub world_position_offset: bool,
}

impl RequiredFeatures {
    pub fn merge(&mut self, other: RequiredFeatures) {
        self.world_position_offset |= other.world_position_offset;
    }
}

/// Build one batch per non-empty section of the chosen LOD.
///
/// `overrides` is indexed by material slot; an empty entry falls back to the
/// mesh's own material for that slot. A section whose slot resolves to no
/// material is skipped. Batches come back in section order.
pub fn build_mesh_batches(
    mesh: &MeshAsset,
    lod_index: usize,
    overrides: &[Option<MaterialRef>],
    local_to_world: &Mat4,
    feature_level: FeatureLevel,
) -> RenderResult<(Vec<MeshBatch>, RequiredFeatures)> {
    if mesh.is_compiling() {
        return Err(RenderError::AssetNotReady(mesh.name.clone()));
    }

    let Some(last_lod) = mesh.lod_count().checked_sub(1) else {
        return Err(RenderError::NoRenderableGeometry(mesh.name.clone()));
    };
    let lod_index = lod_index.min(last_lod);
    let lod = &mesh.lods[lod_index];

    let reverse_culling = local_to_world.determinant() < 0.0;
    let mut required = RequiredFeatures::default();
    let mut batches = Vec::with_capacity(lod.sections.len());

    for (section_index, section) in lod.sections.iter().enumerate() {
        if section.num_triangles == 0 {
            continue;
        }

        let material = overrides
            .get(section.material_index)
            .and_then(Option::as_ref)
            .or_else(|| mesh.material(section.material_index));

        let Some(material) = material else {
            log::debug!(
                "Section {} of '{}' has no material for slot {}",
                section_index,
                mesh.name,
                section.material_index
            );
            continue;
        };

        let relevance = material.relevance(feature_level);
        required.merge(RequiredFeatures {
            world_position_offset: relevance.uses_world_position_offset,
        });

        batches.push(MeshBatch {
            geometry: DrawGeometry {
                vertex_buffer: lod.vertex_buffer,
                index_buffer: lod.index_buffer,
                index_format: lod.index_format,
                first_index: section.first_index,
                num_primitives: section.num_triangles,
                min_vertex_index: section.min_vertex_index,
                max_vertex_index: section.max_vertex_index,
            },
            vertex_layout: lod.vertex_layout,
            material: material.clone(),
            lod_index,
            section_index,
            cast_shadow: false,
            needs_world_position_offset: relevance.uses_world_position_offset,
            reverse_culling,
        });
    }

    if batches.is_empty() {
        return Err(RenderError::NoRenderableGeometry(mesh.name.clone()));
    }

    Ok((batches, required))
}
