//! Mesh pass processor
//!
//! Turns a [`MeshBatch`] into a [`MeshDrawCommand`]. The batch's material is
//! tried first; whenever it can't serve the base pass the processor walks to
//! the material's fallback, until a shader pair resolves or no material is
//! left. The walk also stops on a material it already visited and after a
//! configured number of steps.

use crate::backend::types::*;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::batch::MeshBatch;
use crate::pipeline::shaders::{BasePassShaders, PermutationParameters};
use crate::render_graph::{DrawListContext, MeshDrawCommand, MeshDrawSortKey};
use crate::resources::{MaterialProperties, MaterialProxy, MaterialRef, MaterialResource};
use crate::FeatureLevel;
use std::sync::Arc;

/// Fixed-function state shared by every draw of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDrawRenderState {
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub depth_stencil_access: ExclusiveDepthStencil,
}

impl Default for PassDrawRenderState {
    fn default() -> Self {
        Self {
            blend: BlendState::opaque(),
            depth_stencil: DepthStencilState::default(),
            depth_stencil_access: ExclusiveDepthStencil::DepthWriteStencilWrite,
        }
    }
}

/// Per-batch raster overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshDrawingOverrideSettings {
    pub reverse_culling: bool,
    pub force_two_sided: bool,
    pub force_wireframe: bool,
}

impl MeshDrawingOverrideSettings {
    pub fn from_batch(batch: &MeshBatch) -> Self {
        Self {
            reverse_culling: batch.reverse_culling,
            ..Default::default()
        }
    }
}

pub fn compute_mesh_fill_mode(
    properties: &MaterialProperties,
    overrides: &MeshDrawingOverrideSettings,
) -> FillMode {
    if properties.wireframe || overrides.force_wireframe {
        FillMode::Wireframe
    } else {
        FillMode::Solid
    }
}

pub fn compute_mesh_cull_mode(
    properties: &MaterialProperties,
    overrides: &MeshDrawingOverrideSettings,
) -> CullMode {
    if properties.two_sided || overrides.force_two_sided {
        CullMode::None
    } else if overrides.reverse_culling {
        CullMode::Front
    } else {
        CullMode::Back
    }
}

pub struct MeshPassProcessor<'a> {
    feature_level: FeatureLevel,
    pass_state: PassDrawRenderState,
    max_fallback_depth: usize,
    draw_list: &'a mut dyn DrawListContext,
}

impl<'a> MeshPassProcessor<'a> {
    pub fn new(
        feature_level: FeatureLevel,
        draw_list: &'a mut dyn DrawListContext,
        max_fallback_depth: usize,
    ) -> Self {
        Self {
            feature_level,
            pass_state: PassDrawRenderState::default(),
            max_fallback_depth: max_fallback_depth.max(1),
            draw_list,
        }
    }

    pub fn pass_state(&self) -> &PassDrawRenderState {
        &self.pass_state
    }

    /// Emit one draw for the batch. Fails with `ShaderResolutionFailure`
    /// when no material in the fallback chain could draw it; the batch is
    /// then recorded as dropped.
    pub fn add_mesh_batch(&mut self, batch: &MeshBatch) -> RenderResult<()> {
        let mut current: Option<MaterialRef> = Some(batch.material.clone());
        let mut visited: Vec<*const ()> = Vec::new();

        while let Some(proxy) = current {
            let identity = Arc::as_ptr(&proxy) as *const ();
            if visited.contains(&identity) {
                log::warn!(
                    "Fallback chain of '{}' loops back to '{}'",
                    batch.material.name(),
                    proxy.name()
                );
                break;
            }
            if visited.len() >= self.max_fallback_depth {
                log::warn!(
                    "Fallback chain of '{}' exceeds {} materials",
                    batch.material.name(),
                    self.max_fallback_depth
                );
                break;
            }
            if !visited.is_empty() {
                proxy.update_uniform_expression_cache_if_needed(self.feature_level);
            }
            visited.push(identity);

            if let Some(material) = proxy.material_no_fallback(self.feature_level) {
                if self.try_add_mesh_batch(batch, proxy.as_ref(), material) {
                    return Ok(());
                }
            }

            current = proxy.fallback(self.feature_level);
        }

        self.draw_list.note_dropped_batch(batch.material.name());
        Err(RenderError::ShaderResolutionFailure(
            batch.material.name().to_string(),
        ))
    }

    /// Try a single material without walking its fallback
    pub fn try_add_mesh_batch(
        &mut self,
        batch: &MeshBatch,
        proxy: &dyn MaterialProxy,
        material: &dyn MaterialResource,
    ) -> bool {
        let properties = material.properties();
        let permutation = PermutationParameters {
            properties,
            vertex_layout: batch.vertex_layout,
        };
        if !BasePassShaders::should_compile_permutation(&permutation) {
            return false;
        }

        let request =
            BasePassShaders::request(properties.world_position_offset, batch.vertex_layout);
        let Some(shaders) = material.try_get_shaders(&request) else {
            return false;
        };

        let overrides = MeshDrawingOverrideSettings::from_batch(batch);
        let pipeline_state = GraphicsPipelineState {
            vertex_shader: shaders.vertex.id,
            pixel_shader: shaders.pixel.id,
            topology: PrimitiveTopology::TriangleList,
            blend: self.pass_state.blend,
            depth_stencil: self.pass_state.depth_stencil,
            depth_stencil_access: self.pass_state.depth_stencil_access,
            fill_mode: compute_mesh_fill_mode(&properties, &overrides),
            cull_mode: compute_mesh_cull_mode(&properties, &overrides),
        };

        let material_uniforms = proxy
            .uniform_expressions()
            .map(|data| bytemuck::bytes_of(&data).to_vec())
            .unwrap_or_default();

        self.draw_list.add_command(MeshDrawCommand {
            label: material.name().to_string(),
            pipeline_state,
            sort_key: MeshDrawSortKey::from_shaders(&shaders),
            geometry: batch.geometry,
            material_uniforms,
            lod_index: batch.lod_index as u32,
            section_index: batch.section_index as u32,
        });
        true
    }
}
