//! Base pass orchestration
//!
//! One render call walks a fixed sequence of stages: acquire the color and
//! depth targets, build batches, bind synthesized scene data, register a
//! single raster pass. Any failure before the pass is registered leaves the
//! frame graph without work for the color target.

use crate::backend::types::*;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::batch::{build_mesh_batches, MeshBatch, RequiredFeatures};
use crate::pipeline::processor::MeshPassProcessor;
use crate::pipeline::scene_data::{self, GpuSceneParameters};
use crate::render_graph::*;
use crate::resources::{MaterialProxy, MaterialRef, MeshAsset, RenderTarget};
use crate::scene::{ViewInfo, ViewUniforms};
use crate::{FeatureLevel, RendererConfig};
use glam::Mat4;
use std::sync::{Arc, Weak};

pub const BASE_PASS_NAME: &str = "MeshBasePass";
pub const SCENE_COLOR_NAME: &str = "SceneColor";
pub const SCENE_DEPTH_NAME: &str = "SceneDepth";
pub const VIEW_UNIFORM_NAME: &str = "View";
pub const SCENE_UNIFORM_NAME: &str = "Scene";

/// Snapshot of what to draw, taken when the render was requested
#[derive(Clone)]
pub struct MeshRenderRequest {
    pub mesh: Weak<MeshAsset>,
    pub lod_index: usize,
    pub local_to_world: Mat4,
    /// Indexed by material slot
    pub override_materials: Vec<Option<Weak<dyn MaterialProxy>>>,
}

impl MeshRenderRequest {
    pub fn new(mesh: &Arc<MeshAsset>, lod_index: usize, local_to_world: Mat4) -> Self {
        Self {
            mesh: Arc::downgrade(mesh),
            lod_index,
            local_to_world,
            override_materials: Vec::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: &[Option<MaterialRef>]) -> Self {
        self.override_materials = overrides
            .iter()
            .map(|m| m.as_ref().map(Arc::downgrade))
            .collect();
        self
    }

    /// Live overrides. Released materials become empty slots.
    pub fn resolve_overrides(&self) -> Vec<Option<MaterialRef>> {
        self.override_materials
            .iter()
            .map(|m| m.as_ref().and_then(Weak::upgrade))
            .collect()
    }
}

impl std::fmt::Debug for MeshRenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshRenderRequest")
            .field("mesh_alive", &(self.mesh.strong_count() > 0))
            .field("lod_index", &self.lod_index)
            .field("overrides", &self.override_materials.len())
            .finish()
    }
}

/// Progress of the current render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    TargetsAcquired,
    BatchesBuilt,
    SceneDataBound,
    PassSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTextures {
    pub color: TextureRef,
    pub depth: TextureRef,
}

/// Everything the base pass binds
#[derive(Debug, Clone)]
pub struct BasePassParameters {
    pub view: ViewUniforms,
    pub scene: GpuSceneParameters,
    pub textures: SceneTextures,
    pub viewport: Viewport,
}

impl BasePassParameters {
    pub fn into_pass_parameters(self) -> PassParameters {
        PassParameters {
            uniform_buffers: vec![
                UniformBinding::new(VIEW_UNIFORM_NAME, &self.view),
                UniformBinding::new(SCENE_UNIFORM_NAME, &self.scene.uniform()),
            ],
            shader_resources: self.scene.shader_resources(),
            render_targets: RenderTargetBindings {
                color: vec![ColorTargetBinding {
                    texture: self.textures.color,
                    load: LoadAction::Clear,
                    store: StoreAction::Store,
                }],
                depth_stencil: Some(DepthStencilBinding {
                    texture: self.textures.depth,
                    depth_load: LoadAction::Clear,
                    stencil_load: LoadAction::Load,
                    store: StoreAction::Store,
                    access: ExclusiveDepthStencil::DepthWriteStencilWrite,
                }),
            },
            viewport: Some(self.viewport),
        }
    }
}

/// What one render call registered
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedPass {
    pub pass: PassId,
    pub batch_count: usize,
    pub required_features: RequiredFeatures,
    /// Resolved material of each batch, in batch order
    pub materials: Vec<String>,
    pub local_to_world: Mat4,
}

pub struct BasePassRenderer {
    feature_level: FeatureLevel,
    depth_format: TextureFormat,
    depth_clear: ClearValue,
    max_fallback_depth: usize,
    stage: FrameStage,
}

impl BasePassRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            feature_level: config.feature_level,
            depth_format: config.depth_format,
            depth_clear: config.depth_clear,
            max_fallback_depth: config.max_fallback_depth,
            stage: FrameStage::Idle,
        }
    }

    /// Stage reached by the last render call
    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    fn advance(&mut self, stage: FrameStage) {
        log::trace!("Base pass {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Register the base pass for `request`. The pass body runs when the
    /// builder executes, not here.
    pub fn render(
        &mut self,
        builder: &mut dyn FrameGraphBuilder,
        request: &MeshRenderRequest,
        view: &ViewInfo,
        target: &RenderTarget,
    ) -> RenderResult<SubmittedPass> {
        self.stage = FrameStage::Idle;

        let color = builder.register_external_texture(SCENE_COLOR_NAME, target);
        let (width, height) = builder
            .texture_desc(color)
            .map(|desc| (desc.width, desc.height))
            .unwrap_or((target.width, target.height));
        let depth = builder.create_texture(
            SCENE_DEPTH_NAME,
            TextureDescriptor::depth_2d(width, height, self.depth_format, self.depth_clear),
        );
        self.advance(FrameStage::TargetsAcquired);

        let Some(mesh) = request.mesh.upgrade() else {
            log::warn!("Mesh released before its render ran");
            return Err(RenderError::MeshReleased);
        };

        let overrides = request.resolve_overrides();
        let (batches, required) = build_mesh_batches(
            &mesh,
            request.lod_index,
            &overrides,
            &request.local_to_world,
            self.feature_level,
        )
        .inspect_err(|e| log::warn!("Skipping render: {}", e))?;
        self.advance(FrameStage::BatchesBuilt);

        let scene = scene_data::synthesize(&request.local_to_world, required);
        let gpu_scene = scene_data::upload(builder, &scene);
        self.advance(FrameStage::SceneDataBound);

        let parameters = BasePassParameters {
            view: view.uniforms(width, height),
            scene: gpu_scene,
            textures: SceneTextures { color, depth },
            viewport: Viewport::from_size(width, height),
        };

        let submitted_materials = batches
            .iter()
            .map(|b| b.material.name().to_string())
            .collect();
        let batch_count = batches.len();

        let pass = builder.add_pass(
            BASE_PASS_NAME,
            parameters.into_pass_parameters(),
            PassFlags::RASTER,
            Self::execute_fn(batches, self.feature_level, self.max_fallback_depth),
        );
        self.advance(FrameStage::PassSubmitted);

        log::debug!(
            "Registered {} with {} batches for '{}'",
            BASE_PASS_NAME,
            batch_count,
            mesh.name
        );

        Ok(SubmittedPass {
            pass,
            batch_count,
            required_features: required,
            materials: submitted_materials,
            local_to_world: request.local_to_world,
        })
    }

    fn execute_fn(
        batches: Vec<MeshBatch>,
        feature_level: FeatureLevel,
        max_fallback_depth: usize,
    ) -> PassExecuteFn {
        Box::new(move |draw_list: &mut dyn DrawListContext| {
            for batch in &batches {
                batch
                    .material
                    .update_uniform_expression_cache_if_needed(feature_level);
            }

            let mut processor =
                MeshPassProcessor::new(feature_level, draw_list, max_fallback_depth);
            for batch in &batches {
                if let Err(e) = processor.add_mesh_batch(batch) {
                    log::warn!(
                        "Dropping section {} of LOD {}: {}",
                        batch.section_index,
                        batch.lod_index,
                        e
                    );
                }
            }
        })
    }
}
