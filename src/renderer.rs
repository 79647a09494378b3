//! Caller-facing front end
//!
//! [`MeshRenderer`] keeps the mesh, transform, view and material overrides
//! set by game code. [`MeshRenderer::render`] snapshots that state and hands
//! it to the render thread; it never waits for the frame.

use crate::error::{RenderError, RenderResult};
use crate::pipeline::MeshRenderRequest;
use crate::render_thread::{MeshRenderWork, RenderQueue};
use crate::resources::{MaterialInstance, MaterialRef, MeshAsset, RenderTarget};
use crate::scene::{Transform, ViewInfo};
use glam::Mat4;
use std::sync::Arc;

pub struct MeshRenderer {
    render_target: Arc<RenderTarget>,
    queue: RenderQueue,
    mesh: Option<Arc<MeshAsset>>,
    lod_index: usize,
    local_to_world: Mat4,
    view: ViewInfo,
    override_materials: Vec<Option<MaterialRef>>,
}

impl MeshRenderer {
    /// Bind the front end to a color target and a render thread queue
    pub fn new(render_target: Option<Arc<RenderTarget>>, queue: RenderQueue) -> RenderResult<Self> {
        let Some(render_target) = render_target else {
            log::warn!("MeshRenderer needs a render target");
            return Err(RenderError::InvalidRequest(
                "no render target".to_string(),
            ));
        };

        Ok(Self {
            render_target,
            queue,
            mesh: None,
            lod_index: 0,
            local_to_world: Mat4::IDENTITY,
            view: ViewInfo::default(),
            override_materials: Vec::new(),
        })
    }

    /// Set the mesh to draw. Overrides reset to the mesh's own materials.
    pub fn set_mesh(&mut self, mesh: Option<Arc<MeshAsset>>, lod_index: usize) {
        self.override_materials = mesh
            .as_ref()
            .map(|m| m.materials.clone())
            .unwrap_or_default();
        self.mesh = mesh;
        self.lod_index = lod_index;
    }

    pub fn set_transform(&mut self, transform: &Transform) {
        self.local_to_world = transform.matrix();
    }

    pub fn set_local_to_world(&mut self, local_to_world: Mat4) {
        self.local_to_world = local_to_world;
    }

    pub fn set_view(&mut self, view: ViewInfo) {
        self.view = view;
    }

    /// Override the material of one slot of the current mesh
    pub fn set_override_material(
        &mut self,
        material: Option<MaterialRef>,
        slot: usize,
    ) -> RenderResult<()> {
        let Some(mesh) = &self.mesh else {
            log::warn!("set_override_material: no mesh set");
            return Err(RenderError::InvalidRequest("no mesh set".to_string()));
        };

        if slot >= mesh.material_slot_count() {
            log::warn!(
                "set_override_material: slot {} out of range for '{}' ({} slots)",
                slot,
                mesh.name,
                mesh.material_slot_count()
            );
            return Err(RenderError::InvalidRequest(format!(
                "material slot {} out of range",
                slot
            )));
        }

        let Some(material) = material else {
            log::warn!("set_override_material: no material given for slot {}", slot);
            return Err(RenderError::InvalidRequest("no material".to_string()));
        };

        if self.override_materials.len() <= slot {
            self.override_materials.resize(slot + 1, None);
        }
        self.override_materials[slot] = Some(material);
        Ok(())
    }

    /// Create a dynamic instance of `source` (or of the slot's current
    /// material) and install it as the slot's override
    pub fn create_dynamic_material_instance(
        &mut self,
        source: Option<MaterialRef>,
        slot: usize,
    ) -> RenderResult<Arc<MaterialInstance>> {
        let parent = source.or_else(|| self.override_materials.get(slot).cloned().flatten());
        let Some(parent) = parent else {
            log::warn!("create_dynamic_material_instance: no material for slot {}", slot);
            return Err(RenderError::InvalidRequest(format!(
                "no material to instance for slot {}",
                slot
            )));
        };

        let instance = Arc::new(MaterialInstance::new(parent));
        self.set_override_material(Some(instance.clone() as MaterialRef), slot)?;
        Ok(instance)
    }

    pub fn mesh(&self) -> Option<&Arc<MeshAsset>> {
        self.mesh.as_ref()
    }

    pub fn lod_index(&self) -> usize {
        self.lod_index
    }

    pub fn override_materials(&self) -> &[Option<MaterialRef>] {
        &self.override_materials
    }

    pub fn render_target(&self) -> &Arc<RenderTarget> {
        &self.render_target
    }

    /// Immutable copy of the current state, holding the mesh and materials weakly
    pub fn snapshot(&self) -> RenderResult<MeshRenderWork> {
        let Some(mesh) = &self.mesh else {
            log::warn!("render: no mesh set");
            return Err(RenderError::InvalidRequest("no mesh set".to_string()));
        };

        Ok(MeshRenderWork {
            request: MeshRenderRequest::new(mesh, self.lod_index, self.local_to_world)
                .with_overrides(&self.override_materials),
            view: self.view,
            target: self.render_target.clone(),
        })
    }

    /// Queue a render of the current state. `Ok` means queued, not drawn.
    pub fn render(&self) -> RenderResult<()> {
        let work = self.snapshot()?;
        if !self.queue.enqueue(work) {
            log::error!("render: render thread is not running");
            return Err(RenderError::InvalidRequest(
                "render thread stopped".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MeshRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshRenderer")
            .field("mesh", &self.mesh.as_ref().map(|m| m.name.as_str()))
            .field("lod_index", &self.lod_index)
            .field("overrides", &self.override_materials.len())
            .finish()
    }
}
