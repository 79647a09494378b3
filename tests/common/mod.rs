//! Common utilities for integration tests.
//!
//! A recording backend that logs every call instead of talking to a GPU, plus
//! helpers building meshes, materials and targets.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use offscreen_mesh_renderer::backend::*;
use offscreen_mesh_renderer::resources::{
    MaterialProperties, MaterialRef, MeshAsset, MeshLod, MeshSection, PermutationKeys,
    RenderTarget, ShaderMap, ShaderPair, ShaderRef, SurfaceMaterial, VertexLayoutKind,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Recording Backend
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CreateTexture {
        handle: u64,
        label: Option<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    CreateTextureView {
        texture: u64,
        view: u64,
    },
    CreateBuffer {
        handle: u64,
        label: Option<String>,
        stride: u32,
        data: Vec<u8>,
    },
    BeginRenderPass(RenderPassDescriptor),
    EndRenderPass,
    SetViewport(Viewport),
    BindUniform {
        name: String,
        size: usize,
    },
    BindShaderResource {
        name: String,
        buffer: u64,
    },
    SetGraphicsState(GraphicsPipelineState),
    SetVertexBuffer {
        slot: u32,
        buffer: u64,
    },
    SetIndexBuffer {
        buffer: u64,
        format: IndexFormat,
    },
    DrawIndexed {
        indices: Range<u32>,
        instances: Range<u32>,
    },
    Submit,
    DestroyBuffer(u64),
    DestroyTexture(u64),
}

/// Backend that records calls. Clones share the same log.
#[derive(Clone)]
pub struct RecordingBackend {
    events: Arc<Mutex<Vec<BackendEvent>>>,
    next_handle: Arc<Mutex<u64>>,
    fail_textures: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            next_handle: Arc::new(Mutex::new(1000)),
            fail_textures: false,
        }
    }

    /// Backend whose texture creation always fails
    pub fn failing_textures() -> Self {
        Self {
            fail_textures: true,
            ..Self::new()
        }
    }

    fn push(&self, event: BackendEvent) {
        self.events.lock().push(event);
    }

    fn allocate(&self) -> u64 {
        let mut next = self.next_handle.lock();
        *next += 1;
        *next
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn draws(&self) -> Vec<Range<u32>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::DrawIndexed { indices, .. } => Some(indices),
                _ => None,
            })
            .collect()
    }

    pub fn render_passes(&self) -> Vec<RenderPassDescriptor> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::BeginRenderPass(desc) => Some(desc),
                _ => None,
            })
            .collect()
    }

    pub fn graphics_states(&self) -> Vec<GraphicsPipelineState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::SetGraphicsState(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn created_buffers(&self) -> Vec<(u64, Option<String>, u32, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::CreateBuffer {
                    handle,
                    label,
                    stride,
                    data,
                } => Some((handle, label, stride, data)),
                _ => None,
            })
            .collect()
    }

    /// True when some render pass bound `view` as a color attachment
    pub fn wrote_to_view(&self, view: TextureViewHandle) -> bool {
        self.render_passes()
            .iter()
            .any(|pass| pass.color_attachments.iter().any(|c| c.view == view))
    }

    pub fn position(&self, predicate: impl Fn(&BackendEvent) -> bool) -> Option<usize> {
        self.events().iter().position(predicate)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if self.fail_textures {
            return Err(BackendError::TextureCreationFailed("injected".to_string()));
        }
        let handle = self.allocate();
        self.push(BackendEvent::CreateTexture {
            handle,
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        Ok(TextureHandle::from_raw(handle))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        let view = self.allocate();
        self.push(BackendEvent::CreateTextureView {
            texture: texture.raw(),
            view,
        });
        Ok(TextureViewHandle::from_raw(view))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let handle = self.allocate();
        self.push(BackendEvent::CreateBuffer {
            handle,
            label: desc.label.clone(),
            stride: desc.stride,
            data: data.to_vec(),
        });
        Ok(BufferHandle::from_raw(handle))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.push(BackendEvent::BeginRenderPass(desc.clone()));
    }

    fn end_render_pass(&mut self) {
        self.push(BackendEvent::EndRenderPass);
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.push(BackendEvent::SetViewport(*viewport));
    }

    fn bind_uniform_buffer(&mut self, name: &str, data: &[u8]) {
        self.push(BackendEvent::BindUniform {
            name: name.to_string(),
            size: data.len(),
        });
    }

    fn bind_shader_resource(&mut self, name: &str, buffer: BufferHandle) {
        self.push(BackendEvent::BindShaderResource {
            name: name.to_string(),
            buffer: buffer.raw(),
        });
    }

    fn set_graphics_state(&mut self, state: &GraphicsPipelineState) {
        self.push(BackendEvent::SetGraphicsState(*state));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        self.push(BackendEvent::SetVertexBuffer {
            slot,
            buffer: buffer.raw(),
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, format: IndexFormat) {
        self.push(BackendEvent::SetIndexBuffer {
            buffer: buffer.raw(),
            format,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, instances: Range<u32>) {
        self.push(BackendEvent::DrawIndexed { indices, instances });
    }

    fn submit(&mut self) {
        self.push(BackendEvent::Submit);
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.push(BackendEvent::DestroyBuffer(buffer.raw()));
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.push(BackendEvent::DestroyTexture(texture.raw()));
    }
}

// ============================================================================
// Materials
// ============================================================================

pub fn shaders(vs: u64, ps: u64) -> ShaderPair {
    ShaderPair {
        vertex: ShaderRef::new(vs),
        pixel: ShaderRef::new(ps),
    }
}

/// Shader map with the base pass permutations for the local layout
pub fn base_pass_shader_map(pair: ShaderPair) -> ShaderMap {
    let mut map = ShaderMap::new();
    for world_position_offset in [false, true] {
        map.insert(
            PermutationKeys {
                world_position_offset,
                gpu_scene: true,
                instance_culling: false,
            },
            VertexLayoutKind::Local,
            pair,
        );
    }
    map
}

/// Opaque surface material compiled for the base pass
pub fn compiled_material(name: &str, vs: u64, ps: u64) -> Arc<SurfaceMaterial> {
    Arc::new(SurfaceMaterial::new(name).with_shader_map(base_pass_shader_map(shaders(vs, ps))))
}

/// Material with world position offset enabled
pub fn wpo_material(name: &str, vs: u64, ps: u64) -> Arc<SurfaceMaterial> {
    Arc::new(
        SurfaceMaterial::new(name)
            .with_properties(MaterialProperties {
                world_position_offset: true,
                ..Default::default()
            })
            .with_shader_map(base_pass_shader_map(shaders(vs, ps))),
    )
}

/// Material with no compiled shaders and no fallback
pub fn broken_material(name: &str) -> Arc<SurfaceMaterial> {
    Arc::new(SurfaceMaterial::new(name))
}

pub fn material_ref(material: &Arc<SurfaceMaterial>) -> MaterialRef {
    material.clone()
}

// ============================================================================
// Meshes and Targets
// ============================================================================

pub const VERTEX_BUFFER: u64 = 1;
pub const INDEX_BUFFER: u64 = 2;

/// LOD with one section per `(material slot, triangle count)`, packed back to back
pub fn lod(sections: &[(usize, u32)]) -> MeshLod {
    let mut lod = MeshLod::new(
        BufferHandle::from_raw(VERTEX_BUFFER),
        BufferHandle::from_raw(INDEX_BUFFER),
    );
    let mut first_index = 0;
    for &(slot, triangles) in sections {
        let section = MeshSection::new(slot, first_index, triangles).with_vertex_range(0, 255);
        lod = lod.with_section(section);
        first_index += triangles * 3;
    }
    lod
}

pub fn mesh(
    name: &str,
    sections: &[(usize, u32)],
    materials: &[Option<MaterialRef>],
) -> Arc<MeshAsset> {
    let mut mesh = MeshAsset::new(name).with_lod(lod(sections));
    for material in materials {
        mesh = mesh.with_material(material.clone());
    }
    Arc::new(mesh)
}

pub const TARGET_TEXTURE: u64 = 900;
pub const TARGET_VIEW: u64 = 901;

pub fn target(width: u32, height: u32) -> Arc<RenderTarget> {
    Arc::new(RenderTarget::new(
        TextureHandle::from_raw(TARGET_TEXTURE),
        TextureViewHandle::from_raw(TARGET_VIEW),
        width,
        height,
    ))
}
