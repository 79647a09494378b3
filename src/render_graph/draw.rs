//! Draw commands collected while a pass executes

use crate::backend::traits::BufferHandle;
use crate::backend::types::{GraphicsPipelineState, IndexFormat};
use crate::resources::shader::ShaderPair;

/// Submission order key. Groups draws sharing a vertex shader, then a pixel shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MeshDrawSortKey(u64);

impl MeshDrawSortKey {
    pub fn from_shaders(shaders: &ShaderPair) -> Self {
        let vs = shaders.vertex.id;
        let ps = shaders.pixel.id;
        let vs_hash = (vs ^ (vs >> 16) ^ (vs >> 32) ^ (vs >> 48)) & 0xFFFF;
        let ps_hash = (ps ^ (ps >> 32)) & 0xFFFF_FFFF;
        Self((vs_hash << 32) | ps_hash)
    }

    pub fn packed(&self) -> u64 {
        self.0
    }
}

/// Index range of one mesh section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawGeometry {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_format: IndexFormat,
    pub first_index: u32,
    pub num_primitives: u32,
    pub min_vertex_index: u32,
    pub max_vertex_index: u32,
}

impl DrawGeometry {
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.first_index..self.first_index + self.num_primitives * 3
    }
}

/// Fully resolved draw, ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDrawCommand {
    /// Name of the material that resolved the shaders
    pub label: String,
    pub pipeline_state: GraphicsPipelineState,
    pub sort_key: MeshDrawSortKey,
    pub geometry: DrawGeometry,
    /// Material uniform block, empty when the material exposes none
    pub material_uniforms: Vec<u8>,
    pub lod_index: u32,
    pub section_index: u32,
}

/// Sink a pass body writes its draws into
pub trait DrawListContext {
    fn add_command(&mut self, command: MeshDrawCommand);

    /// Record a batch that resolved no shaders
    fn note_dropped_batch(&mut self, label: &str);
}

/// Draw commands of one pass
#[derive(Debug, Default)]
pub struct MeshDrawList {
    commands: Vec<MeshDrawCommand>,
    dropped: Vec<String>,
}

impl MeshDrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order by sort key. Equal keys keep emission order.
    pub fn sort(&mut self) {
        self.commands.sort_by_key(|c| c.sort_key);
    }

    pub fn commands(&self) -> &[MeshDrawCommand] {
        &self.commands
    }

    pub fn dropped_batches(&self) -> &[String] {
        &self.dropped
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl DrawListContext for MeshDrawList {
    fn add_command(&mut self, command: MeshDrawCommand) {
        self.commands.push(command);
    }

    fn note_dropped_batch(&mut self, label: &str) {
        self.dropped.push(label.to_string());
    }
}
