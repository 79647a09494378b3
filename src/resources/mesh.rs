//! Mesh assets as seen by the renderer
//!
//! Geometry is already resident on the GPU; a [`MeshAsset`] only carries the
//! per-LOD buffer handles, section ranges and default materials.

use crate::backend::traits::BufferHandle;
use crate::backend::types::IndexFormat;
use crate::resources::material::MaterialRef;
use std::sync::atomic::{AtomicBool, Ordering};

/// Vertex input layout a LOD's vertex buffer was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayoutKind {
    /// Plain local-space vertex factory
    Local,
    /// Local vertices fed through GPU instance culling
    InstancedCulling,
    Skinned,
}

/// Contiguous index range drawn with one material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSection {
    pub material_index: usize,
    pub first_index: u32,
    pub num_triangles: u32,
    pub min_vertex_index: u32,
    pub max_vertex_index: u32,
}

impl MeshSection {
    pub fn new(material_index: usize, first_index: u32, num_triangles: u32) -> Self {
        Self {
            material_index,
            first_index,
            num_triangles,
            min_vertex_index: 0,
            max_vertex_index: 0,
        }
    }

    pub fn with_vertex_range(mut self, min: u32, max: u32) -> Self {
        self.min_vertex_index = min;
        self.max_vertex_index = max;
        self
    }
}

/// One level of detail
#[derive(Debug, Clone)]
pub struct MeshLod {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_format: IndexFormat,
    pub vertex_layout: VertexLayoutKind,
    pub sections: Vec<MeshSection>,
}

impl MeshLod {
    pub fn new(vertex_buffer: BufferHandle, index_buffer: BufferHandle) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            index_format: IndexFormat::Uint32,
            vertex_layout: VertexLayoutKind::Local,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: MeshSection) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    pub fn with_vertex_layout(mut self, layout: VertexLayoutKind) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn triangle_count(&self) -> u32 {
        self.sections.iter().map(|s| s.num_triangles).sum()
    }
}

/// Static mesh with its default material per slot
pub struct MeshAsset {
    pub name: String,
    pub lods: Vec<MeshLod>,
    pub materials: Vec<Option<MaterialRef>>,
    compiling: AtomicBool,
}

impl MeshAsset {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lods: Vec::new(),
            materials: Vec::new(),
            compiling: AtomicBool::new(false),
        }
    }

    pub fn with_lod(mut self, lod: MeshLod) -> Self {
        self.lods.push(lod);
        self
    }

    pub fn with_material(mut self, material: Option<MaterialRef>) -> Self {
        self.materials.push(material);
        self
    }

    /// True while the asset pipeline is still building the mesh
    pub fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::Acquire)
    }

    pub fn set_compiling(&self, compiling: bool) {
        self.compiling.store(compiling, Ordering::Release);
    }

    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn material_slot_count(&self) -> usize {
        self.materials.len()
    }

    /// Default material of a slot
    pub fn material(&self, slot: usize) -> Option<&MaterialRef> {
        self.materials.get(slot).and_then(Option::as_ref)
    }
}

impl std::fmt::Debug for MeshAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshAsset")
            .field("name", &self.name)
            .field("lods", &self.lods.len())
            .field("material_slots", &self.materials.len())
            .field("compiling", &self.is_compiling())
            .finish()
    }
}
