//! Virtual resources for the render graph

use crate::backend::traits::{TextureHandle, TextureViewHandle};
use crate::backend::types::*;

/// Unique identifier for a render graph resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Typed reference to a graph texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef(pub(crate) ResourceId);

/// Typed reference to a graph structured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef(pub(crate) ResourceId);

/// Shader resource view over a structured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewRef {
    pub buffer: BufferRef,
}

impl TextureRef {
    pub fn id(&self) -> ResourceId {
        self.0
    }
}

impl BufferRef {
    pub fn id(&self) -> ResourceId {
        self.0
    }
}

/// Transient texture created and destroyed by one graph execution
#[derive(Debug, Clone)]
pub struct VirtualTexture {
    pub id: ResourceId,
    pub desc: TextureDescriptor,
    pub name: String,
}

/// Transient structured buffer with its initial contents
#[derive(Debug, Clone)]
pub struct VirtualBuffer {
    pub id: ResourceId,
    pub name: String,
    pub stride: u32,
    pub data: Vec<u8>,
    /// Zero-filled buffer shared by every binding of the same stride
    pub placeholder: bool,
}

/// Texture owned outside the graph. Never created, resized or destroyed here.
#[derive(Debug, Clone)]
pub struct ExternalTexture {
    pub id: ResourceId,
    pub name: String,
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub desc: TextureDescriptor,
}

/// Resource type enumeration
#[derive(Debug, Clone)]
pub enum VirtualResource {
    Texture(VirtualTexture),
    Buffer(VirtualBuffer),
    External(ExternalTexture),
}

impl VirtualResource {
    pub fn id(&self) -> ResourceId {
        match self {
            VirtualResource::Texture(t) => t.id,
            VirtualResource::Buffer(b) => b.id,
            VirtualResource::External(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VirtualResource::Texture(t) => &t.name,
            VirtualResource::Buffer(b) => &b.name,
            VirtualResource::External(e) => &e.name,
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, VirtualResource::External(_))
    }

    pub fn texture_desc(&self) -> Option<&TextureDescriptor> {
        match self {
            VirtualResource::Texture(t) => Some(&t.desc),
            VirtualResource::External(e) => Some(&e.desc),
            VirtualResource::Buffer(_) => None,
        }
    }
}

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    /// Written as a color render target, contents discarded or cleared first
    RenderTarget,
    /// Color render target whose previous contents are loaded
    RenderTargetLoad,
    DepthStencilRead,
    DepthStencilWrite,
    /// Read through a shader resource view
    StorageBufferRead,
}

/// Resource access declaration for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceAccess {
    pub resource: ResourceId,
    pub usage: ResourceUsage,
}

impl ResourceAccess {
    pub fn is_read(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::RenderTargetLoad
                | ResourceUsage::DepthStencilRead
                | ResourceUsage::StorageBufferRead
        )
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::RenderTarget
                | ResourceUsage::RenderTargetLoad
                | ResourceUsage::DepthStencilWrite
        )
    }
}
