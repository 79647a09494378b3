//! Core backend abstraction traits
//!
//! The render graph lowers its passes onto a [`GraphicsBackend`]. Hosts wrap
//! their command list in this trait; tests record the calls instead.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

/// Handle to a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(u64);

macro_rules! impl_raw_handle {
    ($($handle:ident),*) => {
        $(
            impl $handle {
                pub const fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }

                pub const fn raw(&self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

impl_raw_handle!(BufferHandle, TextureHandle, TextureViewHandle);

/// What happens to an attachment's contents when a pass begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear(ClearValue),
    Load,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

/// Color attachment for render pass
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttachment {
    pub view: TextureViewHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Depth stencil attachment for render pass
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub stencil_load_op: LoadOp,
    pub store_op: StoreOp,
    pub access: ExclusiveDepthStencil,
}

/// Render pass descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// Graphics command stream the render graph executes against
pub trait GraphicsBackend: Send {
    // Resource creation

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a texture view
    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    /// Create a buffer with initial data
    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    // Command recording

    /// Begin a render pass
    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    /// End the current render pass
    fn end_render_pass(&mut self);

    /// Set viewport
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Bind uniform data by parameter name for subsequent draws
    fn bind_uniform_buffer(&mut self, name: &str, data: &[u8]);

    /// Bind a structured buffer by parameter name for subsequent draws
    fn bind_shader_resource(&mut self, name: &str, buffer: BufferHandle);

    /// Set shaders and fixed-function state
    fn set_graphics_state(&mut self, state: &GraphicsPipelineState);

    /// Set vertex buffer
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    /// Set index buffer
    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat);

    /// Draw indexed primitives
    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    );

    /// Flush everything recorded so far to the GPU
    fn submit(&mut self);

    // Resource cleanup

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);
}
