//! Frame graph builder interface
//!
//! [`FrameGraphBuilder`] is the surface the base pass registers its work
//! through. [`GraphBuilder`] implements it over a [`RenderGraph`] and a
//! [`GraphicsBackend`]; hosts with their own frame graph implement the trait
//! directly.

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::TextureDescriptor;
use crate::render_graph::executor::{ExecutionSummary, RenderGraphExecutor};
use crate::render_graph::graph::RenderGraph;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::resources::texture::RenderTarget;

pub trait FrameGraphBuilder {
    /// Bring an externally owned target into the graph
    fn register_external_texture(&mut self, name: &str, target: &RenderTarget) -> TextureRef;

    fn create_texture(&mut self, name: &str, desc: TextureDescriptor) -> TextureRef;

    fn create_structured_buffer(&mut self, name: &str, stride: u32, data: &[u8]) -> BufferRef;

    /// Shared zero-filled buffer holding one element of `stride` bytes
    fn create_default_structured_buffer(&mut self, stride: u32) -> BufferRef;

    fn create_srv(&mut self, buffer: BufferRef) -> ViewRef;

    fn texture_desc(&self, texture: TextureRef) -> Option<TextureDescriptor>;

    fn add_pass(
        &mut self,
        name: &str,
        parameters: PassParameters,
        flags: PassFlags,
        execute: PassExecuteFn,
    ) -> PassId;

    /// Run every registered pass and release all transient resources
    fn execute(&mut self) -> ExecutionSummary;
}

/// One frame's graph bound to the backend it will execute on
pub struct GraphBuilder<'b, B: GraphicsBackend + ?Sized> {
    graph: RenderGraph,
    backend: &'b mut B,
}

impl<'b, B: GraphicsBackend + ?Sized> GraphBuilder<'b, B> {
    pub fn new(backend: &'b mut B) -> Self {
        Self {
            graph: RenderGraph::new(),
            backend,
        }
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }
}

impl<'b, B: GraphicsBackend + ?Sized> FrameGraphBuilder for GraphBuilder<'b, B> {
    fn register_external_texture(&mut self, name: &str, target: &RenderTarget) -> TextureRef {
        self.graph
            .register_external_texture(name, target.texture, target.view, target.descriptor())
    }

    fn create_texture(&mut self, name: &str, desc: TextureDescriptor) -> TextureRef {
        self.graph.create_texture(name, desc)
    }

    fn create_structured_buffer(&mut self, name: &str, stride: u32, data: &[u8]) -> BufferRef {
        self.graph.create_structured_buffer(name, stride, data)
    }

    fn create_default_structured_buffer(&mut self, stride: u32) -> BufferRef {
        self.graph.create_default_structured_buffer(stride)
    }

    fn create_srv(&mut self, buffer: BufferRef) -> ViewRef {
        self.graph.create_srv(buffer)
    }

    fn texture_desc(&self, texture: TextureRef) -> Option<TextureDescriptor> {
        self.graph.texture_desc(texture).cloned()
    }

    fn add_pass(
        &mut self,
        name: &str,
        parameters: PassParameters,
        flags: PassFlags,
        execute: PassExecuteFn,
    ) -> PassId {
        self.graph.add_pass(name, parameters, flags, execute)
    }

    fn execute(&mut self) -> ExecutionSummary {
        let mut graph = std::mem::take(&mut self.graph);
        RenderGraphExecutor::new().execute(&mut graph, &mut *self.backend)
    }
}
