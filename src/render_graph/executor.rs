//! Render graph executor
//!
//! Runs a compiled graph against a backend. Transient resources are created
//! right before the first pass that uses them and destroyed right after the
//! last one, so nothing outlives a single `execute` call.

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::draw::MeshDrawList;
use crate::render_graph::graph::*;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::collections::{HashMap, HashSet};

/// Name material uniform blocks are bound under
pub const MATERIAL_UNIFORM_NAME: &str = "Material";

/// What one graph execution did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub passes_executed: usize,
    pub passes_skipped: usize,
    pub draw_commands: usize,
    pub dropped_batches: usize,
    pub transient_textures: usize,
    pub transient_buffers: usize,
}

/// Executor for running the compiled render graph
pub struct RenderGraphExecutor {
    /// Allocated textures mapped by resource ID
    allocated_textures: HashMap<ResourceId, TextureHandle>,
    allocated_texture_views: HashMap<ResourceId, TextureViewHandle>,

    /// Allocated buffers mapped by resource ID
    allocated_buffers: HashMap<ResourceId, BufferHandle>,

    /// Resources whose creation failed this execution
    failed: HashSet<ResourceId>,
}

impl RenderGraphExecutor {
    pub fn new() -> Self {
        Self {
            allocated_textures: HashMap::new(),
            allocated_texture_views: HashMap::new(),
            allocated_buffers: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Execute every pass of the graph in dependency order, then submit
    pub fn execute<B: GraphicsBackend + ?Sized>(
        &mut self,
        graph: &mut RenderGraph,
        backend: &mut B,
    ) -> ExecutionSummary {
        let compiled = graph.compile();
        let mut summary = ExecutionSummary::default();

        for (step, &pass_id) in compiled.pass_order.iter().enumerate() {
            self.allocate_resources_for_step(graph, &compiled, step, backend, &mut summary);

            let execute_fn = graph.take_execute_fn(pass_id);
            let Some(node) = graph.pass_node(pass_id) else {
                continue;
            };

            let missing = node.resources().any(|id| self.failed.contains(&id));
            match execute_fn {
                Some(execute_fn) if !missing => {
                    self.run_pass(graph, node, execute_fn, backend, &mut summary);
                    summary.passes_executed += 1;
                }
                _ => {
                    log::warn!("Skipping pass '{}': resources unavailable", node.name);
                    summary.passes_skipped += 1;
                }
            }

            self.release_resources_for_step(&compiled, step, backend);
        }

        backend.submit();
        self.cleanup(backend);

        log::debug!(
            "Render graph executed: {} passes, {} skipped, {} draws",
            summary.passes_executed,
            summary.passes_skipped,
            summary.draw_commands
        );

        summary
    }

    fn allocate_resources_for_step<B: GraphicsBackend + ?Sized>(
        &mut self,
        graph: &RenderGraph,
        compiled: &CompiledGraph,
        step: usize,
        backend: &mut B,
        summary: &mut ExecutionSummary,
    ) {
        let mut starting: Vec<ResourceId> = compiled
            .resource_lifetimes
            .iter()
            .filter(|(_, lifetime)| lifetime.first_use == step)
            .map(|(&id, _)| id)
            .collect();
        starting.sort();

        for id in starting {
            match graph.resource(id) {
                Some(VirtualResource::Texture(tex)) => {
                    let created = backend.create_texture(&tex.desc).and_then(|handle| {
                        match backend.create_texture_view(handle) {
                            Ok(view) => Ok((handle, view)),
                            Err(e) => {
                                backend.destroy_texture(handle);
                                Err(e)
                            }
                        }
                    });
                    match created {
                        Ok((handle, view)) => {
                            self.allocated_textures.insert(id, handle);
                            self.allocated_texture_views.insert(id, view);
                            summary.transient_textures += 1;
                        }
                        Err(e) => {
                            log::error!("Failed to create texture '{}': {}", tex.name, e);
                            self.failed.insert(id);
                        }
                    }
                }
                Some(VirtualResource::Buffer(buf)) => {
                    let desc = BufferDescriptor {
                        label: Some(buf.name.clone()),
                        size: buf.data.len() as u64,
                        stride: buf.stride,
                        usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
                    };
                    match backend.create_buffer_init(&desc, &buf.data) {
                        Ok(handle) => {
                            self.allocated_buffers.insert(id, handle);
                            summary.transient_buffers += 1;
                        }
                        Err(e) => {
                            log::error!("Failed to create buffer '{}': {}", buf.name, e);
                            self.failed.insert(id);
                        }
                    }
                }
                Some(VirtualResource::External(_)) | None => {}
            }
        }
    }

    fn release_resources_for_step<B: GraphicsBackend + ?Sized>(
        &mut self,
        compiled: &CompiledGraph,
        step: usize,
        backend: &mut B,
    ) {
        let mut ending: Vec<ResourceId> = compiled
            .resource_lifetimes
            .iter()
            .filter(|(_, lifetime)| lifetime.last_use == step)
            .map(|(&id, _)| id)
            .collect();
        ending.sort();

        for id in ending {
            if let Some(handle) = self.allocated_textures.remove(&id) {
                self.allocated_texture_views.remove(&id);
                backend.destroy_texture(handle);
            }
            if let Some(handle) = self.allocated_buffers.remove(&id) {
                backend.destroy_buffer(handle);
            }
        }
    }

    fn texture_view(&self, graph: &RenderGraph, texture: TextureRef) -> Option<TextureViewHandle> {
        match graph.resource(texture.id())? {
            VirtualResource::External(ext) => Some(ext.view),
            VirtualResource::Texture(_) => self.allocated_texture_views.get(&texture.id()).copied(),
            VirtualResource::Buffer(_) => None,
        }
    }

    fn load_op(
        &self,
        graph: &RenderGraph,
        texture: TextureRef,
        action: LoadAction,
        depth: bool,
    ) -> LoadOp {
        match action {
            LoadAction::Clear => {
                let clear = graph
                    .texture_desc(texture)
                    .map(|desc| desc.clear_value)
                    .unwrap_or(ClearValue::None);
                match clear {
                    ClearValue::None if depth => LoadOp::Clear(ClearValue::DEPTH_FAR),
                    ClearValue::None => LoadOp::Clear(ClearValue::BLACK),
                    value => LoadOp::Clear(value),
                }
            }
            LoadAction::Load => LoadOp::Load,
            LoadAction::NoAction => LoadOp::DontCare,
        }
    }

    fn store_op(action: StoreAction) -> StoreOp {
        match action {
            StoreAction::Store => StoreOp::Store,
            StoreAction::Discard => StoreOp::Discard,
        }
    }

    fn run_pass<B: GraphicsBackend + ?Sized>(
        &self,
        graph: &RenderGraph,
        node: &PassNode,
        execute_fn: PassExecuteFn,
        backend: &mut B,
        summary: &mut ExecutionSummary,
    ) {
        let mut draw_list = MeshDrawList::new();
        execute_fn(&mut draw_list);
        draw_list.sort();

        summary.dropped_batches += draw_list.dropped_batches().len();

        if !node.flags.contains(PassFlags::RASTER) {
            return;
        }

        let params = &node.parameters;
        let mut color_attachments = Vec::new();
        for color in &params.render_targets.color {
            if let Some(view) = self.texture_view(graph, color.texture) {
                color_attachments.push(ColorAttachment {
                    view,
                    load_op: self.load_op(graph, color.texture, color.load, false),
                    store_op: Self::store_op(color.store),
                });
            }
        }

        let depth_stencil_attachment = params.render_targets.depth_stencil.and_then(|depth| {
            self.texture_view(graph, depth.texture)
                .map(|view| DepthStencilAttachment {
                    view,
                    depth_load_op: self.load_op(graph, depth.texture, depth.depth_load, true),
                    stencil_load_op: self.load_op(graph, depth.texture, depth.stencil_load, true),
                    store_op: Self::store_op(depth.store),
                    access: depth.access,
                })
        });

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some(node.name.clone()),
            color_attachments,
            depth_stencil_attachment,
        });

        if let Some(viewport) = &params.viewport {
            backend.set_viewport(viewport);
        }

        for uniform in &params.uniform_buffers {
            backend.bind_uniform_buffer(&uniform.name, &uniform.data);
        }

        for (name, view) in &params.shader_resources {
            if let Some(&buffer) = self.allocated_buffers.get(&view.buffer.id()) {
                backend.bind_shader_resource(name, buffer);
            }
        }

        for command in draw_list.commands() {
            backend.set_graphics_state(&command.pipeline_state);
            if !command.material_uniforms.is_empty() {
                backend.bind_uniform_buffer(MATERIAL_UNIFORM_NAME, &command.material_uniforms);
            }
            let geometry = &command.geometry;
            backend.set_vertex_buffer(0, geometry.vertex_buffer, 0);
            backend.set_index_buffer(geometry.index_buffer, 0, geometry.index_format);
            backend.draw_indexed(geometry.index_range(), 0, 0..1);
        }
        summary.draw_commands += draw_list.len();

        backend.end_render_pass();

        log::trace!(
            "Pass '{}' recorded {} draws",
            node.name,
            draw_list.len()
        );
    }

    /// Destroy anything still alive, e.g. after a skipped pass
    pub fn cleanup<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for (_, handle) in self.allocated_textures.drain() {
            backend.destroy_texture(handle);
        }
        self.allocated_texture_views.clear();

        for (_, handle) in self.allocated_buffers.drain() {
            backend.destroy_buffer(handle);
        }

        self.failed.clear();
    }
}

impl Default for RenderGraphExecutor {
    fn default() -> Self {
        Self::new()
    }
}
