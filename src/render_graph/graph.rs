//! Render graph definition and compilation

use crate::backend::traits::{TextureHandle, TextureViewHandle};
use crate::backend::types::TextureDescriptor;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Declared passes and resources of one frame
pub struct RenderGraph {
    pass_nodes: Vec<PassNode>,
    execute_fns: Vec<Option<PassExecuteFn>>,
    resources: Vec<VirtualResource>,
    next_pass_id: u32,
    next_resource_id: u32,

    /// External resources by name
    external_resources: HashMap<String, ResourceId>,
    /// Zero-filled buffers by stride
    placeholders: HashMap<u32, BufferRef>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            pass_nodes: Vec::new(),
            execute_fns: Vec::new(),
            resources: Vec::new(),
            next_pass_id: 0,
            next_resource_id: 0,
            external_resources: HashMap::new(),
            placeholders: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> ResourceId {
        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        id
    }

    /// Register an externally owned texture. Registering the same name twice
    /// returns the first reference.
    pub fn register_external_texture(
        &mut self,
        name: &str,
        texture: TextureHandle,
        view: TextureViewHandle,
        desc: TextureDescriptor,
    ) -> TextureRef {
        if let Some(&id) = self.external_resources.get(name) {
            return TextureRef(id);
        }

        let id = self.allocate_id();
        self.resources.push(VirtualResource::External(ExternalTexture {
            id,
            name: name.to_string(),
            texture,
            view,
            desc,
        }));
        self.external_resources.insert(name.to_string(), id);
        TextureRef(id)
    }

    /// Get external resource by name
    pub fn get_external(&self, name: &str) -> Option<TextureRef> {
        self.external_resources.get(name).copied().map(TextureRef)
    }

    /// Declare a transient texture
    pub fn create_texture(&mut self, name: &str, desc: TextureDescriptor) -> TextureRef {
        let id = self.allocate_id();
        self.resources.push(VirtualResource::Texture(VirtualTexture {
            id,
            desc,
            name: name.to_string(),
        }));
        TextureRef(id)
    }

    /// Declare a transient structured buffer initialised with `data`
    pub fn create_structured_buffer(&mut self, name: &str, stride: u32, data: &[u8]) -> BufferRef {
        let id = self.allocate_id();
        self.resources.push(VirtualResource::Buffer(VirtualBuffer {
            id,
            name: name.to_string(),
            stride,
            data: data.to_vec(),
            placeholder: false,
        }));
        BufferRef(id)
    }

    /// Zero-filled single-element buffer, shared by all callers asking for the same stride
    pub fn create_default_structured_buffer(&mut self, stride: u32) -> BufferRef {
        if let Some(&buffer) = self.placeholders.get(&stride) {
            return buffer;
        }

        let id = self.allocate_id();
        self.resources.push(VirtualResource::Buffer(VirtualBuffer {
            id,
            name: format!("DefaultStructuredBuffer{}", stride),
            stride,
            data: vec![0; stride as usize],
            placeholder: true,
        }));
        let buffer = BufferRef(id);
        self.placeholders.insert(stride, buffer);
        buffer
    }

    pub fn create_srv(&mut self, buffer: BufferRef) -> ViewRef {
        ViewRef { buffer }
    }

    pub fn texture_desc(&self, texture: TextureRef) -> Option<&TextureDescriptor> {
        self.resource(texture.id())?.texture_desc()
    }

    /// Add a pass. Its resource accesses are derived from `parameters`.
    pub fn add_pass(
        &mut self,
        name: &str,
        parameters: PassParameters,
        flags: PassFlags,
        execute: PassExecuteFn,
    ) -> PassId {
        let id = PassId(self.next_pass_id);
        self.next_pass_id += 1;

        let (inputs, outputs) = parameters.accesses();
        self.pass_nodes.push(PassNode {
            id,
            name: name.to_string(),
            flags,
            parameters,
            inputs,
            outputs,
        });
        self.execute_fns.push(Some(execute));

        id
    }

    /// Compile the graph - topological sort and resource lifetime planning
    pub fn compile(&self) -> CompiledGraph {
        // Every edge runs from an earlier declaration to a later one, so the
        // declaration order is always a valid schedule.
        let mut dependencies: HashMap<PassId, HashSet<PassId>> = HashMap::new();
        let mut edges = Vec::new();

        for node in &self.pass_nodes {
            dependencies.insert(node.id, HashSet::new());
        }

        for (later_index, later) in self.pass_nodes.iter().enumerate() {
            for earlier in &self.pass_nodes[..later_index] {
                let read_after_write = later
                    .inputs
                    .iter()
                    .any(|a| earlier.writes_resource(a.resource));
                let write_after_write = later
                    .outputs
                    .iter()
                    .any(|a| earlier.writes_resource(a.resource));
                let write_after_read = later
                    .outputs
                    .iter()
                    .any(|a| earlier.reads_resource(a.resource));

                if read_after_write || write_after_write || write_after_read {
                    if let Some(deps) = dependencies.get_mut(&later.id) {
                        if deps.insert(earlier.id) {
                            edges.push((earlier.id, later.id));
                        }
                    }
                }
            }
        }

        // Kahn's algorithm, lowest pass id first for a stable order
        let mut in_degree: HashMap<PassId, usize> = dependencies
            .iter()
            .map(|(&id, deps)| (id, deps.len()))
            .collect();

        let mut ready: BTreeSet<PassId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted_passes = Vec::with_capacity(self.pass_nodes.len());

        while let Some(pass_id) = ready.pop_first() {
            sorted_passes.push(pass_id);

            for node in &self.pass_nodes {
                if dependencies[&node.id].contains(&pass_id) {
                    if let Some(degree) = in_degree.get_mut(&node.id) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(node.id);
                        }
                    }
                }
            }
        }

        // Determine resource lifetimes
        let mut resource_lifetimes: HashMap<ResourceId, ResourceLifetime> = HashMap::new();

        for (order, &pass_id) in sorted_passes.iter().enumerate() {
            let Some(node) = self.pass_node(pass_id) else {
                continue;
            };

            for resource in node.resources() {
                let lifetime = resource_lifetimes
                    .entry(resource)
                    .or_insert(ResourceLifetime {
                        first_use: order,
                        last_use: order,
                    });
                lifetime.last_use = order;
            }
        }

        CompiledGraph {
            pass_order: sorted_passes,
            edges,
            resource_lifetimes,
        }
    }

    /// Take the deferred body of a pass. Each body runs at most once.
    pub(crate) fn take_execute_fn(&mut self, id: PassId) -> Option<PassExecuteFn> {
        self.execute_fns.get_mut(id.index())?.take()
    }

    /// Get pass node (metadata) by ID
    pub fn pass_node(&self, id: PassId) -> Option<&PassNode> {
        self.pass_nodes.get(id.index())
    }

    pub fn pass_nodes(&self) -> &[PassNode] {
        &self.pass_nodes
    }

    pub fn resource(&self, id: ResourceId) -> Option<&VirtualResource> {
        self.resources.get(id.index())
    }

    pub fn resources(&self) -> &[VirtualResource] {
        &self.resources
    }

    pub fn pass_count(&self) -> usize {
        self.pass_nodes.len()
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource lifetime in terms of pass execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

/// Compiled render graph with execution order and resource lifetimes
#[derive(Debug)]
pub struct CompiledGraph {
    pub pass_order: Vec<PassId>,
    /// Dependency edges as (producer, consumer)
    pub edges: Vec<(PassId, PassId)>,
    pub resource_lifetimes: HashMap<ResourceId, ResourceLifetime>,
}

impl CompiledGraph {
    /// Check if a resource is alive at a given execution step
    pub fn is_resource_alive(&self, resource: ResourceId, step: usize) -> bool {
        if let Some(lifetime) = self.resource_lifetimes.get(&resource) {
            step >= lifetime.first_use && step <= lifetime.last_use
        } else {
            false
        }
    }
}
