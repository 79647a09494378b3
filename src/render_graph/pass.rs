//! Render pass definitions for the render graph

use crate::backend::types::{ExclusiveDepthStencil, Viewport};
use crate::render_graph::draw::DrawListContext;
use crate::render_graph::resource::*;

/// Unique identifier for a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Pass flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassFlags(u32);

impl PassFlags {
    pub const NONE: Self = Self(0);
    /// Pass binds render targets and records draws
    pub const RASTER: Self = Self(1 << 0);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for PassFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// What the pass does with a target's contents when it begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Clear to the texture's clear value
    Clear,
    Load,
    NoAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Store,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTargetBinding {
    pub texture: TextureRef,
    pub load: LoadAction,
    pub store: StoreAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilBinding {
    pub texture: TextureRef,
    pub depth_load: LoadAction,
    pub stencil_load: LoadAction,
    pub store: StoreAction,
    pub access: ExclusiveDepthStencil,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderTargetBindings {
    pub color: Vec<ColorTargetBinding>,
    pub depth_stencil: Option<DepthStencilBinding>,
}

/// Named uniform block bound for every draw of the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBinding {
    pub name: String,
    pub data: Vec<u8>,
}

impl UniformBinding {
    pub fn new<T: bytemuck::Pod>(name: &str, value: &T) -> Self {
        Self {
            name: name.to_string(),
            data: bytemuck::bytes_of(value).to_vec(),
        }
    }
}

/// Everything a pass binds. Resource accesses are derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassParameters {
    pub uniform_buffers: Vec<UniformBinding>,
    pub shader_resources: Vec<(String, ViewRef)>,
    pub render_targets: RenderTargetBindings,
    pub viewport: Option<Viewport>,
}

impl PassParameters {
    /// Split the bindings into read and write declarations
    pub fn accesses(&self) -> (Vec<ResourceAccess>, Vec<ResourceAccess>) {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for (_, view) in &self.shader_resources {
            inputs.push(ResourceAccess {
                resource: view.buffer.id(),
                usage: ResourceUsage::StorageBufferRead,
            });
        }

        for color in &self.render_targets.color {
            let usage = if color.load == LoadAction::Load {
                ResourceUsage::RenderTargetLoad
            } else {
                ResourceUsage::RenderTarget
            };
            let access = ResourceAccess {
                resource: color.texture.id(),
                usage,
            };
            if access.is_read() {
                inputs.push(access);
            }
            outputs.push(access);
        }

        if let Some(depth) = &self.render_targets.depth_stencil {
            let writes = depth.access.writes_depth() || depth.access.writes_stencil();
            let access = ResourceAccess {
                resource: depth.texture.id(),
                usage: if writes {
                    ResourceUsage::DepthStencilWrite
                } else {
                    ResourceUsage::DepthStencilRead
                },
            };
            if writes {
                if depth.depth_load == LoadAction::Load || depth.stencil_load == LoadAction::Load {
                    inputs.push(ResourceAccess {
                        resource: depth.texture.id(),
                        usage: ResourceUsage::DepthStencilRead,
                    });
                }
                outputs.push(access);
            } else {
                inputs.push(access);
            }
        }

        (inputs, outputs)
    }
}

/// Deferred pass body, run by the executor with the pass's draw list
pub type PassExecuteFn = Box<dyn FnOnce(&mut dyn DrawListContext) + Send>;

/// Metadata about a pass in the graph
#[derive(Debug)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub flags: PassFlags,
    pub parameters: PassParameters,
    pub inputs: Vec<ResourceAccess>,
    pub outputs: Vec<ResourceAccess>,
}

impl PassNode {
    pub fn reads_resource(&self, resource: ResourceId) -> bool {
        self.inputs.iter().any(|a| a.resource == resource)
    }

    pub fn writes_resource(&self, resource: ResourceId) -> bool {
        self.outputs.iter().any(|a| a.resource == resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .map(|a| a.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(id: u32) -> TextureRef {
        TextureRef(ResourceId(id))
    }

    #[test]
    fn test_cleared_color_target_is_write_only() {
        let params = PassParameters {
            render_targets: RenderTargetBindings {
                color: vec![ColorTargetBinding {
                    texture: texture(0),
                    load: LoadAction::Clear,
                    store: StoreAction::Store,
                }],
                depth_stencil: None,
            },
            ..Default::default()
        };

        let (inputs, outputs) = params.accesses();
        assert!(inputs.is_empty());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].usage, ResourceUsage::RenderTarget);
    }

    #[test]
    fn test_depth_and_srv_accesses() {
        let params = PassParameters {
            shader_resources: vec![(
                "Primitives".to_string(),
                ViewRef {
                    buffer: BufferRef(ResourceId(5)),
                },
            )],
            render_targets: RenderTargetBindings {
                color: Vec::new(),
                depth_stencil: Some(DepthStencilBinding {
                    texture: texture(1),
                    depth_load: LoadAction::Load,
                    stencil_load: LoadAction::Clear,
                    store: StoreAction::Store,
                    access: ExclusiveDepthStencil::DepthWriteStencilWrite,
                }),
            },
            ..Default::default()
        };

        let (inputs, outputs) = params.accesses();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().any(|a| a.resource == ResourceId(5)));
        assert!(inputs
            .iter()
            .any(|a| a.resource == ResourceId(1) && a.usage == ResourceUsage::DepthStencilRead));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].usage, ResourceUsage::DepthStencilWrite);
    }

    #[test]
    fn test_pass_flags() {
        let flags = PassFlags::RASTER;
        assert!(flags.contains(PassFlags::RASTER));
        assert!(!PassFlags::NONE.contains(PassFlags::RASTER));
    }
}
