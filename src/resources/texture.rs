//! Render targets owned by the caller

use crate::backend::traits::*;
use crate::backend::types::*;

/// Externally owned color target the renderer draws into.
/// Never resized or recreated by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub clear_value: ClearValue,
}

impl RenderTarget {
    pub fn new(texture: TextureHandle, view: TextureViewHandle, width: u32, height: u32) -> Self {
        Self {
            texture,
            view,
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            clear_value: ClearValue::BLACK,
        }
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_value = ClearValue::Color(color);
        self
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor {
            label: None,
            width: self.width,
            height: self.height,
            format: self.format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            clear_value: self.clear_value,
        }
    }
}
