//! Offscreen Mesh Renderer - a render graph-based base pass for a single static mesh
//!
//! The crate renders one mesh (with optional per-section material overrides)
//! into an externally owned color target plus a frame-scoped depth target.
//!
//! # Features
//! - Mesh section to draw batch translation with override/default material resolution
//! - Shader permutation gating and material fallback chains
//! - Synthesized GPU scene data (one primitive, one instance) in place of a full scene
//! - Render graph pass registration with declared resource dependencies
//! - A dedicated render thread fed through a FIFO work queue
//!
//! The host engine plugs in through three seams: [`render_graph::FrameGraphBuilder`]
//! (or the bundled [`render_graph::RenderGraph`] over a [`backend::GraphicsBackend`]),
//! [`resources::MaterialProxy`] / [`resources::MaterialResource`] for the material
//! system, and [`resources::MeshAsset`] for already-built geometry.

pub mod backend;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod render_thread;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use error::{RenderError, RenderResult};
pub use render_thread::{RenderQueue, RenderStats, RenderThread};
pub use renderer::MeshRenderer;

use backend::{ClearValue, TextureFormat};

/// Shader model tier the material system compiles for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FeatureLevel {
    /// Mobile class hardware
    Es31,
    /// Desktop shader model 5
    #[default]
    Sm5,
    /// Desktop shader model 6
    Sm6,
}

/// Configuration for the renderer and its render thread
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Feature level materials are resolved against
    pub feature_level: FeatureLevel,
    /// Format of the frame-scoped depth target
    pub depth_format: TextureFormat,
    /// Value the depth target is cleared to. Reverse-Z, so far is 0.
    pub depth_clear: ClearValue,
    /// Maximum number of materials visited while walking a fallback chain
    pub max_fallback_depth: usize,
    /// Name of the render thread
    pub thread_name: String,
    /// Bound on queued render work (None = unbounded)
    pub queue_capacity: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            feature_level: FeatureLevel::Sm5,
            depth_format: TextureFormat::Depth24PlusStencil8,
            depth_clear: ClearValue::DEPTH_FAR,
            max_fallback_depth: 8,
            thread_name: "mesh-render-thread".to_string(),
            queue_capacity: None,
        }
    }
}

impl RendererConfig {
    pub fn with_feature_level(mut self, feature_level: FeatureLevel) -> Self {
        self.feature_level = feature_level;
        self
    }

    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = format;
        self
    }

    pub fn with_depth_clear(mut self, clear: ClearValue) -> Self {
        self.depth_clear = clear;
        self
    }

    pub fn with_max_fallback_depth(mut self, depth: usize) -> Self {
        self.max_fallback_depth = depth.max(1);
        self
    }

    pub fn with_thread_name(mut self, name: &str) -> Self {
        self.thread_name = name.to_string();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.feature_level, FeatureLevel::Sm5);
        assert!(config.depth_format.is_depth());
        assert_eq!(config.depth_clear, ClearValue::DEPTH_FAR);
        assert!(config.queue_capacity.is_none());
    }

    #[test]
    fn test_fallback_depth_is_at_least_one() {
        let config = RendererConfig::default().with_max_fallback_depth(0);
        assert_eq!(config.max_fallback_depth, 1);
    }

    #[test]
    fn test_feature_level_ordering() {
        assert!(FeatureLevel::Es31 < FeatureLevel::Sm5);
        assert!(FeatureLevel::Sm5 < FeatureLevel::Sm6);
    }
}
