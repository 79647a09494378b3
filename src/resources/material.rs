//! Material definitions
//!
//! The renderer talks to materials through two traits. A [`MaterialProxy`] is
//! what meshes and overrides reference; it hands out the compiled
//! [`MaterialResource`] for a feature level and names the material to fall
//! back to when that resource can't serve a request.

use crate::resources::shader::{ShaderMap, ShaderPair, ShaderRequest};
use crate::FeatureLevel;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub type MaterialRef = Arc<dyn MaterialProxy>;

/// What kind of surface a material shades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialDomain {
    #[default]
    Surface,
    DeferredDecal,
    LightFunction,
    PostProcess,
    UserInterface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialProperties {
    pub domain: MaterialDomain,
    pub blend_mode: BlendMode,
    pub two_sided: bool,
    pub wireframe: bool,
    pub world_position_offset: bool,
}

/// Summary flags that are safe to read from any thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialRelevance {
    pub uses_world_position_offset: bool,
    pub opaque: bool,
    pub two_sided: bool,
}

impl MaterialRelevance {
    pub fn from_properties(properties: &MaterialProperties) -> Self {
        Self {
            uses_world_position_offset: properties.world_position_offset,
            opaque: properties.blend_mode == BlendMode::Opaque,
            two_sided: properties.two_sided,
        }
    }
}

/// Compiled material for one feature level
pub trait MaterialResource: Send + Sync {
    fn name(&self) -> &str;

    fn properties(&self) -> MaterialProperties;

    /// Look up a compiled shader pair. `None` when the permutation was never compiled.
    fn try_get_shaders(&self, request: &ShaderRequest) -> Option<ShaderPair>;
}

/// Render-side handle of a material
pub trait MaterialProxy: Send + Sync {
    fn name(&self) -> &str;

    /// The compiled resource, without walking to a fallback
    fn material_no_fallback(&self, feature_level: FeatureLevel) -> Option<&dyn MaterialResource>;

    /// Material to try next when this one can't draw. `None` ends the chain.
    fn fallback(&self, feature_level: FeatureLevel) -> Option<MaterialRef>;

    fn relevance(&self, feature_level: FeatureLevel) -> MaterialRelevance;

    /// Rebuild cached uniform expressions if a parameter changed since the last build
    fn update_uniform_expression_cache_if_needed(&self, feature_level: FeatureLevel);

    /// Cached uniform block, if the material exposes one
    fn uniform_expressions(&self) -> Option<MaterialUniformData>;
}

/// PBR surface material with its compiled shader map
pub struct SurfaceMaterial {
    pub name: String,
    pub properties: MaterialProperties,
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    pub emissive_strength: f32,

    shaders: ShaderMap,
    /// Lowest feature level the shader map was compiled for
    min_feature_level: FeatureLevel,
    fallback: RwLock<Option<MaterialRef>>,
    cached_uniforms: RwLock<Option<MaterialUniformData>>,
    cache_builds: AtomicUsize,
}

impl SurfaceMaterial {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: MaterialProperties::default(),
            base_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            metallic: 0.0,
            roughness: 0.5,
            emissive: Vec3::ZERO,
            emissive_strength: 1.0,
            shaders: ShaderMap::new(),
            min_feature_level: FeatureLevel::Es31,
            fallback: RwLock::new(None),
            cached_uniforms: RwLock::new(None),
            cache_builds: AtomicUsize::new(0),
        }
    }

    /// Engine default material. Serves every permutation and has no fallback.
    pub fn default_surface(shaders: ShaderPair) -> Self {
        let mut material = Self::new("DefaultSurface");
        material.shaders.set_universal(shaders);
        material
    }

    pub fn with_base_color(mut self, color: Vec4) -> Self {
        self.base_color = color;
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_emissive(mut self, emissive: Vec3, strength: f32) -> Self {
        self.emissive = emissive;
        self.emissive_strength = strength;
        self
    }

    pub fn with_properties(mut self, properties: MaterialProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_shader_map(mut self, shaders: ShaderMap) -> Self {
        self.shaders = shaders;
        self
    }

    pub fn with_min_feature_level(mut self, level: FeatureLevel) -> Self {
        self.min_feature_level = level;
        self
    }

    pub fn with_fallback(self, fallback: MaterialRef) -> Self {
        *self.fallback.write() = Some(fallback);
        self
    }

    pub fn set_fallback(&self, fallback: Option<MaterialRef>) {
        *self.fallback.write() = fallback;
    }

    /// Create a uniform data struct for GPU
    pub fn uniform_data(&self) -> MaterialUniformData {
        MaterialUniformData {
            base_color: self.base_color,
            metallic_roughness: [self.metallic, self.roughness, 0.0, 0.0],
            emissive: self.emissive.extend(self.emissive_strength),
        }
    }

    /// How many times the uniform cache was rebuilt
    pub fn cache_builds(&self) -> usize {
        self.cache_builds.load(Ordering::Relaxed)
    }
}

impl MaterialResource for SurfaceMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> MaterialProperties {
        self.properties
    }

    fn try_get_shaders(&self, request: &ShaderRequest) -> Option<ShaderPair> {
        self.shaders.find(request)
    }
}

impl MaterialProxy for SurfaceMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn material_no_fallback(&self, feature_level: FeatureLevel) -> Option<&dyn MaterialResource> {
        if feature_level >= self.min_feature_level && !self.shaders.is_empty() {
            Some(self)
        } else {
            None
        }
    }

    fn fallback(&self, _feature_level: FeatureLevel) -> Option<MaterialRef> {
        self.fallback.read().clone()
    }

    fn relevance(&self, _feature_level: FeatureLevel) -> MaterialRelevance {
        MaterialRelevance::from_properties(&self.properties)
    }

    fn update_uniform_expression_cache_if_needed(&self, _feature_level: FeatureLevel) {
        let mut cached = self.cached_uniforms.write();
        if cached.is_none() {
            *cached = Some(self.uniform_data());
            self.cache_builds.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn uniform_expressions(&self) -> Option<MaterialUniformData> {
        *self.cached_uniforms.read()
    }
}

impl std::fmt::Debug for SurfaceMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceMaterial")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("min_feature_level", &self.min_feature_level)
            .finish()
    }
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
pub struct MaterialUniformData {
    pub base_color: Vec4,
    pub metallic_roughness: [f32; 4], // x=metallic, y=roughness, zw=padding
    pub emissive: Vec4,               // xyz=emissive, w=strength
}
