//! Dynamic material instances
//!
//! An instance overrides a few named parameters of a parent material and
//! shares everything else with it, shaders included.

use crate::resources::material::*;
use crate::FeatureLevel;
use glam::Vec4;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

pub const BASE_COLOR: &str = "BaseColor";
pub const METALLIC: &str = "Metallic";
pub const ROUGHNESS: &str = "Roughness";
pub const EMISSIVE: &str = "Emissive";
pub const EMISSIVE_STRENGTH: &str = "EmissiveStrength";

pub struct MaterialInstance {
    name: String,
    parent: MaterialRef,
    scalars: RwLock<HashMap<String, f32>>,
    vectors: RwLock<HashMap<String, Vec4>>,
    cached_uniforms: RwLock<Option<MaterialUniformData>>,
    stale: AtomicBool,
}

impl MaterialInstance {
    pub fn new(parent: MaterialRef) -> Self {
        Self {
            name: format!("{}_Dynamic", parent.name()),
            parent,
            scalars: RwLock::new(HashMap::new()),
            vectors: RwLock::new(HashMap::new()),
            cached_uniforms: RwLock::new(None),
            stale: AtomicBool::new(true),
        }
    }

    pub fn parent(&self) -> &MaterialRef {
        &self.parent
    }

    pub fn set_scalar_parameter(&self, name: &str, value: f32) {
        self.scalars.write().insert(name.to_string(), value);
        self.stale.store(true, Ordering::Release);
    }

    pub fn set_vector_parameter(&self, name: &str, value: Vec4) {
        self.vectors.write().insert(name.to_string(), value);
        self.stale.store(true, Ordering::Release);
    }

    pub fn scalar_parameter(&self, name: &str) -> Option<f32> {
        self.scalars.read().get(name).copied()
    }

    pub fn vector_parameter(&self, name: &str) -> Option<Vec4> {
        self.vectors.read().get(name).copied()
    }

    /// True when a parameter changed since the cache was last built
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    fn build_uniforms(&self, base: MaterialUniformData) -> MaterialUniformData {
        let mut data = base;
        let scalars = self.scalars.read();
        let vectors = self.vectors.read();

        if let Some(&color) = vectors.get(BASE_COLOR) {
            data.base_color = color;
        }
        if let Some(&metallic) = scalars.get(METALLIC) {
            data.metallic_roughness[0] = metallic;
        }
        if let Some(&roughness) = scalars.get(ROUGHNESS) {
            data.metallic_roughness[1] = roughness;
        }
        if let Some(&emissive) = vectors.get(EMISSIVE) {
            data.emissive = emissive.truncate().extend(data.emissive.w);
        }
        if let Some(&strength) = scalars.get(EMISSIVE_STRENGTH) {
            data.emissive.w = strength;
        }
        data
    }
}

impl MaterialProxy for MaterialInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn material_no_fallback(&self, feature_level: FeatureLevel) -> Option<&dyn MaterialResource> {
        self.parent.material_no_fallback(feature_level)
    }

    fn fallback(&self, feature_level: FeatureLevel) -> Option<MaterialRef> {
        self.parent.fallback(feature_level)
    }

    fn relevance(&self, feature_level: FeatureLevel) -> MaterialRelevance {
        self.parent.relevance(feature_level)
    }

    fn update_uniform_expression_cache_if_needed(&self, feature_level: FeatureLevel) {
        self.parent
            .update_uniform_expression_cache_if_needed(feature_level);

        if self.stale.swap(false, Ordering::AcqRel) {
            let base = self.parent.uniform_expressions().unwrap_or_default();
            *self.cached_uniforms.write() = Some(self.build_uniforms(base));
            log::trace!("Rebuilt uniform expressions for '{}'", self.name);
        }
    }

    fn uniform_expressions(&self) -> Option<MaterialUniformData> {
        *self.cached_uniforms.read()
    }
}

impl std::fmt::Debug for MaterialInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialInstance")
            .field("name", &self.name)
            .field("parent", &self.parent.name())
            .field("stale", &self.is_stale())
            .finish()
    }
}
