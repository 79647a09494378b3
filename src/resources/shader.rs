//! Shader identities, permutation keys and compilation environments

use crate::resources::mesh::VertexLayoutKind;
use std::collections::{BTreeMap, HashMap};

/// Identity of one compiled shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderRef {
    pub id: u64,
}

impl ShaderRef {
    pub const fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Vertex and pixel shader resolved for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderPair {
    pub vertex: ShaderRef,
    pub pixel: ShaderRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Feature switches selecting a permutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PermutationKeys {
    pub world_position_offset: bool,
    pub gpu_scene: bool,
    pub instance_culling: bool,
}

/// Preprocessor defines passed to the shader compiler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationEnvironment {
    defines: BTreeMap<String, String>,
}

impl CompilationEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_define(&mut self, name: &str, value: impl ToString) {
        self.defines.insert(name.to_string(), value.to_string());
    }

    pub fn define(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    pub fn defines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything a material needs to look up a shader pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRequest {
    pub keys: PermutationKeys,
    pub vertex_layout: VertexLayoutKind,
    pub vertex_environment: CompilationEnvironment,
    pub pixel_environment: CompilationEnvironment,
}

/// Compiled shader pairs of one material
#[derive(Debug, Clone, Default)]
pub struct ShaderMap {
    entries: HashMap<(PermutationKeys, VertexLayoutKind), ShaderPair>,
    /// Pair used for every permutation, as the engine default material has
    universal: Option<ShaderPair>,
}

impl ShaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keys: PermutationKeys, layout: VertexLayoutKind, pair: ShaderPair) {
        self.entries.insert((keys, layout), pair);
    }

    pub fn set_universal(&mut self, pair: ShaderPair) {
        self.universal = Some(pair);
    }

    pub fn find(&self, request: &ShaderRequest) -> Option<ShaderPair> {
        self.entries
            .get(&(request.keys, request.vertex_layout))
            .copied()
            .or(self.universal)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.universal.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(wpo: bool) -> ShaderRequest {
        ShaderRequest {
            keys: PermutationKeys {
                world_position_offset: wpo,
                gpu_scene: true,
                instance_culling: false,
            },
            vertex_layout: VertexLayoutKind::Local,
            vertex_environment: CompilationEnvironment::new(),
            pixel_environment: CompilationEnvironment::new(),
        }
    }

    #[test]
    fn test_shader_map_lookup() {
        let pair = ShaderPair {
            vertex: ShaderRef::new(1),
            pixel: ShaderRef::new(2),
        };
        let mut map = ShaderMap::new();
        map.insert(request(false).keys, VertexLayoutKind::Local, pair);

        assert_eq!(map.find(&request(false)), Some(pair));
        assert_eq!(map.find(&request(true)), None);
    }

    #[test]
    fn test_universal_pair_matches_everything() {
        let pair = ShaderPair {
            vertex: ShaderRef::new(10),
            pixel: ShaderRef::new(11),
        };
        let mut map = ShaderMap::new();
        map.set_universal(pair);
        assert_eq!(map.find(&request(true)), Some(pair));
    }

    #[test]
    fn test_environment_defines() {
        let mut env = CompilationEnvironment::new();
        env.set_define("USE_INSTANCE_CULLING", 0);
        assert_eq!(env.define("USE_INSTANCE_CULLING"), Some("0"));
        assert_eq!(env.define("MISSING"), None);
    }
}
