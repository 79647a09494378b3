//! Base pass shader permutations
//!
//! The pass only has one vertex/pixel pair, compiled for opaque surface
//! materials on the plain local vertex layout. Instance culling is always
//! off because exactly one instance is ever drawn.

use crate::resources::{
    BlendMode, CompilationEnvironment, MaterialDomain, MaterialProperties, PermutationKeys,
    ShaderRequest, ShaderStage, VertexLayoutKind,
};

/// Inputs deciding whether a permutation exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationParameters {
    pub properties: MaterialProperties,
    pub vertex_layout: VertexLayoutKind,
}

pub struct BasePassShaders;

impl BasePassShaders {
    pub fn should_compile_permutation(params: &PermutationParameters) -> bool {
        params.properties.domain == MaterialDomain::Surface
            && params.properties.blend_mode == BlendMode::Opaque
            && params.vertex_layout == VertexLayoutKind::Local
    }

    pub fn modify_compilation_environment(stage: ShaderStage, env: &mut CompilationEnvironment) {
        env.set_define("USE_INSTANCE_CULLING_DATA", 0);
        env.set_define("USE_INSTANCE_CULLING", 0);

        if stage == ShaderStage::Pixel {
            env.set_define("NEEDS_LIGHTMAP_COORDINATE", 0);
            env.set_define("SCENE_TEXTURES_DISABLED", 1);
        }
    }

    pub fn permutation_keys(world_position_offset: bool) -> PermutationKeys {
        PermutationKeys {
            world_position_offset,
            gpu_scene: true,
            instance_culling: false,
        }
    }

    /// Shader lookup for one batch
    pub fn request(world_position_offset: bool, vertex_layout: VertexLayoutKind) -> ShaderRequest {
        let mut vertex_environment = CompilationEnvironment::new();
        Self::modify_compilation_environment(ShaderStage::Vertex, &mut vertex_environment);

        let mut pixel_environment = CompilationEnvironment::new();
        Self::modify_compilation_environment(ShaderStage::Pixel, &mut pixel_environment);

        ShaderRequest {
            keys: Self::permutation_keys(world_position_offset),
            vertex_layout,
            vertex_environment,
            pixel_environment,
        }
    }
}
