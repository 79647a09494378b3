//! GPU scene data for a single mesh
//!
//! Shaders compiled with GPU scene support read primitive and instance data
//! from structured buffers. Without a scene to build them from, one primitive
//! record and one instance record are synthesized per render, and the buffers
//! the pass never uses are bound to shared zero-filled placeholders.

use crate::pipeline::batch::RequiredFeatures;
use crate::render_graph::{FrameGraphBuilder, ViewRef};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Primitive flag bits
pub mod primitive_flags {
    pub const CAST_SHADOW: u32 = 1 << 0;
    pub const CAST_CONTACT_SHADOW: u32 = 1 << 1;
    pub const EVALUATE_WORLD_POSITION_OFFSET: u32 = 1 << 2;
}

/// Instance whose data has never been updated by a scene
pub const INVALID_LAST_UPDATE_FRAME: u32 = u32::MAX;

/// Float4 elements per instance record
pub const INSTANCE_SCENE_DATA_STRIDE: usize = 5;

/// Bytes per element of the float4 scene buffers
pub const FLOAT4_STRIDE: u32 = std::mem::size_of::<Vec4>() as u32;

/// Bytes per light record
pub const LIGHT_DATA_STRIDE: u32 = 4 * FLOAT4_STRIDE;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PrimitiveSceneData {
    pub local_to_world: Mat4,
    pub world_to_local: Mat4,
    pub actor_world_position: Vec4,
    pub flags: u32,
    pub instance_scene_data_offset: u32,
    pub num_instance_scene_data_entries: u32,
    pub _padding: u32,
}

impl PrimitiveSceneData {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

/// Builder for [`PrimitiveSceneData`], starting from scene defaults
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSceneDataBuilder {
    local_to_world: Mat4,
    actor_world_position: Vec3,
    flags: u32,
}

impl PrimitiveSceneDataBuilder {
    /// Identity transform, casting shadows, no world position offset
    pub fn defaults() -> Self {
        Self {
            local_to_world: Mat4::IDENTITY,
            actor_world_position: Vec3::ZERO,
            flags: primitive_flags::CAST_SHADOW | primitive_flags::CAST_CONTACT_SHADOW,
        }
    }

    pub fn local_to_world(mut self, local_to_world: Mat4) -> Self {
        self.local_to_world = local_to_world;
        self
    }

    pub fn actor_world_position(mut self, position: Vec3) -> Self {
        self.actor_world_position = position;
        self
    }

    fn flag(mut self, flag: u32, enabled: bool) -> Self {
        if enabled {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
        self
    }

    pub fn cast_shadow(self, enabled: bool) -> Self {
        self.flag(primitive_flags::CAST_SHADOW, enabled)
    }

    pub fn cast_contact_shadow(self, enabled: bool) -> Self {
        self.flag(primitive_flags::CAST_CONTACT_SHADOW, enabled)
    }

    pub fn evaluate_world_position_offset(self, enabled: bool) -> Self {
        self.flag(primitive_flags::EVALUATE_WORLD_POSITION_OFFSET, enabled)
    }

    pub fn build(self) -> PrimitiveSceneData {
        PrimitiveSceneData {
            local_to_world: self.local_to_world,
            world_to_local: self.local_to_world.inverse(),
            actor_world_position: self.actor_world_position.extend(1.0),
            flags: self.flags,
            instance_scene_data_offset: 0,
            num_instance_scene_data_entries: 1,
            _padding: 0,
        }
    }
}

/// One instance record as a fixed run of float4s
#[derive(Debug, Clone, Copy)]
pub struct InstanceSceneData {
    pub data: [Vec4; INSTANCE_SCENE_DATA_STRIDE],
}

/// Integer lanes may be NaN as floats, so records compare bit for bit
impl PartialEq for InstanceSceneData {
    fn eq(&self, other: &Self) -> bool {
        self.lanes() == other.lanes()
    }
}

impl Eq for InstanceSceneData {}

impl InstanceSceneData {
    /// Pack an instance. Integer fields are stored bit-exact in float lanes.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        primitive_id: u32,
        relative_id: u32,
        instance_flags: u32,
        last_update_frame: u32,
        custom_data_count: u32,
        random_id: f32,
        local_to_primitive: Mat4,
        primitive_to_world: Mat4,
    ) -> Self {
        let local_to_world = (primitive_to_world * local_to_primitive).transpose();
        Self {
            data: [
                Vec4::new(
                    f32::from_bits(primitive_id),
                    f32::from_bits(relative_id),
                    f32::from_bits(instance_flags),
                    f32::from_bits(last_update_frame),
                ),
                Vec4::new(f32::from_bits(custom_data_count), random_id, 0.0, 0.0),
                local_to_world.x_axis,
                local_to_world.y_axis,
                local_to_world.z_axis,
            ],
        }
    }

    /// Raw bits of every lane, in upload order
    pub fn lanes(&self) -> &[u32] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn primitive_id(&self) -> u32 {
        self.data[0].x.to_bits()
    }

    pub fn relative_id(&self) -> u32 {
        self.data[0].y.to_bits()
    }

    pub fn last_update_frame(&self) -> u32 {
        self.data[0].w.to_bits()
    }

    pub fn custom_data_count(&self) -> u32 {
        self.data[1].x.to_bits()
    }
}

/// Re-lay instance records field-major: element `field * count + instance`
pub fn flatten_instances_soa(instances: &[InstanceSceneData]) -> Vec<Vec4> {
    let count = instances.len();
    let mut out = vec![Vec4::ZERO; count * INSTANCE_SCENE_DATA_STRIDE];
    for (instance_index, instance) in instances.iter().enumerate() {
        for (field, value) in instance.data.iter().enumerate() {
            out[field * count + instance_index] = *value;
        }
    }
    out
}

/// Scene records synthesized for one render
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUniformData {
    pub primitive: PrimitiveSceneData,
    pub instances: Vec<InstanceSceneData>,
}

impl SceneUniformData {
    pub fn num_primitives(&self) -> u32 {
        1
    }

    pub fn num_instances(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Distance between consecutive fields of one instance in the SoA buffer
    pub fn instance_data_soa_stride(&self) -> u32 {
        self.num_instances()
    }

    pub fn instance_data_soa(&self) -> Vec<Vec4> {
        flatten_instances_soa(&self.instances)
    }
}

/// One primitive and one instance for the mesh at `local_to_world`
pub fn synthesize(local_to_world: &Mat4, required: RequiredFeatures) -> SceneUniformData {
    let primitive = PrimitiveSceneDataBuilder::defaults()
        .local_to_world(*local_to_world)
        .actor_world_position(local_to_world.w_axis.truncate())
        .cast_shadow(false)
        .cast_contact_shadow(false)
        .evaluate_world_position_offset(required.world_position_offset)
        .build();

    let instance = InstanceSceneData::build(
        0,
        0,
        0,
        INVALID_LAST_UPDATE_FRAME,
        0,
        0.0,
        Mat4::IDENTITY,
        *local_to_world,
    );

    SceneUniformData {
        primitive,
        instances: vec![instance],
    }
}

/// Counts shaders read alongside the scene buffers
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuSceneUniform {
    pub num_primitives: u32,
    pub num_instances: u32,
    pub instance_data_soa_stride: u32,
    pub _padding: u32,
}

/// Scene buffers bound by the base pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuSceneParameters {
    pub primitive_data: ViewRef,
    pub instance_data: ViewRef,
    pub instance_payload_data: ViewRef,
    pub lightmap_data: ViewRef,
    pub light_data: ViewRef,
    pub num_primitives: u32,
    pub num_instances: u32,
    pub instance_data_soa_stride: u32,
}

impl GpuSceneParameters {
    pub fn uniform(&self) -> GpuSceneUniform {
        GpuSceneUniform {
            num_primitives: self.num_primitives,
            num_instances: self.num_instances,
            instance_data_soa_stride: self.instance_data_soa_stride,
            _padding: 0,
        }
    }

    pub fn shader_resources(&self) -> Vec<(String, ViewRef)> {
        vec![
            ("GPUScenePrimitiveSceneData".to_string(), self.primitive_data),
            ("GPUSceneInstanceSceneData".to_string(), self.instance_data),
            ("GPUSceneInstancePayloadData".to_string(), self.instance_payload_data),
            ("GPUSceneLightmapData".to_string(), self.lightmap_data),
            ("GPUSceneLightData".to_string(), self.light_data),
        ]
    }
}

/// Create the scene buffers and their views in the frame graph
pub fn upload(builder: &mut dyn FrameGraphBuilder, data: &SceneUniformData) -> GpuSceneParameters {
    let primitive_buffer = builder.create_structured_buffer(
        "GPUScenePrimitiveData",
        FLOAT4_STRIDE,
        bytemuck::bytes_of(&data.primitive),
    );
    let instance_soa = data.instance_data_soa();
    let instance_buffer = builder.create_structured_buffer(
        "GPUSceneInstanceData",
        FLOAT4_STRIDE,
        bytemuck::cast_slice(&instance_soa),
    );

    let payload_buffer = builder.create_default_structured_buffer(FLOAT4_STRIDE);
    let lightmap_buffer = builder.create_default_structured_buffer(FLOAT4_STRIDE);
    let light_buffer = builder.create_default_structured_buffer(LIGHT_DATA_STRIDE);

    GpuSceneParameters {
        primitive_data: builder.create_srv(primitive_buffer),
        instance_data: builder.create_srv(instance_buffer),
        instance_payload_data: builder.create_srv(payload_buffer),
        lightmap_data: builder.create_srv(lightmap_buffer),
        light_data: builder.create_srv(light_buffer),
        num_primitives: data.num_primitives(),
        num_instances: data.num_instances(),
        instance_data_soa_stride: data.instance_data_soa_stride(),
    }
}
