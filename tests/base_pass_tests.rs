//! Base pass behavior, end to end through the frame graph and the recording backend.

mod common;

use std::sync::Arc;

use common::{material_ref, BackendEvent, RecordingBackend};
use glam::{Mat4, Vec3, Vec4};
use offscreen_mesh_renderer::backend::*;
use offscreen_mesh_renderer::pipeline::base_pass::{SCENE_UNIFORM_NAME, VIEW_UNIFORM_NAME};
use offscreen_mesh_renderer::pipeline::scene_data::{primitive_flags, PrimitiveSceneData};
use offscreen_mesh_renderer::pipeline::{
    BasePassRenderer, FrameStage, MeshRenderRequest, SubmittedPass,
};
use offscreen_mesh_renderer::render_graph::{ExecutionSummary, FrameGraphBuilder, GraphBuilder};
use offscreen_mesh_renderer::resources::{
    MaterialRef, MeshAsset, ShaderPair, ShaderRef, SurfaceMaterial,
};
use offscreen_mesh_renderer::scene::{ViewInfo, ViewUniforms};
use offscreen_mesh_renderer::{RenderError, RenderResult, RendererConfig};
use rstest::rstest;

// ============================================================================
// Helpers
// ============================================================================

/// Register and, on success, execute one frame the way the render thread does
fn render_frame(
    backend: &mut RecordingBackend,
    renderer: &mut BasePassRenderer,
    request: &MeshRenderRequest,
) -> (RenderResult<SubmittedPass>, ExecutionSummary) {
    let target = common::target(320, 240);
    let mut builder = GraphBuilder::new(backend);
    let result = renderer.render(&mut builder, request, &ViewInfo::default(), &target);
    let summary = match result {
        Ok(_) => builder.execute(),
        Err(_) => ExecutionSummary::default(),
    };
    (result, summary)
}

fn renderer() -> BasePassRenderer {
    BasePassRenderer::new(&RendererConfig::default())
}

fn single_material_mesh(sections: &[(usize, u32)]) -> (Arc<MeshAsset>, Arc<SurfaceMaterial>) {
    let material = common::compiled_material("Surface", 1, 2);
    let mesh = common::mesh("mesh", sections, &[Some(material_ref(&material))]);
    (mesh, material)
}

fn buffer_data(backend: &RecordingBackend, label: &str) -> Vec<u8> {
    backend
        .created_buffers()
        .into_iter()
        .find(|(_, name, _, _)| name.as_deref() == Some(label))
        .map(|(_, _, _, data)| data)
        .unwrap()
}

// ============================================================================
// Batches and Draws
// ============================================================================

/// Tests that every section becomes one draw, in section order
#[rstest]
#[case::one_section(1)]
#[case::two_sections(2)]
#[case::five_sections(5)]
fn test_one_draw_per_section_in_order(#[case] sections: usize) {
    common::init_logging();
    let layout: Vec<(usize, u32)> = (0..sections).map(|_| (0, 4)).collect();
    let (mesh, _material) = single_material_mesh(&layout);
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let mut renderer = renderer();
    let (result, summary) = render_frame(&mut backend, &mut renderer, &request);

    assert_eq!(result.unwrap().batch_count, sections);
    assert_eq!(summary.draw_commands, sections);
    let expected: Vec<_> = (0..sections as u32).map(|i| i * 12..(i + 1) * 12).collect();
    assert_eq!(backend.draws(), expected);
}

#[rstest]
#[case::first_lod(0, 0..30)]
#[case::last_lod(1, 0..12)]
#[case::clamped(7, 0..12)]
fn test_lod_index_is_clamped(#[case] lod_index: usize, #[case] expected: std::ops::Range<u32>) {
    let material = common::compiled_material("Surface", 1, 2);
    let mesh = Arc::new(
        MeshAsset::new("lods")
            .with_lod(common::lod(&[(0, 10)]))
            .with_lod(common::lod(&[(0, 4)]))
            .with_material(Some(material_ref(&material))),
    );
    let request = MeshRenderRequest::new(&mesh, lod_index, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (result, _) = render_frame(&mut backend, &mut renderer(), &request);

    assert!(result.is_ok());
    assert_eq!(backend.draws(), vec![expected]);
}

/// Tests a mesh with two sections where only the first is overridden:
/// - section 0 uses the override, section 1 the mesh's own material
/// - both draws cover their section's index range
#[test]
fn test_override_applies_to_its_slot_only() {
    let first = common::compiled_material("First", 10, 11);
    let second = common::compiled_material("Second", 20, 21);
    let custom = common::compiled_material("Custom", 5, 6);
    let mesh = common::mesh(
        "two_sections",
        &[(0, 100), (1, 50)],
        &[Some(material_ref(&first)), Some(material_ref(&second))],
    );
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY)
        .with_overrides(&[Some(material_ref(&custom)), Some(material_ref(&second))]);

    let mut backend = RecordingBackend::new();
    let (result, summary) = render_frame(&mut backend, &mut renderer(), &request);

    let submitted = result.unwrap();
    assert_eq!(submitted.materials, vec!["Custom".to_string(), "Second".to_string()]);
    assert_eq!(summary.draw_commands, 2);
    assert_eq!(backend.draws(), vec![0..300, 300..450]);

    let shaders: Vec<(u64, u64)> = backend
        .graphics_states()
        .iter()
        .map(|s| (s.vertex_shader, s.pixel_shader))
        .collect();
    assert_eq!(shaders, vec![(5, 6), (20, 21)]);
}

#[test]
fn test_missing_shaders_drop_only_that_batch() {
    common::init_logging();
    let good = common::compiled_material("Good", 1, 2);
    let broken = common::broken_material("Broken");
    let mesh = common::mesh(
        "mixed",
        &[(0, 10), (1, 10)],
        &[Some(material_ref(&good)), Some(material_ref(&broken))],
    );
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (result, summary) = render_frame(&mut backend, &mut renderer(), &request);

    assert_eq!(result.unwrap().batch_count, 2);
    assert_eq!(summary.draw_commands, 1);
    assert_eq!(summary.dropped_batches, 1);
    assert_eq!(backend.draws(), vec![0..30]);
}

#[test]
fn test_missing_shaders_use_fallback_material() {
    let fallback: MaterialRef = Arc::new(SurfaceMaterial::default_surface(ShaderPair {
        vertex: ShaderRef::new(90),
        pixel: ShaderRef::new(91),
    }));
    let broken = Arc::new(SurfaceMaterial::new("Broken").with_fallback(fallback));
    let mesh = common::mesh("mesh", &[(0, 10)], &[Some(material_ref(&broken))]);
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (_, summary) = render_frame(&mut backend, &mut renderer(), &request);

    assert_eq!(summary.draw_commands, 1);
    assert_eq!(summary.dropped_batches, 0);
    assert_eq!(backend.graphics_states()[0].vertex_shader, 90);
}

#[test]
fn test_mirrored_transform_reverses_culling() {
    let (mesh, _material) = single_material_mesh(&[(0, 4)]);
    let mirrored = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));

    let mut backend = RecordingBackend::new();
    for transform in [Mat4::IDENTITY, mirrored] {
        let request = MeshRenderRequest::new(&mesh, 0, transform);
        let (result, _) = render_frame(&mut backend, &mut renderer(), &request);
        assert!(result.is_ok());
    }

    let culls: Vec<CullMode> = backend.graphics_states().iter().map(|s| s.cull_mode).collect();
    assert_eq!(culls, vec![CullMode::Back, CullMode::Front]);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_compiling_mesh_is_not_ready() {
    let (mesh, _material) = single_material_mesh(&[(0, 4)]);
    mesh.set_compiling(true);
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let mut renderer = renderer();
    let (result, _) = render_frame(&mut backend, &mut renderer, &request);

    assert!(matches!(result, Err(RenderError::AssetNotReady(_))));
    assert_eq!(renderer.stage(), FrameStage::TargetsAcquired);
    assert!(backend.events().is_empty());
}

#[rstest]
#[case::no_lods(Arc::new(MeshAsset::new("empty")))]
#[case::empty_sections(common::mesh("degenerate", &[(0, 0), (0, 0)], &[None]))]
#[case::no_materials(common::mesh("bare", &[(0, 4)], &[]))]
fn test_nothing_to_draw(#[case] mesh: Arc<MeshAsset>) {
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (result, _) = render_frame(&mut backend, &mut renderer(), &request);

    assert!(matches!(result, Err(RenderError::NoRenderableGeometry(_))));
    assert!(!backend.wrote_to_view(TextureViewHandle::from_raw(common::TARGET_VIEW)));
}

// ============================================================================
// Scene Data
// ============================================================================

/// Tests the synthesized scene:
/// - one primitive record and one five-row instance record
/// - the two shared placeholders (payload/lightmap and light)
/// - view and scene uniforms bound
#[test]
fn test_scene_has_one_primitive_and_one_instance() {
    let (mesh, _material) = single_material_mesh(&[(0, 4)]);
    let transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let request = MeshRenderRequest::new(&mesh, 0, transform);

    let mut backend = RecordingBackend::new();
    let (result, _) = render_frame(&mut backend, &mut renderer(), &request);
    assert!(result.is_ok());

    assert_eq!(backend.created_buffers().len(), 4);

    let primitive = buffer_data(&backend, "GPUScenePrimitiveData");
    assert_eq!(primitive.len(), std::mem::size_of::<PrimitiveSceneData>());
    let primitive: PrimitiveSceneData = bytemuck::pod_read_unaligned(&primitive);
    assert_eq!(primitive.local_to_world, transform);
    assert_eq!(primitive.actor_world_position, Vec4::new(1.0, 2.0, 3.0, 1.0));
    assert!(!primitive.has_flag(primitive_flags::CAST_SHADOW));

    let instances = buffer_data(&backend, "GPUSceneInstanceData");
    assert_eq!(instances.len(), 5 * 16);

    let uniforms: Vec<(String, usize)> = backend
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BackendEvent::BindUniform { name, size } => Some((name, size)),
            _ => None,
        })
        .collect();
    let view_uniform = (
        VIEW_UNIFORM_NAME.to_string(),
        std::mem::size_of::<ViewUniforms>(),
    );
    assert!(uniforms.contains(&view_uniform));
    assert!(uniforms.iter().any(|(name, _)| name == SCENE_UNIFORM_NAME));
}

#[rstest]
#[case::neither(false, false, false)]
#[case::first(true, false, true)]
#[case::second(false, true, true)]
#[case::both(true, true, true)]
fn test_world_position_offset_is_aggregated(
    #[case] first_wpo: bool,
    #[case] second_wpo: bool,
    #[case] expected: bool,
) {
    let pick = |wpo: bool, name: &str, vs: u64| {
        if wpo {
            common::wpo_material(name, vs, vs + 1)
        } else {
            common::compiled_material(name, vs, vs + 1)
        }
    };
    let first = pick(first_wpo, "First", 1);
    let second = pick(second_wpo, "Second", 3);
    let mesh = common::mesh(
        "mesh",
        &[(0, 4), (1, 4)],
        &[Some(material_ref(&first)), Some(material_ref(&second))],
    );
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (result, _) = render_frame(&mut backend, &mut renderer(), &request);

    assert_eq!(result.unwrap().required_features.world_position_offset, expected);
    let primitive: PrimitiveSceneData =
        bytemuck::pod_read_unaligned(&buffer_data(&backend, "GPUScenePrimitiveData"));
    assert_eq!(
        primitive.has_flag(primitive_flags::EVALUATE_WORLD_POSITION_OFFSET),
        expected
    );
}

#[test]
fn test_repeated_render_is_identical() {
    let (mesh, _material) = single_material_mesh(&[(0, 4), (0, 8)]);
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::from_rotation_y(0.5));

    let mut first_backend = RecordingBackend::new();
    let mut second_backend = RecordingBackend::new();
    let mut renderer = renderer();
    let (first, _) = render_frame(&mut first_backend, &mut renderer, &request);
    let (second, _) = render_frame(&mut second_backend, &mut renderer, &request);

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(first_backend.events(), second_backend.events());
}

#[test]
fn test_frame_releases_all_transient_resources() {
    let (mesh, _material) = single_material_mesh(&[(0, 4)]);
    let request = MeshRenderRequest::new(&mesh, 0, Mat4::IDENTITY);

    let mut backend = RecordingBackend::new();
    let (_, summary) = render_frame(&mut backend, &mut renderer(), &request);

    let events = backend.events();
    let created_buffers = backend.created_buffers().len();
    let destroyed_buffers = events
        .iter()
        .filter(|e| matches!(e, BackendEvent::DestroyBuffer(_)))
        .count();
    let destroyed_textures = events
        .iter()
        .filter(|e| matches!(e, BackendEvent::DestroyTexture(_)))
        .count();

    assert_eq!(summary.transient_buffers, created_buffers);
    assert_eq!(destroyed_buffers, created_buffers);
    // Only the depth target is transient; the color target is external
    assert_eq!(summary.transient_textures, 1);
    assert_eq!(destroyed_textures, 1);
    assert!(backend.wrote_to_view(TextureViewHandle::from_raw(common::TARGET_VIEW)));
}
