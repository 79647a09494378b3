//! Single-mesh base pass pipeline
//!
//! 1. Batch building - mesh sections of one LOD become draw batches
//! 2. Scene data - one primitive and one instance record uploaded as GPU scene buffers
//! 3. Pass processing - shader resolution with material fallback, one draw per batch
//! 4. Base pass - targets, scene data and the raster pass registered with the frame graph

pub mod base_pass;
pub mod batch;
pub mod processor;
pub mod scene_data;
pub mod shaders;

pub use base_pass::{BasePassRenderer, FrameStage, MeshRenderRequest, SubmittedPass};
pub use batch::{build_mesh_batches, MeshBatch, RequiredFeatures};
pub use processor::MeshPassProcessor;
pub use scene_data::{GpuSceneParameters, SceneUniformData};
pub use shaders::BasePassShaders;
