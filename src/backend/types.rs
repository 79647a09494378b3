//! Common types shared between the render graph and graphics backends

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureUsage(u32);

impl TextureUsage {
    pub const COPY_SRC: Self = Self(1 << 0);
    pub const COPY_DST: Self = Self(1 << 1);
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    pub const STORAGE_BINDING: Self = Self(1 << 3);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const COPY_DST: Self = Self(1 << 0);
    pub const INDEX: Self = Self(1 << 1);
    pub const VERTEX: Self = Self(1 << 2);
    pub const UNIFORM: Self = Self(1 << 3);
    pub const STORAGE: Self = Self(1 << 4);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Fast-clear value a texture is created with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    None,
    Color([f32; 4]),
    Depth { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Far plane for the reversed-Z projections built by [`crate::scene::ViewInfo`].
    pub const DEPTH_FAR: Self = Self::Depth {
        depth: 0.0,
        stencil: 0,
    };
    pub const BLACK: Self = Self::Color([0.0, 0.0, 0.0, 1.0]);
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub clear_value: ClearValue,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            clear_value: ClearValue::None,
        }
    }
}

impl TextureDescriptor {
    /// Describe a 2D depth-stencil target
    pub fn depth_2d(
        width: u32,
        height: u32,
        format: TextureFormat,
        clear_value: ClearValue,
    ) -> Self {
        Self {
            label: None,
            width,
            height,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            clear_value,
        }
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub stride: u32,
    pub usage: BufferUsage,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    TriangleList,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Rasterizer fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

/// Compare function for depth/stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
}

/// Blend component state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

/// Blend state. The default replaces the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub fn opaque() -> Self {
        Self::default()
    }

    pub fn is_opaque(&self) -> bool {
        *self == Self::opaque()
    }
}

/// Which aspects of the depth-stencil target a pass may write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusiveDepthStencil {
    DepthReadStencilRead,
    DepthWriteStencilRead,
    DepthReadStencilWrite,
    DepthWriteStencilWrite,
}

impl ExclusiveDepthStencil {
    pub fn writes_depth(&self) -> bool {
        matches!(
            self,
            Self::DepthWriteStencilRead | Self::DepthWriteStencilWrite
        )
    }

    pub fn writes_stencil(&self) -> bool {
        matches!(
            self,
            Self::DepthReadStencilWrite | Self::DepthWriteStencilWrite
        )
    }
}

/// Depth/stencil test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

impl Default for DepthStencilState {
    /// Depth test against a reversed-Z buffer with writes enabled.
    fn default() -> Self {
        Self {
            depth_write_enabled: true,
            depth_compare: CompareFunction::GreaterEqual,
        }
    }
}

/// Full fixed-function state for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineState {
    pub vertex_shader: u64,
    pub pixel_shader: u64,
    pub topology: PrimitiveTopology,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub depth_stencil_access: ExclusiveDepthStencil,
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(!TextureFormat::Rgba8Unorm.is_depth());
    }

    #[test]
    fn test_usage_flags() {
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        assert!(usage.contains(TextureUsage::RENDER_ATTACHMENT));
        assert!(!usage.contains(TextureUsage::COPY_SRC));
    }

    #[test]
    fn test_exclusive_depth_stencil() {
        assert!(ExclusiveDepthStencil::DepthWriteStencilWrite.writes_depth());
        assert!(ExclusiveDepthStencil::DepthWriteStencilWrite.writes_stencil());
        assert!(!ExclusiveDepthStencil::DepthReadStencilRead.writes_depth());
    }

    #[test]
    fn test_default_blend_is_opaque() {
        assert!(BlendState::default().is_opaque());
    }
}
