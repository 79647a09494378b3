//! View setup for the offscreen render

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

/// Camera placement and lens for one render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewInfo {
    pub location: Vec3,
    pub rotation: Quat,
    pub fov_y_degrees: f32,
    pub near: f32,
}

impl Default for ViewInfo {
    fn default() -> Self {
        Self {
            location: Vec3::new(0.0, 0.0, 5.0),
            rotation: Quat::IDENTITY,
            fov_y_degrees: 90.0,
            near: 0.1,
        }
    }
}

impl ViewInfo {
    pub fn new(location: Vec3, rotation: Quat) -> Self {
        Self {
            location,
            rotation,
            ..Default::default()
        }
    }

    /// Place the view at `location` facing `target`
    pub fn looking_at(location: Vec3, target: Vec3) -> Self {
        let view = Mat4::look_at_rh(location, target, Vec3::Y);
        let rotation = Quat::from_mat4(&view.inverse());
        Self::new(location, rotation)
    }

    pub fn with_fov(mut self, fov_y_degrees: f32) -> Self {
        self.fov_y_degrees = fov_y_degrees;
        self
    }

    pub fn with_near(mut self, near: f32) -> Self {
        self.near = near;
        self
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.location).inverse()
    }

    /// Infinite reversed-Z projection, so the far plane clears to 0
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_infinite_reverse_rh(self.fov_y_degrees.to_radians(), aspect, self.near)
    }

    /// Build view uniform data for a target of the given size
    pub fn uniforms(&self, width: u32, height: u32) -> ViewUniforms {
        let view = self.view_matrix();
        let proj = self.projection_matrix(width, height);
        let view_proj = proj * view;
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);

        ViewUniforms {
            view,
            proj,
            view_proj,
            inv_view: view.inverse(),
            inv_proj: proj.inverse(),
            position: self.location.extend(1.0),
            viewport_size: Vec4::new(w, h, 1.0 / w, 1.0 / h),
        }
    }
}

/// View uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub position: Vec4,
    /// xy = size in pixels, zw = reciprocal size
    pub viewport_size: Vec4,
}
