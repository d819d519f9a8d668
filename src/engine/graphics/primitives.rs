//! Small value types shared by the scene renderer and the device backends.

use glam::{Mat4, Vec3};

/// Renderer-owned GPU mesh (vertex + index buffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Renderer-owned GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub rgba: [f32; 4],
}

impl Color {
    pub const WHITE: Color = Color::from_rgb8(255, 255, 255);
    pub const RED: Color = Color::from_rgb8(255, 0, 0);
    pub const YELLOW: Color = Color::from_rgb8(255, 255, 0);
    pub const AQUAMARINE: Color = Color::from_rgb8(127, 255, 212);
    pub const MEDIUM_VIOLET_RED: Color = Color::from_rgb8(199, 21, 133);
    pub const BLANCHED_ALMOND: Color = Color::from_rgb8(255, 235, 205);
    pub const ALICE_BLUE: Color = Color::from_rgb8(240, 248, 255);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { rgba: [r, g, b, a] }
    }

    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.rgba[0], self.rgba[1], self.rgba[2])
    }
}

/// Pixel-space rectangle, origin at the top-left of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Current output surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub diffuse_color: Vec3,
}

/// Fixed-function style effect parameters for one sub-mesh draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshEffect {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub diffuse_color: Vec3,
    /// A zero `direction` contributes no shading, which leaves the mesh flat-shaded.
    pub light: DirectionalLight,
}
