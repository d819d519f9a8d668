// Device-facing seams between the scene renderer and a graphics backend.

use crate::engine::EngineResult;
use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{
    Color, MeshEffect, MeshHandle, ScreenRect, TextureHandle, Viewport,
};
use crate::engine::graphics::render_state::{
    BlendState, DepthStencilState, RenderState, SamplerState,
};

/// Uploads CPU mesh data and hands back a renderer-owned handle.
pub trait MeshUploader {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> EngineResult<MeshHandle>;
}

pub trait TextureUploader {
    /// `rgba` is tightly packed, `width * height * 4` bytes.
    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> EngineResult<TextureHandle>;

    /// Unknown handles are ignored.
    fn release_texture(&mut self, handle: TextureHandle);
}

/// Immediate-mode drawing surface.
///
/// Calls record work for the current frame; `present` submits it. The device owns the render
/// state; sprite draws and mesh draws both use whatever state is current when they are issued.
pub trait RenderDevice: MeshUploader + TextureUploader {
    fn set_preferred_backbuffer_size(&mut self, width: u32, height: u32);

    /// Applies a pending preferred size.
    fn apply_changes(&mut self) -> EngineResult<()>;

    fn viewport(&self) -> Viewport;

    /// Clears colour and depth. Work recorded earlier in the frame is discarded.
    fn clear(&mut self, color: Color);

    fn draw_mesh(&mut self, mesh: MeshHandle, effect: &MeshEffect);

    fn draw_sprite(&mut self, texture: TextureHandle, dest: ScreenRect, tint: Color);

    fn set_blend_state(&mut self, state: BlendState);

    fn set_depth_stencil_state(&mut self, state: DepthStencilState);

    fn set_sampler_state(&mut self, slot: usize, state: SamplerState);

    fn render_state(&self) -> RenderState;

    /// Submits the recorded frame.
    fn present(&mut self) -> EngineResult<()>;
}
