//! Output-merger / sampler state shared by 3D mesh drawing and 2D sprite drawing.
//!
//! Sprite drawing switches the device into alpha-blended, depth-less mode. Anything drawn
//! as a mesh afterwards needs the 3D state back, so 2D work is wrapped in a [`SpriteScope`]
//! which restores it when it ends.

use crate::engine::graphics::RenderDevice;
use crate::engine::graphics::primitives::{Color, ScreenRect, TextureHandle};

pub const SAMPLER_SLOTS: usize = 2;

/// Sampler slot the 3D state pins to `LinearClamp`.
pub const MESH_SAMPLER_SLOT: usize = 1;

/// Sampler slot sprite drawing samples from.
pub const SPRITE_SAMPLER_SLOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendState {
    Opaque,
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthStencilState {
    /// Depth test and depth write enabled.
    Default,
    /// No depth test, no depth write.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerState {
    LinearWrap,
    LinearClamp,
    PointClamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub samplers: [SamplerState; SAMPLER_SLOTS],
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend: BlendState::Opaque,
            depth_stencil: DepthStencilState::Default,
            samplers: [SamplerState::LinearWrap; SAMPLER_SLOTS],
        }
    }
}

impl RenderState {
    /// True when meshes drawn now would get opaque, depth-tested output.
    pub fn is_mesh_compatible(&self) -> bool {
        self.blend == BlendState::Opaque
            && self.depth_stencil == DepthStencilState::Default
            && self.samplers[MESH_SAMPLER_SLOT] == SamplerState::LinearClamp
    }

    pub fn set_sampler(&mut self, slot: usize, state: SamplerState) {
        if let Some(s) = self.samplers.get_mut(slot) {
            *s = state;
        }
    }
}

/// Puts the device back into mesh-drawing state.
///
/// Postcondition: `device.render_state().is_mesh_compatible()`.
pub fn restore_3d_state<D: RenderDevice + ?Sized>(device: &mut D) {
    device.set_blend_state(BlendState::Opaque);
    device.set_depth_stencil_state(DepthStencilState::Default);
    device.set_sampler_state(MESH_SAMPLER_SLOT, SamplerState::LinearClamp);
}

/// Scoped 2D drawing mode.
///
/// `begin` switches to sprite state; dropping the scope restores 3D state.
pub struct SpriteScope<'a, D: RenderDevice + ?Sized> {
    device: &'a mut D,
    sprites: usize,
}

impl<'a, D: RenderDevice + ?Sized> SpriteScope<'a, D> {
    pub fn begin(device: &'a mut D) -> Self {
        device.set_blend_state(BlendState::AlphaBlend);
        device.set_depth_stencil_state(DepthStencilState::None);
        device.set_sampler_state(SPRITE_SAMPLER_SLOT, SamplerState::LinearClamp);
        Self { device, sprites: 0 }
    }

    /// Draws `texture` stretched to fill `dest`.
    pub fn draw(&mut self, texture: TextureHandle, dest: ScreenRect, tint: Color) {
        self.device.draw_sprite(texture, dest, tint);
        self.sprites += 1;
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites
    }
}

impl<D: RenderDevice + ?Sized> Drop for SpriteScope<'_, D> {
    fn drop(&mut self) {
        restore_3d_state(&mut *self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::test_support::RecordingDevice;

    #[test]
    fn fresh_state_is_not_yet_mesh_compatible() {
        // Slot 1 starts as LinearWrap until the first restore.
        assert!(!RenderState::default().is_mesh_compatible());
    }

    #[test]
    fn scope_switches_to_sprite_state_then_restores() {
        let mut device = RecordingDevice::new(1000, 850);
        {
            let mut scope = SpriteScope::begin(&mut device);
            scope.draw(TextureHandle(3), ScreenRect::new(0, 0, 10, 10), Color::WHITE);
            assert_eq!(scope.sprite_count(), 1);
        }

        assert_eq!(device.sprites().len(), 1);
        let during = device.sprites()[0].state;
        assert_eq!(during.blend, BlendState::AlphaBlend);
        assert_eq!(during.depth_stencil, DepthStencilState::None);

        assert!(device.render_state().is_mesh_compatible());
    }

    #[test]
    fn empty_scope_still_restores() {
        let mut device = RecordingDevice::new(640, 480);
        drop(SpriteScope::begin(&mut device));
        assert!(device.render_state().is_mesh_compatible());
    }

    #[test]
    fn restore_is_idempotent() {
        let mut device = RecordingDevice::new(640, 480);
        restore_3d_state(&mut device);
        let once = device.render_state();
        restore_3d_state(&mut device);
        assert_eq!(device.render_state(), once);
    }
}
