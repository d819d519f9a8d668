//! In-memory collaborators for renderer tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;

use crate::engine::graphics::mesh::{CpuMesh, CpuVertex, Model};
use crate::engine::graphics::primitives::{
    Color, MeshEffect, MeshHandle, ScreenRect, TextureHandle, Viewport,
};
use crate::engine::graphics::render_assets::AssetLoader;
use crate::engine::graphics::render_state::{
    BlendState, DepthStencilState, RenderState, SamplerState,
};
use crate::engine::graphics::{MeshUploader, RenderDevice, TextureUploader};
use crate::engine::video::{MediaState, Playback, Video, VideoFrame};
use crate::engine::{AssetKind, EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct MeshDraw {
    pub mesh: MeshHandle,
    pub effect: MeshEffect,
    pub state: RenderState,
}

#[derive(Debug, Clone)]
pub struct SpriteDraw {
    pub texture: TextureHandle,
    pub dest: ScreenRect,
    pub tint: Color,
    pub state: RenderState,
}

/// Records every device call instead of talking to a GPU.
#[derive(Debug)]
pub struct RecordingDevice {
    viewport: Viewport,
    preferred: Option<(u32, u32)>,
    state: RenderState,
    meshes: Vec<CpuMesh>,
    textures: HashMap<TextureHandle, (u32, u32)>,
    next_texture: u32,
    released: Vec<TextureHandle>,
    clears: Vec<Color>,
    mesh_draws: Vec<MeshDraw>,
    sprites: Vec<SpriteDraw>,
    presents: usize,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport { width, height },
            preferred: None,
            state: RenderState::default(),
            meshes: Vec::new(),
            textures: HashMap::new(),
            next_texture: 0,
            released: Vec::new(),
            clears: Vec::new(),
            mesh_draws: Vec::new(),
            sprites: Vec::new(),
            presents: 0,
        }
    }

    /// Simulates the window being resized by the user.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport { width, height };
    }

    /// Forgets recorded draws (uploads and textures are kept).
    pub fn reset_frame(&mut self) {
        self.clears.clear();
        self.mesh_draws.clear();
        self.sprites.clear();
    }

    pub fn uploaded_meshes(&self) -> &[CpuMesh] {
        &self.meshes
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn released_textures(&self) -> &[TextureHandle] {
        &self.released
    }

    pub fn clears(&self) -> &[Color] {
        &self.clears
    }

    pub fn mesh_draws(&self) -> &[MeshDraw] {
        &self.mesh_draws
    }

    pub fn draws_of(&self, mesh: MeshHandle) -> Vec<&MeshDraw> {
        self.mesh_draws.iter().filter(|d| d.mesh == mesh).collect()
    }

    pub fn sprites(&self) -> &[SpriteDraw] {
        &self.sprites
    }

    pub fn presents(&self) -> usize {
        self.presents
    }
}

impl MeshUploader for RecordingDevice {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> EngineResult<MeshHandle> {
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(mesh.clone());
        Ok(handle)
    }
}

impl TextureUploader for RecordingDevice {
    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> EngineResult<TextureHandle> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(EngineError::graphics("texture rgba length mismatch"));
        }
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, (width, height));
        Ok(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_some() {
            self.released.push(handle);
        }
    }
}

impl RenderDevice for RecordingDevice {
    fn set_preferred_backbuffer_size(&mut self, width: u32, height: u32) {
        self.preferred = Some((width, height));
    }

    fn apply_changes(&mut self) -> EngineResult<()> {
        if let Some((width, height)) = self.preferred.take() {
            self.viewport = Viewport { width, height };
        }
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self, color: Color) {
        self.clears.push(color);
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, effect: &MeshEffect) {
        self.mesh_draws.push(MeshDraw {
            mesh,
            effect: *effect,
            state: self.state,
        });
    }

    fn draw_sprite(&mut self, texture: TextureHandle, dest: ScreenRect, tint: Color) {
        self.sprites.push(SpriteDraw {
            texture,
            dest,
            tint,
            state: self.state,
        });
    }

    fn set_blend_state(&mut self, state: BlendState) {
        self.state.blend = state;
    }

    fn set_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.state.depth_stencil = state;
    }

    fn set_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.state.set_sampler(slot, state);
    }

    fn render_state(&self) -> RenderState {
        self.state
    }

    fn present(&mut self) -> EngineResult<()> {
        self.presents += 1;
        Ok(())
    }
}

/// Content source that fabricates a one-triangle model per requested name.
#[derive(Debug, Default)]
pub struct FakeContent {
    missing: Vec<String>,
    handles: HashMap<String, MeshHandle>,
    videos_loaded: usize,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `name` unavailable.
    pub fn without(mut self, name: &str) -> Self {
        self.missing.push(name.to_string());
        self
    }

    /// Mesh handle the model `name` was uploaded as.
    pub fn mesh(&self, name: &str) -> MeshHandle {
        self.handles[name]
    }

    pub fn videos_loaded(&self) -> usize {
        self.videos_loaded
    }

    fn not_found(&self, kind: AssetKind, name: &str) -> EngineError {
        EngineError::AssetNotFound {
            kind,
            name: name.to_string(),
            root: PathBuf::from("fake"),
        }
    }
}

impl AssetLoader for FakeContent {
    fn load_model(&mut self, uploader: &mut dyn MeshUploader, name: &str) -> EngineResult<Model> {
        if self.missing.iter().any(|m| m == name) {
            return Err(self.not_found(AssetKind::Model, name));
        }
        let triangle = CpuMesh::new(
            vec![
                CpuVertex::default(),
                CpuVertex {
                    pos: [1.0, 0.0, 0.0],
                    normal: [0.0, 1.0, 0.0],
                },
                CpuVertex {
                    pos: [0.0, 1.0, 0.0],
                    normal: [0.0, 1.0, 0.0],
                },
            ],
            vec![0, 1, 2],
        );
        let handle = uploader.upload_mesh(&triangle)?;
        self.handles.insert(name.to_string(), handle);
        Ok(Model::single_bone(name, [handle]))
    }

    fn load_video(&mut self, name: &str) -> EngineResult<Video> {
        if self.missing.iter().any(|m| m == name) {
            return Err(self.not_found(AssetKind::Video, name));
        }
        self.videos_loaded += 1;
        Ok(Video::new(name, vec![PathBuf::from("frame_000.png")], 30.0))
    }
}

/// Playback whose frames are set directly by the test.
#[derive(Debug)]
pub struct ScriptedPlayback {
    state: MediaState,
    frame: Option<VideoFrame>,
    played: Vec<String>,
}

impl ScriptedPlayback {
    pub fn new() -> Self {
        Self {
            state: MediaState::Stopped,
            frame: None,
            played: Vec::new(),
        }
    }

    /// Next `current_frame` calls return a 4x4 frame with this index.
    pub fn show_frame(&mut self, index: usize) {
        self.frame = Some(VideoFrame {
            index,
            image: Arc::new(RgbaImage::new(4, 4)),
        });
    }

    pub fn hide_frame(&mut self) {
        self.frame = None;
    }

    pub fn stop(&mut self) {
        self.state = MediaState::Stopped;
    }

    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl Playback for ScriptedPlayback {
    fn play(&mut self, video: Arc<Video>) {
        self.played.push(video.name().to_string());
        self.state = MediaState::Playing;
    }

    fn state(&self) -> MediaState {
        self.state
    }

    fn current_frame(&mut self, _now_ms: u64) -> Option<VideoFrame> {
        if self.state != MediaState::Playing {
            return None;
        }
        self.frame.clone()
    }
}
