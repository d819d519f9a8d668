//! Draws one frame of the snake arena.
//!
//! Every frame is rebuilt from scratch: the host hands over the player snapshot and food state,
//! `SceneRenderer` clears the surface and submits each model as flat-tinted meshes. When the
//! promo video is playing it is composited on top in four screen corners.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::engine::EngineResult;
use crate::engine::camera::CameraState;
use crate::engine::graphics::mesh::Model;
use crate::engine::graphics::primitives::{
    Color, DirectionalLight, MeshEffect, ScreenRect, TextureHandle, Viewport,
};
use crate::engine::graphics::render_assets::AssetLoader;
use crate::engine::graphics::render_state::{SpriteScope, restore_3d_state};
use crate::engine::graphics::RenderDevice;
use crate::engine::player::PlayerSnapshot;
use crate::engine::video::{MediaState, Playback, Video, VideoPlayer};

pub const BACKBUFFER_WIDTH: u32 = 1000;
pub const BACKBUFFER_HEIGHT: u32 = 850;
pub const BACKGROUND_COLOR: Color = Color::AQUAMARINE;

pub const PLAYER_ROTATION_STEP: f32 = 0.025;
pub const ENRAGED_ROTATION_STEP: f32 = 0.05;
pub const SKYBOX_ROTATION_STEP: f32 = 0.003;
pub const MIN_TAIL_SCALE: f32 = 0.5;

/// Side length of each video overlay square, in pixels.
pub const OVERLAY_SIZE: i32 = 250;

const BANNER_POSITION: Vec3 = Vec3::new(0.0, 700.0, 0.0);
const BANNER_SCALE: f32 = 2.5;
/// Divisor of the enraged banner's pulse: the sine runs on raw milliseconds.
const BANNER_PULSE_PERIOD_MS: f64 = 1.0;
const SKYBOX_POSITION: Vec3 = Vec3::new(0.0, -3400.0, 0.0);
const SKYBOX_SCALE: f32 = 12.0;
const CORNER_SCALE: f32 = 2.0;
const GAME_OVER_TITLE_POSITION: Vec3 = Vec3::new(0.0, 500.0, 0.0);
const GAME_OVER_SCALE: f32 = 3.5;

/// Where the "ultimate" decorations float while the player is enraged.
pub const CORNER_POSITIONS: [Vec3; 4] = [
    Vec3::new(-2000.0, 300.0, -2000.0),
    Vec3::new(-2000.0, 300.0, 2000.0),
    Vec3::new(2000.0, 300.0, -2000.0),
    Vec3::new(2000.0, 300.0, 2000.0),
];

const DEFAULT_LIGHT: DirectionalLight = DirectionalLight {
    direction: Vec3::ZERO,
    diffuse_color: Vec3::ONE,
};

/// Logical content names.
pub mod asset_names {
    pub const SNEK_TEXT: &str = "Models/3DSnekText";
    pub const SNEK_TEXT_SQUARE: &str = "Models/3DSnekSquareText";
    pub const SNAKE_HEAD: &str = "Models/snakeHead";
    pub const ARENA: &str = "Models/arena";
    pub const GAME_OVER_TEXT: &str = "Models/GameOverText";
    pub const GAME_OVER_OPTIONS_TEXT: &str = "Models/GameOverMenuText";
    pub const ULTIMATE_TEXT: &str = "Models/ultimateText";
    pub const SKYBOX: &str = "Models/skybox";
    pub const PROMO_VIDEO: &str = "Videos/crazyDogMan";
}

/// Host time for the frame being drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTime {
    pub elapsed_ms: u64,
}

impl FrameTime {
    pub fn from_millis(elapsed_ms: u64) -> Self {
        Self { elapsed_ms }
    }

    /// `sin(elapsed_ms / divisor_ms)`.
    pub fn wave(&self, divisor_ms: f64) -> f32 {
        (self.elapsed_ms as f64 / divisor_ms).sin() as f32
    }
}

/// Placement of one model for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInstance {
    pub position: Vec3,
    pub rotation: f32,
    pub scale: f32,
    pub color: Color,
}

impl ModelInstance {
    pub fn at(position: Vec3, color: Color) -> Self {
        Self {
            position,
            rotation: 0.0,
            scale: 1.0,
            color,
        }
    }

    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Scale, then spin around +Y, then move into place.
    pub fn world(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(self.rotation)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// View and projection shared by every draw in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
}

/// How the head looks this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadStyle {
    pub rotation_step: f32,
    pub scale: f32,
    pub color: Color,
}

impl HeadStyle {
    pub fn for_player(enraged: bool, time: FrameTime) -> Self {
        if enraged {
            Self {
                rotation_step: ENRAGED_ROTATION_STEP,
                scale: 0.5 * time.wave(250.0) + 2.0,
                color: Color::RED,
            }
        } else {
            Self {
                rotation_step: PLAYER_ROTATION_STEP,
                scale: 1.0,
                color: Color::YELLOW,
            }
        }
    }
}

/// Scales for `count` tail segments, front to back.
///
/// Shrinks by `1 / (count + 1)` per segment and never drops below [`MIN_TAIL_SCALE`].
pub fn tail_segment_scales(count: usize) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }
    let step = 1.0 / (count as f32 + 1.0);
    (0..count)
        .map(|i| (1.0 - step * i as f32).max(MIN_TAIL_SCALE))
        .collect()
}

/// Overlay squares pinned to the surface corners:
/// bottom-left, bottom-right, top-right, top-left.
pub fn overlay_rects(viewport: Viewport) -> [ScreenRect; 4] {
    let w = viewport.width as i32;
    let h = viewport.height as i32;
    let s = OVERLAY_SIZE;
    [
        ScreenRect::new(0, h - s, s, s),
        ScreenRect::new(w - s, h - s, s, s),
        ScreenRect::new(w - s, 0, s, s),
        ScreenRect::new(0, 0, s, s),
    ]
}

/// World transform of a corner decoration: spins with the player and wobbles around X and Z.
pub fn corner_decoration_world(position: Vec3, rotation: f32, time: FrameTime) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_rotation_z(time.wave(2500.0) + 3.5)
        * Mat4::from_rotation_x(time.wave(4000.0) + 3.5)
        * Mat4::from_rotation_y(rotation)
        * Mat4::from_scale(Vec3::splat(CORNER_SCALE))
}

/// Submits every sub-mesh of `model` with a flat tint.
fn draw_model<D: RenderDevice + ?Sized>(
    device: &mut D,
    frame: &FrameMatrices,
    model: &Model,
    world: Mat4,
    color: Color,
) {
    for mesh in model.meshes() {
        let effect = MeshEffect {
            world: world * model.bone_transform(mesh.parent_bone),
            view: frame.view,
            projection: frame.projection,
            diffuse_color: color.to_vec3(),
            light: DEFAULT_LIGHT,
        };
        device.draw_mesh(mesh.mesh, &effect);
    }
}

struct SceneModels {
    snek_text: Arc<Model>,
    snek_text_square: Arc<Model>,
    snake_head: Arc<Model>,
    arena: Arc<Model>,
    game_over_text: Arc<Model>,
    game_over_options_text: Arc<Model>,
    ultimate_text: Arc<Model>,
    skybox: Arc<Model>,
}

impl SceneModels {
    fn load<D: RenderDevice>(device: &mut D, content: &mut dyn AssetLoader) -> EngineResult<Self> {
        let mut load = |name: &str| content.load_model(&mut *device, name).map(Arc::new);
        Ok(Self {
            snek_text: load(asset_names::SNEK_TEXT)?,
            snek_text_square: load(asset_names::SNEK_TEXT_SQUARE)?,
            snake_head: load(asset_names::SNAKE_HEAD)?,
            arena: load(asset_names::ARENA)?,
            game_over_text: load(asset_names::GAME_OVER_TEXT)?,
            game_over_options_text: load(asset_names::GAME_OVER_OPTIONS_TEXT)?,
            ultimate_text: load(asset_names::ULTIMATE_TEXT)?,
            skybox: load(asset_names::SKYBOX)?,
        })
    }

    /// The special food reuses the "ultimate" text in red.
    fn food(&self, food_is_special: bool) -> (&Arc<Model>, Color) {
        if food_is_special {
            (&self.ultimate_text, Color::RED)
        } else {
            (&self.snek_text, Color::WHITE)
        }
    }
}

/// Playback plus the texture holding the frame currently on screen.
struct VideoOverlay<P> {
    playback: P,
    video: Arc<Video>,
    texture: Option<(usize, TextureHandle)>,
}

impl<P: Playback> VideoOverlay<P> {
    fn is_playing(&self) -> bool {
        self.playback.state() == MediaState::Playing
    }

    /// Uploads the due frame if it changed. `None` when no frame is ready yet.
    fn current_texture<D: RenderDevice>(
        &mut self,
        device: &mut D,
        time: FrameTime,
    ) -> EngineResult<Option<TextureHandle>> {
        let Some(frame) = self.playback.current_frame(time.elapsed_ms) else {
            return Ok(None);
        };

        if let Some((index, handle)) = self.texture {
            if index == frame.index {
                return Ok(Some(handle));
            }
        }

        let (width, height) = frame.image.dimensions();
        let handle = device.upload_texture_rgba8(frame.image.as_raw(), width, height)?;
        if let Some((_, old)) = self.texture.replace((frame.index, handle)) {
            device.release_texture(old);
        }
        Ok(Some(handle))
    }

    fn release<D: RenderDevice>(&mut self, device: &mut D) {
        if let Some((_, handle)) = self.texture.take() {
            device.release_texture(handle);
        }
    }
}

pub struct SceneRenderer<D: RenderDevice, P: Playback = VideoPlayer> {
    device: D,
    aspect_ratio: f32,
    camera: CameraState,
    models: SceneModels,
    overlay: VideoOverlay<P>,
    rotation: f32,
    skybox_rotation: f32,
}

impl<D: RenderDevice, P: Playback> SceneRenderer<D, P> {
    /// Sizes the surface and loads every model plus the promo video.
    ///
    /// Any missing asset fails construction.
    pub fn new(mut device: D, content: &mut dyn AssetLoader, playback: P) -> EngineResult<Self> {
        device.set_preferred_backbuffer_size(BACKBUFFER_WIDTH, BACKBUFFER_HEIGHT);
        device.apply_changes()?;
        let aspect_ratio = device.viewport().aspect_ratio();
        restore_3d_state(&mut device);

        let models = SceneModels::load(&mut device, content)?;
        let video = Arc::new(content.load_video(asset_names::PROMO_VIDEO)?);

        log::info!(
            "scene renderer ready: aspect {aspect_ratio:.3}, video '{}' ({} frames)",
            video.name(),
            video.frame_count()
        );

        Ok(Self {
            device,
            aspect_ratio,
            camera: CameraState::new(),
            models,
            overlay: VideoOverlay {
                playback,
                video,
                texture: None,
            },
            rotation: 0.0,
            skybox_rotation: 0.0,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Shared spin angle of the head, food, banner and decorations.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn skybox_rotation(&self) -> f32 {
        self.skybox_rotation
    }

    pub fn playback(&self) -> &P {
        &self.overlay.playback
    }

    pub fn playback_mut(&mut self) -> &mut P {
        &mut self.overlay.playback
    }

    pub fn start_video(&mut self) {
        let video = self.overlay.video.clone();
        self.overlay.playback.play(video);
    }

    pub fn update_camera(&mut self, yaw_delta: f32, pitch_delta: f32, zoom_delta: f32) {
        self.camera.update(yaw_delta, pitch_delta, zoom_delta);
    }

    pub fn draw(
        &mut self,
        player: &PlayerSnapshot,
        food_position: Vec3,
        food_is_special: bool,
        time: FrameTime,
    ) -> EngineResult<()> {
        self.device.clear(BACKGROUND_COLOR);
        self.follow_player(player);
        let frame = self.frame_matrices();

        self.draw_player(&frame, player, time);
        self.draw_food(&frame, food_position, food_is_special);
        self.draw_banner(&frame, player.enraged, time);
        self.draw_scenery(&frame);

        if self.overlay.is_playing() {
            self.continue_video(time)?;
        } else {
            self.overlay.release(&mut self.device);
        }
        Ok(())
    }

    /// Static game-over title and options menu.
    pub fn draw_game_over(&mut self) {
        self.device.clear(BACKGROUND_COLOR);
        let frame = self.frame_matrices();

        let title = ModelInstance::at(GAME_OVER_TITLE_POSITION, Color::RED).scaled(GAME_OVER_SCALE);
        draw_model(
            &mut self.device,
            &frame,
            &self.models.game_over_text,
            title.world(),
            title.color,
        );

        let options = ModelInstance::at(Vec3::ZERO, Color::ALICE_BLUE).scaled(GAME_OVER_SCALE);
        draw_model(
            &mut self.device,
            &frame,
            &self.models.game_over_options_text,
            options.world(),
            options.color,
        );
    }

    pub fn present(&mut self) -> EngineResult<()> {
        self.device.present()
    }

    /// Extension point: the camera currently stays on its orbit instead of tracking the player.
    fn follow_player(&mut self, _player: &PlayerSnapshot) {}

    fn frame_matrices(&self) -> FrameMatrices {
        FrameMatrices {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(self.aspect_ratio),
        }
    }

    fn draw_player(&mut self, frame: &FrameMatrices, player: &PlayerSnapshot, time: FrameTime) {
        let style = HeadStyle::for_player(player.enraged, time);
        self.rotation += style.rotation_step;

        let head = ModelInstance::at(player.coords, style.color)
            .rotated(self.rotation)
            .scaled(style.scale);
        draw_model(
            &mut self.device,
            frame,
            &self.models.snake_head,
            head.world(),
            head.color,
        );

        for (coords, scale) in player.tail.iter().zip(tail_segment_scales(player.tail.len())) {
            let segment = ModelInstance::at(*coords, Color::WHITE).scaled(scale);
            draw_model(
                &mut self.device,
                frame,
                &self.models.snake_head,
                segment.world(),
                segment.color,
            );
        }
    }

    fn draw_food(&mut self, frame: &FrameMatrices, position: Vec3, food_is_special: bool) {
        let (model, color) = self.models.food(food_is_special);
        let food = ModelInstance::at(position, color).rotated(self.rotation);
        draw_model(&mut self.device, frame, model, food.world(), food.color);
    }

    fn draw_banner(&mut self, frame: &FrameMatrices, enraged: bool, time: FrameTime) {
        let banner = if enraged {
            ModelInstance::at(BANNER_POSITION, Color::MEDIUM_VIOLET_RED)
                .scaled(time.wave(BANNER_PULSE_PERIOD_MS) + 3.5)
        } else {
            ModelInstance::at(BANNER_POSITION, Color::BLANCHED_ALMOND).scaled(BANNER_SCALE)
        };
        let banner = banner.rotated(-self.rotation);

        draw_model(
            &mut self.device,
            frame,
            &self.models.snek_text_square,
            banner.world(),
            banner.color,
        );

        if enraged {
            for position in CORNER_POSITIONS {
                draw_model(
                    &mut self.device,
                    frame,
                    &self.models.ultimate_text,
                    corner_decoration_world(position, self.rotation, time),
                    Color::RED,
                );
            }
        }
    }

    fn draw_scenery(&mut self, frame: &FrameMatrices) {
        let arena = ModelInstance::at(Vec3::ZERO, Color::WHITE);
        draw_model(
            &mut self.device,
            frame,
            &self.models.arena,
            arena.world(),
            arena.color,
        );

        self.skybox_rotation += SKYBOX_ROTATION_STEP;
        let skybox = ModelInstance::at(SKYBOX_POSITION, Color::WHITE)
            .rotated(self.skybox_rotation)
            .scaled(SKYBOX_SCALE);
        draw_model(
            &mut self.device,
            frame,
            &self.models.skybox,
            skybox.world(),
            skybox.color,
        );
    }

    /// Composites the current video frame into the four corners.
    ///
    /// Leaves the device in 3D state whether or not a frame was drawn.
    fn continue_video(&mut self, time: FrameTime) -> EngineResult<()> {
        let rects = overlay_rects(self.device.viewport());
        match self.overlay.current_texture(&mut self.device, time)? {
            Some(texture) => {
                let mut sprites = SpriteScope::begin(&mut self.device);
                for rect in rects {
                    sprites.draw(texture, rect, Color::WHITE);
                }
            }
            None => restore_3d_state(&mut self.device),
        }
        Ok(())
    }
}
