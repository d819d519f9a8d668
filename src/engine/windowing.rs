use std::sync::Arc;
use std::time::Instant;

use crate::engine::cli::Cli;
use crate::engine::graphics::scene_renderer::{BACKBUFFER_HEIGHT, BACKBUFFER_WIDTH};
use crate::engine::graphics::{ContentManager, FrameTime, SceneRenderer, VulkanoRenderer};
use crate::engine::user_input::{SceneCommand, UserInput};
use crate::engine::video::VideoPlayer;
use crate::engine::{EngineError, EngineResult, Universe};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// Minimal winit wrapper (winit 0.30 style: ApplicationHandler).
pub struct Windowing;

impl Windowing {
    pub fn run_app(cli: Cli, universe: Universe, user_input: UserInput) -> EngineResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            cli,
            window: None,
            scene: None,
            universe,
            user_input,
            started: Instant::now(),
            failure: None,
        };

        event_loop.run_app(&mut app)?;

        match app.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct App {
    cli: Cli,
    window: Option<Arc<Window>>,
    scene: Option<SceneRenderer<VulkanoRenderer>>,
    universe: Universe,
    user_input: UserInput,
    started: Instant,
    failure: Option<EngineError>,
}

impl App {
    fn create_scene(&mut self, event_loop: &ActiveEventLoop) -> EngineResult<()> {
        let attrs: WindowAttributes = Window::default_attributes()
            .with_title("3D Snek Ultimate")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                BACKBUFFER_WIDTH,
                BACKBUFFER_HEIGHT,
            ));

        let window = Arc::new(event_loop.create_window(attrs).map_err(EngineError::graphics)?);
        let device = VulkanoRenderer::new(window.clone())?;

        let mut content = ContentManager::new(&self.cli.content);
        let mut scene = SceneRenderer::new(device, &mut content, VideoPlayer::new())?;
        if self.cli.start_video {
            scene.start_video();
        }

        window.request_redraw();
        self.window = Some(window);
        self.scene = Some(scene);
        self.started = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        log::error!("{err}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> EngineResult<()> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };

        for command in self.user_input.commands() {
            match command {
                SceneCommand::StartVideo => scene.start_video(),
                SceneCommand::ToggleGameOver => self.universe.toggle_game_over(),
                SceneCommand::Quit => event_loop.exit(),
            }
        }

        let delta = self.user_input.camera_delta();
        if !delta.is_zero() {
            scene.update_camera(delta.yaw_degrees, delta.pitch_degrees, delta.zoom);
        }
        self.user_input.begin_frame();

        let time = FrameTime::from_millis(self.started.elapsed().as_millis() as u64);
        if self.universe.is_game_over() {
            scene.draw_game_over();
        } else {
            let frame = self.universe.frame_at(time);
            scene.draw(
                &frame.player,
                frame.food_position,
                frame.food_is_special,
                time,
            )?;
        }

        if let Some(w) = &self.window {
            w.pre_present_notify();
        }
        scene.present()?;

        if let Some(w) = &self.window {
            w.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.create_scene(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.user_input.handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.device_mut().resize(size);
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}
