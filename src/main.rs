use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use gridcaster::assets::build_default_atlas;
use gridcaster::minimap::Minimap;
use gridcaster::scaler::{ScaleLut, blit_bilinear_stretch};
use gridcaster::{
    FrameScheduler, InputIntents, Level, MovementConfig, PoseSnapshot, RenderSettings,
    SchedulerConfig,
};

#[derive(Parser)]
#[command(name = "gridcaster", about = "Ray-cast first-person maze")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Level file (JSON); the built-in maze is used when omitted
    #[arg(long)]
    map: Option<PathBuf>,

    /// Internal render width
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Internal render height
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Grid units moved per tick
    #[arg(long, default_value_t = 0.08)]
    move_speed: f32,

    /// Radians turned per tick
    #[arg(long, default_value_t = 0.05)]
    rot_speed: f32,

    /// Scale movement by elapsed time instead of a fixed step per frame
    #[arg(long)]
    delta_time: bool,

    /// Hide sprites behind nearer walls
    #[arg(long)]
    occlude_sprites: bool,

    /// Do not draw the minimap overlay
    #[arg(long)]
    no_minimap: bool,

    /// Seed for the procedural textures
    #[arg(long, default_value_t = 1993)]
    seed: u64,
}

struct App {
    window: Option<Rc<Window>>,
    surface: Option<softbuffer::Surface<Rc<Window>, Rc<Window>>>,
    scheduler: FrameScheduler,
    scale_lut: ScaleLut,
    minimap: Option<Minimap>,
    poses: mpsc::Receiver<PoseSnapshot>,
    latest: Option<PoseSnapshot>,

    // Status line
    frame_counter: u32,
    last_status: Instant,

    keys_down: HashSet<KeyCode>,
    started: Instant,
}

impl App {
    fn new(mut scheduler: FrameScheduler, minimap: Option<Minimap>) -> Self {
        let poses = scheduler.subscribe();
        Self {
            window: None,
            surface: None,
            scheduler,
            scale_lut: ScaleLut::default(),
            minimap,
            poses,
            latest: None,
            frame_counter: 0,
            last_status: Instant::now(),
            keys_down: HashSet::new(),
            started: Instant::now(),
        }
    }

    fn intents(&self) -> InputIntents {
        let held = |codes: &[KeyCode]| codes.iter().any(|c| self.keys_down.contains(c));
        InputIntents {
            turn_left: held(&[KeyCode::ArrowLeft, KeyCode::KeyQ]),
            turn_right: held(&[KeyCode::ArrowRight, KeyCode::KeyE]),
            forward: held(&[KeyCode::ArrowUp, KeyCode::KeyW]),
            backward: held(&[KeyCode::ArrowDown, KeyCode::KeyS]),
            strafe_left: held(&[KeyCode::KeyA]),
            strafe_right: held(&[KeyCode::KeyD]),
        }
    }

    fn redraw(&mut self, id: WindowId) -> Result<()> {
        let intents = self.intents();
        self.scheduler.tick(&intents, self.started.elapsed());

        // Observers read the published snapshot, never the live pose.
        if let Some(snapshot) = self.poses.try_iter().last() {
            self.latest = Some(snapshot);
        }
        if let (Some(map), Some(snapshot)) = (&self.minimap, &self.latest) {
            let (frame, level) = self.scheduler.overlay_target();
            map.draw(frame, &level.walls, snapshot);
        }

        let (window, surface) = match (&self.window, &mut self.surface) {
            (Some(w), Some(s)) if w.id() == id => (w, s),
            _ => return Ok(()),
        };

        let size = window.inner_size();
        let (Some(dw), Some(dh)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(()); // Minimized window, skip drawing
        };
        surface
            .resize(dw, dh)
            .map_err(|e| anyhow::anyhow!("resize surface: {e}"))?;

        let frame = self.scheduler.frame();
        if self.scale_lut.dst() != (dw.get() as usize, dh.get() as usize) {
            self.scale_lut = ScaleLut::new(
                dw.get() as usize,
                dh.get() as usize,
                frame.width,
                frame.height,
            );
        }

        let mut buf = surface
            .buffer_mut()
            .map_err(|e| anyhow::anyhow!("surface buffer: {e}"))?;
        blit_bilinear_stretch(&mut buf, frame, &self.scale_lut);
        buf.present()
            .map_err(|e| anyhow::anyhow!("present: {e}"))?;

        self.update_status();
        Ok(())
    }

    /// Title-bar HUD, refreshed once per second.
    fn update_status(&mut self) {
        self.frame_counter += 1;
        let now = Instant::now();
        let secs = now.duration_since(self.last_status).as_secs_f32();
        if secs < 1.0 {
            return;
        }
        let fps = self.frame_counter as f32 / secs;
        self.frame_counter = 0;
        self.last_status = now;

        let Some(s) = &self.latest else { return };
        tracing::debug!("FPS: {:.1}", fps);
        if let Some(window) = &self.window {
            window.set_title(&format!(
                "gridcaster | {:.0} fps | pos {:.1}, {:.1} | dir {:.0}°",
                fps,
                s.pose.pos[0],
                s.pose.pos[1],
                s.facing_degrees()
            ));
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title("gridcaster")
            .with_inner_size(LogicalSize::new(960.0, 720.0));

        let window = match event_loop.create_window(attributes) {
            Ok(w) => Rc::new(w),
            Err(e) => {
                tracing::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let surface = softbuffer::Context::new(window.clone())
            .and_then(|context| softbuffer::Surface::new(&context, window.clone()));
        match surface {
            Ok(s) => self.surface = Some(s),
            Err(e) => {
                tracing::error!("failed to create softbuffer surface: {e}");
                event_loop.exit();
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("close requested; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed if code == KeyCode::Escape => event_loop.exit(),
                ElementState::Pressed => {
                    self.keys_down.insert(code);
                }
                ElementState::Released => {
                    self.keys_down.remove(&code);
                }
            },

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw(id) {
                    tracing::error!("redraw failed: {e:#}");
                }
            }

            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("gridcaster starting");

    let level = match &cli.map {
        Some(path) => Level::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Level::default_level().context("building default level")?,
    };

    let config = SchedulerConfig {
        width: cli.width.max(16),
        height: cli.height.max(16),
        movement: MovementConfig {
            move_speed: cli.move_speed,
            rot_speed: cli.rot_speed,
            ..MovementConfig::default()
        },
        render: RenderSettings {
            occlude_sprites: cli.occlude_sprites,
            ..RenderSettings::default()
        },
        delta_time: cli.delta_time,
    };
    let mut scheduler = FrameScheduler::new(level, config);

    // Texture construction failing is fatal; the game cannot start without it.
    let atlas = build_default_atlas(cli.seed).context("building textures")?;
    scheduler
        .install_atlas(atlas)
        .context("textures do not match the level")?;

    let minimap = (!cli.no_minimap).then(Minimap::default);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scheduler, minimap);
    event_loop.run_app(&mut app)?;

    Ok(())
}
