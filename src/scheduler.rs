//! Update, render and publish, once per display refresh.

use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::Pose;
use crate::movement::{self, InputIntents, MovementConfig};
use crate::renderer::{Frame, RenderSettings, Renderer};
use crate::texture::{AtlasError, TextureAtlas};
use crate::world::Level;

/// Tick length the per-tick speeds are tuned for when scaling by elapsed time.
const REFERENCE_TICK: Duration = Duration::from_micros(16_667);
/// Longest gap a single tick may scale movement by.
const MAX_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("atlas does not cover the level: {0}")]
    Atlas(#[from] AtlasError),
}

/// Read-only copy of the pose handed to observers after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    pub tick: u64,
    pub pose: Pose,
}

impl PoseSnapshot {
    /// Facing angle in degrees, for status displays.
    pub fn facing_degrees(&self) -> f32 {
        self.pose.facing_angle().to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub snapshot: PoseSnapshot,
    /// False when textures were not ready and the previous frame was kept.
    pub rendered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub width: usize,
    pub height: usize,
    pub movement: MovementConfig,
    pub render: RenderSettings,
    /// Scale movement by elapsed time instead of stepping a fixed amount per tick.
    pub delta_time: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            movement: MovementConfig::default(),
            render: RenderSettings::default(),
            delta_time: false,
        }
    }
}

/// Owns the pose for the whole session and drives one frame per `tick`.
pub struct FrameScheduler {
    config: SchedulerConfig,
    level: Level,
    pose: Pose,
    atlas: Option<TextureAtlas>,
    renderer: Renderer,
    frame: Frame,
    observers: Vec<mpsc::Sender<PoseSnapshot>>,
    ticks: u64,
    last_elapsed: Option<Duration>,
    warned_not_ready: bool,
}

impl FrameScheduler {
    pub fn new(level: Level, config: SchedulerConfig) -> Self {
        tracing::info!(
            "scheduler ready: {}x{} frame, spawn ({:.1}, {:.1})",
            config.width,
            config.height,
            level.spawn.pos[0],
            level.spawn.pos[1]
        );
        Self {
            pose: level.spawn,
            renderer: Renderer::new(config.width, config.height, config.render),
            frame: Frame::new(config.width, config.height),
            config,
            level,
            atlas: None,
            observers: Vec::new(),
            ticks: 0,
            last_elapsed: None,
            warned_not_ready: false,
        }
    }

    /// Hands over the finished atlas; rendering starts with the next tick.
    pub fn install_atlas(&mut self, atlas: TextureAtlas) -> Result<(), ScheduleError> {
        atlas.covers(&self.level)?;
        tracing::info!("texture atlas installed ({}px)", atlas.size());
        self.atlas = Some(atlas);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.atlas.is_some()
    }

    /// New receiver that gets a snapshot after every tick.
    pub fn subscribe(&mut self) -> mpsc::Receiver<PoseSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Frame and level together, for overlays drawn after the core stages.
    pub fn overlay_target(&mut self) -> (&mut Frame, &Level) {
        (&mut self.frame, &self.level)
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Runs one update/render/publish cycle.
    ///
    /// `elapsed` is time since session start; it drives the animation clock and, with
    /// `delta_time`, the movement step.
    pub fn tick(&mut self, intents: &InputIntents, elapsed: Duration) -> TickOutcome {
        let scale = self.movement_scale(elapsed);
        movement::resolve(
            &mut self.pose,
            intents,
            &self.level.walls,
            &self.config.movement,
            scale,
        );

        let rendered = self.render(elapsed);

        self.ticks += 1;
        let snapshot = PoseSnapshot {
            tick: self.ticks,
            pose: self.pose,
        };
        // Drop observers whose receiver is gone.
        self.observers.retain(|tx| tx.send(snapshot).is_ok());

        TickOutcome { snapshot, rendered }
    }

    fn movement_scale(&mut self, elapsed: Duration) -> f32 {
        let previous = self.last_elapsed.replace(elapsed);
        if !self.config.delta_time {
            return 1.0;
        }
        let dt = previous
            .map_or(REFERENCE_TICK, |p| elapsed.saturating_sub(p))
            .min(MAX_STEP);
        dt.as_secs_f32() / REFERENCE_TICK.as_secs_f32()
    }

    fn render(&mut self, elapsed: Duration) -> bool {
        let Some(atlas) = &self.atlas else {
            if !self.warned_not_ready {
                tracing::warn!("textures not ready, keeping previous frame");
                self.warned_not_ready = true;
            }
            return false;
        };

        let elapsed_ms = elapsed.as_millis() as u64;
        match self
            .renderer
            .render_frame(&mut self.frame, &self.pose, &self.level, atlas, elapsed_ms)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("frame {} not rendered: {e}", self.ticks + 1);
                false
            }
        }
    }
}
