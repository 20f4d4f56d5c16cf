//! Spritesynth command line.
//!
//! - `spritesynth render <music.json> -o out.wav` renders a piece offline to a
//!   16-bit mono WAV file.
//! - `spritesynth demo` runs a headless sprite scene on a simulated display
//!   clock and logs what the sprites do.
//!
//! Both accept `--config <file.ini>`; without it, built-in defaults are used.
//! Logging goes through `env_logger` (`RUST_LOG=debug` for more detail,
//! `RUST_LOG=trace` to see every rendered sprite snapshot).
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- render assets/theme.json -o theme.wav
//! cargo run --release -- demo --sprites 6 --frames 600
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use spritesynth::components::adjuster::{FollowPath, ReachTargetXY, TerminateOutOfBounds};
use spritesynth::components::animation::{CycleType, FrameData};
use spritesynth::components::dynamics::{Dynamics, Limiter};
use spritesynth::components::position::Rect;
use spritesynth::components::renderer::LogRenderer;
use spritesynth::error::EngineResult;
use spritesynth::resources::audio::try_load_music;
use spritesynth::resources::engineconfig::EngineConfig;
use spritesynth::resources::spritefactory::{SpriteFactory, StateSpec};
use spritesynth::resources::spritesheet::SpriteSheet;
use spritesynth::systems::animator::{Animator, Target};
use spritesynth::systems::mixer::{render_music, write_wav};

/// Display frame length of the simulated 60 Hz clock, in milliseconds.
const FRAME_MS: f64 = 1000.0 / 60.0;
const ARENA: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 640.0,
    height: 360.0,
};

#[derive(Parser)]
#[command(version, about = "Sprite animation and note-sequence synthesiser")]
struct Cli {
    /// INI configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a music definition (JSON) to a WAV file.
    Render {
        music: PathBuf,
        #[arg(short, long, value_name = "PATH", default_value = "out.wav")]
        output: PathBuf,
    },
    /// Run a headless sprite scene.
    Demo {
        #[arg(long, default_value_t = 4)]
        sprites: usize,
        #[arg(long, default_value_t = 300)]
        frames: usize,
    },
}

fn load_config(path: Option<PathBuf>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::new();
    };
    let mut config = EngineConfig::with_path(path);
    if let Err(e) = config.load_from_file() {
        warn!("Config file not found or invalid, using defaults: {}", e);
    }
    config
}

fn render(music: PathBuf, output: PathBuf, config: &EngineConfig) -> EngineResult<bool> {
    let Some(music) = try_load_music(&music) else {
        return Ok(false);
    };
    let samples = render_music(&music, config);
    write_wav(&output, &samples, config.sample_rate)?;
    info!("Wrote {:?}", output);
    Ok(true)
}

fn demo_sheet() -> SpriteSheet {
    let mut sheet = SpriteSheet::new();
    for i in 0..4 {
        let x = i as f64 * 16.0;
        sheet.insert(format!("ball_spin{i}"), FrameData::new(x, 0.0, 16.0, 16.0));
        sheet.insert(format!("walker_walk{i}"), FrameData::new(x, 16.0, 16.0, 24.0));
    }
    sheet.insert("walker_idle", FrameData::new(64.0, 16.0, 16.0, 24.0));
    sheet
}

fn demo(sprites: usize, frames: usize, config: &EngineConfig) -> EngineResult<()> {
    let factory = SpriteFactory::new()
        .with_sheet(demo_sheet())
        .with_renderer(|base| Box::new(LogRenderer::new(base)));
    let mut animator = Animator::new().with_max_delta(config.max_delta);
    let mut rng = fastrand::Rng::with_seed(sprites as u64);

    for n in 0..sprites {
        let x = rng.f64() * (ARENA.width - 32.0);
        let y = rng.f64() * (ARENA.height - 32.0);
        let sprite = match n % 4 {
            0 => {
                let spin = StateSpec::new("spin", 80.0, CycleType::Loop);
                let mut ball = factory.create("ball", &[spin])?;
                ball.set_position(x, y);
                let (vx, vy) = (rng.f64() * 200.0 - 100.0, rng.f64() * 200.0 - 100.0);
                ball.set_dynamics(
                    Dynamics::with_velocity(vx, vy)
                        .with_angular(1.0, 0.0)
                        .with_limiter(Limiter::Bounce(ARENA)),
                );
                ball
            }
            1 => {
                let mut walker = factory.create(
                    "walker",
                    &[
                        StateSpec::new("walk", 120.0, CycleType::Oscillate),
                        StateSpec::new("idle", 0.0, CycleType::None),
                    ],
                )?;
                walker.set_position(x, y);
                walker.auto_flip_x = true;
                walker.set_dynamics(Dynamics::new());
                let id = walker.id().to_string();
                let path = [(ARENA.width / 2.0, y), (ARENA.width / 2.0, 40.0)];
                walker.set_adjuster(FollowPath::new(path, 60.0).on_completion(move |reason| {
                    info!("{} finished its path: {}", id, reason)
                }));
                walker
            }
            2 => {
                let spin = StateSpec::new("spin", 60.0, CycleType::Loop);
                let mut ball = factory.create("ball", &[spin])?;
                ball.set_position(x, y);
                ball.set_dynamics(Dynamics::with_velocity(0.0, 0.0).with_acceleration(40.0, 0.0));
                let id = ball.id().to_string();
                ball.set_adjuster(TerminateOutOfBounds::new(ARENA, true).on_completion(
                    move |reason| info!("{} left the arena: {}", id, reason),
                ));
                ball
            }
            _ => {
                let walk = StateSpec::new("walk", 100.0, CycleType::Loop);
                let mut walker = factory.create("walker", &[walk])?;
                walker.set_position(x, y);
                let (tx, ty) = (ARENA.width - x, ARENA.height - y);
                walker.set_dynamics(Dynamics::with_velocity((tx - x) / 2.0, (ty - y) / 2.0));
                let id = walker.id().to_string();
                walker.set_adjuster(ReachTargetXY::new(tx, ty).on_completion(move |reason| {
                    info!("{} reached its target: {}", id, reason)
                }));
                walker
            }
        };
        let target: Target = Rc::new(RefCell::new(sprite));
        animator.add_target(target);
    }

    animator.set_active(true);
    let delivered = animator.run_frames(0.0, FRAME_MS, frames)?;
    info!(
        "Demo ran {} frame(s); {} of {} sprite(s) still alive",
        delivered,
        animator.target_count(),
        sprites
    );
    animator.clear();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config);

    let result = match cli.command {
        Command::Render { music, output } => render(music, output, &config),
        Command::Demo { sprites, frames } => demo(sprites, frames, &config).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
