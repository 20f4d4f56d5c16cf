//! Sprite animation integration tests: animator, factory, dynamics and adjusters together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spritesynth::components::adjuster::{
    CompletionReason, FollowPath, ReachTargetXY, TerminateOutOfBounds,
};
use spritesynth::components::animation::{AnimationState, CycleType, FrameData};
use spritesynth::components::dynamics::{Dynamics, Limiter};
use spritesynth::components::position::Rect;
use spritesynth::components::renderer::{NullRenderer, Renderer, SpriteSnapshot};
use spritesynth::components::sprite::Sprite;
use spritesynth::resources::spritefactory::{SpriteFactory, StateSpec};
use spritesynth::resources::spritesheet::SpriteSheet;
use spritesynth::systems::animator::{Animator, Target};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Records the x of every rendered frame and counts kills.
struct RecordingRenderer {
    frames: Rc<RefCell<Vec<f64>>>,
    kills: Rc<Cell<usize>>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, snapshot: &SpriteSnapshot) {
        self.frames.borrow_mut().push(snapshot.frame.x);
    }

    fn kill(&mut self) {
        self.kills.set(self.kills.get() + 1);
    }
}

fn recording() -> (RecordingRenderer, Rc<RefCell<Vec<f64>>>, Rc<Cell<usize>>) {
    let frames = Rc::new(RefCell::new(Vec::new()));
    let kills = Rc::new(Cell::new(0));
    let renderer = RecordingRenderer {
        frames: Rc::clone(&frames),
        kills: Rc::clone(&kills),
    };
    (renderer, frames, kills)
}

fn bat_sheet() -> SpriteSheet {
    let mut sheet = SpriteSheet::new();
    for i in 0..4 {
        sheet.insert(
            format!("bat_fly{i}"),
            FrameData::new(i as f64 * 16.0, 0.0, 16.0, 16.0),
        );
    }
    sheet.insert("bat_hang", FrameData::new(64.0, 0.0, 16.0, 20.0));
    sheet
}

fn started_animator() -> Animator {
    let mut animator = Animator::new();
    animator.set_active(true);
    animator
}

fn register(animator: &mut Animator, sprite: Sprite) -> Rc<RefCell<Sprite>> {
    let sprite = Rc::new(RefCell::new(sprite));
    let target: Target = sprite.clone();
    animator.add_target(target);
    sprite
}

fn block(x: f64, y: f64) -> Sprite {
    let mut sprite = Sprite::new("block", Box::new(NullRenderer));
    sprite.set_position(x, y);
    sprite.set_dimensions(10.0, 10.0);
    sprite
}

#[test]
fn test_factory_sprite_oscillates_without_repeating_ends() {
    let frames = Rc::new(RefCell::new(Vec::new()));
    let frames_in = Rc::clone(&frames);
    let factory = SpriteFactory::new()
        .with_sheet(bat_sheet())
        .with_renderer(move |_| {
            Box::new(RecordingRenderer {
                frames: Rc::clone(&frames_in),
                kills: Rc::new(Cell::new(0)),
            })
        });
    let sprite = factory
        .create(
            "bat",
            &[
                StateSpec::new("fly", 100.0, CycleType::Oscillate),
                StateSpec::new("hang", 0.0, CycleType::None),
            ],
        )
        .unwrap();

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    assert_eq!(sprite.borrow().state(), Some("fly"));

    let delivered = animator.run_frames(0.0, 100.0, 8).unwrap();
    assert_eq!(delivered, 8);
    assert_eq!(
        *frames.borrow(),
        vec![0.0, 16.0, 32.0, 48.0, 32.0, 16.0, 0.0, 16.0]
    );
}

#[test]
fn test_state_switch_restarts_and_resizes() {
    let factory = SpriteFactory::new()
        .with_sheet(bat_sheet())
        .with_renderer(|_| Box::new(NullRenderer));
    let sprite = factory
        .create(
            "bat",
            &[
                StateSpec::new("fly", 100.0, CycleType::Loop),
                StateSpec::new("hang", 0.0, CycleType::None),
            ],
        )
        .unwrap();

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    animator.run_frames(0.0, 100.0, 3).unwrap();
    assert_eq!(sprite.borrow().frame_index(), 2);

    sprite.borrow_mut().set_state("hang");
    assert_eq!(sprite.borrow().frame_index(), 0);
    assert_eq!(sprite.borrow().dimensions().height, 20.0);
    animator.run_frames(300.0, 100.0, 3).unwrap();
    assert_eq!(sprite.borrow().frame_index(), 0);
}

#[test]
fn test_reach_target_stops_on_target() {
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let reasons_in = Rc::clone(&reasons);

    let mut sprite = block(0.0, 0.0);
    sprite.set_dynamics(Dynamics::with_velocity(100.0, 50.0).with_acceleration(20.0, 0.0));
    sprite.set_adjuster(
        ReachTargetXY::new(50.0, 25.0).on_completion(move |r| reasons_in.borrow_mut().push(r)),
    );

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    animator.run_frames(0.0, 100.0, 12).unwrap();

    let sprite = sprite.borrow();
    assert!(approx_eq(sprite.position().x, 50.0));
    assert!(approx_eq(sprite.position().y, 25.0));
    let dynamics = sprite.dynamics().unwrap();
    assert_eq!((dynamics.vx, dynamics.vy, dynamics.ax, dynamics.ay), (0.0, 0.0, 0.0, 0.0));
    assert!(!sprite.has_adjuster());
    assert_eq!(*reasons.borrow(), vec![CompletionReason::Reached]);
}

#[test]
fn test_follow_path_visits_every_waypoint() {
    let mut sprite = block(0.0, 0.0);
    sprite.set_dynamics(Dynamics::new());
    sprite.auto_flip_x = true;
    sprite.set_adjuster(FollowPath::new([(40.0, 0.0), (40.0, 40.0), (0.0, 40.0)], 100.0));

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    animator.run_frames(0.0, 50.0, 60).unwrap();

    let sprite = sprite.borrow();
    assert!(approx_eq(sprite.position().x, 0.0));
    assert!(approx_eq(sprite.position().y, 40.0));
    assert!(!sprite.has_adjuster());
    // Last leg ran right to left.
    assert_eq!(sprite.flips(), (true, false));
}

#[test]
fn test_leaving_bounds_kills_and_evicts() {
    let (renderer, _, kills) = recording();
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let reasons_in = Rc::clone(&reasons);

    let mut sprite = Sprite::new("bullet", Box::new(renderer));
    sprite.set_position(80.0, 0.0);
    sprite.set_dimensions(10.0, 10.0);
    sprite.set_dynamics(Dynamics::with_velocity(1000.0, 0.0));
    sprite.set_adjuster(
        TerminateOutOfBounds::new(Rect::new(0.0, 0.0, 100.0, 100.0), true)
            .on_completion(move |r| reasons_in.borrow_mut().push(r)),
    );

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    animator.run_frames(0.0, 100.0, 2).unwrap();

    assert!(sprite.borrow().is_killed());
    assert_eq!(animator.target_count(), 0);
    assert_eq!(kills.get(), 1);
    assert_eq!(*reasons.borrow(), vec![CompletionReason::OutOfBounds]);
    assert!(!sprite.borrow().dynamics().unwrap().is_moving());

    // Further frames neither revive nor re-kill it.
    animator.run_frames(200.0, 100.0, 5).unwrap();
    sprite.borrow_mut().kill();
    assert_eq!(kills.get(), 1);
}

#[test]
fn test_kill_is_idempotent() {
    let (renderer, frames, kills) = recording();
    let mut sprite = Sprite::new("ghost", Box::new(renderer))
        .with_state("idle", AnimationState::new([FrameData::new(0.0, 0.0, 8.0, 8.0)]));
    sprite.kill();
    sprite.kill();
    assert_eq!(kills.get(), 1);
    sprite.update(0.0, 0.016).unwrap();
    assert!(frames.borrow().is_empty());
}

#[test]
fn test_kill_target_removes_only_that_sprite() {
    let mut animator = started_animator();
    let a = register(&mut animator, block(0.0, 0.0));
    let b = register(&mut animator, block(20.0, 0.0));
    let a_target: Target = a.clone();

    animator.kill_target(&a_target);
    assert!(a.borrow().is_killed());
    assert!(!b.borrow().is_killed());
    assert_eq!(animator.target_count(), 1);

    animator.clear();
    assert!(b.borrow().is_killed());
    assert_eq!(animator.target_count(), 0);
    assert!(!animator.is_active());
}

#[test]
fn test_bounce_keeps_sprite_inside() {
    let arena = Rect::new(0.0, 0.0, 100.0, 100.0);
    let mut sprite = block(45.0, 45.0);
    sprite.set_dynamics(
        Dynamics::with_velocity(300.0, -170.0).with_limiter(Limiter::Bounce(arena)),
    );

    let mut animator = started_animator();
    let sprite = register(&mut animator, sprite);
    let mut saw_left = false;
    for i in 0..80 {
        animator.frame(Some(i as f64 * 50.0)).unwrap();
        let sprite = sprite.borrow();
        let pos = sprite.position();
        assert!((0.0..=90.0).contains(&pos.x), "x={} at frame {}", pos.x, i);
        assert!((0.0..=90.0).contains(&pos.y), "y={} at frame {}", pos.y, i);
        saw_left |= sprite.dynamics().unwrap().vx < 0.0;
    }
    assert!(saw_left);
}

#[test]
fn test_same_frames_give_same_motion() {
    let run = || {
        let mut sprite = block(0.0, 0.0);
        sprite.set_dynamics(Dynamics::with_velocity(12.0, -3.0).with_acceleration(1.5, 9.8));
        let mut animator = started_animator();
        let sprite = register(&mut animator, sprite);
        for ts in [0.0, 16.0, 33.0, 51.0, 90.0, 91.0, 200.0] {
            animator.frame(Some(ts)).unwrap();
        }
        let sprite = sprite.borrow();
        (sprite.position().x, sprite.position().y)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_max_delta_clamps_long_frames() {
    let mut sprite = block(0.0, 0.0);
    sprite.set_dynamics(Dynamics::with_velocity(100.0, 0.0));
    let mut animator = Animator::new().with_max_delta(0.25);
    animator.set_active(true);
    let sprite = register(&mut animator, sprite);

    animator.frame(Some(0.0)).unwrap();
    animator.frame(Some(5000.0)).unwrap();
    assert!(approx_eq(sprite.borrow().position().x, 25.0));
}
