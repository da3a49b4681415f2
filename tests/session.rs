use std::time::Duration;

use gridcaster::assets::build_default_atlas;
use gridcaster::{FrameScheduler, InputIntents, Level, SchedulerConfig};

fn session() -> FrameScheduler {
    let mut scheduler = FrameScheduler::new(
        Level::default_level().expect("level"),
        SchedulerConfig {
            width: 96,
            height: 72,
            ..Default::default()
        },
    );
    scheduler
        .install_atlas(build_default_atlas(3).expect("atlas"))
        .expect("atlas covers level");
    scheduler
}

/// Cycles through held-key combinations the way a player might.
fn scripted_input(tick: usize) -> InputIntents {
    InputIntents {
        forward: tick % 7 != 0,
        backward: tick % 11 == 0,
        turn_left: (tick / 40) % 3 == 0,
        turn_right: (tick / 40) % 3 == 2,
        strafe_left: (tick / 25) % 4 == 1,
        strafe_right: (tick / 25) % 4 == 3,
    }
}

#[test]
fn long_walk_stays_on_open_cells_and_keeps_basis() {
    let mut s = session();
    let rx = s.subscribe();
    for tick in 0..600 {
        let out = s.tick(&scripted_input(tick), Duration::from_millis(tick as u64 * 16));
        assert!(out.rendered);

        let pose = out.snapshot.pose;
        let (cx, cy) = pose.cell();
        assert!(
            s.level().walls.is_open(cx, cy),
            "tick {tick}: inside wall at {:?}",
            pose.pos
        );
        let dot = pose.dir[0] * pose.plane[0] + pose.dir[1] * pose.plane[1];
        assert!(dot.abs() < 1e-3, "tick {tick}: dir.plane = {dot}");
    }
    assert_eq!(rx.try_iter().count(), 600);
}

#[test]
fn same_clock_and_pose_render_the_same_frame() {
    let mut a = session();
    let mut b = session();
    let idle = InputIntents::default();

    // Same clock value, same image.
    a.tick(&idle, Duration::from_millis(300));
    b.tick(&idle, Duration::from_millis(300));
    assert_eq!(a.frame(), b.frame());

    // Frames rendered at the same pose are deterministic.
    let first = a.frame().clone();
    a.tick(&idle, Duration::from_millis(300));
    assert_eq!(a.frame(), &first);
}

#[test]
fn strafe_there_and_back_returns_to_start() {
    let mut s = session();
    let start = s.pose().pos;
    let left = InputIntents {
        strafe_left: true,
        ..Default::default()
    };
    let right = InputIntents {
        strafe_right: true,
        ..Default::default()
    };
    for i in 0..10 {
        s.tick(&left, Duration::from_millis(i * 16));
    }
    assert!((s.pose().pos[1] - start[1]).abs() > 0.1);
    for i in 10..20 {
        s.tick(&right, Duration::from_millis(i * 16));
    }
    assert!((s.pose().pos[0] - start[0]).abs() < 1e-4);
    assert!((s.pose().pos[1] - start[1]).abs() < 1e-4);
}
