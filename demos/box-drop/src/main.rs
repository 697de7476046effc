//! Box drop: a unit box falls onto static ground and comes to rest.
//!
//! Steps the canonical scene for two simulated seconds, logging the
//! box's trajectory every half second.
//!
//! Usage: cargo run -p box-drop
//!        RUST_LOG=debug cargo run -p box-drop   (per-event detail)

use keel_physics::prelude::*;

fn main() {
    env_logger::init();

    let mut world = World::new(WorldDesc::default());

    let ground = world.create_body(BodyDesc::fixed()).expect("ground body");
    world
        .create_segment_shape(
            ground,
            ShapeDesc::default(),
            Segment::new(Vec2::new(-66.0, 0.0), Vec2::new(66.0, 0.0)),
        )
        .expect("ground segment");

    let falling = world
        .create_body(BodyDesc::dynamic().with_position(0.0, 5.0))
        .expect("falling body");
    world
        .create_polygon_shape(falling, ShapeDesc::default(), Polygon::new_box(0.5, 0.5))
        .expect("box shape");

    log::info!("=== Box Drop ===");
    log::info!(
        "Dropping a unit box from y = 5 under gravity {:?}",
        world.gravity()
    );

    let config = StepConfig::default();
    for frame in 0..120 {
        if let Err(err) = world.step(DEFAULT_TIMESTEP, config) {
            log::error!("Simulation stopped at frame {}: {}", frame, err);
            return;
        }
        if (frame + 1) % 30 == 0 {
            let position = world.get_body_position(falling).expect("body position");
            let velocity = world
                .get_body_linear_velocity(falling)
                .expect("body velocity");
            let stats = world.last_step_stats();
            log::info!(
                "t = {:.2}s  y = {:+.3}  vy = {:+.3}  contacts = {}  max penetration = {:.4}",
                (frame + 1) as f32 * DEFAULT_TIMESTEP,
                position.y,
                velocity.y,
                stats.contacts,
                stats.max_penetration,
            );
        }
    }

    let resting = world.get_body_position(falling).expect("body position");
    log::info!("Box settled at y = {:.3}", resting.y);
}
