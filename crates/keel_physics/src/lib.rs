//! Keel Physics - 2D Rigid Body Simulation
//!
//! This crate provides the 2D rigid body simulation core for the Keel
//! engine.
//!
//! # Features
//!
//! - Rigid body dynamics (static, dynamic, kinematic)
//! - Convex polygon and segment shapes with convex hull construction
//! - Speculative contacts, so fast pairs are constrained before they touch
//! - Soft-constraint solver with accumulated impulses and warm starting
//! - Coulomb friction, forces, impulses, and velocity damping
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                      World                        │
//! │  ┌────────────┐  ┌────────────┐  ┌─────────────┐ │
//! │  │ Body pool  │  │ Shape pool │  │ Warm-start  │ │
//! │  │  (Arena)   │  │  (Arena)   │  │    cache    │ │
//! │  └────────────┘  └────────────┘  └─────────────┘ │
//! │  ┌───────────────────────────────────────────────┐│
//! │  │                 step pipeline                 ││
//! │  │  (collide, warm start, integrate, velocity   ││
//! │  │   iterations, position iterations, write back)││
//! │  └───────────────────────────────────────────────┘│
//! └───────────────────────────────────────────────────┘
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ┌─────────┐   ┌──────────┐   ┌──────────┐
//!      │  Body   │   │  Shape   │   │   Hull   │
//!      │ (state) │   │(geometry)│   │ (builder)│
//!      └─────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keel_physics::prelude::*;
//!
//! // Create a world with default gravity
//! let mut world = World::new(WorldDesc::default());
//!
//! // Static ground
//! let ground = world.create_body(BodyDesc::fixed())?;
//! world.create_segment_shape(
//!     ground,
//!     ShapeDesc::default(),
//!     Segment::new(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)),
//! )?;
//!
//! // A falling box
//! let body = world.create_body(BodyDesc::dynamic().with_position(0.0, 5.0))?;
//! world.create_polygon_shape(body, ShapeDesc::default(), Polygon::new_box(0.5, 0.5))?;
//!
//! // Step the simulation forward
//! for _ in 0..120 {
//!     world.step(DEFAULT_TIMESTEP, StepConfig::default())?;
//! }
//! let resting = world.get_body_position(body)?;
//! ```

mod arena;
mod contact;

pub mod body;
pub mod config;
pub mod error;
pub mod hull;
pub mod shape;
pub mod solver;
pub mod world;

pub mod prelude {
    //! Common imports for simulation code
    pub use crate::body::{BodyDesc, BodyHandle, BodyType};
    pub use crate::config::{SolverKind, StepConfig, DEFAULT_TIMESTEP};
    pub use crate::error::{PhysicsError, Result};
    pub use crate::hull::Hull;
    pub use crate::shape::{Polygon, Segment, ShapeDesc, ShapeHandle};
    pub use crate::solver::StepStats;
    pub use crate::world::{World, WorldDesc};
    pub use keel_math::{Rot2, Transform2, Vec2};
}

pub use prelude::*;
