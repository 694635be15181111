pub mod collision;
pub mod entity;
pub mod interaction;
pub mod kinematics;
pub mod stepper;
pub mod tilemap;
pub mod world;

pub use collision::{apply_patrol_turn, resolve_collisions, update_support, Neighborhood};
pub use entity::{Actor, EntityKind, Intents, Monster, PhysicsParams, Treasure};
pub use interaction::{boxes_overlap, resolve_contact, try_collect, ContactOutcome};
pub use kinematics::integrate;
pub use stepper::{clamp_frame_delta, plan_sim_steps, StepPlan, Stepper, StepperConfig};
pub use tilemap::{pixel_to_tile, tile_to_pixel, TileMap, TileMapError};
pub use world::{step, RenderEntity, RenderFrame, TickEvent, TickReport, World, WorldStats};

/// Edge length of a tile and of every entity box, in pixels.
pub const TILE: f64 = 32.0;
pub const METER: f64 = TILE;
pub const FIXED_STEP_SECONDS: f64 = 1.0 / 60.0;
/// Where a killed player reappears. Velocity is left as it was.
pub const RESPAWN_POINT: (f64, f64) = (100.0, 100.0);
