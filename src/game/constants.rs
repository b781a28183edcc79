//! Simulation and gameplay constants.
//! Centralizing these keeps config defaults and physics setup in agreement.

/// Physics constants
pub mod physics {
    /// Fixed timestep for the simulation (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Default planet radius in world units
    pub const PLANET_RADIUS: f32 = 50.0;

    /// Character capsule radius
    pub const CHARACTER_RADIUS: f32 = 0.5;

    /// Character capsule total height
    pub const CHARACTER_HEIGHT: f32 = 2.0;

    /// Spawn clearance above the planet surface (measured from capsule center)
    pub const CHARACTER_SPAWN_HEIGHT: f32 = 3.0;

    /// Character controller autostep max height
    pub const AUTOSTEP_MAX_HEIGHT: f32 = 0.4;

    /// Character controller autostep min width
    pub const AUTOSTEP_MIN_WIDTH: f32 = 0.05;

    /// Character controller snap to ground distance
    pub const SNAP_TO_GROUND: f32 = 0.2;

    /// Skin offset kept between the capsule and obstacles
    pub const CHARACTER_OFFSET: f32 = 0.02;

    /// Steepest slope the controller climbs (degrees)
    pub const MAX_SLOPE_CLIMB_DEGREES: f32 = 50.0;

    /// Slopes steeper than this start sliding (degrees)
    pub const MIN_SLOPE_SLIDE_DEGREES: f32 = 40.0;
}

/// Locomotion defaults (overridable through `[locomotion]` in world.toml)
pub mod locomotion {
    pub const MOVE_SPEED: f32 = 8.0;

    /// Degrees of rotation per unit of look delta
    pub const MOUSE_SENSITIVITY: f32 = 0.15;

    /// Camera pitch clamp in degrees
    pub const PITCH_LIMIT_DEGREES: f32 = 80.0;

    pub const GRAVITY_STRENGTH: f32 = 30.0;

    pub const GRAVITY_SCALE: f32 = 1.0;

    pub const JUMP_FORCE: f32 = 12.0;

    pub const JUMP_BOOST_FACTOR: f32 = 1.0;

    /// Vertical velocity held while grounded (positive points at the planet)
    pub const GROUND_STICK_VELOCITY: f32 = 2.0;

    /// Extra push toward the planet added to grounded movement
    pub const GROUND_STICK_PUSH: f32 = 0.5;

    /// Steepness (|dir . up|) above which slope assist kicks in
    pub const SLOPE_ASSIST_THRESHOLD: f32 = 0.35;

    pub const SLOPE_ASSIST_STRENGTH: f32 = 4.0;

    /// Exponential alignment rate (1/s)
    pub const ALIGN_RATE: f32 = 6.0;

    /// Clearance added to the ground probe
    pub const PROBE_SLACK: f32 = 0.3;

    /// Amount the sweep capsule is thinner than the collider
    pub const PROBE_SHRINK: f32 = 0.05;

    /// Lower bound for the sweep capsule radius
    pub const MIN_PROBE_RADIUS: f32 = 0.01;

    /// Offsets shorter than this cannot define a local up
    pub const DEGENERATE_UP_EPSILON: f32 = 1.0e-4;
}

/// Gameplay defaults
pub mod gameplay {
    /// Number of quickbar slots
    pub const QUICKBAR_SLOTS: usize = 3;

    /// Chunks granted per mined ore when not configured
    pub const DEFAULT_CHUNK_AMOUNT: u32 = 1;

    /// Max distance between player and ore for mining
    pub const MINING_REACH: f32 = 3.0;

    /// Default NPC trigger radius
    pub const NPC_TRIGGER_RADIUS: f32 = 3.0;

    /// Half extents of an ore node collider
    pub const ORE_HALF_EXTENTS: [f32; 3] = [0.4, 0.4, 0.4];

    /// Half extents of an NPC body collider
    pub const NPC_HALF_EXTENTS: [f32; 3] = [0.4, 1.0, 0.4];
}
