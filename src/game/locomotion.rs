//! Planet-relative locomotion for a single actor.
//!
//! [`SurfaceLocomotion`] owns the actor's position, orientation, vertical velocity
//! and camera pitch. Each frame it runs, in this order:
//!
//! 1. look (yaw + clamped pitch)
//! 2. ground check along `-up`
//! 3. gravity / jump integration
//! 4. upright alignment toward the fresh `up`
//! 5. tangential move through the host's collision-aware move primitive
//!
//! Alignment runs before the move so the tangent basis is never a frame behind.
//! The engine is reached only through [`LocomotionHost`].

use log::{debug, warn};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, UnitVector3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::locomotion as consts;
use super::input::FrameInput;
use super::surface_motion::{
    align_orientation, alignment_factor, apply_yaw, build_motion_plan, camera_pivot_rotation,
    clamp_pitch, integrate_vertical_velocity, local_up, upright_target, MotionPlan,
};

/// Ground probe geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundProbeKind {
    /// Single ray from the actor center
    Ray,
    /// Shrunken copy of the actor capsule swept along `-up`
    #[default]
    CapsuleSweep,
}

/// Tunables for [`SurfaceLocomotion`]; the `[locomotion]` table of world.toml.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub pitch_limit: f32,
    pub gravity_strength: f32,
    /// Below 1.0 softens falls; a tunable, not a physical constant
    pub gravity_scale: f32,
    pub jump_force: f32,
    pub jump_boost_factor: f32,
    /// Vertical velocity held while grounded (toward the body)
    pub ground_stick_velocity: f32,
    /// Constant push toward the body while grounded and moving
    pub ground_stick_push: f32,
    pub slope_assist_threshold: f32,
    pub slope_assist_strength: f32,
    pub align_rate: f32,
    pub probe: GroundProbeKind,
    pub probe_slack: f32,
    pub probe_shrink: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: consts::MOVE_SPEED,
            mouse_sensitivity: consts::MOUSE_SENSITIVITY,
            pitch_limit: consts::PITCH_LIMIT_DEGREES,
            gravity_strength: consts::GRAVITY_STRENGTH,
            gravity_scale: consts::GRAVITY_SCALE,
            jump_force: consts::JUMP_FORCE,
            jump_boost_factor: consts::JUMP_BOOST_FACTOR,
            ground_stick_velocity: consts::GROUND_STICK_VELOCITY,
            ground_stick_push: consts::GROUND_STICK_PUSH,
            slope_assist_threshold: consts::SLOPE_ASSIST_THRESHOLD,
            slope_assist_strength: consts::SLOPE_ASSIST_STRENGTH,
            align_rate: consts::ALIGN_RATE,
            probe: GroundProbeKind::default(),
            probe_slack: consts::PROBE_SLACK,
            probe_shrink: consts::PROBE_SHRINK,
        }
    }
}

impl LocomotionConfig {
    pub fn validate(&self) -> Result<(), LocomotionError> {
        let non_negative = [
            ("move_speed", self.move_speed),
            ("mouse_sensitivity", self.mouse_sensitivity),
            ("gravity_strength", self.gravity_strength),
            ("jump_force", self.jump_force),
            ("jump_boost_factor", self.jump_boost_factor),
            ("ground_stick_velocity", self.ground_stick_velocity),
            ("ground_stick_push", self.ground_stick_push),
            ("slope_assist_strength", self.slope_assist_strength),
            ("align_rate", self.align_rate),
            ("probe_slack", self.probe_slack),
            ("probe_shrink", self.probe_shrink),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LocomotionError::InvalidConfig {
                    field,
                    reason: "must be a finite, non-negative number",
                });
            }
        }
        if !(self.gravity_scale.is_finite() && self.gravity_scale > 0.0) {
            return Err(LocomotionError::InvalidConfig {
                field: "gravity_scale",
                reason: "must be positive",
            });
        }
        if !(self.pitch_limit > 0.0 && self.pitch_limit <= 90.0) {
            return Err(LocomotionError::InvalidConfig {
                field: "pitch_limit",
                reason: "must be in (0, 90] degrees",
            });
        }
        if !(0.0..=1.0).contains(&self.slope_assist_threshold) {
            return Err(LocomotionError::InvalidConfig {
                field: "slope_assist_threshold",
                reason: "must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Collision capsule profile of the actor (total height includes both caps).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleProfile {
    pub radius: f32,
    pub height: f32,
}

impl CapsuleProfile {
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }

    /// Half length of the cylindrical segment between the two caps.
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }

    /// Same segment with a thinner radius, never below [`consts::MIN_PROBE_RADIUS`].
    pub fn shrunk(&self, shrink: f32) -> Self {
        let radius = (self.radius - shrink).max(consts::MIN_PROBE_RADIUS);
        Self {
            radius,
            height: 2.0 * (self.half_segment() + radius),
        }
    }

    fn validate(&self) -> Result<(), LocomotionError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(LocomotionError::InvalidCapsule("radius must be positive"));
        }
        if !(self.height.is_finite() && self.height >= 2.0 * self.radius) {
            return Err(LocomotionError::InvalidCapsule(
                "height must be at least twice the radius",
            ));
        }
        Ok(())
    }
}

/// The single reference body gravity pulls toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityBody {
    pub center: Point3<f32>,
}

/// Actor state owned exclusively by [`SurfaceLocomotion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorState {
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    /// Speed along the gravity axis; positive points at the body
    pub vertical_velocity: f32,
    /// Camera pitch in degrees; positive looks down
    pub pitch: f32,
}

/// Engine capabilities the locomotion component drives.
pub trait LocomotionHost {
    /// Casts a ray and returns the distance to the first solid hit within `max_distance`.
    fn cast_ray(
        &self,
        origin: &Point3<f32>,
        direction: &UnitVector3<f32>,
        max_distance: f32,
    ) -> Option<f32>;

    /// Sweeps a capsule posed at `pose` (segment along the pose's local Y)
    /// and returns the travel distance at first contact.
    fn cast_capsule(
        &self,
        pose: &Isometry3<f32>,
        capsule: &CapsuleProfile,
        direction: &UnitVector3<f32>,
        max_distance: f32,
    ) -> Option<f32>;

    /// Sweeps the actor collider from `pose` along `displacement`, resolving
    /// against world geometry, commits the result and returns the translation
    /// actually applied.
    fn move_actor_by(
        &mut self,
        pose: &Isometry3<f32>,
        displacement: &Vector3<f32>,
        up: &UnitVector3<f32>,
        dt: f32,
    ) -> Vector3<f32>;

    fn set_actor_rotation(&mut self, rotation: &UnitQuaternion<f32>);

    fn set_camera_pivot_local_rotation(&mut self, rotation: &UnitQuaternion<f32>);
}

/// What one call to [`SurfaceLocomotion::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionFrame {
    pub grounded: bool,
    /// Became grounded this frame
    pub landed: bool,
    /// Left the ground this frame
    pub left_ground: bool,
    pub up: UnitVector3<f32>,
    /// True when `up` could not be derived and the previous one was held
    pub degenerate_up: bool,
    pub vertical_velocity: f32,
    pub plan: MotionPlan,
    pub applied: Vector3<f32>,
}

/// Result of [`SurfaceLocomotion::move_actor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOutcome {
    pub plan: MotionPlan,
    pub applied: Vector3<f32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum LocomotionError {
    #[error("actor has no gravity body to orient against")]
    MissingGravityBody,
    #[error("actor spawned at the gravity body center")]
    ActorAtBodyCenter,
    #[error("invalid locomotion config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[error("invalid actor capsule: {0}")]
    InvalidCapsule(&'static str),
}

/// Planet-relative movement controller for one actor.
#[derive(Debug, Clone)]
pub struct SurfaceLocomotion {
    config: LocomotionConfig,
    capsule: CapsuleProfile,
    body: GravityBody,
    state: ActorState,
    up: UnitVector3<f32>,
    degenerate_up: bool,
    grounded: bool,
}

impl SurfaceLocomotion {
    /// Validates configuration and creates the actor state at spawn.
    ///
    /// Without a gravity body the actor cannot orient, so this is an
    /// activation failure rather than a per-frame condition.
    pub fn activate(
        config: LocomotionConfig,
        capsule: CapsuleProfile,
        body: Option<GravityBody>,
        position: Point3<f32>,
        orientation: UnitQuaternion<f32>,
    ) -> Result<Self, LocomotionError> {
        let body = body.ok_or(LocomotionError::MissingGravityBody)?;
        config.validate()?;
        capsule.validate()?;
        let up = local_up(&position, &body.center).ok_or(LocomotionError::ActorAtBodyCenter)?;

        Ok(Self {
            config,
            capsule,
            body,
            state: ActorState {
                position,
                orientation,
                vertical_velocity: 0.0,
                pitch: 0.0,
            },
            up,
            degenerate_up: false,
            grounded: false,
        })
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn capsule(&self) -> &CapsuleProfile {
        &self.capsule
    }

    pub fn body(&self) -> &GravityBody {
        &self.body
    }

    pub fn state(&self) -> &ActorState {
        &self.state
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// World-space up at the actor, as of the last refresh.
    pub fn up(&self) -> UnitVector3<f32> {
        self.up
    }

    /// Moves the actor without sweeping, stands it upright on the new local
    /// up and clears vertical velocity.
    pub fn teleport(&mut self, position: Point3<f32>) {
        self.state.position = position;
        self.state.vertical_velocity = 0.0;
        self.grounded = false;
        let up = self.refresh_up();
        self.state.orientation = upright_target(&self.state.orientation, &up);
    }

    /// Recomputes `up` from the current position, holding the previous value
    /// when the position is degenerate.
    fn refresh_up(&mut self) -> UnitVector3<f32> {
        match local_up(&self.state.position, &self.body.center) {
            Some(up) => self.up = up,
            None => {
                if !self.degenerate_up {
                    warn!(
                        "Degenerate local up at {:?}; holding previous up",
                        self.state.position
                    );
                }
                self.degenerate_up = true;
            }
        }
        self.up
    }

    fn pose(&self) -> Isometry3<f32> {
        Isometry3::from_parts(
            Translation3::from(self.state.position.coords),
            self.state.orientation,
        )
    }

    /// Yaw by `look_delta.x` and pitch by `-look_delta.y`, scaled by sensitivity.
    pub fn look<H: LocomotionHost + ?Sized>(&mut self, host: &mut H, look_delta: Vector2<f32>) {
        let scaled = look_delta * self.config.mouse_sensitivity;
        if !scaled.iter().all(|c| c.is_finite()) {
            debug!("Ignoring non-finite look delta {:?}", look_delta);
            return;
        }

        self.state.orientation = apply_yaw(&self.state.orientation, scaled.x);
        self.state.pitch = clamp_pitch(self.state.pitch - scaled.y, self.config.pitch_limit);

        host.set_actor_rotation(&self.state.orientation);
        host.set_camera_pivot_local_rotation(&camera_pivot_rotation(self.state.pitch));
    }

    /// Probe along `-up` for the configured clearance and update the grounded flag.
    pub fn ground_check<H: LocomotionHost + ?Sized>(&mut self, host: &H) -> bool {
        let up = self.refresh_up();
        let down = -up;
        let hit = match self.config.probe {
            GroundProbeKind::Ray => {
                let distance = self.capsule.height * 0.5 + self.config.probe_slack;
                host.cast_ray(&self.state.position, &down, distance)
            }
            GroundProbeKind::CapsuleSweep => {
                let probe = self.capsule.shrunk(self.config.probe_shrink);
                let distance = (self.capsule.radius - probe.radius) + self.config.probe_slack;
                host.cast_capsule(&self.pose(), &probe, &down, distance)
            }
        };

        // Ascending actors stay airborne until they turn around.
        self.grounded = hit.is_some() && self.state.vertical_velocity >= 0.0;
        self.grounded
    }

    pub fn apply_gravity_and_jump(&mut self, jump_pressed: bool, dt: f32) {
        let next = integrate_vertical_velocity(
            self.state.vertical_velocity,
            self.grounded,
            jump_pressed,
            dt,
            &self.config,
        );
        if self.grounded && jump_pressed {
            debug!("Jump at {:?} (vertical velocity {})", self.state.position, next);
        }
        self.state.vertical_velocity = next;
    }

    /// Tilt toward the fresh `up` with exponential smoothing.
    pub fn align_to_surface<H: LocomotionHost + ?Sized>(&mut self, host: &mut H, dt: f32) {
        let up = self.refresh_up();
        let factor = alignment_factor(self.config.align_rate, dt);
        self.state.orientation = align_orientation(&self.state.orientation, &up, factor);
        host.set_actor_rotation(&self.state.orientation);
    }

    /// Tangential move plus vertical velocity, resolved by the host.
    pub fn move_actor<H: LocomotionHost + ?Sized>(
        &mut self,
        host: &mut H,
        move_axis: Vector2<f32>,
        dt: f32,
    ) -> MotionOutcome {
        let up = self.refresh_up();
        let plan = build_motion_plan(
            &self.state.orientation,
            &up,
            move_axis,
            self.state.vertical_velocity,
            self.grounded,
            dt,
            &self.config,
        );

        let mut applied = host.move_actor_by(&self.pose(), &plan.desired, &up, dt);
        if !applied.iter().all(|c| c.is_finite()) {
            warn!("Host returned non-finite translation {:?}; keeping position", applied);
            applied = Vector3::zeros();
        }
        self.state.position += applied;

        MotionOutcome { plan, applied }
    }

    /// Runs one full frame. Returns `None` when the frame was skipped
    /// because `dt` was not a positive finite number.
    pub fn step<H: LocomotionHost + ?Sized>(
        &mut self,
        host: &mut H,
        input: &FrameInput,
    ) -> Option<LocomotionFrame> {
        if !(input.dt.is_finite() && input.dt > 0.0) {
            warn!("Skipping locomotion frame with invalid dt {}", input.dt);
            return None;
        }

        let was_grounded = self.grounded;
        self.degenerate_up = false;

        self.look(host, input.look_delta);
        self.ground_check(host);
        self.apply_gravity_and_jump(input.jump_pressed, input.dt);
        self.align_to_surface(host, input.dt);
        let outcome = self.move_actor(host, input.move_axis, input.dt);

        Some(LocomotionFrame {
            grounded: self.grounded,
            landed: self.grounded && !was_grounded,
            left_ground: was_grounded && !self.grounded,
            up: self.up,
            degenerate_up: self.degenerate_up,
            vertical_velocity: self.state.vertical_velocity,
            plan: outcome.plan,
            applied: outcome.applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::ButtonEdge;
    use crate::game::surface_motion::{local_forward, tangent_direction};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;
    const RADIUS: f32 = 10.0;

    /// Analytic sphere world: a solid planet and nothing else.
    struct SphereHost {
        center: Point3<f32>,
        radius: f32,
        capsule: CapsuleProfile,
        rotations: usize,
        pivot: Option<UnitQuaternion<f32>>,
        last_displacement: Vector3<f32>,
        moved_with: Option<UnitQuaternion<f32>>,
        calls: Vec<&'static str>,
    }

    impl SphereHost {
        fn new() -> Self {
            Self {
                center: Point3::origin(),
                radius: RADIUS,
                capsule: CapsuleProfile::new(0.5, 2.0),
                rotations: 0,
                pivot: None,
                last_displacement: Vector3::zeros(),
                moved_with: None,
                calls: Vec::new(),
            }
        }

        fn ray_sphere(
            &self,
            origin: &Point3<f32>,
            dir: &UnitVector3<f32>,
            radius: f32,
            max: f32,
        ) -> Option<f32> {
            let oc = origin - self.center;
            let c = oc.norm_squared() - radius * radius;
            if c <= 0.0 {
                return Some(0.0);
            }
            let b = dir.dot(&oc);
            let disc = b * b - c;
            if disc < 0.0 {
                return None;
            }
            let t = -b - disc.sqrt();
            (t >= 0.0 && t <= max).then_some(t)
        }
    }

    impl LocomotionHost for SphereHost {
        fn cast_ray(&self, origin: &Point3<f32>, direction: &UnitVector3<f32>, max: f32) -> Option<f32> {
            self.ray_sphere(origin, direction, self.radius, max)
        }

        fn cast_capsule(
            &self,
            pose: &Isometry3<f32>,
            capsule: &CapsuleProfile,
            direction: &UnitVector3<f32>,
            max: f32,
        ) -> Option<f32> {
            let foot = pose * Point3::new(0.0, -capsule.half_segment(), 0.0);
            self.ray_sphere(&foot, direction, self.radius + capsule.radius, max)
        }

        fn move_actor_by(
            &mut self,
            pose: &Isometry3<f32>,
            displacement: &Vector3<f32>,
            _up: &UnitVector3<f32>,
            _dt: f32,
        ) -> Vector3<f32> {
            self.last_displacement = *displacement;
            self.moved_with = Some(pose.rotation);
            self.calls.push("move");
            let from = Point3::from(pose.translation.vector);
            let mut to = from + displacement;
            let rest = self.radius + self.capsule.height * 0.5;
            let offset = to - self.center;
            if offset.norm() < rest {
                to = self.center + offset.normalize() * rest;
            }
            to - from
        }

        fn set_actor_rotation(&mut self, _rotation: &UnitQuaternion<f32>) {
            self.rotations += 1;
            self.calls.push("rotate");
        }

        fn set_camera_pivot_local_rotation(&mut self, rotation: &UnitQuaternion<f32>) {
            self.pivot = Some(*rotation);
        }
    }

    fn body() -> Option<GravityBody> {
        Some(GravityBody {
            center: Point3::origin(),
        })
    }

    fn actor_at(height_above_surface: f32, config: LocomotionConfig) -> SurfaceLocomotion {
        let position = Point3::new(0.0, RADIUS + 1.0 + height_above_surface, 0.0);
        SurfaceLocomotion::activate(
            config,
            CapsuleProfile::new(0.5, 2.0),
            body(),
            position,
            UnitQuaternion::identity(),
        )
        .unwrap()
    }

    fn frame(move_axis: Vector2<f32>, jump_pressed: bool) -> FrameInput {
        FrameInput {
            move_axis,
            look_delta: Vector2::zeros(),
            jump_pressed,
            dt: DT,
        }
    }

    #[test]
    fn test_activation_requires_gravity_body() {
        let err = SurfaceLocomotion::activate(
            LocomotionConfig::default(),
            CapsuleProfile::new(0.5, 2.0),
            None,
            Point3::new(0.0, 5.0, 0.0),
            UnitQuaternion::identity(),
        )
        .unwrap_err();
        assert_eq!(err, LocomotionError::MissingGravityBody);
    }

    #[test]
    fn test_activation_rejects_actor_at_center() {
        let err = SurfaceLocomotion::activate(
            LocomotionConfig::default(),
            CapsuleProfile::new(0.5, 2.0),
            body(),
            Point3::origin(),
            UnitQuaternion::identity(),
        )
        .unwrap_err();
        assert_eq!(err, LocomotionError::ActorAtBodyCenter);
    }

    #[test]
    fn test_activation_rejects_bad_config() {
        let config = LocomotionConfig {
            gravity_scale: 0.0,
            ..Default::default()
        };
        let err = SurfaceLocomotion::activate(
            config,
            CapsuleProfile::new(0.5, 2.0),
            body(),
            Point3::new(0.0, 20.0, 0.0),
            UnitQuaternion::identity(),
        )
        .unwrap_err();
        assert!(matches!(err, LocomotionError::InvalidConfig { field: "gravity_scale", .. }));
    }

    #[test]
    fn test_pitch_stays_clamped() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        for dy in [1.0e6, -3.0, f32::INFINITY, -1.0e9, 42.0, f32::NEG_INFINITY] {
            actor.look(&mut host, Vector2::new(0.0, dy));
            assert!(actor.state().pitch.abs() <= 80.0, "pitch {}", actor.state().pitch);
        }
        actor.look(&mut host, Vector2::new(0.0, f32::NAN));
        assert!(actor.state().pitch.abs() <= 80.0);
        assert!(host.pivot.is_some());
    }

    #[test]
    fn test_look_yaws_around_actor_up() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        // 600 units * 0.15 sensitivity = 90 degrees to the right.
        actor.look(&mut host, Vector2::new(600.0, 0.0));
        let forward = actor.state().orientation * -Vector3::z();
        assert_relative_eq!(forward, Vector3::x(), epsilon = 1e-5);
        assert_eq!(host.rotations, 1);
    }

    #[test]
    fn test_ground_check_ray_and_capsule_agree_on_surface() {
        let host = SphereHost::new();
        for probe in [GroundProbeKind::Ray, GroundProbeKind::CapsuleSweep] {
            let config = LocomotionConfig {
                probe,
                ..Default::default()
            };
            let mut resting = actor_at(0.0, config);
            assert!(resting.ground_check(&host), "{probe:?} should see ground");

            let mut hovering = actor_at(0.2, config);
            assert!(hovering.ground_check(&host), "{probe:?} slack should cover 0.2");

            let mut falling = actor_at(2.0, config);
            assert!(!falling.ground_check(&host), "{probe:?} should be airborne");
        }
    }

    #[test]
    fn test_tiny_capsule_probe_radius_is_clamped() {
        let capsule = CapsuleProfile::new(0.02, 2.0);
        let probe = capsule.shrunk(0.05);
        assert_eq!(probe.radius, consts::MIN_PROBE_RADIUS);
        assert_relative_eq!(probe.half_segment(), capsule.half_segment(), epsilon = 1e-6);
    }

    #[test]
    fn test_grounded_velocity_settles_to_stick_in_one_frame() {
        let mut host = SphereHost::new();
        let config = LocomotionConfig::default();
        let mut actor = actor_at(0.0, config);
        actor.state.vertical_velocity = 17.0;
        let report = actor.step(&mut host, &frame(Vector2::zeros(), false)).unwrap();
        assert!(report.grounded);
        assert_eq!(report.vertical_velocity, config.ground_stick_velocity);
    }

    #[test]
    fn test_jump_fires_once_per_press() {
        let mut host = SphereHost::new();
        let config = LocomotionConfig {
            jump_boost_factor: 1.25,
            ..Default::default()
        };
        let mut actor = actor_at(0.0, config);
        let mut edge = ButtonEdge::default();

        let first = actor
            .step(&mut host, &frame(Vector2::zeros(), edge.update(true)))
            .unwrap();
        assert_eq!(first.vertical_velocity, -12.0 * 1.25);

        // Holding the button: no repeat; the actor is ascending and airborne.
        let second = actor
            .step(&mut host, &frame(Vector2::zeros(), edge.update(true)))
            .unwrap();
        assert!(!second.grounded);
        assert_relative_eq!(second.vertical_velocity, -15.0 + 30.0 * DT, epsilon = 1e-5);
    }

    #[test]
    fn test_jump_displaces_away_from_body() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        actor.step(&mut host, &frame(Vector2::zeros(), true)).unwrap();
        let next = actor.step(&mut host, &frame(Vector2::zeros(), false)).unwrap();
        let vertical = next.plan.vertical_velocity;
        assert!(vertical.dot(&next.up.into_inner()) > 0.0, "jump should move outward");
    }

    #[test]
    fn test_airborne_fall_matches_integral() {
        let mut host = SphereHost::new();
        let config = LocomotionConfig {
            gravity_scale: 0.5,
            ..Default::default()
        };
        let start_height = 50.0;
        let mut actor = actor_at(start_height, config);
        let start_radius = actor.state().position.coords.norm();
        let g = config.gravity_strength * config.gravity_scale;

        let frames = 20;
        let mut previous = actor.state().vertical_velocity;
        for _ in 0..frames {
            let report = actor.step(&mut host, &frame(Vector2::zeros(), false)).unwrap();
            assert!(!report.grounded);
            assert_relative_eq!(report.vertical_velocity - previous, g * DT, epsilon = 1e-4);
            previous = report.vertical_velocity;
        }
        let n = frames as f32;
        assert_relative_eq!(actor.state().vertical_velocity, g * DT * n, epsilon = 1e-3);

        let fallen = start_radius - actor.state().position.coords.norm();
        let expected = g * DT * DT * n * (n + 1.0) * 0.5;
        assert_relative_eq!(fallen, expected, epsilon = 1e-3);
    }

    #[test]
    fn test_grounded_forward_walk_speed() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        let report = actor.step(&mut host, &frame(Vector2::new(0.0, 1.0), false)).unwrap();
        assert!(report.grounded);

        let horizontal = report.plan.horizontal_velocity * DT;
        assert_relative_eq!(horizontal.norm(), 8.0 * DT, epsilon = 1e-5);
        assert_relative_eq!(report.up.dot(&horizontal), 0.0, epsilon = 1e-6);
        assert_relative_eq!(horizontal.normalize(), -Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_is_applied_before_the_move() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        actor.step(&mut host, &frame(Vector2::new(0.0, 1.0), false)).unwrap();

        let last_rotate = host.calls.iter().rposition(|c| *c == "rotate").unwrap();
        let last_move = host.calls.iter().rposition(|c| *c == "move").unwrap();
        assert!(last_rotate < last_move, "call order {:?}", host.calls);
    }

    #[test]
    fn test_tilted_actor_walks_along_aligned_heading() {
        let mut host = SphereHost::new();
        let tilted = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 70f32.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 45f32.to_radians());
        let config = LocomotionConfig {
            probe: GroundProbeKind::Ray,
            ..LocomotionConfig::default()
        };
        let mut actor = SurfaceLocomotion::activate(
            config,
            CapsuleProfile::new(0.5, 2.0),
            body(),
            Point3::new(0.0, RADIUS + 1.0, 0.0),
            tilted,
        )
        .unwrap();
        let up = actor.up();

        let report = actor.step(&mut host, &frame(Vector2::new(0.0, 1.0), false)).unwrap();
        let aligned = actor.state().orientation;
        assert_ne!(aligned, tilted);

        let before = tangent_direction(&(tilted * local_forward()), &up);
        let after = tangent_direction(&(aligned * local_forward()), &up);
        // The partial alignment turns the projected heading by a few degrees.
        assert!(before.dot(&after) < 0.999, "heading unchanged: {before:?} {after:?}");

        assert_relative_eq!(report.plan.horizontal_velocity.normalize(), after, epsilon = 1e-4);
        assert_relative_eq!(report.plan.horizontal_velocity.norm(), 8.0, epsilon = 1e-3);
        assert_eq!(host.moved_with, Some(aligned));
    }

    #[test]
    fn test_up_stays_unit_while_walking_around_planet() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        for i in 0..600 {
            let axis = Vector2::new((i as f32 * 0.01).sin(), 1.0);
            let report = actor
                .step(&mut host, &FrameInput {
                    look_delta: Vector2::new(1.0, 0.5),
                    ..frame(axis, i < 400 && i % 97 == 0)
                })
                .unwrap();
            assert_relative_eq!(report.up.norm(), 1.0, epsilon = 1e-5);
            assert!(!report.degenerate_up);
            assert_relative_eq!(report.up.dot(&report.plan.horizontal_velocity), 0.0, epsilon = 1e-3);
        }
        // Still on (or just above) the surface after walking a long arc.
        let radius = actor.state().position.coords.norm();
        assert!(radius >= RADIUS + 0.99 && radius < RADIUS + 3.5, "radius {radius}");
        let actor_up = actor.state().orientation * Vector3::y_axis();
        assert!(actor_up.dot(&actor.up().into_inner()) > 0.95);
    }

    #[test]
    fn test_degenerate_position_holds_previous_up() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.0, LocomotionConfig::default());
        let before = actor.up();
        actor.state.position = Point3::origin();
        let report = actor.step(&mut host, &frame(Vector2::zeros(), false)).unwrap();
        assert!(report.degenerate_up);
        assert_eq!(report.up, before);
        assert!(report.up.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_invalid_dt_skips_frame() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(3.0, LocomotionConfig::default());
        let before = *actor.state();
        for dt in [0.0, -1.0, f32::NAN] {
            let input = FrameInput { dt, ..frame(Vector2::new(1.0, 1.0), true) };
            assert!(actor.step(&mut host, &input).is_none());
        }
        assert_eq!(*actor.state(), before);
    }

    #[test]
    fn test_landing_transition_reported() {
        let mut host = SphereHost::new();
        let mut actor = actor_at(0.5, LocomotionConfig::default());
        let mut landed = false;
        for _ in 0..120 {
            let report = actor.step(&mut host, &frame(Vector2::zeros(), false)).unwrap();
            if report.landed {
                landed = true;
                break;
            }
        }
        assert!(landed, "actor should land on the sphere");
    }
}
