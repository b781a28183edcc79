use nalgebra::{Point3, UnitQuaternion, UnitVector3, Vector2, Vector3};

use super::constants::locomotion as consts;
use super::locomotion::LocomotionConfig;

/// Per-frame movement plan for an actor walking on the planet surface.
/// Velocities are in units/second; `desired` is the displacement for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    /// Walk velocity, tangent to the local up.
    pub horizontal_velocity: Vector3<f32>,
    /// Ground-stick push and slope assist, along `-up`.
    pub correction_velocity: Vector3<f32>,
    /// `-up * vertical_velocity`
    pub vertical_velocity: Vector3<f32>,
    pub desired: Vector3<f32>,
}

/// Actor-local forward axis (right-handed, -Z forward).
pub fn local_forward() -> Vector3<f32> {
    -Vector3::z()
}

/// Actor-local right axis.
pub fn local_right() -> Vector3<f32> {
    Vector3::x()
}

/// Outward unit normal of the gravity body at `position`.
/// Returns `None` when the actor sits on the body center or the position is not finite.
pub fn local_up(position: &Point3<f32>, body_center: &Point3<f32>) -> Option<UnitVector3<f32>> {
    let offset = position - body_center;
    if !offset.iter().all(|c| c.is_finite()) {
        return None;
    }
    UnitVector3::try_new(offset, consts::DEGENERATE_UP_EPSILON)
}

/// Removes the component of `v` along `normal`.
pub fn project_on_plane(v: &Vector3<f32>, normal: &UnitVector3<f32>) -> Vector3<f32> {
    v - normal.into_inner() * normal.dot(v)
}

/// Unit tangent direction of `v` on the plane of `up`, or zero when `v` is parallel to `up`.
pub fn tangent_direction(v: &Vector3<f32>, up: &UnitVector3<f32>) -> Vector3<f32> {
    project_on_plane(v, up)
        .try_normalize(consts::DEGENERATE_UP_EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// Clamps each move axis into [-1, 1]; non-finite components read as 0.
pub fn clamp_move_axis(axis: Vector2<f32>) -> Vector2<f32> {
    axis.map(|c| if c.is_finite() { c.clamp(-1.0, 1.0) } else { 0.0 })
}

pub fn clamp_pitch(pitch: f32, limit: f32) -> f32 {
    pitch.clamp(-limit, limit)
}

/// Local rotation of the camera pivot for a pitch in degrees (positive looks down).
pub fn camera_pivot_rotation(pitch_degrees: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -pitch_degrees.to_radians())
}

/// Applies a yaw in degrees around the actor's own up axis (positive turns right).
pub fn apply_yaw(orientation: &UnitQuaternion<f32>, yaw_degrees: f32) -> UnitQuaternion<f32> {
    orientation * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -yaw_degrees.to_radians())
}

/// Next vertical velocity along the gravity axis.
///
/// Grounded actors hold the ground-stick velocity, or launch away from the body
/// on the jump edge. Airborne actors accelerate toward the body.
pub fn integrate_vertical_velocity(
    vertical_velocity: f32,
    grounded: bool,
    jump_pressed: bool,
    dt: f32,
    config: &LocomotionConfig,
) -> f32 {
    if grounded {
        if jump_pressed {
            -config.jump_force * config.jump_boost_factor
        } else {
            config.ground_stick_velocity
        }
    } else {
        vertical_velocity + config.gravity_strength * config.gravity_scale * dt
    }
}

/// Build the desired displacement for one frame.
pub fn build_motion_plan(
    orientation: &UnitQuaternion<f32>,
    up: &UnitVector3<f32>,
    move_axis: Vector2<f32>,
    vertical_velocity: f32,
    grounded: bool,
    dt: f32,
    config: &LocomotionConfig,
) -> MotionPlan {
    let axis = clamp_move_axis(move_axis);
    let raw_forward = orientation * local_forward();
    let raw_right = orientation * local_right();

    let forward = tangent_direction(&raw_forward, up);
    let right = tangent_direction(&raw_right, up);
    let horizontal_velocity = (forward * axis.y + right * axis.x) * config.move_speed;

    let down = -up.into_inner();
    let mut correction_velocity = Vector3::zeros();
    if grounded {
        correction_velocity += down * config.ground_stick_push;

        let raw_dir = raw_forward * axis.y + raw_right * axis.x;
        if let Some(dir) = raw_dir.try_normalize(consts::DEGENERATE_UP_EPSILON) {
            let steepness = slope_steepness(&dir, up);
            if steepness > config.slope_assist_threshold {
                correction_velocity += down * (steepness * config.slope_assist_strength);
            }
        }
    }

    let vertical = down * vertical_velocity;
    MotionPlan {
        horizontal_velocity,
        correction_velocity,
        vertical_velocity: vertical,
        desired: (horizontal_velocity + correction_velocity + vertical) * dt,
    }
}

/// How far a unit move direction leans out of the tangent plane (0 = flat, 1 = along up).
pub fn slope_steepness(direction: &Vector3<f32>, up: &UnitVector3<f32>) -> f32 {
    up.dot(direction).abs().min(1.0)
}

/// Frame-rate independent interpolation factor for exponential smoothing.
pub fn alignment_factor(rate: f32, dt: f32) -> f32 {
    if rate <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}

/// Rotation that tilts `orientation` so its up axis matches `up`, keeping heading.
pub fn upright_target(orientation: &UnitQuaternion<f32>, up: &UnitVector3<f32>) -> UnitQuaternion<f32> {
    let current_up = orientation * Vector3::y_axis();
    let tilt = UnitQuaternion::rotation_between_axis(&current_up, up).unwrap_or_else(|| {
        // Upside down: flip over the actor's right axis.
        UnitQuaternion::from_axis_angle(&(orientation * Vector3::x_axis()), std::f32::consts::PI)
    });
    tilt * orientation
}

/// Slerps `orientation` toward its upright target by `factor`.
pub fn align_orientation(
    orientation: &UnitQuaternion<f32>,
    up: &UnitVector3<f32>,
    factor: f32,
) -> UnitQuaternion<f32> {
    let target = upright_target(orientation, up);
    orientation
        .try_slerp(&target, factor, 1.0e-6)
        .unwrap_or(target)
}
