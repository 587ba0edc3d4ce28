//! First-person viewer.
//!
//! Convention: right-handed, +Y up. Yaw 0 looks down -Z and positive yaw turns left
//! (counter-clockwise seen from above). Pitch is positive when looking up.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

pub const PITCH_LIMIT_RADIANS: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstPersonCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.7, 0.0),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl FirstPersonCamera {
    pub fn pose(&self) -> ViewerPose {
        ViewerPose {
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }

    pub fn set_pose(&mut self, pose: ViewerPose) {
        self.position = pose.position;
        self.yaw = pose.yaw;
        self.pitch = clamp_pitch(pose.pitch);
    }

    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }

    /// Forward direction projected onto the floor plane.
    pub fn flat_forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(-sin_yaw, 0.0, -cos_yaw)
    }

    pub fn right(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(cos_yaw, 0.0, -sin_yaw)
    }

    /// Mouse right (`dx > 0`) turns right, mouse down (`dy > 0`) looks down.
    pub fn apply_look_delta(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw = wrap_angle(self.yaw - dx * sensitivity);
        self.pitch = clamp_pitch(self.pitch - dy * sensitivity);
    }

    /// Moves on the floor plane; `forward_amount` along the view, `strafe_amount` to the right.
    pub fn walk(&mut self, forward_amount: f32, strafe_amount: f32) {
        let step = self.flat_forward() * forward_amount + self.right() * strafe_amount;
        self.position += step;
    }
}

fn clamp_pitch(pitch: f32) -> f32 {
    if !pitch.is_finite() {
        return 0.0;
    }
    pitch.clamp(-PITCH_LIMIT_RADIANS, PITCH_LIMIT_RADIANS)
}

/// Wraps to `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_close(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < 0.0001,
            "{actual:?} vs {expected:?}"
        );
    }

    #[test]
    fn zero_yaw_looks_down_negative_z() {
        let camera = FirstPersonCamera::default();
        assert_vec3_close(camera.forward(), Vec3::new(0.0, 0.0, -1.0));
        assert_vec3_close(camera.right(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn right_is_forward_cross_up() {
        let camera = FirstPersonCamera {
            yaw: 0.7,
            ..FirstPersonCamera::default()
        };
        assert_vec3_close(camera.flat_forward().cross(Vec3::Y), camera.right());
    }

    #[test]
    fn look_delta_turns_right_and_clamps_pitch() {
        let mut camera = FirstPersonCamera::default();
        camera.apply_look_delta(100.0, 0.0, 0.002);
        assert!(camera.yaw < 0.0);
        assert!(camera.forward().x > 0.0);

        camera.apply_look_delta(0.0, -100_000.0, 0.002);
        assert!((camera.pitch - PITCH_LIMIT_RADIANS).abs() < 0.0001);
    }

    #[test]
    fn walk_forward_moves_along_flat_forward_even_when_pitched() {
        let mut camera = FirstPersonCamera {
            pitch: -1.0,
            ..FirstPersonCamera::default()
        };
        camera.walk(2.0, 0.0);
        assert_vec3_close(camera.position, Vec3::new(0.0, 1.7, -2.0));

        camera.walk(0.0, 1.0);
        assert_vec3_close(camera.position, Vec3::new(1.0, 1.7, -2.0));
    }

    #[test]
    fn pose_round_trip_is_exact() {
        let mut camera = FirstPersonCamera::default();
        let pose = ViewerPose {
            position: Vec3::new(3.25, 1.7, -8.5),
            yaw: 1.25,
            pitch: -0.4,
        };
        camera.set_pose(pose);
        assert_eq!(camera.pose(), pose);
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        use std::f32::consts::PI;
        for angle in [-10.0f32, -PI, 0.0, PI, 7.0, 100.0] {
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -PI - 0.0001 && wrapped <= PI + 0.0001, "{wrapped}");
        }
    }
}
