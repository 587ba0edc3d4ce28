/// Clamps the horizontal coordinates into `[-limit, limit]`; height is untouched.
fn clamp_to_square(point: Vec3, limit: f32) -> Vec3 {
    Vec3::new(
        point.x.clamp(-limit, limit),
        point.y,
        point.z.clamp(-limit, limit),
    )
}

/// Yaw whose forward vector points along `direction` on the floor plane.
fn heading_yaw(direction: Vec3) -> f32 {
    (-direction.x).atan2(-direction.z)
}

/// Uniform in `[min, max)`; an empty or inverted range yields `min`.
fn draw(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
