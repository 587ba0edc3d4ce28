use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Scale that fits a square of `half_extent` world units around the map centre.
    pub fn pixels_per_world(&self, half_extent: f32) -> f32 {
        let shortest = self.width.min(self.height) as f32;
        if half_extent <= 0.0 || !half_extent.is_finite() {
            return 1.0;
        }
        (shortest * 0.5 / half_extent).max(f32::EPSILON)
    }
}

/// Top-down projection onto the XZ plane: +X to the right, -Z (yaw 0 forward) up.
pub fn world_to_screen_px(
    world: Vec3,
    center: Vec3,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32) {
    let x = (world.x - center.x) * pixels_per_world + viewport.width as f32 * 0.5;
    let y = (world.z - center.z) * pixels_per_world + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}
