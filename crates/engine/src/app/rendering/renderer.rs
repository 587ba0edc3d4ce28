use std::sync::Arc;

use glam::Vec3;
use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{NodeDesc, NodeLayer, Rgb, SceneWorld};

use super::{world_to_screen_px, Viewport};

const BOUNDS_COLOR: [u8; 4] = [235, 235, 235, 255];
const MARKED_OUTLINE_COLOR: [u8; 4] = [255, 210, 70, 255];
const VIEWER_COLOR: [u8; 4] = [255, 80, 80, 255];
const VIEWER_HALF_SIZE_PX: i32 = 3;
const VIEWER_ARROW_LENGTH_PX: f32 = 14.0;
const MIN_NODE_HALF_SIZE_PX: i32 = 1;
/// Ground is drawn darker than the sky it is lit by.
const GROUND_SHADE: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    /// Draws the visible layers as a map of `bounds_half_size` around the origin.
    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        bounds_half_size: f32,
    ) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        let viewport = self.viewport;
        let (width, height) = (viewport.width, viewport.height);
        let pixels_per_world = viewport.pixels_per_world(bounds_half_size * 1.1);
        let frame = self.pixels.frame_mut();
        let graph = world.graph();
        let lighting = graph.lighting();
        let light = lighting.ambient_intensity.clamp(0.15, 1.0);

        let clear_color = lighting.sky_color.scaled(GROUND_SHADE + 0.4 * light).to_rgba8();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&clear_color);
        }

        let corner = Vec3::new(bounds_half_size, 0.0, bounds_half_size);
        let bounds_rect = rect_from_corners(
            world_to_screen_px(-corner, Vec3::ZERO, viewport, pixels_per_world),
            world_to_screen_px(corner, Vec3::ZERO, viewport, pixels_per_world),
        );
        draw_rect_outline(frame, width, height, bounds_rect, BOUNDS_COLOR);

        for (_, desc, marked) in graph.visible_nodes() {
            let rect = node_screen_rect(desc, viewport, pixels_per_world);
            if desc.layer == NodeLayer::Ghost {
                draw_rect_outline(frame, width, height, rect, desc.color.to_rgba8());
                continue;
            }
            let color = shade(desc.color, light);
            fill_rect(frame, width, height, rect, color);
            if marked {
                draw_rect_outline(frame, width, height, rect, MARKED_OUTLINE_COLOR);
            }
        }

        let camera = world.camera();
        let (vx, vy) = world_to_screen_px(camera.position, Vec3::ZERO, viewport, pixels_per_world);
        let heading = camera.flat_forward();
        let tip = (
            vx + (heading.x * VIEWER_ARROW_LENGTH_PX).round() as i32,
            vy + (heading.z * VIEWER_ARROW_LENGTH_PX).round() as i32,
        );
        fill_rect(
            frame,
            width,
            height,
            rect_from_center(vx, vy, VIEWER_HALF_SIZE_PX, VIEWER_HALF_SIZE_PX),
            VIEWER_COLOR,
        );
        draw_line(frame, width, height, (vx, vy), tip, VIEWER_COLOR);

        self.pixels.render()
    }
}

fn shade(color: Rgb, light: f32) -> [u8; 4] {
    color.scaled(0.4 + 0.6 * light).to_rgba8()
}

fn node_screen_rect(desc: &NodeDesc, viewport: Viewport, pixels_per_world: f32) -> ScreenRectPx {
    let (cx, cy) = world_to_screen_px(desc.center(), Vec3::ZERO, viewport, pixels_per_world);
    // Axis-aligned bounds of the yawed footprint.
    let (sin_yaw, cos_yaw) = desc.orientation.yaw.sin_cos();
    let (sin_yaw, cos_yaw) = (sin_yaw.abs(), cos_yaw.abs());
    let extent_x = desc.half_extents.x * cos_yaw + desc.half_extents.z * sin_yaw;
    let extent_z = desc.half_extents.x * sin_yaw + desc.half_extents.z * cos_yaw;
    let half_w = ((extent_x * pixels_per_world).round() as i32).max(MIN_NODE_HALF_SIZE_PX);
    let half_h = ((extent_z * pixels_per_world).round() as i32).max(MIN_NODE_HALF_SIZE_PX);
    rect_from_center(cx, cy, half_w, half_h)
}

fn rect_from_center(cx: i32, cy: i32, half_w: i32, half_h: i32) -> ScreenRectPx {
    ScreenRectPx {
        left: cx - half_w,
        right: cx + half_w,
        top: cy - half_h,
        bottom: cy + half_h,
    }
}

fn rect_from_corners(a: (i32, i32), b: (i32, i32)) -> ScreenRectPx {
    ScreenRectPx {
        left: a.0.min(b.0),
        right: a.0.max(b.0),
        top: a.1.min(b.1),
        bottom: a.1.max(b.1),
    }
}

fn fill_rect(frame: &mut [u8], width: u32, height: u32, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let right = rect.right.min(width as i32 - 1);
    let top = rect.top.max(0);
    let bottom = rect.bottom.min(height as i32 - 1);
    for y in top..=bottom {
        for x in left..=right {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn draw_rect_outline(frame: &mut [u8], width: u32, height: u32, rect: ScreenRectPx, color: [u8; 4]) {
    for x in rect.left..=rect.right {
        write_pixel_clipped_to(frame, width, height, x, rect.top, color);
        write_pixel_clipped_to(frame, width, height, x, rect.bottom, color);
    }
    for y in rect.top..=rect.bottom {
        write_pixel_clipped_to(frame, width, height, rect.left, y, color);
        write_pixel_clipped_to(frame, width, height, rect.right, y, color);
    }
}

fn draw_line(
    frame: &mut [u8],
    width: u32,
    height: u32,
    from: (i32, i32),
    to: (i32, i32),
    color: [u8; 4],
) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).max(1);
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let x = from.0 as f32 + (to.0 - from.0) as f32 * t;
        let y = from.1 as f32 + (to.1 - from.1) as f32 * t;
        write_pixel_clipped_to(frame, width, height, x.round() as i32, y.round() as i32, color);
    }
}

fn write_pixel_clipped_to(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x >= width as i32 || y >= height as i32 {
        return;
    }
    write_pixel_rgba_clipped(frame, width as usize, x, y, color);
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{NodeOwner, Orientation};

    fn pixel(frame: &[u8], width: u32, x: i32, y: i32) -> [u8; 4] {
        let offset = (y as usize * width as usize + x as usize) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let (width, height) = (8u32, 6u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        fill_rect(
            &mut frame,
            width,
            height,
            ScreenRectPx {
                left: -4,
                right: 2,
                top: 4,
                bottom: 20,
            },
            [9, 9, 9, 255],
        );
        assert_eq!(pixel(&frame, width, 0, 5), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, width, 2, 4), [9, 9, 9, 255]);
        assert_eq!(pixel(&frame, width, 3, 4), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, width, 0, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let (width, height) = (10u32, 10u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        draw_rect_outline(
            &mut frame,
            width,
            height,
            rect_from_center(5, 5, 2, 2),
            [1, 2, 3, 255],
        );
        assert_eq!(pixel(&frame, width, 3, 5), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, width, 7, 7), [1, 2, 3, 255]);
        assert_eq!(pixel(&frame, width, 5, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let (width, height) = (10u32, 10u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        draw_line(&mut frame, width, height, (1, 1), (8, 4), [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, width, 1, 1), [7, 7, 7, 255]);
        assert_eq!(pixel(&frame, width, 8, 4), [7, 7, 7, 255]);
    }

    #[test]
    fn node_rect_uses_xz_footprint_with_minimum_size() {
        let viewport = Viewport {
            width: 100,
            height: 100,
        };
        let desc = NodeDesc {
            owner: None::<NodeOwner>,
            layer: NodeLayer::Outdoor,
            anchor: Vec3::new(1.0, 0.0, -1.0),
            offset: Vec3::ZERO,
            orientation: Orientation::default(),
            half_extents: Vec3::new(2.0, 5.0, 0.01),
            color: Rgb::new(1.0, 1.0, 1.0),
        };
        let rect = node_screen_rect(&desc, viewport, 10.0);
        assert_eq!(rect, rect_from_center(60, 40, 20, MIN_NODE_HALF_SIZE_PX));

        let turned = NodeDesc {
            orientation: Orientation::from_yaw(std::f32::consts::FRAC_PI_2),
            ..desc
        };
        let rect = node_screen_rect(&turned, viewport, 10.0);
        assert_eq!(rect, rect_from_center(60, 40, MIN_NODE_HALF_SIZE_PX, 20));
    }
}
