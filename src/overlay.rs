//! The 2D overlay surface: an RGBA canvas the source frame is blitted onto,
//! plus the connector/marker primitives that draw the skeleton over it.

use anyhow::{Context, Result};
use fast_image_resize as fir;

use crate::types::{Frame, Landmark};

const CONNECTOR_THICKNESS: i32 = 4;
const MARKER_RADIUS: i32 = 5;

/// Stroke/fill colors plus the visibility cutoff below which a landmark is
/// not drawn at all.
#[derive(Clone, Copy, Debug)]
pub struct DrawStyle {
    pub visibility_min: f32,
    pub color: [u8; 4],
    pub fill_color: [u8; 4],
}

pub struct Canvas {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        };
        canvas.resize(width, height);
        canvas
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.rgba = vec![0u8; (width as usize) * (height as usize) * 4];
        self.clear();
    }

    pub fn clear(&mut self) {
        for px in self.rgba.chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.rgba
    }

    /// Scales the frame onto the whole canvas. The caller has already sized
    /// the canvas to the frame's aspect ratio, so no letterboxing happens
    /// here.
    pub fn blit_frame(&mut self, frame: &Frame) -> Result<()> {
        let src = fir::images::Image::from_vec_u8(
            frame.width,
            frame.height,
            frame.rgba.clone(),
            fir::PixelType::U8x4,
        )?;
        let mut dst = fir::images::Image::new(self.width, self.height, fir::PixelType::U8x4);
        let mut resizer = fir::Resizer::new();
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
        resizer
            .resize(&src, &mut dst, Some(&options))
            .context("canvas blit resize failed")?;
        self.rgba = dst.into_vec();
        Ok(())
    }
}

/// Indices from `subset` whose landmark clears the style's visibility cutoff.
pub fn visible_indices(landmarks: &[Landmark], subset: &[usize], visibility_min: f32) -> Vec<usize> {
    subset
        .iter()
        .copied()
        .filter(|&idx| {
            landmarks
                .get(idx)
                .is_some_and(|lm| lm.visibility >= visibility_min)
        })
        .collect()
}

pub fn draw_connectors(
    canvas: &mut Canvas,
    landmarks: &[Landmark],
    connections: &[(usize, usize)],
    style: &DrawStyle,
) {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    for &(a, b) in connections {
        let (Some(la), Some(lb)) = (landmarks.get(a), landmarks.get(b)) else {
            continue;
        };
        if la.visibility < style.visibility_min || lb.visibility < style.visibility_min {
            continue;
        }
        draw_line(
            &mut canvas.rgba,
            canvas.width,
            canvas.height,
            &(la.x * w, la.y * h),
            &(lb.x * w, lb.y * h),
            style.color,
            CONNECTOR_THICKNESS,
        );
    }
}

pub fn draw_markers(canvas: &mut Canvas, landmarks: &[Landmark], subset: &[usize], style: &DrawStyle) {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    for idx in visible_indices(landmarks, subset, style.visibility_min) {
        let lm = &landmarks[idx];
        let center = ((lm.x * w) as i32, (lm.y * h) as i32);
        draw_circle(
            &mut canvas.rgba,
            canvas.width,
            canvas.height,
            center,
            MARKER_RADIUS + 1,
            style.color,
        );
        draw_circle(
            &mut canvas.rgba,
            canvas.width,
            canvas.height,
            center,
            MARKER_RADIUS,
            style.fill_color,
        );
    }
}

pub(crate) fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub(crate) fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

pub(crate) fn put_pixel_safe(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark(x: f32, y: f32, visibility: f32) -> Landmark {
        Landmark::new(x, y, 0.0, visibility)
    }

    #[test]
    fn line_covers_a_horizontal_run() {
        let mut buf = vec![0u8; 10 * 5 * 4];
        let white = [255, 255, 255, 255];
        draw_line(&mut buf, 10, 5, &(1.0, 2.0), &(8.0, 2.0), white, 1);

        for x in 1..=8 {
            let idx = (2 * 10 + x) * 4;
            assert_eq!(&buf[idx..idx + 4], &white, "pixel at ({x}, 2)");
        }
        assert_eq!(&buf[0..4], &[0, 0, 0, 0], "pixel at (0, 0) untouched");
    }

    #[test]
    fn line_clips_to_bounds() {
        let mut buf = vec![0u8; 10 * 10 * 4];
        draw_line(
            &mut buf,
            10,
            10,
            &(-5.0, 5.0),
            &(15.0, 5.0),
            [255, 0, 0, 255],
            1,
        );
        for x in 0..10 {
            let idx = (5 * 10 + x) * 4;
            assert_eq!(buf[idx], 255, "pixel at ({x}, 5) inside bounds drawn");
        }
    }

    #[test]
    fn circle_fills_inside_and_leaves_outside() {
        let mut buf = vec![0u8; 20 * 20 * 4];
        let green = [0, 255, 0, 255];
        draw_circle(&mut buf, 20, 20, (10, 10), 3, green);

        let center = (10 * 20 + 10) * 4;
        assert_eq!(&buf[center..center + 4], &green);
        let outside = (10 * 20 + 15) * 4;
        assert_eq!(&buf[outside..outside + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn circle_clips_without_panic() {
        let mut buf = vec![0u8; 10 * 10 * 4];
        draw_circle(&mut buf, 10, 10, (1, 1), 5, [0, 0, 255, 255]);
        let idx = (10 + 1) * 4;
        assert_eq!(buf[idx + 2], 255);
    }

    #[test]
    fn visibility_cutoff_filters_the_subset() {
        let landmarks = vec![
            landmark(0.1, 0.1, 0.9),
            landmark(0.2, 0.2, 0.64),
            landmark(0.3, 0.3, 0.65),
        ];
        let picked = visible_indices(&landmarks, &[0, 1, 2], 0.65);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn hidden_landmarks_leave_the_canvas_untouched() {
        let mut canvas = Canvas::new(32, 32);
        let before = canvas.data().to_vec();
        let landmarks = vec![landmark(0.5, 0.5, 0.1), landmark(0.8, 0.8, 0.2)];
        let style = DrawStyle {
            visibility_min: 0.65,
            color: [255, 255, 255, 255],
            fill_color: [255, 138, 0, 255],
        };

        draw_markers(&mut canvas, &landmarks, &[0, 1], &style);
        draw_connectors(&mut canvas, &landmarks, &[(0, 1)], &style);
        assert_eq!(canvas.data(), &before[..]);
    }

    #[test]
    fn resize_is_idempotent_for_same_dimensions() {
        let mut canvas = Canvas::new(64, 48);
        canvas.rgba[0] = 7;
        canvas.resize(64, 48);
        assert_eq!(canvas.rgba[0], 7);
        canvas.resize(32, 32);
        assert_eq!(canvas.data().len(), 32 * 32 * 4);
    }
}
