//! Interactive 3D view of the world landmarks: an orbiting orthographic
//! projection over a cell grid, rendered into an RGBA buffer the UI uploads
//! as a texture.

use crate::overlay::{draw_circle, draw_line};
use crate::types::Landmark;

const BACKGROUND: [u8; 4] = [18, 18, 22, 255];
const MIN_AXIS_RANGE: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct DefinedColor {
    pub name: &'static str,
    pub value: [u8; 4],
}

#[derive(Clone, Debug)]
pub struct GridConfig {
    pub connection_color: [u8; 4],
    pub defined_colors: Vec<DefinedColor>,
    pub range: f32,
    pub fit_to_grid: bool,
    pub label_suffix: &'static str,
    pub landmark_size: i32,
    pub cells_per_axis: u32,
    pub centered: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            connection_color: [0xcc, 0xcc, 0xcc, 255],
            defined_colors: vec![
                DefinedColor {
                    name: "LEFT",
                    value: [0xff, 0xa5, 0x00, 255],
                },
                DefinedColor {
                    name: "RIGHT",
                    value: [0x00, 0xff, 0xff, 255],
                },
            ],
            range: 2.0,
            fit_to_grid: true,
            label_suffix: "m",
            landmark_size: 2,
            cells_per_axis: 4,
            centered: true,
        }
    }
}

/// A set of landmark indices rendered in one of the grid's named colors.
#[derive(Clone, Debug)]
pub struct ColorGroup {
    pub indices: &'static [usize],
    pub color: &'static str,
}

pub struct LandmarkGrid {
    config: GridConfig,
    landmarks: Vec<Landmark>,
    connections: Vec<(usize, usize)>,
    groups: Vec<ColorGroup>,
    yaw: f32,
    pitch: f32,
    zoom: f32,
}

impl LandmarkGrid {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            landmarks: Vec::new(),
            connections: Vec::new(),
            groups: Vec::new(),
            yaw: 0.0,
            pitch: 0.25,
            zoom: 1.0,
        }
    }

    /// Replaces the displayed landmarks wholesale. An empty slice clears the
    /// view; topology and groups from a previous update do not linger.
    pub fn update_landmarks(
        &mut self,
        landmarks: &[Landmark],
        topology: Option<&[(usize, usize)]>,
        groups: &[ColorGroup],
    ) {
        self.landmarks = landmarks.to_vec();
        self.connections = if landmarks.is_empty() {
            Vec::new()
        } else {
            topology.map(|t| t.to_vec()).unwrap_or_default()
        };
        self.groups = if landmarks.is_empty() {
            Vec::new()
        } else {
            groups.to_vec()
        };
    }

    pub fn clear(&mut self) {
        self.update_landmarks(&[], None, &[]);
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn landmark_count(&self) -> usize {
        self.landmarks.len()
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.008;
        self.pitch = (self.pitch + dy * 0.008).clamp(-1.4, 1.4);
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom * (1.0 + delta * 0.001)).clamp(0.25, 4.0);
    }

    /// Half-extent of the displayed cube. Fit-to-grid grows it in half-unit
    /// steps to cover the farthest landmark from the view center.
    pub fn axis_range(&self) -> f32 {
        if !self.config.fit_to_grid || self.landmarks.is_empty() {
            return self.config.range;
        }
        let center = self.view_center();
        let farthest = self
            .landmarks
            .iter()
            .map(|lm| {
                (lm.x - center[0])
                    .abs()
                    .max((lm.y - center[1]).abs())
                    .max((lm.z - center[2]).abs())
            })
            .fold(0.0f32, f32::max);
        ((farthest * 2.0).ceil() / 2.0).max(MIN_AXIS_RANGE)
    }

    pub fn axis_label(&self) -> String {
        format!("{:.1}{}", self.axis_range(), self.config.label_suffix)
    }

    fn view_center(&self) -> [f32; 3] {
        if !self.config.centered || self.landmarks.is_empty() {
            return [0.0; 3];
        }
        let n = self.landmarks.len() as f32;
        let sum = self.landmarks.iter().fold([0.0f32; 3], |acc, lm| {
            [acc[0] + lm.x, acc[1] + lm.y, acc[2] + lm.z]
        });
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }

    pub fn render(&self, width: u32, height: u32) -> Vec<u8> {
        let mut buffer = vec![0u8; (width as usize) * (height as usize) * 4];
        for px in buffer.chunks_exact_mut(4) {
            px.copy_from_slice(&BACKGROUND);
        }

        let range = self.axis_range();
        let scale = (width.min(height) as f32) / (range * 2.0) * 0.42 * self.zoom;
        let center = self.view_center();
        let projector = Projector::new(self.yaw, self.pitch, center, scale, width, height);

        self.render_floor_grid(&mut buffer, width, height, &projector, range);

        struct Draw {
            a: (f32, f32),
            b: (f32, f32),
            depth: f32,
            color: [u8; 4],
            point: bool,
        }
        let mut draws: Vec<Draw> = Vec::new();

        for &(a, b) in &self.connections {
            let (Some(la), Some(lb)) = (self.landmarks.get(a), self.landmarks.get(b)) else {
                continue;
            };
            let (pa, za) = projector.project([la.x, la.y, la.z]);
            let (pb, zb) = projector.project([lb.x, lb.y, lb.z]);
            draws.push(Draw {
                a: pa,
                b: pb,
                depth: (za + zb) * 0.5,
                color: self.config.connection_color,
                point: false,
            });
        }

        for (idx, lm) in self.landmarks.iter().enumerate() {
            let (pos, depth) = projector.project([lm.x, lm.y, lm.z]);
            draws.push(Draw {
                a: pos,
                b: pos,
                depth,
                color: self.color_for(idx),
                point: true,
            });
        }

        // Painter's order: farthest first so near geometry wins.
        draws.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        for d in draws {
            if d.point {
                draw_circle(
                    &mut buffer,
                    width,
                    height,
                    (d.a.0 as i32, d.a.1 as i32),
                    self.config.landmark_size + 1,
                    d.color,
                );
            } else {
                draw_line(&mut buffer, width, height, &d.a, &d.b, d.color, 2);
            }
        }

        buffer
    }

    fn render_floor_grid(
        &self,
        buffer: &mut [u8],
        width: u32,
        height: u32,
        projector: &Projector,
        range: f32,
    ) {
        let color = [60u8, 60, 68, 255];
        let center = self.view_center();
        let floor_y = center[1] + range;
        let cells = self.config.cells_per_axis.max(1) as i32;
        let step = (range * 2.0) / cells as f32;

        for i in 0..=cells {
            let offset = -range + i as f32 * step;
            let (a, _) = projector.project([center[0] + offset, floor_y, center[2] - range]);
            let (b, _) = projector.project([center[0] + offset, floor_y, center[2] + range]);
            draw_line(buffer, width, height, &a, &b, color, 1);
            let (c, _) = projector.project([center[0] - range, floor_y, center[2] + offset]);
            let (d, _) = projector.project([center[0] + range, floor_y, center[2] + offset]);
            draw_line(buffer, width, height, &c, &d, color, 1);
        }
    }

    fn color_for(&self, index: usize) -> [u8; 4] {
        for group in &self.groups {
            if group.indices.contains(&index) {
                if let Some(defined) = self
                    .config
                    .defined_colors
                    .iter()
                    .find(|c| c.name == group.color)
                {
                    return defined.value;
                }
            }
        }
        [255, 255, 255, 255]
    }
}

/// Orbiting orthographic projector. Screen y grows downward, matching the
/// landmark convention, so a standing figure renders upright.
struct Projector {
    right: [f32; 3],
    up: [f32; 3],
    forward: [f32; 3],
    center: [f32; 3],
    scale: f32,
    screen_center: (f32, f32),
}

impl Projector {
    fn new(yaw: f32, pitch: f32, center: [f32; 3], scale: f32, width: u32, height: u32) -> Self {
        let ((sy, cy), (sp, cp)) = (yaw.sin_cos(), pitch.sin_cos());
        Self {
            right: [cy, 0.0, -sy],
            up: [sp * sy, cp, sp * cy],
            forward: [-cp * sy, -sp, -cp * cy],
            center,
            scale,
            screen_center: (width as f32 / 2.0, height as f32 / 2.0),
        }
    }

    fn project(&self, p: [f32; 3]) -> ((f32, f32), f32) {
        let d = [
            p[0] - self.center[0],
            p[1] - self.center[1],
            p[2] - self.center[2],
        ];
        let dot = |v: [f32; 3]| d[0] * v[0] + d[1] * v[1] + d[2] * v[2];
        let (x, y, depth) = (dot(self.right), dot(self.up), dot(self.forward));
        (
            (
                self.screen_center.0 + x * self.scale,
                self.screen_center.1 + y * self.scale,
            ),
            depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(x: f32, y: f32, z: f32) -> Landmark {
        Landmark::new(x, y, z, 1.0)
    }

    #[test]
    fn empty_update_clears_everything() {
        let mut grid = LandmarkGrid::new(GridConfig::default());
        grid.update_landmarks(
            &[world(0.1, 0.2, 0.3)],
            Some(&[(0, 0)]),
            &[ColorGroup {
                indices: &[0],
                color: "LEFT",
            }],
        );
        assert!(!grid.is_empty());

        grid.update_landmarks(&[], None, &[]);
        assert!(grid.is_empty());
        assert!(grid.connections.is_empty());
        assert!(grid.groups.is_empty());
    }

    #[test]
    fn fit_to_grid_covers_the_farthest_landmark() {
        let mut grid = LandmarkGrid::new(GridConfig {
            centered: false,
            ..GridConfig::default()
        });
        grid.update_landmarks(&[world(0.0, 0.0, 0.0), world(1.2, 0.0, 0.0)], None, &[]);
        let range = grid.axis_range();
        assert!(range >= 1.2, "range {range} must reach the farthest point");
        assert_eq!(range, 1.5, "range snaps up in half-unit steps");
    }

    #[test]
    fn fixed_range_ignores_landmark_extent() {
        let mut grid = LandmarkGrid::new(GridConfig {
            fit_to_grid: false,
            range: 2.0,
            ..GridConfig::default()
        });
        grid.update_landmarks(&[world(9.0, 0.0, 0.0)], None, &[]);
        assert_eq!(grid.axis_range(), 2.0);
    }

    #[test]
    fn group_colors_resolve_by_name() {
        let mut grid = LandmarkGrid::new(GridConfig::default());
        grid.update_landmarks(
            &[world(0.0, 0.0, 0.0), world(0.1, 0.0, 0.0)],
            None,
            &[ColorGroup {
                indices: &[1],
                color: "RIGHT",
            }],
        );
        assert_eq!(grid.color_for(1), [0x00, 0xff, 0xff, 255]);
        assert_eq!(grid.color_for(0), [255, 255, 255, 255]);
    }

    #[test]
    fn centered_projection_puts_the_centroid_mid_screen() {
        let projector = Projector::new(0.3, 0.2, [1.0, 2.0, 3.0], 50.0, 200, 100);
        let ((x, y), _) = projector.project([1.0, 2.0, 3.0]);
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn render_buffer_matches_dimensions() {
        let grid = LandmarkGrid::new(GridConfig::default());
        let buffer = grid.render(64, 48);
        assert_eq!(buffer.len(), 64 * 48 * 4);
    }
}
