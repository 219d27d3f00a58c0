use std::f32::consts::FRAC_PI_2;

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, Ui, Vec2, pos2, vec2};

use crate::chart::{ChartSpec, Encoding};
use crate::color::plasma;
use crate::state::{AppState, Phase};

const DEFAULT_YAW: f32 = -0.6;
const DEFAULT_PITCH: f32 = 0.45;
const ROTATE_SPEED: f32 = 0.008;
const HOVER_RADIUS: f32 = 8.0;
const COLOR_BAR_WIDTH: f32 = 90.0;
const COLOR_BAR_STEPS: usize = 48;

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Orbit camera around the centre of the block model. Orthographic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn rotate(&mut self, drag: Vec2) {
        self.yaw += drag.x * ROTATE_SPEED;
        self.pitch = (self.pitch + drag.y * ROTATE_SPEED).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn zoom_by(&mut self, scroll: f32) {
        self.zoom = (self.zoom * (scroll * 0.002).exp()).clamp(0.2, 10.0);
    }

    /// Project a point of the unit cube (`[-1, 1]³`, Z up) into `rect`.
    /// Returns the screen position and the depth (larger is farther).
    pub fn project(&self, p: [f32; 3], rect: Rect) -> (Pos2, f32) {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let right = p[0] * cy - p[1] * sy;
        let ahead = p[0] * sy + p[1] * cy;
        let up = p[2] * cp + ahead * sp;
        let depth = ahead * cp - p[2] * sp;

        let scale = rect.width().min(rect.height()) * 0.3 * self.zoom;
        let c = rect.center();
        (pos2(c.x + right * scale, c.y - up * scale), depth)
    }
}

/// Maps data coordinates into the unit cube, each axis stretched on its own
/// so thin benches stay visible.
struct CubeMapping {
    center: [f64; 3],
    half: [f64; 3],
}

impl CubeMapping {
    fn new((lo, hi): ([f64; 3], [f64; 3])) -> Self {
        let mut center = [0.0; 3];
        let mut half = [0.0; 3];
        for axis in 0..3 {
            center[axis] = (lo[axis] + hi[axis]) * 0.5;
            half[axis] = (hi[axis] - lo[axis]) * 0.5;
        }
        Self { center, half }
    }

    fn map(&self, p: [f64; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for axis in 0..3 {
            if self.half[axis] > f64::EPSILON {
                out[axis] = ((p[axis] - self.center[axis]) / self.half[axis]) as f32;
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// 3D scatter (central panel)
// ---------------------------------------------------------------------------

/// Render the block model in the central panel.
pub fn scatter_3d(ui: &mut Ui, state: &AppState, camera: &mut Camera) {
    let chart = match (state.phase, &state.chart) {
        (Phase::Loaded, Some(chart)) => chart,
        (Phase::Failed, _) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Nothing to display. Fix the data source and press Reload.");
            });
            return;
        }
        _ => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Loading block model…");
            });
            return;
        }
    };

    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    if response.dragged() {
        camera.rotate(response.drag_delta());
    }
    if response.double_clicked() {
        *camera = Camera::default();
    }
    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            camera.zoom_by(scroll);
        }
    }

    let painter = ui.painter_at(rect);
    let text_color = ui.visuals().text_color();
    painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
    painter.text(
        rect.center_top() + vec2(0.0, 8.0),
        Align2::CENTER_TOP,
        chart.title,
        FontId::proportional(16.0),
        text_color,
    );

    let plot_rect = Rect::from_min_max(
        rect.min + vec2(0.0, 32.0),
        pos2(rect.max.x - COLOR_BAR_WIDTH, rect.max.y),
    );
    let cube = CubeMapping::new(chart.bounds);

    draw_axes(&painter, plot_rect, camera, chart, text_color);

    // Far points first so near ones end up on top.
    let cam = *camera;
    let cube = &cube;
    let mut projected: Vec<(Pos2, f32, Color32, Option<Color32>, &str)> = chart
        .series
        .iter()
        .flat_map(|series| {
            series.points.iter().map(move |p| {
                let (pos, depth) = cam.project(cube.map(p.position), plot_rect);
                (pos, depth, p.color, series.legend_color, p.hover.as_str())
            })
        })
        .collect();
    projected.sort_by(|a, b| b.1.total_cmp(&a.1));

    let radius = chart.marker_size * 0.5;
    let alpha = (chart.marker_opacity * 255.0).round() as u8;
    for (pos, _, color, outline, _) in &projected {
        let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha);
        match outline {
            Some(c) => {
                painter.circle(*pos, radius, fill, Stroke::new(1.0, *c));
            }
            None => {
                painter.circle_filled(*pos, radius, fill);
            }
        }
    }

    if chart.is_empty() {
        painter.text(
            plot_rect.center(),
            Align2::CENTER_CENTER,
            "No blocks match the current filters",
            FontId::proportional(14.0),
            text_color,
        );
    }

    let bar_rect = Rect::from_min_max(
        pos2(rect.max.x - COLOR_BAR_WIDTH + 16.0, rect.min.y + rect.height() * 0.2),
        pos2(rect.max.x - COLOR_BAR_WIDTH + 36.0, rect.min.y + rect.height() * 0.8),
    );
    draw_color_bar(&painter, bar_rect, chart, text_color);

    if state.encoding == Encoding::ByClassification {
        draw_legend(&painter, rect.min + vec2(12.0, 40.0), chart, text_color);
    }

    // Topmost point under the cursor wins.
    let hovered = response.hover_pos().and_then(|cursor| {
        projected
            .iter()
            .rev()
            .find(|(pos, ..)| pos.distance(cursor) <= HOVER_RADIUS)
            .map(|(.., hover)| hover.to_string())
    });
    if let Some(text) = hovered {
        response.on_hover_text_at_pointer(text);
    } else {
        response.on_hover_text("Drag to rotate | Scroll to zoom | Double-click to reset");
    }
}

fn draw_axes(painter: &Painter, rect: Rect, camera: &Camera, chart: &ChartSpec, color: Color32) {
    let faint = Stroke::new(0.5, color.gamma_multiply(0.25));
    let strong = Stroke::new(1.2, color.gamma_multiply(0.8));
    let corner = |x: f32, y: f32, z: f32| camera.project([x, y, z], rect).0;

    // Bounding box wireframe.
    for &a in &[-1.0f32, 1.0] {
        for &b in &[-1.0f32, 1.0] {
            painter.line_segment([corner(-1.0, a, b), corner(1.0, a, b)], faint);
            painter.line_segment([corner(a, -1.0, b), corner(a, 1.0, b)], faint);
            painter.line_segment([corner(a, b, -1.0), corner(a, b, 1.0)], faint);
        }
    }

    let (lo, hi) = chart.bounds;
    let origin = [-1.0f32, -1.0, -1.0];
    for axis in 0..3 {
        let mut end = origin;
        end[axis] = 1.0;
        let a = camera.project(origin, rect).0;
        let b = camera.project(end, rect).0;
        painter.line_segment([a, b], strong);

        let font = FontId::monospace(10.0);
        painter.text(b, Align2::LEFT_BOTTOM, format!("{} {:.0}", chart.axis_titles[axis], hi[axis]), font.clone(), color);
        if axis == 0 {
            painter.text(a, Align2::RIGHT_TOP, format!("{:.0}", lo[axis]), font, color);
        }
    }
}

fn draw_color_bar(painter: &Painter, rect: Rect, chart: &ChartSpec, color: Color32) {
    let step = rect.height() / COLOR_BAR_STEPS as f32;
    for i in 0..COLOR_BAR_STEPS {
        // High grades at the top.
        let t = 1.0 - (i as f32 + 0.5) / COLOR_BAR_STEPS as f32;
        let slice = Rect::from_min_size(
            pos2(rect.min.x, rect.min.y + i as f32 * step),
            vec2(rect.width(), step + 0.5),
        );
        painter.rect_filled(slice, 0.0, plasma(t));
    }

    let font = FontId::proportional(11.0);
    let scale = chart.color_scale;
    let mid = (scale.min + scale.max) * 0.5;
    painter.text(rect.center_top() - vec2(0.0, 6.0), Align2::CENTER_BOTTOM, chart.color_bar_title, font.clone(), color);
    for (value, y) in [(scale.max, rect.min.y), (mid, rect.center().y), (scale.min, rect.max.y)] {
        painter.text(pos2(rect.max.x + 4.0, y), Align2::LEFT_CENTER, format!("{value:.2}"), font.clone(), color);
    }
}

fn draw_legend(painter: &Painter, origin: Pos2, chart: &ChartSpec, color: Color32) {
    let font = FontId::proportional(12.0);
    for (row, series) in chart.series.iter().enumerate() {
        let y = origin.y + row as f32 * 18.0;
        if let Some(c) = series.legend_color {
            painter.circle(pos2(origin.x + 5.0, y), 5.0, Color32::TRANSPARENT, Stroke::new(2.0, c));
        }
        painter.text(
            pos2(origin.x + 16.0, y),
            Align2::LEFT_CENTER,
            format!("{}  ({})", series.name, series.points.len()),
            font.clone(),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(400.0, 200.0))
    }

    #[test]
    fn cube_centre_projects_to_rect_centre() {
        let (pos, depth) = Camera::default().project([0.0, 0.0, 0.0], screen());
        assert!(pos.distance(screen().center()) < 1e-4);
        assert!(depth.abs() < 1e-6);
    }

    #[test]
    fn front_view_keeps_z_up() {
        let cam = Camera { yaw: 0.0, pitch: 0.0, zoom: 1.0 };
        let (top, _) = cam.project([0.0, 0.0, 1.0], screen());
        let (right, _) = cam.project([1.0, 0.0, 0.0], screen());
        assert!(top.y < screen().center().y);
        assert!(right.x > screen().center().x);
        let (_, near) = cam.project([0.0, -1.0, 0.0], screen());
        let (_, far) = cam.project([0.0, 1.0, 0.0], screen());
        assert!(far > near);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut cam = Camera::default();
        cam.rotate(vec2(0.0, 10_000.0));
        assert_eq!(cam.pitch, FRAC_PI_2);
        cam.zoom_by(1e6);
        assert_eq!(cam.zoom, 10.0);
    }

    #[test]
    fn flat_axes_map_to_the_middle() {
        let cube = CubeMapping::new(([0.0, 10.0, 5.0], [10.0, 10.0, 15.0]));
        assert_eq!(cube.map([10.0, 10.0, 5.0]), [1.0, 0.0, -1.0]);
    }
}
