// Drawing of route lines and marker icons shared by both backends
use eframe::egui::{self, Color32, Painter, Pos2, Shape, Stroke, pos2, vec2};

use crate::markers::{MarkerKind, MarkerSpec};

/// Paint properties of a line layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePaint {
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
    pub round_join: bool,
    pub round_cap: bool,
}

impl LinePaint {
    /// Route line: #2196F3, 4 px, 80 % opaque, rounded.
    pub const ROUTE: LinePaint = LinePaint {
        color: Color32::from_rgb(0x21, 0x96, 0xF3),
        width: 4.0,
        opacity: 0.8,
        round_join: true,
        round_cap: true,
    };

    pub fn effective_color(&self) -> Color32 {
        self.color.gamma_multiply(self.opacity.clamp(0.0, 1.0))
    }
}

pub fn paint_line(painter: &Painter, points: &[Pos2], paint: &LinePaint) {
    if points.len() < 2 {
        return;
    }
    let color = paint.effective_color();
    painter.add(Shape::line(points.to_vec(), Stroke::new(paint.width, color)));

    let radius = paint.width / 2.0;
    if paint.round_join {
        for p in &points[1..points.len() - 1] {
            painter.circle_filled(*p, radius, color);
        }
    }
    if paint.round_cap {
        painter.circle_filled(points[0], radius, color);
        painter.circle_filled(points[points.len() - 1], radius, color);
    }
}

const SHADOW: Color32 = Color32::from_black_alpha(76);
const NAV_BLUE: Color32 = Color32::from_rgb(0x19, 0x76, 0xD2);
const HOME_RED: Color32 = Color32::from_rgb(0xD3, 0x2F, 0x2F);

/// Draw a marker icon centered on `at`.
pub fn paint_marker(painter: &Painter, at: Pos2, marker: &MarkerSpec) {
    let size = marker.kind.size();
    // Drop shadow, 2 px down
    painter.circle_filled(at + vec2(0.0, 2.0), size * 0.42, SHADOW);
    match marker.kind {
        MarkerKind::Start => paint_navigation(painter, at, size),
        MarkerKind::End => paint_home(painter, at, size),
    }
}

fn paint_navigation(painter: &Painter, at: Pos2, size: f32) {
    let r = size / 2.0;
    painter.circle_filled(at, r * 0.8, Color32::WHITE);
    painter.circle_filled(at, r * 0.68, NAV_BLUE);
    // Arrow pointing north
    let arrow = vec![
        pos2(at.x, at.y - r * 0.5),
        pos2(at.x + r * 0.35, at.y + r * 0.4),
        pos2(at.x, at.y + r * 0.2),
        pos2(at.x - r * 0.35, at.y + r * 0.4),
    ];
    painter.add(Shape::convex_polygon(arrow, Color32::WHITE, Stroke::NONE));
}

fn paint_home(painter: &Painter, at: Pos2, size: f32) {
    let r = size / 2.0;
    let stroke = Stroke::new(1.5, Color32::WHITE);
    let roof = vec![
        pos2(at.x, at.y - r * 0.9),
        pos2(at.x + r * 0.9, at.y - r * 0.05),
        pos2(at.x - r * 0.9, at.y - r * 0.05),
    ];
    painter.add(Shape::convex_polygon(roof, HOME_RED, stroke));
    let body = egui::Rect::from_min_max(
        pos2(at.x - r * 0.62, at.y - r * 0.1),
        pos2(at.x + r * 0.62, at.y + r * 0.8),
    );
    painter.rect_filled(body, 1.0, HOME_RED);
    let door = egui::Rect::from_min_max(
        pos2(at.x - r * 0.15, at.y + r * 0.3),
        pos2(at.x + r * 0.15, at.y + r * 0.8),
    );
    painter.rect_filled(door, 0.0, Color32::WHITE);
}
