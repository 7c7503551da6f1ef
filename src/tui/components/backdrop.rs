//! Paints the resolved [`BackgroundStyle`] behind the transcript.
//!
//! A terminal cannot show a picture, so an available image only leaves a
//! faint caption in the bottom-right corner; the cells keep the terminal's
//! own background. The gradient fallback is interpolated per cell along
//! its angle.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Widget;

use crate::core::background::{BackgroundStyle, GradientLayer};

pub struct Backdrop<'a> {
    pub style: &'a BackgroundStyle,
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    (f32::from(from) + (f32::from(to) - f32::from(from)) * t).round() as u8
}

/// Position of cell (x, y) along the gradient axis, in `0.0..=1.0`.
fn gradient_t(layer: &GradientLayer, area: Rect, x: u16, y: u16) -> f32 {
    let (sin, cos) = f32::from(layer.angle_deg).to_radians().sin_cos();
    // CSS angles: 0deg points up, 90deg right; y grows downwards.
    let project = |px: f32, py: f32| px * sin - py * cos;
    let w = f32::from(area.width.saturating_sub(1));
    let h = f32::from(area.height.saturating_sub(1));
    let corners = [project(0.0, 0.0), project(w, 0.0), project(0.0, h), project(w, h)];
    let min = corners.iter().copied().fold(f32::INFINITY, f32::min);
    let max = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max - min <= f32::EPSILON {
        return 0.0;
    }
    let p = project(f32::from(x - area.x), f32::from(y - area.y));
    ((p - min) / (max - min)).clamp(0.0, 1.0)
}

pub fn gradient_color(layer: &GradientLayer, area: Rect, x: u16, y: u16) -> Color {
    let t = gradient_t(layer, area, x, y);
    Color::Rgb(
        lerp(layer.from.0, layer.to.0, t),
        lerp(layer.from.1, layer.to.1, t),
        lerp(layer.from.2, layer.to.2, t),
    )
}

impl Widget for Backdrop<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.style {
            BackgroundStyle::Gradient(layer) => {
                for y in area.top()..area.bottom() {
                    for x in area.left()..area.right() {
                        buf[(x, y)].set_bg(gradient_color(layer, area, x, y));
                    }
                }
            }
            BackgroundStyle::Image(layer) => {
                if area.height == 0 {
                    return;
                }
                let caption = Line::from(format!("▣ {}", layer.url))
                    .right_aligned()
                    .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM));
                let last_row = Rect {
                    y: area.bottom() - 1,
                    height: 1,
                    ..area
                };
                caption.render(last_row, buf);
            }
        }
    }
}
