//! Drawing surface abstraction.
//!
//! Every draw pass paints through [`Surface`]. The GUI host passes an
//! `egui::Painter`; headless callers record into a [`DisplayList`].

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind};

use crate::trader::LineStyle;

pub trait Surface {
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke);

    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke);

    fn rect_filled(&mut self, rect: Rect, color: Color32);

    fn rect_stroke(&mut self, rect: Rect, stroke: Stroke);

    /// Filled convex polygon
    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32);

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke);

    fn text(&mut self, pos: Pos2, anchor: Align2, text: String, size: f32, color: Color32);

    /// Line split into dash/gap segments
    fn dashed_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke, dash: f32, gap: f32) {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON || dash <= 0.0 {
            self.line(from, to, stroke);
            return;
        }
        let dir = delta / length;
        let mut travelled = 0.0;
        while travelled < length {
            let end = (travelled + dash).min(length);
            self.line(from + dir * travelled, from + dir * end, stroke);
            travelled = end + gap.max(0.0);
        }
    }

    fn styled_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke, style: LineStyle) {
        match style.pattern() {
            Some((dash, gap)) => self.dashed_line(from, to, stroke, dash, gap),
            None => self.line(from, to, stroke),
        }
    }
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Pos2,
        to: Pos2,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Pos2>,
        stroke: Stroke,
    },
    RectFilled {
        rect: Rect,
        color: Color32,
    },
    RectStroke {
        rect: Rect,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    Text {
        pos: Pos2,
        anchor: Align2,
        text: String,
        size: f32,
        color: Color32,
    },
}

/// Surface that records commands instead of painting
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Every recorded text
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.commands.push(DrawCommand::Line { from, to, stroke });
    }

    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke) {
        self.commands.push(DrawCommand::Polyline { points, stroke });
    }

    fn rect_filled(&mut self, rect: Rect, color: Color32) {
        self.commands.push(DrawCommand::RectFilled { rect, color });
    }

    fn rect_stroke(&mut self, rect: Rect, stroke: Stroke) {
        self.commands.push(DrawCommand::RectStroke { rect, stroke });
    }

    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32) {
        self.commands.push(DrawCommand::Polygon { points, fill });
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn text(&mut self, pos: Pos2, anchor: Align2, text: String, size: f32, color: Color32) {
        self.commands.push(DrawCommand::Text {
            pos,
            anchor,
            text,
            size,
            color,
        });
    }
}

impl Surface for Painter {
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.line_segment([from, to], stroke);
    }

    fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke) {
        if points.len() > 1 {
            self.add(Shape::line(points, stroke));
        }
    }

    fn rect_filled(&mut self, rect: Rect, color: Color32) {
        Painter::rect_filled(self, rect, 0.0, color);
    }

    fn rect_stroke(&mut self, rect: Rect, stroke: Stroke) {
        Painter::rect_stroke(self, rect, 0.0, stroke, StrokeKind::Inside);
    }

    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32) {
        if points.len() > 2 {
            self.add(Shape::convex_polygon(points, fill, Stroke::NONE));
        }
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke) {
        Painter::circle(self, center, radius, fill, stroke);
    }

    fn text(&mut self, pos: Pos2, anchor: Align2, text: String, size: f32, color: Color32) {
        Painter::text(self, pos, anchor, text, FontId::proportional(size), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_list_records_in_order() {
        let mut list = DisplayList::new();
        list.line(Pos2::ZERO, Pos2::new(1.0, 1.0), Stroke::new(1.0, Color32::WHITE));
        list.text(Pos2::ZERO, Align2::LEFT_TOP, "100.00".into(), 11.0, Color32::WHITE);
        assert_eq!(list.len(), 2);
        assert!(matches!(list.commands()[0], DrawCommand::Line { .. }));
        assert_eq!(list.texts().collect::<Vec<_>>(), ["100.00"]);
    }

    #[test]
    fn test_dashed_line_splits_into_segments() {
        let mut list = DisplayList::new();
        let stroke = Stroke::new(1.0, Color32::WHITE);
        list.dashed_line(Pos2::ZERO, Pos2::new(20.0, 0.0), stroke, 6.0, 4.0);
        // dashes at 0..6 and 10..16
        assert_eq!(list.len(), 2);

        list.clear();
        list.styled_line(Pos2::ZERO, Pos2::new(20.0, 0.0), stroke, LineStyle::Solid);
        assert_eq!(list.len(), 1);
    }
}
