//! Built-in drawing tools.

use egui::{Pos2, Rect};

use super::geometry::{distance_to_segment, hit_handles, HitResult, HIT_TOLERANCE_PX, MIN_TOOL_SIZE_PX};
use super::tool::{DrawingTool, ToolBase, ToolKind};
use crate::chart::{ChartTransform, Surface};

/// Straight segment between two world points
#[derive(Debug, Clone)]
pub struct TrendLine {
    base: ToolBase,
}

impl TrendLine {
    pub fn new(base: ToolBase) -> Self {
        Self { base }
    }

    fn segment(&self, transform: &ChartTransform) -> Option<(Pos2, Pos2)> {
        match self.handles(transform).as_slice() {
            [a, b, ..] => Some((*a, *b)),
            _ => None,
        }
    }
}

impl DrawingTool for TrendLine {
    fn kind(&self) -> ToolKind {
        ToolKind::TrendLine
    }

    fn base(&self) -> &ToolBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ToolBase {
        &mut self.base
    }

    fn draw(&self, surface: &mut dyn Surface, transform: &ChartTransform) {
        if let Some((a, b)) = self.segment(transform) {
            let style = self.style();
            surface.styled_line(a, b, style.stroke(), style.line_style);
        }
    }

    fn hit_test(&self, pos: Pos2, transform: &ChartTransform) -> Option<HitResult> {
        if let Some(index) = hit_handles(&self.handles(transform), pos) {
            return Some(HitResult::handle(index));
        }
        let (a, b) = self.segment(transform)?;
        (distance_to_segment(pos, a, b) <= HIT_TOLERANCE_PX).then(HitResult::body)
    }

    fn is_degenerate(&self, transform: &ChartTransform) -> bool {
        self.segment(transform)
            .is_none_or(|(a, b)| a.distance(b) < MIN_TOOL_SIZE_PX)
    }

    fn clone_box(&self) -> Box<dyn DrawingTool> {
        Box::new(self.clone())
    }
}

/// Price level spanning the whole pane
#[derive(Debug, Clone)]
pub struct HorizontalLine {
    base: ToolBase,
}

impl HorizontalLine {
    pub fn new(base: ToolBase) -> Self {
        Self { base }
    }

    fn y(&self, transform: &ChartTransform) -> Option<f32> {
        self.points().first().map(|point| transform.price_to_y(point.price))
    }
}

impl DrawingTool for HorizontalLine {
    fn kind(&self) -> ToolKind {
        ToolKind::HorizontalLine
    }

    fn base(&self) -> &ToolBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ToolBase {
        &mut self.base
    }

    fn draw(&self, surface: &mut dyn Surface, transform: &ChartTransform) {
        if let Some(y) = self.y(transform) {
            let pane = transform.pane;
            let style = self.style();
            surface.styled_line(
                Pos2::new(pane.left(), y),
                Pos2::new(pane.right(), y),
                style.stroke(),
                style.line_style,
            );
        }
    }

    fn hit_test(&self, pos: Pos2, transform: &ChartTransform) -> Option<HitResult> {
        if let Some(index) = hit_handles(&self.handles(transform), pos) {
            return Some(HitResult::handle(index));
        }
        let y = self.y(transform)?;
        let pane = transform.pane;
        let inside = pos.x >= pane.left() && pos.x <= pane.right();
        (inside && (pos.y - y).abs() <= HIT_TOLERANCE_PX).then(HitResult::body)
    }

    fn clone_box(&self) -> Box<dyn DrawingTool> {
        Box::new(self.clone())
    }
}

/// Box spanned by two opposite corners
#[derive(Debug, Clone)]
pub struct Rectangle {
    base: ToolBase,
}

impl Rectangle {
    pub fn new(base: ToolBase) -> Self {
        Self { base }
    }

    fn rect(&self, transform: &ChartTransform) -> Option<Rect> {
        match self.handles(transform).as_slice() {
            [a, b, ..] => Some(Rect::from_two_pos(*a, *b)),
            _ => None,
        }
    }
}

impl DrawingTool for Rectangle {
    fn kind(&self) -> ToolKind {
        ToolKind::Rectangle
    }

    fn base(&self) -> &ToolBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ToolBase {
        &mut self.base
    }

    fn draw(&self, surface: &mut dyn Surface, transform: &ChartTransform) {
        let Some(rect) = self.rect(transform) else {
            return;
        };
        let style = self.style();
        surface.rect_filled(rect, style.fill_color32());
        let stroke = style.stroke();
        let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
        for (i, from) in corners.iter().enumerate() {
            let to = corners[(i + 1) % corners.len()];
            surface.styled_line(*from, to, stroke, style.line_style);
        }
    }

    fn hit_test(&self, pos: Pos2, transform: &ChartTransform) -> Option<HitResult> {
        if let Some(index) = hit_handles(&self.handles(transform), pos) {
            return Some(HitResult::handle(index));
        }
        let rect = self.rect(transform)?;
        rect.expand(HIT_TOLERANCE_PX).contains(pos).then(HitResult::body)
    }

    fn is_degenerate(&self, transform: &ChartTransform) -> bool {
        self.rect(transform)
            .is_none_or(|rect| rect.width() < MIN_TOOL_SIZE_PX || rect.height() < MIN_TOOL_SIZE_PX)
    }

    fn clone_box(&self) -> Box<dyn DrawingTool> {
        Box::new(self.clone())
    }
}
