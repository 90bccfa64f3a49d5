//! Drawing tool interface and its persisted form.
//!
//! Tool geometry lives in world coordinates (bar index, price) so it
//! survives pan, zoom and timeframe switches. Pixels only appear while
//! drawing and hit-testing, through the frame's [`ChartTransform`].

use std::fmt;

use egui::{Pos2, Stroke};
use uuid::Uuid;

use super::geometry::HitResult;
use super::style::ToolStyle;
use super::tools::{HorizontalLine, Rectangle, TrendLine};
use crate::chart::{ChartTransform, Surface, BACKGROUND_COLOR};
use crate::error::{ChartError, Result};
use crate::trader::WorldPoint;

/// Available drawing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    TrendLine,
    HorizontalLine,
    Rectangle,
}

impl ToolKind {
    /// Type tag used in the persisted record
    pub fn value(&self) -> &'static str {
        match self {
            ToolKind::TrendLine => "trendLine",
            ToolKind::HorizontalLine => "horizontalLine",
            ToolKind::Rectangle => "rectangle",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::TrendLine => "Trend Line",
            ToolKind::HorizontalLine => "Horizontal Line",
            ToolKind::Rectangle => "Rectangle",
        }
    }

    pub fn from_value(value: &str) -> Option<ToolKind> {
        ToolKind::all().into_iter().find(|kind| kind.value() == value)
    }

    pub fn all() -> Vec<ToolKind> {
        vec![ToolKind::TrendLine, ToolKind::HorizontalLine, ToolKind::Rectangle]
    }

    /// Number of control points
    pub fn point_count(&self) -> usize {
        match self {
            ToolKind::HorizontalLine => 1,
            ToolKind::TrendLine | ToolKind::Rectangle => 2,
        }
    }

    /// Fresh tool of this kind with a new id
    pub fn create(&self, style: ToolStyle) -> Box<dyn DrawingTool> {
        let base = ToolBase::new(new_tool_id(), style);
        match self {
            ToolKind::TrendLine => Box::new(TrendLine::new(base)),
            ToolKind::HorizontalLine => Box::new(HorizontalLine::new(base)),
            ToolKind::Rectangle => Box::new(Rectangle::new(base)),
        }
    }
}

pub fn new_tool_id() -> String {
    Uuid::new_v4().to_string()
}

/// Interchange shape of one tool
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub style: ToolStyle,
    pub points: Vec<WorldPoint>,
}

impl ToolRecord {
    /// Rebuild the tool, rejecting unknown types. Missing points are padded
    /// with the last one given, extra points are dropped.
    pub fn into_tool(self) -> Result<Box<dyn DrawingTool>> {
        let kind = ToolKind::from_value(&self.kind).ok_or(ChartError::UnknownTool(self.kind))?;
        let mut tool = kind.create(self.style);
        let fallback = self.points.last().copied().unwrap_or_default();
        let points = (0..kind.point_count())
            .map(|i| self.points.get(i).copied().unwrap_or(fallback))
            .collect();
        let base = tool.base_mut();
        base.id = self.id;
        base.points = points;
        Ok(tool)
    }
}

/// State shared by every tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBase {
    pub id: String,
    pub style: ToolStyle,
    pub points: Vec<WorldPoint>,
}

impl ToolBase {
    pub fn new(id: String, style: ToolStyle) -> Self {
        Self {
            id,
            style,
            points: Vec::new(),
        }
    }
}

pub trait DrawingTool: fmt::Debug {
    fn kind(&self) -> ToolKind;

    fn base(&self) -> &ToolBase;

    fn base_mut(&mut self) -> &mut ToolBase;

    /// Start placement at `point`
    fn begin(&mut self, point: WorldPoint) {
        self.base_mut().points = vec![point; self.kind().point_count()];
    }

    /// Follow the pointer during placement
    fn update(&mut self, point: WorldPoint) {
        if let Some(last) = self.base_mut().points.last_mut() {
            *last = point;
        }
    }

    /// Move control point `index`
    fn update_handle(&mut self, index: usize, point: WorldPoint) {
        if let Some(handle) = self.base_mut().points.get_mut(index) {
            *handle = point;
        }
    }

    fn translate(&mut self, d_index: f64, d_price: f64) {
        for point in &mut self.base_mut().points {
            *point = point.translated(d_index, d_price);
        }
    }

    fn draw(&self, surface: &mut dyn Surface, transform: &ChartTransform);

    fn hit_test(&self, pos: Pos2, transform: &ChartTransform) -> Option<HitResult>;

    /// Too small on screen to keep after placement
    fn is_degenerate(&self, _transform: &ChartTransform) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn DrawingTool>;

    fn id(&self) -> &str {
        &self.base().id
    }

    fn style(&self) -> &ToolStyle {
        &self.base().style
    }

    fn points(&self) -> &[WorldPoint] {
        &self.base().points
    }

    /// Control points in pixels
    fn handles(&self, transform: &ChartTransform) -> Vec<Pos2> {
        self.points()
            .iter()
            .map(|point| transform.world_to_screen(*point))
            .collect()
    }

    /// Selection handles drawn over the tool
    fn draw_handles(&self, surface: &mut dyn Surface, transform: &ChartTransform) {
        let stroke = Stroke::new(1.5, self.style().stroke_color32());
        for handle in self.handles(transform) {
            surface.circle(handle, 4.0, BACKGROUND_COLOR, stroke);
        }
    }

    fn serialize(&self) -> ToolRecord {
        ToolRecord {
            id: self.id().to_string(),
            kind: self.kind().value().to_string(),
            style: self.style().clone(),
            points: self.points().to_vec(),
        }
    }
}

impl Clone for Box<dyn DrawingTool> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_values() {
        for kind in ToolKind::all() {
            assert_eq!(ToolKind::from_value(kind.value()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.value()));
        }
        assert_eq!(ToolKind::from_value("fibonacci"), None);
    }

    #[test]
    fn test_record_round_trip_keeps_id() {
        let mut tool = ToolKind::TrendLine.create(ToolStyle::default());
        tool.begin(WorldPoint::new(10.0, 100.0));
        tool.update(WorldPoint::new(20.0, 110.0));
        let record = tool.serialize();
        assert_eq!(record.kind, "trendLine");
        assert_eq!(record.points.len(), 2);

        let rebuilt = record.clone().into_tool().unwrap();
        assert_eq!(rebuilt.serialize(), record);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let record = ToolRecord {
            id: "x".into(),
            kind: "pitchfork".into(),
            style: ToolStyle::default(),
            points: Vec::new(),
        };
        assert!(matches!(record.into_tool(), Err(ChartError::UnknownTool(kind)) if kind == "pitchfork"));
    }

    #[test]
    fn test_short_point_list_is_padded() {
        let record = ToolRecord {
            id: "r".into(),
            kind: "rectangle".into(),
            style: ToolStyle::default(),
            points: vec![WorldPoint::new(1.0, 2.0)],
        };
        let tool = record.into_tool().unwrap();
        assert_eq!(tool.points(), &[WorldPoint::new(1.0, 2.0); 2]);
    }

    #[test]
    fn test_translate_and_handles() {
        let mut tool = ToolKind::Rectangle.create(ToolStyle::default());
        tool.begin(WorldPoint::new(0.0, 10.0));
        tool.update_handle(1, WorldPoint::new(4.0, 20.0));
        tool.translate(1.0, -5.0);
        assert_eq!(tool.points(), &[WorldPoint::new(1.0, 5.0), WorldPoint::new(5.0, 15.0)]);
        tool.update_handle(7, WorldPoint::default());
        assert_eq!(tool.points().len(), 2);
    }
}
