//! Pixel-space hit-testing helpers.

use egui::Pos2;
use serde::{Deserialize, Serialize};

/// Maximum pointer distance from a tool body that still counts as a hit
pub const HIT_TOLERANCE_PX: f32 = 6.0;

/// Radius of the grab circle around each handle
pub const HANDLE_RADIUS_PX: f32 = 8.0;

/// Screen size below which a two-point tool is discarded on placement
pub const MIN_TOOL_SIZE_PX: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitAction {
    /// Drag the whole tool
    Move,
    /// Drag one control point
    Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitResult {
    pub action: HitAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_index: Option<usize>,
}

impl HitResult {
    pub fn body() -> Self {
        Self {
            action: HitAction::Move,
            handle_index: None,
        }
    }

    pub fn handle(index: usize) -> Self {
        Self {
            action: HitAction::Handle,
            handle_index: Some(index),
        }
    }
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Closest handle within [`HANDLE_RADIUS_PX`] of `p`
pub fn hit_handles(handles: &[Pos2], p: Pos2) -> Option<usize> {
    handles
        .iter()
        .enumerate()
        .map(|(i, handle)| (i, handle.distance(p)))
        .filter(|(_, distance)| *distance <= HANDLE_RADIUS_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
