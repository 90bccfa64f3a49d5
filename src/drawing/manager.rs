//! Drawing manager: owns the tool list, selection and pointer interaction.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use egui::Pos2;
use tracing::{debug, warn};

use super::geometry::{HitAction, HitResult, MIN_TOOL_SIZE_PX};
use super::style::{StylePatch, ToolStyle};
use super::tool::{new_tool_id, DrawingTool, ToolKind, ToolRecord};
use crate::chart::{ChartTransform, Surface};
use crate::error::Result;
use crate::trader::WorldPoint;

/// Bars a duplicate is shifted right of its source
const DUPLICATE_OFFSET_BARS: f64 = 3.0;

/// Pointer interaction in progress
#[derive(Debug, Clone, Copy, PartialEq)]
enum InteractionState {
    Idle,
    /// New tool is following the pointer. `dragged` turns true once the
    /// pointer moved far enough from the press for click-drag placement.
    Placing { press: Pos2, dragged: bool },
    DraggingHandle { handle: usize },
    DraggingTool { last: WorldPoint },
}

/// Ordered collection of drawing tools, drawn first to last.
///
/// At most one tool is selected. With an active tool kind, the next press
/// starts placing a new tool; otherwise presses select and drag existing
/// tools.
#[derive(Debug)]
pub struct DrawingManager {
    tools: Vec<Box<dyn DrawingTool>>,
    selected: Option<String>,
    active_tool: Option<ToolKind>,
    default_style: ToolStyle,
    state: InteractionState,
}

impl Default for DrawingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingManager {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            selected: None,
            active_tool: None,
            default_style: ToolStyle::default(),
            state: InteractionState::Idle,
        }
    }

    /// Arm a tool kind for placement, or disarm with `None`
    pub fn set_active_tool(&mut self, kind: Option<ToolKind>) {
        self.cancel();
        self.active_tool = kind;
    }

    pub fn active_tool(&self) -> Option<ToolKind> {
        self.active_tool
    }

    pub fn default_style(&self) -> &ToolStyle {
        &self.default_style
    }

    pub fn set_default_style(&mut self, style: ToolStyle) {
        self.default_style = style;
    }

    /// True while a placement or drag is in progress
    pub fn is_busy(&self) -> bool {
        self.state != InteractionState::Idle
    }

    pub fn tools(&self) -> &[Box<dyn DrawingTool>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&dyn DrawingTool> {
        self.tools.iter().find(|tool| tool.id() == id).map(|tool| &**tool)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tools.iter().position(|tool| tool.id() == id)
    }

    fn selected_mut(&mut self) -> Option<&mut Box<dyn DrawingTool>> {
        let id = self.selected.as_deref()?;
        self.tools.iter_mut().find(|tool| tool.id() == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&dyn DrawingTool> {
        self.get(self.selected.as_deref()?)
    }

    /// Select the tool with `id`, returns false when it does not exist
    pub fn select(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Append a tool and return its id. An id already in use is replaced
    /// with a fresh one.
    pub fn add(&mut self, mut tool: Box<dyn DrawingTool>) -> String {
        if self.position(tool.id()).is_some() {
            reassign_id(tool.as_mut());
        }
        let id = tool.id().to_string();
        self.tools.push(tool);
        id
    }

    /// Copy the selected tool a few bars to the right and select the copy
    pub fn duplicate_selected(&mut self) -> Option<String> {
        let mut copy = self.selected()?.clone_box();
        let id = new_tool_id();
        copy.base_mut().id = id.clone();
        copy.translate(DUPLICATE_OFFSET_BARS, 0.0);
        self.tools.push(copy);
        self.selected = Some(id.clone());
        Some(id)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(ix) = self.position(id) else {
            return false;
        };
        self.tools.remove(ix);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
            self.state = InteractionState::Idle;
        }
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selected.clone() {
            Some(id) => self.delete(&id),
            None => false,
        }
    }

    /// Apply a partial style update to the selected tool
    pub fn patch_style(&mut self, patch: &StylePatch) -> bool {
        match self.selected_mut() {
            Some(tool) => {
                tool.base_mut().style.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.tools.clear();
        self.selected = None;
        self.state = InteractionState::Idle;
    }

    /// Topmost tool under `pos`
    pub fn hit_test(&self, pos: Pos2, transform: &ChartTransform) -> Option<(String, HitResult)> {
        self.tools.iter().rev().find_map(|tool| {
            tool.hit_test(pos, transform)
                .map(|hit| (tool.id().to_string(), hit))
        })
    }

    /// Press on the chart. Returns true when the drawing layer takes the
    /// gesture; false leaves it to panning.
    pub fn pointer_down(&mut self, pos: Pos2, transform: &ChartTransform) -> bool {
        let world = transform.screen_to_world(pos);

        if let InteractionState::Placing { .. } = self.state {
            // second click of click-click placement
            if let Some(tool) = self.selected_mut() {
                tool.update(world);
            }
            self.finish_placement(transform);
            return true;
        }

        if let Some(kind) = self.active_tool {
            let mut tool = kind.create(self.default_style.clone());
            tool.begin(world);
            self.selected = Some(self.add(tool));
            if kind.point_count() == 1 {
                self.finish_placement(transform);
            } else {
                self.state = InteractionState::Placing {
                    press: pos,
                    dragged: false,
                };
            }
            return true;
        }

        match self.hit_test(pos, transform) {
            Some((id, hit)) => {
                self.selected = Some(id);
                self.state = match (hit.action, hit.handle_index) {
                    (HitAction::Handle, Some(handle)) => InteractionState::DraggingHandle { handle },
                    _ => InteractionState::DraggingTool { last: world },
                };
                true
            }
            None => {
                self.selected = None;
                false
            }
        }
    }

    /// Pointer motion; returns true when a tool changed
    pub fn pointer_move(&mut self, pos: Pos2, transform: &ChartTransform) -> bool {
        let world = transform.screen_to_world(pos);
        match self.state {
            InteractionState::Idle => false,
            InteractionState::Placing { press, dragged } => {
                if let Some(tool) = self.selected_mut() {
                    tool.update(world);
                }
                self.state = InteractionState::Placing {
                    press,
                    dragged: dragged || press.distance(pos) >= MIN_TOOL_SIZE_PX,
                };
                true
            }
            InteractionState::DraggingHandle { handle } => {
                if let Some(tool) = self.selected_mut() {
                    tool.update_handle(handle, world);
                }
                true
            }
            InteractionState::DraggingTool { last } => {
                if let Some(tool) = self.selected_mut() {
                    tool.translate(world.index - last.index, world.price - last.price);
                }
                self.state = InteractionState::DraggingTool { last: world };
                true
            }
        }
    }

    /// Release; a drag placement finishes here, a plain click waits for
    /// the second click
    pub fn pointer_up(&mut self, pos: Pos2, transform: &ChartTransform) -> bool {
        match self.state {
            InteractionState::Idle => false,
            InteractionState::Placing { dragged: false, .. } => true,
            InteractionState::Placing { dragged: true, .. } => {
                let world = transform.screen_to_world(pos);
                if let Some(tool) = self.selected_mut() {
                    tool.update(world);
                }
                self.finish_placement(transform);
                true
            }
            InteractionState::DraggingHandle { .. } | InteractionState::DraggingTool { .. } => {
                self.state = InteractionState::Idle;
                true
            }
        }
    }

    /// Abort the gesture in progress. A tool still being placed is removed.
    pub fn cancel(&mut self) {
        if let InteractionState::Placing { .. } = self.state {
            if let Some(id) = self.selected.take() {
                if let Some(ix) = self.position(&id) {
                    self.tools.remove(ix);
                }
            }
            self.active_tool = None;
        }
        self.state = InteractionState::Idle;
    }

    fn finish_placement(&mut self, transform: &ChartTransform) {
        self.state = InteractionState::Idle;
        self.active_tool = None;
        let degenerate = self.selected().is_some_and(|tool| tool.is_degenerate(transform));
        if degenerate {
            debug!("Dropping degenerate drawing {:?}", self.selected);
            self.delete_selected();
        }
    }

    pub fn to_records(&self) -> Vec<ToolRecord> {
        self.tools.iter().map(|tool| tool.serialize()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    /// Replace every tool with the ones in `json`. On error nothing changes.
    /// Repeated ids keep their first owner, later tools get fresh ones.
    pub fn from_json(&mut self, json: &str) -> Result<()> {
        let records: Vec<ToolRecord> = serde_json::from_str(json)?;
        let mut tools = records
            .into_iter()
            .map(ToolRecord::into_tool)
            .collect::<Result<Vec<_>>>()?;
        let mut seen = HashSet::new();
        for tool in &mut tools {
            if !seen.insert(tool.id().to_string()) {
                reassign_id(tool.as_mut());
                seen.insert(tool.id().to_string());
            }
        }
        self.clear();
        self.tools = tools;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let result = self.to_json().and_then(|json| Ok(fs::write(path, json)?));
        if let Err(e) = &result {
            warn!("Failed to save drawings to {}: {}", path.display(), e);
        }
        result
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        let result = fs::read_to_string(path)
            .map_err(Into::into)
            .and_then(|json| self.from_json(&json));
        if let Err(e) = &result {
            warn!("Failed to load drawings from {}: {}", path.display(), e);
        }
        result
    }

    /// Draw every tool, then the handles of the selected one on top
    pub fn draw(&self, surface: &mut dyn Surface, transform: &ChartTransform) {
        for tool in &self.tools {
            tool.draw(surface, transform);
        }
        if let Some(tool) = self.selected() {
            tool.draw_handles(surface, transform);
        }
    }
}

fn reassign_id(tool: &mut dyn DrawingTool) {
    let id = new_tool_id();
    warn!("Drawing id {} already in use, reassigned to {}", tool.id(), id);
    tool.base_mut().id = id;
}
