use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

use super::{Overlay, OverlayError, OverlayState};

/// Vertical distance between the anchor's bottom edge and the popover.
pub const POPOVER_GAP: u16 = 10;

/// Closest the popover may get to the left edge of the viewport.
pub const EDGE_MARGIN: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRules {
    pub gap: u16,
    pub edge_margin: u16,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            gap: POPOVER_GAP,
            edge_margin: EDGE_MARGIN,
        }
    }
}

/// Fixed on-screen coordinates of a portaled popover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub left: u16,
    pub top: u16,
}

impl Placement {
    pub fn rect(self, width: u16, height: u16) -> Rect {
        Rect::new(self.left, self.top, width, height)
    }
}

/// Center the content horizontally under `anchor`, `gap` rows below it.
///
/// The left edge never goes below `edge_margin`. A zero `content_width`
/// degrades to centering a point, i.e. flush-left at the anchor's center.
pub fn place(anchor: Rect, content_width: u16, rules: PlacementRules) -> Placement {
    let center_x = i32::from(anchor.x) + i32::from(anchor.width) / 2;
    let left = (center_x - i32::from(content_width) / 2).max(i32::from(rules.edge_margin));
    let top = i32::from(anchor.y) + i32::from(anchor.height) + i32::from(rules.gap);

    Placement {
        left: to_u16(left),
        top: to_u16(top),
    }
}

fn to_u16(v: i32) -> u16 {
    v.clamp(0, i32::from(u16::MAX)) as u16
}

/// Places portaled overlays and flips their visibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopoverPositioner {
    rules: PlacementRules,
}

impl PopoverPositioner {
    pub fn new(rules: PlacementRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> PlacementRules {
        self.rules
    }

    /// Read the anchor, place the content and make it visible.
    ///
    /// Re-invoked on every scroll and resize while open; nothing is cached.
    pub fn show(&self, overlay: &mut Overlay) -> Result<Placement, OverlayError> {
        let anchor = overlay
            .anchor()
            .ok_or(OverlayError::ElementNotFound(overlay.id().trigger_element()))?;
        let (width, height) = overlay.content_size();
        let placement = place(anchor, width, self.rules);
        overlay.set_content(Some(placement.rect(width, height)));
        overlay.set_state(OverlayState::Open);
        Ok(placement)
    }

    /// Hide the content; all three visibility properties go at once.
    pub fn hide(&self, overlay: &mut Overlay) {
        overlay.set_state(OverlayState::Closed);
        overlay.set_content(None);
    }
}
