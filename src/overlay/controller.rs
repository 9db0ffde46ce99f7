use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Position, Rect};

use super::placement::PopoverPositioner;
use super::{ExclusiveGroup, OverlayError, OverlayId, OverlayRegistry, OverlayState};

/// What a click landed on, as far as overlays are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Trigger(OverlayId),
    /// Inside the content, but not on a selectable row.
    Content(OverlayId),
    /// A selectable row inside the content (menu link, account action, user).
    Item { overlay: OverlayId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Result of routing one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub target: Option<Element>,
    pub propagation: Propagation,
    pub toggled: Option<(OverlayId, OverlayState)>,
    pub closed: Vec<OverlayId>,
}

impl ClickOutcome {
    /// Whether the page underneath gets to handle the click.
    pub fn reaches_page(&self) -> bool {
        self.propagation == Propagation::Continue
    }

    pub fn activated_item(&self) -> Option<(OverlayId, usize)> {
        match self.target {
            Some(Element::Item { overlay, index }) => Some((overlay, index)),
            _ => None,
        }
    }
}

/// Toggle controller and dismissal policy over one [`OverlayRegistry`].
///
/// Every click goes through [`dispatch_click`](Self::dispatch_click): the
/// handler of the element under the pointer runs first and may stop
/// propagation; only then does the dismissal pass run. A trigger click can
/// therefore never open its overlay and be dismissed by the same event.
#[derive(Debug)]
pub struct OverlayController {
    registry: OverlayRegistry,
    positioner: PopoverPositioner,
    viewport: Rect,
    exclusive: bool,
    reposition_on_resize: bool,
}

impl OverlayController {
    pub fn new(positioner: PopoverPositioner, exclusive: bool, reposition_on_resize: bool) -> Self {
        Self {
            registry: OverlayRegistry::new(),
            positioner,
            viewport: Rect::default(),
            exclusive,
            reposition_on_resize,
        }
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn is_open(&self, id: OverlayId) -> bool {
        self.registry.is_open(id)
    }

    pub fn any_open(&self) -> bool {
        self.registry.any_open()
    }

    fn group(&self) -> Option<ExclusiveGroup> {
        self.exclusive.then_some(ExclusiveGroup::Navigation)
    }

    /// Wire (or unwire) an overlay to its trigger element.
    ///
    /// A missing trigger unwires the overlay and reports `ElementNotFound`;
    /// the caller treats it as "feature not active".
    pub fn bind_trigger(&mut self, id: OverlayId, anchor: Option<Rect>) -> Result<(), OverlayError> {
        let Some(anchor) = anchor else {
            if self.registry.unregister(id).is_some() {
                tracing::debug!(overlay = ?id, "trigger left the screen");
            }
            return Err(OverlayError::ElementNotFound(id.trigger_element()));
        };
        let group = self.group();
        self.registry.register(id, group);
        if let Some(overlay) = self.registry.get_mut(id) {
            overlay.set_anchor(Some(anchor));
        }
        Ok(())
    }

    /// Record the measured content size and its number of selectable rows.
    pub fn set_content_size(
        &mut self,
        id: OverlayId,
        width: u16,
        height: u16,
        items: usize,
    ) -> Result<(), OverlayError> {
        let overlay = self
            .registry
            .get_mut(id)
            .ok_or(OverlayError::InvalidReference(id))?;
        overlay.set_content_size(width, height, items);
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Flip an overlay as if its trigger had been clicked.
    pub fn toggle(&mut self, id: OverlayId) -> Result<OverlayState, OverlayError> {
        let state = self.registry.toggle(id)?;
        if state.is_open() {
            if let Err(e) = self.place_open(id) {
                self.registry.close(id)?;
                return Err(e);
            }
        }
        self.sync_in_flow();
        self.sync_closed();
        Ok(state)
    }

    pub fn close(&mut self, id: OverlayId) -> Result<bool, OverlayError> {
        let was_open = self.registry.close(id)?;
        self.sync_closed();
        Ok(was_open)
    }

    pub fn close_all(&mut self) -> Vec<OverlayId> {
        let closed = self.registry.close_all();
        self.sync_closed();
        closed
    }

    /// Topmost overlay element under the pointer.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<Element> {
        let pos = Position::new(column, row);

        // Portaled content is painted last, so it wins.
        let mut open: Vec<_> = self
            .registry
            .iter()
            .filter(|o| o.visibility().pointer_events())
            .collect();
        open.sort_by_key(|o| !o.id().is_portaled());

        for overlay in open {
            let Some(content) = overlay.content() else {
                continue;
            };
            if !content.contains(pos) {
                continue;
            }
            // Row 0 is the top border.
            let index = usize::from(row.saturating_sub(content.y)).checked_sub(1);
            let inside_border = column > content.x && column < content.right().saturating_sub(1);
            return match index {
                Some(index) if inside_border && index < overlay.items() => Some(Element::Item {
                    overlay: overlay.id(),
                    index,
                }),
                _ => Some(Element::Content(overlay.id())),
            };
        }

        self.registry
            .iter()
            .find(|o| o.anchor().is_some_and(|a| a.contains(pos)))
            .map(|o| Element::Trigger(o.id()))
    }

    /// Route a left click at the given cell.
    pub fn dispatch_click(&mut self, column: u16, row: u16) -> ClickOutcome {
        let target = self.hit_test(column, row);
        let mut outcome = ClickOutcome {
            target,
            propagation: Propagation::Stop,
            toggled: None,
            closed: Vec::new(),
        };

        match target {
            Some(Element::Trigger(id)) => match self.toggle(id) {
                Ok(state) => outcome.toggled = Some((id, state)),
                Err(e) => tracing::warn!(overlay = ?id, error = %e, "trigger could not toggle"),
            },
            Some(Element::Item {
                overlay: OverlayId::MobileNav,
                ..
            }) => {
                // Following a navigation link always dismisses the menu.
                if let Ok(true) = self.close(OverlayId::MobileNav) {
                    outcome.closed.push(OverlayId::MobileNav);
                }
            }
            Some(Element::Item { .. } | Element::Content(_)) => {}
            None => {
                outcome.propagation = Propagation::Continue;
                outcome.closed = self.dismiss_outside(Position::new(column, row));
            }
        }
        outcome
    }

    /// Document-level pass: close every open overlay the click is outside of.
    fn dismiss_outside(&mut self, pos: Position) -> Vec<OverlayId> {
        let outside: Vec<OverlayId> = self
            .registry
            .iter()
            .filter(|o| o.is_open())
            .filter(|o| {
                let on_trigger = o.anchor().is_some_and(|a| a.contains(pos));
                let on_content = o.content().is_some_and(|c| c.contains(pos));
                !on_trigger && !on_content
            })
            .map(|o| o.id())
            .collect();

        for id in &outside {
            self.close_or_warn(*id);
        }
        if !outside.is_empty() {
            tracing::debug!(closed = ?outside, "dismissed by outside click");
            self.sync_closed();
        }
        outside
    }

    /// Escape closes every open overlay, whatever has focus.
    ///
    /// Returns the overlays that were closed; an empty list means the key is
    /// free for the rest of the UI.
    pub fn dispatch_key(&mut self, key: &KeyEvent) -> Vec<OverlayId> {
        if key.code != KeyCode::Esc {
            return Vec::new();
        }
        self.close_all()
    }

    /// Keep open popovers attached to their anchors after the page scrolled.
    pub fn on_scroll(&mut self) {
        self.reposition_portaled();
        self.sync_in_flow();
    }

    pub fn on_resize(&mut self, viewport: Rect) {
        self.viewport = viewport;
        if self.reposition_on_resize {
            self.reposition_portaled();
        }
        self.sync_in_flow();
    }

    fn reposition_portaled(&mut self) {
        let open: Vec<OverlayId> = self
            .registry
            .open_overlays()
            .filter(|id| id.is_portaled())
            .collect();
        for id in open {
            if let Err(e) = self.place_open(id) {
                tracing::warn!(overlay = ?id, error = %e, "popover lost its anchor");
                self.close_or_warn(id);
                self.sync_closed();
            }
        }
    }

    fn close_or_warn(&mut self, id: OverlayId) {
        if let Err(e) = self.registry.close(id) {
            tracing::warn!(overlay = ?id, error = %e, "overlay could not close");
        }
    }

    fn place_open(&mut self, id: OverlayId) -> Result<(), OverlayError> {
        if !id.is_portaled() {
            return Ok(());
        }
        let positioner = self.positioner;
        let overlay = self
            .registry
            .get_mut(id)
            .ok_or(OverlayError::InvalidReference(id))?;
        let placement = positioner.show(overlay)?;
        tracing::trace!(overlay = ?id, left = placement.left, top = placement.top, "popover placed");
        Ok(())
    }

    /// In-flow dropdowns follow their anchor like normal layout.
    fn sync_in_flow(&mut self) {
        let viewport = self.viewport;
        let open: Vec<OverlayId> = self
            .registry
            .open_overlays()
            .filter(|id| !id.is_portaled())
            .collect();
        for id in open {
            let Some(overlay) = self.registry.get_mut(id) else {
                continue;
            };
            let Some(anchor) = overlay.anchor() else {
                continue;
            };
            let (width, height) = overlay.content_size();
            let content = match id {
                OverlayId::MobileNav => Rect::new(viewport.x, anchor.bottom(), viewport.width, height),
                _ => Rect::new(anchor.right().saturating_sub(width), anchor.bottom(), width, height),
            };
            overlay.set_content(Some(content));
        }
    }

    fn sync_closed(&mut self) {
        let positioner = self.positioner;
        let closed: Vec<OverlayId> = self
            .registry
            .iter()
            .filter(|o| !o.is_open() && o.content().is_some())
            .map(|o| o.id())
            .collect();
        for id in closed {
            if let Some(overlay) = self.registry.get_mut(id) {
                positioner.hide(overlay);
            }
        }
    }
}
