use ratatui::layout::Rect;

use super::{ExclusiveGroup, OverlayError, OverlayId, OverlayState, Visibility};

/// A togglable screen region and the trigger bound to it.
#[derive(Debug, Clone)]
pub struct Overlay {
    id: OverlayId,
    state: OverlayState,
    group: Option<ExclusiveGroup>,
    /// Trigger element, as laid out in the last frame.
    anchor: Option<Rect>,
    /// Where the content is drawn while open.
    content: Option<Rect>,
    /// Measured content size (columns, rows), borders included.
    content_size: (u16, u16),
    /// Number of selectable rows inside the content.
    items: usize,
}

impl Overlay {
    fn new(id: OverlayId, group: Option<ExclusiveGroup>) -> Self {
        Self {
            id,
            state: OverlayState::Closed,
            group,
            anchor: None,
            content: None,
            content_size: (0, 0),
            items: 0,
        }
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn group(&self) -> Option<ExclusiveGroup> {
        self.group
    }

    pub fn visibility(&self) -> Visibility {
        self.state.visibility()
    }

    pub fn anchor(&self) -> Option<Rect> {
        self.anchor
    }

    pub fn content(&self) -> Option<Rect> {
        self.content
    }

    pub fn content_size(&self) -> (u16, u16) {
        self.content_size
    }

    pub fn items(&self) -> usize {
        self.items
    }

    pub(super) fn set_state(&mut self, state: OverlayState) {
        self.state = state;
    }

    pub(super) fn set_anchor(&mut self, anchor: Option<Rect>) {
        self.anchor = anchor;
    }

    pub(super) fn set_content(&mut self, content: Option<Rect>) {
        self.content = content;
    }

    pub(super) fn set_content_size(&mut self, width: u16, height: u16, items: usize) {
        self.content_size = (width, height);
        self.items = items;
    }
}

/// Open/closed bookkeeping for every wired overlay.
///
/// Invariant: at most one overlay per [`ExclusiveGroup`] is open.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    overlays: Vec<Overlay>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire an overlay. Registering an id again only updates its group.
    pub fn register(&mut self, id: OverlayId, group: Option<ExclusiveGroup>) {
        if let Some(overlay) = self.get_mut(id) {
            overlay.group = group;
            return;
        }
        tracing::debug!(overlay = ?id, ?group, "overlay registered");
        self.overlays.push(Overlay::new(id, group));
    }

    /// Unwire an overlay whose trigger left the screen.
    pub fn unregister(&mut self, id: OverlayId) -> Option<Overlay> {
        let idx = self.overlays.iter().position(|o| o.id == id)?;
        tracing::debug!(overlay = ?id, "overlay unregistered");
        Some(self.overlays.remove(idx))
    }

    pub fn is_registered(&self, id: OverlayId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: OverlayId) -> Option<&mut Overlay> {
        self.overlays.iter_mut().find(|o| o.id == id)
    }

    fn require_mut(&mut self, id: OverlayId) -> Result<&mut Overlay, OverlayError> {
        self.get_mut(id).ok_or(OverlayError::InvalidReference(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    /// Open an overlay, closing every other open overlay of its group first.
    ///
    /// Returns the siblings that were closed.
    pub fn open(&mut self, id: OverlayId) -> Result<Vec<OverlayId>, OverlayError> {
        let group = self.require_mut(id)?.group;
        let mut closed = Vec::new();
        if let Some(group) = group {
            for other in self.overlays.iter_mut() {
                if other.id != id && other.group == Some(group) && other.is_open() {
                    other.set_state(OverlayState::Closed);
                    closed.push(other.id);
                }
            }
        }
        self.require_mut(id)?.set_state(OverlayState::Open);
        tracing::debug!(overlay = ?id, ?closed, "overlay opened");
        Ok(closed)
    }

    /// Close an overlay. Idempotent; returns whether it was open.
    pub fn close(&mut self, id: OverlayId) -> Result<bool, OverlayError> {
        let overlay = self.require_mut(id)?;
        let was_open = overlay.is_open();
        overlay.set_state(OverlayState::Closed);
        if was_open {
            tracing::debug!(overlay = ?id, "overlay closed");
        }
        Ok(was_open)
    }

    /// Close every open overlay, returning the ones that were open.
    pub fn close_all(&mut self) -> Vec<OverlayId> {
        let mut closed = Vec::new();
        for overlay in self.overlays.iter_mut().filter(|o| o.is_open()) {
            overlay.set_state(OverlayState::Closed);
            closed.push(overlay.id);
        }
        if !closed.is_empty() {
            tracing::debug!(?closed, "all overlays closed");
        }
        closed
    }

    /// Flip an overlay, honoring exclusivity when it opens.
    pub fn toggle(&mut self, id: OverlayId) -> Result<OverlayState, OverlayError> {
        if self.require_mut(id)?.is_open() {
            self.close(id)?;
            Ok(OverlayState::Closed)
        } else {
            self.open(id)?;
            Ok(OverlayState::Open)
        }
    }

    /// Unregistered overlays are never open.
    pub fn is_open(&self, id: OverlayId) -> bool {
        self.get(id).is_some_and(Overlay::is_open)
    }

    pub fn state(&self, id: OverlayId) -> Option<OverlayState> {
        self.get(id).map(Overlay::state)
    }

    pub fn open_overlays(&self) -> impl Iterator<Item = OverlayId> + '_ {
        self.overlays.iter().filter(|o| o.is_open()).map(|o| o.id)
    }

    pub fn any_open(&self) -> bool {
        self.overlays.iter().any(Overlay::is_open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn exclusive() -> OverlayRegistry {
        let mut registry = OverlayRegistry::new();
        for id in OverlayId::ALL {
            registry.register(id, Some(ExclusiveGroup::Navigation));
        }
        registry
    }

    fn independent() -> OverlayRegistry {
        let mut registry = OverlayRegistry::new();
        for id in OverlayId::ALL {
            registry.register(id, None);
        }
        registry
    }

    #[test]
    fn test_open_closes_siblings_in_group() {
        let mut registry = exclusive();
        registry.open(OverlayId::MobileNav).unwrap();
        let closed = registry.open(OverlayId::UserDropdown).unwrap();

        assert_eq!(closed, vec![OverlayId::MobileNav]);
        assert!(registry.is_open(OverlayId::UserDropdown));
        assert!(!registry.is_open(OverlayId::MobileNav));
    }

    #[test]
    fn test_independent_overlays_stay_open() {
        let mut registry = independent();
        registry.open(OverlayId::MobileNav).unwrap();
        let closed = registry.open(OverlayId::OnlineList).unwrap();

        assert!(closed.is_empty());
        assert!(registry.is_open(OverlayId::MobileNav));
        assert!(registry.is_open(OverlayId::OnlineList));
    }

    #[test]
    fn test_toggle_twice_returns_to_closed() {
        let mut registry = exclusive();
        assert_eq!(registry.toggle(OverlayId::OnlineList).unwrap(), OverlayState::Open);
        assert_eq!(registry.toggle(OverlayId::OnlineList).unwrap(), OverlayState::Closed);
        assert!(!registry.any_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut registry = exclusive();
        registry.open(OverlayId::UserDropdown).unwrap();
        assert!(registry.close(OverlayId::UserDropdown).unwrap());
        assert!(!registry.close(OverlayId::UserDropdown).unwrap());
    }

    #[test]
    fn test_close_all_reports_what_was_open() {
        let mut registry = independent();
        registry.open(OverlayId::MobileNav).unwrap();
        registry.open(OverlayId::OnlineList).unwrap();

        let mut closed = registry.close_all();
        closed.sort();
        assert_eq!(closed, vec![OverlayId::MobileNav, OverlayId::OnlineList]);
        assert_eq!(registry.open_overlays().count(), 0);
        assert!(registry.close_all().is_empty());
    }

    #[test]
    fn test_unknown_overlay_is_invalid_reference() {
        let mut registry = OverlayRegistry::new();
        registry.register(OverlayId::UserDropdown, None);

        assert_eq!(
            registry.open(OverlayId::MobileNav),
            Err(OverlayError::InvalidReference(OverlayId::MobileNav))
        );
        assert!(registry.toggle(OverlayId::OnlineList).is_err());
        assert!(!registry.is_open(OverlayId::MobileNav));
        assert_eq!(registry.state(OverlayId::MobileNav), None);
    }

    #[test]
    fn test_register_again_keeps_state() {
        let mut registry = independent();
        registry.open(OverlayId::OnlineList).unwrap();
        registry.register(OverlayId::OnlineList, Some(ExclusiveGroup::Navigation));

        assert!(registry.is_open(OverlayId::OnlineList));
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn test_unregister_removes_overlay() {
        let mut registry = exclusive();
        registry.open(OverlayId::MobileNav).unwrap();
        let removed = registry.unregister(OverlayId::MobileNav).unwrap();

        assert!(removed.is_open());
        assert!(!registry.is_registered(OverlayId::MobileNav));
        assert!(!registry.any_open());
    }

    fn overlay_id() -> impl Strategy<Value = OverlayId> {
        prop_oneof![
            Just(OverlayId::MobileNav),
            Just(OverlayId::UserDropdown),
            Just(OverlayId::OnlineList),
        ]
    }

    #[derive(Debug, Clone)]
    enum Op {
        Open(OverlayId),
        Close(OverlayId),
        Toggle(OverlayId),
        CloseAll,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            overlay_id().prop_map(Op::Open),
            overlay_id().prop_map(Op::Close),
            overlay_id().prop_map(Op::Toggle),
            Just(Op::CloseAll),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_open_per_group(ops in proptest::collection::vec(op(), 0..40)) {
            let mut registry = exclusive();
            for op in ops {
                match op {
                    Op::Open(id) => {
                        registry.open(id).unwrap();
                        for other in OverlayId::ALL.into_iter().filter(|o| *o != id) {
                            prop_assert!(!registry.is_open(other));
                        }
                    }
                    Op::Close(id) => { registry.close(id).unwrap(); }
                    Op::Toggle(id) => { registry.toggle(id).unwrap(); }
                    Op::CloseAll => { registry.close_all(); }
                }
                prop_assert!(registry.open_overlays().count() <= 1);
            }
        }
    }
}
