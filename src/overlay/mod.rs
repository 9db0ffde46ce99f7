//! Navigation overlays: the mobile menu, the account dropdown and the
//! portaled online-users popover.
//!
//! The registry owns open/closed state, the controller routes clicks and keys
//! (trigger handlers first, then the single dismissal pass), and the
//! positioner places the portaled popover under its anchor.

mod controller;
mod placement;
mod registry;

pub use controller::{ClickOutcome, Element, OverlayController, Propagation};
pub use placement::{Placement, PlacementRules, PopoverPositioner, place};
pub use registry::{Overlay, OverlayRegistry};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The overlays the panel knows how to wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayId {
    MobileNav,
    UserDropdown,
    OnlineList,
}

impl OverlayId {
    pub const ALL: [OverlayId; 3] = [Self::MobileNav, Self::UserDropdown, Self::OnlineList];

    /// Element that toggles the overlay when clicked.
    pub fn trigger_element(self) -> &'static str {
        match self {
            Self::MobileNav => "mobileToggle",
            Self::UserDropdown => "userBtn",
            Self::OnlineList => "onlineToggle",
        }
    }

    /// Element holding the overlay content.
    pub fn content_element(self) -> &'static str {
        match self {
            Self::MobileNav => "mobileNav",
            Self::UserDropdown => "userDropdown",
            Self::OnlineList => "onlineDropdownPortal",
        }
    }

    /// Portaled overlays are drawn at coordinates computed by the positioner
    /// instead of following their anchor's layout.
    pub fn is_portaled(self) -> bool {
        matches!(self, Self::OnlineList)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MobileNav => "Menu",
            Self::UserDropdown => "Account",
            Self::OnlineList => "Online",
        }
    }
}

/// A set of overlays where opening one closes the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusiveGroup {
    Navigation,
}

/// Open/closed state of a single overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Closed,
    Open,
}

impl OverlayState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    pub fn visibility(self) -> Visibility {
        Visibility::from(self)
    }
}

/// Visible / opacity / pointer-events, always switched together.
///
/// The fields are private so a half-shown overlay (interactive but invisible,
/// or visible but inert) cannot be built; the only source is [`OverlayState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    visible: bool,
    opacity: u8,
    pointer_events: bool,
}

impl Visibility {
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Opacity in percent.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn pointer_events(&self) -> bool {
        self.pointer_events
    }
}

impl From<OverlayState> for Visibility {
    fn from(state: OverlayState) -> Self {
        match state {
            OverlayState::Open => Self {
                visible: true,
                opacity: 100,
                pointer_events: true,
            },
            OverlayState::Closed => Self {
                visible: false,
                opacity: 0,
                pointer_events: false,
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// The trigger or content element is not on screen; the overlay is not wired.
    #[error("Element not found: {0}")]
    ElementNotFound(&'static str),

    /// The overlay was never registered.
    #[error("Unknown overlay: {0:?}")]
    InvalidReference(OverlayId),
}
