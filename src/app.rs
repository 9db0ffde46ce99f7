use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use ratatui::layout::{Position, Rect};
use wildmatch::WildMatch;

use crate::api::{AdminClient, OnlineSnapshot, User};
use crate::config::PanelConfig;
use crate::forms::{Form, FormKind};
use crate::layout::{LayoutOptions, PAGE_PREAMBLE_ROWS, PageLayout};
use crate::overlay::{OverlayController, OverlayError, OverlayId, PopoverPositioner};
use crate::ticker::Ticker;
use crate::toast::{ToastKind, Toasts};
use crate::ui::confirm::{ConfirmOverlay, ConfirmResult};
use crate::ui::form::{FormOverlay, FormResult};
use crate::ui::overlays;

/// Which page is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Users,
    Permissions,
}

impl View {
    pub const ALL: [View; 2] = [Self::Users, Self::Permissions];

    pub fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Permissions => "Permissions",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Users => Self::Permissions,
            Self::Permissions => Self::Users,
        }
    }
}

/// Entries of the account dropdown, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    Refresh,
    Help,
    Quit,
}

impl AccountAction {
    pub const ALL: [AccountAction; 3] = [Self::Refresh, Self::Help, Self::Quit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Refresh => "Refresh data",
            Self::Help => "Keybindings",
            Self::Quit => "Log out",
        }
    }
}

/// Input mode for the filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// A permission and how many loaded users hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRow {
    pub name: String,
    pub holders: usize,
}

/// Filter bar pattern: `*` and `?` switch to wildcard matching.
#[derive(Debug)]
pub enum Matcher {
    All,
    Glob(WildMatch),
    Substring(String),
}

impl Matcher {
    pub fn new(filter: &str) -> Self {
        let filter = filter.trim().to_lowercase();
        if filter.is_empty() {
            Self::All
        } else if filter.contains(['*', '?']) {
            Self::Glob(WildMatch::new(&filter))
        } else {
            Self::Substring(filter)
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        match self {
            Self::All => true,
            Self::Glob(pattern) => pattern.matches(&text),
            Self::Substring(needle) => text.contains(needle.as_str()),
        }
    }

    pub fn matches_user(&self, user: &User) -> bool {
        self.matches(&user.username)
            || user.email.as_deref().is_some_and(|e| self.matches(e))
            || user.permissions.iter().any(|p| self.matches(p))
    }
}

/// Main application state.
pub struct App {
    pub client: AdminClient,
    pub config: PanelConfig,
    pub should_quit: bool,
    pub view: View,
    pub show_help: bool,

    pub users: Vec<User>,
    pub filtered_users: Vec<usize>,
    pub permissions: Vec<PermissionRow>,
    pub filtered_permissions: Vec<usize>,
    // Names created this session; the backend has no permission listing.
    added_permissions: BTreeSet<String>,
    pub selected: usize,

    pub filter: String,
    pub input_mode: InputMode,

    pub online: OnlineSnapshot,
    pub overlays: OverlayController,
    pub layout: PageLayout,
    area: Rect,
    scroll: u16,

    pub form: Option<FormOverlay>,
    pub confirm: Option<ConfirmOverlay>,
    pub ticker: Option<Ticker>,
    pub toasts: Toasts,
    pub status_msg: String,
}

impl App {
    pub fn new(config: PanelConfig, client: AdminClient, now: Instant) -> Self {
        let overlays = OverlayController::new(
            PopoverPositioner::new(config.popover),
            config.exclusive_overlays,
            config.reposition_on_resize,
        );
        let ticker = Ticker::new(
            &config.ticker_headlines,
            Duration::from_millis(config.ticker_interval_ms),
            now,
        );
        let toasts = Toasts::new(Duration::from_secs(config.toast_secs));
        let options = LayoutOptions {
            mobile_breakpoint: config.mobile_breakpoint,
            admin_name: config.admin_name.clone(),
            online_count: config.online_enabled.then_some(0),
            ticker: ticker.is_some(),
        };

        Self {
            client,
            layout: PageLayout::compute(Rect::default(), 0, &options),
            config,
            should_quit: false,
            view: View::Users,
            show_help: false,

            users: Vec::new(),
            filtered_users: Vec::new(),
            permissions: Vec::new(),
            filtered_permissions: Vec::new(),
            added_permissions: BTreeSet::new(),
            selected: 0,

            filter: String::new(),
            input_mode: InputMode::Normal,

            online: OnlineSnapshot::default(),
            overlays,
            area: Rect::default(),
            scroll: 0,

            form: None,
            confirm: None,
            ticker,
            toasts,
            status_msg: "Connecting...".to_string(),
        }
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            mobile_breakpoint: self.config.mobile_breakpoint,
            admin_name: self.config.admin_name.clone(),
            online_count: self.config.online_enabled.then_some(self.online.total),
            ticker: self.ticker.is_some(),
        }
    }

    /// Recompute screen regions and rebind every trigger to its anchor.
    fn relayout(&mut self) {
        self.layout = PageLayout::compute(self.area, self.scroll, &self.layout_options());
        self.overlays.set_viewport(self.area);

        let anchors = [
            (OverlayId::MobileNav, self.layout.menu_button),
            (OverlayId::UserDropdown, Some(self.layout.user_button)),
            (OverlayId::OnlineList, self.layout.online_button),
        ];
        for (id, anchor) in anchors {
            match self.overlays.bind_trigger(id, anchor) {
                Ok(()) => {
                    let (width, height, items) = self.content_size(id);
                    if let Err(e) = self.overlays.set_content_size(id, width, height, items) {
                        tracing::warn!(overlay = ?id, error = %e, "could not size overlay");
                    }
                }
                Err(OverlayError::ElementNotFound(element)) => {
                    tracing::debug!(element, overlay = ?id, "trigger not on screen, overlay inactive");
                }
                Err(e) => tracing::warn!(overlay = ?id, error = %e, "could not bind trigger"),
            }
        }
    }

    fn content_size(&self, id: OverlayId) -> (u16, u16, usize) {
        match id {
            OverlayId::MobileNav => overlays::mobile_nav_size(self.area.width),
            OverlayId::UserDropdown => overlays::user_dropdown_size(),
            OverlayId::OnlineList => overlays::online_list_size(&self.online.users, self.area.width),
        }
    }

    /// New terminal size.
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.relayout();
        let max = self.layout.max_scroll(self.row_count());
        if self.scroll > max {
            self.scroll = max;
            self.relayout();
        }
        self.overlays.on_resize(area);
    }

    pub fn scroll_to(&mut self, scroll: u16) {
        let scroll = scroll.min(self.layout.max_scroll(self.row_count()));
        if scroll == self.scroll {
            return;
        }
        self.scroll = scroll;
        self.relayout();
        self.overlays.on_scroll();
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let target = (i32::from(self.scroll) + delta).clamp(0, i32::from(u16::MAX));
        self.scroll_to(u16::try_from(target).unwrap_or(0));
    }

    /// Rows in the table of the active view.
    pub fn row_count(&self) -> usize {
        match self.view {
            View::Users => self.filtered_users.len(),
            View::Permissions => self.filtered_permissions.len(),
        }
    }

    pub fn selected_user(&self) -> Option<&User> {
        if self.view != View::Users {
            return None;
        }
        self.filtered_users
            .get(self.selected)
            .and_then(|&i| self.users.get(i))
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.row_count() {
            self.selected += 1;
        }
        self.ensure_selected_visible();
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.ensure_selected_visible();
    }

    pub fn select_page_down(&mut self) {
        let page = self.layout.visible_rows();
        self.selected = (self.selected + page).min(self.row_count().saturating_sub(1));
        self.ensure_selected_visible();
    }

    pub fn select_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(self.layout.visible_rows());
        self.ensure_selected_visible();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_selected_visible();
    }

    pub fn select_last(&mut self) {
        self.selected = self.row_count().saturating_sub(1);
        self.ensure_selected_visible();
    }

    /// Scroll the body just enough to keep the selected row on screen.
    fn ensure_selected_visible(&mut self) {
        let row = usize::from(PAGE_PREAMBLE_ROWS) + self.selected;
        let height = usize::from(self.layout.body.height).max(1);
        let scroll = usize::from(self.scroll);
        let target = if self.selected == 0 {
            0
        } else if row < scroll {
            row
        } else if row >= scroll + height {
            row + 1 - height
        } else {
            scroll
        };
        self.scroll_to(u16::try_from(target).unwrap_or(u16::MAX));
    }

    pub fn set_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.selected = 0;
        self.scroll_to(0);
        self.status_msg = format!("{} rows", self.row_count());
    }

    /// Apply filter and reset the selection.
    pub fn apply_filter(&mut self) {
        let matcher = Matcher::new(&self.filter);
        self.filtered_users = self
            .users
            .iter()
            .enumerate()
            .filter(|(_, u)| matcher.matches_user(u))
            .map(|(i, _)| i)
            .collect();
        self.filtered_permissions = self
            .permissions
            .iter()
            .enumerate()
            .filter(|(_, p)| matcher.matches(&p.name))
            .map(|(i, _)| i)
            .collect();

        self.selected = 0;
        self.scroll_to(0);

        self.status_msg = format!(
            "{} of {} users match \"{}\"",
            self.filtered_users.len(),
            self.users.len(),
            if self.filter.is_empty() { "all" } else { &self.filter }
        );
    }

    fn rebuild_permissions(&mut self) {
        let mut holders: BTreeMap<String, usize> = self
            .added_permissions
            .iter()
            .map(|name| (name.clone(), 0))
            .collect();
        for user in &self.users {
            for permission in &user.permissions {
                *holders.entry(permission.clone()).or_default() += 1;
            }
        }
        self.permissions = holders
            .into_iter()
            .map(|(name, holders)| PermissionRow { name, holders })
            .collect();
    }

    pub fn set_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.rebuild_permissions();
        self.apply_filter();
    }

    pub fn set_online(&mut self, online: OnlineSnapshot) {
        self.online = online;
        self.relayout();
        self.overlays.on_scroll();
    }

    /// Reload the users list and the online counter.
    pub async fn reload(&mut self) {
        match self.client.list_users().await {
            Ok(users) => {
                let count = users.len();
                self.set_users(users);
                self.status_msg = format!("{} users loaded from {}", count, self.client.base_url());
            }
            Err(e) => {
                tracing::warn!(error = %e, "loading users failed");
                self.status_msg = "Users unavailable".to_string();
                self.toasts.show(e.user_message(), ToastKind::Error, Instant::now());
            }
        }
        self.refresh_online().await;
    }

    pub async fn refresh_online(&mut self) {
        if !self.config.online_enabled {
            return;
        }
        match self.client.online_users().await {
            Ok(snapshot) => self.set_online(snapshot),
            Err(e) => tracing::warn!(error = %e, "online users unavailable"),
        }
    }

    /// Keyboard shortcut for a trigger; behaves like clicking it.
    pub fn toggle_overlay(&mut self, id: OverlayId) {
        match self.overlays.toggle(id) {
            Ok(state) => tracing::debug!(overlay = ?id, ?state, "toggled from keyboard"),
            Err(e) => {
                tracing::debug!(overlay = ?id, error = %e, "shortcut ignored");
                self.status_msg = format!("{} is not available here", id.label());
            }
        }
    }

    /// Route a left click: overlays first, then the page if the click got through.
    pub async fn click(&mut self, column: u16, row: u16) {
        let outcome = self.overlays.dispatch_click(column, row);
        if let Some((overlay, index)) = outcome.activated_item() {
            self.activate_item(overlay, index).await;
        }
        if outcome.reaches_page() {
            self.click_page(column, row);
        }
    }

    async fn activate_item(&mut self, overlay: OverlayId, index: usize) {
        match overlay {
            OverlayId::MobileNav => {
                if let Some(&view) = View::ALL.get(index) {
                    self.set_view(view);
                }
            }
            OverlayId::UserDropdown => match AccountAction::ALL.get(index) {
                Some(AccountAction::Refresh) => self.reload().await,
                Some(AccountAction::Help) => self.show_help = true,
                Some(AccountAction::Quit) => self.should_quit = true,
                None => {}
            },
            OverlayId::OnlineList => {}
        }
    }

    fn click_page(&mut self, column: u16, row: u16) {
        if let Some(view) = self.layout.nav_link_at(column, row) {
            self.set_view(view);
            return;
        }
        let pos = Position::new(column, row);
        if self.layout.filter_bar.is_some_and(|r| r.contains(pos)) {
            self.input_mode = InputMode::Editing;
            return;
        }
        if let Some(index) = self.layout.table_row_at(row) {
            if index < self.row_count() {
                self.selected = index;
            }
        }
    }

    pub fn open_form(&mut self) {
        let kind = match self.view {
            View::Users => FormKind::AddUser,
            View::Permissions => FormKind::AddPermission,
        };
        self.form = Some(FormOverlay::new(kind));
    }

    pub async fn handle_form_key(&mut self, key: crossterm::event::KeyEvent) {
        let Some(overlay) = self.form.as_mut() else {
            return;
        };
        match overlay.handle_key(key) {
            Some(FormResult::Submit(form)) => self.submit_form(form).await,
            Some(FormResult::Cancel) => self.form = None,
            None => {}
        }
    }

    fn form_error(&mut self, message: String) {
        self.toasts.show(message.clone(), ToastKind::Error, Instant::now());
        if let Some(overlay) = self.form.as_mut() {
            overlay.set_error(message);
        }
    }

    pub async fn submit_form(&mut self, form: Form) {
        if let Some(label) = form.missing_required() {
            self.form_error(format!("{} is required", label));
            return;
        }

        let result = match form.kind() {
            FormKind::AddUser => self
                .client
                .add_user(&form.to_new_user())
                .await
                .map(|username| format!("User added: {}", username)),
            FormKind::AddPermission => {
                match self.client.add_permission(&form.to_new_permission()).await {
                    Ok(name) => {
                        self.added_permissions.insert(name.clone());
                        Ok(format!("Permission added: {}", name))
                    }
                    Err(e) => Err(e),
                }
            }
        };

        match result {
            Ok(message) => {
                self.form = None;
                self.toasts.show(message, ToastKind::Success, Instant::now());
                self.reload().await;
            }
            Err(e) => self.form_error(e.user_message()),
        }
    }

    /// Ask before deleting the selected user.
    pub fn request_delete(&mut self) {
        let Some(user) = self.selected_user() else {
            if self.view == View::Permissions {
                self.status_msg = "Permissions are managed on the server".to_string();
            }
            return;
        };
        let prompt = format!("Delete user \"{}\"? This cannot be undone.", user.username);
        self.confirm = Some(ConfirmOverlay::new(prompt, user.id));
    }

    pub async fn handle_confirm_key(&mut self, key: crossterm::event::KeyEvent) {
        let Some((result, user_id)) = self.confirm.as_ref().map(|c| (c.handle_key(key), c.user_id()))
        else {
            return;
        };
        match result {
            Some(ConfirmResult::Confirmed) => {
                self.confirm = None;
                self.delete_user(user_id).await;
            }
            Some(ConfirmResult::Cancelled) => {
                self.confirm = None;
                self.status_msg = "Delete cancelled".to_string();
            }
            None => {}
        }
    }

    async fn delete_user(&mut self, id: i64) {
        match self.client.delete_user(id).await {
            Ok(message) => {
                self.toasts.show(message, ToastKind::Success, Instant::now());
                self.reload().await;
            }
            Err(e) => self.toasts.show(e.user_message(), ToastKind::Error, Instant::now()),
        }
    }

    /// Advance timers; called once per event-loop turn.
    pub fn tick(&mut self, now: Instant) {
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick(now);
        }
        self.toasts.expire(now);
    }

    /// Any modal (form, confirmation, help) owns the input.
    pub fn modal_open(&self) -> bool {
        self.form.is_some() || self.confirm.is_some() || self.show_help
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OnlineUser;
    use crate::overlay::OverlayState;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn user(id: i64, name: &str, permissions: &[&str]) -> User {
        User {
            id,
            username: name.to_string(),
            email: Some(format!("{}@example.org", name)),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn app(width: u16, height: u16) -> App {
        let config = PanelConfig::default();
        // Never contacted by these tests.
        let client = AdminClient::new("http://127.0.0.1:9", Duration::from_secs(1), "/online").unwrap();
        let mut app = App::new(config, client, Instant::now());
        app.set_users(vec![
            user(1, "salem", &["news", "gallery"]),
            user(2, "huda", &["news"]),
            user(3, "nour", &[]),
        ]);
        app.resize(Rect::new(0, 0, width, height));
        app
    }

    fn many_users(app: &mut App, n: i64) {
        app.set_users((1..=n).map(|i| user(i, &format!("user{i}"), &[])).collect());
    }

    #[test]
    fn test_filter_substring_and_glob() {
        let mut app = app(100, 30);
        app.filter = "sal".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_users, vec![0]);

        app.filter = "*@example.org".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_users.len(), 3);

        app.filter = "NEWS".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_users, vec![0, 1]);
        assert_eq!(app.filtered_permissions.len(), 1);
    }

    #[test]
    fn test_permissions_counted_from_users() {
        let app = app(100, 30);
        assert_eq!(
            app.permissions,
            vec![
                PermissionRow { name: "gallery".to_string(), holders: 1 },
                PermissionRow { name: "news".to_string(), holders: 2 },
            ]
        );
    }

    #[test]
    fn test_wide_terminal_has_no_mobile_menu() {
        let mut app = app(100, 30);
        assert!(!app.overlays.registry().is_registered(OverlayId::MobileNav));

        app.toggle_overlay(OverlayId::MobileNav);
        assert!(!app.overlays.is_open(OverlayId::MobileNav));
        assert_eq!(app.status_msg, "Menu is not available here");
    }

    #[tokio::test]
    async fn test_narrow_terminal_menu_link_switches_view_and_closes() {
        let mut app = app(60, 20);
        let menu = app.layout.menu_button.unwrap();

        app.click(menu.x, menu.y).await;
        assert!(app.overlays.is_open(OverlayId::MobileNav));

        // Second link: Permissions. Row 0 of the menu is its border.
        let content = app.overlays.registry().get(OverlayId::MobileNav).unwrap().content().unwrap();
        app.click(content.x + 2, content.y + 2).await;
        assert_eq!(app.view, View::Permissions);
        assert!(!app.overlays.is_open(OverlayId::MobileNav));
    }

    #[tokio::test]
    async fn test_outside_click_closes_and_reaches_page() {
        let mut app = app(100, 30);
        app.toggle_overlay(OverlayId::UserDropdown);
        assert!(app.overlays.is_open(OverlayId::UserDropdown));

        let (row_y, _) = app.layout.first_table_row.unwrap();
        app.click(2, row_y + 2).await;

        assert!(!app.overlays.is_open(OverlayId::UserDropdown));
        assert_eq!(app.selected, 2);
    }

    #[tokio::test]
    async fn test_click_inside_dropdown_keeps_it_open() {
        let mut app = app(100, 30);
        app.toggle_overlay(OverlayId::UserDropdown);
        let content = app.overlays.registry().get(OverlayId::UserDropdown).unwrap().content().unwrap();

        // Keybindings entry.
        app.click(content.x + 2, content.y + 2).await;

        assert!(app.show_help);
        assert!(app.overlays.is_open(OverlayId::UserDropdown));
    }

    #[test]
    fn test_online_popover_follows_scroll_until_anchor_leaves() {
        let mut app = app(100, 12);
        many_users(&mut app, 30);
        app.set_online(OnlineSnapshot {
            total: 2,
            users: vec![
                OnlineUser { username: Some("salem".to_string()), last_seen: "10:01".to_string() },
                OnlineUser { username: None, last_seen: "10:00".to_string() },
            ],
        });

        app.toggle_overlay(OverlayId::OnlineList);
        let anchor = app.layout.online_button.unwrap();
        let content = app.overlays.registry().get(OverlayId::OnlineList).unwrap().content().unwrap();
        assert_eq!(content.y, anchor.bottom());

        // One row down: the stats strip scrolls out and the popover closes.
        app.scroll_by(1);
        assert_eq!(app.layout.online_button, None);
        assert!(!app.overlays.is_open(OverlayId::OnlineList));

        // Back up: the trigger is rebound, closed.
        app.scroll_by(-1);
        assert!(app.overlays.registry().is_registered(OverlayId::OnlineList));
        assert_eq!(app.overlays.registry().state(OverlayId::OnlineList), Some(OverlayState::Closed));
    }

    #[test]
    fn test_selection_scrolls_body() {
        let mut app = app(100, 12);
        many_users(&mut app, 30);
        // Body is 9 rows: 3 preamble rows and 6 table rows fit.
        for _ in 0..6 {
            app.select_next();
        }
        assert_eq!(app.selected, 6);
        assert_eq!(app.scroll(), 1);

        app.select_last();
        assert_eq!(app.scroll(), app.layout.max_scroll(30));

        app.select_first();
        assert_eq!(app.scroll(), 0);
    }

    #[test]
    fn test_request_delete_targets_selected_user() {
        let mut app = app(100, 30);
        app.select_next();
        app.request_delete();
        let confirm = app.confirm.as_ref().unwrap();
        assert_eq!(confirm.user_id(), 2);
        assert!(confirm.prompt().contains("huda"));
    }

    #[tokio::test]
    async fn test_cancelled_delete_sends_nothing() {
        let mut app = app(100, 30);
        app.request_delete();

        let key = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        app.handle_confirm_key(key).await;

        assert!(app.confirm.is_none());
        assert_eq!(app.status_msg, "Delete cancelled");
        assert_eq!(app.users.len(), 3);
    }

    #[tokio::test]
    async fn test_submit_with_missing_field_stays_open() {
        let mut app = app(100, 30);
        app.open_form();
        let form = app.form.as_ref().unwrap().form().clone();

        app.submit_form(form).await;

        let overlay = app.form.as_ref().unwrap();
        assert_eq!(overlay.error_message(), Some("Username is required"));
        assert_eq!(app.toasts.current().unwrap().kind, ToastKind::Error);
    }
}
