//! Screen regions, computed once per state change and shared by rendering
//! and mouse routing so both always agree on where things are.

use ratatui::layout::Rect;
use unicode_width::UnicodeWidthStr;

use crate::app::View;

pub const HEADER_HEIGHT: u16 = 2;
pub const BRAND: &str = " Admin Panel ";
pub const MENU_BUTTON: &str = " ≡ ";

/// Rows at the top of the scrollable page before the table rows start:
/// stats strip, filter bar, table header.
pub const PAGE_PREAMBLE_ROWS: u16 = 3;

pub fn user_button_label(admin_name: &str) -> String {
    format!(" {} ▾ ", admin_name)
}

pub fn online_button_label(count: usize) -> String {
    format!(" ● Online: {} ▾ ", count)
}

pub fn nav_link_label(view: View) -> String {
    format!(" {} ", view.label())
}

fn width_of(s: &str) -> u16 {
    u16::try_from(s.width()).unwrap_or(u16::MAX)
}

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub mobile_breakpoint: u16,
    pub admin_name: String,
    /// `None` when the online counter is disabled.
    pub online_count: Option<usize>,
    pub ticker: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub area: Rect,
    pub header: Rect,
    pub brand: Rect,
    /// Hamburger, only on narrow terminals.
    pub menu_button: Option<Rect>,
    /// Inline navigation links, only on wide terminals.
    pub nav_links: Vec<(View, Rect)>,
    pub user_button: Rect,
    pub body: Rect,
    /// Stats strip counter; gone once scrolled out of the body.
    pub online_button: Option<Rect>,
    pub filter_bar: Option<Rect>,
    /// First on-screen table row and the page row index it shows.
    pub first_table_row: Option<(u16, usize)>,
    pub ticker: Option<Rect>,
    pub status: Rect,
    pub scroll: u16,
}

impl PageLayout {
    pub fn compute(area: Rect, scroll: u16, opts: &LayoutOptions) -> Self {
        let header = Rect::new(area.x, area.y, area.width, HEADER_HEIGHT.min(area.height));
        let status_y = area.bottom().saturating_sub(1);
        let status = Rect::new(area.x, status_y, area.width, 1.min(area.height));
        let ticker = (opts.ticker && area.height > HEADER_HEIGHT + 2)
            .then(|| Rect::new(area.x, status_y.saturating_sub(1), area.width, 1));

        let body_top = header.bottom();
        let body_bottom = ticker.map_or(status.y, |t| t.y);
        let body = Rect::new(
            area.x,
            body_top,
            area.width,
            body_bottom.saturating_sub(body_top),
        );

        let mobile = area.width < opts.mobile_breakpoint;
        let mut x = area.x;
        let menu_button = mobile.then(|| {
            let r = Rect::new(x, area.y, width_of(MENU_BUTTON), 1);
            x += r.width;
            r
        });
        let brand = Rect::new(x, area.y, width_of(BRAND), 1);
        x = brand.right() + 1;

        let user_label = user_button_label(&opts.admin_name);
        let user_width = width_of(&user_label).min(area.width);
        let user_button = Rect::new(
            area.right().saturating_sub(user_width),
            area.y,
            user_width,
            1,
        );

        let mut nav_links = Vec::new();
        if !mobile {
            for view in View::ALL {
                let w = width_of(&nav_link_label(view));
                if x + w >= user_button.x {
                    break;
                }
                nav_links.push((view, Rect::new(x, area.y, w, 1)));
                x += w + 1;
            }
        }

        let page_row = |row: u16| -> Option<Rect> {
            let y = (body.y + row).checked_sub(scroll)?;
            (y >= body.y && y < body.bottom()).then(|| Rect::new(body.x, y, body.width, 1))
        };

        let online_button = match opts.online_count {
            Some(count) => page_row(0).map(|row| {
                let w = width_of(&online_button_label(count)).min(row.width);
                Rect::new(row.x + 1, row.y, w, 1)
            }),
            None => None,
        };
        let filter_bar = page_row(1);

        let first_row = PAGE_PREAMBLE_ROWS.max(scroll);
        let first_table_row =
            page_row(first_row).map(|r| (r.y, usize::from(first_row - PAGE_PREAMBLE_ROWS)));

        Self {
            area,
            header,
            brand,
            menu_button,
            nav_links,
            user_button,
            body,
            online_button,
            filter_bar,
            first_table_row,
            ticker,
            status,
            scroll,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.menu_button.is_some()
    }

    /// Largest useful scroll offset for a page with `rows` table rows.
    pub fn max_scroll(&self, rows: usize) -> u16 {
        let total = usize::from(PAGE_PREAMBLE_ROWS) + rows;
        u16::try_from(total.saturating_sub(usize::from(self.body.height))).unwrap_or(u16::MAX)
    }

    /// Table row index under a screen row, if any.
    pub fn table_row_at(&self, y: u16) -> Option<usize> {
        let (first_y, first_index) = self.first_table_row?;
        if y < first_y || y >= self.body.bottom() {
            return None;
        }
        Some(first_index + usize::from(y - first_y))
    }

    pub fn nav_link_at(&self, x: u16, y: u16) -> Option<View> {
        let pos = ratatui::layout::Position::new(x, y);
        self.nav_links
            .iter()
            .find(|(_, r)| r.contains(pos))
            .map(|(v, _)| *v)
    }

    /// Number of table rows visible at once.
    pub fn visible_rows(&self) -> usize {
        usize::from(self.body.height.saturating_sub(PAGE_PREAMBLE_ROWS)).max(1)
    }
}
