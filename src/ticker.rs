use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

const SEPARATOR: &str = "   •   ";

/// Scrolling news line.
#[derive(Debug, Clone)]
pub struct Ticker {
    chars: Vec<char>,
    offset: usize,
    interval: Duration,
    last_step: Instant,
}

impl Ticker {
    /// `None` when there is nothing to scroll.
    pub fn new(headlines: &[String], interval: Duration, now: Instant) -> Option<Self> {
        let headlines: Vec<&str> = headlines
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .collect();
        if headlines.is_empty() {
            return None;
        }
        let mut text = headlines.join(SEPARATOR);
        text.push_str(SEPARATOR);
        Some(Self {
            chars: text.chars().collect(),
            offset: 0,
            interval,
            last_step: now,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Advance one character per elapsed interval. Returns whether it moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_step);
        let steps = (elapsed.as_millis() / self.interval.as_millis().max(1)) as usize;
        if steps == 0 {
            return false;
        }
        self.offset = (self.offset + steps) % self.chars.len();
        self.last_step += self.interval * steps as u32;
        true
    }

    /// The visible slice, exactly `width` columns wide.
    pub fn window(&self, width: u16) -> String {
        let width = usize::from(width);
        let mut out = String::new();
        let mut used = 0;
        for c in self.chars.iter().cycle().skip(self.offset) {
            let w = c.width().unwrap_or(0);
            if used + w > width {
                break;
            }
            out.push(*c);
            used += w;
            if used == width {
                break;
            }
        }
        out.extend(std::iter::repeat_n(' ', width - used));
        out
    }
}
