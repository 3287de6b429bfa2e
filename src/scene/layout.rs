//! Billboard geometry and text layout.

use std::convert::Infallible;

use thiserror::Error;

use super::Viewport;
use super::entity::{Billboard, BillboardLayout, Rect, Rgb, TextLine};
use crate::Card;

pub const TITLE_COLOR: Rgb = Rgb(255, 255, 255);
pub const CONTENT_COLOR: Rgb = Rgb(0xe0, 0xff, 0xe0);

/// Average advance of the pixel font, as a fraction of its size.
const GLYPH_ASPECT: f64 = 0.6;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("text measurement failed: {0}")]
    Measure(String),
    #[error("panel {panel}px wide does not fit a {viewport}px viewport")]
    TooNarrow { panel: f64, viewport: f64 },
}

/// Width of a run of text in CSS pixels.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_px: f64, bold: bool) -> Result<f64, LayoutError>;
}

/// Fixed-advance estimate; never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatedMeasure;

impl EstimatedMeasure {
    pub fn width(text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * GLYPH_ASPECT
    }
}

impl TextMeasure for EstimatedMeasure {
    fn measure(&self, text: &str, font_px: f64, _bold: bool) -> Result<f64, LayoutError> {
        Ok(Self::width(text, font_px))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub text: String,
    pub link: Option<String>,
}

/// x.com profile for an `@handle`.
pub fn handle_url(text: &str) -> Option<String> {
    let handle = text.strip_prefix('@')?;
    if handle.is_empty() || handle.contains(char::is_whitespace) {
        return None;
    }
    Some(format!("https://x.com/{handle}"))
}

/// Split a card body on " + ".
pub fn sections(body: &str) -> Vec<Section> {
    body.split(" + ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Section { text: s.to_string(), link: handle_url(s) })
        .collect()
}

/// Greedy word wrap. A single word wider than `max_width` gets a line of its own.
pub fn wrap_with<E>(
    text: &str,
    max_width: f64,
    mut width_of: impl FnMut(&str) -> Result<f64, E>,
) -> Result<Vec<String>, E> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if width_of(&candidate)? <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

/// Wrap by character count.
pub fn wrap_estimated(text: &str, max_width: f64, font_px: f64) -> Vec<String> {
    let res: Result<_, Infallible> = wrap_with(text, max_width, |s| Ok(EstimatedMeasure::width(s, font_px)));
    match res {
        Ok(lines) => lines,
        Err(never) => match never {},
    }
}

/// Centre a block of lines on `center_y`.
fn block(lines: Vec<String>, x: f64, center_y: f64, font_px: f64, bold: bool, color: Rgb) -> Vec<TextLine> {
    let lh = font_px * 1.3;
    let top = center_y - lh * (lines.len().saturating_sub(1)) as f64 / 2.0;
    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextLine {
            width: EstimatedMeasure::width(&text, font_px),
            text,
            x,
            y: top + lh * i as f64,
            font_px,
            bold,
            color,
            link: None,
        })
        .collect()
}

// --- Slots ---------------------------------------------------------------------

/// Where one card's billboard stands: `(x, y)` is the foot of the panel area.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub card: &'static Card,
    pub x: f64,
    pub y: f64,
    pub mobile: bool,
}

/// Desktop: side by side, sponsors last. Mobile: stacked, sponsors dropped.
pub fn billboard_slots(vp: Viewport, cards: &'static [Card]) -> Vec<Slot> {
    let mobile = vp.is_mobile();
    let mut shown: Vec<&'static Card> = cards.iter().filter(|c| !(mobile && c.is_sponsors())).collect();
    // Stable: keeps the other cards in order.
    shown.sort_by_key(|c| c.is_sponsors());
    let n = shown.len() as f64;
    shown
        .into_iter()
        .enumerate()
        .map(|(i, card)| {
            let i = i as f64;
            if mobile {
                Slot { card, x: vp.width / 2.0, y: vp.height - 100.0 - 160.0 * i, mobile }
            } else {
                Slot { card, x: vp.width * (i + 0.5) / n, y: vp.height - 180.0, mobile }
            }
        })
        .collect()
}

// --- Rich layout ---------------------------------------------------------------

struct RichMetrics {
    panel_w: f64,
    panel_h: f64,
    raise: f64,
    title_px: f64,
    title_dy: f64,
    content_px: f64,
    content_dy: f64,
}

impl RichMetrics {
    fn for_slot(slot: &Slot) -> Self {
        if slot.mobile {
            Self { panel_w: 220.0, panel_h: 140.0, raise: 130.0, title_px: 14.0, title_dy: 35.0, content_px: 12.0, content_dy: 65.0 }
        } else {
            Self { panel_w: 280.0, panel_h: 180.0, raise: 170.0, title_px: 18.0, title_dy: 45.0, content_px: 14.0, content_dy: 85.0 }
        }
    }
}

/// Measured billboard with links on every `@handle` section.
pub fn rich_billboard(slot: Slot, vp: Viewport, measure: &dyn TextMeasure) -> Result<Billboard, LayoutError> {
    let m = RichMetrics::for_slot(&slot);
    if m.panel_w > vp.width {
        return Err(LayoutError::TooNarrow { panel: m.panel_w, viewport: vp.width });
    }
    let card = slot.card;
    let panel = Rect::new(slot.x - m.panel_w / 2.0, slot.y - m.raise, m.panel_w, m.panel_h);

    let mut title = Vec::new();
    let title_lines = wrap_with(card.title, m.panel_w - 24.0, |s| measure.measure(s, m.title_px, true))?;
    for (i, text) in title_lines.into_iter().enumerate() {
        title.push(TextLine {
            width: measure.measure(&text, m.title_px, true)?,
            text,
            x: slot.x,
            y: panel.y + m.title_dy + m.title_px * 1.2 * i as f64,
            font_px: m.title_px,
            bold: true,
            color: TITLE_COLOR,
            link: None,
        });
    }

    let compact = card.style.compact;
    let lh = m.content_px * if compact { 1.1 } else { 1.5 };
    let max_w = m.panel_w - 24.0 - 40.0;
    let mut y = panel.y + m.content_dy + if compact { lh * 0.3 } else { lh };
    let mut content = Vec::new();
    for section in sections(card.body) {
        let bold = card.style.bold;
        let lines = wrap_with(&section.text, max_w, |s| measure.measure(s, m.content_px, bold))?;
        for text in lines {
            let width = measure.measure(&text, m.content_px, bold)?;
            if !width.is_finite() {
                return Err(LayoutError::Measure(format!("non-finite width for {text:?}")));
            }
            content.push(TextLine {
                text,
                x: slot.x,
                y,
                font_px: m.content_px,
                bold,
                color: CONTENT_COLOR,
                link: section.link.clone(),
                width,
            });
            y += lh;
        }
    }

    let support = if slot.mobile && compact {
        None
    } else {
        Some(Rect::new(slot.x - 8.0, slot.y, 16.0, (vp.height - slot.y - 60.0).max(0.0)))
    };
    Ok(Billboard {
        card,
        layout: BillboardLayout::Rich { support },
        panel,
        title,
        content,
        alpha: 1.0,
        flicker_until: None,
        sway: 0.0,
    })
}

// --- Fallback layouts ----------------------------------------------------------

/// Primitive billboard; text wrapped by estimate so it cannot fail.
pub fn simplified_billboard(card: &'static Card, index: usize, vp: Viewport) -> Billboard {
    let x = 150.0 + index as f64 * vp.width / 3.0;
    let y = vp.height - 180.0;
    let panel = Rect::new(x - 100.0, y - 190.0, 200.0, 110.0);
    let title = block(wrap_estimated(card.title, panel.w - 30.0, 14.0), x, panel.y + 30.0, 14.0, true, TITLE_COLOR);
    let content = block(wrap_estimated(card.body, panel.w - 40.0, 12.0), x, panel.y + 70.0, 12.0, false, CONTENT_COLOR);
    Billboard {
        card,
        layout: BillboardLayout::Simplified {
            pole: Rect::new(x - 8.0, y - 100.0, 16.0, 100.0),
            beam: Rect::new(x - 30.0, y - 50.0, 60.0, 8.0),
            lights: [
                Rect::new(panel.x + 20.0, panel.y - 8.0, 30.0, 8.0),
                Rect::new(panel.x + panel.w - 50.0, panel.y - 8.0, 30.0, 8.0),
            ],
        },
        panel,
        title,
        content,
        alpha: 1.0,
        flicker_until: None,
        sway: 0.0,
    }
}

/// Flat card of the static scene.
pub fn static_card(card: &'static Card, index: usize, count: usize, vp: Viewport) -> Billboard {
    let x = vp.width * (index + 1) as f64 / (count + 1) as f64;
    let y = vp.height / 2.0 + 50.0;
    let panel = Rect::centered(x, y, 200.0, 120.0);
    let title = block(vec![card.title.to_string()], x, y - 40.0, 12.0, true, TITLE_COLOR);
    let content = block(wrap_estimated(card.body, 180.0, 10.0), x, y + 10.0, 10.0, false, CONTENT_COLOR);
    Billboard {
        card,
        layout: BillboardLayout::Card,
        panel,
        title,
        content,
        alpha: 1.0,
        flicker_until: None,
        sway: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CARDS;

    #[test]
    fn sections_mark_handles() {
        let s = sections("@karpathy + plain text + @s13k_");
        assert_eq!(s.len(), 3);
        assert_eq!(s[0].link.as_deref(), Some("https://x.com/karpathy"));
        assert_eq!(s[1].link, None);
        assert_eq!(s[2].link.as_deref(), Some("https://x.com/s13k_"));
        assert_eq!(handle_url("@"), None);
    }

    #[test]
    fn wrap_keeps_long_words_whole() {
        let lines = wrap_estimated("tiny supercalifragilistic words", 60.0, 10.0);
        assert_eq!(lines, vec!["tiny", "supercalifragilistic", "words"]);
    }

    #[test]
    fn compact_card_starts_higher() {
        let vp = Viewport::new(1200.0, 600.0);
        let slots = billboard_slots(vp, &CARDS);
        let jury = slots.iter().find(|s| s.card.style.compact).copied().unwrap();
        let about = slots.iter().find(|s| s.card.title == "About the Jam").copied().unwrap();
        let j = rich_billboard(jury, vp, &EstimatedMeasure).unwrap();
        let a = rich_billboard(about, vp, &EstimatedMeasure).unwrap();
        let j_off = j.content[0].y - j.panel.y;
        let a_off = a.content[0].y - a.panel.y;
        assert!((j_off - (85.0 + 14.0 * 1.1 * 0.3)).abs() < 1e-9);
        assert!((a_off - (85.0 + 14.0 * 1.5)).abs() < 1e-9);
    }

    struct Broken;
    impl TextMeasure for Broken {
        fn measure(&self, _: &str, _: f64, _: bool) -> Result<f64, LayoutError> {
            Err(LayoutError::Measure("no context".into()))
        }
    }

    #[test]
    fn measure_failure_surfaces() {
        let vp = Viewport::new(1200.0, 600.0);
        let slot = billboard_slots(vp, &CARDS)[0];
        assert!(matches!(rich_billboard(slot, vp, &Broken), Err(LayoutError::Measure(_))));
    }
}
