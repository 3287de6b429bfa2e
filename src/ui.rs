//! Page entrance fades and the CRT scanline flicker.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlElement};

use crate::callbacks::{JitterLoop, Timeout};

pub const FADE_SELECTOR: &str = ".info-card, h1";
pub const BUTTON_SELECTOR: &str = ".control-btn";
pub const SCANLINES_SELECTOR: &str = ".scanlines";

/// Entrance transition: start `offset_px` below (negative: above) and invisible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub secs: f64,
    pub offset_px: f64,
}

pub const CARD_FADE: Fade = Fade { secs: 0.7, offset_px: 20.0 };
pub const BUTTON_FADE: Fade = Fade { secs: 0.4, offset_px: -10.0 };

pub fn card_delay_ms(index: usize) -> f64 {
    100.0 + 150.0 * index as f64
}

pub fn button_delay_ms(index: usize) -> f64 {
    300.0 * (index + 1) as f64
}

/// One flicker step: scanline opacity and the wait before the next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlickerSample {
    pub opacity: f64,
    pub next_ms: f64,
}

impl FlickerSample {
    pub fn draw<R: Rng>(rng: &mut R) -> Self {
        Self { opacity: 0.4 + rng.gen_range(0.0..0.2), next_ms: 500.0 + rng.gen_range(0.0..2000.0) }
    }
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    if let Err(e) = el.style().set_property(prop, value) {
        log::debug!("style {prop} rejected: {e:?}");
    }
}

/// Hide `el` now and fade it in after `delay_ms`.
pub fn fade_in(el: &HtmlElement, fade: Fade, delay_ms: f64) -> Result<Timeout, JsValue> {
    set_style(el, "opacity", "0");
    set_style(el, "transform", &format!("translateY({}px)", fade.offset_px));
    set_style(
        el,
        "transition",
        &format!("opacity {s}s ease, transform {s}s ease", s = fade.secs),
    );
    let el = el.clone();
    Timeout::new(delay_ms, move || {
        set_style(&el, "opacity", "1");
        set_style(&el, "transform", "translateY(0)");
    })
}

/// Card-style entrance for content added after start-up.
pub fn animate_element(el: &HtmlElement, delay_ms: f64) -> Result<Timeout, JsValue> {
    fade_in(el, CARD_FADE, delay_ms)
}

fn select_all(document: &Document, selector: &str) -> Vec<HtmlElement> {
    let Ok(list) = document.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|n| n.dyn_into::<HtmlElement>().ok())
        .collect()
}

/// Keeps the scanline opacity wandering until dropped.
pub fn start_flicker(el: HtmlElement) -> Result<JitterLoop, JsValue> {
    let mut rng = SmallRng::from_entropy();
    let first = FlickerSample::draw(&mut rng);
    set_style(&el, "opacity", &first.opacity.to_string());
    JitterLoop::start(first.next_ms, move || {
        let s = FlickerSample::draw(&mut rng);
        set_style(&el, "opacity", &s.opacity.to_string());
        s.next_ms
    })
}

/// Owns every pending fade and the flicker loop; dropping it cancels them.
#[derive(Default)]
pub struct UiEffects {
    fades: Vec<Timeout>,
    flicker: Option<JitterLoop>,
}

impl UiEffects {
    pub fn start(document: &Document) -> Self {
        let mut fx = Self::default();
        let cards = select_all(document, FADE_SELECTOR);
        let buttons = select_all(document, BUTTON_SELECTOR);
        let plan = cards
            .iter()
            .enumerate()
            .map(|(i, el)| (el, CARD_FADE, card_delay_ms(i)))
            .chain(buttons.iter().enumerate().map(|(i, el)| (el, BUTTON_FADE, button_delay_ms(i))));
        for (el, fade, delay) in plan {
            match fade_in(el, fade, delay) {
                Ok(t) => fx.fades.push(t),
                Err(e) => log::warn!("fade not scheduled: {e:?}"),
            }
        }
        let scanlines = document
            .query_selector(SCANLINES_SELECTOR)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if let Some(el) = scanlines {
            match start_flicker(el) {
                Ok(l) => fx.flicker = Some(l),
                Err(e) => log::warn!("scanline flicker not started: {e:?}"),
            }
        }
        log::info!("ui effects: {} fades, flicker {}", fx.fades.len(), fx.flicker.is_some());
        fx
    }

    pub fn animate(&mut self, el: &HtmlElement, delay_ms: f64) {
        match animate_element(el, delay_ms) {
            Ok(t) => self.fades.push(t),
            Err(e) => log::warn!("fade not scheduled: {e:?}"),
        }
    }

    pub fn is_flickering(&self) -> bool {
        self.flicker.is_some()
    }

    /// Cancel everything still pending.
    pub fn stop(&mut self) {
        self.fades.clear();
        self.flicker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_schedule() {
        assert_eq!(card_delay_ms(0), 100.0);
        assert_eq!(card_delay_ms(3), 550.0);
        assert_eq!(button_delay_ms(0), 300.0);
        assert_eq!(button_delay_ms(2), 900.0);
    }

    #[test]
    fn flicker_samples_in_range() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1000 {
            let s = FlickerSample::draw(&mut rng);
            assert!((0.4..0.6).contains(&s.opacity));
            assert!((500.0..2500.0).contains(&s.next_ms));
        }
    }
}
