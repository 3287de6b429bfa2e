//! VibeJam cityscape core crate.
//!
//! Animated night-city canvas scene for the jam landing page, an ambient
//! arpeggio, and the theme/music preferences behind the page toggles. The
//! page calls `start_app(container_id)` and keeps the returned handle.

use wasm_bindgen::prelude::*;

pub mod app;
pub mod audio;
pub mod callbacks;
pub mod prefs;
pub mod scene;
pub mod theme;
pub mod ui;

pub use app::CityscapeApp;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // A second init (tests, hot reload) is harmless.
    console_log::init_with_level(log::Level::Info).ok();
}

// -----------------------------------------------------------------------------
// Card and sponsor datasets
// Card bodies are split on " + "; sections starting with '@' link to x.com.
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardStyle {
    pub font_px: f64,
    pub bold: bool,
    /// Tight line spacing for long handle lists.
    pub compact: bool,
}

#[derive(Debug, PartialEq)]
pub struct Card {
    pub title: &'static str,
    pub body: &'static str,
    pub style: CardStyle,
}

impl Card {
    /// Dropped from the mobile layout; the banner planes carry it there.
    pub fn is_sponsors(&self) -> bool {
        self.title.contains("Sponsors")
    }
}

pub static CARDS: [Card; 3] = [
    Card {
        title: "About the Jam",
        body: "Join us for the inaugural game jam dedicated to AI-assisted vibe coding!",
        style: CardStyle { font_px: 14.0, bold: false, compact: false },
    },
    Card {
        title: "Meet the Jury",
        body: "@karpathy + @timsoret + @mrdoob + @s13k_ + @levelsio",
        style: CardStyle { font_px: 14.0, bold: false, compact: true },
    },
    Card {
        title: "Sponsors",
        body: "@boltdotnew + @coderabbitai",
        style: CardStyle { font_px: 24.0, bold: true, compact: false },
    },
];

#[derive(Debug, PartialEq)]
pub struct Sponsor {
    /// Short name painted on vector fallback banners.
    pub name: &'static str,
    pub banner_text: &'static str,
    pub url: &'static str,
    pub color: u32,
}

pub static SPONSORS: [Sponsor; 2] = [
    Sponsor {
        name: "bolt.new",
        banner_text: "Sponsored by\n@boltdotnew",
        url: "https://bolt.new/",
        color: 0xff3366,
    },
    Sponsor {
        name: "CodeRabbit",
        banner_text: "Sponsored by\n@coderabbitai",
        url: "https://www.coderabbit.ai/",
        color: 0x33ccff,
    },
];

// -----------------------------------------------------------------------------
// Unified entrypoint
// -----------------------------------------------------------------------------

/// Build the page: preferences, theme, music, UI effects, then the scene in
/// the element `container_id`.
#[wasm_bindgen]
pub fn start_app(container_id: &str) -> Result<CityscapeApp, JsValue> {
    app::start(container_id, scene::SceneConfig::default()).map_err(JsValue::from)
}

/// Like [`start_app`], with scene constants overridden from a JSON object.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_app_with_config(container_id: &str, config_json: &str) -> Result<CityscapeApp, JsValue> {
    let config = scene::SceneConfig::from_json(config_json).map_err(JsValue::from)?;
    app::start(container_id, config).map_err(JsValue::from)
}
