//! Dark / light theme switch.

use web_sys::HtmlElement;

use crate::prefs::{KvStore, Preferences, Theme};

pub const LIGHT_CLASS: &str = "light-mode";

/// Two-state theme machine. The only transition is [`ThemeToggle::toggle`].
#[derive(Debug, Clone, Copy)]
pub struct ThemeToggle {
    current: Theme,
}

impl ThemeToggle {
    pub fn from_prefs<S: KvStore>(prefs: &Preferences<S>) -> Self {
        Self { current: prefs.theme() }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Flip, persist, return the new theme.
    pub fn toggle<S: KvStore>(&mut self, prefs: &mut Preferences<S>) -> Theme {
        self.current = self.current.flipped();
        prefs.set_theme(self.current);
        log::info!("theme -> {}", self.current);
        self.current
    }
}

/// Reflect `theme` on `<body>` (dark is the absence of the class).
pub fn apply_theme(body: &HtmlElement, theme: Theme) {
    let classes = body.class_list();
    let res = match theme {
        Theme::Light => classes.add_1(LIGHT_CLASS),
        Theme::Dark => classes.remove_1(LIGHT_CLASS),
    };
    if let Err(e) = res {
        log::warn!("could not apply theme class: {e:?}");
    }
}
