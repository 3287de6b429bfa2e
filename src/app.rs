//! Page controller: builds every part in order and owns it.
//!
//! `CityscapeApp` is the only thing JavaScript holds. Callbacks registered with
//! the browser keep a `Weak` to the shared state, so dropping the handle (or
//! calling `destroy`) tears everything down.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlCanvasElement, HtmlElement, MouseEvent, Window,
};

use crate::audio::synth::WebSynth;
use crate::audio::{AudioBackend, MUSIC_ON_CLASS, MusicPlayer, PlaybackState, SilentBackend};
use crate::callbacks::{AnimationLoop, Interval, Listener, Timeout};
use crate::prefs::{self, KvStore, Preferences, Theme};
use crate::scene::assets::AssetCache;
use crate::scene::render::{self, CanvasAssets, CanvasMeasure, CanvasTextures};
use crate::scene::{Scene, SceneConfig, Viewport};
use crate::theme::{ThemeToggle, apply_theme};
use crate::ui::UiEffects;
use crate::{CARDS, Card};

pub const CANVAS_ID: &str = "cityscape-canvas";
pub const THEME_BUTTON_ID: &str = "themeToggle";
pub const MUSIC_BUTTON_ID: &str = "musicToggle";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no global window")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("dom call failed: {0}")]
    Dom(String),
}

impl AppError {
    fn dom(err: JsValue) -> Self {
        AppError::Dom(format!("{err:?}"))
    }
}

impl From<AppError> for JsValue {
    fn from(e: AppError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

// --- Toggles -------------------------------------------------------------------

/// Theme and music state behind the page buttons, independent of the DOM.
pub struct Controls<S: KvStore, B: AudioBackend> {
    prefs: Preferences<S>,
    theme: ThemeToggle,
    music: MusicPlayer<B>,
}

impl<S: KvStore, B: AudioBackend> Controls<S, B> {
    /// Read the stored preferences; a stored "on" starts the music.
    pub fn init(store: S, backend: B) -> Self {
        let mut prefs = Preferences::new(store);
        let theme = ThemeToggle::from_prefs(&prefs);
        let mut music = MusicPlayer::new(backend);
        music.restore(&mut prefs);
        Self { prefs, theme, music }
    }

    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    pub fn is_music_playing(&self) -> bool {
        self.music.is_playing()
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme.toggle(&mut self.prefs)
    }

    pub fn toggle_music(&mut self) -> PlaybackState {
        self.music.toggle(&mut self.prefs)
    }

    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    fn shutdown(&mut self) {
        self.music.silence();
    }
}

// --- Views ---------------------------------------------------------------------

struct SceneView {
    container: Element,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    textures: CanvasAssets,
    measure: CanvasMeasure,
    scene: Scene,
    hovering: bool,
    draw_failed: bool,
}

impl SceneView {
    fn frame(&mut self, now: f64) {
        self.scene.tick(now);
        if let Err(e) = render::draw_scene(&self.ctx, &self.scene, &self.textures) {
            if !self.draw_failed {
                log::warn!("frame draw failed: {e:?}");
                self.draw_failed = true;
            }
        }
    }

    /// Resizing the canvas clears it, so an unchanged size is left alone.
    fn resize(&mut self, window: &Window) {
        let vp = container_viewport(window, &self.container);
        if vp == self.scene.viewport() {
            return;
        }
        self.canvas.set_width(vp.width.max(0.0) as u32);
        self.canvas.set_height(vp.height.max(0.0) as u32);
        self.scene.resize(vp, &self.textures, &self.measure);
    }

    fn hover(&mut self, x: f64, y: f64) {
        let over = self.scene.link_at(x, y).is_some();
        if over != self.hovering {
            self.hovering = over;
            let cursor = if over { "pointer" } else { "default" };
            self.canvas.style().set_property("cursor", cursor).ok();
        }
    }
}

/// Non-animated stand-in when the canvas has no 2D context.
struct FallbackView {
    _ticker: Option<Interval>,
}

enum View {
    Scene(Box<SceneView>),
    Fallback { _view: FallbackView },
    Absent,
}

fn container_viewport(window: &Window, container: &Element) -> Viewport {
    let (cw, ch) = (container.client_width() as f64, container.client_height() as f64);
    let inner = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let w = if cw > 0.0 { cw } else { inner(window.inner_width()) };
    let h = if ch > 0.0 { ch } else { inner(window.inner_height()) };
    Viewport::new(w, h)
}

fn build_view(window: &Window, document: &Document, container_id: &str, config: SceneConfig) -> View {
    let Some(container) = document.get_element_by_id(container_id) else {
        log::warn!("container #{container_id} not found; scene skipped");
        return View::Absent;
    };
    match scene_view(window, document, &container, config) {
        Ok(Some(view)) => View::Scene(Box::new(view)),
        Ok(None) => fallback_view(document, &container),
        Err(e) => {
            log::warn!("{e}; using fallback view");
            fallback_view(document, &container)
        }
    }
}

/// `Ok(None)` when the browser offers no 2D context.
fn scene_view(
    window: &Window,
    document: &Document,
    container: &Element,
    config: SceneConfig,
) -> Result<Option<SceneView>, AppError> {
    let canvas: HtmlCanvasElement = match document.get_element_by_id(CANVAS_ID) {
        Some(el) => el.dyn_into().map_err(|_| AppError::Dom(format!("#{CANVAS_ID} is not a canvas")))?,
        None => {
            let c: HtmlCanvasElement = document
                .create_element("canvas")
                .map_err(AppError::dom)?
                .dyn_into()
                .map_err(|_| AppError::Dom("canvas element".into()))?;
            c.set_id(CANVAS_ID);
            c.set_attribute("style", "display:block; width:100%; height:100%;").ok();
            container.append_child(&c).map_err(AppError::dom)?;
            c
        }
    };
    let ctx = match canvas.get_context("2d").map_err(AppError::dom)? {
        Some(obj) => obj
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| AppError::Dom("2d context".into()))?,
        None => return Ok(None),
    };

    let vp = container_viewport(window, container);
    canvas.set_width(vp.width.max(0.0) as u32);
    canvas.set_height(vp.height.max(0.0) as u32);

    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed ^ 0xa55e7),
        None => SmallRng::from_entropy(),
    };
    let textures = AssetCache::acquire(&mut CanvasTextures::new(document.clone()), &mut rng);
    let measure = CanvasMeasure::new(ctx.clone());
    let scene = Scene::build(vp, config, &textures, &measure);
    Ok(Some(SceneView {
        container: container.clone(),
        canvas,
        ctx,
        textures,
        measure,
        scene,
        hovering: false,
        draw_failed: false,
    }))
}

fn styled(document: &Document, tag: &str, text: Option<&str>, style: &str) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = document.create_element(tag)?.dyn_into()?;
    if let Some(t) = text {
        el.set_text_content(Some(t));
    }
    el.set_attribute("style", style)?;
    Ok(el)
}

fn fallback_view(document: &Document, container: &Element) -> View {
    match install_fallback(document, container) {
        Ok(view) => View::Fallback { _view: view },
        Err(e) => {
            log::warn!("fallback view failed: {e:?}");
            View::Absent
        }
    }
}

const FALLBACK_TITLE_STYLE: &str =
    "color:#ffffff; font-family:'Press Start 2P', cursive; font-size:14px; margin-bottom:15px; text-align:center;";

/// Inline style of a fallback card's body; capped at the 14 px title size.
fn fallback_body_style(card: &Card) -> String {
    let weight = if card.style.bold { "bold" } else { "normal" };
    format!(
        "color:#e0ffe0; font-family:Inter, sans-serif; font-size:{}px; font-weight:{weight}; text-align:center;",
        card.style.font_px.min(14.0)
    )
}

fn install_fallback(document: &Document, container: &Element) -> Result<FallbackView, JsValue> {
    container.set_inner_html("");
    container.set_attribute("style", "background-color:#001133; padding:20px;")?;
    let header = styled(
        document,
        "h2",
        Some("CITYSCAPE VIEW"),
        "color:#ffffff; text-align:center; font-family:'Press Start 2P', cursive; margin-bottom:40px;",
    )?;
    container.append_child(&header)?;
    let row = styled(document, "div", None, "display:flex; justify-content:space-around; flex-wrap:wrap; gap:20px;")?;
    container.append_child(&row)?;

    let mut cards = Vec::new();
    for card in CARDS.iter() {
        let board = styled(
            document,
            "div",
            None,
            "width:200px; background-color:#222222; padding:15px; border:4px solid #ff3366; \
             border-radius:4px; box-shadow:0 0 10px rgba(255,51,102,0.5);",
        )?;
        board.set_class_name("fallback-billboard");
        let title = styled(document, "h3", Some(card.title), FALLBACK_TITLE_STYLE)?;
        board.append_child(&title)?;
        let body = styled(document, "p", Some(card.body), &fallback_body_style(card))?;
        board.append_child(&body)?;
        row.append_child(&board)?;
        cards.push(board);
    }

    // Rare dimming, restored 100 ms later.
    let mut pending: Vec<Timeout> = Vec::new();
    let mut rng = SmallRng::from_entropy();
    let ticker = Interval::new(500.0, move || {
        pending.clear();
        for card in &cards {
            if rng.gen_bool(0.05) {
                card.style().set_property("opacity", "0.7").ok();
                let card = card.clone();
                match Timeout::new(100.0, move || {
                    card.style().set_property("opacity", "1").ok();
                }) {
                    Ok(t) => pending.push(t),
                    Err(e) => log::debug!("flicker restore not scheduled: {e:?}"),
                }
            }
        }
    });
    let ticker = match ticker {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("fallback flicker not started: {e:?}");
            None
        }
    };
    log::info!("fallback view installed");
    Ok(FallbackView { _ticker: ticker })
}

// --- App -----------------------------------------------------------------------

struct AppState {
    window: Window,
    body: Option<HtmlElement>,
    controls: Controls<Box<dyn KvStore>, Box<dyn AudioBackend>>,
    ui: UiEffects,
    view: View,
}

impl AppState {
    fn sync_body(&self) {
        let Some(body) = &self.body else { return };
        apply_theme(body, self.controls.theme());
        let classes = body.class_list();
        let res = if self.controls.is_music_playing() {
            classes.add_1(MUSIC_ON_CLASS)
        } else {
            classes.remove_1(MUSIC_ON_CLASS)
        };
        if let Err(e) = res {
            log::warn!("could not update music class: {e:?}");
        }
    }

    fn toggle_music(&mut self) -> bool {
        let playing = self.controls.toggle_music() == PlaybackState::Playing;
        self.sync_body();
        playing
    }

    fn toggle_theme(&mut self) -> Theme {
        let theme = self.controls.toggle_theme();
        self.sync_body();
        theme
    }

    fn resize(&mut self) {
        if let View::Scene(view) = &mut self.view {
            view.resize(&self.window);
        }
    }

    fn scene_view(&mut self) -> Option<&mut SceneView> {
        match &mut self.view {
            View::Scene(v) => Some(v),
            _ => None,
        }
    }
}

/// Run `f` on the state if it is still alive and not already borrowed.
fn with_state(weak: &Weak<RefCell<AppState>>, f: impl FnOnce(&mut AppState)) {
    if let Some(state) = weak.upgrade() {
        if let Ok(mut s) = state.try_borrow_mut() {
            f(&mut s);
        }
    }
}

fn canvas_point(ev: &web_sys::Event) -> Option<(f64, f64)> {
    ev.dyn_ref::<MouseEvent>().map(|m| (m.offset_x() as f64, m.offset_y() as f64))
}

#[wasm_bindgen]
pub struct CityscapeApp {
    state: Rc<RefCell<AppState>>,
    frame: Option<AnimationLoop>,
    listeners: Vec<Listener>,
}

pub(crate) fn start(container_id: &str, config: SceneConfig) -> Result<CityscapeApp, AppError> {
    let window = web_sys::window().ok_or(AppError::NoWindow)?;
    let document = window.document().ok_or(AppError::NoDocument)?;

    let backend: Box<dyn AudioBackend> = match WebSynth::new() {
        Ok(synth) => Box::new(synth),
        Err(e) => {
            log::warn!("{e}; music toggle will stay silent");
            Box::new(SilentBackend)
        }
    };
    let controls = Controls::init(prefs::browser_store(), backend);
    let ui = UiEffects::start(&document);
    let view = build_view(&window, &document, container_id, config);

    let state = Rc::new(RefCell::new(AppState { window: window.clone(), body: document.body(), controls, ui, view }));
    state.borrow().sync_body();

    let mut app = CityscapeApp { state: state.clone(), frame: None, listeners: Vec::new() };
    app.wire(&window, &document);
    log::info!("cityscape app started");
    Ok(app)
}

fn listen<F>(listeners: &mut Vec<Listener>, target: &EventTarget, kind: &'static str, f: F)
where
    F: FnMut(web_sys::Event) + 'static,
{
    match Listener::new(target, kind, f) {
        Ok(l) => listeners.push(l),
        Err(e) => log::warn!("{kind} listener not added: {e:?}"),
    }
}

fn on_button(listeners: &mut Vec<Listener>, document: &Document, id: &str, weak: &Weak<RefCell<AppState>>, f: fn(&mut AppState)) {
    let Some(button) = document.get_element_by_id(id) else {
        log::debug!("#{id} not found");
        return;
    };
    let w = weak.clone();
    listen(listeners, &button, "click", move |_| with_state(&w, f));
}

impl CityscapeApp {
    fn wire(&mut self, window: &Window, document: &Document) {
        let weak = Rc::downgrade(&self.state);
        let listeners = &mut self.listeners;

        let w = weak.clone();
        listen(listeners, window, "resize", move |_| with_state(&w, AppState::resize));
        on_button(listeners, document, THEME_BUTTON_ID, &weak, |s| {
            s.toggle_theme();
        });
        on_button(listeners, document, MUSIC_BUTTON_ID, &weak, |s| {
            s.toggle_music();
        });

        let canvas = self.state.borrow_mut().scene_view().map(|v| v.canvas.clone());
        let Some(canvas) = canvas else { return };

        let w = weak.clone();
        listen(listeners, &canvas, "click", move |ev| {
            let Some((x, y)) = canvas_point(&ev) else { return };
            with_state(&w, |s| {
                let url = s.scene_view().and_then(|v| v.scene.link_at(x, y).map(str::to_string));
                if let Some(url) = url {
                    log::info!("opening {url}");
                    if let Err(e) = s.window.open_with_url_and_target(&url, "_blank") {
                        log::warn!("window.open failed: {e:?}");
                    }
                }
            });
        });

        let w = weak.clone();
        listen(listeners, &canvas, "mousemove", move |ev| {
            let Some((x, y)) = canvas_point(&ev) else { return };
            with_state(&w, |s| {
                if let Some(v) = s.scene_view() {
                    v.hover(x, y);
                }
            });
        });

        match AnimationLoop::start(move |now| {
            with_state(&weak, |s| {
                if let Some(v) = s.scene_view() {
                    v.frame(now);
                }
            })
        }) {
            Ok(frame) => self.frame = Some(frame),
            Err(e) => log::warn!("animation loop not started: {e:?}"),
        }
    }
}

#[wasm_bindgen]
impl CityscapeApp {
    /// Returns whether music is now playing.
    pub fn toggle_music(&mut self) -> bool {
        self.state.borrow_mut().toggle_music()
    }

    /// Returns the new theme, `"dark"` or `"light"`.
    pub fn toggle_theme(&mut self) -> String {
        self.state.borrow_mut().toggle_theme().as_str().to_string()
    }

    pub fn is_music_playing(&self) -> bool {
        self.state.borrow().controls.is_music_playing()
    }

    pub fn theme(&self) -> String {
        self.state.borrow().controls.theme().as_str().to_string()
    }

    /// Card-style fade-in for content the page adds later.
    pub fn animate_element(&mut self, el: HtmlElement, delay_ms: f64) {
        self.state.borrow_mut().ui.animate(&el, delay_ms);
    }

    /// Rebuild the scene for the container's current size.
    pub fn resize(&mut self) {
        self.state.borrow_mut().resize();
    }

    /// Stop the frame loop, music, timers and listeners. Preferences are kept.
    pub fn destroy(&mut self) {
        self.frame = None;
        self.listeners.clear();
        let mut s = self.state.borrow_mut();
        s.ui.stop();
        s.controls.shutdown();
        s.view = View::Absent;
        log::info!("cityscape app destroyed");
    }
}

impl Drop for CityscapeApp {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentBackend;
    use crate::prefs::{MemoryStore, MusicPref};

    #[test]
    fn fallback_body_font_is_capped() {
        let sponsors = CARDS.iter().find(|c| c.is_sponsors()).expect("sponsors card");
        let style = fallback_body_style(sponsors);
        assert!(style.contains("font-size:14px"), "{style}");
        assert!(style.contains("font-weight:bold"), "{style}");

        let about = &CARDS[0];
        let style = fallback_body_style(about);
        assert!(style.contains("font-size:14px") && style.contains("font-weight:normal"), "{style}");
    }

    #[test]
    fn shutdown_keeps_the_stored_preference() {
        let mut controls = Controls::init(MemoryStore::new(), SilentBackend);
        controls.toggle_music();
        controls.shutdown();
        assert!(!controls.is_music_playing());
        assert_eq!(controls.prefs().music(), MusicPref::On);
    }
}
