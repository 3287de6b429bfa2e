//! The animated cityscape.
//!
//! A [`Scene`] is an arena of [`Entity`] values built by a pipeline of stages
//! (sky, skyline, street, vehicles, billboards, sponsors). Each fallible stage
//! returns a `Result`; an error swaps in that stage's simpler variant and is
//! logged, so building a scene never fails. Arena order is draw order.

pub mod assets;
pub mod entity;
pub mod layout;
pub mod render;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::{CARDS, SPONSORS, Sponsor};
use assets::{AssetKind, TextureLookup};
use entity::{
    Airplane, BannerSpec, Billboard, BillboardLayout, Building, BuildingStyle, Caption, Direction,
    Entity, Flyby, PlaneShape, Rect, Rgb, Sky, Street, TextLine, Vehicle, VehicleStyle,
};
use layout::{LayoutError, TextMeasure};

pub const MOBILE_BREAKPOINT: f64 = 768.0;

const BRIGHT_PALETTE: [u32; 6] = [0xff3366, 0x33ccff, 0x66ff33, 0xffcc00, 0xff6633, 0x9933ff];
const GREY_PALETTE: [u32; 4] = [0x666666, 0x888888, 0x444444, 0x555555];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_mobile(&self) -> bool {
        self.width < MOBILE_BREAKPOINT
    }

    fn check(&self, config: &SceneConfig) -> Result<(), StageError> {
        let usable = self.width.is_finite()
            && self.height.is_finite()
            && self.width >= config.min_width
            && self.height >= config.min_height;
        if usable { Ok(()) } else { Err(StageError::Viewport { width: self.width, height: self.height }) }
    }
}

/// Tunables of the scene. Defaults reproduce the jam page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct SceneConfig {
    pub vehicle_count: usize,
    /// Pixels per tick: `min + U[0, spread)`.
    pub vehicle_speed_min: f64,
    pub vehicle_speed_spread: f64,
    /// Pixels per tick.
    pub airplane_speed: f64,
    pub flyby_interval_ms: f64,
    /// Pixels per second.
    pub flyby_speed: f64,
    pub flicker_chance: f64,
    pub flicker_ms: f64,
    pub flicker_alpha: f64,
    pub sway_px: f64,
    pub sway_ms: f64,
    /// Smaller viewports get the static scene.
    pub min_width: f64,
    pub min_height: f64,
    /// Fixed seed for reproducible scenes.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            vehicle_count: 4,
            vehicle_speed_min: 1.0,
            vehicle_speed_spread: 1.5,
            airplane_speed: 3.0,
            flyby_interval_ms: 8000.0,
            flyby_speed: 150.0,
            flicker_chance: 0.005,
            flicker_ms: 50.0,
            flicker_alpha: 0.7,
            sway_px: 10.0,
            sway_ms: 3000.0,
            min_width: 240.0,
            min_height: 240.0,
            seed: None,
        }
    }
}

#[cfg(feature = "serde_json")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scene config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene config `{field}` must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

#[cfg(feature = "serde_json")]
impl From<ConfigError> for wasm_bindgen::JsValue {
    fn from(e: ConfigError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

#[cfg(feature = "serde_json")]
impl SceneConfig {
    /// Missing fields keep their defaults. Speeds and periods must be positive.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        let positive = [
            ("vehicle_speed_min", config.vehicle_speed_min),
            ("airplane_speed", config.airplane_speed),
            ("flyby_interval_ms", config.flyby_interval_ms),
            ("flyby_speed", config.flyby_speed),
            ("sway_ms", config.sway_ms),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("viewport {width}x{height} is unusable")]
    Viewport { width: f64, height: f64 },
    #[error("texture {0} unavailable")]
    MissingTexture(AssetKind),
    #[error("viewport too short for {0}")]
    TooShort(&'static str),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Run a stage; on error log it and take the fallback.
fn staged<T>(stage: &str, attempt: Result<T, StageError>, fallback: impl FnOnce() -> T) -> T {
    attempt.unwrap_or_else(|e| {
        log::warn!("{stage} stage failed ({e}); using fallback");
        fallback()
    })
}

pub struct Scene {
    viewport: Viewport,
    config: SceneConfig,
    entities: Vec<Entity>,
    rng: SmallRng,
    is_static: bool,
    /// Next flyby spawn; `None` until the first tick after (re)build.
    next_flyby_ms: Option<f64>,
    started_ms: Option<f64>,
}

impl Scene {
    pub fn build(
        viewport: Viewport,
        config: SceneConfig,
        assets: &dyn TextureLookup,
        measure: &dyn TextMeasure,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let mut scene = Self {
            viewport,
            config,
            entities: Vec::new(),
            rng,
            is_static: false,
            next_flyby_ms: None,
            started_ms: None,
        };
        scene.populate(assets, measure, None);
        scene
    }

    /// Fill the arena for the current viewport. `kept` carries the sky and
    /// vehicles across a resize.
    fn populate(
        &mut self,
        assets: &dyn TextureLookup,
        measure: &dyn TextMeasure,
        kept: Option<(Sky, Vec<Vehicle>)>,
    ) {
        self.entities.clear();
        self.next_flyby_ms = None;
        if let Err(e) = self.viewport.check(&self.config) {
            log::warn!("{e}; showing static scene");
            self.populate_static();
            return;
        }
        let was_static = std::mem::replace(&mut self.is_static, false);
        let vp = self.viewport;
        let kept = kept.filter(|_| !was_static);

        let sky = match &kept {
            Some((sky, _)) => *sky,
            None => staged("sky", sky_stage(assets), || Sky::Plain),
        };
        self.entities.push(Entity::Sky(sky));

        let rng = &mut self.rng;
        let skyline = match skyline_stage(vp, assets, rng) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("skyline stage failed ({e}); using fallback");
                simplified_skyline(vp, rng)
            }
        };
        self.entities.extend(skyline.into_iter().map(Entity::Building));

        let street = staged("street", street_stage(vp), || Street::Plain);
        self.entities.push(Entity::Street(street));

        let vehicles = match kept {
            Some((_, mut vehicles)) => {
                for v in &mut vehicles {
                    v.y = lane_y(v.direction, vp);
                }
                vehicles
            }
            None => spawn_vehicles(vp, &self.config, &mut self.rng),
        };
        self.entities.extend(vehicles.into_iter().map(Entity::Vehicle));

        let billboards = staged("billboards", billboard_stage(vp, measure), || {
            CARDS
                .iter()
                .enumerate()
                .map(|(i, card)| layout::simplified_billboard(card, i, vp))
                .collect()
        });
        self.entities.extend(billboards.into_iter().map(Entity::Billboard));

        let speed = self.config.airplane_speed;
        let planes = staged("sponsors", sponsor_stage(vp, speed, assets), || {
            sponsor_planes(vp, speed, PlaneShape::Vector)
        });
        self.entities.extend(planes.into_iter().map(Entity::Airplane));
        log::info!("scene built for {}x{} ({} entities)", vp.width, vp.height, self.entities.len());
    }

    fn populate_static(&mut self) {
        self.is_static = true;
        let vp = self.viewport;
        let (w, h) = (vp.width.max(0.0), vp.height.max(0.0));
        let vp = Viewport::new(if w.is_finite() { w } else { 0.0 }, if h.is_finite() { h } else { 0.0 });
        self.entities.push(Entity::Sky(Sky::Plain));
        self.entities.push(Entity::Caption(Caption {
            line: TextLine {
                text: "CITYSCAPE VIEW".to_string(),
                x: vp.width / 2.0,
                y: vp.height / 2.0 - 100.0,
                font_px: 24.0,
                bold: true,
                color: layout::TITLE_COLOR,
                link: None,
                width: layout::EstimatedMeasure::width("CITYSCAPE VIEW", 24.0),
            },
        }));
        let n = CARDS.len();
        for (i, card) in CARDS.iter().enumerate() {
            self.entities.push(Entity::Billboard(layout::static_card(card, i, n, vp)));
        }
        let banner = vector_banner();
        let [bolt, rabbit] = &SPONSORS;
        self.entities.push(Entity::Airplane(Airplane {
            x: 0.0,
            y: vp.height * 0.15,
            direction: Direction::Right,
            speed: 2.0,
            wrap_margin: 50.0,
            shape: PlaneShape::Vector,
            banner,
            sponsor: bolt,
        }));
        self.entities.push(Entity::Airplane(Airplane {
            x: vp.width,
            y: vp.height * 0.3,
            direction: Direction::Left,
            speed: 1.6,
            wrap_margin: 50.0,
            shape: PlaneShape::Vector,
            banner,
            sponsor: rabbit,
        }));
    }

    /// Rebuild everything that depends on the viewport size. Returns false,
    /// leaving the scene untouched, when the size has not changed.
    pub fn resize(&mut self, viewport: Viewport, assets: &dyn TextureLookup, measure: &dyn TextMeasure) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        let mut sky = Sky::Plain;
        let mut vehicles = Vec::new();
        for e in self.entities.drain(..).filter(|e| !e.is_resolution_dependent()) {
            match e {
                Entity::Sky(s) => sky = s,
                Entity::Vehicle(v) => vehicles.push(v),
                _ => {}
            }
        }
        self.populate(assets, measure, Some((sky, vehicles)));
        true
    }

    /// Advance one frame.
    pub fn tick(&mut self, now_ms: f64) {
        let started = *self.started_ms.get_or_insert(now_ms);
        let w = self.viewport.width;
        let cfg = &self.config;
        let sway = sway_offset(now_ms - started, cfg.sway_px, cfg.sway_ms);
        let chance = cfg.flicker_chance.clamp(0.0, 1.0);

        for e in &mut self.entities {
            match e {
                Entity::Vehicle(v) => v.advance(w),
                Entity::Airplane(a) => a.advance(w),
                Entity::Billboard(b) => {
                    match b.flicker_until {
                        Some(until) if now_ms >= until => {
                            b.alpha = 1.0;
                            b.flicker_until = None;
                        }
                        Some(_) => {}
                        None if self.rng.gen_bool(chance) => {
                            b.alpha = cfg.flicker_alpha;
                            b.flicker_until = Some(now_ms + cfg.flicker_ms);
                        }
                        None => {}
                    }
                    if matches!(b.layout, BillboardLayout::Simplified { .. }) {
                        b.sway = sway;
                    }
                }
                _ => {}
            }
        }
        self.entities.retain_mut(|e| match e {
            Entity::Flyby(f) => f.advance(now_ms),
            _ => true,
        });
        if !self.is_static {
            self.spawn_flybys(now_ms);
        }
    }

    fn spawn_flybys(&mut self, now_ms: f64) {
        let interval = self.config.flyby_interval_ms.max(1.0);
        let next = *self.next_flyby_ms.get_or_insert(now_ms + interval);
        if now_ms < next {
            return;
        }
        self.entities.push(Entity::Flyby(Flyby::new(self.viewport.width, self.config.flyby_speed, now_ms)));
        // One spawn per tick; a stalled tab does not burst.
        self.next_flyby_ms = Some((next + interval).max(now_ms + 1.0));
    }

    /// URL of the handle or banner under `(x, y)`, topmost first.
    pub fn link_at(&self, x: f64, y: f64) -> Option<&str> {
        self.entities.iter().rev().find_map(|e| match e {
            Entity::Airplane(a) if a.banner_rect().contains(x, y) => Some(a.sponsor.url),
            Entity::Billboard(b) => b
                .lines()
                .filter(|l| l.hit_rect().contains(x - b.sway, y))
                .find_map(|l| l.link.as_deref()),
            _ => None,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn sky(&self) -> Option<Sky> {
        self.entities.iter().find_map(|e| match e {
            Entity::Sky(s) => Some(*s),
            _ => None,
        })
    }

    pub fn street(&self) -> Option<Street> {
        self.entities.iter().find_map(|e| match e {
            Entity::Street(s) => Some(*s),
            _ => None,
        })
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Building(b) => Some(b),
            _ => None,
        })
    }

    /// Distinct parallax layers present.
    pub fn layer_count(&self) -> usize {
        let mut layers: Vec<u8> = self.buildings().map(|b| b.layer).collect();
        layers.sort_unstable();
        layers.dedup();
        layers.len()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Vehicle(v) => Some(v),
            _ => None,
        })
    }

    pub fn billboards(&self) -> impl Iterator<Item = &Billboard> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Billboard(b) => Some(b),
            _ => None,
        })
    }

    pub fn airplanes(&self) -> impl Iterator<Item = &Airplane> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Airplane(a) => Some(a),
            _ => None,
        })
    }

    pub fn flybys(&self) -> impl Iterator<Item = &Flyby> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Flyby(f) => Some(f),
            _ => None,
        })
    }
}

// --- Stages --------------------------------------------------------------------

fn sky_stage(assets: &dyn TextureLookup) -> Result<Sky, StageError> {
    if assets.has(AssetKind::Sky) {
        Ok(Sky::Textured)
    } else {
        Err(StageError::MissingTexture(AssetKind::Sky))
    }
}

fn skyline_stage(vp: Viewport, assets: &dyn TextureLookup, rng: &mut SmallRng) -> Result<Vec<Building>, StageError> {
    let mut out = Vec::new();
    for layer in 0..3usize {
        let kind = AssetKind::building(layer).ok_or(StageError::MissingTexture(AssetKind::Building3))?;
        if !assets.has(kind) {
            return Err(StageError::MissingTexture(kind));
        }
        let (tw, th) = kind.size();
        let lf = layer as f64;
        let count = 8 + 3 * layer;
        let scale = 0.7 - 0.15 * lf;
        let bottom = vp.height - 100.0 + 20.0 * lf;
        let base = Rgb((150.0 - 30.0 * lf) as u8, (150.0 - 30.0 * lf) as u8, (170.0 - 20.0 * lf) as u8);
        for i in 0..count {
            let w = tw as f64 * scale * rng.gen_range(0.9..1.2);
            let h = th as f64 * scale * rng.gen_range(0.6..0.9);
            let x = vp.width / count as f64 * i as f64;
            let jitter = rng.gen_range(-20..=20);
            out.push(Building {
                layer: layer as u8,
                rect: Rect::new(x, bottom - h, w, h),
                tint: base.shifted(jitter, jitter, jitter + 10),
                style: BuildingStyle::Textured { shadow: i > 0 && i < count - 1 },
            });
        }
    }
    Ok(out)
}

/// Flat-colour skyline with sparse windows and the odd rooftop box.
fn simplified_skyline(vp: Viewport, rng: &mut SmallRng) -> Vec<Building> {
    let mut out = Vec::new();
    for layer in 0..3u8 {
        let lf = layer as f64;
        let count = 10 + 3 * layer as usize;
        let bottom = vp.height - 80.0 + 20.0 * lf;
        let slot = vp.width / count as f64;
        let (min_h, max_h) = (40.0 + 8.0 * lf, 120.0 - 20.0 * lf);
        let base = Rgb((70.0 - 15.0 * lf) as u8, (80.0 - 15.0 * lf) as u8, (120.0 - 15.0 * lf) as u8);
        for i in 0..count {
            let w = slot * rng.gen_range(0.9..1.1);
            let x = slot * i as f64 * rng.gen_range(0.9..1.1);
            let h = rng.gen_range(min_h..max_h);
            let v = rng.gen_range(-10..=10);
            let rect = Rect::new(x, bottom - h, w, h);
            let roof = rng
                .gen_bool(0.3)
                .then(|| Rect::new(x + w * 0.4, rect.y - h * 0.1, w * 0.2, h * 0.1));

            let (ww, wh) = ((w / 15.0).max(3.0), (h / 20.0).max(4.0));
            let cols = ((w / (ww * 2.5)) as usize).max(2);
            let rows = ((h / (wh * 2.5)) as usize).max(2);
            let mut windows = Vec::new();
            for row in 0..rows {
                for col in 0..cols {
                    if rng.gen_bool(0.5) {
                        let wx = x + col as f64 * (w / cols as f64) + w / (cols as f64 * 2.0) - ww / 2.0;
                        let wy = rect.y + row as f64 * (h / rows as f64) + h / (rows as f64 * 2.0) - wh / 2.0;
                        windows.push(Rect::new(wx, wy, ww, wh));
                    }
                }
            }
            out.push(Building {
                layer,
                rect,
                tint: base.shifted(v, v, v),
                style: BuildingStyle::Simplified { windows, roof },
            });
        }
    }
    out
}

fn street_stage(vp: Viewport) -> Result<Street, StageError> {
    if vp.height < 120.0 {
        return Err(StageError::TooShort("street details"));
    }
    Ok(Street::Detailed)
}

pub fn lane_y(direction: Direction, vp: Viewport) -> f64 {
    match direction {
        Direction::Right => vp.height - 40.0,
        Direction::Left => vp.height - 20.0,
    }
}

fn spawn_vehicles(vp: Viewport, cfg: &SceneConfig, rng: &mut SmallRng) -> Vec<Vehicle> {
    (0..cfg.vehicle_count)
        .map(|i| {
            let direction = if i % 2 == 0 { Direction::Left } else { Direction::Right };
            let palette: &[u32] = if rng.gen_bool(0.5) { &BRIGHT_PALETTE } else { &GREY_PALETTE };
            let color = Rgb::hex(palette[rng.gen_range(0..palette.len())]);
            let style = VehicleStyle { color, width: 50.0, height: 25.0, wheel: 6.0 };
            let x = match direction {
                Direction::Right => -style.width,
                Direction::Left => vp.width + style.width,
            };
            Vehicle {
                x,
                y: lane_y(direction, vp),
                direction,
                speed: cfg.vehicle_speed_min + rng.r#gen::<f64>() * cfg.vehicle_speed_spread.max(0.0),
                style,
            }
        })
        .collect()
}

fn billboard_stage(vp: Viewport, measure: &dyn TextMeasure) -> Result<Vec<Billboard>, StageError> {
    layout::billboard_slots(vp, &CARDS)
        .into_iter()
        .map(|slot| layout::rich_billboard(slot, vp, measure).map_err(StageError::from))
        .collect()
}

fn sponsor_stage(vp: Viewport, speed: f64, assets: &dyn TextureLookup) -> Result<Vec<Airplane>, StageError> {
    if !assets.has(AssetKind::Airplane) {
        return Err(StageError::MissingTexture(AssetKind::Airplane));
    }
    Ok(sponsor_planes(vp, speed, PlaneShape::Sprite))
}

fn vector_banner() -> BannerSpec {
    BannerSpec { trail: 120.0, drop: 0.0, width: 150.0, height: 30.0 }
}

pub fn sponsor_planes(vp: Viewport, speed: f64, shape: PlaneShape) -> Vec<Airplane> {
    let banner = match shape {
        PlaneShape::Sprite => BannerSpec { trail: 200.0, drop: 20.0, width: 250.0, height: 80.0 },
        PlaneShape::Vector => vector_banner(),
    };
    let (bolt_y, rabbit_y) = if vp.is_mobile() { (480.0, 520.0) } else { (420.0, 460.0) };
    // Keep planes and banners in the sky, above the skyline.
    let clamp_y = |y: f64| y.clamp(50.0, (vp.height * 0.5).max(50.0));
    let plane = |x: f64, y: f64, direction: Direction, sponsor: &'static Sponsor| Airplane {
        x,
        y: clamp_y(y),
        direction,
        speed,
        wrap_margin: 200.0,
        shape,
        banner,
        sponsor,
    };
    let [bolt, rabbit] = &SPONSORS;
    vec![
        plane(100.0, vp.height - bolt_y, Direction::Right, bolt),
        plane(vp.width - 100.0, vp.height - rabbit_y, Direction::Left, rabbit),
    ]
}

/// Sine-eased yoyo: 0 to `amplitude` over `leg_ms`, then back.
pub fn sway_offset(elapsed_ms: f64, amplitude: f64, leg_ms: f64) -> f64 {
    if leg_ms <= 0.0 || !elapsed_ms.is_finite() {
        return 0.0;
    }
    let t = (elapsed_ms.max(0.0) % (2.0 * leg_ms)) / leg_ms;
    let leg = if t <= 1.0 { t } else { 2.0 - t };
    amplitude * (1.0 - (std::f64::consts::PI * leg).cos()) / 2.0
}
