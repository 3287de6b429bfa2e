//! Scene entities. One tagged variant per kind, stored in the scene arena.

use crate::{Card, Sponsor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(v: u32) -> Self {
        Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    pub fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }

    pub fn css_alpha(self, a: f64) -> String {
        format!("rgba({},{},{},{a})", self.0, self.1, self.2)
    }

    /// Per-channel offset, clamped to 0..=255.
    pub fn shifted(self, dr: i32, dg: i32, db: i32) -> Self {
        let c = |v: u8, d: i32| (v as i32 + d).clamp(0, 255) as u8;
        Rgb(c(self.0, dr), c(self.1, dg), c(self.2, db))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

// --- Sky / skyline / street ---------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sky {
    /// Stretched sky texture (stars + moon).
    Textured,
    /// Flat night fill.
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildingStyle {
    /// Building texture for this layer, scaled into `rect` and tinted.
    Textured { shadow: bool },
    /// Drawn from primitives; window rects are absolute.
    Simplified {
        windows: Vec<Rect>,
        roof: Option<Rect>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub layer: u8,
    pub rect: Rect,
    pub tint: Rgb,
    pub style: BuildingStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Street {
    /// Sidewalk, dashed centre line and drains.
    Detailed,
    /// Road fill and centre line only.
    Plain,
}

// --- Vehicles ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStyle {
    pub color: Rgb,
    pub width: f64,
    pub height: f64,
    pub wheel: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    /// Left edge of the body.
    pub x: f64,
    /// Lane centre line.
    pub y: f64,
    pub direction: Direction,
    /// Pixels per tick.
    pub speed: f64,
    pub style: VehicleStyle,
}

impl Vehicle {
    pub fn advance(&mut self, viewport_w: f64) {
        self.x += self.speed * self.direction.sign();
        let w = self.style.width;
        match self.direction {
            Direction::Right if self.x > viewport_w + w => self.x = -w,
            Direction::Left if self.x < -w => self.x = viewport_w + w,
            _ => {}
        }
    }
}

// --- Airplanes -------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneShape {
    /// Airplane texture at half scale, mirrored when flying left.
    Sprite,
    /// Blocky vector plane drawn from rectangles.
    Vector,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BannerSpec {
    /// Distance from plane centre to banner centre, against the flight direction.
    pub trail: f64,
    pub drop: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Airplane {
    pub x: f64,
    pub y: f64,
    pub direction: Direction,
    pub speed: f64,
    pub wrap_margin: f64,
    pub shape: PlaneShape,
    pub banner: BannerSpec,
    pub sponsor: &'static Sponsor,
}

impl Airplane {
    pub fn advance(&mut self, viewport_w: f64) {
        self.x += self.speed * self.direction.sign();
        let m = self.wrap_margin;
        match self.direction {
            Direction::Right if self.x > viewport_w + m => self.x = -m,
            Direction::Left if self.x < -m => self.x = viewport_w + m,
            _ => {}
        }
    }

    /// Banner rectangle, trailing the plane.
    pub fn banner_rect(&self) -> Rect {
        let cx = self.x - self.direction.sign() * self.banner.trail;
        Rect::centered(cx, self.y + self.banner.drop, self.banner.width, self.banner.height)
    }

    /// Tow line from the plane's tail to the near edge of the banner.
    pub fn rope(&self) -> ((f64, f64), (f64, f64)) {
        let s = self.direction.sign();
        let banner = self.banner_rect();
        let (bcx, bcy) = banner.center();
        ((self.x - s * 30.0, self.y + 10.0), (bcx + s * banner.w / 2.0, bcy))
    }
}

/// Unbannered plane crossing the sky once.
#[derive(Debug, Clone, PartialEq)]
pub struct Flyby {
    pub x: f64,
    pub y: f64,
    pub start_x: f64,
    pub end_x: f64,
    pub started_ms: f64,
    /// Time to cross from `start_x` to `end_x`.
    pub duration_ms: f64,
}

impl Flyby {
    /// Linear crossing of `viewport_w + 200` px lasting `viewport_w / speed` seconds.
    pub fn new(viewport_w: f64, speed: f64, now_ms: f64) -> Self {
        Self {
            x: -100.0,
            y: 100.0,
            start_x: -100.0,
            end_x: viewport_w + 100.0,
            started_ms: now_ms,
            duration_ms: viewport_w / speed * 1000.0,
        }
    }

    /// Move to the position for `now_ms`; false once the crossing time is up.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let elapsed = (now_ms - self.started_ms).max(0.0);
        // Non-finite or zero durations end the crossing at once.
        let t = if self.duration_ms > 0.0 && self.duration_ms.is_finite() {
            (elapsed / self.duration_ms).min(1.0)
        } else {
            1.0
        };
        self.x = self.start_x + (self.end_x - self.start_x) * t;
        t < 1.0
    }
}

// --- Billboards ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Centre of the line.
    pub x: f64,
    pub y: f64,
    pub font_px: f64,
    pub bold: bool,
    pub color: Rgb,
    pub link: Option<String>,
    /// Hit box for links, centred on (x, y).
    pub width: f64,
}

impl TextLine {
    pub fn hit_rect(&self) -> Rect {
        Rect::centered(self.x, self.y, self.width, self.font_px * 1.4)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BillboardLayout {
    /// Measured layout with gradient panel, metal frame and pole.
    Rich { support: Option<Rect> },
    /// Primitive panel with pole, cross beam and spotlights; sways gently.
    Simplified { pole: Rect, beam: Rect, lights: [Rect; 2] },
    /// Flat card used by the static fallback scene.
    Card,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Billboard {
    pub card: &'static Card,
    pub layout: BillboardLayout,
    pub panel: Rect,
    pub title: Vec<TextLine>,
    pub content: Vec<TextLine>,
    pub alpha: f64,
    pub flicker_until: Option<f64>,
    /// Horizontal sway offset (simplified layout only).
    pub sway: f64,
}

impl Billboard {
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.title.iter().chain(self.content.iter())
    }
}

/// Heading of the static fallback scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub line: TextLine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Sky(Sky),
    Building(Building),
    Street(Street),
    Vehicle(Vehicle),
    Billboard(Billboard),
    Airplane(Airplane),
    Flyby(Flyby),
    Caption(Caption),
}

impl Entity {
    /// Buildings, street, billboards and planes depend on the viewport size.
    pub fn is_resolution_dependent(&self) -> bool {
        !matches!(self, Entity::Sky(_) | Entity::Vehicle(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_hex_and_shift() {
        assert_eq!(Rgb::hex(0xff3366), Rgb(255, 51, 102));
        assert_eq!(Rgb(250, 10, 100).shifted(20, -20, 0), Rgb(255, 0, 100));
        assert_eq!(Rgb(1, 2, 3).css(), "rgb(1,2,3)");
    }

    #[test]
    fn flyby_stops_at_far_edge() {
        // 300 px wide: 500 px to cover in 2 s.
        let mut f = Flyby::new(300.0, 150.0, 0.0);
        assert_eq!(f.duration_ms, 2000.0);
        assert!(f.advance(1000.0));
        assert_eq!(f.x, 150.0);
        assert!(!f.advance(10_000.0));
        assert_eq!(f.x, 400.0);
    }

    #[test]
    fn flyby_with_unusable_speed_retires_at_once() {
        for speed in [0.0, -5.0, f64::NAN] {
            let mut f = Flyby::new(1200.0, speed, 0.0);
            assert!(!f.advance(16.0), "speed {speed}");
        }
    }

    #[test]
    fn only_sky_and_vehicles_survive_a_resize() {
        assert!(!Entity::Sky(Sky::Plain).is_resolution_dependent());
        assert!(Entity::Street(Street::Plain).is_resolution_dependent());
    }
}
