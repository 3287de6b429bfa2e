//! Scene imagery: acquisition, procedural placeholders and the texture cache.
//!
//! Every kind goes through the same ladder: preloaded image, rich procedural
//! placeholder, plain fill. Whatever succeeds first is cached; a kind where all
//! three fail is recorded missing and the scene draws its vector fallback.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use thiserror::Error;

use super::entity::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Sky,
    Building1,
    Building2,
    Building3,
    Billboard,
    Airplane,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Sky,
        AssetKind::Building1,
        AssetKind::Building2,
        AssetKind::Building3,
        AssetKind::Billboard,
        AssetKind::Airplane,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AssetKind::Sky => "sky",
            AssetKind::Building1 => "building1",
            AssetKind::Building2 => "building2",
            AssetKind::Building3 => "building3",
            AssetKind::Billboard => "billboard",
            AssetKind::Airplane => "airplane",
        }
    }

    /// Nominal texture size in pixels.
    pub fn size(self) -> (u32, u32) {
        match self {
            AssetKind::Sky => (1200, 600),
            AssetKind::Building1 => (300, 500),
            AssetKind::Building2 => (300, 400),
            AssetKind::Building3 => (300, 300),
            AssetKind::Billboard => (250, 200),
            AssetKind::Airplane => (200, 100),
        }
    }

    /// Texture used by parallax layer `layer` (0 = farthest).
    pub fn building(layer: usize) -> Option<AssetKind> {
        match layer {
            0 => Some(AssetKind::Building1),
            1 => Some(AssetKind::Building2),
            2 => Some(AssetKind::Building3),
            _ => None,
        }
    }

    /// DOM id of an optional preloaded `<img>`.
    pub fn element_id(self) -> String {
        format!("asset-{}", self.key())
    }

    fn base_color(self) -> Rgb {
        match self {
            AssetKind::Sky => Rgb::hex(0x001133),
            AssetKind::Building1 => Rgb::hex(0x335577),
            AssetKind::Building2 => Rgb::hex(0x446688),
            AssetKind::Building3 => Rgb::hex(0x557799),
            AssetKind::Billboard => Rgb::hex(0xaa6644),
            AssetKind::Airplane => Rgb::hex(0xeeeeee),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const MAX_RASTER_PIXELS: u64 = 4096 * 4096;

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("raster {width}x{height} has no pixels")]
    Empty { width: u32, height: u32 },
    #[error("raster {width}x{height} exceeds the pixel limit")]
    TooLarge { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no preloaded image for {0}")]
    NotPreloaded(AssetKind),
    #[error("preloaded image for {0} is not decoded yet")]
    NotDecoded(AssetKind),
    #[error("texture upload for {kind} failed: {reason}")]
    Upload { kind: AssetKind, reason: String },
    #[error(transparent)]
    Raster(#[from] RasterError),
}

// --- Raster ---------------------------------------------------------------------

/// RGBA8 pixel buffer with a handful of blending primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Transparent raster.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }
        if width as u64 * height as u64 > MAX_RASTER_PIXELS {
            return Err(RasterError::TooLarge { width, height });
        }
        Ok(Self { width, height, data: vec![0; width as usize * height as usize * 4] })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    fn blend(&mut self, x: u32, y: u32, c: Rgb, alpha: f64) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let px = &mut self.data[i..i + 4];
        let mix = |dst: u8, src: u8| (src as f64 * a + dst as f64 * (1.0 - a)).round() as u8;
        px[0] = mix(px[0], c.0);
        px[1] = mix(px[1], c.1);
        px[2] = mix(px[2], c.2);
        px[3] = ((a + px[3] as f64 / 255.0 * (1.0 - a)) * 255.0).round() as u8;
    }

    /// Clip a float span to pixel indices.
    fn span(start: f64, len: f64, limit: u32) -> (u32, u32) {
        let a = start.floor().max(0.0).min(limit as f64) as u32;
        let b = (start + len).ceil().max(0.0).min(limit as f64) as u32;
        (a, b)
    }

    pub fn fill(&mut self, c: Rgb) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[c.0, c.1, c.2, 255]);
        }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, c: Rgb, alpha: f64) {
        let (x0, x1) = Self::span(x, w, self.width);
        let (y0, y1) = Self::span(y, h, self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, c, alpha);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, line: f64, c: Rgb) {
        let half = line / 2.0;
        self.fill_rect(x - half, y - half, w + line, line, c, 1.0);
        self.fill_rect(x - half, y + h - half, w + line, line, c, 1.0);
        self.fill_rect(x - half, y + half, line, h - line, c, 1.0);
        self.fill_rect(x + w - half, y + half, line, h - line, c, 1.0);
    }

    pub fn fill_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, c: Rgb, alpha: f64) {
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let (x0, x1) = Self::span(cx - rx, rx * 2.0, self.width);
        let (y0, y1) = Self::span(cy - ry, ry * 2.0, self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = (px as f64 + 0.5 - cx) / rx;
                let dy = (py as f64 + 0.5 - cy) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    self.blend(px, py, c, alpha);
                }
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, c: Rgb, alpha: f64) {
        self.fill_ellipse(cx, cy, r, r, c, alpha);
    }

    /// Ring of light fading from `alpha` at `inner` to zero at `outer`.
    pub fn glow(&mut self, cx: f64, cy: f64, inner: f64, outer: f64, c: Rgb, alpha: f64) {
        if outer <= inner {
            return;
        }
        let (x0, x1) = Self::span(cx - outer, outer * 2.0, self.width);
        let (y0, y1) = Self::span(cy - outer, outer * 2.0, self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                let d = ((px as f64 + 0.5 - cx).powi(2) + (py as f64 + 0.5 - cy).powi(2)).sqrt();
                if d >= inner && d <= outer {
                    let t = 1.0 - (d - inner) / (outer - inner);
                    self.blend(px, py, c, alpha * t);
                }
            }
        }
    }
}

// --- Placeholder generators -------------------------------------------------------

/// Procedural stand-in drawn the way the real art looks.
pub fn placeholder<R: Rng>(kind: AssetKind, rng: &mut R) -> Result<Raster, RasterError> {
    let (w, h) = kind.size();
    let mut r = Raster::new(w, h)?;
    let (wf, hf) = (w as f64, h as f64);
    match kind {
        AssetKind::Sky => {
            r.fill(kind.base_color());
            for _ in 0..200 {
                let x = rng.gen_range(0.0..wf);
                let y = rng.gen_range(0.0..hf);
                let size = rng.gen_range(1.0..3.0);
                let brightness = rng.gen_range(0.2..1.0);
                r.fill_circle(x, y, size / 2.0, Rgb(255, 255, 255), brightness);
            }
            let (mx, my, mr) = (wf - 100.0, 100.0, 50.0);
            r.glow(mx, my, mr, mr * 2.0, Rgb::hex(0xaaaaff), 0.5);
            r.fill_circle(mx, my, mr, Rgb::hex(0xaaaaff), 1.0);
            r.fill_circle(mx - mr * 0.2, my - mr * 0.2, mr * 0.8, Rgb::hex(0xccccff), 1.0);
        }
        AssetKind::Building1 | AssetKind::Building2 | AssetKind::Building3 => {
            r.fill(kind.base_color());
            let (size, spacing) = (10.0, 20.0);
            let cols = ((wf / spacing) as u32).saturating_sub(1);
            let rows = ((hf / spacing) as u32).saturating_sub(1);
            for row in 0..rows {
                for col in 0..cols {
                    let lit = rng.gen_bool(0.7);
                    let c = if lit { Rgb::hex(0xffff88) } else { Rgb::hex(0x334455) };
                    r.fill_rect(
                        spacing * col as f64 + size,
                        spacing * row as f64 + size,
                        size,
                        size,
                        c,
                        0.9,
                    );
                }
            }
        }
        AssetKind::Billboard => {
            r.fill_rect(25.0, 20.0, wf - 50.0, hf - 80.0, Rgb::hex(0x222222), 1.0);
            r.fill_rect(wf / 2.0 - 10.0, hf - 60.0, 20.0, 60.0, Rgb::hex(0x555555), 1.0);
            r.fill_rect(wf / 2.0 - 40.0, hf - 80.0, 80.0, 10.0, Rgb::hex(0x555555), 1.0);
            r.stroke_rect(25.0, 20.0, wf - 50.0, hf - 80.0, 6.0, Rgb::hex(0x777777));
            r.stroke_rect(35.0, 30.0, wf - 70.0, hf - 100.0, 2.0, Rgb::hex(0x555555));
        }
        AssetKind::Airplane => {
            let (pw, ph) = (wf * 0.6, hf * 0.4);
            let (px, py) = (wf * 0.2, hf * 0.3);
            r.fill_ellipse(px + pw * 0.3, py + ph * 0.5, pw * 0.3, ph * 0.5, Rgb::hex(0xeeeeee), 1.0);
            r.fill_rect(px + pw * 0.25, py + ph * 0.2, pw * 0.3, ph * 0.3, Rgb::hex(0xdddddd), 1.0);
            r.fill_rect(px + pw * 0.6, py + ph * 0.2, pw * 0.15, ph * 0.2, Rgb::hex(0xdddddd), 1.0);
            r.fill_rect(px + pw * 0.6, py, pw * 0.1, ph * 0.4, Rgb::hex(0xdddddd), 1.0);
            for i in 0..3 {
                r.fill_circle(px + pw * (0.2 + 0.1 * i as f64), py + ph * 0.4, 3.0, Rgb::hex(0x88ccff), 1.0);
            }
        }
    }
    Ok(r)
}

/// Last-resort stand-in: the kind's base colour, airplane kept transparent
/// except for a flat body.
pub fn plain(kind: AssetKind) -> Result<Raster, RasterError> {
    let (w, h) = kind.size();
    let mut r = Raster::new(w, h)?;
    match kind {
        AssetKind::Airplane => {
            let (wf, hf) = (w as f64, h as f64);
            r.fill_rect(wf * 0.2, hf * 0.4, wf * 0.6, hf * 0.2, kind.base_color(), 1.0);
        }
        _ => r.fill(kind.base_color()),
    }
    Ok(r)
}

// --- Acquisition and cache -------------------------------------------------------

/// Turns images into drawable textures. The browser implementation lives in
/// `render`; [`RasterTextures`] keeps them as plain rasters.
pub trait TextureFactory {
    type Texture;

    /// Primary source (preloaded art).
    fn load(&mut self, kind: AssetKind) -> Result<Self::Texture, AssetError>;
    fn from_raster(&mut self, kind: AssetKind, raster: &Raster) -> Result<Self::Texture, AssetError>;
}

/// Headless factory: nothing is preloaded, placeholders stay in memory.
#[derive(Debug, Default)]
pub struct RasterTextures;

impl TextureFactory for RasterTextures {
    type Texture = Raster;

    fn load(&mut self, kind: AssetKind) -> Result<Raster, AssetError> {
        Err(AssetError::NotPreloaded(kind))
    }

    fn from_raster(&mut self, _kind: AssetKind, raster: &Raster) -> Result<Raster, AssetError> {
        Ok(raster.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Loaded,
    Placeholder,
    Plain,
    Missing,
}

/// Which kinds have a texture; all the scene builder needs to know.
pub trait TextureLookup {
    fn has(&self, kind: AssetKind) -> bool;
}

pub struct AssetCache<T> {
    slots: HashMap<AssetKind, (AssetOrigin, Option<T>)>,
}

impl<T> AssetCache<T> {
    /// Cache with every kind missing.
    pub fn missing() -> Self {
        let slots = AssetKind::ALL.iter().map(|k| (*k, (AssetOrigin::Missing, None))).collect();
        Self { slots }
    }

    pub fn acquire<F, R>(factory: &mut F, rng: &mut R) -> Self
    where
        F: TextureFactory<Texture = T>,
        R: Rng,
    {
        let mut cache = Self::missing();
        for kind in AssetKind::ALL {
            let slot = Self::acquire_one(factory, kind, rng);
            log::debug!("asset {kind}: {:?}", slot.0);
            cache.slots.insert(kind, slot);
        }
        cache
    }

    fn acquire_one<F, R>(factory: &mut F, kind: AssetKind, rng: &mut R) -> (AssetOrigin, Option<T>)
    where
        F: TextureFactory<Texture = T>,
        R: Rng,
    {
        match factory.load(kind) {
            Ok(t) => return (AssetOrigin::Loaded, Some(t)),
            Err(e) => log::debug!("{e}; generating placeholder"),
        }
        let rich = placeholder(kind, rng)
            .map_err(AssetError::from)
            .and_then(|r| factory.from_raster(kind, &r));
        match rich {
            Ok(t) => return (AssetOrigin::Placeholder, Some(t)),
            Err(e) => log::warn!("placeholder for {kind} failed: {e}"),
        }
        let flat = plain(kind)
            .map_err(AssetError::from)
            .and_then(|r| factory.from_raster(kind, &r));
        match flat {
            Ok(t) => (AssetOrigin::Plain, Some(t)),
            Err(e) => {
                log::warn!("{kind} unavailable, using vector fallback: {e}");
                (AssetOrigin::Missing, None)
            }
        }
    }

    pub fn origin(&self, kind: AssetKind) -> AssetOrigin {
        self.slots.get(&kind).map_or(AssetOrigin::Missing, |s| s.0)
    }

    pub fn get(&self, kind: AssetKind) -> Option<&T> {
        self.slots.get(&kind).and_then(|s| s.1.as_ref())
    }
}

impl<T> TextureLookup for AssetCache<T> {
    fn has(&self, kind: AssetKind) -> bool {
        self.get(kind).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn raster_rejects_empty_and_huge() {
        assert_eq!(Raster::new(0, 4), Err(RasterError::Empty { width: 0, height: 4 }));
        assert!(matches!(Raster::new(100_000, 100_000), Err(RasterError::TooLarge { .. })));
    }

    #[test]
    fn fill_rect_clips_and_blends() {
        let mut r = Raster::new(4, 4).unwrap();
        r.fill(Rgb(0, 0, 0));
        r.fill_rect(-2.0, -2.0, 4.0, 4.0, Rgb(255, 255, 255), 0.5);
        assert_eq!(r.pixel(0, 0), Some([128, 128, 128, 255]));
        assert_eq!(r.pixel(3, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn sky_placeholder_has_moon() {
        let mut rng = SmallRng::seed_from_u64(1);
        let sky = placeholder(AssetKind::Sky, &mut rng).unwrap();
        assert_eq!((sky.width(), sky.height()), (1200, 600));
        // Highlight sits up-left of the moon centre.
        assert_eq!(sky.pixel(1090, 90), Some([0xcc, 0xcc, 0xff, 255]));
    }

    struct Flaky {
        fail_rasters_for: Option<AssetKind>,
    }

    impl TextureFactory for Flaky {
        type Texture = (u32, u32);
        fn load(&mut self, kind: AssetKind) -> Result<(u32, u32), AssetError> {
            Err(AssetError::NotPreloaded(kind))
        }
        fn from_raster(&mut self, kind: AssetKind, r: &Raster) -> Result<(u32, u32), AssetError> {
            if Some(kind) == self.fail_rasters_for {
                return Err(AssetError::Upload { kind, reason: "context lost".into() });
            }
            Ok((r.width(), r.height()))
        }
    }

    #[test]
    fn cache_walks_the_fallback_ladder() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut f = Flaky { fail_rasters_for: Some(AssetKind::Airplane) };
        let cache = AssetCache::acquire(&mut f, &mut rng);
        assert_eq!(cache.origin(AssetKind::Sky), AssetOrigin::Placeholder);
        assert_eq!(cache.get(AssetKind::Building2), Some(&(300, 400)));
        assert_eq!(cache.origin(AssetKind::Airplane), AssetOrigin::Missing);
        assert!(!cache.has(AssetKind::Airplane));
    }
}
