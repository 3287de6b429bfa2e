// Scene pipeline behaviour under a headless texture cache.
// These tests are native-friendly and avoid wasm/browser APIs.

use vibejam_cityscape::SPONSORS;
use vibejam_cityscape::scene::assets::{AssetCache, AssetKind, Raster, RasterTextures, TextureLookup};
use vibejam_cityscape::scene::entity::{
    Airplane, BannerSpec, BillboardLayout, BuildingStyle, Direction, PlaneShape, Rgb, Sky, Street, Vehicle,
    VehicleStyle,
};
use vibejam_cityscape::scene::layout::{EstimatedMeasure, LayoutError, TextMeasure};
use vibejam_cityscape::scene::{Scene, SceneConfig, Viewport, lane_y};

use rand::SeedableRng;
use rand::rngs::SmallRng;

const DESKTOP: Viewport = Viewport::new(1200.0, 600.0);

fn config() -> SceneConfig {
    SceneConfig { seed: Some(42), ..SceneConfig::default() }
}

fn full_assets() -> AssetCache<Raster> {
    AssetCache::acquire(&mut RasterTextures, &mut SmallRng::seed_from_u64(3))
}

/// Lookup that only has the listed textures.
struct Only(Vec<AssetKind>);

impl TextureLookup for Only {
    fn has(&self, kind: AssetKind) -> bool {
        self.0.contains(&kind)
    }
}

fn all_but(missing: AssetKind) -> Only {
    Only(AssetKind::ALL.into_iter().filter(|k| *k != missing).collect())
}

struct BrokenMeasure;

impl TextMeasure for BrokenMeasure {
    fn measure(&self, _text: &str, _font_px: f64, _bold: bool) -> Result<f64, LayoutError> {
        Err(LayoutError::Measure("no font".into()))
    }
}

// --- Motion ---

#[test]
fn vehicles_wrap_at_both_edges() {
    let style = VehicleStyle { color: Rgb(255, 0, 0), width: 50.0, height: 25.0, wheel: 6.0 };
    let mut right = Vehicle { x: 1247.0, y: 560.0, direction: Direction::Right, speed: 2.0, style };
    right.advance(1200.0);
    assert_eq!(right.x, 1249.0);
    right.advance(1200.0);
    assert_eq!(right.x, -50.0);

    let mut left = Vehicle { x: -49.0, y: 580.0, direction: Direction::Left, speed: 2.0, style };
    left.advance(1200.0);
    assert_eq!(left.x, 1250.0);
}

#[test]
fn lanes_sit_above_the_bottom_edge() {
    assert_eq!(lane_y(Direction::Right, DESKTOP), 560.0);
    assert_eq!(lane_y(Direction::Left, DESKTOP), 580.0);
}

#[test]
fn banner_trails_the_plane() {
    let banner = BannerSpec { trail: 200.0, drop: 20.0, width: 250.0, height: 80.0 };
    let mut plane = Airplane {
        x: 500.0,
        y: 150.0,
        direction: Direction::Right,
        speed: 3.0,
        wrap_margin: 200.0,
        shape: PlaneShape::Sprite,
        banner,
        sponsor: &SPONSORS[0],
    };
    assert_eq!(plane.banner_rect().center(), (300.0, 170.0));
    plane.direction = Direction::Left;
    assert_eq!(plane.banner_rect().center(), (700.0, 170.0));
    let (tail, near_edge) = plane.rope();
    assert_eq!(tail, (530.0, 160.0));
    assert_eq!(near_edge, (575.0, 170.0));
}

// --- Fallbacks ---

#[test]
fn missing_airplane_texture_uses_vector_planes() {
    let scene = Scene::build(DESKTOP, config(), &all_but(AssetKind::Airplane), &EstimatedMeasure);
    assert_eq!(scene.airplanes().count(), 2);
    assert!(scene.airplanes().all(|a| a.shape == PlaneShape::Vector && a.banner.trail == 120.0));
    assert_eq!(scene.sky(), Some(Sky::Textured));
}

#[test]
fn missing_sky_texture_uses_plain_sky() {
    let scene = Scene::build(DESKTOP, config(), &all_but(AssetKind::Sky), &EstimatedMeasure);
    assert_eq!(scene.sky(), Some(Sky::Plain));
    assert_eq!(scene.layer_count(), 3);
    assert_eq!(scene.billboards().count(), 3);
}

#[test]
fn missing_building_texture_simplifies_the_whole_skyline() {
    let scene = Scene::build(DESKTOP, config(), &all_but(AssetKind::Building2), &EstimatedMeasure);
    assert_eq!(scene.layer_count(), 3);
    assert!(scene.buildings().all(|b| matches!(b.style, BuildingStyle::Simplified { .. })));
}

#[test]
fn nothing_loaded_still_draws_everything() {
    let scene = Scene::build(DESKTOP, config(), &Only(Vec::new()), &EstimatedMeasure);
    assert!(!scene.is_static());
    assert_eq!(scene.sky(), Some(Sky::Plain));
    assert_eq!(scene.street(), Some(Street::Detailed));
    assert_eq!(scene.vehicles().count(), 4);
    assert_eq!(scene.billboards().count(), 3);
    assert_eq!(scene.airplanes().count(), 2);
}

#[test]
fn broken_text_measure_gives_simplified_billboards() {
    let scene = Scene::build(DESKTOP, config(), &full_assets(), &BrokenMeasure);
    assert_eq!(scene.billboards().count(), 3);
    assert!(scene.billboards().all(|b| matches!(b.layout, BillboardLayout::Simplified { .. })));
}

#[test]
fn short_viewport_gets_plain_street() {
    let cfg = SceneConfig { min_height: 50.0, ..config() };
    let scene = Scene::build(Viewport::new(1200.0, 100.0), cfg, &full_assets(), &EstimatedMeasure);
    assert_eq!(scene.street(), Some(Street::Plain));
}

// --- Layout ---

#[test]
fn mobile_drops_the_sponsors_card() {
    let scene = Scene::build(Viewport::new(400.0, 700.0), config(), &full_assets(), &EstimatedMeasure);
    assert_eq!(scene.billboards().count(), 2);
    assert!(scene.billboards().all(|b| !b.card.is_sponsors()));
    assert_eq!(scene.airplanes().count(), 2);
}

#[test]
fn desktop_orders_sponsors_last() {
    let scene = Scene::build(DESKTOP, config(), &full_assets(), &EstimatedMeasure);
    let last = scene.billboards().last().expect("billboards");
    assert!(last.card.is_sponsors());
    let xs: Vec<f64> = scene.billboards().map(|b| b.panel.center().0).collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
}

#[test]
fn degenerate_viewport_shows_static_scene() {
    let assets = full_assets();
    let mut scene = Scene::build(Viewport::new(100.0, 100.0), config(), &assets, &EstimatedMeasure);
    assert!(scene.is_static());
    assert_eq!(scene.billboards().count(), 3);
    assert!(scene.billboards().all(|b| b.layout == BillboardLayout::Card));
    assert_eq!(scene.vehicles().count(), 0);
    let planes: Vec<(f64, f64)> = scene.airplanes().map(|a| (a.speed, a.wrap_margin)).collect();
    assert_eq!(planes, vec![(2.0, 50.0), (1.6, 50.0)]);

    for i in 0..=30 {
        scene.tick(i as f64 * 1000.0);
    }
    assert_eq!(scene.flybys().count(), 0);

    scene.resize(DESKTOP, &assets, &EstimatedMeasure);
    assert!(!scene.is_static());
    assert_eq!(scene.vehicles().count(), 4);
}

#[test]
fn nan_viewport_does_not_panic() {
    let scene = Scene::build(Viewport::new(f64::NAN, f64::INFINITY), config(), &full_assets(), &EstimatedMeasure);
    assert!(scene.is_static());
}

// --- Animation ---

#[test]
fn flyby_spawns_on_schedule_and_leaves() {
    let mut scene = Scene::build(DESKTOP, config(), &full_assets(), &EstimatedMeasure);
    scene.tick(0.0);
    scene.tick(7999.0);
    assert_eq!(scene.flybys().count(), 0);
    scene.tick(8000.0);
    assert_eq!(scene.flybys().count(), 1);

    // Crossing lasts 1200 / 150 = 8 s.
    scene.tick(8000.0 + 4000.0);
    let f = scene.flybys().next().expect("flyby in flight");
    assert!((f.x - 600.0).abs() < 1e-9, "{}", f.x);
    scene.tick(8000.0 + 8000.0 + 1.0);
    assert!(scene.flybys().all(|f| f.started_ms > 8000.0));
}

#[test]
fn flicker_dims_then_restores() {
    let cfg = SceneConfig { flicker_chance: 1.0, ..config() };
    let mut scene = Scene::build(DESKTOP, cfg, &full_assets(), &EstimatedMeasure);
    scene.tick(0.0);
    assert!(scene.billboards().all(|b| b.alpha == 0.7));
    scene.tick(60.0);
    assert!(scene.billboards().all(|b| b.alpha == 1.0));
}

#[test]
fn static_planes_wrap_just_off_screen() {
    let mut scene = Scene::build(Viewport::new(200.0, 200.0), config(), &full_assets(), &EstimatedMeasure);
    for _ in 0..130 {
        scene.tick(0.0);
    }
    // Right-bound plane: 0 -> 252 after 126 ticks, wrapped to -50, then 4 more ticks.
    let bolt = scene.airplanes().next().expect("plane");
    assert_eq!(bolt.x, -42.0);
}

#[test]
fn zero_flyby_speed_does_not_pile_up() {
    let cfg = SceneConfig { flyby_speed: 0.0, ..config() };
    let mut scene = Scene::build(DESKTOP, cfg, &full_assets(), &EstimatedMeasure);
    for i in 0..10 {
        scene.tick(i as f64 * 8000.0);
    }
    assert!(scene.flybys().count() <= 1);
}

#[test]
fn resize_keeps_vehicles_and_drops_flybys() {
    let assets = full_assets();
    let mut scene = Scene::build(DESKTOP, config(), &assets, &EstimatedMeasure);
    scene.tick(0.0);
    scene.tick(8000.0);
    assert_eq!(scene.flybys().count(), 1);
    let before: Vec<f64> = scene.vehicles().map(|v| v.x).collect();

    let small = Viewport::new(800.0, 500.0);
    scene.resize(small, &assets, &EstimatedMeasure);
    assert_eq!(scene.flybys().count(), 0);
    let after: Vec<f64> = scene.vehicles().map(|v| v.x).collect();
    assert_eq!(before, after);
    assert!(scene.vehicles().all(|v| v.y == lane_y(v.direction, small)));
}

// --- Links ---

#[test]
fn clicking_a_handle_finds_its_profile() {
    let scene = Scene::build(DESKTOP, config(), &full_assets(), &EstimatedMeasure);
    let line = scene
        .billboards()
        .flat_map(|b| b.lines())
        .find(|l| l.link.is_some())
        .expect("a linked handle");
    let (x, y) = line.hit_rect().center();
    assert_eq!(scene.link_at(x, y), line.link.as_deref());
    assert_eq!(scene.link_at(-500.0, -500.0), None);
}

#[test]
fn clicking_a_banner_opens_the_sponsor() {
    let scene = Scene::build(DESKTOP, config(), &full_assets(), &EstimatedMeasure);
    for plane in scene.airplanes() {
        let (x, y) = plane.banner_rect().center();
        assert_eq!(scene.link_at(x, y), Some(plane.sponsor.url));
    }
}
