// End-to-end flow for the `vibejam-cityscape` crate: preferences, toggles and
// a headless scene. Native-friendly, avoids wasm/browser APIs.

use vibejam_cityscape::app::Controls;
use vibejam_cityscape::audio::{PlaybackState, SilentBackend};
use vibejam_cityscape::prefs::{MUSIC_KEY, MemoryStore, MusicPref, Preferences, THEME_KEY, Theme};
use vibejam_cityscape::scene::assets::{AssetCache, AssetKind, AssetOrigin, RasterTextures};
use vibejam_cityscape::scene::entity::{Sky, Street};
use vibejam_cityscape::scene::layout::EstimatedMeasure;
use vibejam_cityscape::scene::{Scene, SceneConfig, Viewport};

use rand::SeedableRng;
use rand::rngs::SmallRng;

fn seeded() -> SceneConfig {
    SceneConfig { seed: Some(7), ..SceneConfig::default() }
}

#[test]
fn fresh_visitor_gets_dark_and_silence() {
    let controls = Controls::init(MemoryStore::new(), SilentBackend);
    assert_eq!(controls.theme(), Theme::Dark);
    assert!(!controls.is_music_playing());
}

#[test]
fn toggles_persist() {
    let mut controls = Controls::init(MemoryStore::new(), SilentBackend);
    assert_eq!(controls.toggle_music(), PlaybackState::Playing);
    assert_eq!(controls.prefs().get(MUSIC_KEY, "off"), "on");
    assert_eq!(controls.toggle_theme(), Theme::Light);
    assert_eq!(controls.prefs().get(THEME_KEY, "dark"), "light");
    assert_eq!(controls.toggle_music(), PlaybackState::Stopped);
    assert_eq!(controls.prefs().music(), MusicPref::Off);
}

#[test]
fn stored_music_on_restarts_playback() {
    let mut prefs = Preferences::new(MemoryStore::new());
    prefs.set_music(MusicPref::On);
    prefs.set_theme(Theme::Light);
    let controls = Controls::init(prefs.into_store(), SilentBackend);
    assert!(controls.is_music_playing());
    assert_eq!(controls.theme(), Theme::Light);
}

#[test]
fn headless_scene_is_complete() {
    let mut rng = SmallRng::seed_from_u64(1);
    let assets = AssetCache::acquire(&mut RasterTextures, &mut rng);
    for kind in AssetKind::ALL {
        assert_eq!(assets.origin(kind), AssetOrigin::Placeholder, "{kind}");
    }

    let mut scene = Scene::build(Viewport::new(1200.0, 600.0), seeded(), &assets, &EstimatedMeasure);
    assert!(!scene.is_static());
    assert_eq!(scene.sky(), Some(Sky::Textured));
    assert_eq!(scene.layer_count(), 3);
    assert_eq!(scene.street(), Some(Street::Detailed));
    assert_eq!(scene.vehicles().count(), 4);
    assert_eq!(scene.billboards().count(), 3);
    assert_eq!(scene.airplanes().count(), 2);

    for i in 0..120 {
        scene.tick(i as f64 * 16.0);
    }
    assert_eq!(scene.vehicles().count(), 4);

    assert!(scene.resize(Viewport::new(800.0, 600.0), &assets, &EstimatedMeasure));
    assert_eq!(scene.viewport(), Viewport::new(800.0, 600.0));
    assert_eq!(scene.vehicles().count(), 4);
    assert_eq!(scene.layer_count(), 3);
    assert!(scene.buildings().all(|b| (0.0..800.0).contains(&b.rect.x)));

    let centres: Vec<f64> = scene.billboards().map(|b| b.panel.center().0).collect();
    assert_eq!(centres.len(), 3);
    for (i, cx) in centres.iter().enumerate() {
        let want = 800.0 * (i as f64 + 0.5) / 3.0;
        assert!((cx - want).abs() < 1e-9, "billboard {i} at {cx}, want {want}");
    }
    // Slot at h - 180, panel raised 170 above it.
    assert!(scene.billboards().all(|b| (b.panel.y - 250.0).abs() < 1e-9));

    let xs: Vec<(&str, f64)> = scene.airplanes().map(|a| (a.sponsor.name, a.x)).collect();
    assert_eq!(xs, vec![("bolt.new", 100.0), ("CodeRabbit", 700.0)]);

    // Same size again: nothing is rebuilt.
    let before: Vec<f64> = scene.buildings().map(|b| b.rect.w).collect();
    assert!(!scene.resize(Viewport::new(800.0, 600.0), &assets, &EstimatedMeasure));
    let after: Vec<f64> = scene.buildings().map(|b| b.rect.w).collect();
    assert_eq!(before, after);
}
