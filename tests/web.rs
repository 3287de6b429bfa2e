// Browser-only checks; run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use vibejam_cityscape::prefs::{KvStore, LocalStorage, Preferences, Theme};
use vibejam_cityscape::scene::render::with_saved_state;
use vibejam_cityscape::theme::{LIGHT_CLASS, apply_theme};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trips_the_theme() {
    let store = LocalStorage::open().expect("localStorage");
    let mut prefs = Preferences::new(store);
    prefs.set_theme(Theme::Light);
    assert_eq!(prefs.theme(), Theme::Light);
    prefs.clear();
    assert_eq!(prefs.theme(), Theme::Dark);
    assert_eq!(prefs.store().get_item("theme").ok().flatten(), None);
}

#[wasm_bindgen_test]
fn light_theme_sets_body_class() {
    let body = web_sys::window().and_then(|w| w.document()).and_then(|d| d.body()).expect("body");
    apply_theme(&body, Theme::Light);
    assert!(body.class_list().contains(LIGHT_CLASS));
    apply_theme(&body, Theme::Dark);
    assert!(!body.class_list().contains(LIGHT_CLASS));
}

#[wasm_bindgen_test]
fn failed_draw_still_restores_the_context() {
    let document = web_sys::window().and_then(|w| w.document()).expect("document");
    let canvas: HtmlCanvasElement = document.create_element("canvas").expect("canvas").dyn_into().expect("canvas");
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .expect("2d context")
        .dyn_into()
        .expect("2d context");
    let res = with_saved_state(&ctx, |ctx| {
        ctx.set_global_alpha(0.7);
        ctx.translate(10.0, 0.0)?;
        Err(JsValue::from_str("text failed"))
    });
    assert!(res.is_err());
    assert_eq!(ctx.global_alpha(), 1.0);
}
