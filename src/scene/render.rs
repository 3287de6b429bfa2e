//! Canvas 2D drawing of a [`Scene`], plus the browser texture and text
//! measuring backends.

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlImageElement, ImageData};

use super::Scene;
use super::assets::{AssetCache, AssetError, AssetKind, Raster, TextureFactory};
use super::entity::{
    Airplane, Billboard, BillboardLayout, Building, BuildingStyle, Direction, Entity, Flyby, PlaneShape,
    Rect, Rgb, Sky, Street, TextLine, Vehicle,
};
use super::layout::{LayoutError, TextMeasure};

pub type CanvasAssets = AssetCache<HtmlCanvasElement>;

pub fn font(px: f64, bold: bool) -> String {
    let weight = if bold { "bold " } else { "" };
    format!("{weight}{px}px 'Press Start 2P', monospace")
}

fn offscreen(document: &Document, width: u32, height: u32) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;
    Ok((canvas, ctx))
}

/// Textures as offscreen canvases. Preloaded art comes from `<img id="asset-*">`.
pub struct CanvasTextures {
    document: Document,
}

impl CanvasTextures {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl TextureFactory for CanvasTextures {
    type Texture = HtmlCanvasElement;

    fn load(&mut self, kind: AssetKind) -> Result<HtmlCanvasElement, AssetError> {
        let img: HtmlImageElement = self
            .document
            .get_element_by_id(&kind.element_id())
            .and_then(|el| el.dyn_into().ok())
            .ok_or(AssetError::NotPreloaded(kind))?;
        if !img.complete() || img.natural_width() == 0 {
            return Err(AssetError::NotDecoded(kind));
        }
        let upload = |e: JsValue| AssetError::Upload { kind, reason: format!("{e:?}") };
        let (canvas, ctx) = offscreen(&self.document, img.natural_width(), img.natural_height()).map_err(upload)?;
        ctx.draw_image_with_html_image_element(&img, 0.0, 0.0).map_err(upload)?;
        Ok(canvas)
    }

    fn from_raster(&mut self, kind: AssetKind, raster: &Raster) -> Result<HtmlCanvasElement, AssetError> {
        let upload = |e: JsValue| AssetError::Upload { kind, reason: format!("{e:?}") };
        let (canvas, ctx) = offscreen(&self.document, raster.width(), raster.height()).map_err(upload)?;
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(raster.data()), raster.width(), raster.height())
            .map_err(upload)?;
        ctx.put_image_data(&data, 0.0, 0.0).map_err(upload)?;
        Ok(canvas)
    }
}

/// Measures with the live context and the scene font.
pub struct CanvasMeasure {
    ctx: CanvasRenderingContext2d,
}

impl CanvasMeasure {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for CanvasMeasure {
    fn measure(&self, text: &str, font_px: f64, bold: bool) -> Result<f64, LayoutError> {
        self.ctx.set_font(&font(font_px, bold));
        self.ctx
            .measure_text(text)
            .map(|m| m.width())
            .map_err(|e| LayoutError::Measure(format!("{e:?}")))
    }
}

// --- Frame ---------------------------------------------------------------------

/// Draw every entity in arena order. A failing entity is skipped and the
/// rest of the frame is still drawn; the first error is returned.
pub fn draw_scene(ctx: &CanvasRenderingContext2d, scene: &Scene, textures: &CanvasAssets) -> Result<(), JsValue> {
    let vp = scene.viewport();
    ctx.clear_rect(0.0, 0.0, vp.width, vp.height);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let mut first_err = None;
    for (i, e) in scene.entities().iter().enumerate() {
        let drawn = match e {
            Entity::Sky(sky) => draw_sky(ctx, *sky, vp.width, vp.height, textures),
            Entity::Building(b) => draw_building(ctx, b, textures),
            Entity::Street(s) => {
                draw_street(ctx, *s, vp.width, vp.height);
                Ok(())
            }
            Entity::Vehicle(v) => {
                draw_vehicle(ctx, v);
                Ok(())
            }
            Entity::Billboard(b) => draw_billboard(ctx, b),
            Entity::Airplane(a) => draw_airplane(ctx, a, textures),
            Entity::Flyby(f) => draw_flyby(ctx, f, textures),
            Entity::Caption(c) => draw_text(ctx, &c.line),
        };
        if let Err(err) = drawn {
            log::debug!("entity {i} not drawn: {err:?}");
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Run `draw` between `save` and `restore`; the state is restored even when
/// `draw` fails.
pub fn with_saved_state<F>(ctx: &CanvasRenderingContext2d, draw: F) -> Result<(), JsValue>
where
    F: FnOnce(&CanvasRenderingContext2d) -> Result<(), JsValue>,
{
    ctx.save();
    let res = draw(ctx);
    ctx.restore();
    res
}

fn fill(ctx: &CanvasRenderingContext2d, c: Rgb, r: Rect) {
    ctx.set_fill_style_str(&c.css());
    ctx.fill_rect(r.x, r.y, r.w, r.h);
}

fn circle(ctx: &CanvasRenderingContext2d, cx: f64, cy: f64, r: f64) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU)?;
    ctx.fill();
    Ok(())
}

fn line(ctx: &CanvasRenderingContext2d, x1: f64, y1: f64, x2: f64, y2: f64) {
    ctx.begin_path();
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y2);
    ctx.stroke();
}

fn draw_text(ctx: &CanvasRenderingContext2d, l: &TextLine) -> Result<(), JsValue> {
    ctx.set_font(&font(l.font_px, l.bold));
    ctx.set_fill_style_str(&l.color.css());
    ctx.fill_text(&l.text, l.x, l.y)
}

fn draw_sky(ctx: &CanvasRenderingContext2d, sky: Sky, w: f64, h: f64, textures: &CanvasAssets) -> Result<(), JsValue> {
    match (sky, textures.get(AssetKind::Sky)) {
        (Sky::Textured, Some(tex)) => ctx.draw_image_with_html_canvas_element_and_dw_and_dh(tex, 0.0, 0.0, w, h),
        _ => {
            fill(ctx, Rgb::hex(0x001133), Rect::new(0.0, 0.0, w, h));
            Ok(())
        }
    }
}

fn draw_building(ctx: &CanvasRenderingContext2d, b: &Building, textures: &CanvasAssets) -> Result<(), JsValue> {
    let r = b.rect;
    match &b.style {
        BuildingStyle::Textured { shadow } => {
            let tex = AssetKind::building(b.layer as usize).and_then(|k| textures.get(k));
            match tex {
                Some(tex) => ctx.draw_image_with_html_canvas_element_and_dw_and_dh(tex, r.x, r.y, r.w, r.h)?,
                None => fill(ctx, b.tint, r),
            }
            with_saved_state(ctx, |ctx| {
                ctx.set_global_composite_operation("multiply")?;
                fill(ctx, b.tint, r);
                Ok(())
            })?;
            if *shadow {
                ctx.set_fill_style_str("rgba(0,0,0,0.3)");
                ctx.fill_rect(r.x + r.w * 0.85, r.y, r.w * 0.15, r.h);
            }
        }
        BuildingStyle::Simplified { windows, roof } => {
            fill(ctx, b.tint, r);
            fill(ctx, b.tint.shifted(-20, -20, -20), Rect::new(r.x + r.w * 0.8, r.y, r.w * 0.2, r.h));
            if let Some(top) = roof {
                fill(ctx, b.tint, *top);
            }
            ctx.set_fill_style_str("rgba(255,255,136,0.6)");
            for win in windows {
                ctx.fill_rect(win.x, win.y, win.w, win.h);
            }
        }
    }
    Ok(())
}

fn draw_street(ctx: &CanvasRenderingContext2d, street: Street, w: f64, h: f64) {
    fill(ctx, Rgb::hex(0x222222), Rect::new(0.0, h - 60.0, w, 60.0));
    if street == Street::Detailed {
        fill(ctx, Rgb::hex(0x444444), Rect::new(0.0, h - 60.0, w, 3.0));
    }
    ctx.set_fill_style_str("#ffcc00");
    let mut x = 0.0;
    while x < w {
        ctx.fill_rect(x, h - 33.0, 40.0, 6.0);
        x += 80.0;
    }
    if street == Street::Plain {
        return;
    }
    fill(ctx, Rgb::hex(0x555555), Rect::new(0.0, h - 60.0, w, 10.0));
    ctx.set_stroke_style_str("#666666");
    ctx.set_line_width(1.0);
    let mut x = 100.0;
    while x < w {
        fill(ctx, Rgb::hex(0x333333), Rect::new(x, h - 20.0, 30.0, 10.0));
        ctx.stroke_rect(x + 2.0, h - 18.0, 26.0, 6.0);
        x += 300.0;
    }
}

fn draw_vehicle(ctx: &CanvasRenderingContext2d, v: &Vehicle) {
    let s = &v.style;
    fill(ctx, s.color, Rect::new(v.x, v.y - s.height / 2.0, s.width, s.height));
    let (roof_w, roof_h) = (s.width * 0.6, s.height * 0.5);
    let roof_x = v.x + s.width * 0.2;
    let roof_y = v.y - s.height / 2.0 - roof_h / 4.0;
    fill(ctx, s.color, Rect::new(roof_x, roof_y, roof_w, roof_h));
    let win_x = roof_x + if v.direction == Direction::Right { roof_w * 0.1 } else { roof_w * 0.5 };
    fill(ctx, Rgb::hex(0x88ccff), Rect::new(win_x, roof_y + roof_h * 0.15, roof_w * 0.4, roof_h * 0.7));

    let wheel_y = v.y + s.height / 2.0 - 2.0;
    for fx in [0.2, 0.8] {
        let cx = v.x + s.width * fx;
        ctx.set_fill_style_str("#000000");
        circle(ctx, cx, wheel_y, s.wheel).ok();
        ctx.set_fill_style_str("#cccccc");
        circle(ctx, cx, wheel_y, s.wheel / 2.0).ok();
    }
}

/// Vertical gradient in 0x222222 + i*0x000101 steps.
fn gradient_panel(ctx: &CanvasRenderingContext2d, p: Rect, step: f64) {
    let mut i = 0.0;
    while i < p.h {
        let g = (0x22 as f64 + i).min(255.0) as u8;
        fill(ctx, Rgb(0x22, g, g), Rect::new(p.x, p.y + i, p.w, step.min(p.h - i)));
        i += step;
    }
}

fn draw_billboard(ctx: &CanvasRenderingContext2d, b: &Billboard) -> Result<(), JsValue> {
    with_saved_state(ctx, |ctx| {
        ctx.set_global_alpha(b.alpha);
        ctx.translate(b.sway, 0.0)?;
        let p = b.panel;
        match &b.layout {
            BillboardLayout::Rich { support } => {
                if let Some(pole) = support {
                    fill(ctx, Rgb::hex(0x444444), *pole);
                }
                gradient_panel(ctx, p, 4.0);
                ctx.set_line_width(4.0);
                ctx.set_stroke_style_str("#777777");
                ctx.stroke_rect(p.x, p.y, p.w, p.h);
                ctx.set_line_width(2.0);
                ctx.set_stroke_style_str("#555555");
                ctx.stroke_rect(p.x + 8.0, p.y + 8.0, p.w - 16.0, p.h - 16.0);
                ctx.set_stroke_style_str("rgba(170,170,170,0.5)");
                line(ctx, p.x + 12.0, p.y + p.h - 4.0, p.x + p.w - 12.0, p.y + p.h - 4.0);
            }
            BillboardLayout::Simplified { pole, beam, lights } => {
                fill(ctx, Rgb::hex(0x555555), *pole);
                fill(ctx, Rgb::hex(0x555555), *beam);
                gradient_panel(ctx, p, 5.0);
                ctx.set_line_width(4.0);
                ctx.set_stroke_style_str("#666666");
                ctx.stroke_rect(p.x, p.y, p.w, p.h);
                ctx.set_line_width(2.0);
                ctx.set_stroke_style_str("#555555");
                ctx.stroke_rect(p.x + 10.0, p.y + 10.0, p.w - 20.0, p.h - 20.0);
                for l in lights {
                    fill(ctx, Rgb::hex(0x333333), *l);
                }
            }
            BillboardLayout::Card => {
                fill(ctx, Rgb::hex(0x222222), p);
                ctx.set_line_width(4.0);
                ctx.set_stroke_style_str("#ff3366");
                ctx.stroke_rect(p.x, p.y, p.w, p.h);
            }
        }
        for l in b.lines() {
            draw_text(ctx, l)?;
        }
        Ok(())
    })
}

/// Blocky plane with its nose at `x + dir*40`.
fn vector_plane(ctx: &CanvasRenderingContext2d, x: f64, y: f64, dir: f64) -> Result<(), JsValue> {
    let (w, h) = (80.0, 30.0);
    with_saved_state(ctx, |ctx| {
        ctx.translate(x, y)?;
        ctx.scale(dir, 1.0)?;
        let ox = -w / 2.0;
        fill(ctx, Rgb::hex(0xdddddd), Rect::new(ox, 0.0, w * 0.7, h * 0.4));
        fill(ctx, Rgb::hex(0x88ccff), Rect::new(ox + w * 0.5, -h * 0.1, w * 0.15, h * 0.3));
        fill(ctx, Rgb::hex(0xdddddd), Rect::new(ox - w * 0.05, 0.0, w * 0.15, h * 0.3));
        fill(ctx, Rgb::hex(0xdddddd), Rect::new(ox, -h * 0.3, w * 0.1, h * 0.4));
        fill(ctx, Rgb::hex(0xcccccc), Rect::new(ox + w * 0.2, h * 0.2, w * 0.5, h * 0.1));
        ctx.set_fill_style_str("#444444");
        circle(ctx, ox + w * 0.75, h * 0.2, h * 0.12)
    })
}

/// Airplane texture at half scale, mirrored for left-bound planes.
fn sprite_plane(ctx: &CanvasRenderingContext2d, tex: &HtmlCanvasElement, x: f64, y: f64, dir: f64) -> Result<(), JsValue> {
    let (w, h) = (tex.width() as f64 * 0.5, tex.height() as f64 * 0.5);
    with_saved_state(ctx, |ctx| {
        ctx.translate(x, y)?;
        ctx.scale(dir, 1.0)?;
        ctx.draw_image_with_html_canvas_element_and_dw_and_dh(tex, -w / 2.0, -h / 2.0, w, h)
    })
}

fn draw_airplane(ctx: &CanvasRenderingContext2d, a: &Airplane, textures: &CanvasAssets) -> Result<(), JsValue> {
    let dir = a.direction.sign();
    let banner = a.banner_rect();
    let ((rx1, ry1), (rx2, ry2)) = a.rope();
    ctx.set_stroke_style_str("#ffffff");
    ctx.set_line_width(2.0);
    line(ctx, rx1, ry1, rx2, ry2);

    let color = Rgb::hex(a.sponsor.color);
    let (cx, cy) = banner.center();
    match (a.shape, textures.get(AssetKind::Airplane)) {
        (PlaneShape::Sprite, Some(tex)) => {
            fill(ctx, Rgb(255, 255, 255), Rect::centered(cx, cy, banner.w + 4.0, banner.h + 4.0));
            fill(ctx, color, banner);
            ctx.set_font("16px monospace");
            ctx.set_fill_style_str("#000000");
            let lines: Vec<&str> = a.sponsor.banner_text.lines().collect();
            let lh = 16.0 + 5.0;
            let top = cy - lh * (lines.len().saturating_sub(1)) as f64 / 2.0;
            for (i, text) in lines.iter().enumerate() {
                ctx.fill_text(text, cx, top + lh * i as f64)?;
            }
            sprite_plane(ctx, tex, a.x, a.y, dir)
        }
        _ => {
            fill(ctx, color, banner);
            ctx.set_font(&font(12.0, true));
            ctx.set_fill_style_str("#ffffff");
            ctx.fill_text(a.sponsor.name, cx, cy)?;
            vector_plane(ctx, a.x, a.y, dir)
        }
    }
}

fn draw_flyby(ctx: &CanvasRenderingContext2d, f: &Flyby, textures: &CanvasAssets) -> Result<(), JsValue> {
    match textures.get(AssetKind::Airplane) {
        Some(tex) => sprite_plane(ctx, tex, f.x, f.y, 1.0),
        None => vector_plane(ctx, f.x, f.y, 1.0),
    }
}
