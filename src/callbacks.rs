//! Browser callbacks owned by Rust handles.
//!
//! Every handle here cancels or unregisters its JS callback when dropped, so
//! whoever owns the handle decides how long the callback lives. Nothing uses
//! `Closure::forget`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{EventTarget, window};

fn no_window() -> JsValue {
    JsValue::from_str("no window")
}

fn clamp_delay(ms: f64) -> i32 {
    ms.clamp(0.0, i32::MAX as f64) as i32
}

/// One-shot `setTimeout`.
pub struct Timeout {
    id: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Timeout {
    pub fn new<F: FnOnce() + 'static>(delay_ms: f64, f: F) -> Result<Self, JsValue> {
        let win = window().ok_or_else(no_window)?;
        let closure: Closure<dyn FnMut()> = Closure::once(f);
        let id = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            clamp_delay(delay_ms),
        )?;
        Ok(Self { id, _closure: closure })
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(w) = window() {
            w.clear_timeout_with_handle(self.id);
        }
    }
}

/// Fixed-period `setInterval`.
pub struct Interval {
    id: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn new<F: FnMut() + 'static>(period_ms: f64, f: F) -> Result<Self, JsValue> {
        let win = window().ok_or_else(no_window)?;
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
        let id = win.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            clamp_delay(period_ms),
        )?;
        Ok(Self { id, _closure: closure })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        if let Some(w) = window() {
            w.clear_interval_with_handle(self.id);
        }
    }
}

type SelfRef<T> = Rc<RefCell<Option<Closure<T>>>>;

/// Repeating task whose next delay is chosen by the task itself
/// (`step` returns the delay in ms until it runs again).
pub struct JitterLoop {
    pending: Rc<Cell<Option<i32>>>,
    closure: SelfRef<dyn FnMut()>,
}

impl JitterLoop {
    pub fn start<F>(first_delay_ms: f64, mut step: F) -> Result<Self, JsValue>
    where
        F: FnMut() -> f64 + 'static,
    {
        let win = window().ok_or_else(no_window)?;
        let pending = Rc::new(Cell::new(None));
        let closure: SelfRef<dyn FnMut()> = Rc::new(RefCell::new(None));

        let pending_cb = pending.clone();
        let me = Rc::downgrade(&closure);
        *closure.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            pending_cb.set(None);
            let delay = step();
            let (Some(me), Some(w)) = (me.upgrade(), window()) else {
                return;
            };
            let slot = me.borrow();
            if let Some(cb) = slot.as_ref() {
                match w.set_timeout_with_callback_and_timeout_and_arguments_0(
                    cb.as_ref().unchecked_ref(),
                    clamp_delay(delay),
                ) {
                    Ok(id) => pending_cb.set(Some(id)),
                    Err(e) => log::warn!("jitter loop could not reschedule: {e:?}"),
                }
            }
        }) as Box<dyn FnMut()>));

        let id = {
            let slot = closure.borrow();
            let cb = slot.as_ref().ok_or_else(|| JsValue::from_str("closure missing"))?;
            win.set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                clamp_delay(first_delay_ms),
            )?
        };
        pending.set(Some(id));
        Ok(Self { pending, closure })
    }
}

impl Drop for JitterLoop {
    fn drop(&mut self) {
        if let (Some(id), Some(w)) = (self.pending.take(), window()) {
            w.clear_timeout_with_handle(id);
        }
        self.closure.borrow_mut().take();
    }
}

/// `requestAnimationFrame` loop; the callback receives the frame timestamp.
pub struct AnimationLoop {
    pending: Rc<Cell<Option<i32>>>,
    closure: SelfRef<dyn FnMut(f64)>,
}

impl AnimationLoop {
    pub fn start<F>(mut frame: F) -> Result<Self, JsValue>
    where
        F: FnMut(f64) + 'static,
    {
        let win = window().ok_or_else(no_window)?;
        let pending = Rc::new(Cell::new(None));
        let closure: SelfRef<dyn FnMut(f64)> = Rc::new(RefCell::new(None));

        let pending_cb = pending.clone();
        let me = Rc::downgrade(&closure);
        *closure.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
            pending_cb.set(None);
            frame(ts);
            let (Some(me), Some(w)) = (me.upgrade(), window()) else {
                return;
            };
            let slot = me.borrow();
            if let Some(cb) = slot.as_ref() {
                if let Ok(id) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    pending_cb.set(Some(id));
                }
            }
        }) as Box<dyn FnMut(f64)>));

        let id = {
            let slot = closure.borrow();
            let cb = slot.as_ref().ok_or_else(|| JsValue::from_str("closure missing"))?;
            win.request_animation_frame(cb.as_ref().unchecked_ref())?
        };
        pending.set(Some(id));
        Ok(Self { pending, closure })
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        if let (Some(id), Some(w)) = (self.pending.take(), window()) {
            w.cancel_animation_frame(id).ok();
        }
        self.closure.borrow_mut().take();
    }
}

/// `addEventListener` registration, removed on drop.
pub struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    pub fn new<F>(target: &EventTarget, kind: &'static str, f: F) -> Result<Self, JsValue>
    where
        F: FnMut(web_sys::Event) + 'static,
    {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(web_sys::Event)>);
        target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        Ok(Self { target: target.clone(), kind, closure })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref())
            .ok();
    }
}
