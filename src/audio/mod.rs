//! Ambient background music: a looping arpeggio over four ninth chords.
//!
//! [`MusicPlayer`] is the on/off state machine; the sound itself comes from an
//! [`AudioBackend`]. The browser backend ([`synth::WebSynth`]) renders through
//! Web Audio, tests plug in a recording fake.

pub mod arp;
pub mod synth;

use thiserror::Error;

use crate::prefs::{KvStore, MusicPref, Preferences};

pub use arp::{Arpeggiator, CHORDS, NOTES_PER_CYCLE, StepClock, Tempo};

pub const BPM: f64 = 130.0;
pub const MUSIC_ON_CLASS: &str = "music-on";

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio context unavailable: {0}")]
    Context(String),
    #[error("audio graph setup failed: {0}")]
    Graph(String),
    #[error("could not schedule the note loop: {0}")]
    Schedule(String),
}

impl AudioError {
    pub(crate) fn context(err: wasm_bindgen::JsValue) -> Self {
        AudioError::Context(format!("{err:?}"))
    }
    pub(crate) fn graph(err: wasm_bindgen::JsValue) -> Self {
        AudioError::Graph(format!("{err:?}"))
    }
}

/// Sound output seam.
pub trait AudioBackend {
    /// Resume the output if the browser suspended it (autoplay policy).
    fn resume(&mut self) -> Result<(), AudioError>;
    fn set_tempo(&mut self, bpm: f64);
    fn start_loop(&mut self) -> Result<(), AudioError>;
    fn stop_loop(&mut self);
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn resume(&mut self) -> Result<(), AudioError> {
        (**self).resume()
    }
    fn set_tempo(&mut self, bpm: f64) {
        (**self).set_tempo(bpm)
    }
    fn start_loop(&mut self) -> Result<(), AudioError> {
        (**self).start_loop()
    }
    fn stop_loop(&mut self) {
        (**self).stop_loop()
    }
}

/// Backend used when Web Audio cannot be created; keeps the toggle usable.
#[derive(Debug, Default)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
    fn set_tempo(&mut self, _bpm: f64) {}
    fn start_loop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
    fn stop_loop(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

pub struct MusicPlayer<B: AudioBackend> {
    backend: B,
    state: PlaybackState,
}

impl<B: AudioBackend> MusicPlayer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, state: PlaybackState::Stopped }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Resume output, set the tempo and start the note loop. The preference
    /// follows the user's intent even if the backend complains.
    pub fn start<S: KvStore>(&mut self, prefs: &mut Preferences<S>) {
        if let Err(e) = self.backend.resume() {
            log::warn!("{e}");
        }
        self.backend.set_tempo(BPM);
        if self.state == PlaybackState::Stopped {
            if let Err(e) = self.backend.start_loop() {
                log::warn!("{e}");
            }
        }
        self.state = PlaybackState::Playing;
        prefs.set_music(MusicPref::On);
        log::info!("music on");
    }

    pub fn stop<S: KvStore>(&mut self, prefs: &mut Preferences<S>) {
        self.backend.stop_loop();
        self.state = PlaybackState::Stopped;
        prefs.set_music(MusicPref::Off);
        log::info!("music off");
    }

    /// Stop the loop without touching the stored preference (teardown).
    pub fn silence(&mut self) {
        if self.state == PlaybackState::Playing {
            self.backend.stop_loop();
            self.state = PlaybackState::Stopped;
        }
    }

    pub fn toggle<S: KvStore>(&mut self, prefs: &mut Preferences<S>) -> PlaybackState {
        match self.state {
            PlaybackState::Playing => self.stop(prefs),
            PlaybackState::Stopped => self.start(prefs),
        }
        self.state
    }

    /// Start playback if the stored preference says so.
    pub fn restore<S: KvStore>(&mut self, prefs: &mut Preferences<S>) {
        if prefs.music() == MusicPref::On {
            self.start(prefs);
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
