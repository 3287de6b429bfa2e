// Arpeggio sequencing and tempo math.
// These tests are native-friendly and avoid wasm/browser APIs.

use vibejam_cityscape::audio::arp::{Arpeggiator, CHORDS, NOTES_PER_CYCLE, StepClock, Tempo, frequency};
use vibejam_cityscape::audio::{BPM, MusicPlayer, PlaybackState, SilentBackend};
use vibejam_cityscape::prefs::{MemoryStore, MusicPref, Preferences};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-2
}

#[test]
fn reference_pitches() {
    assert!(close(frequency("A4").unwrap_or_default(), 440.0));
    assert!(close(frequency("C4").unwrap_or_default(), 261.63));
    assert!(close(frequency("Eb3").unwrap_or_default(), 155.56));
    assert_eq!(frequency("H2"), None);
}

#[test]
fn arpeggio_cycles_through_every_chord() {
    let mut arp = Arpeggiator::new();
    let played: Vec<&str> = (0..NOTES_PER_CYCLE).map(|_| arp.advance()).collect();
    let expected: Vec<&str> = CHORDS.iter().flatten().copied().collect();
    assert_eq!(played, expected);
    assert_eq!(arp.position(), (0, 0));
    assert_eq!(arp.advance(), "C3");
}

#[test]
fn sixteenths_at_130_bpm() {
    let t = Tempo { bpm: BPM };
    assert!((t.sixteenth_secs() - 60.0 / 130.0 / 4.0).abs() < 1e-12);
}

#[test]
fn clock_schedules_within_the_window() {
    let step = Tempo { bpm: BPM }.sixteenth_secs();
    let mut clock = StepClock::new(1.0, step);
    assert!(clock.due(0.5, 0.1).is_empty());
    let due = clock.due(1.0, 0.25);
    assert_eq!(due.len(), 3);
    assert_eq!(due[0], 1.0);
    assert!(clock.next_at() >= 1.25);
}

#[test]
fn silent_backend_keeps_the_toggle_working() {
    let mut prefs = Preferences::new(MemoryStore::new());
    let mut player = MusicPlayer::new(SilentBackend);
    assert_eq!(player.toggle(&mut prefs), PlaybackState::Playing);
    player.silence();
    assert!(!player.is_playing());
    assert_eq!(prefs.music(), MusicPref::On);
}
