//! Chord table, arpeggiator and the look-ahead step clock.

/// Cmaj9, a minor third up to Ebmaj9, then Fmaj9 and its parallel minor.
pub const CHORDS: [[&str; 5]; 4] = [
    ["C3", "E3", "G3", "B3", "D4"],
    ["Eb3", "G3", "Bb3", "D4", "F4"],
    ["F3", "A3", "C4", "E4", "G4"],
    ["F3", "Ab3", "C4", "Eb4", "G4"],
];

pub const NOTES_PER_CYCLE: usize = CHORDS.len() * 5;

/// Parse scientific pitch notation (`C3`, `Eb4`, `F#2`) into a MIDI number.
pub fn midi_number(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (accidental, octave) = match rest.as_bytes().first()? {
        b'b' => (-1, &rest[1..]),
        b'#' => (1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave.parse().ok()?;
    Some((octave + 1) * 12 + base + accidental)
}

/// Equal temperament, A4 = 440 Hz.
pub fn frequency(name: &str) -> Option<f64> {
    midi_number(name).map(|m| 440.0 * 2f64.powf((m - 69) as f64 / 12.0))
}

/// Walks the chord table one note per step. Position survives stop/start.
#[derive(Debug, Clone, Default)]
pub struct Arpeggiator {
    chord: usize,
    note: usize,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> (usize, usize) {
        (self.chord, self.note)
    }

    /// Note to play now; advances to the next note, and on wrap, the next chord.
    pub fn advance(&mut self) -> &'static str {
        let chord = &CHORDS[self.chord];
        let note = chord[self.note];
        self.note = (self.note + 1) % chord.len();
        if self.note == 0 {
            self.chord = (self.chord + 1) % CHORDS.len();
        }
        note
    }
}

/// Musical timing derived from BPM.
#[derive(Debug, Clone, Copy)]
pub struct Tempo {
    pub bpm: f64,
}

impl Tempo {
    pub fn beat_secs(&self) -> f64 {
        60.0 / self.bpm
    }
    pub fn eighth_secs(&self) -> f64 {
        self.beat_secs() / 2.0
    }
    pub fn sixteenth_secs(&self) -> f64 {
        self.beat_secs() / 4.0
    }
}

/// Steps on the audio clock. The scheduler asks for every step that starts
/// before `now + lookahead` and receives their start times in order.
#[derive(Debug, Clone)]
pub struct StepClock {
    next_at: f64,
    step_secs: f64,
}

impl StepClock {
    pub fn new(start_at: f64, step_secs: f64) -> Self {
        Self { next_at: start_at, step_secs }
    }

    pub fn next_at(&self) -> f64 {
        self.next_at
    }

    pub fn due(&mut self, now: f64, lookahead: f64) -> Vec<f64> {
        let horizon = now + lookahead;
        // A stalled tab can leave us far behind; skip instead of bursting.
        if self.next_at + self.step_secs * 4.0 < now {
            self.next_at = now;
        }
        let mut out = Vec::new();
        while self.next_at < horizon {
            out.push(self.next_at);
            self.next_at += self.step_secs;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accidentals() {
        assert_eq!(midi_number("C4"), Some(60));
        assert_eq!(midi_number("Eb3"), Some(51));
        assert_eq!(midi_number("Bb3"), Some(58));
        assert_eq!(midi_number("F#2"), Some(42));
        assert_eq!(midi_number("H2"), None);
        assert_eq!(midi_number("C"), None);
    }

    #[test]
    fn every_chord_note_is_playable() {
        for chord in CHORDS {
            for note in chord {
                assert!(frequency(note).is_some(), "bad note {note}");
            }
        }
    }

    #[test]
    fn tempo_130() {
        let t = Tempo { bpm: 130.0 };
        assert!((t.eighth_secs() - 0.230_769).abs() < 1e-5);
        assert!((t.sixteenth_secs() * 2.0 - t.eighth_secs()).abs() < 1e-12);
    }

    #[test]
    fn clock_skips_ahead_after_stall() {
        let mut clock = StepClock::new(0.0, 0.25);
        let due = clock.due(10.0, 0.1);
        assert_eq!(due, vec![10.0]);
    }
}
