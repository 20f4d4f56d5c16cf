//! Equal-temperament frequency table and chord lookups.
//!
//! Built once on first use and shared read-only for the life of the process.
//! Octaves 0 to 7 are covered, tuned to A4 = 440 Hz. Every octave map carries
//! the sharp and flat spellings of each pitch (`C#`/`Db`, ...) plus the
//! enharmonics `E#`, `Fb`, `B#` and `Cb`. `Cb` and `B#` cross octave
//! boundaries, so `Cb0` and `B#7` are absent.

use std::sync::OnceLock;

use arrayvec::ArrayVec;
use log::warn;
use rustc_hash::FxHashMap;

pub const OCTAVES: i32 = 8;

const A4: f64 = 440.0;
/// Semitones from C0 to A4.
const A4_INDEX: i32 = 4 * 12 + 9;

/// Every accepted spelling with its semitone offset from C of the same octave.
const SPELLINGS: [(&str, i32); 21] = [
    ("Cb", -1),
    ("C", 0),
    ("B#", 12),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("Fb", 4),
    ("E#", 5),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const MAJOR_TRIADS: [(&str, [&str; 3]); 12] = [
    ("C", ["C", "E", "G"]),
    ("C#", ["C#", "F", "G#"]),
    ("D", ["D", "F#", "A"]),
    ("D#", ["D#", "G", "A#"]),
    ("E", ["E", "G#", "B"]),
    ("F", ["F", "A", "C"]),
    ("F#", ["F#", "A#", "C#"]),
    ("G", ["G", "B", "D"]),
    ("G#", ["G#", "C", "D#"]),
    ("A", ["A", "C#", "E"]),
    ("A#", ["A#", "D", "F"]),
    ("B", ["B", "D#", "F#"]),
];

const MINOR_TRIADS: [(&str, [&str; 3]); 12] = [
    ("C", ["C", "D#", "G"]),
    ("C#", ["C#", "E", "G#"]),
    ("D", ["D", "F", "A"]),
    ("D#", ["D#", "F#", "A#"]),
    ("E", ["E", "G", "B"]),
    ("F", ["F", "G#", "C"]),
    ("F#", ["F#", "A", "C#"]),
    ("G", ["G", "A#", "D"]),
    ("G#", ["G#", "B", "D#"]),
    ("A", ["A", "C", "E"]),
    ("A#", ["A#", "C#", "F"]),
    ("B", ["B", "D", "F#"]),
];

/// Chord quality requested by an arpeggio marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arpeggio {
    Major,
    Minor,
}

pub type Triad = ArrayVec<&'static str, 3>;

#[derive(Debug)]
pub struct NoteTable {
    octaves: Vec<FxHashMap<&'static str, f64>>,
    offsets: FxHashMap<&'static str, i32>,
    major: FxHashMap<&'static str, Triad>,
    minor: FxHashMap<&'static str, Triad>,
}

/// The process-wide table.
pub fn note_table() -> &'static NoteTable {
    static TABLE: OnceLock<NoteTable> = OnceLock::new();
    TABLE.get_or_init(NoteTable::build)
}

fn frequency_of(semitone_index: i32) -> f64 {
    A4 * 2f64.powf((semitone_index - A4_INDEX) as f64 / 12.0)
}

fn triads(source: &[(&'static str, [&'static str; 3]); 12]) -> FxHashMap<&'static str, Triad> {
    source
        .iter()
        .map(|(root, tones)| (*root, tones.iter().copied().collect()))
        .collect()
}

impl NoteTable {
    fn build() -> Self {
        let octaves = (0..OCTAVES)
            .map(|octave| {
                SPELLINGS
                    .iter()
                    .filter_map(|&(name, offset)| {
                        let index = octave * 12 + offset;
                        (0..OCTAVES * 12)
                            .contains(&index)
                            .then(|| (name, frequency_of(index)))
                    })
                    .collect()
            })
            .collect();

        Self {
            octaves,
            offsets: SPELLINGS.iter().copied().collect(),
            major: triads(&MAJOR_TRIADS),
            minor: triads(&MINOR_TRIADS),
        }
    }

    /// Frequency of `name` (e.g. `"C#"`, `"Bb"`) in `octave`, if it exists.
    pub fn frequency(&self, octave: i32, name: &str) -> Option<f64> {
        let octave = usize::try_from(octave).ok()?;
        self.octaves.get(octave)?.get(name).copied()
    }

    /// The sharp spelling and actual octave of a note, resolving `Cb`/`B#`
    /// across the octave boundary.
    pub fn canonical(&self, octave: i32, name: &str) -> Option<(i32, &'static str)> {
        let offset = *self.offsets.get(name)?;
        let index = octave * 12 + offset;
        (0..OCTAVES * 12)
            .contains(&index)
            .then(|| (index.div_euclid(12), PITCH_CLASSES[index.rem_euclid(12) as usize]))
    }

    pub fn triad(&self, name: &str, arpeggio: Arpeggio) -> Option<&Triad> {
        match arpeggio {
            Arpeggio::Major => self.major.get(name),
            Arpeggio::Minor => self.minor.get(name),
        }
    }

    /// Frequencies of the three chord tones rooted at `name` in `octave`.
    ///
    /// Tones whose pitch class lies below the root's are taken from the next
    /// octave up. A tone that falls outside the table is returned as 0 (a
    /// rest). Returns `None` when the root itself is unknown.
    pub fn chord(&self, octave: i32, name: &str, arpeggio: Arpeggio) -> Option<[f64; 3]> {
        let (root_octave, root) = self.canonical(octave, name)?;
        let triad = self.triad(root, arpeggio)?;
        let root_offset = self.offsets[root];

        let mut tones = [0.0; 3];
        for (slot, tone) in tones.iter_mut().zip(triad.iter()) {
            let tone_octave = if self.offsets[tone] < root_offset {
                root_octave + 1
            } else {
                root_octave
            };
            match self.frequency(tone_octave, tone) {
                Some(freq) => *slot = freq,
                None => warn!(
                    "[notes] chord tone {}{} of {}{} is out of range",
                    tone, tone_octave, name, octave
                ),
            }
        }
        Some(tones)
    }
}
