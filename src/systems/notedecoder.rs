//! Note-string decoder.
//!
//! Turns the compact note notation of a track into one frequency per quaver
//! (eighth-note) slot. Each token is:
//!
//! ```text
//! [+|-]*  (A-G | ~)  [#|b]  [denominator]  [.]  [@|$]
//! ```
//!
//! - `+`/`-` shift the track octave up/down for this token only (clamped
//!   to 0..7),
//! - `~` is a rest,
//! - the denominator defaults to 4 (quarter note = 2 slots), `.` makes the
//!   note 1.5 times longer,
//! - `@` arpeggiates a major triad and `$` a minor one over the second and
//!   third slots.
//!
//! Only the first slot of a note carries its pitch; the rest are 0 so the
//! envelope can carry the sound. Anything that does not parse, or a pitch
//! the table does not have, is logged and becomes silence.

use std::iter::Peekable;
use std::str::Chars;

use log::{debug, warn};

use crate::components::track::{DecodedTrack, MusicDefinition, TrackDefinition};
use crate::resources::notetable::{Arpeggio, OCTAVES, note_table};

const DEFAULT_DENOMINATOR: u32 = 4;
const QUAVERS_PER_WHOLE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
struct Token {
    shift: i32,
    /// Note name such as `"C"` or `"Eb"`; `None` for a rest.
    name: Option<String>,
    denominator: u32,
    dotted: bool,
    arpeggio: Option<Arpeggio>,
}

impl Token {
    fn quavers(&self) -> usize {
        let dot = if self.dotted { 1.5 } else { 1.0 };
        (QUAVERS_PER_WHOLE / self.denominator as f64 * dot).floor() as usize
    }
}

fn scan_token(chars: &mut Peekable<Chars<'_>>) -> Option<Token> {
    loop {
        let mut shift = 0;
        while let Some(c) = chars.next_if(|&c| matches!(c, '+' | '-')) {
            shift += if c == '+' { 1 } else { -1 };
        }

        let mut name = match chars.next()? {
            c @ 'A'..='G' => Some(String::from(c)),
            '~' => None,
            c if c.is_whitespace() || c == ',' => {
                if shift != 0 {
                    warn!("[notes] octave shift without a note");
                }
                continue;
            }
            c => {
                warn!("[notes] illegal character '{}' skipped", c);
                continue;
            }
        };

        if let Some(c) = chars.next_if(|&c| matches!(c, '#' | 'b'))
            && let Some(name) = name.as_mut()
        {
            name.push(c);
        }

        let mut digits = String::new();
        while let Some(c) = chars.next_if(char::is_ascii_digit) {
            digits.push(c);
        }
        let denominator = if digits.is_empty() {
            Some(DEFAULT_DENOMINATOR)
        } else {
            digits.parse().ok()
        };

        let dotted = chars.next_if_eq(&'.').is_some();
        let arpeggio = match chars.next_if(|&c| matches!(c, '@' | '$')) {
            Some('@') => Some(Arpeggio::Major),
            Some(_) => Some(Arpeggio::Minor),
            None => None,
        };

        match denominator {
            Some(denominator) if denominator > 0 => {
                return Some(Token {
                    shift,
                    name,
                    denominator,
                    dotted,
                    arpeggio,
                });
            }
            _ => warn!("[notes] illegal duration '{}' skipped", digits),
        }
    }
}

fn emit(token: &Token, base_octave: i32, out: &mut Vec<f64>) {
    let quavers = token.quavers();
    if quavers == 0 {
        debug!("[notes] duration 1/{} is shorter than a quaver", token.denominator);
        return;
    }
    let start = out.len();
    out.resize(start + quavers, 0.0);

    let Some(name) = token.name.as_deref() else {
        return;
    };
    let octave = (base_octave + token.shift).clamp(0, OCTAVES - 1);
    let table = note_table();
    let Some(root) = table.frequency(octave, name) else {
        warn!("[notes] unknown note {}{}, using a rest", name, octave);
        return;
    };
    out[start] = root;

    if let Some(arpeggio) = token.arpeggio
        && let Some(chord) = table.chord(octave, name, arpeggio)
    {
        for (slot, tone) in out[start..].iter_mut().zip(chord).skip(1) {
            *slot = tone;
        }
    }
}

/// Decode a note string at the given base octave.
pub fn decode_notes(notes: &str, octave: i32) -> Vec<f64> {
    let mut chars = notes.chars().peekable();
    let mut out = Vec::new();
    while let Some(token) = scan_token(&mut chars) {
        emit(&token, octave, &mut out);
    }
    out
}

/// Decode one track. A detune-only track copies `previous`; without a
/// previous track it has nothing to play and yields `None`.
pub fn decode_track(
    track: &TrackDefinition,
    previous: Option<&DecodedTrack>,
) -> Option<DecodedTrack> {
    match track.detune_only() {
        Some(detune) => match previous {
            Some(previous) => Some(DecodedTrack {
                detune,
                instrument: previous.instrument.clone(),
                frequencies: previous.frequencies.clone(),
            }),
            None => {
                warn!("[notes] detune-only track has no track before it, skipped");
                None
            }
        },
        None => Some(DecodedTrack {
            detune: track.detune,
            instrument: track.instrument.clone(),
            frequencies: decode_notes(&track.notes, track.octave),
        }),
    }
}

/// Decode every track of a piece, in order.
pub fn decode_music(music: &MusicDefinition) -> Vec<DecodedTrack> {
    let mut decoded: Vec<DecodedTrack> = Vec::with_capacity(music.tracks.len());
    for track in &music.tracks {
        if let Some(track) = decode_track(track, decoded.last()) {
            decoded.push(track);
        }
    }
    decoded
}
