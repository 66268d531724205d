//! Stepfile aggregation
//!
//! Turns a raw, possibly duplicated, unordered list of keytap notes into the
//! canonical chronological sequence of chord notes:
//!
//! 1. Zero-framer correction: identical `(time, step)` duplicates are spread
//!    apart by `i × epsilon` so that distinct presses logged on the same
//!    frame survive as distinct notes.
//! 2. Chord aggregation: notes sharing a timestamp are folded into a single
//!    chord with [`Note::combine`].
//!
//! Length and indexing work at keytap granularity: a chord of two channels
//! counts as two keytaps and both keytap indices resolve to the same chord.

use crate::error::ValidationError;
use crate::note::{Note, DEFAULT_CHANNELS};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Index;

/// Offset applied per duplicate during zero-framer correction (seconds)
pub const ZERO_FRAMER_EPSILON: f64 = 1e-6;

/// One physical keytap inside an aggregated stepfile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keytap {
    /// Timestamp of the owning chord (seconds)
    pub time: f64,
    /// Receptor channel, 0 = leftmost
    pub channel: usize,
    /// Position of the owning chord in [`Stepfile::notes`]
    pub note_index: usize,
}

/// Immutable, aggregated collection of chord notes
#[derive(Debug, Clone)]
pub struct Stepfile {
    notes: Vec<Note>,
    steps: String,
    keytap_index: Vec<usize>,
    num_channels: usize,
}

impl Stepfile {
    /// Build a stepfile for the default 4-key layout.
    pub fn new(notes: Vec<Note>) -> Result<Self, ValidationError> {
        Self::with_options(notes, DEFAULT_CHANNELS, ZERO_FRAMER_EPSILON)
    }

    /// Build a stepfile with an explicit layout width and duplicate offset.
    pub fn with_options(
        notes: Vec<Note>,
        num_channels: usize,
        epsilon: f64,
    ) -> Result<Self, ValidationError> {
        if let Some(note) = notes.iter().find(|n| n.num_channels() != num_channels) {
            return Err(ValidationError::ChannelMismatch {
                expected: num_channels,
                actual: note.num_channels(),
            });
        }

        let corrected = correct_zero_framers(notes, epsilon)?;
        let notes = aggregate_chords(corrected)?;

        let steps: String = notes.iter().map(|n| n.step().to_string()).collect();
        let keytap_index = notes
            .iter()
            .enumerate()
            .flat_map(|(i, n)| std::iter::repeat(i).take(n.tap_count()))
            .collect();

        Ok(Self {
            notes,
            steps,
            keytap_index,
            num_channels,
        })
    }

    /// Aggregated chord notes, one per distinct timestamp, in time order
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    /// Every chord mask concatenated in time order
    pub fn steps(&self) -> &str {
        &self.steps
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_notes(&self) -> usize {
        self.notes.len()
    }

    /// Total number of physical keytaps (not chords)
    pub fn len(&self) -> usize {
        self.keytap_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keytap_index.is_empty()
    }

    /// Chord containing the `k`-th keytap in reading order
    pub fn get(&self, k: usize) -> Option<&Note> {
        self.keytap_index.get(k).map(|&i| &self.notes[i])
    }

    /// Keytaps in reading order: chords by time, channels left to right
    pub fn keytaps(&self) -> impl Iterator<Item = Keytap> + '_ {
        self.notes.iter().enumerate().flat_map(|(note_index, note)| {
            let time = note.time();
            note.step().channels().map(move |channel| Keytap {
                time,
                channel,
                note_index,
            })
        })
    }

    /// Content hash of the dense step string
    pub fn id(&self) -> String {
        hex::encode(Sha256::digest(self.steps.as_bytes()))
    }
}

impl Index<usize> for Stepfile {
    type Output = Note;

    fn index(&self, k: usize) -> &Note {
        &self.notes[self.keytap_index[k]]
    }
}

impl fmt::Display for Stepfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stepfile(id={}, num_notes={})", self.id(), self.len())
    }
}

/// Spread identical `(time, step)` duplicates apart by `i × epsilon`.
fn correct_zero_framers(mut notes: Vec<Note>, epsilon: f64) -> Result<Vec<Note>, ValidationError> {
    notes.sort();

    let mut corrected = Vec::with_capacity(notes.len());
    let mut position = 0usize;
    for (i, note) in notes.iter().enumerate() {
        position = if i > 0 && notes[i - 1] == *note {
            position + 1
        } else {
            0
        };
        corrected.push(if position == 0 {
            *note
        } else {
            note.shifted(position as f64 * epsilon)?
        });
    }
    Ok(corrected)
}

/// Fold every group of same-time notes into one chord.
fn aggregate_chords(mut notes: Vec<Note>) -> Result<Vec<Note>, ValidationError> {
    notes.sort_by(|a, b| a.time().total_cmp(&b.time()));

    let mut chords = Vec::new();
    for group in notes.chunk_by(|a, b| a.time() == b.time()) {
        if let Some(chord) = Note::combine_all(group.iter().copied())? {
            chords.push(chord);
        }
    }
    Ok(chords)
}
