//! Keytap events
//!
//! A [`Note`] is a single validated event: a non-negative timestamp and a
//! [`Step`], the fixed-width mask of receptor channels that must be hit at
//! that timestamp. Channel 0 is the leftmost character of the mask
//! (`"1000"` is the left arrow on a 4-key layout).

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Default number of receptor channels (left, down, up, right)
pub const DEFAULT_CHANNELS: usize = 4;

/// Widest mask a [`Step`] can hold
pub const MAX_CHANNELS: usize = 32;

/// Fixed-width, non-zero channel mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Step {
    bits: u32,
    width: u8,
}

impl Step {
    /// Parse a binary mask string such as `"0110"`.
    pub fn parse(step: &str, num_channels: usize) -> Result<Self, ValidationError> {
        check_channel_count(num_channels)?;

        let invalid = || ValidationError::InvalidStep {
            step: step.to_string(),
            num_channels,
        };

        if step.len() != num_channels || !step.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(invalid());
        }
        let bits = u32::from_str_radix(step, 2).map_err(|_| invalid())?;
        Self::from_bits(bits, num_channels).map_err(|_| invalid())
    }

    /// Build a mask from its integer value; the most significant of the
    /// `num_channels` bits is channel 0.
    pub fn from_bits(bits: u32, num_channels: usize) -> Result<Self, ValidationError> {
        check_channel_count(num_channels)?;

        let out_of_range = num_channels < MAX_CHANNELS && bits >> num_channels != 0;
        if bits == 0 || out_of_range {
            return Err(ValidationError::InvalidStep {
                step: format!("{bits:b}"),
                num_channels,
            });
        }
        Ok(Self {
            bits,
            width: num_channels as u8,
        })
    }

    /// One-hot mask with only `channel` active
    pub fn single(channel: usize, num_channels: usize) -> Result<Self, ValidationError> {
        check_channel_count(num_channels)?;
        if channel >= num_channels {
            return Err(ValidationError::InvalidStep {
                step: format!("channel {channel}"),
                num_channels,
            });
        }
        Self::from_bits(1 << (num_channels - 1 - channel), num_channels)
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn num_channels(&self) -> usize {
        self.width as usize
    }

    /// Number of physical keytaps this mask stands for
    pub fn tap_count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_active(&self, channel: usize) -> bool {
        channel < self.num_channels() && (self.bits >> (self.num_channels() - 1 - channel)) & 1 == 1
    }

    /// Active channels in reading order (left to right)
    pub fn channels(self) -> impl Iterator<Item = usize> {
        (0..self.num_channels()).filter(move |&c| self.is_active(c))
    }

    pub fn overlaps(&self, other: &Step) -> bool {
        self.bits & other.bits != 0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.bits, width = self.num_channels())
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Step::parse(&raw, raw.len()).map_err(serde::de::Error::custom)
    }
}

fn check_channel_count(num_channels: usize) -> Result<(), ValidationError> {
    if num_channels == 0 || num_channels > MAX_CHANNELS {
        return Err(ValidationError::InvalidChannelCount(num_channels));
    }
    Ok(())
}

/// A validated keytap event (or chord of simultaneous keytaps)
///
/// Notes are immutable value objects ordered by `(time, step)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawNote")]
pub struct Note {
    time: f64,
    step: Step,
}

#[derive(Deserialize)]
struct RawNote {
    time: f64,
    step: String,
}

impl TryFrom<RawNote> for Note {
    type Error = ValidationError;

    fn try_from(raw: RawNote) -> Result<Self, Self::Error> {
        Note::with_channels(raw.time, &raw.step, raw.step.len())
    }
}

impl Note {
    /// Create a note on the default 4-channel layout.
    pub fn new(time: f64, step: &str) -> Result<Self, ValidationError> {
        Self::with_channels(time, step, DEFAULT_CHANNELS)
    }

    /// Create a note for an `num_channels`-key layout.
    pub fn with_channels(
        time: f64,
        step: &str,
        num_channels: usize,
    ) -> Result<Self, ValidationError> {
        let step = Step::parse(step, num_channels)?;
        Self::from_step(time, step)
    }

    /// Create a note from an already validated mask.
    pub fn from_step(time: f64, step: Step) -> Result<Self, ValidationError> {
        if !time.is_finite() {
            return Err(ValidationError::NonFiniteTime);
        }
        if time < 0.0 {
            return Err(ValidationError::NegativeTime(time));
        }
        // folds -0.0 into 0.0 so equality and ordering agree
        Ok(Self {
            time: time + 0.0,
            step,
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn num_channels(&self) -> usize {
        self.step.num_channels()
    }

    pub fn tap_count(&self) -> usize {
        self.step.tap_count()
    }

    /// Positional `(time, step)` view
    pub fn as_tuple(&self) -> (f64, Step) {
        (self.time, self.step)
    }

    /// Same mask moved to a later timestamp.
    pub(crate) fn shifted(&self, offset: f64) -> Result<Self, ValidationError> {
        Self::from_step(self.time + offset, self.step)
    }

    /// Union of two simultaneous notes.
    ///
    /// Fails when the timestamps differ, the layouts differ, or any channel
    /// is active in both notes.
    pub fn combine(&self, other: &Note) -> Result<Note, ValidationError> {
        if self.time != other.time {
            return Err(ValidationError::TimeMismatch {
                left: self.time,
                right: other.time,
            });
        }
        if self.num_channels() != other.num_channels() {
            return Err(ValidationError::ChannelMismatch {
                expected: self.num_channels(),
                actual: other.num_channels(),
            });
        }
        if self.step.overlaps(&other.step) {
            return Err(ValidationError::OverlappingSteps {
                time: self.time,
                left: self.step.to_string(),
                right: other.step.to_string(),
            });
        }

        let step = Step::from_bits(self.step.bits | other.step.bits, self.num_channels())?;
        Ok(Note {
            time: self.time,
            step,
        })
    }

    /// Fold simultaneous notes into one chord.
    ///
    /// The fold is seeded with the empty element, so an empty input yields
    /// `None` and a single note comes back unchanged.
    pub fn combine_all<I>(notes: I) -> Result<Option<Note>, ValidationError>
    where
        I: IntoIterator<Item = Note>,
    {
        notes.into_iter().try_fold(None, |acc: Option<Note>, note| {
            Ok(Some(match acc {
                None => note,
                Some(chord) => chord.combine(&note)?,
            }))
        })
    }
}

impl From<Note> for (f64, Step) {
    fn from(note: Note) -> Self {
        note.as_tuple()
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Note {}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.step.cmp(&other.step))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Note(time={}, step={})", self.time, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note() {
        let note = Note::new(1.5, "0110").unwrap();
        assert_eq!(note.time(), 1.5);
        assert_eq!(note.step().to_string(), "0110");
        assert_eq!(note.tap_count(), 2);
        assert_eq!(note.num_channels(), 4);
    }

    #[test]
    fn test_negative_time_rejected() {
        assert_eq!(
            Note::new(-0.1, "1000"),
            Err(ValidationError::NegativeTime(-0.1))
        );
        assert_eq!(Note::new(f64::NAN, "1000"), Err(ValidationError::NonFiniteTime));
    }

    #[test]
    fn test_invalid_steps_rejected() {
        for step in ["0000", "100", "10000", "10a0", "+101", ""] {
            assert!(
                matches!(Note::new(0.0, step), Err(ValidationError::InvalidStep { .. })),
                "step {step:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_channel_count_bounds() {
        assert_eq!(
            Note::with_channels(0.0, "", 0),
            Err(ValidationError::InvalidChannelCount(0))
        );
        assert!(Note::with_channels(0.0, "000001", 6).is_ok());
    }

    #[test]
    fn test_step_channels() {
        let step = Step::parse("1010", 4).unwrap();
        assert_eq!(step.channels().collect::<Vec<_>>(), vec![0, 2]);
        assert!(step.is_active(0));
        assert!(!step.is_active(1));
        assert!(!step.is_active(7));
        assert_eq!(Step::single(3, 4).unwrap().to_string(), "0001");
        assert!(Step::single(4, 4).is_err());
    }

    #[test]
    fn test_combine_disjoint() {
        let a = Note::new(2.0, "1000").unwrap();
        let b = Note::new(2.0, "0011").unwrap();
        let chord = a.combine(&b).unwrap();
        assert_eq!(chord.time(), 2.0);
        assert_eq!(chord.step().to_string(), "1011");
        assert_eq!(chord.step().bits(), a.step().bits() | b.step().bits());
    }

    #[test]
    fn test_combine_overlapping_fails() {
        let a = Note::new(2.0, "1100").unwrap();
        let b = Note::new(2.0, "0100").unwrap();
        assert!(matches!(
            a.combine(&b),
            Err(ValidationError::OverlappingSteps { .. })
        ));
    }

    #[test]
    fn test_combine_time_mismatch_fails() {
        let a = Note::new(1.0, "1000").unwrap();
        let b = Note::new(1.5, "0001").unwrap();
        assert_eq!(
            a.combine(&b),
            Err(ValidationError::TimeMismatch {
                left: 1.0,
                right: 1.5
            })
        );
        // even identical masks fail on time first
        let c = Note::new(1.5, "1000").unwrap();
        assert!(matches!(
            a.combine(&c),
            Err(ValidationError::TimeMismatch { .. })
        ));
    }

    #[test]
    fn test_combine_layout_mismatch_fails() {
        let a = Note::new(1.0, "1000").unwrap();
        let b = Note::with_channels(1.0, "000001", 6).unwrap();
        assert!(matches!(
            a.combine(&b),
            Err(ValidationError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_combine_all_identity() {
        assert_eq!(Note::combine_all(Vec::new()), Ok(None));

        let single = Note::new(0.5, "0010").unwrap();
        assert_eq!(Note::combine_all(vec![single]), Ok(Some(single)));

        let quad = Note::combine_all(
            ["1000", "0100", "0010", "0001"].map(|s| Note::new(0.5, s).unwrap()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(quad.step().to_string(), "1111");
    }

    #[test]
    fn test_ordering() {
        let mut notes = vec![
            Note::new(1.0, "0100").unwrap(),
            Note::new(0.5, "0001").unwrap(),
            Note::new(1.0, "0010").unwrap(),
        ];
        notes.sort();
        let order: Vec<String> = notes.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "Note(time=0.5, step=0001)",
                "Note(time=1, step=0010)",
                "Note(time=1, step=0100)",
            ]
        );
    }

    #[test]
    fn test_tuple_view() {
        let note = Note::new(0.25, "0001").unwrap();
        let (time, step) = note.into();
        assert_eq!(time, 0.25);
        assert_eq!(step, Step::parse("0001", 4).unwrap());
    }

    #[test]
    fn test_serde_roundtrip_rejects_invalid() {
        let note: Note = serde_json::from_str(r#"{"time": 0.5, "step": "0101"}"#).unwrap();
        assert_eq!(note, Note::new(0.5, "0101").unwrap());
        assert_eq!(
            serde_json::to_string(&note).unwrap(),
            r#"{"time":0.5,"step":"0101"}"#
        );

        assert!(serde_json::from_str::<Note>(r#"{"time": 0.5, "step": "0000"}"#).is_err());
        assert!(serde_json::from_str::<Note>(r#"{"time": -1.0, "step": "1000"}"#).is_err());
    }
}
