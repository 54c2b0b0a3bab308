//! Common transcript types shared by analysis plugins and their hosts

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Transcript data errors
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Invalid utterance timing: start {start}s > end {end}s")]
    InvalidTiming { start: f64, end: f64 },

    #[error("Not a transcript payload: {0}")]
    NotATranscript(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for transcript operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// A single timed utterance attributed to one speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    /// Start offset in seconds from the beginning of the recording
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    pub text: String,
}

impl Utterance {
    pub fn new(speaker: &str, start: f64, end: f64, text: &str) -> Result<Self> {
        if start > end {
            return Err(TranscriptError::InvalidTiming { start, end });
        }
        Ok(Self {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
        })
    }

    /// Duration of this utterance in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether this utterance overlaps another in time
    #[must_use]
    pub fn overlaps(&self, other: &Utterance) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An ordered sequence of utterances for one recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub utterances: Vec<Utterance>,
}

impl Transcript {
    #[must_use]
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Distinct speaker labels, sorted for stable output
    #[must_use]
    pub fn speakers(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.utterances.iter().map(|u| u.speaker.as_str()).collect();
        set.into_iter().map(ToString::to_string).collect()
    }

    /// Total covered time: end of the last utterance, in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.utterances.iter().fold(0.0, |acc, u| acc.max(u.end))
    }

    /// Serialize into a JSON value suitable for an opaque pipeline payload
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reconstruct a transcript from an opaque JSON payload
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| TranscriptError::NotATranscript(e.to_string()))
    }
}
