//! Pause detection
//!
//! A pause is silence between two consecutive utterances of the same
//! speaker. Pauses are classified by duration following conversation
//! analysis conventions: micropauses are audible but too short to time,
//! timed pauses get their duration, and long pauses usually signal a
//! turn-holding silence worth flagging on its own.

use serde::{Deserialize, Serialize};
use tracing::debug;
use transcript_common::Transcript;

/// Duration thresholds for pause detection, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseConfig {
    /// Silences shorter than this are treated as continuous speech
    pub min_pause: f64,
    /// Upper bound of the micropause band
    pub micro_pause: f64,
    /// Lower bound of the long-pause band
    pub long_pause: f64,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            min_pause: 0.1,
            micro_pause: 0.2,
            long_pause: 1.0,
        }
    }
}

/// Duration class of a detected pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseKind {
    /// Audible but below the timing threshold
    Micro,
    /// Ordinary timed pause
    Timed,
    /// At or above the long-pause threshold
    Long,
}

/// A silence within one speaker's turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pause {
    pub speaker: String,
    /// Start of the silence in seconds
    pub start: f64,
    /// End of the silence in seconds
    pub end: f64,
    pub duration: f64,
    pub kind: PauseKind,
}

/// All pauses found in one transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseReport {
    pub pauses: Vec<Pause>,
    pub total_pause_duration: f64,
}

/// Detects intra-speaker pauses in a transcript
pub struct PauseDetector {
    config: PauseConfig,
}

impl Default for PauseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PauseConfig::default())
    }

    #[must_use]
    pub fn with_config(config: PauseConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PauseConfig {
        &self.config
    }

    /// Find every pause between consecutive utterances of the same speaker.
    ///
    /// Utterances are ordered by start time before pairing, so a transcript
    /// assembled from per-channel sources does not need pre-sorting.
    #[must_use]
    pub fn detect(&self, transcript: &Transcript) -> PauseReport {
        let mut ordered: Vec<_> = transcript.utterances.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let mut pauses = Vec::new();
        for pair in ordered.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if current.speaker != next.speaker {
                continue;
            }
            let silence = next.start - current.end;
            if silence < self.config.min_pause {
                continue;
            }
            let kind = if silence < self.config.micro_pause {
                PauseKind::Micro
            } else if silence < self.config.long_pause {
                PauseKind::Timed
            } else {
                PauseKind::Long
            };
            pauses.push(Pause {
                speaker: current.speaker.clone(),
                start: current.end,
                end: next.start,
                duration: silence,
                kind,
            });
        }

        let total_pause_duration = pauses.iter().map(|p| p.duration).sum();
        debug!(
            "Detected {} pauses ({:.2}s total silence)",
            pauses.len(),
            total_pause_duration
        );
        PauseReport {
            pauses,
            total_pause_duration,
        }
    }
}
