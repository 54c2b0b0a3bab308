//! Gap detection
//!
//! A gap is silence at a speaker transition: one party stops talking and
//! nobody picks up the turn for a while. Gaps carry both speaker labels so
//! downstream formatting can attribute the silence to the handover rather
//! than to either turn.

use serde::{Deserialize, Serialize};
use tracing::debug;
use transcript_common::Transcript;

/// Thresholds for gap detection, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapConfig {
    /// Shortest inter-speaker silence reported as a gap
    pub min_gap: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self { min_gap: 0.3 }
    }
}

/// Silence between turns of two different speakers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    /// Speaker whose turn ended before the silence
    pub from_speaker: String,
    /// Speaker who took the next turn
    pub to_speaker: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// All gaps found in one transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub gaps: Vec<Gap>,
    pub total_gap_duration: f64,
}

/// Detects inter-speaker gaps in a transcript
pub struct GapDetector {
    config: GapConfig,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GapDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GapConfig::default())
    }

    #[must_use]
    pub fn with_config(config: GapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GapConfig {
        &self.config
    }

    /// Find every qualifying silence between turns of different speakers
    #[must_use]
    pub fn detect(&self, transcript: &Transcript) -> GapReport {
        let mut ordered: Vec<_> = transcript.utterances.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let mut gaps = Vec::new();
        for pair in ordered.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if current.speaker == next.speaker {
                continue;
            }
            let silence = next.start - current.end;
            if silence < self.config.min_gap {
                continue;
            }
            gaps.push(Gap {
                from_speaker: current.speaker.clone(),
                to_speaker: next.speaker.clone(),
                start: current.end,
                end: next.start,
                duration: silence,
            });
        }

        let total_gap_duration = gaps.iter().map(|g| g.duration).sum();
        debug!(
            "Detected {} gaps ({:.2}s total silence)",
            gaps.len(),
            total_gap_duration
        );
        GapReport {
            gaps,
            total_gap_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcript_common::Utterance;

    fn utt(speaker: &str, start: f64, end: f64) -> Utterance {
        Utterance::new(speaker, start, end, "words").unwrap()
    }

    #[test]
    fn test_gap_between_speakers() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.0), utt("B", 2.2, 3.0)]);
        let report = GapDetector::new().detect(&transcript);

        assert_eq!(report.gaps.len(), 1);
        let gap = &report.gaps[0];
        assert_eq!(gap.from_speaker, "A");
        assert_eq!(gap.to_speaker, "B");
        assert!((gap.duration - 1.2).abs() < 1e-9);
        assert!((report.total_gap_duration - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_same_speaker_silence_is_not_a_gap() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.0), utt("A", 2.2, 3.0)]);
        let report = GapDetector::new().detect(&transcript);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_quick_turn_take_ignored() {
        // 0.2s handover is below the default 0.3s threshold.
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.0), utt("B", 1.2, 2.0)]);
        let report = GapDetector::new().detect(&transcript);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_overlapping_turns_produce_no_gap() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.5), utt("B", 1.0, 2.0)]);
        let report = GapDetector::new().detect(&transcript);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_three_party_handovers() {
        let transcript = Transcript::new(vec![
            utt("A", 0.0, 1.0),
            utt("B", 1.5, 2.0), // 0.5s gap A -> B
            utt("C", 2.1, 3.0), // 0.1s, ignored
            utt("A", 4.0, 5.0), // 1.0s gap C -> A
        ]);
        let report = GapDetector::new().detect(&transcript);
        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].to_speaker, "B");
        assert_eq!(report.gaps[1].from_speaker, "C");
    }
}
