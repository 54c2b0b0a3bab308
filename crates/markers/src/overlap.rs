//! Overlap detection
//!
//! An overlap is simultaneous speech by two different speakers. The
//! detector reports the shared interval and distinguishes the speaker who
//! already held the floor from the one who came in on top, which is what
//! layout emitters need to place overlap brackets.

use serde::{Deserialize, Serialize};
use tracing::debug;
use transcript_common::Transcript;

/// Thresholds for overlap detection, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapConfig {
    /// Shortest simultaneous interval reported; filters alignment jitter
    pub min_overlap: f64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self { min_overlap: 0.05 }
    }
}

/// Simultaneous speech between two speakers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overlap {
    /// Speaker who was already talking when the overlap began
    pub holding_speaker: String,
    /// Speaker who started talking over the other
    pub incoming_speaker: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// All overlaps found in one transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapReport {
    pub overlaps: Vec<Overlap>,
    pub total_overlap_duration: f64,
}

/// Detects simultaneous speech in a transcript
pub struct OverlapDetector {
    config: OverlapConfig,
}

impl Default for OverlapDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(OverlapConfig::default())
    }

    #[must_use]
    pub fn with_config(config: OverlapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &OverlapConfig {
        &self.config
    }

    /// Find every qualifying interval where two speakers talk at once.
    ///
    /// Utterances of the same speaker never overlap each other; segmenters
    /// occasionally emit adjoining fragments for one voice and those are
    /// not simultaneous speech.
    #[must_use]
    pub fn detect(&self, transcript: &Transcript) -> OverlapReport {
        let mut ordered: Vec<_> = transcript.utterances.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let mut overlaps = Vec::new();
        for (i, current) in ordered.iter().enumerate() {
            for later in ordered.iter().skip(i + 1) {
                if later.start >= current.end {
                    break;
                }
                if later.speaker == current.speaker {
                    continue;
                }
                let start = later.start.max(current.start);
                let end = later.end.min(current.end);
                let duration = end - start;
                if duration < self.config.min_overlap {
                    continue;
                }
                overlaps.push(Overlap {
                    holding_speaker: current.speaker.clone(),
                    incoming_speaker: later.speaker.clone(),
                    start,
                    end,
                    duration,
                });
            }
        }

        let total_overlap_duration = overlaps.iter().map(|o| o.duration).sum();
        debug!(
            "Detected {} overlaps ({:.2}s simultaneous speech)",
            overlaps.len(),
            total_overlap_duration
        );
        OverlapReport {
            overlaps,
            total_overlap_duration,
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
    fn test_basic_overlap() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 2.0), utt("B", 1.5, 3.0)]);
        let report = OverlapDetector::new().detect(&transcript);

        assert_eq!(report.overlaps.len(), 1);
        let overlap = &report.overlaps[0];
        assert_eq!(overlap.holding_speaker, "A");
        assert_eq!(overlap.incoming_speaker, "B");
        assert!((overlap.start - 1.5).abs() < 1e-9);
        assert!((overlap.end - 2.0).abs() < 1e-9);
        assert!((overlap.duration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_turns_do_not_overlap() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.0), utt("B", 1.0, 2.0)]);
        let report = OverlapDetector::new().detect(&transcript);
        assert!(report.overlaps.is_empty());
    }

    #[test]
    fn test_same_speaker_fragments_ignored() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 2.0), utt("A", 1.5, 3.0)]);
        let report = OverlapDetector::new().detect(&transcript);
        assert!(report.overlaps.is_empty());
    }

    #[test]
    fn test_jitter_below_threshold_ignored() {
        let transcript = Transcript::new(vec![utt("A", 0.0, 1.0), utt("B", 0.98, 2.0)]);
        let report = OverlapDetector::new().detect(&transcript);
        assert!(report.overlaps.is_empty());
    }

    #[test]
    fn test_contained_interjection() {
        // B interjects entirely inside A's turn.
        let transcript = Transcript::new(vec![utt("A", 0.0, 5.0), utt("B", 2.0, 2.6)]);
        let report = OverlapDetector::new().detect(&transcript);

        assert_eq!(report.overlaps.len(), 1);
        let overlap = &report.overlaps[0];
        assert_eq!(overlap.holding_speaker, "A");
        assert_eq!(overlap.incoming_speaker, "B");
        assert!((overlap.duration - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_three_way_overlap_reports_each_pair() {
        let transcript = Transcript::new(vec![
            utt("A", 0.0, 3.0),
            utt("B", 1.0, 4.0),
            utt("C", 2.0, 5.0),
        ]);
        let report = OverlapDetector::new().detect(&transcript);

        let pairs: Vec<(&str, &str)> = report
            .overlaps
            .iter()
            .map(|o| (o.holding_speaker.as_str(), o.incoming_speaker.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
        assert!((report.total_overlap_duration - (2.0 + 1.0 + 2.0)).abs() < 1e-9);
    }
}
