//! Conversation layout emitter
//!
//! Renders a transcript as readable turn-by-turn text with the detected
//! markers folded back in: pauses appear inline at the end of the turn they
//! interrupt, gaps become standalone silence lines between turns, and
//! overlaps annotate the turn that came in over the floor holder.

use crate::gap::Gap;
use crate::overlap::Overlap;
use crate::pause::{Pause, PauseKind};
use serde::{Deserialize, Serialize};
use tracing::debug;
use transcript_common::Transcript;

/// Marker timestamps are derived from utterance boundaries, so matching
/// them back only has to absorb float noise.
const TIME_EPSILON: f64 = 1e-6;

/// Rendering options for the conversation layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Symbol emitted for pauses too short to time
    pub micro_pause_symbol: String,
    /// Decimal places for timed silences
    pub timing_decimals: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            micro_pause_symbol: "(.)".to_string(),
            timing_decimals: 1,
        }
    }
}

/// Renders transcripts with conversation markers inline
pub struct ConversationFormatter {
    config: FormatConfig,
}

impl Default for ConversationFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FormatConfig::default())
    }

    #[must_use]
    pub fn with_config(config: FormatConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Produce the marked-up conversation text, one line per turn plus one
    /// line per gap, terminated by a trailing newline.
    #[must_use]
    pub fn render(
        &self,
        transcript: &Transcript,
        pauses: &[Pause],
        gaps: &[Gap],
        overlaps: &[Overlap],
    ) -> String {
        let mut ordered: Vec<_> = transcript.utterances.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

        let mut lines = Vec::with_capacity(ordered.len() + gaps.len());
        for utterance in ordered {
            let mut line = format!("{}: {}", utterance.speaker, utterance.text);
            for overlap in overlaps {
                if overlap.incoming_speaker == utterance.speaker
                    && close(overlap.start, utterance.start)
                {
                    line.push_str(&format!(" [overlapping {}]", overlap.holding_speaker));
                }
            }
            if let Some(pause) = pauses
                .iter()
                .find(|p| p.speaker == utterance.speaker && close(p.start, utterance.end))
            {
                line.push(' ');
                line.push_str(&self.silence_symbol(pause));
            }
            lines.push(line);

            if let Some(gap) = gaps
                .iter()
                .find(|g| g.from_speaker == utterance.speaker && close(g.start, utterance.end))
            {
                lines.push(self.timed_silence(gap.duration));
            }
        }

        debug!("Rendered conversation layout: {} lines", lines.len());
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn silence_symbol(&self, pause: &Pause) -> String {
        match pause.kind {
            PauseKind::Micro => self.config.micro_pause_symbol.clone(),
            PauseKind::Timed | PauseKind::Long => self.timed_silence(pause.duration),
        }
    }

    fn timed_silence(&self, duration: f64) -> String {
        format!("({:.*})", self.config.timing_decimals, duration)
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < TIME_EPSILON
}
