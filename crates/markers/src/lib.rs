//! Conversation marker suite
//!
//! Detects structural markers in a transcribed conversation: pauses within a
//! speaker's turn, gaps between speakers, and overlapping speech. A layout
//! emitter folds the markers back into a readable conversation transcript.
//! Each detector ships as a plugin so the whole set can be loaded from a
//! suite manifest and scheduled in dependency order.

pub mod format;
pub mod gap;
pub mod overlap;
pub mod pause;
pub mod plugin;

pub use format::{ConversationFormatter, FormatConfig};
pub use gap::{Gap, GapConfig, GapDetector, GapReport};
pub use overlap::{Overlap, OverlapConfig, OverlapDetector, OverlapReport};
pub use pause::{Pause, PauseConfig, PauseDetector, PauseKind, PauseReport};
pub use plugin::{
    register_marker_plugins, write_suite_source, ConversationFormatPlugin, GapMarkerPlugin,
    OverlapMarkerPlugin, PauseMarkerPlugin, GAPS_PLUGIN, LAYOUT_PLUGIN, OVERLAPS_PLUGIN,
    PAUSES_PLUGIN, SUITE_NAME,
};
