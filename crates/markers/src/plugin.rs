//! Plugin wrappers and suite wiring for the conversation markers.
//!
//! Each detector is adapted to the suite engine's `Plugin` contract, with a
//! factory registration helper and an installable suite source tree. The
//! layout plugin depends on the three marker plugins by their well-known
//! plugin names below; a custom manifest reusing these modules must keep
//! those names.

use crate::format::ConversationFormatter;
use crate::gap::{GapDetector, GapReport};
use crate::overlap::{OverlapDetector, OverlapReport};
use crate::pause::{PauseDetector, PauseReport};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use transcript_common::Transcript;
use transcript_suite_core::{
    Payload, Plugin, PluginRegistry, SuiteContext, TaskError, BASE_RESULT_KEY, MANIFEST_FILE,
};

/// Name of the built-in suite
pub const SUITE_NAME: &str = "conversation_markers";

/// Plugin names the built-in manifest declares
pub const PAUSES_PLUGIN: &str = "pauses";
pub const GAPS_PLUGIN: &str = "gaps";
pub const OVERLAPS_PLUGIN: &str = "overlaps";
pub const LAYOUT_PLUGIN: &str = "layout";

/// Module identifiers the factories are registered under
pub const PAUSE_MODULE: &str = "pause_marker";
pub const GAP_MODULE: &str = "gap_marker";
pub const OVERLAP_MODULE: &str = "overlap_marker";
pub const FORMAT_MODULE: &str = "conversation_format";

/// Manifest of the built-in suite
pub const SUITE_MANIFEST: &str = r#"suite_name: conversation_markers
metadata:
  author: Transcript Extracts Team
  contact: team@transcript-extracts.dev
  version: "0.1.0"
document: README.md
plugins:
  - plugin_name: pauses
    dependencies: []
    module_name: pause_marker
    rel_path: plugins/pauses.yaml
  - plugin_name: gaps
    dependencies: []
    module_name: gap_marker
    rel_path: plugins/gaps.yaml
  - plugin_name: overlaps
    dependencies: []
    module_name: overlap_marker
    rel_path: plugins/overlaps.yaml
  - plugin_name: layout
    dependencies: [pauses, gaps, overlaps]
    module_name: conversation_format
    rel_path: plugins/layout.yaml
"#;

const SUITE_README: &str = "# Conversation markers\n\n\
Pause, gap, and overlap detection over a transcribed conversation, plus a\n\
layout emitter that renders the markers back into turn-by-turn text.\n";

/// Pause detection plugin
pub struct PauseMarkerPlugin {
    detector: PauseDetector,
}

impl Default for PauseMarkerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseMarkerPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: PauseDetector::new(),
        }
    }

    #[must_use]
    pub fn with_detector(detector: PauseDetector) -> Self {
        Self { detector }
    }
}

impl Plugin for PauseMarkerPlugin {
    fn apply(
        &self,
        deps: &HashMap<String, Payload>,
        _ctx: &dyn SuiteContext,
    ) -> Result<Payload, TaskError> {
        let started = Instant::now();
        let transcript = base_transcript(deps)?;
        let report = self.detector.detect(&transcript);
        debug!(
            "Pause marker finished in {:?}: {} pauses",
            started.elapsed(),
            report.pauses.len()
        );
        Ok(Payload::Json(serde_json::to_value(&report)?))
    }
}

/// Gap detection plugin
pub struct GapMarkerPlugin {
    detector: GapDetector,
}

impl Default for GapMarkerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GapMarkerPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: GapDetector::new(),
        }
    }

    #[must_use]
    pub fn with_detector(detector: GapDetector) -> Self {
        Self { detector }
    }
}

impl Plugin for GapMarkerPlugin {
    fn apply(
        &self,
        deps: &HashMap<String, Payload>,
        _ctx: &dyn SuiteContext,
    ) -> Result<Payload, TaskError> {
        let started = Instant::now();
        let transcript = base_transcript(deps)?;
        let report = self.detector.detect(&transcript);
        debug!(
            "Gap marker finished in {:?}: {} gaps",
            started.elapsed(),
            report.gaps.len()
        );
        Ok(Payload::Json(serde_json::to_value(&report)?))
    }
}

/// Overlap detection plugin
pub struct OverlapMarkerPlugin {
    detector: OverlapDetector,
}

impl Default for OverlapMarkerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapMarkerPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: OverlapDetector::new(),
        }
    }

    #[must_use]
    pub fn with_detector(detector: OverlapDetector) -> Self {
        Self { detector }
    }
}

impl Plugin for OverlapMarkerPlugin {
    fn apply(
        &self,
        deps: &HashMap<String, Payload>,
        _ctx: &dyn SuiteContext,
    ) -> Result<Payload, TaskError> {
        let started = Instant::now();
        let transcript = base_transcript(deps)?;
        let report = self.detector.detect(&transcript);
        debug!(
            "Overlap marker finished in {:?}: {} overlaps",
            started.elapsed(),
            report.overlaps.len()
        );
        Ok(Payload::Json(serde_json::to_value(&report)?))
    }
}

/// Layout plugin joining the three marker reports.
///
/// Reads the transcript from the run context's base payload (its
/// dependencies are the markers, not the transcript source) and persists
/// the rendered conversation through the context's artifact primitive.
pub struct ConversationFormatPlugin {
    formatter: ConversationFormatter,
    artifact_name: String,
}

impl Default for ConversationFormatPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationFormatPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            formatter: ConversationFormatter::new(),
            artifact_name: "conversation.txt".to_string(),
        }
    }

    #[must_use]
    pub fn with_artifact_name(mut self, name: &str) -> Self {
        self.artifact_name = name.to_string();
        self
    }
}

impl Plugin for ConversationFormatPlugin {
    fn apply(
        &self,
        deps: &HashMap<String, Payload>,
        ctx: &dyn SuiteContext,
    ) -> Result<Payload, TaskError> {
        let started = Instant::now();
        let transcript = transcript_from(ctx.base())?;
        let pauses: PauseReport = marker_report(deps, PAUSES_PLUGIN)?;
        let gaps: GapReport = marker_report(deps, GAPS_PLUGIN)?;
        let overlaps: OverlapReport = marker_report(deps, OVERLAPS_PLUGIN)?;

        let text = self.formatter.render(
            &transcript,
            &pauses.pauses,
            &gaps.gaps,
            &overlaps.overlaps,
        );
        let artifact = ctx.save_artifact(&self.artifact_name, text.as_bytes())?;
        debug!(
            "Conversation layout for '{}' written in {:?}",
            ctx.source_name(),
            started.elapsed()
        );
        Ok(Payload::Json(json!({
            "artifact": artifact,
            "lines": text.lines().count(),
            "pauses": pauses.pauses.len(),
            "gaps": gaps.gaps.len(),
            "overlaps": overlaps.overlaps.len(),
        })))
    }
}

/// Register every marker plugin factory under its module identifier
pub fn register_marker_plugins(registry: &mut PluginRegistry) {
    registry.register(PAUSE_MODULE, || Ok(Arc::new(PauseMarkerPlugin::new())));
    registry.register(GAP_MODULE, || Ok(Arc::new(GapMarkerPlugin::new())));
    registry.register(OVERLAP_MODULE, || Ok(Arc::new(OverlapMarkerPlugin::new())));
    registry.register(FORMAT_MODULE, || Ok(Arc::new(ConversationFormatPlugin::new())));
}

/// Write the suite source tree (manifest, documentation, per-plugin
/// descriptors) under `dir`, ready to be loaded by a suite manager.
pub fn write_suite_source(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir.join("plugins"))?;
    fs::write(dir.join(MANIFEST_FILE), SUITE_MANIFEST)?;
    fs::write(dir.join("README.md"), SUITE_README)?;
    fs::write(
        dir.join("plugins/pauses.yaml"),
        "marker: pauses\n# Thresholds in seconds\nmin_pause: 0.1\nmicro_pause: 0.2\nlong_pause: 1.0\n",
    )?;
    fs::write(
        dir.join("plugins/gaps.yaml"),
        "marker: gaps\n# Thresholds in seconds\nmin_gap: 0.3\n",
    )?;
    fs::write(
        dir.join("plugins/overlaps.yaml"),
        "marker: overlaps\n# Thresholds in seconds\nmin_overlap: 0.05\n",
    )?;
    fs::write(
        dir.join("plugins/layout.yaml"),
        "marker: layout\nartifact: conversation.txt\n",
    )?;
    Ok(())
}

fn transcript_from(payload: &Payload) -> Result<Transcript, TaskError> {
    let value = payload
        .as_json()
        .ok_or_else(|| TaskError::InvalidInput("expected a JSON transcript payload".to_string()))?;
    Transcript::from_json(value).map_err(|e| TaskError::InvalidInput(e.to_string()))
}

fn base_transcript(deps: &HashMap<String, Payload>) -> Result<Transcript, TaskError> {
    let payload = deps
        .get(BASE_RESULT_KEY)
        .ok_or_else(|| TaskError::MissingPayload(BASE_RESULT_KEY.to_string()))?;
    transcript_from(payload)
}

fn marker_report<T: DeserializeOwned>(
    deps: &HashMap<String, Payload>,
    plugin: &str,
) -> Result<T, TaskError> {
    let payload = deps
        .get(plugin)
        .ok_or_else(|| TaskError::MissingPayload(plugin.to_string()))?;
    let value = payload.as_json().ok_or_else(|| {
        TaskError::InvalidInput(format!("'{plugin}' did not produce a JSON report"))
    })?;
    Ok(serde_json::from_value(value.clone())?)
}
