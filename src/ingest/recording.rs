//! Where a call report keeps its recording URL.
//!
//! The voice platform has moved the field between payload versions, so
//! the locations are tried in a fixed order and the first non-empty value
//! wins.

use crate::models::event::CallReport;

/// A place a recording URL may appear in a call report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingSource {
    /// `recordingUrl` on the report itself.
    Message,
    /// `artifact.recordingUrl`.
    Artifact,
    /// `call.recordingUrl`.
    Call,
}

/// Lookup order for recording URLs.
pub const RECORDING_SOURCES: [RecordingSource; 3] = [
    RecordingSource::Message,
    RecordingSource::Artifact,
    RecordingSource::Call,
];

impl RecordingSource {
    /// The trimmed, non-empty URL at this location.
    #[must_use]
    pub fn extract(self, report: &CallReport) -> Option<&str> {
        let raw = match self {
            Self::Message => report.recording_url.as_deref(),
            Self::Artifact => report
                .artifact
                .as_ref()
                .and_then(|a| a.recording_url.as_deref()),
            Self::Call => report.call.as_ref().and_then(|c| c.recording_url.as_deref()),
        };
        raw.map(str::trim).filter(|url| !url.is_empty())
    }
}

/// First recording URL found in [`RECORDING_SOURCES`] order.
#[must_use]
pub fn locate_recording(report: &CallReport) -> Option<String> {
    RECORDING_SOURCES
        .iter()
        .find_map(|source| source.extract(report))
        .map(str::to_owned)
}
