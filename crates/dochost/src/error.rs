use std::time::Duration;
use thiserror::Error;

use crate::events::Topic;

/// Failures surfaced by the editor host.
///
/// Teardown problems are deliberately absent: destroying a stale widget must
/// never block the next create, so those are logged and swallowed at the
/// call site instead of being raised.
#[derive(Debug, Error)]
pub enum HostError {
    /// The vendor editor script could not be loaded. Retryable by the
    /// caller; the in-flight marker is cleared on failure.
    #[error("editor API failed to load: {reason}")]
    ApiLoad { reason: String },

    /// The save event never arrived while exporting a live document.
    #[error("timed out after {waited:?} waiting for the exported document")]
    ExportTimeout { waited: Duration },

    /// The requested operation needs a live editor instance.
    #[error("no active editor instance")]
    EditorUnavailable,

    /// A read-only switch was requested while another one is in flight.
    #[error("another read-only switch is already in flight")]
    SwitchInFlight,

    /// A bounded wait on the event bus expired.
    #[error("timed out after {waited:?} waiting for '{topic}' event")]
    EventTimeout { topic: Topic, waited: Duration },

    /// The host surface refused to provision a mount point, even at the
    /// document root.
    #[error("failed to provision the editor mount point: {reason}")]
    Surface { reason: String },
}
