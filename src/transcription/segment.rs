use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::external::speech::WordInfo;

/// A single transcript segment from the speech engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Speaker label derived from word-level annotations, else "unknown"
    pub speaker: String,

    /// Transcribed text (never empty; blank results are dropped upstream)
    pub text: String,

    /// When this segment was captured
    pub timestamp: DateTime<Utc>,

    /// Whether this is a final result; interim segments may be superseded
    /// by a later final segment but both are retained
    pub is_final: bool,

    /// Confidence score (0.0 to 1.0), if available
    pub confidence: Option<f32>,

    /// Word-level timing and speaker sub-annotations, if available
    #[serde(default)]
    pub words: Vec<WordInfo>,
}
