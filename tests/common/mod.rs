#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use warmline::directory::{AgentDirectory, CustomerProfile, DirectoryAgent};
use warmline::error::{Result, ServiceError};
use warmline::external::speech::{ChannelSpeechEngine, SpeechEngine};
use warmline::external::summarizer::Summarizer;
use warmline::external::telephony::TelephonyGateway;
use warmline::external::LocalMediaPlatform;
use warmline::Center;

/// Summarizer double that counts calls and records the transcript it was
/// given. `response: None` simulates an unreachable service.
pub struct CountingSummarizer {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
    pub response: Option<String>,
}

impl CountingSummarizer {
    pub fn replying(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            response: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            response: None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        _category: &str,
        _profile: Option<&CustomerProfile>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push(transcript.to_string());

        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(ServiceError::upstream("summarization service unreachable")),
        }
    }
}

/// Telephony double that records placed calls instead of dialing
pub struct RecordingTelephony {
    pub calls: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingTelephony {
    pub fn working() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl TelephonyGateway for RecordingTelephony {
    async fn place_call(
        &self,
        phone_number: &str,
        callback_url: &str,
        _status_callback_url: &str,
    ) -> Result<String> {
        if self.fail {
            return Err(ServiceError::upstream("telephony gateway unreachable"));
        }
        self.calls
            .lock()
            .await
            .push((phone_number.to_string(), callback_url.to_string()));
        Ok("CA-test-call".to_string())
    }

    async fn call_status(&self, _call_id: &str) -> Result<String> {
        Ok("queued".to_string())
    }
}

pub fn test_directory() -> AgentDirectory {
    AgentDirectory::new(
        vec![
            DirectoryAgent {
                id: "b1".to_string(),
                name: "Carol".to_string(),
                role: "compliance".to_string(),
                phone: Some("+15550100".to_string()),
            },
            DirectoryAgent {
                id: "b2".to_string(),
                name: "Pat".to_string(),
                role: "partner".to_string(),
                phone: None,
            },
        ],
        vec![CustomerProfile {
            identity: "john.doe@example.com".to_string(),
            name: "John Doe".to_string(),
            notes: "Dashboard access issue after password reset.".to_string(),
        }],
    )
}

/// A fully wired service container over test doubles
pub struct TestCenter {
    pub center: Arc<Center>,
    pub media: Arc<LocalMediaPlatform>,
    pub speech: Arc<ChannelSpeechEngine>,
    pub summarizer: Arc<CountingSummarizer>,
    pub telephony: Arc<RecordingTelephony>,
}

pub fn build_center(summarizer: CountingSummarizer, telephony: RecordingTelephony) -> TestCenter {
    let media = Arc::new(LocalMediaPlatform::new());
    let speech = Arc::new(ChannelSpeechEngine::new());
    let summarizer = Arc::new(summarizer);
    let telephony = Arc::new(telephony);

    let center = Arc::new(Center::new(
        Arc::clone(&media) as Arc<dyn warmline::external::MediaPlatform>,
        Arc::clone(&telephony) as Arc<dyn TelephonyGateway>,
        Arc::clone(&summarizer) as Arc<dyn Summarizer>,
        Arc::clone(&speech) as Arc<dyn SpeechEngine>,
        Arc::new(test_directory()),
        "https://hooks.test",
    ));

    TestCenter {
        center,
        media,
        speech,
        summarizer,
        telephony,
    }
}

pub fn default_center() -> TestCenter {
    build_center(
        CountingSummarizer::replying("generated summary"),
        RecordingTelephony::working(),
    )
}
