use std::sync::Arc;
use std::time::Duration;

use warmline::external::speech::{
    ChannelSpeechEngine, SegmentEvent, SpeechEngine, SpeechEvent, SpeechStreamHandle, WordInfo,
};
use warmline::transcription::{TranscriptionManager, AUDIO_CHUNK_BYTES};

fn manager() -> (Arc<ChannelSpeechEngine>, TranscriptionManager) {
    let engine = Arc::new(ChannelSpeechEngine::new());
    let manager = TranscriptionManager::new(Arc::clone(&engine) as Arc<dyn SpeechEngine>);
    (engine, manager)
}

async fn start_session(
    engine: &ChannelSpeechEngine,
    manager: &TranscriptionManager,
    key: &str,
) -> SpeechStreamHandle {
    manager.start(key).await.unwrap();
    engine.take_handle(key).await.expect("stream handle")
}

/// Poll until the session holds `count` segments; the event loop runs on
/// its own task
async fn wait_for_segments(manager: &TranscriptionManager, key: &str, count: usize) {
    for _ in 0..100 {
        if manager
            .get_segments(key)
            .await
            .map(|s| s.len() >= count)
            .unwrap_or(false)
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {} segments on {}", count, key);
}

fn final_segment(text: &str) -> SpeechEvent {
    SpeechEvent::Segment(SegmentEvent {
        text: text.to_string(),
        is_final: true,
        confidence: Some(0.95),
        words: Vec::new(),
    })
}

#[tokio::test]
async fn audio_is_dispatched_in_fixed_chunks() {
    let (engine, manager) = manager();
    let mut handle = start_session(&engine, &manager, "room1").await;

    // Two full chunks of silence
    let silence = vec![0u8; AUDIO_CHUNK_BYTES];
    assert!(manager.feed_audio("room1", &silence).await.unwrap());
    assert!(manager.feed_audio("room1", &silence).await.unwrap());

    let first = handle.audio_rx.recv().await.unwrap();
    let second = handle.audio_rx.recv().await.unwrap();
    assert_eq!(first.len(), AUDIO_CHUNK_BYTES);
    assert_eq!(second.len(), AUDIO_CHUNK_BYTES);

    // A final "hello" becomes the whole summary
    handle.event_tx.send(final_segment("hello")).await.unwrap();
    wait_for_segments(&manager, "room1", 1).await;

    assert_eq!(
        manager.get_summary_text("room1").await.as_deref(),
        Some("hello")
    );
}

#[tokio::test]
async fn partial_frames_accumulate_until_the_threshold() {
    let (engine, manager) = manager();
    let mut handle = start_session(&engine, &manager, "room1").await;

    let half = vec![0u8; AUDIO_CHUNK_BYTES / 2];
    manager.feed_audio("room1", &half).await.unwrap();

    // Nothing dispatched yet
    assert!(handle.audio_rx.try_recv().is_err());

    manager.feed_audio("room1", &half).await.unwrap();
    let chunk = handle.audio_rx.recv().await.unwrap();
    assert_eq!(chunk.len(), AUDIO_CHUNK_BYTES);
}

#[tokio::test]
async fn starting_an_active_session_is_a_no_op() {
    let (engine, manager) = manager();
    let _handle = start_session(&engine, &manager, "room1").await;

    manager.start("room1").await.unwrap();
    assert!(manager.is_active("room1").await);

    // The no-op start did not open a second upstream stream
    assert!(engine.take_handle("room1").await.is_none());
}

#[tokio::test]
async fn stopping_without_a_session_succeeds_and_mutates_nothing() {
    let (_engine, manager) = manager();

    manager.stop("ghost").await.unwrap();
    assert!(!manager.is_active("ghost").await);
    assert!(manager.get_segments("ghost").await.is_none());
}

#[tokio::test]
async fn segments_are_append_only_while_active() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle.event_tx.send(final_segment("one")).await.unwrap();
    handle.event_tx.send(final_segment("two")).await.unwrap();
    wait_for_segments(&manager, "room1", 2).await;
    let earlier = manager.get_segments("room1").await.unwrap();

    handle.event_tx.send(final_segment("three")).await.unwrap();
    wait_for_segments(&manager, "room1", 3).await;
    let later = manager.get_segments("room1").await.unwrap();

    assert_eq!(later.len(), earlier.len() + 1);
    for (a, b) in earlier.iter().zip(later.iter()) {
        assert_eq!(a.text, b.text);
    }
}

#[tokio::test]
async fn blank_segments_are_dropped() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle
        .event_tx
        .send(SpeechEvent::Segment(SegmentEvent {
            text: "   ".to_string(),
            is_final: true,
            confidence: None,
            words: Vec::new(),
        }))
        .await
        .unwrap();
    handle.event_tx.send(final_segment("kept")).await.unwrap();
    wait_for_segments(&manager, "room1", 1).await;

    let segments = manager.get_segments("room1").await.unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "kept");
}

#[tokio::test]
async fn speaker_comes_from_word_annotations() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle
        .event_tx
        .send(SpeechEvent::Segment(SegmentEvent {
            text: "hi there".to_string(),
            is_final: true,
            confidence: None,
            words: vec![WordInfo {
                word: "hi".to_string(),
                start: 0.0,
                end: 0.4,
                speaker: Some(1),
            }],
        }))
        .await
        .unwrap();
    handle.event_tx.send(final_segment("untagged")).await.unwrap();
    wait_for_segments(&manager, "room1", 2).await;

    let segments = manager.get_segments("room1").await.unwrap();
    assert_eq!(segments[0].speaker, "speaker_1");
    assert_eq!(segments[1].speaker, "unknown");
}

#[tokio::test]
async fn interim_segments_are_kept_but_excluded_from_the_summary() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle
        .event_tx
        .send(SpeechEvent::Segment(SegmentEvent {
            text: "hel".to_string(),
            is_final: false,
            confidence: Some(0.4),
            words: Vec::new(),
        }))
        .await
        .unwrap();
    handle.event_tx.send(final_segment("hello")).await.unwrap();
    handle.event_tx.send(final_segment("world")).await.unwrap();
    wait_for_segments(&manager, "room1", 3).await;

    assert_eq!(manager.get_segments("room1").await.unwrap().len(), 3);
    assert_eq!(
        manager.get_summary_text("room1").await.as_deref(),
        Some("hello world")
    );
}

#[tokio::test]
async fn an_upstream_error_keeps_captured_segments() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle.event_tx.send(final_segment("partial context")).await.unwrap();
    wait_for_segments(&manager, "room1", 1).await;

    handle
        .event_tx
        .send(SpeechEvent::Error("stream reset".to_string()))
        .await
        .unwrap();

    // The session goes inactive but the transcript survives
    for _ in 0..100 {
        if !manager.is_active("room1").await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!manager.is_active("room1").await);
    assert_eq!(
        manager.get_summary_text("room1").await.as_deref(),
        Some("partial context")
    );

    // Audio after the failure is dropped, not an error
    let silence = vec![0u8; AUDIO_CHUNK_BYTES];
    assert!(!manager.feed_audio("room1", &silence).await.unwrap());
}

#[tokio::test]
async fn stop_tears_down_and_clear_destroys() {
    let (engine, manager) = manager();
    let handle = start_session(&engine, &manager, "room1").await;

    handle.event_tx.send(final_segment("kept")).await.unwrap();
    wait_for_segments(&manager, "room1", 1).await;

    manager.stop("room1").await.unwrap();
    assert!(!manager.is_active("room1").await);
    // Stopped, not cleared: segments remain retrievable
    assert_eq!(manager.get_segments("room1").await.unwrap().len(), 1);

    manager.clear("room1").await;
    assert!(manager.get_segments("room1").await.is_none());
}

#[tokio::test]
async fn audio_for_an_unknown_session_is_dropped() {
    let (_engine, manager) = manager();
    let silence = vec![0u8; AUDIO_CHUNK_BYTES];
    assert!(!manager.feed_audio("ghost", &silence).await.unwrap());
}
