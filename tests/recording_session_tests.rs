// Tests for the dual-timeout recording state machine.
//
// Frames carry their own timestamps, so endpointing is exercised
// without sleeping: a "loud" frame renews the silence deadline and the
// hard cap ends the utterance regardless of continued speech.

use ambient_scribe::{CaptureConfig, Frame, RecordingSession, SessionStatus};

const LOUD: i16 = 8000; // ~244 on the normalized scale
const THRESHOLD: f32 = 100.0;
const TIMEOUT_MS: u64 = 500;
const MAX_MS: u64 = 10_000;

fn capture_config() -> CaptureConfig {
    CaptureConfig {
        sample_rate: 16_000,
        channels: 1,
        sample_width: 2,
        frame_samples: 1_600, // 100ms frames
    }
}

fn frame(amplitude: i16, timestamp_ms: u64, config: &CaptureConfig) -> Frame {
    let samples = config.frame_samples * config.channels as usize;
    Frame {
        pcm: std::iter::repeat(amplitude.to_le_bytes())
            .take(samples)
            .flatten()
            .collect(),
        timestamp_ms,
    }
}

fn session_from_loud_trigger(config: &CaptureConfig, max_ms: u64) -> RecordingSession {
    RecordingSession::begin(frame(LOUD, 0, config), *config, THRESHOLD, TIMEOUT_MS, max_ms)
}

#[test]
fn finalizes_one_grace_period_after_last_loud_frame() {
    let config = capture_config();
    let mut session = session_from_loud_trigger(&config, MAX_MS);

    // Silence through the end of the grace period keeps recording.
    for ts in (100..=500).step_by(100) {
        let status = session.step(frame(0, ts, &config)).unwrap();
        assert!(
            matches!(status, SessionStatus::Recording),
            "should still be recording at {}ms",
            ts
        );
    }

    // First frame past the deadline ends the utterance.
    let status = session.step(frame(0, 600, &config)).unwrap();
    let SessionStatus::Complete(recording) = status else {
        panic!("expected completion at 600ms");
    };

    // Trigger frame plus six silent frames, all appended in order.
    assert_eq!(recording.pcm.len(), 7 * config.frame_bytes());
}

#[test]
fn loud_frames_renew_the_silence_deadline() {
    let config = capture_config();
    let mut session = session_from_loud_trigger(&config, MAX_MS);

    // A second of continuous speech.
    for ts in (100..=1000).step_by(100) {
        let status = session.step(frame(LOUD, ts, &config)).unwrap();
        assert!(matches!(status, SessionStatus::Recording));
    }

    // Deadline was pushed to 1500ms by the frame at 1000ms.
    for ts in (1100..=1500).step_by(100) {
        let status = session.step(frame(0, ts, &config)).unwrap();
        assert!(
            matches!(status, SessionStatus::Recording),
            "grace period should still be open at {}ms",
            ts
        );
    }

    let status = session.step(frame(0, 1600, &config)).unwrap();
    assert!(matches!(status, SessionStatus::Complete(_)));
}

#[test]
fn hard_cap_ends_the_utterance_despite_continued_speech() {
    let config = capture_config();
    let max_ms = 1_000;
    let mut session = session_from_loud_trigger(&config, max_ms);

    for ts in (100..=900).step_by(100) {
        let status = session.step(frame(LOUD, ts, &config)).unwrap();
        assert!(matches!(status, SessionStatus::Recording));
    }

    // Elapsed time hits the cap exactly; loudness no longer matters.
    let status = session.step(frame(LOUD, 1_000, &config)).unwrap();
    let SessionStatus::Complete(recording) = status else {
        panic!("expected completion at the hard cap");
    };
    assert_eq!(recording.pcm.len(), 11 * config.frame_bytes());
}

#[test]
fn malformed_frame_is_reported_without_corrupting_the_session() {
    let config = capture_config();
    let mut session = session_from_loud_trigger(&config, MAX_MS);

    let bad = Frame {
        pcm: vec![0u8; 3],
        timestamp_ms: 100,
    };
    assert!(session.step(bad).is_err());

    // The session continues as if the bad frame never arrived.
    let status = session.step(frame(0, 200, &config)).unwrap();
    assert!(matches!(status, SessionStatus::Recording));
    let status = session.step(frame(0, 600, &config)).unwrap();
    let SessionStatus::Complete(recording) = status else {
        panic!("expected completion");
    };
    // Only the trigger and the two well-formed silent frames were kept.
    assert_eq!(recording.pcm.len(), 3 * config.frame_bytes());
}

#[test]
fn frames_are_appended_in_capture_order() {
    let config = capture_config();
    let mut session = session_from_loud_trigger(&config, MAX_MS);

    let second = frame(9000, 100, &config);
    assert!(matches!(
        session.step(second).unwrap(),
        SessionStatus::Recording
    ));

    let SessionStatus::Complete(recording) = session.step(frame(0, 700, &config)).unwrap() else {
        panic!("expected completion");
    };

    let frame_bytes = config.frame_bytes();
    assert_eq!(&recording.pcm[..2], &LOUD.to_le_bytes());
    assert_eq!(&recording.pcm[frame_bytes..frame_bytes + 2], &9000i16.to_le_bytes());
    assert_eq!(&recording.pcm[2 * frame_bytes..2 * frame_bytes + 2], &0i16.to_le_bytes());
}

#[test]
fn timestamp_key_uses_the_compact_format() {
    let config = capture_config();
    let mut session = session_from_loud_trigger(&config, MAX_MS);
    let SessionStatus::Complete(recording) = session.step(frame(0, 600, &config)).unwrap() else {
        panic!("expected completion");
    };
    let key = recording.timestamp_key();
    assert_eq!(key.len(), 14);
    assert!(key.chars().all(|c| c.is_ascii_digit()));
}
