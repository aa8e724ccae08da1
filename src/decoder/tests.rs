use super::*;
use crate::config::DecoderConfig;
use crate::frame::{FrameData, FrameFormat};
use crate::scan::DedupGate;
use std::time::{Duration, SystemTime};

fn decoder_config(backend: &str) -> DecoderConfig {
    DecoderConfig {
        backend: backend.to_string(),
        fallback_poll_ms: 10,
    }
}

#[test]
fn explicit_backend_overrides_are_honored() {
    assert_eq!(
        select_backend(&decoder_config("native")),
        BackendKind::Native
    );
    assert_eq!(
        select_backend(&decoder_config("fallback")),
        BackendKind::Fallback
    );
}

#[test]
fn auto_selection_matches_platform_capability() {
    let expected = if cfg!(all(target_os = "linux", feature = "camera")) {
        BackendKind::Native
    } else {
        BackendKind::Fallback
    };
    assert_eq!(select_backend(&decoder_config("auto")), expected);
}

#[test]
fn created_backend_reports_selected_kind() {
    let backend = create_backend(&decoder_config("fallback"), 30);
    assert_eq!(backend.kind(), BackendKind::Fallback);

    let backend = create_backend(&decoder_config("native"), 30);
    assert_eq!(backend.kind(), BackendKind::Native);
}

#[test]
fn blank_frame_is_a_transient_miss() {
    let frame = FrameData::new(
        1,
        SystemTime::now(),
        vec![200; 64 * 48],
        64,
        48,
        FrameFormat::Gray8,
    );
    assert!(decode_frame(&frame).is_none());
}

#[test]
fn malformed_frame_is_a_transient_miss() {
    let frame = FrameData::new(2, SystemTime::now(), vec![1, 2, 3], 64, 48, FrameFormat::Mjpeg);
    assert!(decode_frame(&frame).is_none());
}

#[tokio::test]
async fn polling_decoder_runs_quietly_over_codeless_frames() {
    let well = std::sync::Arc::new(crate::frame_well::FrameWell::new(2));
    well.push_frame(FrameData::new(
        1,
        SystemTime::now(),
        vec![128; 64 * 48],
        64,
        48,
        FrameFormat::Gray8,
    ))
    .await;

    let decoder = PollingDecoder::new(5);
    let gate = std::sync::Arc::new(DedupGate::new(Duration::from_millis(1500)));
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);

    decoder
        .start(std::sync::Arc::clone(&well), tx, gate)
        .await
        .unwrap();

    // give the loop a few polls; no payloads should appear
    tokio::time::sleep(Duration::from_millis(50)).await;
    decoder.stop().await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn backend_stop_without_start_is_harmless() {
    let decoder = PollingDecoder::new(5);
    decoder.stop().await;

    let native = NativeDetector::new(30);
    native.stop().await;
}
