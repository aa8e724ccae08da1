use super::*;
use crate::config::CameraConfig;
use crate::frame_well::FrameWell;
use std::sync::Arc;
use std::time::Duration;

fn test_camera_config() -> CameraConfig {
    CameraConfig {
        index: 0,
        resolution: (64, 48),
        fps: 60,
    }
}

#[tokio::test]
async fn session_starts_idle() {
    match CameraSession::new(test_camera_config()).await {
        Ok(session) => {
            assert!(!session.is_capturing());
            assert_eq!(session.frame_count(), 0);
        }
        Err(crate::error::GatescanError::Camera(_)) => {
            // Expected when no camera stack is available in CI
            println!("Camera not available - test passed");
        }
        Err(e) => panic!("Unexpected error creating camera session: {}", e),
    }
}

#[tokio::test]
async fn stop_is_idempotent_without_start() {
    let session = match CameraSession::new(test_camera_config()).await {
        Ok(session) => session,
        Err(_) => return,
    };

    session.stop_capture().await;
    session.stop_capture().await;
    session.stop_capture().await;
    assert!(!session.is_capturing());
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
mod synthetic {
    use super::*;

    #[tokio::test]
    async fn capture_feeds_the_frame_well() {
        let session = CameraSession::new(test_camera_config()).await.unwrap();
        let well = Arc::new(FrameWell::new(4));

        session.start_capture(Arc::clone(&well)).await.unwrap();
        assert!(session.is_capturing());

        // wait for a few synthetic frames
        for _ in 0..50 {
            if well.frames_pushed() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(well.frames_pushed() >= 3, "expected frames to flow");
        assert!(well.latest().await.is_some());

        session.stop_capture().await;
        assert!(!session.is_capturing());
    }

    #[tokio::test]
    async fn start_on_missing_device_fails_and_stop_stays_safe() {
        let config = CameraConfig {
            index: 99,
            resolution: (64, 48),
            fps: 30,
        };
        let session = CameraSession::new(config).await.unwrap();
        let well = Arc::new(FrameWell::new(4));

        let result = session.start_capture(Arc::clone(&well)).await;
        assert!(matches!(
            result,
            Err(crate::error::GatescanError::Camera(
                crate::error::CameraError::DeviceOpen { .. }
            ))
        ));
        assert!(!session.is_capturing());

        // stop after a failed start must not panic or hang
        session.stop_capture().await;
        session.stop_capture().await;
    }

    #[tokio::test]
    async fn double_start_is_a_no_op() {
        let session = CameraSession::new(test_camera_config()).await.unwrap();
        let well = Arc::new(FrameWell::new(4));

        session.start_capture(Arc::clone(&well)).await.unwrap();
        session.start_capture(Arc::clone(&well)).await.unwrap();
        session.stop_capture().await;
    }
}
