use super::*;
use crate::config::GatescanConfig;

fn test_config() -> GatescanConfig {
    let mut config = GatescanConfig::default();
    config.camera.resolution = (64, 48);
    config.camera.fps = 60;
    config.feedback.enabled = false;
    config.system.console_enabled = false;
    config
}

#[tokio::test]
async fn initialize_registers_component_states() {
    let mut orchestrator = GatescanOrchestrator::new(test_config()).await.unwrap();
    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("scanner"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("overlay"), Some(&ComponentState::Stopped));
    assert!(!states.contains_key("console"));
}

#[tokio::test]
async fn console_component_registers_when_enabled() {
    let mut config = test_config();
    config.system.console_enabled = true;
    let mut orchestrator = GatescanOrchestrator::new(config).await.unwrap();
    orchestrator.initialize().await.unwrap();

    assert_eq!(
        orchestrator.get_component_state("console").await,
        Some(ComponentState::Stopped)
    );
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
mod synthetic {
    use super::*;

    #[tokio::test]
    async fn start_then_shutdown_cycles_cleanly() {
        let mut orchestrator = GatescanOrchestrator::new(test_config()).await.unwrap();
        orchestrator.initialize().await.unwrap();
        orchestrator.start().await.unwrap();

        assert_eq!(
            orchestrator.get_component_state("scanner").await,
            Some(ComponentState::Running)
        );
        assert_eq!(
            orchestrator.get_component_state("overlay").await,
            Some(ComponentState::Running)
        );

        let exit_code = orchestrator.shutdown().await.unwrap();
        assert_eq!(exit_code, 0);
        assert_eq!(
            orchestrator.get_component_state("scanner").await,
            Some(ComponentState::Stopped)
        );
    }

    #[tokio::test]
    async fn camera_failure_is_not_fatal_to_startup() {
        let mut config = test_config();
        config.camera.index = 99; // no such synthetic device
        let mut orchestrator = GatescanOrchestrator::new(config).await.unwrap();
        orchestrator.initialize().await.unwrap();

        // startup succeeds; the scanner is merely marked failed for retry
        orchestrator.start().await.unwrap();
        assert_eq!(
            orchestrator.get_component_state("scanner").await,
            Some(ComponentState::Failed)
        );

        let exit_code = orchestrator.shutdown().await.unwrap();
        assert_eq!(exit_code, 0);
    }

    #[tokio::test]
    async fn shutdown_is_safe_before_start() {
        let mut orchestrator = GatescanOrchestrator::new(test_config()).await.unwrap();
        orchestrator.initialize().await.unwrap();
        let exit_code = orchestrator.shutdown().await.unwrap();
        assert_eq!(exit_code, 0);
    }
}
