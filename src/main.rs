use anyhow::Result;
use clap::Parser;
use gatescan::{GatescanConfig, GatescanOrchestrator};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gatescan")]
#[command(about = "Rust-based guest check-in scanner with QR decoding and remote check-in")]
#[command(version)]
#[command(long_about = "A guest check-in scanner for event entrances: acquires the camera, \
decodes guest QR codes, suppresses duplicate reads, checks guests in against the \
guest-management API, and drives haptic/audio feedback plus a success overlay for \
door staff.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gatescan.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the scanner")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Enable the operator keyboard console
    #[arg(long, help = "Enable the operator keyboard console (s/d/SPACE/q)")]
    console: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config();
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Gatescan v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match GatescanConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let mut orchestrator = GatescanOrchestrator::new(config).await.map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;

    if args.console {
        orchestrator.set_console_enabled(true);
    }

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start system: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Gatescan exited with code: {}", exit_code);

    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gatescan={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# Gatescan Configuration File");
    println!("# This is the default configuration with all available options");
    println!();

    let default_config = r#"[camera]
# Camera device index (e.g., 0 for /dev/video0)
index = 0
# Camera resolution (width, height)
resolution = [1280, 720]
# Frames per second
fps = 30

[decoder]
# Decode backend: "auto", "native", or "fallback"
backend = "auto"
# Poll interval of the fallback decoder in milliseconds
fallback_poll_ms = 200

[gate]
# Window during which a repeat of the last admitted token is suppressed
duplicate_window_ms = 1500
# Hold on the processing lock after an already-checked-in outcome
already_checked_in_cooldown_ms = 1500
# Hold on the processing lock after a failed check-in
failure_cooldown_ms = 2000

[checkin]
# Base URL of the guest-management API
base_url = "http://localhost:8000/api"
# Request timeout in milliseconds
timeout_ms = 5000

[feedback]
# Enable haptic/audio cues
enabled = true
# Sysfs timed-output vibrator path
haptic_device = "/sys/class/timed_output/vibrator/enable"
# Evdev beeper device path
beeper_device = "/dev/input/by-path/platform-pcspkr-event-spkr"

[overlay]
# Auto-dismiss delay for the success overlay in milliseconds
dismiss_ms = 4000
# Wristband color used when neither guest nor event specifies one
fallback_wristband = "blue"

[system]
# Frame well capacity (number of frame slots)
frame_well_capacity = 8
# Event bus capacity
event_bus_capacity = 100
# Enable the operator keyboard console
console_enabled = false
"#;

    println!("{}", default_config);
}
