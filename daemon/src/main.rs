use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use fleetguard_daemon::executor::Pm2Executor;
use fleetguard_daemon::inventory::Pm2Inventory;
use fleetguard_daemon::notifier::ClickUpNotifier;
use fleetguard_daemon::regulator::Regulator;
use fleetguard_shared::logging::{self, LogLevel};
use fleetguard_shared::{log_info, log_system, log_warn, Config};

#[derive(Parser)]
#[command(name = "fleetguard")]
#[command(about = "Regulate memory usage of PM2-supervised process fleets")]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (default: auto-detect)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll interval override in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single regulation cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 設定の解決: 明示パス > 自動検出 > デフォルト
    let mut loaded_from = None;
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => match Config::load_auto()? {
            Some((config, path)) => {
                loaded_from = Some(path);
                config
            }
            None => Config::default(),
        },
    };

    config.apply_env_overrides();

    // CLIフラグは設定ファイルより優先
    if cli.verbose {
        config.logging.verbose = true;
    }
    if let Some(interval) = cli.interval {
        config.monitor.poll_interval_secs = interval;
    }

    setup_logging(&config)?;

    if let Some(path) = loaded_from {
        log_system!(info, "Loaded config from {}", path.display());
    }
    if config.clickup.api_token.is_empty() {
        log_system!(warn, "ClickUp API token is not set, notifications will fail");
    }

    // 外部コラボレータの組み立て
    let inventory = Arc::new(Pm2Inventory::from_settings(&config.pm2));
    let executor = Arc::new(Pm2Executor::from_settings(&config.pm2));
    let notifier = Arc::new(ClickUpNotifier::new(&config.clickup)?);

    let mut regulator = Regulator::new(&config.monitor, inventory, notifier, executor);

    if cli.once {
        regulator.run_cycle().await;
        return Ok(());
    }

    // Ctrl-C まで回し続ける
    tokio::select! {
        _ = regulator.run() => {}
        _ = tokio::signal::ctrl_c() => {
            log_system!(info, "Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}

/// ログレベルと出力先を設定に合わせて初期化
fn setup_logging(config: &Config) -> anyhow::Result<()> {
    if config.logging.verbose {
        logging::set_log_level(LogLevel::Debug);
    }

    if let Some(ref log_file) = config.logging.log_file {
        if let Some(parent) = log_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;
        let file = std::sync::Mutex::new(file);

        logging::set_log_output(move |line| {
            use std::io::Write;
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{line}");
            }
        });
    }

    Ok(())
}
