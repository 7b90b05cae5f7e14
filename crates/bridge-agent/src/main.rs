use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{BridgeDefaults, ConnectRequest, PrintBridge, PrintMode};
use bridge_agent::job_file::JobFile;
use bridge_agent::session::Session;
use domain::event::EventPublisher;
use domain::{Dialect, PortFactory, SlotId, TransportKind};
use infrastructure::config::BridgeConfig;
use infrastructure::{
    BroadcastEventPublisher, DefaultPortFactory, HostRadioAdapter, LoggingEventPublisher,
    MockPortFactory, PortSettings,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Receipt,
    Label,
}

impl From<ModeArg> for PrintMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => PrintMode::Auto,
            ModeArg::Receipt => PrintMode::Receipt,
            ModeArg::Label => PrintMode::Label,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Send print jobs to a Bluetooth, USB or network printer", long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Printer address: MAC, /dev path or host[:port]
    #[arg(long)]
    address: String,

    /// Override the configured transport
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Override the configured dialect
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Override the configured slot id
    #[arg(long)]
    slot: Option<u32>,

    /// JSON print request to send
    #[arg(long)]
    job: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "auto")]
    mode: ModeArg,

    /// Print the printer's built-in self-test page
    #[arg(long)]
    self_test: bool,

    /// How long to keep listening for printer status before closing
    #[arg(long, default_value_t = 500)]
    listen_ms: u64,

    /// Record traffic in memory instead of opening a device
    #[arg(long)]
    dry_run: bool,
}

/// Falls back to the crate's own config dir when run from the workspace root
fn resolve_config_dir(requested: &str) -> String {
    let dev_dir = "crates/bridge-agent/config";
    if !Path::new(requested).exists() && Path::new(dev_dir).exists() {
        dev_dir.to_string()
    } else {
        requested.to_string()
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,bridge_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🖨️ Print Bridge Agent Starting...");

    let args = Args::parse();
    if args.job.is_none() && !args.self_test {
        bail!("nothing to do: pass --job <file> and/or --self-test");
    }

    // 1. Load Configuration
    let config_dir = resolve_config_dir(&args.config_dir);
    info!("📂 Config directory: {}", config_dir);
    let config = BridgeConfig::load(&config_dir)?;

    let defaults = BridgeDefaults {
        slot_id: SlotId::new(config.bridge.slot_id)?,
        transport: config.bridge.transport,
        dialect: config.bridge.dialect,
    };
    info!(
        slot = %defaults.slot_id,
        transport = %defaults.transport,
        dialect = %defaults.dialect,
        "✅ Loaded configuration"
    );

    // Parse the job before touching hardware
    let job = args.job.as_deref().map(JobFile::load).transpose()?;

    // 2. Transport
    let port_settings = PortSettings::from(&config.transport);
    let recorder = MockPortFactory::new(port_settings.read_window);
    let port_factory: Arc<dyn PortFactory> = if args.dry_run {
        info!("🧪 Dry run: no device will be opened");
        Arc::new(recorder.clone())
    } else {
        Arc::new(DefaultPortFactory::new(port_settings))
    };

    // 3. Bridge
    let radio = Arc::new(HostRadioAdapter::from_settings(&config.adapter));
    let sinks: Vec<Arc<dyn EventPublisher>> = vec![Arc::new(LoggingEventPublisher)];
    let bridge = PrintBridge::new(
        port_factory,
        radio,
        BroadcastEventPublisher::new(config.bridge.event_capacity),
        sinks,
        defaults,
    );
    let mut session = Session::new(
        bridge,
        Duration::from_millis(config.transport.connect_timeout_ms) + Duration::from_secs(1),
    );

    // 4. Connect
    let request = ConnectRequest {
        address: args.address.clone(),
        transport: args.transport,
        dialect: args.dialect,
        id: args.slot,
    };
    info!(address = %request.address, "🔌 Connecting...");
    if let Err(e) = session.connect(request).await {
        session.finish().await.ok();
        return Err(e);
    }

    // 5. Print
    let mut queued = Ok(());
    if args.self_test {
        queued = session.self_test();
    }
    if let (Some(job), true) = (&job, queued.is_ok()) {
        queued = session.print(job, args.mode.into());
    }

    session.listen(Duration::from_millis(args.listen_ms)).await;
    let finished = session.finish().await;

    if args.dry_run {
        let bytes = recorder.log().written_bytes();
        info!(len = bytes.len(), "🧪 Bytes that would be sent: {:02X?}", bytes);
    }

    queued?;
    finished
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        error!("❌ Bridge agent failed: {:#}", e);
        eprintln!("\n❌ ERROR: {:?}", e);
        std::process::exit(1);
    }
}
