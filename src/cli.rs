use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Device Registry - register network devices and watch them change live

Devices are identified by a unique MAC address and carry an ACTIVE or
INACTIVE status. Every creation and status change is pushed to connected
WebSocket observers on /ws.

Environment:
  DEVICE_REGISTRY_HOST / _PORT / _DB / _STATIC_DIR   Server settings
  DEVICE_REGISTRY_LLM_ENDPOINT / _API_KEY / _MODEL   Generated descriptions
  DEVICE_REGISTRY_LLM_TIMEOUT_SECS                   Description timeout
  DEVICE_REGISTRY_LOG_FILE                           Log to a rotated file
  DEVICE_REGISTRY_LOG_RETENTION_DAYS                 Rotated log retention
"#;

#[derive(Parser, Clone)]
#[command(name = "device-registry")]
#[command(about = "Device registry with live status broadcast")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start the HTTP and WebSocket server
    Serve(ServeArgs),

    /// Print every registered device as JSON
    List {
        /// Database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory of static files served for unmatched routes
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}
