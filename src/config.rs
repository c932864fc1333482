use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments, each with an environment fallback.
#[derive(Parser, Debug, Clone)]
#[command(name = "shared_scheduler")]
#[command(about = "Calendar planner backend with free-time computation and group task sync")]
#[command(version)]
pub struct Config {
    /// Host to bind to.
    #[arg(long, env = "SCHEDULER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory holding the JSON documents.
    #[arg(long, env = "SCHEDULER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory of the web client, served at `/`.
    #[arg(long, env = "SCHEDULER_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Log level, used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
