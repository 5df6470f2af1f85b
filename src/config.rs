use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Multi-user to-do list server with a free tier and a pro tier
#[derive(Debug, Clone, Parser)]
#[command(name = "pro-todos")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TODOS_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Emit JSON log lines instead of plain text
    #[arg(long, env = "TODOS_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    // filter comes from RUST_LOG, falling back to `info`
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if self.log_json {
            builder.json().init();
        } else {
            builder.init();
        }
    }
}
