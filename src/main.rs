//! desktop-control-helper -- screen capture and input-automation front end.
//!
//! Runs inside its own app bundle so Screen Recording and Accessibility
//! grants attach to the helper rather than to whatever terminal invoked it.
//! Entry point: logging, configuration, backend selection, dispatch.

mod automation;
mod capture;
mod cli;
mod config;
mod display;
mod error;
mod permissions;
mod platform;
mod waiter;

use std::io;

use config::Config;
use platform::SystemPlatform;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::load();
    let platform = SystemPlatform::new();
    log::debug!("desktop-control-helper v{}", env!("CARGO_PKG_VERSION"));

    let code = cli::run(
        std::env::args_os(),
        &platform,
        &config,
        &mut io::stdout(),
        &mut io::stderr(),
    );
    std::process::exit(code);
}
