//! Control an MPlayer process in slave mode through properties discovered at startup.

pub mod config;
pub mod console;
pub mod mplayer;

pub use config::PlayerConfig;
pub use mplayer::{Player, PlayerError, PropertyValue};

/// Entry point of the `mplayer-ctl` binary.
pub fn run() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let runtime = match tokio::runtime::Runtime::new() {
    Ok(runtime) => runtime,
    Err(e) => {
      log::error!("Failed to start tokio runtime: {}", e);
      std::process::exit(1);
    }
  };

  let args: Vec<String> = std::env::args().skip(1).collect();
  if let Err(e) = runtime.block_on(console::start(args)) {
    log::error!("{}", e);
    std::process::exit(1);
  }
}
