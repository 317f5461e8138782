mod app;
mod config;
mod prompt;

use clap::Parser;
use engine_logging::engine_debug;

use crate::config::{load_file_config, resolve, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();
    let file_config = load_file_config(&config_path)?;
    let config = resolve(args, file_config)?;
    engine_logging::initialize(&config.log_destination, config.log_level);
    engine_debug!("configuration file: {:?}", config_path);

    app::run(config).await
}
