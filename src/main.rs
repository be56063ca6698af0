mod cmd;
mod config;
mod connection;
mod db;
mod dispatcher;
mod error;
mod macros;
mod server;
mod value;

use config::Config;
use flexi_logger::{FileSpec, Logger};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match env::args().nth(1) {
        Some(path) => config::parse(path).await?,
        None => Config::default(),
    };

    let mut logger = Logger::try_with_str(config.log.level.as_log_spec())?;
    if let Some(file) = &config.log.file {
        logger = logger.log_to_file(FileSpec::try_from(file.as_str())?);
    }
    logger.start()?;

    server::serve(config).await?;

    Ok(())
}
