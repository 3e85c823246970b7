use clap::Parser;
use crate::core::{
    cli::{Cli, Command},
    configuration::{get_configuration, Configuration},
    logger::IgnoreReqwest,
};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info, LevelFilter};

mod core;
mod screens;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let conf = match &cli.configuration_file {
        Some(path) => get_configuration(path.to_owned()).await?,
        None => Configuration::default(),
    };

    let _logger = init_logger(&conf, cli.verbosity)
        .map_err(|e| format!("cannot start logger: {e}"))?;

    info!(
        "{} {} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let result = match cli.command {
        Command::Start => crate::core::core::start(&conf).await,
        Command::Complete { session_id } => crate::core::core::complete(&conf, session_id).await,
        Command::Navigate { location } => crate::core::core::navigate(&conf, &location).await,
    };

    if let Err(e) = &result {
        error!("{e}");
    }

    result
}

fn init_logger(
    conf: &Configuration,
    verbosity: Option<LevelFilter>,
) -> Result<LoggerHandle, FlexiLoggerError> {
    let level = match verbosity {
        Some(v) => v.to_string(),
        None => conf.log_level(),
    };

    let handle = Logger::try_with_str(level.to_lowercase())?
        .log_to_file(
            FileSpec::default()
                .directory(conf.data_directory())
                .basename("stripe-identity-client"),
        )
        .filter(Box::new(IgnoreReqwest))
        .duplicate_to_stderr(Duplicate::Warn)
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(conf.log_retention()),
        )
        .write_mode(WriteMode::Async)
        .start()?;

    Ok(handle)
}
