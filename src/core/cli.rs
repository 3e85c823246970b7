use clap::{arg, command, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    #[arg(short, long)]
    pub configuration_file: Option<String>,
    #[arg(short, long)]
    pub verbosity: Option<log::LevelFilter>,
}

#[derive(Subcommand)]
pub enum Command {
    /// requests a verification session and sends the user to the provider
    Start,
    /// follows the status of a verification session until it settles
    Complete {
        /// session to follow, defaults to the one stored by `start`
        #[arg(short, long)]
        session_id: Option<String>,
    },
    /// opens a client location, e.g. the return url sent back by the provider
    Navigate {
        /// `/`, `/complete?session_id=...` or an absolute url
        location: String,
    },
}
