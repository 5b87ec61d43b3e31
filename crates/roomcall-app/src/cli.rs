use clap::Parser;

/// roomcall: join a multi-party video call room from the terminal.
#[derive(Parser, Debug)]
#[command(name = "roomcall", version, about)]
pub struct Args {
    /// Room to join.
    #[arg(short = 'r', long)]
    pub room: String,

    /// Name shown to other participants in chat.
    #[arg(short = 'n', long, default_value = "guest")]
    pub name: String,

    /// Relay URL override.
    #[arg(long)]
    pub relay: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
