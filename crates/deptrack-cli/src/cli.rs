use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "deptrack",
    about = "deptrack — dependency graph tracker",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the deptrack REST server
    Serve(ServeArgs),
    /// Create the graph schema against the configured backend and exit
    InitDb(InitDbArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:7785
    #[arg(long)]
    pub bind: Option<std::net::SocketAddr>,

    /// Storage engine: sqlite, postgres, or mysql
    #[arg(long)]
    pub backend: Option<String>,

    /// Read-write connection string
    #[arg(long, env = "DEPTRACK_RW_DSN")]
    pub rw_dsn: Option<String>,

    /// Read-only connection string (e.g. a replica)
    #[arg(long, env = "DEPTRACK_RO_DSN")]
    pub ro_dsn: Option<String>,

    /// YAML file overriding individual SQL statements
    #[arg(long)]
    pub statements_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct InitDbArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub backend: Option<String>,

    #[arg(long, env = "DEPTRACK_RW_DSN")]
    pub rw_dsn: Option<String>,
}
