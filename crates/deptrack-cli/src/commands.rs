use deptrack_server::{DeptrackServer, ServerConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::InitDb(args) => cmd_init_db(args).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dsn) = args.rw_dsn {
        config.rw_dsn = Some(dsn);
    }
    if let Some(dsn) = args.ro_dsn {
        config.ro_dsn = Some(dsn);
    }
    if let Some(path) = args.statements_file {
        config.statements_file = Some(path);
    }

    DeptrackServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_init_db(args: InitDbArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dsn) = args.rw_dsn {
        config.rw_dsn = Some(dsn);
    }

    // Opening the store runs the schema creation statement.
    DeptrackServer::build_state(&config).await?;
    tracing::info!(backend = %config.backend, "graph schema is in place");
    println!("initialized {} schema", config.backend);
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ServerConfig> {
    Ok(match path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    })
}
