//! pg-slicer: dump a referentially consistent sample of a PostgreSQL
//! database.
//!
//! # Security Guarantees
//! - Read-only database sessions
//! - Passwords never logged
//! - Output written only after every query succeeded

use anyhow::Context;
use clap::Parser;
use pgslicer::{Cli, output, prompt_password, resolve};
use pgslicer_core::{ConfigFile, adapters::create_adapter, dump::generate_dump, logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet).context("initializing logging")?;

    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = ConfigFile::discover(cli.config.as_deref()).context("loading configuration")?;
    let mut settings = resolve(&cli, file).context("resolving settings")?;

    if cli.password_prompt {
        let password = prompt_password(&settings.connection)?;
        settings.connection = settings.connection.with_password(Some(password));
    }

    info!("Target: {}", settings.connection);

    let adapter = create_adapter(&settings.connection).context("creating database adapter")?;
    adapter
        .test_connection()
        .await
        .with_context(|| format!("connecting to {}", settings.connection))?;

    let dump = generate_dump(adapter.as_ref(), &settings.options)
        .await
        .context("generating dump")?;

    output::write_dump(&dump.render(), cli.output.as_deref())
        .await
        .context("writing dump")?;

    info!(
        "✓ Dump completed: {} rows from {} tables",
        dump.summary.rows_sampled, dump.summary.tables_sampled
    );
    if dump.summary.relaxed_edges > 0 {
        info!(
            "{} foreign keys were ignored for ordering because of cycles",
            dump.summary.relaxed_edges
        );
    }

    Ok(())
}
