//! clara - browse the MangaDex catalog from the terminal
//!
//! Lists, searches and inspects series, prints chapter page URLs, and keeps a
//! small local library of bookmarks, history and reading progress.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use clara::cli::Cli;
use clara::commands::{self, Format};
use clara::config::ClientConfig;
use clara::data::MangaClient;
use clara::logging;
use clara::store::LibraryStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config)?;

    let library = LibraryStore::new();
    let mut client = MangaClient::new(config)?.with_sweeper();
    if let Some(library) = &library {
        client = client.with_bookmarks(Arc::new(library.clone()));
    }

    let format = if cli.json { Format::Json } else { Format::Text };
    let output = commands::run(&cli.command, &client, library.as_ref(), format).await?;
    println!("{}", output);

    client.shutdown().await;

    Ok(())
}
