use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use pagesync::document::Document;
use pagesync::notion::{NotionClient, PageOps};
use pagesync::sync::{markdown_files, PullSync, PushSync};
use pagesync::SyncError;

#[derive(Parser, Debug)]
#[command(
    name = "pagesync",
    version,
    about = "Sync a local Markdown tree with a Notion page hierarchy"
)]
struct Cli {
    /// Directory of markdown documents to sync
    directory: PathBuf,

    /// Log intended actions without touching the remote workspace
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Remote root page id (falls back to NOTION_ROOT_PAGE_ID)
    #[arg(long)]
    root_page_id: Option<String>,

    /// Pull remote pages into the directory instead of pushing. Pull always
    /// writes locally, so it cannot be combined with --dry-run.
    #[arg(long, conflicts_with = "dry_run")]
    pull: bool,

    /// Archive the given remote page, then exit
    #[arg(long, value_name = "PAGE_ID")]
    archive: Option<String>,

    /// List every page and database the integration token can see, then exit
    #[arg(long)]
    list_access: bool,

    /// Strip stored page ids from all local documents, then exit
    #[arg(long)]
    clear_ids: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            error!("{failed} file(s) failed to sync");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<usize> {
    if cli.clear_ids {
        clear_ids(&cli.directory)?;
        return Ok(0);
    }

    let connect = || -> anyhow::Result<PageOps<NotionClient>> {
        let token = std::env::var("NOTION_TOKEN").context("NOTION_TOKEN is not set")?;
        Ok(PageOps::new(NotionClient::new(&token)?))
    };

    if cli.list_access {
        for result in connect()?.search_all()? {
            println!("{:<10} {}  {}", result.object, result.id, result.title);
        }
        return Ok(0);
    }

    if let Some(page_id) = &cli.archive {
        connect()?.archive_page(page_id)?;
        return Ok(0);
    }

    let root_page_id = cli
        .root_page_id
        .clone()
        .or_else(|| std::env::var("NOTION_ROOT_PAGE_ID").ok())
        .ok_or(SyncError::MissingRoot)?;

    if cli.pull {
        let mut engine = PullSync::new(connect()?, &cli.directory);
        let stats = engine.run(&root_page_id)?;
        return Ok(stats.failed);
    }

    // Dry runs work without credentials; a real push requires them.
    let ops = if cli.dry_run {
        connect().ok()
    } else {
        Some(connect()?)
    };
    let mut engine = PushSync::new(ops, &root_page_id, &cli.directory, cli.dry_run);
    let stats = engine.run()?;
    Ok(stats.failed)
}

fn clear_ids(directory: &Path) -> anyhow::Result<()> {
    let mut cleared = 0;
    for path in markdown_files(directory) {
        let mut doc = Document::load(&path)?;
        if doc.identity.take().is_some() {
            doc.save(&path)?;
            info!("Cleared page id from {}", path.display());
            cleared += 1;
        }
    }
    info!("Cleared {cleared} document(s)");
    Ok(())
}
