use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use curation_core::{
    CdnImageResolver, CurationAccess, CurationApi, CurationScreen, GalleryFeed, HttpCurationApi,
    ImageUrlResolver, PassthroughResolver, SaveOutcome, SessionProvider,
};
use serde::Serialize;
use shared::{
    domain::CollectionKey,
    protocol::{GalleryQuery, GallerySort},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod ops;

use config::{load_settings, Settings, DEFAULT_CONFIG_PATH};
use ops::EditOp;

#[derive(Parser, Debug)]
#[command(about = "Curate the homepage carousel and featured collections")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    page_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current selection and the candidates of a collection.
    Show {
        #[arg(long, value_enum)]
        collection: CollectionArg,
        /// Candidate pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Apply edits in order and save them as one change set.
    Edit {
        #[arg(long, value_enum)]
        collection: CollectionArg,
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long = "op", required = true)]
        ops: Vec<EditOp>,
        /// Print the pending change set without saving.
        #[arg(long)]
        dry_run: bool,
    },
    /// Browse the public gallery.
    Gallery {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollectionArg {
    Carousel,
    Featured,
}

impl From<CollectionArg> for CollectionKey {
    fn from(value: CollectionArg) -> Self {
        match value {
            CollectionArg::Carousel => CollectionKey::carousel(),
            CollectionArg::Featured => CollectionKey::featured(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl From<SortArg> for GallerySort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Newest => GallerySort::Newest,
            SortArg::Oldest => GallerySort::Oldest,
            SortArg::PriceAsc => GallerySort::PriceAsc,
            SortArg::PriceDesc => GallerySort::PriceDesc,
            SortArg::Title => GallerySort::Title,
        }
    }
}

#[derive(Serialize)]
struct EditReport<'a> {
    outcome: &'a str,
    changes: Vec<shared::protocol::ChangeEntry>,
    view: curation_core::ScreenView,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(api_url) = cli.api_url.clone() {
        settings.api_url = api_url;
    }
    if let Some(token) = cli.token.clone() {
        settings.bearer_token = Some(token);
    }
    if let Some(page_size) = cli.page_size {
        settings.page_size = page_size;
    }

    let api = Arc::new(
        HttpCurationApi::new(&settings.api_url, settings.bearer_token.clone())
            .with_context(|| format!("invalid api url '{}'", settings.api_url))?,
    );
    info!(api_url = %settings.api_url, "curator starting");

    match cli.command {
        Command::Show { collection, pages } => {
            let screen = open_screen(api, &settings, collection.into()).await?;
            load_pages(&screen, pages).await?;
            print_json(&screen.view().await)
        }
        Command::Edit {
            collection,
            pages,
            ops,
            dry_run,
        } => {
            let screen = open_screen(api, &settings, collection.into()).await?;
            load_pages(&screen, pages).await?;
            for op in &ops {
                if !op.apply(&screen).await? {
                    warn!(?op, "edit had no effect");
                }
            }

            let (outcome, changes) = if dry_run {
                let store = screen.store_snapshot().await;
                let changes = store.diff(&store.saved_snapshot()).into_entries();
                ("dry-run", changes)
            } else {
                match screen.save().await? {
                    SaveOutcome::Committed(changes) => ("saved", changes.into_entries()),
                    SaveOutcome::NothingToSave => ("unchanged", Vec::new()),
                    SaveOutcome::Busy => ("busy", Vec::new()),
                    SaveOutcome::SelectionIncomplete => ("incomplete", Vec::new()),
                }
            };
            print_json(&EditReport {
                outcome,
                changes,
                view: screen.view().await,
            })
        }
        Command::Gallery {
            search,
            category,
            tags,
            sort,
            pages,
        } => {
            let feed = GalleryFeed::spawn(api, settings.curation_config());
            feed.apply_query(GalleryQuery {
                search,
                category,
                tags,
                sort: sort.into(),
            })
            .await?;
            for _ in 1..pages {
                feed.load_more().await?;
            }
            print_json(&feed.view().await)
        }
    }
}

async fn open_screen(
    api: Arc<HttpCurationApi>,
    settings: &Settings,
    collection: CollectionKey,
) -> Result<Arc<CurationScreen>> {
    let session = api.session().await.context("failed to resolve session")?;
    let access = CurationAccess::from_session(&session);
    if !access.can_edit() {
        warn!(role = %session.role, %collection, "read-only session");
    }

    let screen = CurationScreen::new_with_dependencies(
        collection,
        api as Arc<dyn CurationApi>,
        image_resolver(settings)?,
        access,
        settings.curation_config(),
    );
    screen.load_initial().await?;
    Ok(screen)
}

/// Loads the whole current selection, which saving requires, and `pages` pages of
/// candidates.
async fn load_pages(screen: &CurationScreen, pages: u32) -> Result<()> {
    while screen.view().await.has_more_selection {
        screen.load_more_selection().await?;
    }
    for _ in 1..pages {
        screen.load_more_candidates().await?;
    }
    Ok(())
}

fn image_resolver(settings: &Settings) -> Result<Arc<dyn ImageUrlResolver>> {
    match &settings.cdn_base_url {
        Some(base) => Ok(Arc::new(
            CdnImageResolver::new(base, settings.cdn_transform.clone())
                .with_context(|| format!("invalid cdn base url '{base}'"))?,
        )),
        None => Ok(Arc::new(PassthroughResolver)),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
