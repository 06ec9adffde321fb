//! lightroom-rs: finds rejected photos in an Adobe Lightroom Cloud catalog
//! and cleans up the matching JPEG/RAF pairs on local disk.
//!
//! Authentication is Adobe IMS OAuth (PKCE for public clients). The catalog
//! is walked with cursor pagination, filtered by review flag and year, and
//! the resulting records drive a dry-run-first local deletion pass.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod dates;
mod filter;
mod lightroom;
mod output;
mod reconcile;
mod records;
pub mod retry;
#[cfg(test)]
mod test_support;
mod types;

use std::collections::HashSet;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use auth::{AuthError, OAuthClient, PkcePair, TokenManager, TokenStatus};
use cli::{AuthCommand, Command};
use config::{expand_tilde, Config};
use filter::FilterCriteria;
use lightroom::{Asset, LightroomClient};
use reconcile::{AlwaysYes, Confirm, ReconcileConfig, Reconciler, StdinConfirm};
use records::RejectedRecord;
use types::OutputFormat;

fn create_spinner(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Ask a yes/no question on stdin; anything but `y` is a no.
fn prompt_yes_no(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn token_manager(config: &Config) -> anyhow::Result<TokenManager> {
    let oauth = OAuthClient::new(config.oauth_settings()?)?;
    Ok(TokenManager::new(&config.config_dir, oauth))
}

/// Build an API client from a valid (possibly just refreshed) token.
async fn api_client(config: &Config) -> anyhow::Result<LightroomClient> {
    let manager = token_manager(config)?;
    let token = manager
        .valid_access_token()
        .await?
        .ok_or(AuthError::NotAuthenticated)?;
    Ok(LightroomClient::new(&token, config.require_client_id()?)?)
}

/// Use the given catalog, or the account's first one.
async fn resolve_catalog(
    client: &LightroomClient,
    catalog_id: Option<String>,
) -> anyhow::Result<String> {
    if let Some(id) = catalog_id {
        return Ok(id);
    }
    let catalogs = client.catalogs().await?;
    let first = catalogs.first().context("No catalogs found")?;
    let id = first
        .get("id")
        .and_then(Value::as_str)
        .context("Catalog response has no id")?;
    println!(
        "Using catalog: {}",
        output::catalog_name(first).unwrap_or(id)
    );
    Ok(id.to_string())
}

async fn fetch_catalog(
    client: &LightroomClient,
    config: &Config,
    catalog_id: &str,
    page_size: usize,
    max_pages: usize,
) -> anyhow::Result<Vec<Asset>> {
    let pb = create_spinner(config.no_progress_bar);
    pb.set_message("Fetching assets...");
    let result = lightroom::fetch_all(client, catalog_id, page_size, max_pages, Some(&pb)).await;
    pb.finish_and_clear();
    let result = result?;
    tracing::info!(
        assets = result.assets.len(),
        pages = result.pages,
        stop = ?result.stop,
        "Fetched catalog"
    );
    Ok(result.assets)
}

fn resolve_year(args: &cli::YearArgs) -> anyhow::Result<Option<i32>> {
    let year = filter::resolve_year(args.year, args.this_year)?;
    if let Some(y) = year {
        println!(
            "Filtering photos from {} ({} date)...",
            y,
            args.date_field.as_str()
        );
    }
    Ok(year)
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Print `text`, or write it to `save_to` when given.
fn emit(text: &str, save_to: Option<&str>) -> anyhow::Result<()> {
    match save_to {
        Some(path) => {
            let path = expand_tilde(path);
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Results saved to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn reconcile_config(
    tree: &cli::LocalTreeArgs,
    date_field: types::DateField,
) -> ReconcileConfig {
    ReconcileConfig {
        root: expand_tilde(&tree.directory),
        jpg_subdir: tree.jpg_subdir.clone(),
        raw_subdir: tree.raw_subdir.clone(),
        date_field,
        use_dates: true,
        recursive: false,
        dry_run: false,
        confirm_each: false,
    }
}

async fn run_auth(config: &Config, command: AuthCommand) -> anyhow::Result<()> {
    let manager = token_manager(config)?;
    match command {
        AuthCommand::Login { force } => {
            if !force {
                if let TokenStatus::Valid(_) = manager.status().await? {
                    println!("Already authenticated. Use --force to log in again.");
                    return Ok(());
                }
            }
            let tokens = auth::login(&manager).await?;
            println!("Authentication successful.");
            if let Some(expires_at) = tokens.expires_at {
                println!("Token expires at {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        AuthCommand::Logout => {
            if manager.clear().await? {
                println!("Logged out.");
            } else {
                println!("No stored tokens.");
            }
        }
        AuthCommand::Status => {
            println!("Token file: {}", manager.path().display());
            match manager.status().await? {
                TokenStatus::Missing => println!("Not authenticated."),
                TokenStatus::Valid(tokens) => {
                    println!("Authenticated.");
                    match tokens.expires_at {
                        Some(at) => println!("Expires: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                        None => println!("Expires: unknown"),
                    }
                    println!(
                        "Refresh token: {}",
                        if tokens.refresh_token.is_some() { "stored" } else { "none" }
                    );
                }
                TokenStatus::Expired { refreshable } => {
                    println!("Access token expired.");
                    if refreshable {
                        println!("Run `lightroom-rs auth refresh` or any command to refresh it.");
                    } else {
                        println!("Run `lightroom-rs auth login` to log in again.");
                    }
                }
            }
        }
        AuthCommand::Refresh => {
            let tokens = manager.refresh().await?;
            println!("Token refreshed.");
            if let Some(expires_at) = tokens.expires_at {
                println!("Token expires at {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        AuthCommand::Url => {
            let oauth = manager.oauth();
            let state = uuid::Uuid::new_v4().simple().to_string();
            let pkce = oauth.settings().uses_pkce().then(PkcePair::generate);
            let url = oauth.authorization_url(&state, pkce.as_ref())?;
            println!("{url}");
        }
    }
    Ok(())
}

async fn run_catalogs(config: &Config, args: cli::CatalogsArgs) -> anyhow::Result<()> {
    let client = api_client(config).await?;
    let catalogs = client.catalogs().await?;
    if catalogs.is_empty() {
        println!("No catalogs found.");
        return Ok(());
    }
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&catalogs)?),
        OutputFormat::Table => print!("{}", output::catalog_table(&catalogs)),
    }
    Ok(())
}

async fn run_albums(config: &Config, args: cli::AlbumsArgs) -> anyhow::Result<()> {
    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog_id).await?;
    let albums = client.albums(&catalog_id).await?;
    if albums.is_empty() {
        println!("No albums found.");
        return Ok(());
    }
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&albums)?),
        OutputFormat::Table => print!("{}", output::album_table(&albums)),
    }
    Ok(())
}

async fn run_list_rejected(config: &Config, args: cli::ListRejectedArgs) -> anyhow::Result<()> {
    let year = resolve_year(&args.year)?;
    let criteria = FilterCriteria::rejected(year, args.year.date_field)?;

    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog.catalog_id).await?;
    let assets = fetch_catalog(
        &client,
        config,
        &catalog_id,
        args.limit,
        args.catalog.max_pages,
    )
    .await?;
    let rejected = filter::filter(assets, &criteria);

    if rejected.is_empty() {
        println!("No rejected photos found.");
        return Ok(());
    }

    let save_to = args.save_to.as_deref().map(expand_tilde);
    if let Some(path) = save_to.as_deref().filter(|p| is_json_path(p)) {
        let records: Vec<RejectedRecord> = rejected.iter().map(RejectedRecord::from).collect();
        records::write_records(path, &records)?;
        println!("Saved {} rejected photos to {}", records.len(), path.display());
        return Ok(());
    }

    let text = match args.output {
        OutputFormat::Json => {
            let records: Vec<RejectedRecord> = rejected.iter().map(RejectedRecord::from).collect();
            output::records_json(&records)?
        }
        OutputFormat::Table => output::asset_table(&rejected),
    };
    emit(&text, args.save_to.as_deref())
}

async fn run_search(config: &Config, args: cli::SearchArgs) -> anyhow::Result<()> {
    let year = resolve_year(&args.year)?;
    let criteria = FilterCriteria::new(
        args.rejected_only,
        args.accepted_only,
        year,
        args.year.date_field,
    )?;

    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog.catalog_id).await?;
    let assets = fetch_catalog(
        &client,
        config,
        &catalog_id,
        cli::DEFAULT_PAGE_SIZE,
        args.catalog.max_pages,
    )
    .await?;
    let mut found = filter::filter(assets, &criteria);
    if let Some(limit) = args.limit {
        found.truncate(limit);
    }

    if found.is_empty() {
        println!("No photos found matching criteria.");
        return Ok(());
    }
    match args.output {
        OutputFormat::Json => {
            let records: Vec<RejectedRecord> = found.iter().map(RejectedRecord::from).collect();
            println!("{}", output::records_json(&records)?);
        }
        OutputFormat::Table => print!("{}", output::search_lines(&found)),
    }
    Ok(())
}

async fn run_details(config: &Config, args: cli::DetailsArgs) -> anyhow::Result<()> {
    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog_id).await?;
    let asset = client.asset(&catalog_id, &args.photo_id).await?;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(asset.raw_payload())?),
        OutputFormat::Table => print!("{}", output::asset_details(&asset)),
    }
    Ok(())
}

async fn run_dump(config: &Config, args: cli::DumpArgs) -> anyhow::Result<()> {
    let year = resolve_year(&args.year)?;
    let criteria = FilterCriteria::new(false, false, year, args.year.date_field)?;

    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog.catalog_id).await?;
    let assets = fetch_catalog(
        &client,
        config,
        &catalog_id,
        cli::DEFAULT_PAGE_SIZE,
        args.catalog.max_pages,
    )
    .await?;
    println!("Total photos fetched: {}", assets.len());

    let assets = if args.include_tasks {
        assets
    } else {
        filter::exclude_tasks(assets)
    };
    let mut assets = filter::filter(assets, &criteria);
    assets.truncate(args.limit);

    if assets.is_empty() {
        println!("No photos found.");
        return Ok(());
    }

    let text = match args.output {
        OutputFormat::Json => {
            let payloads: Vec<&Value> = assets.iter().map(Asset::raw_payload).collect();
            serde_json::to_string_pretty(&payloads)?
        }
        OutputFormat::Table => output::dump_table(&catalog_id, &assets),
    };
    emit(&text, args.save_to.as_deref())
}

async fn run_count_all(config: &Config, args: cli::CountAllArgs) -> anyhow::Result<()> {
    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog.catalog_id).await?;
    let assets = fetch_catalog(
        &client,
        config,
        &catalog_id,
        cli::DEFAULT_PAGE_SIZE,
        args.catalog.max_pages,
    )
    .await?;

    println!("Total photos found: {}", assets.len());

    match args.pattern {
        Some(pattern) => {
            let matching: Vec<&Asset> = assets
                .iter()
                .filter(|a| filter::filename_matches(a, &pattern))
                .collect();
            println!("Photos matching '{}': {}", pattern, matching.len());
            if !matching.is_empty() {
                println!("\nFirst 10 matches:");
                for asset in matching.iter().take(10) {
                    println!("  {}", asset.filename());
                }
                if matching.len() > 10 {
                    println!("  ... and {} more", matching.len() - 10);
                }
            }
        }
        None => {
            let breakdown = output::PrefixBreakdown::from_assets(&assets);
            println!();
            println!("Breakdown:");
            println!("  WJD photos:   {}", breakdown.wjd);
            println!("  DSC photos:   {}", breakdown.dsc);
            println!("  Other photos: {}", breakdown.other);
        }
    }
    Ok(())
}

fn finish_reconciliation(report: &reconcile::ReconciliationReport) -> anyhow::Result<()> {
    println!("{}", output::reconciliation_summary(report));
    let failed = report.jpg_failed + report.raw_failed;
    if failed > 0 {
        anyhow::bail!("{} file deletions failed", failed);
    }
    Ok(())
}

fn run_delete_pairs(args: cli::DeletePairsArgs) -> anyhow::Result<()> {
    let records_path = expand_tilde(&args.rejected_json);
    let records = records::read_records(&records_path)?;
    println!(
        "Loaded {} rejected photos from {}",
        records.len(),
        records_path.display()
    );

    let reconcile_config = ReconcileConfig {
        use_dates: !args.no_api_dates,
        recursive: args.recursive,
        dry_run: args.dry_run,
        confirm_each: args.confirm,
        ..reconcile_config(&args.tree, args.date_field)
    };
    println!("Searching in jpg directory: {}", reconcile_config.jpg_root().display());
    println!("Searching in raw directory: {}", reconcile_config.raw_root().display());

    let mut confirm: Box<dyn Confirm> = if args.confirm {
        Box::new(StdinConfirm)
    } else {
        Box::new(AlwaysYes)
    };
    let report = Reconciler::new(reconcile_config).run(&records, confirm.as_mut())?;
    finish_reconciliation(&report)
}

async fn run_delete_remote(config: &Config, args: cli::DeleteRemoteArgs) -> anyhow::Result<()> {
    let records_path = expand_tilde(&args.rejected_json);
    let records = records::read_records(&records_path)?;

    let mut seen = HashSet::new();
    let targets: Vec<&RejectedRecord> = records
        .iter()
        .filter(|r| !r.id.is_empty() && seen.insert(r.id.as_str()))
        .collect();
    if targets.is_empty() {
        println!("No asset IDs in {}", records_path.display());
        return Ok(());
    }

    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog_id).await?;

    if !args.dry_run
        && !args.yes
        && !prompt_yes_no(&format!(
            "Delete {} assets from catalog {}? This cannot be undone.",
            targets.len(),
            catalog_id
        ))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let mut deleted = 0usize;
    let mut failed = 0usize;
    for record in &targets {
        let name = record.filename().unwrap_or(lightroom::asset::UNKNOWN_FILENAME);
        if args.dry_run {
            println!("[DRY RUN] Would delete {} ({})", name, record.id);
            continue;
        }
        match client.delete_asset(&catalog_id, &record.id).await {
            Ok(()) => {
                tracing::info!("Deleted {} ({})", name, record.id);
                deleted += 1;
            }
            Err(e) => {
                tracing::error!("Failed to delete {} ({}): {}", name, record.id, e);
                failed += 1;
            }
        }
    }

    println!();
    if args.dry_run {
        println!("Would delete {} assets", targets.len());
        return Ok(());
    }
    println!("Deleted: {}", deleted);
    println!("Failed:  {}", failed);
    if failed > 0 {
        anyhow::bail!("{} remote deletions failed", failed);
    }
    Ok(())
}

async fn run_cleanup(config: &Config, args: cli::CleanupArgs) -> anyhow::Result<()> {
    println!("Step 1: Fetching rejected photos");
    let year = resolve_year(&args.year)?;
    let criteria = FilterCriteria::rejected(year, args.year.date_field)?;

    let client = api_client(config).await?;
    let catalog_id = resolve_catalog(&client, args.catalog.catalog_id).await?;
    let assets = fetch_catalog(
        &client,
        config,
        &catalog_id,
        cli::DEFAULT_PAGE_SIZE,
        args.catalog.max_pages,
    )
    .await?;
    let rejected = filter::filter(assets, &criteria);
    if rejected.is_empty() {
        println!("No rejected photos found. Nothing to clean up.");
        return Ok(());
    }

    let records: Vec<RejectedRecord> = rejected.iter().map(RejectedRecord::from).collect();
    let records_path: PathBuf = expand_tilde(&args.rejected_json);
    records::write_records(&records_path, &records)?;
    println!(
        "Saved {} rejected photos to {}",
        records.len(),
        records_path.display()
    );

    println!("\nStep 2: Previewing what would be deleted");
    let base = ReconcileConfig {
        recursive: true,
        ..reconcile_config(&args.tree, args.year.date_field)
    };
    let preview = Reconciler::new(ReconcileConfig {
        dry_run: true,
        ..base.clone()
    })
    .run(&records, &mut AlwaysYes)?;
    println!("{}", output::reconciliation_summary(&preview));

    if preview.matches.is_empty() {
        println!("\nNo local files to delete.");
        return Ok(());
    }
    if args.dry_run {
        return Ok(());
    }

    println!("\nStep 3: Confirmation");
    if !args.yes && !prompt_yes_no("Do you want to proceed with deleting these files?")? {
        println!("Cancelled.");
        return Ok(());
    }

    println!("\nStep 4: Deleting files");
    let report = Reconciler::new(base).run(&records, &mut AlwaysYes)?;
    finish_reconciliation(&report)?;
    println!("\nCleanup completed.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level.as_filter())),
        )
        .init();

    let config = Config::from_cli(&cli.global);
    tracing::debug!(?config, "Starting lightroom-rs");

    match cli.command {
        Command::Auth { command } => run_auth(&config, command).await,
        Command::Catalogs(args) => run_catalogs(&config, args).await,
        Command::Albums(args) => run_albums(&config, args).await,
        Command::ListRejected(args) => run_list_rejected(&config, args).await,
        Command::Search(args) => run_search(&config, args).await,
        Command::Details(args) => run_details(&config, args).await,
        Command::Dump(args) => run_dump(&config, args).await,
        Command::CountAll(args) => run_count_all(&config, args).await,
        Command::DeletePairs(args) => run_delete_pairs(args),
        Command::DeleteRemote(args) => run_delete_remote(&config, args).await,
        Command::Cleanup(args) => run_cleanup(&config, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json_path() {
        assert!(is_json_path(Path::new("rejected.json")));
        assert!(is_json_path(Path::new("/tmp/out.JSON")));
        assert!(!is_json_path(Path::new("rejected.txt")));
        assert!(!is_json_path(Path::new("json")));
    }

    #[test]
    fn test_reconcile_config_from_tree() {
        let tree = cli::LocalTreeArgs {
            directory: "/photos".into(),
            jpg_subdir: "jpg".into(),
            raw_subdir: "raw".into(),
        };
        let cfg = reconcile_config(&tree, types::DateField::Capture);
        assert_eq!(cfg.jpg_root(), PathBuf::from("/photos/jpg"));
        assert_eq!(cfg.raw_root(), PathBuf::from("/photos/raw"));
        assert!(cfg.use_dates);
        assert!(!cfg.dry_run);
    }
}
