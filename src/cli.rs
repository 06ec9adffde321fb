use clap::{Args, Parser, Subcommand};

use crate::auth::DEFAULT_REDIRECT_URI;
use crate::types::*;

/// Page size used when walking the whole catalog.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Safety ceiling on pages fetched in one pass.
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "lightroom-rs",
    about = "Find rejected Lightroom Cloud photos and clean up their local JPEG/RAF pairs",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Disable progress spinner
    #[arg(long, global = true)]
    pub no_progress_bar: bool,

    /// Directory holding stored tokens
    #[arg(long, default_value = "~/.lightroom-rs", global = true)]
    pub config_dir: String,

    /// Adobe API client ID, also sent as the API key
    #[arg(long, env = "ADOBE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Client secret for confidential integrations; omit to use PKCE
    #[arg(long, env = "ADOBE_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    /// OAuth redirect URI registered with the integration
    #[arg(long, env = "ADOBE_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI, global = true)]
    pub redirect_uri: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in, log out and inspect stored credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// List available catalogs
    Catalogs(CatalogsArgs),
    /// List albums in a catalog
    Albums(AlbumsArgs),
    /// List rejected photos, optionally saving them for delete-pairs
    ListRejected(ListRejectedArgs),
    /// Search photos by review flag and year
    Search(SearchArgs),
    /// Show a single photo
    Details(DetailsArgs),
    /// Dump raw API payloads for photos
    Dump(DumpArgs),
    /// Count every photo in the catalog
    CountAll(CountAllArgs),
    /// Delete local JPEG/RAF pairs for rejected photos
    DeletePairs(DeletePairsArgs),
    /// Delete rejected photos from the catalog itself
    DeleteRemote(DeleteRemoteArgs),
    /// Fetch rejected photos, preview, confirm, then delete local pairs
    Cleanup(CleanupArgs),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authenticate with Adobe
    Login {
        /// Log in again even if a valid token is stored
        #[arg(long)]
        force: bool,
    },
    /// Remove stored tokens
    Logout,
    /// Show whether a usable token is stored
    Status,
    /// Refresh the access token now
    Refresh,
    /// Print the authorization URL without logging in
    Url,
}

#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Catalog to use (defaults to the first one)
    #[arg(long)]
    pub catalog_id: Option<String>,

    /// Maximum pages to fetch before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,
}

#[derive(Args, Debug, Clone)]
pub struct YearArgs {
    /// Only photos from this year
    #[arg(long)]
    pub year: Option<i32>,

    /// Only photos from the current year
    #[arg(long, conflicts_with = "year")]
    pub this_year: bool,

    /// Which date decides the year
    #[arg(long = "date-type", value_enum, default_value = "import")]
    pub date_field: DateField,
}

#[derive(Args, Debug)]
pub struct CatalogsArgs {
    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct AlbumsArgs {
    /// Catalog to use (defaults to the first one)
    #[arg(long)]
    pub catalog_id: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ListRejectedArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub year: YearArgs,

    /// Photos requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: usize,

    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Write results to this file (JSON files get the records array)
    #[arg(long)]
    pub save_to: Option<String>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub year: YearArgs,

    /// Only rejected photos
    #[arg(long)]
    pub rejected_only: bool,

    /// Only picked photos
    #[arg(long)]
    pub accepted_only: bool,

    /// Maximum photos to show
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct DetailsArgs {
    /// Asset ID
    pub photo_id: String,

    /// Catalog to use (defaults to the first one)
    #[arg(long)]
    pub catalog_id: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub year: YearArgs,

    /// Number of photos to dump
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Include Lightroom's internal task records
    #[arg(long)]
    pub include_tasks: bool,

    #[arg(long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Write the dump to this file
    #[arg(long)]
    pub save_to: Option<String>,
}

#[derive(Args, Debug)]
pub struct CountAllArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Only count filenames containing this text (case-insensitive)
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LocalTreeArgs {
    /// Base directory holding the jpg and raw trees
    #[arg(long, env = "LIGHTROOM_PHOTO_BASE")]
    pub directory: String,

    #[arg(long, default_value = "jpg")]
    pub jpg_subdir: String,

    #[arg(long, default_value = "raw")]
    pub raw_subdir: String,
}

#[derive(Args, Debug)]
pub struct DeletePairsArgs {
    #[command(flatten)]
    pub tree: LocalTreeArgs,

    /// Records written by list-rejected
    #[arg(long, default_value = "rejected.json")]
    pub rejected_json: String,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Ask before deleting each pair
    #[arg(long)]
    pub confirm: bool,

    /// Search subdirectories when a date folder misses
    #[arg(long)]
    pub recursive: bool,

    /// Skip the YYYY/MM-DD date folders and search by name only
    #[arg(long)]
    pub no_api_dates: bool,

    /// Which date picks the date folder
    #[arg(long = "date-type", value_enum, default_value = "import")]
    pub date_field: DateField,
}

#[derive(Args, Debug)]
pub struct DeleteRemoteArgs {
    /// Records written by list-rejected
    #[arg(long, default_value = "rejected.json")]
    pub rejected_json: String,

    /// Catalog to delete from (defaults to the first one)
    #[arg(long)]
    pub catalog_id: Option<String>,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub tree: LocalTreeArgs,

    #[command(flatten)]
    pub year: YearArgs,

    /// Where to save the fetched records
    #[arg(long, default_value = "rejected.json")]
    pub rejected_json: String,

    /// Stop after the preview
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}
