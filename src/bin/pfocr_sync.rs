use std::path::Path;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pfocr_sync::app::{App, CleanOptions, CleanResult, FetchOptions, FetchResult, StatusResult};
use pfocr_sync::config::{ConfigLoader, ResolvedConfig};
use pfocr_sync::domain::{ReleaseName, Species};
use pfocr_sync::error::SyncError;
use pfocr_sync::ncbi::{GeneInfoClient, GeneInfoHttpClient};
use pfocr_sync::output::{ConsoleSink, JsonOutput, OutputMode};
use pfocr_sync::store::Store;
use pfocr_sync::wikipathways::{ReleaseClient, WikiPathwaysHttpClient};

#[derive(Parser)]
#[command(name = "pfocr-sync")]
#[command(about = "Sync and clean WikiPathways PFOCR gene-set releases")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the newest unseen gene-set release")]
    Fetch(FetchArgs),
    #[command(about = "Harmonize gene tokens and filter a fetched release")]
    Clean(CleanArgs),
    #[command(about = "Show the progress log and recorded releases")]
    Status,
}

#[derive(Args, Default, Clone)]
struct FetchArgs {
    #[arg(long)]
    species: Option<Species>,

    #[arg(long)]
    force: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Default, Clone)]
struct CleanArgs {
    #[arg(short = 'i', long)]
    input: Option<String>,

    #[arg(short = 'o', long)]
    output: Option<String>,

    #[arg(long)]
    species: Option<Species>,

    #[arg(long)]
    gene_info: Option<String>,

    #[arg(long)]
    refresh_lookup: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(sync) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(sync));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::NoMatchingRelease(_)
        | SyncError::NoFetchedRelease
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_) => 2,
        SyncError::ListingHttp(_)
        | SyncError::ListingStatus { .. }
        | SyncError::GeneInfoHttp(_)
        | SyncError::GeneInfoStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let store = Store::new(&config.data_dir).into_diagnostic()?;

    let command = cli.command.unwrap_or(Commands::Fetch(FetchArgs::default()));
    match command {
        Commands::Fetch(args) => run_fetch(args, config, store, output_mode),
        Commands::Clean(args) => run_clean(args, config, store, output_mode),
        Commands::Status => run_status(config, store, output_mode),
    }
}

fn run_fetch(
    args: FetchArgs,
    mut config: ResolvedConfig,
    store: Store,
    output_mode: OutputMode,
) -> miette::Result<()> {
    if let Some(species) = args.species {
        config.species = species;
    }
    let releases = WikiPathwaysHttpClient::new().into_diagnostic()?;
    let app = App::new(store, releases, NopGeneInfo);
    let options = FetchOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch(&config, options, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app
                .fetch(&config, options, &ConsoleSink)
                .into_diagnostic()?;
            print_fetch_summary(&result);
        }
    }
    Ok(())
}

fn run_clean(
    args: CleanArgs,
    mut config: ResolvedConfig,
    store: Store,
    output_mode: OutputMode,
) -> miette::Result<()> {
    if let Some(species) = args.species {
        config.species = species;
    }
    let gene_info = GeneInfoHttpClient::new().into_diagnostic()?;
    let app = App::new(store, NopReleases, gene_info);
    let options = CleanOptions {
        input: args.input,
        output: args.output,
        gene_info: args.gene_info,
        refresh_lookup: args.refresh_lookup,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.clean(&config, options, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_clean(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app
                .clean(&config, options, &ConsoleSink)
                .into_diagnostic()?;
            print_clean_summary(&result);
        }
    }
    Ok(())
}

fn run_status(config: ResolvedConfig, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let app = App::new(store, NopReleases, NopGeneInfo);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.status(&config, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_status(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.status(&config, &ConsoleSink).into_diagnostic()?;
            print_status_summary(&result);
        }
    }
    Ok(())
}

fn print_fetch_summary(result: &FetchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}📦 pfocr-sync summary{reset}");
    let (icon, color) = if result.action == "up-to-date" {
        ("♻️", green)
    } else {
        ("⬇️", cyan)
    };
    println!("{color}{icon} {} ({}){reset}", result.file_name, result.action);
    if let Some(date) = &result.release_date {
        println!("{color}   released: {date}{reset}");
    }
    if let Some(path) = &result.output_path {
        println!("{color}   📁 data: {path}{reset}");
    }

    let _ = yellow;
}

fn print_clean_summary(result: &CleanResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}📦 pfocr-sync summary{reset}");
    println!("{green}✅ terms written: {}{reset}", result.stats.written);
    println!(
        "{yellow}⚠️ dropped: small={} large={} long_term={} duplicate={} malformed={}{reset}",
        result.stats.dropped_small,
        result.stats.dropped_large,
        result.stats.dropped_long_term,
        result.stats.dropped_duplicate_term,
        result.stats.skipped_malformed,
    );
    println!("{cyan}   input: {}{reset}", result.input);
    println!("{cyan}   📁 output: {}{reset}", result.output);
    println!(
        "{cyan}   gene table: {} entries ({}){reset}",
        result.lookup_entries, result.lookup_source
    );
}

fn print_status_summary(result: &StatusResult) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}📦 pfocr-sync status{reset}");
    println!("{cyan}   data dir: {}{reset}", result.data_dir);
    println!("{cyan}   species: {}{reset}", result.species);
    println!("{green}✅ fetched releases: {}{reset}", result.fetched.len());
    for name in &result.fetched {
        println!("   • {name}");
    }
    for release in &result.releases {
        println!(
            "   🗃️ {} ({})",
            release.file_name,
            release.release_date.as_deref().unwrap_or("unknown date")
        );
    }
}

#[derive(Clone, Copy)]
struct NopReleases;
struct NopGeneInfo;

impl ReleaseClient for NopReleases {
    fn list_releases(&self, _listing_url: &str) -> Result<Vec<ReleaseName>, SyncError> {
        Err(SyncError::ListingHttp(
            "WikiPathways client not configured".to_string(),
        ))
    }

    fn download_release(
        &self,
        _listing_url: &str,
        _name: &ReleaseName,
        _destination: &Path,
    ) -> Result<(), SyncError> {
        Err(SyncError::ListingHttp(
            "WikiPathways client not configured".to_string(),
        ))
    }
}

impl GeneInfoClient for NopGeneInfo {
    fn download_gene_info(&self, _species: Species, _destination: &Path) -> Result<(), SyncError> {
        Err(SyncError::GeneInfoHttp(
            "NCBI client not configured".to_string(),
        ))
    }
}
