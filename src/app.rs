use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::clean::{self, CleanStats};
use crate::config::ResolvedConfig;
use crate::domain::ReleaseName;
use crate::error::SyncError;
use crate::lookup::NcbiGeneLookup;
use crate::ncbi::GeneInfoClient;
use crate::store::{Metadata, Store};
use crate::wikipathways::{self, ReleaseClient};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub input: Option<String>,
    pub output: Option<String>,
    pub gene_info: Option<String>,
    pub refresh_lookup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub file_name: String,
    pub release_date: Option<String>,
    pub source: String,
    pub action: String,
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    pub input: String,
    pub output: String,
    pub species: String,
    pub lookup_source: String,
    pub lookup_entries: usize,
    pub stats: CleanStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub data_dir: String,
    pub species: String,
    pub fetched: Vec<String>,
    pub releases: Vec<Metadata>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<R: ReleaseClient, G: GeneInfoClient> {
    store: Store,
    releases: R,
    gene_info: G,
}

impl<R: ReleaseClient, G: GeneInfoClient> App<R, G> {
    pub fn new(store: Store, releases: R, gene_info: G) -> Self {
        Self {
            store,
            releases,
            gene_info,
        }
    }

    pub fn fetch(
        &self,
        config: &ResolvedConfig,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, SyncError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; listing releases".to_string(),
            elapsed: None,
        });
        sink.event(ProgressEvent {
            message: "wikipathways.request".to_string(),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        let names = self.releases.list_releases(&config.listing_url)?;
        let latency = start.elapsed().as_millis();
        sink.event(ProgressEvent {
            message: format!("wikipathways.response latency_ms={latency}"),
            elapsed: None,
        });

        let name = wikipathways::first_matching(&names, config.species)
            .ok_or_else(|| SyncError::NoMatchingRelease(config.species.to_string()))?;
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; selected {name}"),
            elapsed: None,
        });

        let progress_path = self.store.data_path(&config.progress_file);
        let done = Store::read_progress(&progress_path)?;
        let already_fetched = done.iter().any(|entry| entry == name.as_str());
        let destination = self.store.data_path(&config.output_file);

        if !options.force && already_fetched {
            sink.event(ProgressEvent {
                message: "phase=Store; already recorded in progress log".to_string(),
                elapsed: None,
            });
            return Ok(FetchResult {
                file_name: name.to_string(),
                release_date: name.release_date().map(|date| date.to_string()),
                source: "wikipathways".to_string(),
                action: "up-to-date".to_string(),
                output_path: destination
                    .as_std_path()
                    .exists()
                    .then(|| destination.to_string()),
            });
        }

        if options.dry_run {
            return Ok(FetchResult {
                file_name: name.to_string(),
                release_date: name.release_date().map(|date| date.to_string()),
                source: "wikipathways".to_string(),
                action: "download".to_string(),
                output_path: Some(destination.to_string()),
            });
        }

        sink.event(ProgressEvent {
            message: "phase=Prepare; preparing download".to_string(),
            elapsed: None,
        });
        let staged = Store::staging_file(self.store.data_root())?;
        sink.event(ProgressEvent {
            message: "wikipathways.request".to_string(),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        self.releases
            .download_release(&config.listing_url, name, staged.path())?;
        let latency = start.elapsed().as_millis();
        sink.event(ProgressEvent {
            message: format!("wikipathways.response latency_ms={latency}"),
            elapsed: None,
        });

        sink.event(ProgressEvent {
            message: "phase=Store; writing files".to_string(),
            elapsed: None,
        });
        Store::persist_staged(staged, &destination)?;
        if !already_fetched {
            Store::append_progress(&progress_path, name.as_str())?;
        }
        let meta = self.build_metadata(name, &config.listing_url, destination.as_str());
        Store::write_metadata(&self.store.release_metadata_path(name), &meta)?;

        Ok(FetchResult {
            file_name: name.to_string(),
            release_date: name.release_date().map(|date| date.to_string()),
            source: "wikipathways".to_string(),
            action: "download".to_string(),
            output_path: Some(destination.to_string()),
        })
    }

    pub fn clean(
        &self,
        config: &ResolvedConfig,
        options: CleanOptions,
        sink: &dyn ProgressSink,
    ) -> Result<CleanResult, SyncError> {
        let input = match &options.input {
            Some(path) => self.store.data_path(path),
            None => {
                let fetched = self.store.data_path(&config.output_file);
                if !fetched.as_std_path().exists() {
                    return Err(SyncError::NoFetchedRelease);
                }
                fetched
            }
        };
        let output = match &options.output {
            Some(path) => self.store.data_path(path),
            None => cleaned_output_path(&input),
        };
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; input {input}"),
            elapsed: None,
        });

        let (lookup_path, lookup_source) = self.ensure_gene_info(config, &options, sink)?;
        sink.event(ProgressEvent {
            message: "phase=Prepare; loading gene table".to_string(),
            elapsed: None,
        });
        let lookup = NcbiGeneLookup::load(lookup_path.as_std_path())?;
        sink.event(ProgressEvent {
            message: format!("phase=Prepare; gene table entries={}", lookup.len()),
            elapsed: None,
        });

        sink.event(ProgressEvent {
            message: "phase=Clean; streaming records".to_string(),
            elapsed: None,
        });
        let reader = File::open(input.as_std_path())
            .map(BufReader::new)
            .map_err(|err| SyncError::Filesystem(format!("open {input}: {err}")))?;
        let staging_dir = output.parent().unwrap_or_else(|| self.store.data_root());
        let staged = Store::staging_file(staging_dir)?;
        let mut writer = BufWriter::new(&staged);
        let stats = clean::clean_gmt(reader, &mut writer, &lookup, &config.filters)?;
        writer
            .flush()
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        drop(writer);

        sink.event(ProgressEvent {
            message: "phase=Store; writing files".to_string(),
            elapsed: None,
        });
        Store::persist_staged(staged, &output)?;

        Ok(CleanResult {
            input: input.to_string(),
            output: output.to_string(),
            species: config.species.to_string(),
            lookup_source,
            lookup_entries: lookup.len(),
            stats,
        })
    }

    pub fn status(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<StatusResult, SyncError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; scanning data directory".to_string(),
            elapsed: None,
        });
        let progress_path = self.store.data_path(&config.progress_file);
        let fetched = Store::read_progress(&progress_path)?;
        let mut releases = self.store.list_release_metadata()?;
        releases.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        Ok(StatusResult {
            data_dir: self.store.data_root().to_string(),
            species: config.species.to_string(),
            fetched,
            releases,
        })
    }

    fn ensure_gene_info(
        &self,
        config: &ResolvedConfig,
        options: &CleanOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(Utf8PathBuf, String), SyncError> {
        if let Some(path) = &options.gene_info {
            return Ok((Utf8PathBuf::from(path), "provided".to_string()));
        }

        let cache_path = self.store.gene_info_cache_path(config.species);
        if !options.refresh_lookup && cache_path.as_std_path().exists() {
            sink.event(ProgressEvent {
                message: "phase=Prepare; using cached gene table".to_string(),
                elapsed: None,
            });
            return Ok((cache_path, "cache".to_string()));
        }

        self.store.ensure_cache_root()?;
        let staging_dir = self.store.cache_root().join("gene_info");
        let staged = Store::staging_file(&staging_dir)?;
        sink.event(ProgressEvent {
            message: "ncbi.request".to_string(),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        self.gene_info
            .download_gene_info(config.species, staged.path())?;
        let latency = start.elapsed().as_millis();
        sink.event(ProgressEvent {
            message: format!("ncbi.response latency_ms={latency}"),
            elapsed: None,
        });
        Store::persist_staged(staged, &cache_path)?;
        Ok((cache_path, "download".to_string()))
    }

    fn build_metadata(&self, name: &ReleaseName, listing_url: &str, path: &str) -> Metadata {
        Metadata {
            source: "wikipathways".to_string(),
            file_name: name.to_string(),
            release_date: name.release_date().map(|date| date.to_string()),
            url: wikipathways::release_url(listing_url, name),
            downloaded_at: iso_timestamp(),
            tool: format!("pfocr-sync/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
        }
    }
}

fn cleaned_output_path(input: &Utf8Path) -> Utf8PathBuf {
    let stem = input.file_stem().unwrap_or("output");
    input.with_file_name(format!("{stem}-clean.gmt"))
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
