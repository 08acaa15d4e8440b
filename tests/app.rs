use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use pfocr_sync::app::{App, CleanOptions, FetchOptions};
use pfocr_sync::config::{Config, ConfigLoader, ResolvedConfig};
use pfocr_sync::domain::{ReleaseName, Species};
use pfocr_sync::error::SyncError;
use pfocr_sync::ncbi::GeneInfoClient;
use pfocr_sync::output::JsonOutput;
use pfocr_sync::store::{Metadata, Store};
use pfocr_sync::wikipathways::ReleaseClient;

const RELEASE_BODY: &[u8] = b"WP1\tcell cycle\t1017\tCDKN2\t7157\tBRCA1\tEGFR\tMYC\n\
WP1\tcell cycle again\t1017\t7157\tBRCA1\tEGFR\tMYC\tAKT1\n\
WP2\ttiny\t1017\n";

const GENE_INFO: &str = "\
#tax_id\tGeneID\tSymbol\tLocusTag\tSynonyms\tSymbol_from_nomenclature_authority
9606\t1017\tCDK2\t-\tCDKN2|p33(CDK2)\tCDK2
9606\t7157\tTP53\t-\tLFS1|p53\tTP53
9606\t672\tBRCA1\t-\tBRCC1\tBRCA1
";

struct MockReleases {
    names: Vec<ReleaseName>,
    downloads: Arc<Mutex<usize>>,
}

impl MockReleases {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.parse().unwrap()).collect(),
            downloads: Arc::new(Mutex::new(0)),
        }
    }
}

impl ReleaseClient for MockReleases {
    fn list_releases(&self, _listing_url: &str) -> Result<Vec<ReleaseName>, SyncError> {
        Ok(self.names.clone())
    }

    fn download_release(
        &self,
        _listing_url: &str,
        _name: &ReleaseName,
        destination: &Path,
    ) -> Result<(), SyncError> {
        let mut guard = self.downloads.lock().unwrap();
        *guard += 1;
        std::fs::write(destination, RELEASE_BODY)
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }
}

#[derive(Default)]
struct MockGeneInfo {
    calls: Arc<Mutex<usize>>,
}

impl GeneInfoClient for MockGeneInfo {
    fn download_gene_info(&self, _species: Species, destination: &Path) -> Result<(), SyncError> {
        let mut guard = self.calls.lock().unwrap();
        *guard += 1;
        std::fs::write(destination, GENE_INFO)
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }
}

fn test_store(temp: &tempfile::TempDir) -> Store {
    let data_root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    let cache_root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    Store::new_with_paths(data_root, cache_root)
}

fn test_config() -> ResolvedConfig {
    ConfigLoader::resolve_config(Config::default())
}

fn human_releases() -> MockReleases {
    MockReleases::new(&[
        "pfocr-20240401-chemical-gmt-Homo_sapiens.gmt",
        "pfocr-20240401-gmt-Homo_sapiens.gmt",
        "pfocr-20240301-gmt-Homo_sapiens.gmt",
    ])
}

#[test]
fn fetch_downloads_new_release_and_records_progress() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let data_root = store.data_root().to_owned();
    let app = App::new(store, human_releases(), MockGeneInfo::default());

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    let result = app.fetch(&test_config(), options, &JsonOutput).unwrap();

    assert_eq!(result.action, "download");
    assert_eq!(result.file_name, "pfocr-20240401-gmt-Homo_sapiens.gmt");
    assert_eq!(result.release_date.as_deref(), Some("2024-04-01"));

    let fetched_path = data_root.join("output.gmt");
    assert_eq!(
        std::fs::read(fetched_path.as_std_path()).unwrap(),
        RELEASE_BODY
    );
    assert_eq!(result.output_path.as_deref(), Some(fetched_path.as_str()));

    let done = std::fs::read_to_string(data_root.join("done.txt").as_std_path()).unwrap();
    assert_eq!(done, "pfocr-20240401-gmt-Homo_sapiens.gmt\n");

    let meta_path = data_root
        .join("metadata")
        .join("releases")
        .join("pfocr-20240401-gmt-Homo_sapiens.gmt.json");
    let meta: Metadata =
        serde_json::from_str(&std::fs::read_to_string(meta_path.as_std_path()).unwrap()).unwrap();
    assert_eq!(meta.source, "wikipathways");
    assert_eq!(meta.file_name, "pfocr-20240401-gmt-Homo_sapiens.gmt");
    assert_eq!(
        meta.url,
        "https://data.wikipathways.org/pfocr/current/pfocr-20240401-gmt-Homo_sapiens.gmt"
    );
    assert_eq!(meta.resolved_path, fetched_path.as_str());
}

#[test]
fn fetch_is_idempotent_without_force() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let releases = human_releases();
    let downloads = releases.downloads.clone();
    let app = App::new(store, releases, MockGeneInfo::default());
    let config = test_config();

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    let first = app.fetch(&config, options.clone(), &JsonOutput).unwrap();
    let second = app.fetch(&config, options, &JsonOutput).unwrap();

    assert_eq!(first.action, "download");
    assert_eq!(second.action, "up-to-date");
    assert!(second.output_path.is_some());
    assert_eq!(*downloads.lock().unwrap(), 1);
}

#[test]
fn fetch_force_redownloads_without_duplicating_progress() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let data_root = store.data_root().to_owned();
    Store::append_progress(
        &data_root.join("done.txt"),
        "pfocr-20240401-gmt-Homo_sapiens.gmt",
    )
    .unwrap();
    let releases = human_releases();
    let downloads = releases.downloads.clone();
    let app = App::new(store, releases, MockGeneInfo::default());

    let options = FetchOptions {
        force: true,
        dry_run: false,
    };
    let result = app.fetch(&test_config(), options, &JsonOutput).unwrap();

    assert_eq!(result.action, "download");
    assert_eq!(*downloads.lock().unwrap(), 1);
    let done = std::fs::read_to_string(data_root.join("done.txt").as_std_path()).unwrap();
    assert_eq!(done, "pfocr-20240401-gmt-Homo_sapiens.gmt\n");
}

#[test]
fn fetch_dry_run_touches_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let data_root = store.data_root().to_owned();
    let releases = human_releases();
    let downloads = releases.downloads.clone();
    let app = App::new(store, releases, MockGeneInfo::default());

    let options = FetchOptions {
        force: false,
        dry_run: true,
    };
    let result = app.fetch(&test_config(), options, &JsonOutput).unwrap();

    assert_eq!(result.action, "download");
    assert_eq!(*downloads.lock().unwrap(), 0);
    assert!(!data_root.join("done.txt").as_std_path().exists());
    assert!(!data_root.join("output.gmt").as_std_path().exists());
}

#[test]
fn fetch_errors_when_no_release_matches() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let releases = MockReleases::new(&[
        "pfocr-20240401-chemical-gmt-Homo_sapiens.gmt",
        "pfocr-20240401-gmt-Mus_musculus.gmt",
    ]);
    let app = App::new(store, releases, MockGeneInfo::default());

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    let err = app
        .fetch(&test_config(), options, &JsonOutput)
        .unwrap_err();
    assert_matches!(err, SyncError::NoMatchingRelease(_));
}

#[test]
fn clean_processes_last_fetched_release() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let data_root = store.data_root().to_owned();
    let app = App::new(store, human_releases(), MockGeneInfo::default());
    let config = test_config();

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    app.fetch(&config, options, &JsonOutput).unwrap();

    let result = app
        .clean(&config, CleanOptions::default(), &JsonOutput)
        .unwrap();

    assert_eq!(result.lookup_source, "download");
    assert_eq!(result.species, "human");
    assert_eq!(result.input, data_root.join("output.gmt").as_str());
    // First WP1 line wins the term, the tiny WP2 set is filtered out.
    let output =
        std::fs::read_to_string(data_root.join("output-clean.gmt").as_std_path()).unwrap();
    assert_eq!(output, "WP1\tcell cycle\tCDK2\tTP53\tBRCA1\tEGFR\tMYC\n");
    assert_eq!(result.stats.lines, 3);
    assert_eq!(result.stats.written, 1);
    assert_eq!(result.stats.dropped_duplicate_term, 1);
    assert_eq!(result.stats.dropped_small, 1);
}

#[test]
fn clean_reuses_cached_gene_table() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let gene_info = MockGeneInfo::default();
    let calls = gene_info.calls.clone();
    let app = App::new(store, human_releases(), gene_info);
    let config = test_config();

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    app.fetch(&config, options, &JsonOutput).unwrap();

    let first = app
        .clean(&config, CleanOptions::default(), &JsonOutput)
        .unwrap();
    let second = app
        .clean(&config, CleanOptions::default(), &JsonOutput)
        .unwrap();

    assert_eq!(first.lookup_source, "download");
    assert_eq!(second.lookup_source, "cache");
    assert_eq!(*calls.lock().unwrap(), 1);

    let refreshed = app
        .clean(
            &config,
            CleanOptions {
                refresh_lookup: true,
                ..CleanOptions::default()
            },
            &JsonOutput,
        )
        .unwrap();
    assert_eq!(refreshed.lookup_source, "download");
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[test]
fn clean_without_fetch_requires_explicit_input() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let data_root = store.data_root().to_owned();
    std::fs::create_dir_all(data_root.as_std_path()).unwrap();
    std::fs::write(data_root.join("custom.gmt").as_std_path(), RELEASE_BODY).unwrap();
    let app = App::new(store, human_releases(), MockGeneInfo::default());
    let config = test_config();

    let err = app
        .clean(&config, CleanOptions::default(), &JsonOutput)
        .unwrap_err();
    assert_matches!(err, SyncError::NoFetchedRelease);

    let result = app
        .clean(
            &config,
            CleanOptions {
                input: Some("custom.gmt".to_string()),
                ..CleanOptions::default()
            },
            &JsonOutput,
        )
        .unwrap();
    assert_eq!(result.stats.written, 1);
    assert_eq!(result.output, data_root.join("custom-clean.gmt").as_str());
    assert!(data_root.join("custom-clean.gmt").as_std_path().exists());
}

#[test]
fn status_reports_progress_and_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let app = App::new(store, human_releases(), MockGeneInfo::default());
    let config = test_config();

    let empty = app.status(&config, &JsonOutput).unwrap();
    assert!(empty.fetched.is_empty());
    assert!(empty.releases.is_empty());

    let options = FetchOptions {
        force: false,
        dry_run: false,
    };
    app.fetch(&config, options, &JsonOutput).unwrap();

    let status = app.status(&config, &JsonOutput).unwrap();
    assert_eq!(status.fetched, vec!["pfocr-20240401-gmt-Homo_sapiens.gmt"]);
    assert_eq!(status.releases.len(), 1);
    assert_eq!(
        status.releases[0].file_name,
        "pfocr-20240401-gmt-Homo_sapiens.gmt"
    );
}
