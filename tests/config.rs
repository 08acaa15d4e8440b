use assert_matches::assert_matches;

use pfocr_sync::clean::CleanFilters;
use pfocr_sync::config::ConfigLoader;
use pfocr_sync::domain::Species;
use pfocr_sync::error::SyncError;

#[test]
fn explicit_config_path_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(Some(missing.to_str().unwrap())).unwrap_err();
    assert_matches!(err, SyncError::ConfigRead(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pfocr-sync.json");
    std::fs::write(&path, "{ species: mouse }").unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, SyncError::ConfigParse(_));
}

#[test]
fn config_file_values_resolve() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("pfocr-sync.json");
    std::fs::write(
        &path,
        r#"{
            "listing_url": "https://example.org/pfocr/",
            "species": "mouse",
            "output_file": "cleaned.gmt",
            "filters": { "max_genes": 1000 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(resolved.listing_url, "https://example.org/pfocr/");
    assert_eq!(resolved.species, Species::Mouse);
    assert_eq!(resolved.output_file, "cleaned.gmt");
    assert_eq!(resolved.progress_file, "done.txt");
    assert_eq!(resolved.filters.max_genes, 1000);
    assert_eq!(resolved.filters.min_genes, CleanFilters::default().min_genes);
}
