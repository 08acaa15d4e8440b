use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::SyncError;

pub trait GeneLookup {
    fn lookup(&self, token: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct NcbiGeneLookup {
    symbols: HashMap<String, String>,
}

impl NcbiGeneLookup {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let file = File::open(path).map_err(|err| {
            SyncError::Filesystem(format!("open gene_info {}: {err}", path.display()))
        })?;
        let mut reader = BufReader::new(file);
        let is_gzip = reader
            .fill_buf()
            .map_err(|err| SyncError::Filesystem(err.to_string()))?
            .starts_with(&[0x1f, 0x8b]);
        if is_gzip {
            Self::from_reader(BufReader::new(GzDecoder::new(reader)))
        } else {
            Self::from_reader(reader)
        }
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SyncError> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| SyncError::LookupParse("empty gene_info table".to_string()))?
            .map_err(|err| SyncError::LookupParse(err.to_string()))?;
        let columns: Vec<&str> = header.trim_start_matches('#').split('\t').collect();
        let geneid_idx = require_column(&columns, "GeneID")?;
        let symbol_idx = require_column(&columns, "Symbol")?;
        let synonyms_idx = require_column(&columns, "Synonyms")?;
        let authority_idx = columns
            .iter()
            .position(|name| *name == "Symbol_from_nomenclature_authority");

        let mut candidates: HashMap<String, BTreeSet<String>> = HashMap::new();
        for line in lines {
            let line = line.map_err(|err| SyncError::LookupParse(err.to_string()))?;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let Some(symbol) = fields.get(symbol_idx).copied() else {
                continue;
            };
            if symbol.is_empty() || symbol == "-" {
                continue;
            }

            let mut keys = vec![symbol];
            if let Some(gene_id) = fields.get(geneid_idx).copied() {
                if !gene_id.is_empty() && gene_id != "-" {
                    keys.push(gene_id);
                }
            }
            if let Some(synonyms) = fields.get(synonyms_idx).copied() {
                keys.extend(
                    synonyms
                        .split('|')
                        .filter(|synonym| !synonym.is_empty() && *synonym != "-"),
                );
            }
            if let Some(idx) = authority_idx {
                if let Some(authority) = fields.get(idx).copied() {
                    if !authority.is_empty() && authority != "-" {
                        keys.push(authority);
                    }
                }
            }

            for key in keys {
                candidates
                    .entry(key.to_string())
                    .or_default()
                    .insert(symbol.to_string());
            }
        }

        // A key naming more than one gene is ambiguous and unusable, unless
        // the key is itself one of those official symbols.
        let mut symbols = HashMap::with_capacity(candidates.len());
        for (key, mut targets) in candidates {
            let target = if targets.len() == 1 {
                targets.pop_first()
            } else if targets.contains(&key) {
                Some(key.clone())
            } else {
                None
            };
            if let Some(target) = target {
                symbols.insert(key, target);
            }
        }

        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl GeneLookup for NcbiGeneLookup {
    fn lookup(&self, token: &str) -> Option<&str> {
        self.symbols.get(token).map(String::as_str)
    }
}

fn require_column(columns: &[&str], name: &str) -> Result<usize, SyncError> {
    columns
        .iter()
        .position(|column| *column == name)
        .ok_or_else(|| SyncError::LookupParse(format!("gene_info header missing column {name}")))
}
