use std::collections::HashSet;
use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::warn;

use crate::error::SyncError;
use crate::gmt::{self, GmtRecord};
use crate::lookup::GeneLookup;

pub const DEFAULT_MIN_GENES: usize = 5;
pub const DEFAULT_MAX_GENES: usize = 2500;
pub const DEFAULT_MAX_TERM_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanFilters {
    pub min_genes: usize,
    pub max_genes: usize,
    pub max_term_len: usize,
}

impl Default for CleanFilters {
    fn default() -> Self {
        Self {
            min_genes: DEFAULT_MIN_GENES,
            max_genes: DEFAULT_MAX_GENES,
            max_term_len: DEFAULT_MAX_TERM_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub lines: usize,
    pub written: usize,
    pub skipped_malformed: usize,
    pub dropped_small: usize,
    pub dropped_large: usize,
    pub dropped_long_term: usize,
    pub dropped_duplicate_term: usize,
}

pub fn clean_gmt<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    lookup: &dyn GeneLookup,
    filters: &CleanFilters,
) -> Result<CleanStats, SyncError> {
    let mut stats = CleanStats::default();
    let mut seen_terms: HashSet<String> = HashSet::new();

    for line in reader.lines() {
        let line = line.map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        let record = match gmt::parse_line(line) {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping line {}: {err}", stats.lines);
                stats.skipped_malformed += 1;
                continue;
            }
        };

        let genes = map_genes(&record.genes, lookup);
        if genes.len() < filters.min_genes {
            stats.dropped_small += 1;
            continue;
        }
        if genes.len() >= filters.max_genes {
            stats.dropped_large += 1;
            continue;
        }
        if record.term.chars().count() >= filters.max_term_len {
            stats.dropped_long_term += 1;
            continue;
        }
        if seen_terms.contains(&record.term) {
            stats.dropped_duplicate_term += 1;
            continue;
        }

        let cleaned = GmtRecord {
            term: record.term.clone(),
            description: record.description,
            genes,
        };
        gmt::write_record(writer, &cleaned)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        // Terms join the duplicate set only once written. A term dropped by
        // the size or length filters may still be written from a later line.
        seen_terms.insert(record.term);
        stats.written += 1;
    }

    Ok(stats)
}

pub fn map_genes(genes: &[String], lookup: &dyn GeneLookup) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut mapped = Vec::new();
    for gene in genes {
        let target = lookup.lookup(gene).unwrap_or(gene.as_str());
        if target.is_empty() {
            continue;
        }
        if seen.contains(target) {
            continue;
        }
        seen.insert(target.to_string());
        mapped.push(target.to_string());
    }
    mapped
}
