use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const CHEMICAL_MARKER: &str = "chemical";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Human,
    Mouse,
}

impl Species {
    pub fn gmt_marker(&self) -> &'static str {
        match self {
            Species::Human => "-gmt-Homo_sapiens.gmt",
            Species::Mouse => "-gmt-Mus_musculus.gmt",
        }
    }

    pub fn gene_info_stem(&self) -> &'static str {
        match self {
            Species::Human => "Homo_sapiens",
            Species::Mouse => "Mus_musculus",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Human => write!(f, "human"),
            Species::Mouse => write!(f, "mouse"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseName(String);

impl ReleaseName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, species: Species) -> bool {
        self.0.contains(species.gmt_marker()) && !self.0.contains(CHEMICAL_MARKER)
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        let stamp = Regex::new(r"(\d{4})-?(\d{2})-?(\d{2})").unwrap();
        let caps = stamp.captures(&self.0)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReleaseName {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = normalized.len() > ".gmt".len()
            && normalized.ends_with(".gmt")
            && !normalized.contains(['/', '\\']);
        if !is_valid {
            return Err(SyncError::InvalidReleaseName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}
