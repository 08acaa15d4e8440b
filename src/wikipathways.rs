use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{ElementRef, Html, Selector};

use crate::domain::{ReleaseName, Species};
use crate::error::SyncError;

pub const DEFAULT_LISTING_URL: &str = "https://data.wikipathways.org/pfocr/current/";

pub trait ReleaseClient: Send + Sync {
    fn list_releases(&self, listing_url: &str) -> Result<Vec<ReleaseName>, SyncError>;
    fn download_release(
        &self,
        listing_url: &str,
        name: &ReleaseName,
        destination: &Path,
    ) -> Result<(), SyncError>;
}

#[derive(Clone)]
pub struct WikiPathwaysHttpClient {
    client: Client,
}

impl WikiPathwaysHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pfocr-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::Filesystem(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SyncError::ListingHttp(err.to_string()))?;

        Ok(Self { client })
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), SyncError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "WikiPathways request failed".to_string());
            return Err(SyncError::ListingStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, SyncError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(SyncError::ListingHttp(err.to_string()));
                }
            }
        }
    }
}

impl ReleaseClient for WikiPathwaysHttpClient {
    fn list_releases(&self, listing_url: &str) -> Result<Vec<ReleaseName>, SyncError> {
        let response = self.send_with_retries(|| self.client.get(listing_url))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "WikiPathways request failed".to_string());
            return Err(SyncError::ListingStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| SyncError::ListingHttp(err.to_string()))?;
        parse_listing(&body)
    }

    fn download_release(
        &self,
        listing_url: &str,
        name: &ReleaseName,
        destination: &Path,
    ) -> Result<(), SyncError> {
        let url = release_url(listing_url, name);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        self.write_response_to_file(response, destination)
    }
}

pub fn release_url(listing_url: &str, name: &ReleaseName) -> String {
    format!("{}/{}", listing_url.trim_end_matches('/'), name)
}

pub fn parse_listing(html: &str) -> Result<Vec<ReleaseName>, SyncError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let header_selector = Selector::parse("th").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| SyncError::ListingParse("no table in listing page".to_string()))?;

    let mut name_column = None;
    let mut names = Vec::new();
    for row in table.select(&row_selector) {
        let Some(column) = name_column else {
            let headers: Vec<String> = row
                .select(&header_selector)
                .map(|header| header.text().collect::<String>().trim().to_string())
                .collect();
            name_column = headers.iter().position(|header| header == "File Name");
            continue;
        };
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        let Some(cell) = cells.get(column) else {
            continue;
        };
        let text = cell.text().collect::<String>();
        if let Ok(name) = text.trim().parse::<ReleaseName>() {
            names.push(name);
        }
    }

    if name_column.is_none() {
        return Err(SyncError::ListingParse(
            "listing table has no File Name column".to_string(),
        ));
    }
    Ok(names)
}

pub fn first_matching(names: &[ReleaseName], species: Species) -> Option<&ReleaseName> {
    names.iter().find(|name| name.matches(species))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
