use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Species;
use crate::error::SyncError;

pub const GENE_INFO_BASE_URL: &str = "https://ftp.ncbi.nlm.nih.gov/gene/DATA/GENE_INFO/Mammalia";

pub trait GeneInfoClient: Send + Sync {
    fn download_gene_info(&self, species: Species, destination: &Path) -> Result<(), SyncError>;
}

#[derive(Clone)]
pub struct GeneInfoHttpClient {
    client: Client,
    base_url: String,
}

impl GeneInfoHttpClient {
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
            .map_err(|err| SyncError::GeneInfoHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: GENE_INFO_BASE_URL.to_string(),
        })
    }

    fn gene_info_url(&self, species: Species) -> String {
        format!("{}/{}.gene_info.gz", self.base_url, species.gene_info_stem())
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
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(SyncError::GeneInfoStatus { status, message });
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
                    return Err(SyncError::GeneInfoHttp(err.to_string()));
                }
            }
        }
    }
}

impl GeneInfoClient for GeneInfoHttpClient {
    fn download_gene_info(&self, species: Species, destination: &Path) -> Result<(), SyncError> {
        let url = self.gene_info_url(species);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        self.write_response_to_file(response, destination)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
