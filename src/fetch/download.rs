// src/fetch/download.rs
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;

use super::links::LinkEntry;
use crate::error::FetchError;

/// A file written to the destination directory.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedFile {
    pub name: String,
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// GET `url` and return the body, failing on any non-success status.
pub async fn get_bytes(client: &Client, url: &Url) -> Result<Vec<u8>, FetchError> {
    let request_err = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .map_err(request_err)?
        .error_for_status()
        .map_err(request_err)?;
    let bytes = resp.bytes().await.map_err(request_err)?;
    Ok(bytes.to_vec())
}

/// Resolve `link` against `base`, download it and save it under `dest_dir`
/// using the link's basename. An existing file with that name is overwritten.
pub async fn download_asset(
    client: &Client,
    base: &Url,
    link: &LinkEntry,
    dest_dir: impl AsRef<Path>,
) -> Result<DownloadedFile, FetchError> {
    let url = base
        .join(link.as_str())
        .map_err(|source| FetchError::InvalidUrl {
            url: format!("{} + {}", base, link.as_str()),
            source,
        })?;
    let name = link.basename().to_string();
    let dest_path = dest_dir.as_ref().join(&name);

    let bytes = get_bytes(client, &url).await?;
    fs::write(&dest_path, &bytes).await?;
    debug!(%url, path = %dest_path.display(), bytes = bytes.len(), "saved");

    Ok(DownloadedFile {
        name,
        url: url.to_string(),
        path: dest_path,
        bytes: bytes.len() as u64,
    })
}
