// src/fetch/mod.rs
use reqwest::Client;
use serde::Serialize;
use std::{env, path::PathBuf};
use tokio::fs;
use tracing::info;
use url::Url;

use crate::error::FetchError;

pub mod download;
pub mod links;

pub use download::{download_asset, DownloadedFile};
pub use links::{extract_links, LinkEntry};

pub const DEFAULT_BASE_URL: &str = "https://tecrider.com/images/items/";
pub const DEFAULT_DEST_DIR: &str = "public/images/stageicons";
pub const DEFAULT_EXTENSION: &str = ".svg";

/// Where to find the listing, where to write, and which links to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: String,
    pub dest_dir: PathBuf,
    pub extension: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dest_dir: PathBuf::from(DEFAULT_DEST_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl FetchConfig {
    /// Defaults, overridden by `ICONS_BASE_URL`, `ICONS_DEST_DIR` and
    /// `ICONS_EXTENSION` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = lookup("ICONS_BASE_URL").filter(|v| !v.is_empty()) {
            cfg.base_url = v;
        }
        if let Some(v) = lookup("ICONS_DEST_DIR").filter(|v| !v.is_empty()) {
            cfg.dest_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ICONS_EXTENSION").filter(|v| !v.is_empty()) {
            cfg.extension = v;
        }
        cfg
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub base_url: String,
    pub links_found: usize,
    pub files: Vec<DownloadedFile>,
}

/// Fetch the listing at `config.base_url`, then download every link ending in
/// `config.extension` into `config.dest_dir`, one after another in page order.
/// Stops at the first failure.
#[tracing::instrument(level = "info", skip(client, config), fields(base = %config.base_url))]
pub async fn fetch_assets(
    client: &Client,
    config: &FetchConfig,
) -> Result<FetchReport, FetchError> {
    let base = Url::parse(&config.base_url).map_err(|source| FetchError::InvalidUrl {
        url: config.base_url.clone(),
        source,
    })?;
    fs::create_dir_all(&config.dest_dir).await?;

    let page = download::get_bytes(client, &base).await?;
    let html = String::from_utf8_lossy(&page);
    let links = extract_links(&html, &config.extension);
    println!("Found {} {} files to download...", links.len(), config.extension);
    info!(count = links.len(), "links extracted");

    let mut files = Vec::with_capacity(links.len());
    for link in &links {
        println!("Downloading {}...", link.basename());
        files.push(download_asset(client, &base, link, &config.dest_dir).await?);
    }

    Ok(FetchReport {
        base_url: config.base_url.clone(),
        links_found: links.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use tempfile::tempdir;
    use warp::Filter;

    const LISTING: &str = r#"<html><body>
<a href="amp.svg">amp.svg</a>
<a href="sub/kit.svg">kit.svg</a>
<a href="/shared/mic.svg">mic.svg</a>
<a href="readme.txt">readme.txt</a>
<a href="index.html?sort=svg">sort</a>
</body></html>"#;

    const CLASHING_LISTING: &str = r#"<html><body>
<a href="a/x.svg">first x</a>
<a href="b/x.svg">second x</a>
</body></html>"#;

    /// Serves the listing at `/items/index.html` and an SVG body for every
    /// asset path, naming the file it came from.
    fn spawn_server() -> SocketAddr {
        let page = warp::path!("items" / "index.html").map(|| warp::reply::html(LISTING));
        let top =
            warp::path!("items" / String).map(|name: String| format!("<svg id=\"{}\"/>", name));
        let sub = warp::path!("items" / "sub" / String)
            .map(|name: String| format!("<svg id=\"sub-{}\"/>", name));
        let shared = warp::path!("shared" / String)
            .map(|name: String| format!("<svg id=\"shared-{}\"/>", name));
        let clash_page =
            warp::path!("clash" / "index.html").map(|| warp::reply::html(CLASHING_LISTING));
        let clash = warp::path!("clash" / String / String)
            .map(|dir: String, name: String| format!("<svg id=\"{}-{}\"/>", dir, name));
        let routes = warp::get().and(
            page.or(top)
                .or(sub)
                .or(shared)
                .or(clash_page)
                .or(clash),
        );

        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn downloads_only_matching_links() -> Result<()> {
        let addr = spawn_server();
        let dir = tempdir()?;
        let dest = dir.path().join("icons");
        let config = FetchConfig {
            base_url: format!("http://{}/items/index.html", addr),
            dest_dir: dest.clone(),
            extension: ".svg".into(),
        };

        let report = fetch_assets(&Client::new(), &config).await?;
        assert_eq!(report.links_found, 3);
        let names: Vec<&str> = report.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["amp.svg", "kit.svg", "mic.svg"]);

        let mut on_disk: Vec<String> = std::fs::read_dir(&dest)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, vec!["amp.svg", "kit.svg", "mic.svg"]);

        assert_eq!(std::fs::read_to_string(dest.join("kit.svg"))?, "<svg id=\"sub-kit.svg\"/>");
        assert_eq!(std::fs::read_to_string(dest.join("mic.svg"))?, "<svg id=\"shared-mic.svg\"/>");
        Ok(())
    }

    #[tokio::test]
    async fn same_basename_overwrites_earlier_file() -> Result<()> {
        let addr = spawn_server();
        let dir = tempdir()?;
        let config = FetchConfig {
            base_url: format!("http://{}/clash/index.html", addr),
            dest_dir: dir.path().to_path_buf(),
            extension: ".svg".into(),
        };

        let report = fetch_assets(&Client::new(), &config).await?;
        assert_eq!(report.files.len(), 2);
        assert!(report.files.iter().all(|f| f.name == "x.svg"));

        let on_disk: Vec<_> = std::fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("x.svg"))?,
            "<svg id=\"b-x.svg\"/>"
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_listing_is_an_error() -> Result<()> {
        let addr = spawn_server();
        let dir = tempdir()?;
        let config = FetchConfig {
            base_url: format!("http://{}/nowhere/", addr),
            dest_dir: dir.path().to_path_buf(),
            extension: ".svg".into(),
        };

        let err = fetch_assets(&Client::new(), &config).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn bad_base_url_is_rejected() {
        let config = FetchConfig {
            base_url: "not a url".into(),
            ..FetchConfig::default()
        };
        let err = fetch_assets(&Client::new(), &config).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [("ICONS_DEST_DIR", "out/icons"), ("ICONS_EXTENSION", "")]
            .into_iter()
            .collect();
        let cfg = FetchConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.dest_dir, PathBuf::from("out/icons"));
        assert_eq!(cfg.extension, DEFAULT_EXTENSION);
    }
}
