// src/bin/download_icons.rs
use reqwest::Client;
use std::process::exit;
use tracing::{error, info};
use venue_tools::{
    fetch::{self, FetchConfig},
    logging,
};

#[tokio::main]
async fn main() {
    logging::init("warn,venue_tools=info");

    let config = FetchConfig::from_env();
    info!(?config, "starting");

    let client = Client::new();
    match fetch::fetch_assets(&client, &config).await {
        Ok(report) => {
            let bytes: u64 = report.files.iter().map(|f| f.bytes).sum();
            info!(files = report.files.len(), bytes, dest = %config.dest_dir.display(), "done");
            println!("Download complete!");
        }
        Err(e) => {
            error!("{}", e);
            println!("An error occurred: {}", e);
            exit(1);
        }
    }
}
