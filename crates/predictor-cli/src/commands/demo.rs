//! Launch the server locally and keep it running until Ctrl-C

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::{Child, Command};

use crate::client::ApiClient;
use crate::output::{print_error, print_info, print_success, print_warning};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Files and binary used by the demo launcher
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub server_bin: PathBuf,
    pub model: PathBuf,
    pub data: PathBuf,
    pub index: PathBuf,
    pub startup_timeout: Duration,
}

/// Return the required files that do not exist
pub fn missing_files(options: &DemoOptions) -> Vec<&Path> {
    [&options.model, &options.data, &options.index]
        .into_iter()
        .map(PathBuf::as_path)
        .filter(|path| !path.exists())
        .collect()
}

fn spawn_server(options: &DemoOptions, client: &ApiClient) -> Result<Child> {
    let base_url = client.base_url();
    let port = base_url
        .port_or_known_default()
        .context("API URL has no port")?;
    let host = base_url.host_str().unwrap_or("127.0.0.1");

    Command::new(&options.server_bin)
        .env("PREDICTOR_HOST", host)
        .env("PREDICTOR_PORT", port.to_string())
        .env("PREDICTOR_MODEL_PATH", &options.model)
        .env("PREDICTOR_DATA_PATH", &options.data)
        .env("PREDICTOR_INDEX_PATH", &options.index)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", options.server_bin.display()))
}

/// Poll `/health` until the server answers with any status
async fn wait_until_up(client: &ApiClient, child: &mut Child, timeout: Duration) -> Result<bool> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            bail!("Server exited during startup ({})", status);
        }
        if let Ok(response) = client.get_raw("health").await {
            return Ok(response.status.is_success());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("Server did not answer within {:?}", timeout);
        }
        tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
    }
}

pub async fn run(client: &ApiClient, options: DemoOptions) -> Result<()> {
    println!("{}", "Starting Stock Market Prediction Web App".bold());
    println!("{}", "=".repeat(50));

    let missing = missing_files(&options);
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        print_error(&format!("Missing required files: {}", names.join(", ")));
        bail!("Please ensure all files are in place");
    }
    print_success("All required files found");

    print_info("Starting server...");
    let mut child = spawn_server(&options, client)?;

    if wait_until_up(client, &mut child, options.startup_timeout).await? {
        print_success("Server is healthy");
    } else {
        print_warning("Server is up but reports unhealthy, predictions will fail");
    }

    println!("{}", "=".repeat(50));
    print_success(&format!("Visit: {}", client.base_url().as_str().cyan()));
    print_info("Press Ctrl+C to stop the server");
    println!("{}", "=".repeat(50));

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            bail!("Server exited unexpectedly ({})", status);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            print_info("Stopping server...");
            child.kill().await?;
            print_success("Server stopped");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &Path) -> DemoOptions {
        DemoOptions {
            server_bin: PathBuf::from("predictor-server"),
            model: dir.join("model.json"),
            data: dir.join("stockdata.csv"),
            index: dir.join("index.html"),
            startup_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_missing_files_listed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stockdata.csv"), "Date\n").unwrap();

        let opts = options(dir.path());
        let missing = missing_files(&opts);

        assert_eq!(missing, vec![opts.model.as_path(), opts.index.as_path()]);
    }

    #[test]
    fn test_no_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["model.json", "stockdata.csv", "index.html"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        assert!(missing_files(&options(dir.path())).is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        assert!(run(&client, options(dir.path())).await.is_err());
    }
}
