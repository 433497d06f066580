//! Environment bootstrap: directories and one-time converter acquisition
//!
//! The conversion tool is downloaded once from a releases API, gunzipped and
//! made executable. Runs after that find the binary on disk and skip the
//! network entirely. Bootstrap failure is fatal for the run.

use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    browser_download_url: String,
}

/// Create the working and output directories if absent
pub async fn ensure_dirs(work_dir: &Path, output_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(work_dir).await?;
    tokio::fs::create_dir_all(output_dir).await?;
    Ok(())
}

/// Ensure the conversion tool exists at `tool_path`, downloading it if absent
pub async fn ensure_tool(
    client: &reqwest::Client,
    config: &ConverterConfig,
    tool_path: &Path,
    timeout: Duration,
) -> Result<()> {
    if tool_path.exists() {
        tracing::info!(path = %tool_path.display(), "conversion tool already present, skipping download");
        return Ok(());
    }

    let releases: Vec<Release> = client
        .get(&config.api_url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let download_url = find_download_url(&releases, &config.binary_pattern, &config.file_extension)
        .ok_or(Error::ToolUrlNotFound)?;

    tracing::info!(url = %download_url, "downloading conversion tool");

    // Archive downloads get twice the normal request timeout
    let mut response = client
        .get(&download_url)
        .timeout(timeout * 2)
        .send()
        .await?
        .error_for_status()?;

    let gz_path = tool_path.with_extension("gz");
    let download: Result<()> = async {
        let mut archive = tokio::fs::File::create(&gz_path).await?;
        while let Some(chunk) = response.chunk().await? {
            archive.write_all(&chunk).await?;
        }
        archive.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = download {
        let _ = tokio::fs::remove_file(&gz_path).await;
        return Err(e);
    }

    unpack_tool(&gz_path, tool_path).await?;
    tokio::fs::remove_file(&gz_path).await?;

    tracing::info!(path = %tool_path.display(), "conversion tool installed");
    Ok(())
}

/// Pick the download URL of the first prerelease asset matching the
/// configured platform pattern and file extension
fn find_download_url(releases: &[Release], pattern: &str, extension: &str) -> Option<String> {
    releases
        .iter()
        .filter(|release| release.tag_name.contains("Prerelease-Alpha"))
        .flat_map(|release| release.assets.iter())
        .find(|asset| asset.name.contains(pattern) && asset.name.ends_with(extension))
        .map(|asset| asset.browser_download_url.clone())
}

/// Gunzip the archive to the tool path and mark it executable
async fn unpack_tool(gz_path: &Path, tool_path: &Path) -> Result<()> {
    let gz_path = gz_path.to_path_buf();
    let tool_path: PathBuf = tool_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        use flate2::read::GzDecoder;
        use std::io::copy;

        let archive = std::fs::File::open(&gz_path)?;
        let mut decoder = GzDecoder::new(archive);
        let mut out = std::fs::File::create(&tool_path)?;
        copy(&mut decoder, &mut out)?;
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tool_path, std::fs::Permissions::from_mode(0o755))?;
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::Other(format!("unpack task failed: {e}")))?
}
