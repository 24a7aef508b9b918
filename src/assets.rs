//! Model asset provisioning. Model binaries are referenced by name and
//! resolved to download locations through an asset locator, so the host for
//! the pose-landmark models can be swapped without touching the detector.

use std::{
    env, fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::options::ModelComplexity;

const DEFAULT_ASSET_BASE: &str =
    "https://raw.githubusercontent.com/pose-lens/pose-lens-models/refs/heads/main/models";
const ASSET_BASE_ENV: &str = "POSE_LENS_ASSET_BASE";
const MODEL_DIR_ENV: &str = "POSE_LENS_MODEL_DIR";

/// Maps an internal asset name to the location it can be fetched from.
pub type AssetLocator = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn default_locator() -> AssetLocator {
    let base = env::var(ASSET_BASE_ENV).unwrap_or_else(|_| DEFAULT_ASSET_BASE.to_string());
    let base = base.trim_end_matches('/').to_string();
    Arc::new(move |name| format!("{base}/{name}"))
}

pub fn model_asset(complexity: ModelComplexity) -> &'static str {
    match complexity {
        ModelComplexity::Lite => "pose_landmark_lite.onnx",
        ModelComplexity::Full => "pose_landmark_full.onnx",
        ModelComplexity::Heavy => "pose_landmark_heavy.onnx",
    }
}

pub fn default_model_dir() -> PathBuf {
    env::var(MODEL_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("models"))
}

#[derive(Clone, Debug)]
pub enum DownloadEvent {
    AlreadyPresent {
        asset: &'static str,
    },
    Started {
        asset: &'static str,
        total: Option<u64>,
    },
    Progress {
        asset: &'static str,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        asset: &'static str,
    },
}

/// Makes sure `asset` exists at `dest`, downloading it through `locator` if
/// missing. Idempotent: a present file short-circuits without touching the
/// network.
pub fn ensure_asset_ready<F>(
    locator: &AssetLocator,
    asset: &'static str,
    dest: &Path,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(DownloadEvent),
{
    if dest.exists() {
        on_event(DownloadEvent::AlreadyPresent { asset });
        on_event(DownloadEvent::Finished { asset });
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    let url = locator(asset);
    download_to_path(asset, &url, dest, &mut on_event)
        .with_context(|| format!("failed to provision {asset} at {}", dest.display()))
}

fn download_to_path<F>(
    asset: &'static str,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(DownloadEvent),
{
    log::info!("downloading {asset} from {url} to {}", dest.display());

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total = response.content_length();
    on_event(DownloadEvent::Started { asset, total });

    // Stream into a sibling temp file and rename once complete, so a torn
    // download never masquerades as a usable model.
    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(DownloadEvent::Progress {
            asset,
            downloaded,
            total,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(DownloadEvent::Finished { asset });
    Ok(())
}

/// Wraps an event sink with a console progress bar. Used by the detector
/// worker, which has no window to report through.
pub fn with_progress_bar<F>(mut on_event: F) -> impl FnMut(DownloadEvent)
where
    F: FnMut(DownloadEvent),
{
    let mut progress: Option<ProgressBar> = None;
    move |event: DownloadEvent| {
        match &event {
            DownloadEvent::Started { total, .. } => {
                progress = Some(create_progress_bar(*total));
            }
            DownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            DownloadEvent::Finished { asset } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{asset} ready"));
                }
            }
            DownloadEvent::AlreadyPresent { .. } => {}
        }
        on_event(event);
    }
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap()
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} downloading model").unwrap();
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_joins_base_and_name() {
        let base = "https://example.test/assets".to_string();
        let locator: AssetLocator = Arc::new(move |name| format!("{base}/{name}"));
        assert_eq!(
            locator(model_asset(ModelComplexity::Heavy)),
            "https://example.test/assets/pose_landmark_heavy.onnx"
        );
    }

    #[test]
    fn present_asset_short_circuits_without_network() {
        let dir = env::temp_dir().join("pose-lens-asset-test");
        fs::create_dir_all(&dir).unwrap();
        let dest = dir.join("pose_landmark_lite.onnx");
        fs::write(&dest, b"stub").unwrap();

        // A locator that would fail loudly if the download path were taken.
        let locator: AssetLocator = Arc::new(|name| format!("http://127.0.0.1:1/{name}"));
        let mut events = Vec::new();
        ensure_asset_ready(&locator, "pose_landmark_lite.onnx", &dest, |evt| {
            events.push(evt)
        })
        .unwrap();

        assert!(matches!(events[0], DownloadEvent::AlreadyPresent { .. }));
        assert!(matches!(
            events.last(),
            Some(DownloadEvent::Finished { .. })
        ));
        fs::remove_file(&dest).ok();
    }
}
