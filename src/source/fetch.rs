use std::time::Duration;

use anyhow::{Context as _, bail};

use crate::source::reference::{ImageRef, sniff_mime};

/// Limits applied while loading a reference's bytes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchOpts {
    /// Upper bound on one load. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Largest accepted payload in bytes.
    pub max_bytes: u64,
}

impl Default for FetchOpts {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Raw bytes of a loaded reference.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type reported by the source, or sniffed from the content of local files.
    pub mime: Option<String>,
}

/// Load the encoded bytes behind `reference`.
///
/// Data URIs resolve without IO, files go through `tokio::fs`, URLs through `reqwest`. Requires a
/// tokio runtime with the time driver when `opts.timeout` is set.
pub async fn fetch_bytes(reference: &ImageRef, opts: &FetchOpts) -> anyhow::Result<Fetched> {
    let fut = fetch_unbounded(reference, opts.max_bytes);
    let fetched = match opts.timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .with_context(|| format!("load '{}' timed out after {limit:?}", reference.describe()))??,
        None => fut.await?,
    };
    check_len(fetched.bytes.len() as u64, opts.max_bytes)?;
    Ok(fetched)
}

async fn fetch_unbounded(reference: &ImageRef, max_bytes: u64) -> anyhow::Result<Fetched> {
    match reference {
        ImageRef::Data(d) => Ok(Fetched {
            bytes: d.bytes.clone(),
            mime: Some(d.mime.clone()),
        }),
        ImageRef::File(path) => {
            let meta = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("stat '{}'", path.display()))?;
            check_len(meta.len(), max_bytes)?;
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("read '{}'", path.display()))?;
            let mime = Some(sniff_mime(&bytes).to_string());
            Ok(Fetched { bytes, mime })
        }
        ImageRef::Url(url) => fetch_url(url, max_bytes).await,
    }
}

async fn fetch_url(url: &str, max_bytes: u64) -> anyhow::Result<Fetched> {
    let mut resp = reqwest::get(url)
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned {status}");
    }
    if let Some(len) = resp.content_length() {
        check_len(len, max_bytes)?;
    }

    let mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    // Content-Length is optional, so the cap is enforced per chunk.
    let mut bytes = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .with_context(|| format!("read body of {url}"))?
    {
        check_len((bytes.len() + chunk.len()) as u64, max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(Fetched { bytes, mime })
}

fn check_len(len: u64, max_bytes: u64) -> anyhow::Result<()> {
    if len > max_bytes {
        bail!("image payload is {len} bytes (max {max_bytes})");
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/source/fetch.rs"]
mod tests;
