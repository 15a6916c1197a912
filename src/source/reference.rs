use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::{Context as _, bail};
use base64::{Engine as _, engine::general_purpose};

/// MIME type of encoded PNG output.
pub const PNG_MIME: &str = "image/png";
/// MIME type used to recognize SVG logos.
pub const SVG_MIME: &str = "image/svg+xml";

/// A loadable image reference: inline data, a URL, or a local file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageRef {
    /// `data:` URI with its payload already decoded.
    Data(DataUri),
    /// `http://` or `https://` URL.
    Url(String),
    /// `file://` URL or bare filesystem path.
    File(PathBuf),
}

impl ImageRef {
    /// Parse a reference string.
    ///
    /// Strings with a `scheme://` prefix other than `http`, `https` or `file` are rejected; anything
    /// else without a scheme is taken as a filesystem path.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("image reference must be non-empty");
        }
        if starts_with_ignore_case(s, "data:") {
            return DataUri::parse(s).map(Self::Data);
        }
        if let Some((scheme, rest)) = s.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "http" | "https" => Ok(Self::Url(s.to_string())),
                "file" => {
                    if rest.is_empty() {
                        bail!("file URL has no path");
                    }
                    let path = String::from_utf8(percent_decode(rest)?)
                        .context("file URL path is not UTF-8")?;
                    Ok(Self::File(PathBuf::from(path)))
                }
                other => bail!("unsupported image reference scheme '{other}'"),
            };
        }
        Ok(Self::File(PathBuf::from(s)))
    }

    /// MIME type known before fetching, if any.
    pub fn declared_mime(&self) -> Option<&str> {
        match self {
            Self::Data(d) => Some(d.mime.as_str()),
            Self::Url(_) | Self::File(_) => None,
        }
    }

    /// Short description safe to log; inline payloads are summarized, not printed.
    pub fn describe(&self) -> String {
        match self {
            Self::Data(d) => format!("data:{} ({} bytes)", d.mime, d.bytes.len()),
            Self::Url(u) => u.clone(),
            Self::File(p) => p.display().to_string(),
        }
    }
}

impl FromStr for ImageRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DataUri> for ImageRef {
    fn from(value: DataUri) -> Self {
        Self::Data(value)
    }
}

/// A decoded `data:` URI.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Media type without parameters, lowercased (e.g. `image/png`).
    pub mime: String,
    /// Decoded payload bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl DataUri {
    /// Wrap raw bytes with an explicit MIME type.
    pub fn from_bytes(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into().to_ascii_lowercase(),
            bytes,
        }
    }

    /// Parse `data:<mime>[;param]*[;base64],<payload>`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if !starts_with_ignore_case(s, "data:") {
            bail!("data URI must start with 'data:'");
        }
        let (header, payload) = s["data:".len()..]
            .split_once(',')
            .context("data URI has no ',' separating header from payload")?;

        let mut params = header.split(';');
        let media = params.next().unwrap_or("").trim();
        let mut is_base64 = false;
        for p in params {
            if p.trim().eq_ignore_ascii_case("base64") {
                is_base64 = true;
            }
        }

        let mime = if media.is_empty() {
            "text/plain".to_string()
        } else if media.contains('/') {
            media.to_ascii_lowercase()
        } else {
            bail!("data URI media type '{media}' is not of the form type/subtype");
        };

        let bytes = if is_base64 {
            decode_base64(payload).context("decode data URI base64 payload")?
        } else {
            percent_decode(payload).context("decode data URI percent-encoded payload")?
        };

        Ok(Self { mime, bytes })
    }

    /// Render as a base64 `data:` URI string.
    pub fn to_uri_string(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Whether the payload is declared as SVG.
    pub fn is_svg(&self) -> bool {
        self.mime == SVG_MIME
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri_string())
    }
}

/// Guess a MIME type from leading bytes.
///
/// Raster formats are recognized through `image`'s magic-number table; SVG by its root element.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }
    if looks_like_svg(bytes) {
        return SVG_MIME;
    }
    "application/octet-stream"
}

/// Whether `bytes` look like an SVG document.
///
/// XML declarations, processing instructions, comments and a doctype may precede the `<svg` root.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
    let mut text = head.trim_start_matches('\u{feff}');
    loop {
        text = text.trim_start();
        let rest = if let Some(r) = text.strip_prefix("<?") {
            r.split_once("?>").map(|(_, after)| after)
        } else if let Some(r) = text.strip_prefix("<!--") {
            r.split_once("-->").map(|(_, after)| after)
        } else if starts_with_ignore_case(text, "<!doctype") {
            skip_doctype(text)
        } else {
            return text.starts_with("<svg");
        };
        match rest {
            Some(r) => text = r,
            None => return false,
        }
    }
}

/// Text after a `<!DOCTYPE ...>` declaration, including any `[...]` internal subset.
fn skip_doctype(text: &str) -> Option<&str> {
    let close = text.find('>')?;
    match text.find('[') {
        Some(open) if open < close => text[open..].split_once("]>").map(|(_, after)| after),
        _ => Some(&text[close + 1..]),
    }
}

fn decode_base64(payload: &str) -> anyhow::Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    // Some encoders percent-escape padding.
    let compact = compact.replace("%3D", "=").replace("%3d", "=");
    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(compact.as_bytes()))
        .context("invalid base64")
}

fn percent_decode(s: &str) -> anyhow::Result<Vec<u8>> {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex),
                bytes.get(i + 2).copied().and_then(hex),
            ) else {
                bail!("truncated or invalid percent escape at byte {i}");
            };
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
#[path = "../../tests/unit/source/reference.rs"]
mod tests;
