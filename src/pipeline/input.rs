//! Input resolution: normalise a user-supplied path or URL to a local file,
//! then decide whether it is EPS or PDF.
//!
//! ## Why download to a temp file?
//!
//! pdfium and qpdf both want a file-system path. Downloading to a `TempDir`
//! gives them one while ensuring cleanup happens when `ResolvedInput` is
//! dropped, even if the process panics.

use crate::error::PageBoxError;
use crate::output::DocumentKind;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Bytes inspected for kind detection.
const MAGIC_LEN: usize = 4;

/// DOS EPS binary header magic.
const DOS_EPS_MAGIC: [u8; 4] = [0xC5, 0xD0, 0xD3, 0xC6];

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the document was downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until analysis completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the document regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PageBoxError> {
    if input.trim().is_empty() {
        return Err(PageBoxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, PageBoxError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(PageBoxError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PageBoxError::PermissionDenied { path });
        }
        Err(_) => return Err(PageBoxError::FileNotFound { path }),
    }

    debug!("Resolved local document: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PageBoxError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| PageBoxError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PageBoxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| PageBoxError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            PageBoxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PageBoxError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

impl DocumentKind {
    /// Decide the kind from the leading bytes, then from the extension.
    ///
    /// `%PDF` is PDF; `%!PS` or the DOS EPS header is EPS. When the magic is
    /// inconclusive, `.pdf` means PDF and `.eps` / `.epsf` / `.ps` mean EPS.
    pub fn detect(head: &[u8], path: &Path) -> Result<DocumentKind, PageBoxError> {
        if head.starts_with(b"%PDF") {
            return Ok(DocumentKind::Pdf);
        }
        if head.starts_with(b"%!PS") || head.starts_with(&DOS_EPS_MAGIC) {
            return Ok(DocumentKind::Eps);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some("eps" | "epsf" | "ps") => Ok(DocumentKind::Eps),
            _ => Err(PageBoxError::UnsupportedDocument {
                path: path.to_path_buf(),
                magic: head.iter().take(MAGIC_LEN).copied().collect(),
            }),
        }
    }
}

/// Read the first few bytes of a file for [`DocumentKind::detect`].
pub fn read_magic(path: &Path) -> Result<Vec<u8>, PageBoxError> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PageBoxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PageBoxError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    let mut head = Vec::with_capacity(MAGIC_LEN);
    file.take(MAGIC_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| PageBoxError::Internal(format!("Failed to read '{}': {}", path.display(), e)))?;
    Ok(head)
}
