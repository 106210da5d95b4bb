//! `file://` URI ↔ filesystem path conversion.

use lsp_types::Uri;
use std::path::{Path, PathBuf};

/// Convert an LSP URI to a file system path.
///
/// Handles `file:///path/to/file` URIs by stripping the scheme and authority
/// and percent-decoding (e.g. `%3A` → `:`).
pub fn uri_to_path(uri: &Uri) -> PathBuf {
    uri_str_to_path(uri.as_str())
}

/// Same as [`uri_to_path`] for a raw URI string.
pub fn uri_str_to_path(uri_str: &str) -> PathBuf {
    if let Some(path) = uri_str.strip_prefix("file://") {
        let decoded = percent_decode(path);
        // On Unix: file:///foo/bar -> /foo/bar
        // On Windows: file:///C:/foo -> C:/foo (strip leading /)
        #[cfg(windows)]
        {
            let decoded = decoded.strip_prefix('/').unwrap_or(&decoded);
            PathBuf::from(decoded)
        }
        #[cfg(not(windows))]
        {
            PathBuf::from(decoded)
        }
    } else {
        PathBuf::from(uri_str)
    }
}

/// Convert an absolute path to a `file://` URI, percent-encoding anything
/// outside the unreserved set. `None` if the result does not parse.
pub fn path_to_uri(path: &Path) -> Option<Uri> {
    let raw = path.to_string_lossy();
    #[cfg(windows)]
    let raw = format!("/{}", raw.replace('\\', "/"));
    format!("file://{}", percent_encode(&raw)).parse().ok()
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Decode percent-encoded characters in a URI path (e.g. `%3A` → `:`).
fn percent_decode(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    let mut chars = input.bytes();
    while let Some(b) = chars.next() {
        if b == b'%' {
            let hi = chars.next();
            let lo = chars.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if let (Some(h), Some(l)) = (hex_val(hi), hex_val(lo)) {
                    bytes.push(h << 4 | l);
                    continue;
                }
                // Malformed percent encoding -- pass through
                bytes.extend([b'%', hi, lo]);
            } else {
                bytes.push(b'%');
                bytes.extend(hi);
            }
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
