//! Storage names for staged uploads and generated artifacts
//!
//! Every name carries a uniqueness token so that concurrent requests never
//! share a path, even when clients upload files with identical names. The
//! token is a UUIDv7: time-ordered, monotonic within the process and random
//! across processes.

use uuid::Uuid;

/// Longest stem kept from a client-supplied file name
const MAX_STEM_CHARS: usize = 100;

/// Name used when nothing usable is left of the original file name
const FALLBACK_NAME: &str = "upload";

/// Generate a fresh uniqueness token (32 lowercase hex chars).
pub fn uniqueness_token() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Storage name for an upload: `<token>-<sanitized original name>`.
pub fn staged_name(original: &str) -> String {
    format!("{}-{}", uniqueness_token(), sanitize_file_name(original))
}

/// Name for an artifact the gateway names itself, e.g. `merged-<token>.pdf`.
pub fn artifact_name(prefix: &str, extension: &str) -> String {
    format!("{}-{}.{}", prefix, uniqueness_token(), extension)
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, leading dots are removed and overly long stems are truncated while
/// the extension is preserved.
pub fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(original);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    let (stem, extension) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 => (&cleaned[..idx], Some(&cleaned[idx + 1..])),
        _ => (cleaned, None),
    };

    // Only ASCII survives the map above, so byte slicing is char-safe.
    let stem = &stem[..stem.len().min(MAX_STEM_CHARS)];
    if stem.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem.to_string(),
    }
}

/// File name without its last extension.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
