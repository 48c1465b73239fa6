//! Short-name to host-name path resolution.
//!
//! Clients send case-insensitive 8.3 pathnames with `\` separators; the
//! host filesystem is case-sensitive and long-named. [`resolve`] walks the
//! requested components one directory at a time, matching each against the
//! FCB rendering of the actual entries, and rebuilds the path in the host's
//! own spelling.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::dos::Fcb;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Empty request or missing leading separator.
    Invalid,
    /// A component had no FCB match. `partial` holds the host path built so
    /// far with the failing component appended verbatim; MKDIR and wildcard
    /// DELETE rely on it.
    NotFound { partial: PathBuf },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Invalid => write!(f, "invalid request path"),
            Error::NotFound { partial } => {
                write!(f, "no entry matching '{}'", partial.display())
            }
        }
    }
}

/// Normalizes a raw wire path: lossy UTF-8, lowercased, backslashes turned
/// into slashes, and a leading `X:` drive prefix stripped if present.
pub fn normalize(raw: &[u8]) -> String {
    let raw = if raw.get(1) == Some(&b':') { &raw[2..] } else { raw };
    String::from_utf8_lossy(raw)
        .chars()
        .map(|c| if c == '\\' { '/' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Splits a normalized request into its directory part (separator included)
/// and the final component (a filename or search mask).
pub fn split(request: &str) -> (&str, &str) {
    match request.rfind('/') {
        Some(i) => request.split_at(i + 1),
        None => ("", request),
    }
}

/// Whether a request directory part names the root of its drive.
pub fn is_root_request(dir_part: &str) -> bool {
    !dir_part.trim_start_matches('/').contains('/')
}

/// Joins a normalized request under the drive root without resolving it
/// against the host's case. RENAME checks its destination this way.
pub fn literal(root: &Path, request: &str) -> PathBuf {
    root.join(request.trim_start_matches('/'))
}

/// Resolves a normalized request against a drive root into the host path
/// whose components carry the host's actual case.
///
/// Each component must FCB-match an entry of the directory resolved so far;
/// non-final components additionally have to be directories. `..` has no
/// special meaning and simply fails to match.
pub fn resolve(root: &Path, request: &str) -> Result<PathBuf, Error> {
    if request.is_empty() || !request.starts_with('/') {
        return Err(Error::Invalid);
    }
    let mut resolved = root.to_path_buf();
    let mut components = request.split('/').filter(|c| !c.is_empty()).peekable();
    while let Some(component) = components.next() {
        let final_component = components.peek().is_none();
        let wanted = Fcb::from_name(component.as_bytes());
        let mut matched = None;
        if let Ok(entries) = std::fs::read_dir(&resolved) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if Fcb::from_os_name(&name) != wanted {
                    continue;
                }
                // A matching name that is not a directory cannot carry the
                // rest of the path; keep scanning.
                if !final_component && !entry.file_type().map_or(false, |t| t.is_dir()) {
                    continue;
                }
                matched = Some(name);
                break;
            }
        }
        match matched {
            Some(name) => resolved.push(name),
            None => {
                resolved.push(component);
                return Err(Error::NotFound { partial: resolved });
            }
        }
    }
    Ok(resolved)
}
