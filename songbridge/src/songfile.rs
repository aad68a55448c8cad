//! Line-oriented song and identifier files
//!
//! Two file shapes share this module:
//! - the query file: one track query per line, blank lines ignored on read;
//! - the identifier artifact: one line per resolved entry, in query order,
//!   where an empty line marks an unresolved track. The artifact is written
//!   after resolution completes so population can be re-run without
//!   re-resolving.

use crate::clients::VideoId;
use songbridge_common::{Error, Result};
use std::path::Path;

/// Read track queries; blank lines are filtered here, before resolution.
pub fn read_queries(path: &Path) -> Result<Vec<String>> {
    let content = read_file(path)?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Write one query per line.
pub fn write_queries(path: &Path, queries: &[String]) -> Result<()> {
    let mut out = String::new();
    for query in queries {
        out.push_str(query);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Write the identifier artifact: same line count and order as the query
/// sequence, empty line for an unresolved track.
pub fn write_identifiers(path: &Path, identifiers: &[Option<VideoId>]) -> Result<()> {
    let mut out = String::new();
    for entry in identifiers {
        if let Some(id) = entry {
            out.push_str(id.as_str());
        }
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Read an identifier artifact back, preserving unresolved placeholders.
pub fn read_identifiers(path: &Path) -> Result<Vec<Option<VideoId>>> {
    let content = read_file(path)?;

    Ok(content
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(VideoId(trimmed.to_string()))
            }
        })
        .collect())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("file {}", path.display()))
        } else {
            Error::Io(e)
        }
    })
}
