//! Session cookie blob handling for the interactive populate path
//!
//! Cookies arrive as a JSON array exported from a real browser. Exports are
//! messy: `sameSite` carries values the WebDriver rejects and expiry may be
//! a float. Entries are normalized on load so the rest of the code only ever
//! sees the three enumerated same-site policies and integer epochs.
//!
//! A converter from the Netscape `cookies.txt` format is included for
//! exports produced by browser extensions.

use serde::{Deserialize, Serialize};
use songbridge_common::{Error, Result};
use std::path::Path;

/// Same-site policy, normalized to the three values a browser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

/// One normalized session cookie
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieEntry {
    pub domain: String,
    pub path: String,
    pub name: String,
    pub value: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSitePolicy,
    /// Epoch seconds; absent for session cookies
    pub expires: Option<i64>,
}

/// Raw cookie entry as exported by a browser, before normalization
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCookie {
    domain: String,
    #[serde(default = "default_path")]
    path: String,
    name: String,
    value: String,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
    #[serde(default)]
    same_site: Option<String>,
    // some exports write "expiry", some "expires", some a float
    #[serde(default, alias = "expiry")]
    expires: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl RawCookie {
    fn normalize(self) -> CookieEntry {
        let same_site = match self.same_site.as_deref() {
            Some("Strict") => SameSitePolicy::Strict,
            Some("Lax") => SameSitePolicy::Lax,
            // anything else ("no_restriction", "unspecified", lowercase
            // variants) collapses to None, matching what the export meant
            _ => SameSitePolicy::None,
        };

        CookieEntry {
            domain: self.domain,
            path: self.path,
            name: self.name,
            value: self.value,
            secure: self.secure,
            http_only: self.http_only,
            same_site,
            expires: self.expires.map(|e| e as i64),
        }
    }
}

/// Load and normalize a JSON cookie blob.
pub fn load_cookie_file(path: &Path) -> Result<Vec<CookieEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("cookie file {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    let raw: Vec<RawCookie> = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("cookie file {}: {}", path.display(), e)))?;

    let cookies: Vec<CookieEntry> = raw.into_iter().map(RawCookie::normalize).collect();

    tracing::debug!(path = %path.display(), count = cookies.len(), "Loaded cookie blob");

    Ok(cookies)
}

/// Convert a Netscape `cookies.txt` export into the JSON blob format.
///
/// Returns the number of cookies converted. Comment and blank lines are
/// skipped, as are lines that do not carry exactly seven tab-separated
/// fields.
pub fn convert_netscape_file(txt_path: &Path, json_path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(txt_path)?;

    let mut cookies = Vec::new();
    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 7 {
            continue;
        }

        let [domain, _flag, path, secure, expiry, name, value] = parts[..] else {
            continue;
        };

        cookies.push(CookieEntry {
            domain: domain.to_string(),
            path: path.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            secure: secure.eq_ignore_ascii_case("true"),
            http_only: false,
            same_site: SameSitePolicy::Lax,
            expires: match expiry.parse::<i64>() {
                Ok(0) | Err(_) => None,
                Ok(epoch) => Some(epoch),
            },
        });
    }

    let json = serde_json::to_string_pretty(&cookies)
        .map_err(|e| Error::Internal(format!("cannot serialize cookies: {}", e)))?;
    std::fs::write(json_path, json)?;

    tracing::info!(
        input = %txt_path.display(),
        output = %json_path.display(),
        count = cookies.len(),
        "Converted cookies.txt"
    );

    Ok(cookies.len())
}
