//! Serial device discovery.
//!
//! Resolves the device to bridge: either an explicit name, or the single
//! device matching a platform glob such as `/dev/tty.usbmodem*`.

use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Glob matched when no device is named explicitly.
#[cfg(target_os = "macos")]
pub const DEFAULT_PATTERN: &str = "/dev/tty.usbmodem*";
#[cfg(windows)]
pub const DEFAULT_PATTERN: &str = "COM*";
#[cfg(not(any(target_os = "macos", windows)))]
pub const DEFAULT_PATTERN: &str = "/dev/ttyACM*";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no devices found matching {pattern}")]
    NoDevices { pattern: String },

    #[error("too many devices to choose from: [{}]", .0.join(", "))]
    TooManyDevices(Vec<String>),

    #[error("invalid device pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to scan {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[from] serialport::Error),
}

/// Resolve the device path.
///
/// An explicit `name` wins: a bare name like `ttyACM0` is taken to live
/// under `/dev` (on Windows it is used verbatim), anything containing a path
/// separator is used as is. Otherwise `pattern` must match exactly one
/// device.
pub fn find_device(name: Option<&str>, pattern: &str) -> Result<PathBuf, DiscoveryError> {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        return Ok(explicit_path(name));
    }

    let mut candidates = glob(pattern)?;
    debug!(pattern, found = candidates.len(), "device scan");

    match candidates.len() {
        0 => Err(DiscoveryError::NoDevices {
            pattern: pattern.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::TooManyDevices(
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        )),
    }
}

fn explicit_path(name: &str) -> PathBuf {
    if name.contains('/') || name.contains('\\') || cfg!(windows) {
        PathBuf::from(name)
    } else {
        Path::new("/dev").join(name)
    }
}

/// All paths matching `pattern`, sorted.
///
/// A pattern with a directory part is matched against that directory's
/// entries. A bare pattern (`COM*`) is matched against the port names the OS
/// reports.
pub fn glob(pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let matcher = wildcard_regex(&file_pattern).map_err(|source| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches: Vec<PathBuf> = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => {
            let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
                dir: dir.to_path_buf(),
                source,
            })?;
            entries
                .filter_map(Result::ok)
                .filter(|e| matcher.is_match(&e.file_name().to_string_lossy()))
                .map(|e| dir.join(e.file_name()))
                .collect()
        }
        None => serialport::available_ports()?
            .into_iter()
            .filter(|p| matcher.is_match(&p.port_name))
            .map(|p| PathBuf::from(p.port_name))
            .collect(),
    };

    matches.sort();
    Ok(matches)
}

/// Translate a shell wildcard (`*`, `?`) into an anchored regex.
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                re.push_str(&regex::escape(&literal));
                literal.clear();
                re.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    Regex::new(&re)
}
