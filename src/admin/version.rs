//! Gerrit version strings.

use std::fmt;

use super::AdminError;

/// A `major.minor.micro` server version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GerritVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl GerritVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// `create-project` takes the name positionally from 2.12 on; older
    /// servers need `--name`.
    #[must_use]
    pub fn supports_positional_project_name(&self) -> bool {
        *self >= Self::new(2, 12, 0)
    }
}

impl fmt::Display for GerritVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// Parse a version such as `2.16.7` or `3.4.1-12-gdeadbeef`.
///
/// Anything after the first `-` is ignored and missing components are 0.
///
/// # Errors
///
/// Returns `AdminError::InvalidVersion` if a component is not a number.
pub fn parse_version(version: &str) -> Result<GerritVersion, AdminError> {
    let base = version.split('-').next().unwrap_or_default();
    let mut parts = [0u32; 3];
    for (slot, part) in parts.iter_mut().zip(base.split('.')) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| AdminError::InvalidVersion(version.to_string()))?;
    }
    Ok(GerritVersion::new(parts[0], parts[1], parts[2]))
}

/// Extract the version token from `gerrit version` output
/// (`gerrit version 3.4.1`).
#[must_use]
pub fn version_from_output(output: &str) -> Option<&str> {
    output.split_whitespace().nth(2)
}
