//! Service version parsing for shape detection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::CheckError;

/// First release that reports pipelines as a map of named pipelines.
pub const NAMED_PIPELINES_SINCE: ServiceVersion = ServiceVersion::new(6, 0, 0);

/// First release whose node stats carry the `status` health indicator.
pub const NODE_STATUS_SINCE: ServiceVersion = ServiceVersion::new(7, 0, 0);

/// Version reported by the node stats API (`"version": "6.8.23"`).
///
/// Missing minor/patch components count as zero. A pre-release suffix
/// (`6.0.0-beta1`) orders before the corresponding release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<String>,
}

impl ServiceVersion {
    /// Create a release version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Whether snapshots of this version carry the named multi-pipeline map.
    pub fn has_named_pipelines(&self) -> bool {
        *self >= NAMED_PIPELINES_SINCE
    }

    pub fn reports_node_status(&self) -> bool {
        *self >= NODE_STATUS_SINCE
    }
}

impl FromStr for ServiceVersion {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CheckError::InvalidField(format!("version (unrecognised value {:?})", s));

        let s = s.trim();
        let (release, pre) = match s.split_once('-') {
            Some((release, pre)) if !pre.is_empty() => (release, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (s, None),
        };

        let mut parts = release.split('.');
        let mut next = |required: bool| -> Result<u32, CheckError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl Ord for ServiceVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for ServiceVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}
