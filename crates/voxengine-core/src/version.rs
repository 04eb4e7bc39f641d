//! Core version identifiers and their ordering.
//!
//! Versions follow the `MAJOR.MINOR.PATCH[-PRE][+BUILD]` shape. The registry
//! never requires a version to parse: strings that do not parse still get a
//! place in the total order, below every well-formed version.

use crate::error::{EngineError, EngineResult};
use std::cmp::Ordering;
use std::fmt;

/// Version reserved for the always-available mock core
pub const MOCK_CORE_VERSION: &str = "0.0.0";

/// One dot-separated pre-release identifier
#[derive(Debug, Clone, PartialEq, Eq)]
enum PreIdent {
    Numeric(u64),
    Alpha(String),
}

impl Ord for PreIdent {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Alpha(_)) => Ordering::Less,
            (Self::Alpha(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Alpha(a), Self::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PreIdent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed core version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreVersion {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    pre: Vec<PreIdent>,
    build: Option<String>,
}

impl CoreVersion {
    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidVersion`] if the string is not of the form
    /// `MAJOR.MINOR.PATCH[-PRE][+BUILD]`.
    pub fn parse(input: &str) -> EngineResult<Self> {
        let invalid = || EngineError::invalid_version(input);

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) if !build.is_empty() => (rest, Some(build.to_string())),
            Some(_) => return Err(invalid()),
            None => (input, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre)),
            Some(_) => return Err(invalid()),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let mut next_number = || -> EngineResult<u64> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let major = next_number()?;
        let minor = next_number()?;
        let patch = next_number()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let pre = match pre {
            Some(pre) => pre
                .split('.')
                .map(|ident| {
                    if ident.is_empty() {
                        Err(invalid())
                    } else if ident.bytes().all(|b| b.is_ascii_digit()) {
                        ident.parse().map(PreIdent::Numeric).map_err(|_| invalid())
                    } else {
                        Ok(PreIdent::Alpha(ident.to_string()))
                    }
                })
                .collect::<EngineResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }

    /// Whether this is a pre-release version
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

/// Precedence ordering; build metadata does not take part.
impl Ord for CoreVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for CoreVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self
                .pre
                .iter()
                .map(|ident| match ident {
                    PreIdent::Numeric(n) => n.to_string(),
                    PreIdent::Alpha(s) => s.clone(),
                })
                .collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// Total order over raw version strings.
///
/// Parsable versions compare by precedence with ties broken on the raw
/// string; unparsable strings sort below all parsable ones.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (CoreVersion::parse(a), CoreVersion::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Greatest version in `versions`, or `None` if there are none.
pub fn latest_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
