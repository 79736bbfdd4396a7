//! Server version numbers

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid version string {0:?}")]
pub struct ParseVersionError(String);

/// `major.minor.patch`, ordered numerically
///
/// Parsing ignores anything past the patch component and reads missing
/// minor or patch components as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseVersionError(s.to_string()));
        }

        let mut parts = [0u32; 3];
        for (slot, component) in parts.iter_mut().zip(trimmed.splitn(4, '.')) {
            *slot = component
                .parse()
                .map_err(|_| ParseVersionError(s.to_string()))?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("7.2.4".parse::<Version>().unwrap(), Version::new(7, 2, 4));
        assert_eq!("3.0".parse::<Version>().unwrap(), Version::new(3, 0, 0));
        assert_eq!("8".parse::<Version>().unwrap(), Version::new(8, 0, 0));
        assert_eq!(
            "2.8.9.rc1".parse::<Version>().unwrap(),
            Version::new(2, 8, 9)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("7.x.1".parse::<Version>().is_err());
        assert!("unstable".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let v = |s: &str| s.parse::<Version>().unwrap();
        assert!(v("2.8.9") < v("3.0.4"));
        assert!(v("3.0.10") > v("3.0.9"));
        assert!(v("10.0.0") > v("9.9.9"));
        assert_eq!(Version::new(3, 0, 4).to_string(), "3.0.4");
    }
}
