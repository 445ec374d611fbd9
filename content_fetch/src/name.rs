use std::fmt;
use std::str::FromStr;

use crate::error::{ContentFetchError, Result};

const VERSION_MARKER: &str = "v=";

/// A caller supplied content name without a version qualifier, e.g. `/example/object`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseName {
    components: Vec<String>,
}

/// A base name qualified with a discovered version, e.g. `/example/object/v=3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionedName {
    base: BaseName,
    version: u64,
}

fn parse_version_component(component: &str) -> Option<u64> {
    component.strip_prefix(VERSION_MARKER)?.parse().ok()
}

impl BaseName {
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn with_version(&self, version: u64) -> VersionedName {
        VersionedName {
            base: self.clone(),
            version,
        }
    }
}

impl FromStr for BaseName {
    type Err = ContentFetchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Err(ContentFetchError::InvalidName(format!("{trimmed:?} does not start with '/'")));
        };

        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Err(ContentFetchError::InvalidName("name has no components".to_string()));
        }

        let mut components = Vec::new();
        for component in rest.split('/') {
            if component.is_empty() {
                return Err(ContentFetchError::InvalidName(format!("{trimmed:?} contains an empty component")));
            }
            if parse_version_component(component).is_some() {
                return Err(ContentFetchError::InvalidName(format!(
                    "{trimmed:?} already carries a version component"
                )));
            }
            components.push(component.to_string());
        }

        Ok(Self { components })
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl VersionedName {
    pub fn base(&self) -> &BaseName {
        &self.base
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

impl FromStr for VersionedName {
    type Err = ContentFetchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let Some((base, last)) = trimmed.rsplit_once('/') else {
            return Err(ContentFetchError::InvalidName(format!("{trimmed:?} does not start with '/'")));
        };

        let version = parse_version_component(last)
            .ok_or_else(|| ContentFetchError::InvalidName(format!("{trimmed:?} has no trailing version component")))?;

        Ok(Self {
            base: base.parse()?,
            version,
        })
    }
}

impl fmt::Display for VersionedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{VERSION_MARKER}{}", self.base, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_parsing() {
        let name: BaseName = "/example/object".parse().unwrap();
        assert_eq!(name.components(), &["example".to_string(), "object".to_string()]);
        assert_eq!(name.to_string(), "/example/object");

        let trailing: BaseName = "/example/object/".parse().unwrap();
        assert_eq!(trailing, name);
    }

    #[test]
    fn test_base_name_rejects_malformed() {
        for bad in ["", "/", "example/object", "/example//object", "/example/object/v=2"] {
            let res = bad.parse::<BaseName>();
            assert!(matches!(res, Err(ContentFetchError::InvalidName(_))), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_versioned_name() {
        let base: BaseName = "/example/object".parse().unwrap();
        let versioned = base.with_version(3);
        assert_eq!(versioned.to_string(), "/example/object/v=3");

        let parsed: VersionedName = "/example/object/v=3".parse().unwrap();
        assert_eq!(parsed, versioned);
        assert_eq!(parsed.base(), &base);
        assert_eq!(parsed.version(), 3);
    }

    #[test]
    fn test_versioned_name_requires_version() {
        assert!("/example/object".parse::<VersionedName>().is_err());
        assert!("/example/object/v=abc".parse::<VersionedName>().is_err());
        assert!("/v=3".parse::<VersionedName>().is_err());
        assert!("v=3".parse::<VersionedName>().is_err());
    }
}
