//! Permission codes and per-user permission sets.
//!
//! The registry is closed: a code is either one of [`Permission::ALL`] or it is
//! rejected. Membership checks are exact; there is no hierarchy or wildcard.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown permission code: {0}")]
pub struct UnknownPermission(pub String);

/// A gated capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    MoviesRead,
    MoviesWrite,
}

impl Permission {
    pub const ALL: [Self; 2] = [Self::MoviesRead, Self::MoviesWrite];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MoviesRead => "movies:read",
            Self::MoviesWrite => "movies:write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// The resolved set of codes held by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(HashSet<String>);

impl Permissions {
    #[must_use]
    pub fn includes(&self, permission: Permission) -> bool {
        self.0.contains(permission.code())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Permissions {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_codes() {
        assert_eq!(
            "movies:read".parse::<Permission>(),
            Ok(Permission::MoviesRead)
        );
        assert_eq!(
            "movies:write".parse::<Permission>(),
            Ok(Permission::MoviesWrite)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_partial_codes() {
        assert!("movies:*".parse::<Permission>().is_err());
        assert!("movies".parse::<Permission>().is_err());
        assert!("MOVIES:WRITE".parse::<Permission>().is_err());
        assert!("".parse::<Permission>().is_err());
    }

    #[test]
    fn test_includes_is_exact() {
        let set: Permissions = vec!["movies:read".to_string()].into_iter().collect();

        assert!(set.includes(Permission::MoviesRead));
        assert!(!set.includes(Permission::MoviesWrite));
    }

    #[test]
    fn test_prefix_codes_do_not_match() {
        let set: Permissions = vec!["movies:write-extra".to_string(), "movies".to_string()]
            .into_iter()
            .collect();

        assert!(!set.includes(Permission::MoviesWrite));
        assert!(!set.includes(Permission::MoviesRead));
    }

    #[test]
    fn test_empty_set() {
        let set = Permissions::default();
        assert!(set.is_empty());
        assert!(!set.includes(Permission::MoviesRead));
    }
}
