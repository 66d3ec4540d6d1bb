//! Route classification tables.
//!
//! Built once from configuration and immutable afterwards; a config reload
//! builds a whole new table.

use crate::config::RoutesConfig;
use crate::routing::matcher::{AnyMatcher, ExtensionMatcher, Matcher, PathPrefixMatcher};

/// Category of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable only while signed out (login, register, ...).
    Public,
    /// Requires the auth cookie.
    Protected,
    Unclassified,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Protected => "protected",
            RouteClass::Unclassified => "unclassified",
        }
    }
}

/// Ordered public/protected prefix lists plus the static-asset filter.
#[derive(Debug)]
pub struct RouteTable {
    public: Vec<PathPrefixMatcher>,
    protected: Vec<PathPrefixMatcher>,
    static_assets: AnyMatcher,
}

impl RouteTable {
    pub fn new<P, Q>(public: P, protected: Q, static_assets: AnyMatcher) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self {
            public: public.into_iter().map(PathPrefixMatcher::new).collect(),
            protected: protected.into_iter().map(PathPrefixMatcher::new).collect(),
            static_assets,
        }
    }

    pub fn from_config(config: &RoutesConfig) -> Self {
        let mut static_assets = AnyMatcher::default();
        for prefix in &config.static_prefixes {
            static_assets.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }
        if !config.static_extensions.is_empty() {
            static_assets.push(Box::new(ExtensionMatcher::new(&config.static_extensions)));
        }

        Self::new(
            config.public.iter().cloned(),
            config.protected.iter().cloned(),
            static_assets,
        )
    }

    /// Public prefixes are checked first; first match wins.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public.iter().any(|m| m.matches(path)) {
            RouteClass::Public
        } else if self.protected.iter().any(|m| m.matches(path)) {
            RouteClass::Protected
        } else {
            RouteClass::Unclassified
        }
    }

    /// API paths and dynamic pages are limited; static assets and
    /// framework-internal paths are not.
    pub fn is_rate_limited(&self, path: &str) -> bool {
        !self.static_assets.matches(path)
    }
}
