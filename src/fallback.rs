//! Locale fallback chain
//!
//! Read-time only: desired locale, then the default locale, then the
//! caller's hardcoded literal. Nothing resolved here is ever written back to
//! the store, so coverage diffs keep seeing untranslated locales as missing.

use serde::Serialize;

use crate::resolver::{
    ResolvedTree,
    resolve,
};
use crate::store::ContentStore;

/// Where a resolved string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "camelCase")]
pub enum Resolution<'a> {
    Desired(&'a str),
    Default(&'a str),
    Literal(&'a str),
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub const fn value(self) -> &'a str {
        match self {
            Self::Desired(v) | Self::Default(v) | Self::Literal(v) => v,
        }
    }

    #[must_use]
    pub const fn is_fallback(self) -> bool {
        !matches!(self, Self::Desired(_))
    }
}

/// Fallback policy anchored on the site's primary authored locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    default_locale: String,
}

impl FallbackChain {
    #[must_use]
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self { default_locale: default_locale.into() }
    }

    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Resolves `path` against the desired tree, then the default tree, then
    /// `literal`.
    #[must_use]
    pub fn lookup<'a>(
        &self,
        desired: &'a ResolvedTree,
        default: &'a ResolvedTree,
        path: &str,
        literal: &'a str,
    ) -> Resolution<'a> {
        if let Some(value) = desired.get(path) {
            return Resolution::Desired(value);
        }
        if let Some(value) = default.get(path) {
            return Resolution::Default(value);
        }
        Resolution::Literal(literal)
    }

    /// Loads the desired and default trees for one rendering request.
    pub async fn load<S: ContentStore>(&self, store: &S, locale: &str) -> LocalizedMessages {
        let desired = resolve(store, locale).await;
        let default = if locale == self.default_locale {
            desired.clone()
        } else {
            resolve(store, &self.default_locale).await
        };
        LocalizedMessages { chain: self.clone(), desired, default }
    }
}

/// Desired and default trees bundled for lookups.
#[derive(Debug, Clone)]
pub struct LocalizedMessages {
    chain: FallbackChain,
    desired: ResolvedTree,
    default: ResolvedTree,
}

impl LocalizedMessages {
    #[must_use]
    pub fn locale(&self) -> &str {
        self.desired.locale()
    }

    #[must_use]
    pub const fn desired(&self) -> &ResolvedTree {
        &self.desired
    }

    #[must_use]
    pub fn lookup<'a>(&'a self, path: &str, literal: &'a str) -> Resolution<'a> {
        self.chain.lookup(&self.desired, &self.default, path, literal)
    }

    /// Resolved string for `path`; always returns something.
    #[must_use]
    pub fn text<'a>(&'a self, path: &str, literal: &'a str) -> &'a str {
        self.lookup(path, literal).value()
    }
}
