//! Which resources may get a registry group created on demand.

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Allow-list of shell-style glob patterns over resource identifiers.
///
/// An empty list forbids group creation altogether.
#[derive(Debug, Clone)]
pub struct GroupCreationPolicy {
    patterns: Vec<String>,
    matcher: GlobSet,
}

impl GroupCreationPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            matcher: builder.build()?,
        })
    }

    pub fn should_create_group(&self, resource: &str) -> bool {
        self.matcher.is_match(resource)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
