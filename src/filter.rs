//! Child listing filters.

use glob::Pattern;

use crate::error::Result;
use crate::property::Resource;

/// Decides which resources a listing reports.
pub trait ResourceFilter: Send + Sync {
    fn is_pass(&self, resource: &Resource) -> bool;
}

impl<F> ResourceFilter for F
where
    F: Fn(&Resource) -> bool + Send + Sync,
{
    fn is_pass(&self, resource: &Resource) -> bool {
        self(resource)
    }
}

/// Passes resources whose name matches a glob pattern.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: Pattern,
}

impl GlobFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
        })
    }
}

impl ResourceFilter for GlobFilter {
    fn is_pass(&self, resource: &Resource) -> bool {
        resource
            .name()
            .is_some_and(|name| self.pattern.matches(&name))
    }
}

/// Passes only collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionFilter;

impl ResourceFilter for CollectionFilter {
    fn is_pass(&self, resource: &Resource) -> bool {
        resource.is_collection()
    }
}
