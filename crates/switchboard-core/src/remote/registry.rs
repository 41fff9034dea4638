//! Agent name to endpoint URL lookup

use std::collections::BTreeMap;

use crate::config::AgentsConfig;
use crate::error::{Error, Result};
use crate::intent::Category;

/// Endpoints of the remote agents, fixed at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<Category, String>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One endpoint per category, derived from the agents configuration
    pub fn from_config(config: &AgentsConfig) -> Self {
        Category::ALL
            .into_iter()
            .fold(Self::new(), |registry, category| {
                registry.with_endpoint(category, config.endpoint_for(category))
            })
    }

    pub fn with_endpoint(mut self, category: Category, url: impl Into<String>) -> Self {
        self.endpoints.insert(category, url.into());
        self
    }

    pub fn get(&self, category: Category) -> Option<&str> {
        self.endpoints.get(&category).map(String::as_str)
    }

    /// Resolve a service name as written by the model
    pub fn resolve(&self, service: &str) -> Result<(Category, &str)> {
        let category: Category = service
            .parse()
            .map_err(|_| Error::UnknownService(service.to_string()))?;
        let url = self
            .get(category)
            .ok_or_else(|| Error::UnknownService(service.to_string()))?;
        Ok((category, url))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.endpoints.iter().map(|(c, u)| (*c, u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
