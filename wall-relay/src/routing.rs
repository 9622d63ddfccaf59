use crate::config::RouteConfig;
use crate::hashtags::normalize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Where a hashtag sends its posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub tag: String,
    pub display_label: String,
    pub destination: String,
}

/// Result of matching a post's tags against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub tag: Option<String>,
    pub destination: String,
}

impl Classification {
    pub fn is_routed(&self) -> bool {
        self.tag.is_some()
    }
}

/// Immutable hashtag → route mapping, rebuilt at the start of every run.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<String, Route>,
    default_destination: String,
    unclassified_label: String,
}

impl RoutingTable {
    pub fn build(
        routes: &BTreeMap<String, RouteConfig>,
        default_destination: &str,
        unclassified_label: &str,
    ) -> Self {
        let mut table = HashMap::with_capacity(routes.len());

        for (raw_tag, route) in routes {
            let tag = normalize(raw_tag);
            let tag = if tag.starts_with('#') { tag } else { format!("#{}", tag) };
            let display_label = route.label.clone().unwrap_or_else(|| tag.clone());
            let destination = route
                .webhook
                .clone()
                .unwrap_or_else(|| default_destination.to_string());

            if table.contains_key(&tag) {
                warn!(
                    "Route {} collides with another spelling of {}, keeping the first",
                    raw_tag, tag
                );
                continue;
            }
            debug!("Route {} -> {}", tag, display_label);
            table.insert(tag.clone(), Route { tag, display_label, destination });
        }

        Self {
            routes: table,
            default_destination: default_destination.to_string(),
            unclassified_label: unclassified_label.to_string(),
        }
    }

    /// Exact lookup of an already normalized tag.
    pub fn lookup(&self, tag: &str) -> Option<&Route> {
        self.routes.get(tag)
    }

    /// Pick the route of the first tag that has one, in extraction order.
    pub fn classify(&self, tags: &[String]) -> Classification {
        match tags.iter().find_map(|tag| self.lookup(tag)) {
            Some(route) => Classification {
                label: route.display_label.clone(),
                tag: Some(route.tag.clone()),
                destination: route.destination.clone(),
            },
            None => Classification {
                label: self.unclassified_label.clone(),
                tag: None,
                destination: self.default_destination.clone(),
            },
        }
    }

    pub fn default_destination(&self) -> &str {
        &self.default_destination
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
