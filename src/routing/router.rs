//! Route lookup for upstream forwarding.

use crate::config::schema::BackendRouteConfig;

/// One compiled forwarding route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub path_prefix: String,
    pub upstream: String,
    pub fallback: bool,
}

/// Immutable route table, ordered once at startup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the configured routes, highest priority first. Ties keep
    /// config order.
    pub fn from_config(configs: &[BackendRouteConfig]) -> Self {
        let mut ordered: Vec<&BackendRouteConfig> = configs.iter().collect();
        ordered.sort_by_key(|route| std::cmp::Reverse(route.priority));

        let routes = ordered
            .into_iter()
            .map(|config| Route {
                name: config.name.clone(),
                path_prefix: config.path_prefix.clone(),
                upstream: config.upstream.clone(),
                fallback: config.fallback,
            })
            .collect();

        Self { routes }
    }

    /// Find the first route whose prefix matches the path. Prefixes match on
    /// segment boundaries; `/` matches everything.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| prefix_matches(&route.path_prefix, path))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}
