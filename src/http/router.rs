//! The route table shared between the dispatcher and the file watcher.
//!
//! Readers take a snapshot (`Arc<RoutesData>`) under a short read lock and
//! match against it without holding any lock. Writers build a [`Route`]
//! completely before taking the write lock, then publish it copy-on-write,
//! so a reader never observes a route whose url key and handler were not
//! published together.
//!
//! Matching order is registration order: the first registered route whose
//! method and pattern match answers the request.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use regex::Regex;
use tracing::{error, info, warn};

use crate::http::method::HttpMethod;
use crate::mock::{
    definition::MockDefinition,
    url::{compose_prefixed_url, normalize},
    variant::Mock,
};

#[derive(Debug)]
pub struct Route {
    pub id: u64,
    pub file_name: String,
    /// `prefix + url`, the key under which the route is indexed.
    pub pattern: String,
    matcher: Regex,
    pub mock: Mock,
}

impl Route {
    fn compile(id: u64, file_name: &str, prefix: &str, mock: Mock) -> Result<Self, regex::Error> {
        let pattern = compose_prefixed_url(prefix, &mock.url);
        let matcher = Regex::new(&format!("^(?:{}.*)$", pattern))?;
        Ok(Route {
            id,
            file_name: file_name.to_string(),
            pattern,
            matcher,
            mock,
        })
    }

    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        self.mock.method == method && self.matcher.is_match(path)
    }
}

/// An immutable view of the registered routes.
#[derive(Debug, Default, Clone)]
pub struct RoutesData {
    order: Vec<Arc<Route>>,
    by_url: HashMap<String, Vec<Arc<Route>>>,
    by_file: HashMap<String, Arc<Route>>,
}

impl RoutesData {
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<Arc<Route>> {
        self.order.iter().find(|route| route.matches(method, path)).cloned()
    }

    pub fn by_file(&self, file_name: &str) -> Option<&Arc<Route>> {
        self.by_file.get(file_name)
    }

    pub fn by_url(&self, pattern: &str) -> &[Arc<Route>] {
        self.by_url.get(pattern).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert(&mut self, route: Arc<Route>) {
        if let Some(earlier) = self
            .by_url(&route.pattern)
            .iter()
            .find(|existing| existing.mock.method == route.mock.method)
        {
            warn!(
                file = %route.file_name,
                shadowed_by = %earlier.file_name,
                url = %route.pattern,
                method = %route.mock.method,
                "Mock duplicates an earlier route, the earlier one answers first"
            );
        }
        self.by_url
            .entry(route.pattern.clone())
            .or_default()
            .push(Arc::clone(&route));
        self.by_file.insert(route.file_name.clone(), Arc::clone(&route));
        self.order.push(route);
    }

    fn remove(&mut self, file_name: &str) -> Option<Arc<Route>> {
        let route = self.by_file.remove(file_name)?;
        if let Some(routes) = self.by_url.get_mut(&route.pattern) {
            routes.retain(|r| r.id != route.id);
            if routes.is_empty() {
                self.by_url.remove(&route.pattern);
            }
        }
        self.order.retain(|r| r.id != route.id);
        Some(route)
    }
}

/// Route table for one watched directory and one url prefix.
pub struct RouteTable {
    root: PathBuf,
    prefix: String,
    routes: RwLock<Arc<RoutesData>>,
    next_id: AtomicU64,
}

impl RouteTable {
    pub fn new(root: impl Into<PathBuf>, prefix: &str) -> Self {
        RouteTable {
            root: root.into(),
            prefix: normalize(prefix),
            routes: RwLock::new(Arc::new(RoutesData::default())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Directory that definition files and file-backed responses live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current routes. The snapshot stays valid while the table changes.
    pub fn snapshot(&self) -> Arc<RoutesData> {
        let guard = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Registers the mock described by `definition`, replacing any route the
    /// same file registered before. Returns whether a route is now live.
    pub fn add(&self, definition: MockDefinition) -> bool {
        let file_name = definition.file_name();
        let Some(route) = self.build_route(&file_name, definition) else {
            return false;
        };
        info!(file = %file_name, url = %route.pattern, method = %route.mock.method, "Loading mock from file");
        self.publish(&file_name, Some(route));
        true
    }

    /// Removes the route registered by `file_name`. Unknown names are a no-op.
    pub fn remove(&self, file_name: &str) -> bool {
        match self.publish(file_name, None) {
            Some(route) => {
                info!(file = %file_name, url = %route.pattern, "Removing deleted mock from file");
                true
            }
            None => false,
        }
    }

    /// Tears down the route of `file_name` and registers `definition` in its
    /// place in one step. With no usable definition the file ends up unregistered.
    pub fn reload(&self, file_name: &str, definition: Option<MockDefinition>) -> bool {
        let route = definition.and_then(|definition| self.build_route(file_name, definition));
        let registered = route.is_some();
        self.publish(file_name, route);
        registered
    }

    fn build_route(&self, file_name: &str, definition: MockDefinition) -> Option<Arc<Route>> {
        let method = match definition.http_method.parse::<HttpMethod>() {
            Ok(method) => method,
            Err(err) => {
                error!(file = %file_name, url = %definition.url, error = %err, "Mock contains illegal http_method");
                return None;
            }
        };
        let mock = Mock::new(definition, method);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match Route::compile(id, file_name, &self.prefix, mock) {
            Ok(route) => Some(Arc::new(route)),
            Err(err) => {
                error!(file = %file_name, error = %err, "Mock url is not a valid regular expression");
                None
            }
        }
    }

    /// Replaces whatever `file_name` registered with `route` and returns the old route.
    fn publish(&self, file_name: &str, route: Option<Arc<Route>>) -> Option<Arc<Route>> {
        let mut guard = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let data = Arc::make_mut(&mut *guard);
        let previous = data.remove(file_name);
        if let Some(route) = route {
            data.insert(route);
        }
        previous
    }
}
