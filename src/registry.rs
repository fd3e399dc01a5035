//! Static routes from configuration.
//!
//! # Responsibilities
//! - Register each configured route with its sink
//! - Reconcile the live router when the configuration changes
//! - Preview which routes a topic reaches without delivering it (`dry_run`)
//!
//! # Design Decisions
//! - A route is identified by name; a changed pattern or sink is a replace
//! - Removal goes through the router's reverse cache, so the registry does
//!   not need to remember normalized patterns

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::{RouteConfig, RouterConfig};
use crate::observability::{MemoryTracer, Tracer};
use crate::routing::{
    BoxError, Context, Message, RouterResult, Subscription, SubscriberHandle,
};
use crate::sinks::build_sink;

/// What a reconcile pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Routes registered from configuration, keyed by route name.
#[derive(Debug, Default)]
pub struct StaticRoutes {
    active: HashMap<String, (RouteConfig, SubscriberHandle)>,
}

impl StaticRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `router` reflect `routes`.
    pub fn reconcile(&mut self, router: &Subscription, routes: &[RouteConfig]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let wanted: HashMap<&str, &RouteConfig> =
            routes.iter().map(|r| (r.name.as_str(), r)).collect();

        let stale: Vec<String> = self
            .active
            .iter()
            .filter(|(name, (config, _))| wanted.get(name.as_str()) != Some(&config))
            .map(|(name, _)| name.clone())
            .collect();

        for name in stale {
            if let Some((_, handle)) = self.active.remove(&name) {
                match router.unregister_all(&handle) {
                    Ok(_) => summary.removed.push(name),
                    Err(e) => {
                        tracing::warn!(route = %name, error = %e, "Failed to remove route");
                        summary.failed.push(name);
                    }
                }
            }
        }

        for route in routes {
            if self.active.contains_key(&route.name) {
                continue;
            }
            match register(router, route) {
                Ok(handle) => {
                    tracing::info!(route = %route.name, pattern = %route.pattern, "Route registered");
                    self.active.insert(route.name.clone(), (route.clone(), handle));
                    summary.added.push(route.name.clone());
                }
                Err(e) => {
                    tracing::warn!(route = %route.name, error = %e, "Failed to register route");
                    summary.failed.push(route.name.clone());
                }
            }
        }

        summary
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// A static route that a topic reaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub route: String,
    /// Raw segments the topic matched, joined with the separator.
    pub pattern: String,
    pub params: BTreeMap<String, String>,
}

/// Outcome of routing a topic against static routes without any sink.
#[derive(Debug, Default)]
pub struct DryRun {
    /// One entry per delivery that would happen, in dispatch order.
    pub matches: Vec<RouteMatch>,
    /// Diagnostics the dispatch produced (e.g. `invalid_topic`).
    pub diagnostics: Vec<serde_json::Value>,
    /// Routes whose pattern could not be registered.
    pub failed: Vec<String>,
}

/// Route `topic` through a scratch router holding `routes`, recording
/// matches instead of firing sinks.
pub fn dry_run(
    config: &RouterConfig,
    routes: &[RouteConfig],
    topic: &str,
    source: &str,
) -> RouterResult<DryRun> {
    let tracer = Arc::new(MemoryTracer::new());
    let dyn_tracer: Arc<dyn Tracer> = tracer.clone();
    let router = Subscription::with_config(config.clone(), Some(dyn_tracer))?;

    let matches = Arc::new(Mutex::new(Vec::new()));
    let mut failed = Vec::new();
    for route in routes {
        let name = route.name.clone();
        let separator = config.separator;
        let seen = matches.clone();
        let recorder = SubscriberHandle::new(
            move |_: &Context, message: &Message| -> Result<(), BoxError> {
                seen.lock().push(RouteMatch {
                    route: name.clone(),
                    pattern: message.matched_path(separator),
                    params: message.params.clone().into_iter().collect(),
                });
                Ok(())
            },
        );
        if let Err(e) = router.register(&route.pattern, &recorder) {
            tracing::warn!(route = %route.name, error = %e, "Skipping route in dry run");
            failed.push(route.name.clone());
        }
    }

    router.dispatch(&Context::new(), topic, Vec::<u8>::new(), source);

    let matches = std::mem::take(&mut *matches.lock());
    Ok(DryRun {
        matches,
        diagnostics: tracer.events(),
        failed,
    })
}

fn register(router: &Subscription, route: &RouteConfig) -> RouterResult<SubscriberHandle> {
    let handle = build_sink(&route.name, route.sink);
    router.register(&route.pattern, &handle)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkKind;

    fn route(name: &str, pattern: &str) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            pattern: pattern.to_string(),
            sink: SinkKind::Log,
        }
    }

    #[test]
    fn test_initial_registration() {
        let router = Subscription::default();
        let mut routes = StaticRoutes::new();

        let summary = routes.reconcile(&router, &[route("a", "a.b"), route("b", "c.:id")]);
        assert_eq!(summary.added.len(), 2);
        assert!(summary.removed.is_empty());
        assert_eq!(router.routes(), vec!["a.b", "c.:id"]);
    }

    #[test]
    fn test_reconcile_changes() {
        let router = Subscription::default();
        let mut routes = StaticRoutes::new();
        routes.reconcile(&router, &[route("keep", "k"), route("drop", "d"), route("move", "m1")]);

        let summary = routes.reconcile(&router, &[route("keep", "k"), route("move", "m2"), route("new", "n")]);

        let mut removed = summary.removed.clone();
        removed.sort();
        assert_eq!(removed, vec!["drop", "move"]);
        let mut added = summary.added.clone();
        added.sort();
        assert_eq!(added, vec!["move", "new"]);
        assert_eq!(router.routes(), vec!["k", "m2", "n"]);
        assert_eq!(routes.len(), 3);
    }

    #[test]
    fn test_dry_run_reports_matches() {
        let routes = [
            route("users", "user.:id"),
            route("audit", "*"),
            route("orders", "order.:id"),
            route("broken", "a.{:x}"),
        ];

        let outcome = dry_run(&RouterConfig::default(), &routes, "user.42", "cli").unwrap();

        assert_eq!(outcome.failed, vec!["broken"]);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].route, "audit");
        assert!(outcome.matches[0].params.is_empty());
        assert_eq!(outcome.matches[1].route, "users");
        assert_eq!(outcome.matches[1].pattern, "user.:id");
        assert_eq!(outcome.matches[1].params["id"], "42");
    }

    #[test]
    fn test_dry_run_invalid_topic() {
        let outcome =
            dry_run(&RouterConfig::default(), &[route("all", "*")], "user.:id", "cli").unwrap();

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0]["event"], "invalid_topic");
    }

    #[test]
    fn test_failed_registration_reported() {
        let router = Subscription::default();
        let mut routes = StaticRoutes::new();
        let summary = routes.reconcile(&router, &[route("bad", "a.{:x}")]);
        assert_eq!(summary.failed, vec!["bad"]);
        assert!(routes.is_empty());
    }
}
