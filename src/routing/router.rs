//! Subscription registry and dispatch entry point.
//!
//! # Responsibilities
//! - Own the root level and the reverse route cache
//! - Register and unregister subscribers under patterns
//! - Dispatch concrete topics to every matching subscriber
//! - Answer which patterns are registered (overall and per subscriber)
//!
//! # Design Decisions
//! - Caller-owned instance, shared via `Arc`; no global registry
//! - Registration errors are returned, dispatch errors only traced
//! - Patterns are stored in their normalized form (separator-trimmed)

use std::sync::Arc;

use serde_json::json;

use crate::config::RouterConfig;
use crate::observability::{metrics, Tracer};
use crate::routing::cache::RouteCache;
use crate::routing::dispatch::Dispatch;
use crate::routing::level::Level;
use crate::routing::message::{Context, Message};
use crate::routing::path::{path_to_tokens, tokens_to_path, topic_to_tokens};
use crate::routing::subscriber::SubscriberHandle;
use crate::routing::types::{RouterError, RouterResult};

/// Summary of one `handle` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscriber calls that returned `Ok`.
    pub delivered: usize,
    /// Subscriber calls that panicked or returned `Err`.
    pub failed: usize,
}

/// The topic router.
pub struct Subscription {
    root: Level,
    cache: RouteCache,
    tracer: Option<Arc<dyn Tracer>>,
    config: RouterConfig,
}

impl Subscription {
    /// Create a router with the default `.` separator.
    pub fn new(tracer: Option<Arc<dyn Tracer>>) -> Self {
        Self::build(RouterConfig::default(), tracer)
    }

    /// Create a router with custom settings.
    ///
    /// Fails with [`RouterError::InvalidSeparator`] when the separator is
    /// alphanumeric, whitespace, `_` or pattern syntax, since every topic
    /// would then be rejected or split inside its segments.
    pub fn with_config(
        config: RouterConfig,
        tracer: Option<Arc<dyn Tracer>>,
    ) -> RouterResult<Self> {
        config.validate()?;
        Ok(Self::build(config, tracer))
    }

    fn build(config: RouterConfig, tracer: Option<Arc<dyn Tracer>>) -> Self {
        Self {
            root: Level::new(),
            cache: RouteCache::new(),
            tracer,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register `subscriber` under the pattern `path`.
    pub fn register(&self, path: &str, subscriber: &SubscriberHandle) -> RouterResult<()> {
        let tokens = path_to_tokens(path, self.config.separator)?;
        self.root.add(&tokens, subscriber.clone())?;

        let normalized = tokens_to_path(&tokens, self.config.separator);
        self.cache.add(subscriber, &normalized);

        metrics::record_registration("register");
        metrics::record_route_count(self.cache.path_count());
        tracing::debug!(path = %normalized, subscriber = subscriber.name(), "Subscriber registered");
        Ok(())
    }

    /// Remove `subscriber` from the pattern `path`.
    pub fn unregister(&self, path: &str, subscriber: &SubscriberHandle) -> RouterResult<()> {
        let tokens = path_to_tokens(path, self.config.separator)?;
        self.root.remove(&tokens, subscriber)?;

        let normalized = tokens_to_path(&tokens, self.config.separator);
        self.cache.remove(subscriber, &normalized);

        metrics::record_registration("unregister");
        metrics::record_route_count(self.cache.path_count());
        tracing::debug!(path = %normalized, subscriber = subscriber.name(), "Subscriber unregistered");
        Ok(())
    }

    /// Dispatch `topic` to every matching subscriber.
    ///
    /// Never fails: invalid topics and subscriber failures are reported to
    /// the tracer only.
    pub fn handle(&self, ctx: &Context, topic: &str, payload: impl Into<Arc<[u8]>>, source: &str) {
        self.dispatch(ctx, topic, payload, source);
    }

    /// Like [`Subscription::handle`], returning delivery counts.
    pub fn dispatch(
        &self,
        ctx: &Context,
        topic: &str,
        payload: impl Into<Arc<[u8]>>,
        source: &str,
    ) -> DispatchReport {
        metrics::record_dispatch();
        let dispatch = Dispatch::new(ctx, self.tracer.as_deref(), &self.config);

        let tokens = match topic_to_tokens(topic, self.config.separator) {
            Ok(tokens) => tokens,
            Err(e) => {
                metrics::record_invalid_topic();
                tracing::debug!(topic = %topic, error = %e, "Rejected topic");
                dispatch.trace(json!({
                    "event": "invalid_topic",
                    "dispatch_id": ctx.id,
                    "topic": topic,
                    "source": source,
                    "error": e.to_string(),
                }));
                return DispatchReport::default();
            }
        };

        let message = Message::new(topic, payload, source);
        self.root.resolve(&dispatch, &tokens, &message);

        let report = DispatchReport {
            delivered: dispatch.delivered(),
            failed: dispatch.failed(),
        };
        tracing::trace!(
            topic = %topic,
            dispatch_id = %ctx.id,
            delivered = report.delivered,
            failed = report.failed,
            "Topic dispatched"
        );
        report
    }

    /// Every registered pattern.
    pub fn routes(&self) -> Vec<String> {
        self.cache.all_paths()
    }

    /// Patterns `subscriber` is currently registered under.
    pub fn routes_for(&self, subscriber: &SubscriberHandle) -> RouterResult<Vec<String>> {
        self.cache.find(subscriber).ok_or(RouterError::SubscriberNotFound)
    }

    /// Remove `subscriber` from every pattern it is registered under.
    pub fn unregister_all(&self, subscriber: &SubscriberHandle) -> RouterResult<usize> {
        let paths = self.routes_for(subscriber)?;
        for path in &paths {
            self.unregister(path, subscriber)?;
        }
        Ok(paths.len())
    }

    /// Number of distinct subscribers with at least one registration.
    pub fn subscriber_count(&self) -> usize {
        self.cache.count()
    }

    /// The root level, for inspection.
    pub fn root(&self) -> &Level {
        &self.root
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("config", &self.config)
            .field("subscribers", &self.cache.count())
            .field("traced", &self.tracer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryTracer;
    use crate::routing::subscriber::BoxError;
    use ::metrics as metrics_facade;
    use ::metrics::{KeyName, SharedString, Unit};
    use std::sync::Mutex;

    fn recorder() -> (SubscriberHandle, Arc<Mutex<Vec<Message>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = SubscriberHandle::new(move |_: &Context, msg: &Message| -> Result<(), BoxError> {
            sink.lock().unwrap().push(msg.clone());
            Ok(())
        });
        (handle, seen)
    }

    fn publish(router: &Subscription, topic: &str) -> DispatchReport {
        router.dispatch(&Context::new(), topic, b"payload".to_vec(), "test")
    }

    #[test]
    fn test_literal_round_trip() {
        let router = Subscription::default();
        let (sub, seen) = recorder();
        let (other, other_seen) = recorder();
        router.register("a.b.c", &sub).unwrap();
        router.register("a.b.d", &other).unwrap();

        let report = publish(&router, "a.b.c");
        assert_eq!(report.delivered, 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].params.is_empty());
        assert_eq!(&*seen[0].payload, b"payload");
        assert_eq!(seen[0].source, "test");
        assert!(other_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_positional_capture() {
        let router = Subscription::default();
        let (sub, seen) = recorder();
        router.register("user.:id", &sub).unwrap();

        publish(&router, "user.42");
        assert_eq!(seen.lock().unwrap()[0].param("id"), Some("42"));
    }

    #[test]
    fn test_regex_capture() {
        let router = Subscription::default();
        let (sub, seen) = recorder();
        router.register("log.{level:[A-Z]+}", &sub).unwrap();

        publish(&router, "log.ERROR");
        publish(&router, "log.error");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].param("level"), Some("ERROR"));
        assert_eq!(seen[0].matched_path('.'), "log.{level:[A-Z]+}");
    }

    #[test]
    fn test_root_catch_all() {
        let router = Subscription::default();
        let (sub, seen) = recorder();
        router.register("*", &sub).unwrap();

        for topic in ["a", "a.b", "x.y.z.w", "ERROR.42"] {
            publish(&router, topic);
        }
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_unregister() {
        let router = Subscription::default();
        let (sub, seen) = recorder();
        router.register("a.b", &sub).unwrap();
        router.unregister("a.b", &sub).unwrap();

        publish(&router, "a.b");
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(router.unregister("a.b", &sub), Err(RouterError::SubscriberNotFound));
        assert_eq!(
            router.unregister("a.zzz", &sub),
            Err(RouterError::InvalidRoute("zzz".into()))
        );
    }

    #[test]
    fn test_routes_for() {
        let router = Subscription::default();
        let (sub, _) = recorder();
        router.register("a.b", &sub).unwrap();
        router.register(".c.:id.", &sub).unwrap();

        let mut routes = router.routes_for(&sub).unwrap();
        routes.sort();
        assert_eq!(routes, vec!["a.b", "c.:id"]);

        router.unregister("a.b", &sub).unwrap();
        assert_eq!(router.routes_for(&sub).unwrap(), vec!["c.:id"]);

        router.unregister("c.:id", &sub).unwrap();
        assert_eq!(router.routes_for(&sub), Err(RouterError::SubscriberNotFound));
    }

    #[test]
    fn test_routes_and_unregister_all() {
        let router = Subscription::default();
        let (s1, _) = recorder();
        let (s2, _) = recorder();
        router.register("b", &s1).unwrap();
        router.register("a", &s2).unwrap();
        router.register("*", &s2).unwrap();

        assert_eq!(router.routes(), vec!["*", "a", "b"]);
        assert_eq!(router.subscriber_count(), 2);

        assert_eq!(router.unregister_all(&s2).unwrap(), 2);
        assert_eq!(router.routes(), vec!["b"]);
    }

    #[test]
    fn test_malformed_registration() {
        let router = Subscription::default();
        let (sub, _) = recorder();
        assert!(router.register("log.{:[A-Z]+}", &sub).is_err());
        assert!(router.register("a.^", &sub).is_err());
        assert!(router.register("", &sub).is_err());
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_invalid_topic_is_traced() {
        let tracer = Arc::new(MemoryTracer::new());
        let router = Subscription::new(Some(tracer.clone()));
        let (sub, seen) = recorder();
        router.register("*", &sub).unwrap();

        let report = publish(&router, "user.*");
        assert_eq!(report, DispatchReport::default());
        assert!(seen.lock().unwrap().is_empty());

        let events = tracer.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "invalid_topic");
        assert_eq!(events[0]["topic"], "user.*");
    }

    #[test]
    fn test_custom_separator() {
        let config = RouterConfig {
            separator: '/',
            ..RouterConfig::default()
        };
        let router = Subscription::with_config(config, None).unwrap();
        let (sub, seen) = recorder();
        router.register("/devices/:id/temp", &sub).unwrap();

        publish(&router, "devices/7/temp");
        assert_eq!(seen.lock().unwrap()[0].param("id"), Some("7"));
        assert_eq!(router.routes(), vec!["devices/:id/temp"]);
    }

    /// Records every value set on the `topic_router_routes` gauge.
    #[derive(Default)]
    struct RouteGauge(Mutex<Vec<f64>>);

    impl metrics_facade::GaugeFn for RouteGauge {
        fn increment(&self, _: f64) {}
        fn decrement(&self, _: f64) {}
        fn set(&self, value: f64) {
            self.0.lock().unwrap().push(value);
        }
    }

    struct RouteGaugeRecorder(Arc<RouteGauge>);

    impl metrics_facade::Recorder for RouteGaugeRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &metrics_facade::Key, _: &metrics_facade::Metadata<'_>) -> metrics_facade::Counter {
            metrics_facade::Counter::noop()
        }

        fn register_gauge(&self, key: &metrics_facade::Key, _: &metrics_facade::Metadata<'_>) -> metrics_facade::Gauge {
            if key.name() == "topic_router_routes" {
                metrics_facade::Gauge::from_arc(self.0.clone())
            } else {
                metrics_facade::Gauge::noop()
            }
        }

        fn register_histogram(&self, _: &metrics_facade::Key, _: &metrics_facade::Metadata<'_>) -> metrics_facade::Histogram {
            metrics_facade::Histogram::noop()
        }
    }

    #[test]
    fn test_route_gauge_follows_registrations() {
        let gauge = Arc::new(RouteGauge::default());
        let gauge_recorder = RouteGaugeRecorder(gauge.clone());

        metrics_facade::with_local_recorder(&gauge_recorder, || {
            let router = Subscription::default();
            let (s1, _) = recorder();
            let (s2, _) = recorder();
            router.register("a.b", &s1).unwrap();
            router.register("a.b", &s2).unwrap();
            router.register("c", &s1).unwrap();

            assert_eq!(router.routes(), vec!["a.b", "c"]);
            router.routes_for(&s1).unwrap();

            router.unregister("c", &s1).unwrap();
        });

        assert_eq!(*gauge.0.lock().unwrap(), vec![1.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_rejects_colliding_separator() {
        for separator in [':', '*', 'x', ' '] {
            let config = RouterConfig {
                separator,
                ..RouterConfig::default()
            };
            assert_eq!(
                Subscription::with_config(config, None).unwrap_err(),
                RouterError::InvalidSeparator(separator)
            );
        }
    }

    #[test]
    fn test_reentrant_registration() {
        let router = Arc::new(Subscription::default());
        let (late, late_seen) = recorder();

        let r = router.clone();
        let l = late.clone();
        let registrar = SubscriberHandle::new(move |_: &Context, _: &Message| -> Result<(), BoxError> {
            r.register("late", &l)?;
            Ok(())
        });
        router.register("trigger", &registrar).unwrap();

        publish(&router, "trigger");
        publish(&router, "late");
        assert_eq!(late_seen.lock().unwrap().len(), 1);
    }
}
