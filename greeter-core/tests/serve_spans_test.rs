use greeter_core::server::{HelloGreeter, ServeOptions, serve};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::{Subscriber, span};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

// Records the name of every span that closes.
#[derive(Clone, Default)]
struct ClosedSpans(Arc<Mutex<Vec<String>>>);

impl ClosedSpans {
    fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl<S> Layer<S> for ClosedSpans
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            self.0.lock().unwrap().push(span.name().to_string());
        }
    }
}

#[tokio::test]
async fn test_setup_phases_are_timed_in_spans() {
    let closed = ClosedSpans::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(closed.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    serve(
        listener,
        HelloGreeter::default(),
        &ServeOptions { reflection: true },
        std::future::ready(()),
    )
    .await
    .unwrap();

    let phases = ["build_reflection", "bind_service", "build_router", "serve"];
    let names: Vec<String> = closed
        .names()
        .into_iter()
        .filter(|name| phases.contains(&name.as_str()))
        .collect();

    assert_eq!(names, phases);
}

#[tokio::test]
async fn test_reflection_span_closes_when_disabled() {
    let closed = ClosedSpans::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(closed.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    serve(
        listener,
        HelloGreeter::default(),
        &ServeOptions::default(),
        std::future::ready(()),
    )
    .await
    .unwrap();

    assert!(closed.names().iter().any(|name| name == "build_reflection"));
}
