use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use relay::{
    BoxFuture, Context, Dispatcher, Error, Handler, MAX_CHAIN_LEN, Method, Registry, Request,
    Response, StatusCode,
};

fn get(target: &str) -> Request {
    Request::new(Method::GET, target)
}

/// Core handler echoing the matched group and the `user` value.
fn echo(cx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let group = cx.matched_prefix().unwrap_or("none").to_owned();
        let user = cx.get::<String>("user").cloned().unwrap_or_default();
        cx.respond(format!("{group}:{user}"));
    })
}

/// Counts how often it runs.
struct Count(Arc<AtomicUsize>);

impl Handler for Count {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        Box::pin(async move {
            self.0.fetch_add(1, Ordering::SeqCst);
            cx.next().await;
        })
    }
}

#[tokio::test]
async fn routes_by_longest_prefix() {
    let mut registry = Registry::new();
    registry.group("/api").with(|cx: &mut Context| Box::pin(async move {
        cx.set("user", "v1".to_owned());
        cx.next().await;
    }));
    registry.group("/api/v2").with(|cx: &mut Context| Box::pin(async move {
        cx.set("user", "v2".to_owned());
        cx.next().await;
    }));
    let dispatcher = Dispatcher::builder(registry).core(echo).build().unwrap();

    let res = dispatcher.dispatch(get("/api/v2/users")).await;
    assert_eq!(res.body(), b"/api/v2:v2");

    let res = dispatcher.dispatch(get("/api/v1/users")).await;
    assert_eq!(res.body(), b"/api:v1");

    let res = dispatcher.dispatch(get("/other")).await;
    assert_eq!(res.body(), b"none:");
}

#[tokio::test]
async fn unmatched_request_without_core_runs_nothing() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.group("/api").with_handler(Count(Arc::clone(&hits)));
    let dispatcher = Dispatcher::new(registry).unwrap();

    let res = dispatcher.dispatch(get("/elsewhere")).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn abort_skips_later_handlers_and_core() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry
        .group("/")
        .with_handler(Count(Arc::clone(&hits)))
        .with(|cx: &mut Context| Box::pin(async move {
            cx.respond(StatusCode::FORBIDDEN);
            cx.abort();
        }))
        .with_handler(Count(Arc::clone(&hits)));
    let dispatcher = Dispatcher::builder(registry).core(echo).build().unwrap();

    let res = dispatcher.dispatch(get("/secret")).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn outer_handler_sees_downstream_result() {
    let seen = Arc::new(Mutex::new(None));
    let status = Arc::clone(&seen);
    let mut registry = Registry::new();
    registry.group("/").with_handler(RecordStatus(status));
    let dispatcher = Dispatcher::builder(registry)
        .core(|cx: &mut Context| Box::pin(async move { cx.respond(StatusCode::CREATED); }))
        .build()
        .unwrap();

    dispatcher.dispatch(get("/")).await;
    assert_eq!(*seen.lock().unwrap(), Some(StatusCode::CREATED));
}

/// Records the status written by the rest of the chain.
struct RecordStatus(Arc<Mutex<Option<StatusCode>>>);

impl Handler for RecordStatus {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        Box::pin(async move {
            cx.next().await;
            *self.0.lock().unwrap() = cx.response_status();
        })
    }
}

#[tokio::test]
async fn panicking_handler_answers_500() {
    let mut registry = Registry::new();
    registry.group("/boom").with(|cx: &mut Context| Box::pin(async move {
        cx.respond("partial");
        panic!("handler exploded");
    }));
    let dispatcher = Dispatcher::builder(registry).core(echo).build().unwrap();

    let res = dispatcher.dispatch(get("/boom")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    // The dispatcher keeps serving afterwards.
    let res = dispatcher.dispatch(get("/fine")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.body(), b"none:");
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let mut registry = Registry::new();
    registry.group("/users/").with(|cx: &mut Context| Box::pin(async move {
        let user = cx.request().target().trim_start_matches("/users/").to_owned();
        cx.set("user", user);
        tokio::task::yield_now().await;
        cx.next().await;
    }));
    let dispatcher = Arc::new(Dispatcher::builder(registry).core(echo).build().unwrap());

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..64 {
        let dispatcher = Arc::clone(&dispatcher);
        tasks.spawn(async move {
            let res = dispatcher.dispatch(get(&format!("/users/{i}"))).await;
            (i, res)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let (i, res) = joined.unwrap();
        assert_eq!(res.body(), format!("/users/:{i}").as_bytes());
    }
}

#[tokio::test]
async fn cancellation_fires_when_request_finishes() {
    let signal = Arc::new(Mutex::new(None));
    let keep = Arc::clone(&signal);
    let mut registry = Registry::new();
    registry.group("/").with_handler(Keep(keep));
    let dispatcher = Dispatcher::new(registry).unwrap();

    dispatcher.dispatch(get("/")).await;
    let signal = signal.lock().unwrap().take().unwrap();
    assert!(signal.is_cancelled());
}

/// Keeps a copy of the request's cancellation signal, checking it is live
/// while the chain runs.
struct Keep(Arc<Mutex<Option<relay::CancelSignal>>>);

impl Handler for Keep {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        Box::pin(async move {
            assert!(!cx.cancellation().is_cancelled());
            *self.0.lock().unwrap() = Some(cx.cancellation().clone());
            cx.next().await;
        })
    }
}

#[tokio::test]
async fn second_response_is_discarded() {
    let mut registry = Registry::new();
    registry.group("/").with(|cx: &mut Context| Box::pin(async move {
        cx.respond(Response::text("first"));
        cx.next().await;
    }));
    let dispatcher = Dispatcher::builder(registry)
        .core(|cx: &mut Context| Box::pin(async move {
            assert!(cx.is_written());
            assert!(!cx.respond("second"));
        }))
        .build()
        .unwrap();

    let res = dispatcher.dispatch(get("/")).await;
    assert_eq!(res.body(), b"first");
}

#[test]
fn empty_prefix_is_a_configuration_error() {
    let mut registry = Registry::new();
    registry.group("").with(echo);
    assert!(matches!(Dispatcher::new(registry), Err(Error::EmptyPrefix)));
}

#[test]
fn core_handler_counts_against_the_cap() {
    let build = |with_core: bool| {
        let mut registry = Registry::new();
        registry.group("/").with_all(std::iter::repeat_n(echo, MAX_CHAIN_LEN));
        let builder = Dispatcher::builder(registry);
        if with_core { builder.core(echo).build() } else { builder.build() }
    };

    assert!(build(false).is_ok());
    assert!(matches!(build(true), Err(Error::ChainTooLong { .. })));
}
