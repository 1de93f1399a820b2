//! URI routing dengan isolasi error per request.
//!
//! `Router` memetakan URI ke handler. Setiap request dijawab tepat satu
//! kali: 200 dengan hasil handler, 400 kalau argumen tidak cocok, 404 kalau
//! route tidak ada, 500 kalau handler gagal atau panic.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::request::Request;
use super::signature::Signature;
use crate::error::{HandlerError, RouterError};
use crate::network::ConnectionId;
use crate::protocol::{status, Envelope};

pub type HandlerResult = Result<Option<Vec<u8>>, HandlerError>;

/// Raw handler: sees the whole request, returns the reply payload.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &mut Request) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Request) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &mut Request) -> HandlerResult {
        self(request)
    }
}

/// What `register` does with a URI that already has a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Last registration wins.
    #[default]
    Replace,
    /// Registration fails with [`RouterError::DuplicateRoute`].
    Reject,
}

#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Box<dyn Handler>>,
    policy: DuplicatePolicy,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            routes: HashMap::new(),
            policy,
        }
    }

    pub fn register<H: Handler + 'static>(
        &mut self,
        uri: impl Into<String>,
        handler: H,
    ) -> Result<(), RouterError> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(RouterError::EmptyUri);
        }
        if self.policy == DuplicatePolicy::Reject && self.routes.contains_key(&uri) {
            return Err(RouterError::DuplicateRoute(uri));
        }
        info!(%uri, "Registered handler");
        if self.routes.insert(uri.clone(), Box::new(handler)).is_some() {
            warn!(%uri, "Replaced existing handler");
        }
        Ok(())
    }

    /// Register a keyword-style handler.
    ///
    /// The request payload is a JSON object bound against `signature`
    /// before `func` runs; a binding failure is answered with 400. The JSON
    /// value `func` returns becomes the reply payload.
    pub fn register_fn<F>(
        &mut self,
        uri: impl Into<String>,
        signature: Signature,
        func: F,
    ) -> Result<(), RouterError>
    where
        F: Fn(&Request, Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register(uri, move |request: &mut Request| -> HandlerResult {
            let args = match signature.bind_payload(request.payload()) {
                Ok(args) => args,
                Err(e) => {
                    warn!(uri = request.uri(), error = %e, "Rejected call arguments");
                    request.reply(status::BAD_REQUEST, Some(e.to_string().into_bytes()));
                    return Ok(None);
                }
            };
            debug!(uri = request.uri(), ?args, "Calling handler");
            let result = func(request, args)?;
            Ok(Some(serde_json::to_vec(&result)?))
        })
    }

    pub fn can_handle(&self, uri: &str) -> bool {
        self.routes.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Route one inbound envelope and build its reply.
    ///
    /// Failures stay inside this call. Replies (`reply_to` set) are terminal
    /// and are not routed; fire-and-forget messages run but get no reply.
    pub fn dispatch(&self, connection_id: ConnectionId, envelope: Envelope) -> Option<Envelope> {
        if envelope.is_reply() {
            debug!(connection_id, reply_to = ?envelope.reply_to, "Ignoring reply envelope");
            return None;
        }

        let mut request = Request::new(connection_id, envelope);
        let handler = match self.routes.get(request.uri()) {
            Some(handler) => handler,
            None => {
                warn!(connection_id, uri = request.uri(), "No route");
                request.reply(status::NOT_FOUND, None);
                return request.into_reply();
            }
        };

        debug!(connection_id, uri = request.uri(), "Handling request");
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&mut request)));
        match outcome {
            Ok(Ok(payload)) => {
                if !request.has_replied() {
                    request.reply(status::OK, payload);
                }
            }
            Ok(Err(e)) => {
                error!(connection_id, uri = request.uri(), error = %e, "Handler failed");
                if !request.has_replied() {
                    request.reply(status::HANDLER_FAILED, Some(e.to_string().into_bytes()));
                }
            }
            Err(_) => {
                error!(connection_id, uri = request.uri(), "Handler panicked");
                if !request.has_replied() {
                    request.reply(status::HANDLER_FAILED, None);
                }
            }
        }
        request.into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn echo_router() -> Router {
        let mut router = Router::new();
        router
            .register_fn(
                "svc/echo",
                Signature::new().required("text"),
                |_, args| Ok(json!({ "text": args["text"] })),
            )
            .unwrap();
        router
    }

    fn call(id: u32, uri: &str, args: Value) -> Envelope {
        Envelope::request(id, uri, args.to_string().into_bytes())
    }

    fn payload_json(reply: &Envelope) -> Value {
        serde_json::from_slice(reply.payload.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_echo_reply() {
        let router = echo_router();
        let reply = router
            .dispatch(1, call(17, "svc/echo", json!({"text": "hi"})))
            .unwrap();
        assert_eq!(reply.reply_to, Some(17));
        assert_eq!(reply.status_code, Some(200));
        assert_eq!(payload_json(&reply), json!({"text": "hi"}));
        assert_eq!(reply.uri, None);
    }

    #[test]
    fn test_missing_route_is_404() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut router = Router::new();
        let counter = Arc::clone(&hits);
        router
            .register("svc/present", move |_: &mut Request| -> HandlerResult {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .unwrap();

        let reply = router
            .dispatch(1, call(5, "svc/missing", json!({})))
            .unwrap();
        assert_eq!(reply.status_code, Some(404));
        assert_eq!(reply.reply_to, Some(5));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_is_isolated_per_request() {
        let mut router = echo_router();
        router
            .register("svc/broken", |_: &mut Request| -> HandlerResult {
                Err(HandlerError::new("tile store unavailable"))
            })
            .unwrap();
        router
            .register("svc/panics", |_: &mut Request| -> HandlerResult {
                panic!("boom")
            })
            .unwrap();

        let failed = router.dispatch(1, call(1, "svc/broken", json!({}))).unwrap();
        assert_eq!(failed.status_code, Some(500));
        assert_eq!(failed.payload.as_deref(), Some(&b"tile store unavailable"[..]));

        let panicked = router.dispatch(1, call(2, "svc/panics", json!({}))).unwrap();
        assert_eq!(panicked.status_code, Some(500));

        for connection_id in [1, 2] {
            let ok = router
                .dispatch(connection_id, call(3, "svc/echo", json!({"text": "still up"})))
                .unwrap();
            assert_eq!(ok.status_code, Some(200));
        }
    }

    #[test]
    fn test_explicit_reply_is_not_duplicated() {
        let mut router = Router::new();
        router
            .register("svc/early", |request: &mut Request| -> HandlerResult {
                assert!(request.reply(202, Some(b"accepted".to_vec())));
                assert!(!request.reply(200, None));
                Ok(Some(b"ignored".to_vec()))
            })
            .unwrap();

        let reply = router.dispatch(1, call(9, "svc/early", json!({}))).unwrap();
        assert_eq!(reply.status_code, Some(202));
        assert_eq!(reply.payload.as_deref(), Some(&b"accepted"[..]));
    }

    #[test]
    fn test_bad_arguments_are_400_before_handler_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut router = Router::new();
        router
            .register_fn(
                "svc/move",
                Signature::new().required("unit"),
                move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                },
            )
            .unwrap();

        let missing = router.dispatch(1, call(1, "svc/move", json!({}))).unwrap();
        assert_eq!(missing.status_code, Some(400));
        let unknown = router
            .dispatch(1, call(2, "svc/move", json!({"unit": 1, "fly": true})))
            .unwrap();
        assert_eq!(unknown.status_code, Some(400));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let ok = router
            .dispatch(1, call(3, "svc/move", json!({"unit": 1})))
            .unwrap();
        assert_eq!(ok.status_code, Some(200));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replies_and_notifications() {
        let router = echo_router();
        assert!(router
            .dispatch(1, Envelope::reply(4, 200, None))
            .is_none());

        let notification = Envelope::message("svc/echo", br#"{"text":"x"}"#.to_vec());
        assert!(router.dispatch(1, notification).is_none());
    }

    #[test]
    fn test_registration_policies() {
        let mut router = Router::new();
        assert_eq!(
            router.register("", |_: &mut Request| -> HandlerResult { Ok(None) }),
            Err(RouterError::EmptyUri)
        );

        router
            .register("svc/v", |_: &mut Request| -> HandlerResult { Ok(Some(b"1".to_vec())) })
            .unwrap();
        router
            .register("svc/v", |_: &mut Request| -> HandlerResult { Ok(Some(b"2".to_vec())) })
            .unwrap();
        assert_eq!(router.len(), 1);
        let reply = router.dispatch(1, call(1, "svc/v", json!({}))).unwrap();
        assert_eq!(reply.payload.as_deref(), Some(&b"2"[..]));

        let mut strict = Router::with_policy(DuplicatePolicy::Reject);
        strict
            .register("svc/v", |_: &mut Request| -> HandlerResult { Ok(None) })
            .unwrap();
        assert_eq!(
            strict.register("svc/v", |_: &mut Request| -> HandlerResult { Ok(None) }),
            Err(RouterError::DuplicateRoute("svc/v".into()))
        );
    }
}
