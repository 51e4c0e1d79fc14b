use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use busy_probe::LoadMonitor;
use http::Request;
use http::Response;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::Service;

use crate::config::TooBusyConfig;
use crate::handler::OverloadHandler;
use crate::reply::Reply;

#[derive(Clone, Debug)]
struct TooBusyServiceMetrics {
    admitted: Counter<u64>,
    shed: Counter<u64>,
}

#[derive(Clone)]
pub struct TooBusyService<S> {
    inner: S,
    monitor: Arc<dyn LoadMonitor>,
    handler: Option<Arc<dyn OverloadHandler>>,
    config: Arc<TooBusyConfig>,
    degraded: bool,
    instruments: TooBusyServiceMetrics,
}

impl<S: fmt::Debug> fmt::Debug for TooBusyService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooBusyService")
            .field("inner", &self.inner)
            .field("monitor", &self.monitor)
            .field("handler", &self.handler.is_some())
            .field("config", &self.config)
            .field("degraded", &self.degraded)
            .finish()
    }
}

pin_project! {
    #[project = ResponseFutureProj]
    /// Either the inner service's future, or the reply to a shed request.
    pub enum ResponseFuture<F, B> {
        Inner {
            #[pin]
            future: F,
        },
        Shed {
            response: Option<Response<B>>,
        },
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Inner { future } => future.poll(cx),
            ResponseFutureProj::Shed { response } => Poll::Ready(Ok(response
                .take()
                .expect("ResponseFuture polled after completion"))),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TooBusyService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: From<String>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Degraded gates never consult the monitor
        if self.degraded || !self.monitor.is_overloaded() {
            self.instruments.admitted.add(1, &[]);
            return ResponseFuture::Inner {
                future: self.inner.call(req),
            };
        }

        let (head, _body) = req.into_parts();
        let mut reply = Reply::new();

        if let Some(handler) = &self.handler {
            handler.on_overload(&head, &mut reply);
        }

        let responder = if reply.is_sent() {
            "handler"
        } else {
            reply
                .status(self.config.status())
                .write(self.config.message());
            "gate"
        };

        tracing::debug!(
            method = %head.method,
            uri = %head.uri,
            responder,
            "process too busy, request shed"
        );
        self.instruments
            .shed
            .add(1, &[KeyValue::new("responder", responder)]);

        ResponseFuture::Shed {
            response: Some(reply.into_http_response()),
        }
    }
}

impl<S> TooBusyService<S> {
    pub(crate) fn new(
        inner: S,
        monitor: Arc<dyn LoadMonitor>,
        handler: Option<Arc<dyn OverloadHandler>>,
        config: Arc<TooBusyConfig>,
        degraded: bool,
    ) -> Self {
        let meter = global::meter("too_busy_service");
        let instruments = TooBusyServiceMetrics {
            admitted: meter.u64_counter("requests_admitted").build(),
            shed: meter.u64_counter("requests_shed").build(),
        };

        Self {
            inner,
            monitor,
            handler,
            config,
            degraded,
            instruments,
        }
    }

    /// Get a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consume `self`, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}
