use http::request::Parts;

use crate::reply::Reply;

/// Custom logic run for every shed request, before the gate responds.
///
/// The handler sees the request head and the pending [`Reply`]. Sending the
/// reply takes over the response; leaving it unsent lets the gate send its
/// configured status and message. The inner service is never called for a
/// shed request, whatever the handler does.
///
/// Handlers run synchronously on the request path and should not block.
pub trait OverloadHandler: Send + Sync + 'static {
    fn on_overload(&self, head: &Parts, reply: &mut Reply);
}

impl<F> OverloadHandler for F
where
    F: Fn(&Parts, &mut Reply) + Send + Sync + 'static,
{
    fn on_overload(&self, head: &Parts, reply: &mut Reply) {
        self(head, reply)
    }
}
