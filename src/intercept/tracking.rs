use super::writer::{ResponseWriter, TakenOverConnection, WriterError};
use crate::buffer::EventSender;
use crate::diagnostics::Diagnostics;
use crate::domain::{RequestMeta, VisitEvent};
use crate::filter::FilterEngine;
use http::{HeaderMap, StatusCode};

/// Builds the page-view event for a request that passed the filter.
///
/// Returns `None` when the hostname has no configured site.
pub fn build_event(
    engine: &FilterEngine,
    api_key: &str,
    request: &RequestMeta<'_>,
) -> Option<VisitEvent> {
    let hostname = request.hostname();
    let site_id = engine.sites().resolve(&hostname)?;

    let event = VisitEvent::pageview(api_key, site_id, request.path())
        .with_hostname(hostname.as_str())
        .with_ip_address(request.client_ip_source(&engine.rules().client_ip_header))
        .with_user_agent(request.user_agent())
        .with_language(request.language())
        .with_referrer(request.referrer().map(str::to_string));
    Some(event)
}

/// Response writer wrapper that enqueues the visit once the status is known.
///
/// Only the first final (non-1xx) status is observed; everything else is passed
/// through to the wrapped writer untouched.
pub struct TrackingWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    engine: &'a FilterEngine,
    queue: &'a EventSender,
    diagnostics: &'a Diagnostics,
    pending: Option<VisitEvent>,
}

impl<'a> TrackingWriter<'a> {
    pub fn new(
        inner: &'a mut dyn ResponseWriter,
        engine: &'a FilterEngine,
        queue: &'a EventSender,
        diagnostics: &'a Diagnostics,
        event: VisitEvent,
    ) -> Self {
        Self {
            inner,
            engine,
            queue,
            diagnostics,
            pending: Some(event),
        }
    }

    /// True until the status has been observed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn observe(&mut self, status: StatusCode) {
        let Some(event) = self.pending.take() else {
            return;
        };
        if !self.engine.should_track_status(status) {
            return;
        }
        if let Err(error) = self.queue.try_enqueue(event) {
            self.diagnostics.error(format_args!("failed to submit event: {error}"));
        }
    }
}

impl ResponseWriter for TrackingWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        // 1xx responses precede the final status
        if !status.is_informational() {
            self.observe(status);
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, WriterError> {
        self.observe(StatusCode::OK);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        self.inner.flush()
    }

    fn take_over(&mut self) -> Result<TakenOverConnection, WriterError> {
        self.inner.take_over()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EventQueue, PipelineStats};
    use crate::domain::{RemoteAddr, SiteMap};
    use crate::filter::FilterRules;
    use crate::intercept::ResponseBuffer;
    use http::Request;
    use std::sync::Arc;

    fn engine() -> FilterEngine {
        FilterEngine::new(
            FilterRules::default(),
            Arc::new(SiteMap::new([("example.com", "42")])),
            Diagnostics::new("test", false),
        )
    }

    fn request() -> Request<()> {
        let mut request = Request::builder()
            .uri("/blog?page=2")
            .header("host", "Example.com:8080")
            .header("user-agent", "Mozilla/5.0")
            .header("accept-language", "de-DE,de;q=0.9")
            .header("referer", "https://search.example/")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(RemoteAddr("198.51.100.7:50000".parse().unwrap()));
        request
    }

    #[test]
    fn builds_event_from_request() {
        let engine = engine();
        let request = request();
        let event = build_event(&engine, "key", &RequestMeta::from_request(&request)).unwrap();

        assert_eq!(event.site_id, "42");
        assert_eq!(event.pathname, "/blog");
        assert_eq!(event.hostname, "example.com");
        assert_eq!(event.ip_address.as_deref(), Some("198.51.100.7"));
        assert_eq!(event.user_agent, "Mozilla/5.0");
        assert_eq!(event.language.as_deref(), Some("de-DE"));
        assert_eq!(event.referrer.as_deref(), Some("https://search.example/"));
    }

    #[test]
    fn unknown_site_builds_nothing() {
        let engine = engine();
        let request = Request::builder()
            .uri("/")
            .header("host", "other.org")
            .body(())
            .unwrap();
        assert!(build_event(&engine, "key", &RequestMeta::from_request(&request)).is_none());
    }

    #[tokio::test]
    async fn enqueues_once_on_first_header() {
        let engine = engine();
        let diagnostics = Diagnostics::new("test", false);
        let (sender, mut receiver) =
            EventQueue::bounded(4, Arc::new(PipelineStats::new())).unwrap();
        let event = VisitEvent::pageview("key", "42", "/");

        let mut buffer = ResponseBuffer::new();
        {
            let mut writer = TrackingWriter::new(&mut buffer, &engine, &sender, &diagnostics, event);
            writer.write_header(StatusCode::OK);
            assert!(!writer.is_pending());
            writer.write_header(StatusCode::OK);
            writer.write(b"body").unwrap();
        }

        assert_eq!(receiver.drain().len(), 1);
        assert_eq!(buffer.body(), b"body");
    }

    #[tokio::test]
    async fn error_status_is_not_enqueued() {
        let engine = engine();
        let diagnostics = Diagnostics::new("test", false);
        let (sender, receiver) = EventQueue::bounded(4, Arc::new(PipelineStats::new())).unwrap();

        let mut buffer = ResponseBuffer::new();
        {
            let mut writer = TrackingWriter::new(
                &mut buffer,
                &engine,
                &sender,
                &diagnostics,
                VisitEvent::pageview("key", "42", "/missing"),
            );
            writer.write_header(StatusCode::NOT_FOUND);
        }

        assert!(receiver.is_empty());
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn early_hints_do_not_hide_final_error_status() {
        let engine = engine();
        let diagnostics = Diagnostics::new("test", false);
        let (sender, receiver) = EventQueue::bounded(4, Arc::new(PipelineStats::new())).unwrap();

        let mut buffer = ResponseBuffer::new();
        {
            let mut writer = TrackingWriter::new(
                &mut buffer,
                &engine,
                &sender,
                &diagnostics,
                VisitEvent::pageview("key", "42", "/missing"),
            );
            writer.write_header(StatusCode::from_u16(103).unwrap());
            assert!(writer.is_pending());
            writer.write_header(StatusCode::NOT_FOUND);
            assert!(!writer.is_pending());
        }

        assert!(receiver.is_empty());
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn early_hints_then_ok_is_enqueued() {
        let engine = engine();
        let diagnostics = Diagnostics::new("test", false);
        let (sender, receiver) = EventQueue::bounded(4, Arc::new(PipelineStats::new())).unwrap();

        let mut buffer = ResponseBuffer::new();
        {
            let mut writer = TrackingWriter::new(
                &mut buffer,
                &engine,
                &sender,
                &diagnostics,
                VisitEvent::pageview("key", "42", "/"),
            );
            writer.write_header(StatusCode::from_u16(103).unwrap());
            writer.write_header(StatusCode::OK);
        }

        assert_eq!(receiver.len(), 1);
    }

    #[tokio::test]
    async fn implicit_ok_on_first_write() {
        let engine = engine();
        let diagnostics = Diagnostics::new("test", false);
        let (sender, receiver) = EventQueue::bounded(4, Arc::new(PipelineStats::new())).unwrap();

        let mut buffer = ResponseBuffer::new();
        {
            let mut writer = TrackingWriter::new(
                &mut buffer,
                &engine,
                &sender,
                &diagnostics,
                VisitEvent::pageview("key", "42", "/"),
            );
            writer.write(b"hi").unwrap();
            assert!(writer.flush().is_ok());
        }

        assert_eq!(receiver.len(), 1);
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert_eq!(buffer.flush_count(), 1);
    }
}
