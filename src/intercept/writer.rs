use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Request, Response, StatusCode};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Optional writer features a proxy host may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Flush,
    TakeOver,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Flush => f.write_str("flush"),
            Capability::TakeOver => f.write_str("connection take-over"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("response writer does not support {0}")]
    Unsupported(Capability),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw bidirectional stream handed out by a connection take-over.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A connection detached from the HTTP machinery, plus any bytes the host
/// had already read past the request.
pub struct TakenOverConnection {
    pub io: Box<dyn Connection>,
    pub buffered: Bytes,
}

impl fmt::Debug for TakenOverConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TakenOverConnection")
            .field("buffered", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

/// Response sink of the proxy pipeline.
///
/// `flush` and `take_over` are optional; writers that cannot provide them
/// keep the defaults, which report [`WriterError::Unsupported`].
pub trait ResponseWriter: Send {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes. Writing before `write_header` implies `200 OK`.
    fn write(&mut self, buf: &[u8]) -> Result<usize, WriterError>;

    fn flush(&mut self) -> Result<(), WriterError> {
        Err(WriterError::Unsupported(Capability::Flush))
    }

    fn take_over(&mut self) -> Result<TakenOverConnection, WriterError> {
        Err(WriterError::Unsupported(Capability::TakeOver))
    }
}

/// Downstream handler invoked by the middleware.
pub trait Handler<B>: Send + Sync {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &Request<B>);
}

impl<B, F> Handler<B> for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<B>) + Send + Sync,
{
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &Request<B>) {
        self(writer, request)
    }
}

/// In-memory response writer.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    flushes: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status sent so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        // first final status wins, like a real connection
        if self.status.is_none() && !status.is_informational() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, WriterError> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        self.flushes += 1;
        Ok(())
    }
}
