//! Request and response body types.

use std::error::Error as StdError;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use futures_util::stream::{BoxStream, Stream};
use http::header::HeaderMap;
use http_body::Body as HttpBody;

use pin_project::pin_project;
use pin_utils::pin_mut;

/// Body returned by the handler. Implements both `Stream` and
/// `http_body::Body`, so it plugs into frameworks of either persuasion.
///
/// Small responses (XML documents, errors) are a single `Bytes` chunk;
/// GET responses stream the file.
pub struct Body {
    inner: BodyVariant,
}

enum BodyVariant {
    Bytes(Option<Bytes>),
    Stream(BoxStream<'static, Result<Bytes, io::Error>>),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            BodyVariant::Bytes(b) => f.debug_tuple("Body::Bytes").field(b).finish(),
            BodyVariant::Stream(_) => f.debug_tuple("Body::Stream").finish(),
        }
    }
}

impl Body {
    /// Return an empty body.
    pub fn empty() -> Body {
        Body {
            inner: BodyVariant::Bytes(None),
        }
    }

    /// Create a body from a stream of chunks.
    pub fn stream(stream: impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static) -> Body {
        Body {
            inner: BodyVariant::Stream(Box::pin(stream)),
        }
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        match &mut self.inner {
            BodyVariant::Bytes(bytes) => Poll::Ready(bytes.take().map(Ok)),
            BodyVariant::Stream(stream) => {
                pin_mut!(stream);
                stream.poll_next(cx)
            }
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.poll_next(cx)
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Body {
        Body {
            inner: BodyVariant::Bytes(Some(b)),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Bytes::from(s).into()
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Bytes::from(s.to_string()).into()
    }
}

// Wraps a Stream of Buf chunks so it can be fed to handlers that
// expect an `http_body::Body` request body.
#[pin_project]
pub(crate) struct StreamBody<B> {
    #[pin]
    body: B,
}

impl<ReqBody, ReqData, ReqError> StreamBody<ReqBody>
where
    ReqData: Buf + Send,
    ReqError: StdError + Send + Sync + 'static,
    ReqBody: Stream<Item = Result<ReqData, ReqError>>,
{
    pub fn new(body: ReqBody) -> StreamBody<ReqBody> {
        StreamBody { body }
    }
}

impl<ReqBody, ReqData, ReqError> HttpBody for StreamBody<ReqBody>
where
    ReqData: Buf + Send,
    ReqError: StdError + Send + Sync + 'static,
    ReqBody: Stream<Item = Result<ReqData, ReqError>>,
{
    type Data = ReqData;
    type Error = ReqError;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        let this = self.project();
        this.body.poll_next(cx)
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }
}
