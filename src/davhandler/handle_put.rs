use std::error::Error as StdError;
use std::io;

use bytes::buf::Buf;
use headers::HeaderMapExt;
use http::{Response, StatusCode};
use http_body::Body as HttpBody;
use tokio::io::AsyncWriteExt;

use crate::body::Body;
use crate::davhandler::RequestContext;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    /// PUT. Missing parent collections are created on the way; an
    /// existing file is overwritten. The body streams straight to
    /// disk, so a concurrent reader of the same path may observe a
    /// partially written file.
    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        ctx: &RequestContext,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut file = self
            .fs
            .open_write(&ctx.path)
            .await
            .map_err(DavError::internal)?;

        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            while buf.has_remaining() {
                let n = file.write(buf.chunk()).await.map_err(DavError::internal)?;
                buf.advance(n);
            }
        }
        file.sync_all().await.map_err(DavError::internal)?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
