use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davhandler::RequestContext;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    /// MKCOL. Missing intermediate collections are created as well,
    /// which is laxer than RFC 4918 (strictly, a missing parent is a
    /// 409); kept for compatibility with existing clients of the
    /// service this replaces.
    pub(crate) async fn handle_mkcol(&self, ctx: &RequestContext) -> DavResult<Response<Body>> {
        if self.fs.exists(&ctx.path).await {
            return Err(DavError::Status(StatusCode::METHOD_NOT_ALLOWED));
        }
        self.fs
            .create_collection(&ctx.path)
            .await
            .map_err(DavError::internal)?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
