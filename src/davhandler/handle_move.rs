use headers::HeaderMapExt;
use http::{Response, StatusCode};

use crate::body::Body;
use crate::davhandler::RequestContext;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    /// MOVE. The destination's parent collection is created if it does
    /// not exist yet; the rename itself is atomic per the underlying
    /// filesystem.
    pub(crate) async fn handle_move(&self, ctx: &RequestContext) -> DavResult<Response<Body>> {
        let dest = match &ctx.destination {
            Some(d) => DavPath::from_destination(d, ctx.path.prefix())?,
            None => return Err(DavError::Status(StatusCode::BAD_REQUEST)),
        };
        if !self.fs.exists(&ctx.path).await {
            return Err(DavError::Status(StatusCode::BAD_REQUEST));
        }

        self.fs
            .ensure_parent(&dest)
            .await
            .map_err(DavError::internal)?;
        self.fs
            .rename(&ctx.path, &dest)
            .await
            .map_err(DavError::internal)?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::CREATED;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
