use headers::HeaderMapExt;
use http::Response;

use crate::body::Body;
use crate::davhandler::RequestContext;
use crate::errors::DavError;
use crate::DavResult;

impl crate::DavHandler {
    /// DELETE. Collections are removed depth-first. The recursion is
    /// not transactional: if an unlink fails partway, the descendants
    /// already removed stay removed.
    pub(crate) async fn handle_delete(&self, ctx: &RequestContext) -> DavResult<Response<Body>> {
        let meta = self.fs.metadata(&ctx.path).await?;
        if meta.dir {
            self.fs
                .remove_tree(&ctx.path)
                .await
                .map_err(DavError::internal)?;
        } else {
            self.fs
                .remove_file(&ctx.path)
                .await
                .map_err(DavError::internal)?;
        }

        let mut res = Response::new(Body::empty());
        res.headers_mut().typed_insert(headers::ContentLength(0));
        Ok(res)
    }
}
