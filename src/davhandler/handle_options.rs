use headers::HeaderMapExt;
use http::{Request, Response};

use crate::body::Body;
use crate::util::ALLOWED_METHODS;
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_options(&self, _req: &Request<()>) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());

        let h = res.headers_mut();

        // Class 2 is advertised even though LOCK/UNLOCK answer 501:
        // Windows and macOS clients refuse to mount a share read-write
        // unless the server claims lock support somewhere.
        h.insert("DAV", "1, 2".parse().unwrap());
        h.insert("MS-Author-Via", "DAV".parse().unwrap());
        h.insert("Allow", ALLOWED_METHODS.parse().unwrap());
        h.typed_insert(headers::ContentLength(0));

        Ok(res)
    }
}
