//! Adapter for the `warp` HTTP server framework.
//!
//! The filters in this module always succeed and never return a
//! rejection; protocol errors (404 and friends) come back as regular
//! replies.

use std::convert::Infallible;
use std::path::Path;

use crate::{DavBuilder, DavHandler};
use warp::{filters::BoxedFilter, Filter, Reply};

/// Reply-filter that runs a DavHandler.
///
/// Just pass in a pre-configured DavHandler. If a prefix was not
/// configured, it will be the request path up to this point.
pub fn dav_handler(handler: DavHandler) -> BoxedFilter<(impl Reply,)> {
    use http::header::HeaderMap;
    use http::uri::Uri;
    use http::Response;
    use warp::path::{FullPath, Tail};

    warp::method()
        .and(warp::path::full())
        .and(warp::path::tail())
        .and(warp::header::headers_cloned())
        .and(warp::body::stream())
        .and_then(
            move |method, path_full: FullPath, path_tail: Tail, headers: HeaderMap, body| {
                let handler = handler.clone();

                async move {
                    // rebuild an http::Request struct.
                    let path_str = path_full.as_str();
                    let uri = path_str.parse::<Uri>().unwrap();
                    let mut builder = http::Request::builder().method(method).uri(uri);
                    for (k, v) in headers.iter() {
                        builder = builder.header(k, v);
                    }
                    let request = builder.body(body).unwrap();

                    // the route up to this point is the mount prefix.
                    let path_len = path_str.len();
                    let tail_len = path_tail.as_str().len();
                    let prefix = path_str[..path_len - tail_len]
                        .trim_end_matches('/')
                        .to_string();
                    let response = handler
                        .handle_stream_with(request, Some(prefix), None)
                        .await;

                    // Need to remap the http_body::Body to a hyper::Body.
                    let (parts, body) = response.into_parts();
                    let response = Response::from_parts(parts, hyper::Body::wrap_stream(body));
                    Ok::<_, Infallible>(response)
                }
            },
        )
        .boxed()
}

/// Creates a Filter that serves the given directory subtree over
/// WebDAV, at the base path joined with the remainder of the request
/// path.
pub fn dav_dir(base: impl AsRef<Path>) -> BoxedFilter<(impl Reply,)> {
    dav_handler(DavBuilder::new(base.as_ref()).build())
}
