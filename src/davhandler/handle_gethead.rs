use async_stream::stream;
use bytes::BytesMut;
use http::header::HeaderValue;
use http::{Request, Response, StatusCode};
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use tokio::io::AsyncReadExt;

use crate::body::Body;
use crate::davhandler::RequestContext;
use crate::errors::DavError;
use crate::util::systemtime_to_httpdate;
use crate::DavResult;

pub(crate) const READ_BUF_SIZE: usize = 65536;

// rawurlencode-style escaping for the legacy disposition branch.
const FILENAME_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

lazy_static! {
    static ref UA_LEGACY: Regex = Regex::new(r"(?i)MSIE|Trident").unwrap();
    static ref UA_EXTENDED: Regex = Regex::new(r"(?i)Firefox").unwrap();
}

impl crate::DavHandler {
    pub(crate) async fn handle_get(
        &self,
        req: &Request<()>,
        ctx: &RequestContext,
        head: bool,
    ) -> DavResult<Response<Body>> {
        let meta = self.fs.metadata(&ctx.path).await?;
        if meta.dir {
            // only files are served; collections are browsed with PROPFIND.
            return Err(DavError::Status(StatusCode::NOT_FOUND));
        }

        let mut res = Response::builder()
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", meta.len.to_string())
            .header("Last-Modified", systemtime_to_httpdate(meta.modified));

        if head {
            return Ok(res.body(Body::empty()).unwrap());
        }

        if let Some(name) = ctx.path.file_name() {
            let user_agent = req
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            res = res.header("Content-Disposition", content_disposition(name, user_agent));
        }

        let mut file = self.fs.open_read(&ctx.path).await?;
        let buf_size = self.read_buf_size;
        let body = Body::stream(stream! {
            loop {
                let mut buf = BytesMut::with_capacity(buf_size);
                match file.read_buf(&mut buf).await {
                    Ok(0) => break,
                    Ok(_) => yield Ok(buf.freeze()),
                    Err(e) => {
                        debug!("GET: read failed mid-stream: {e}");
                        yield Err(e);
                        break;
                    }
                }
            }
        });
        Ok(res.body(body).unwrap())
    }
}

// Three functionally equivalent spellings of "save as <name>", chosen
// by client family. Legacy Microsoft browsers only get the name
// percent-encoded; Firefox understands the RFC 5987 extended form;
// everything else takes the plain quoted filename.
fn content_disposition(name: &[u8], user_agent: &str) -> HeaderValue {
    let encoded = |name: &[u8]| {
        HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            percent_encode(name, FILENAME_ENCODE)
        ))
        .unwrap()
    };
    if UA_LEGACY.is_match(user_agent) {
        encoded(name)
    } else if UA_EXTENDED.is_match(user_agent) {
        let mut v: Vec<u8> = b"attachment; filename*=\"utf-8''".to_vec();
        v.extend_from_slice(name);
        v.push(b'"');
        HeaderValue::from_bytes(&v).unwrap_or_else(|_| encoded(name))
    } else {
        let mut v: Vec<u8> = b"attachment; filename=\"".to_vec();
        v.extend_from_slice(name);
        v.push(b'"');
        HeaderValue::from_bytes(&v).unwrap_or_else(|_| encoded(name))
    }
}
