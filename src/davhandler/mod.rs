//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::buf::Buf;
use futures_util::stream::Stream;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::adapter::HostAdapter;
use crate::auth::{AuthGate, CredentialVerifier};
use crate::body::{Body, StreamBody};
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::rootfs::RootFs;
use crate::util::{dav_method, DavMethod, ALLOWED_METHODS};
use crate::DavResult;

pub mod handle_delete;
pub mod handle_gethead;
pub mod handle_mkcol;
pub mod handle_move;
pub mod handle_options;
pub mod handle_propfind;
pub mod handle_put;

use handle_gethead::READ_BUF_SIZE;

// Non-PUT request bodies are drained up to this size so the
// connection stays reusable.
const MAX_DRAIN_SIZE: usize = 65536;

const DEFAULT_REALM: &str = "WebDAV Server";

/// Configuration of the handler.
#[derive(Clone)]
pub struct DavBuilder {
    /// Root directory of the sandbox; nothing outside it is ever touched.
    root: PathBuf,
    /// Prefix to be stripped off when handling requests, and prepended
    /// to generated hrefs.
    prefix: String,
    /// Realm reported in the 401 challenge.
    realm: String,
    /// Credential verifier; `None` disables the authorization gate.
    verifier: Option<Arc<dyn CredentialVerifier>>,
    /// Principal to run as when no gate is configured.
    principal: Option<String>,
    /// Read buffer size in bytes for streaming GET.
    read_buf_size: usize,
}

impl DavBuilder {
    /// Create a new configuration builder serving `root`.
    pub fn new(root: impl Into<PathBuf>) -> DavBuilder {
        Self {
            root: root.into(),
            prefix: String::new(),
            realm: DEFAULT_REALM.to_string(),
            verifier: None,
            principal: None,
            read_buf_size: READ_BUF_SIZE,
        }
    }

    /// Use the configuration that was built to create a DavHandler.
    pub fn build(self) -> DavHandler {
        self.into()
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a filesystem path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = prefix.into();
        this
    }

    /// Realm used in the `WWW-Authenticate` challenge.
    pub fn realm(self, realm: impl Into<String>) -> Self {
        let mut this = self;
        this.realm = realm.into();
        this
    }

    /// Require authorization, checked through the given verifier.
    /// Any `Fn(&str, &str) -> Option<String>` works.
    pub fn auth(self, verifier: impl CredentialVerifier + 'static) -> Self {
        let mut this = self;
        this.verifier = Some(Arc::new(verifier));
        this
    }

    /// Set the principal requests run as when no verifier is
    /// configured.
    pub fn principal(self, principal: impl Into<String>) -> Self {
        let mut this = self;
        this.principal = Some(principal.into());
        this
    }

    /// Read buffer size in bytes.
    pub fn read_buf_size(self, size: usize) -> Self {
        let mut this = self;
        this.read_buf_size = size;
        this
    }
}

/// The webdav handler struct.
///
/// The `builder` and `build` methods are used to instantiate a handler.
///
/// The `handle` and `handle_with` methods are the methods that do the
/// actual work.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) fs: Arc<RootFs>,
    pub(crate) prefix: Arc<String>,
    pub(crate) auth: Option<Arc<AuthGate>>,
    pub(crate) principal: Option<Arc<String>>,
    pub(crate) read_buf_size: usize,
}

impl From<DavBuilder> for DavHandler {
    fn from(cfg: DavBuilder) -> Self {
        let auth = cfg
            .verifier
            .map(|v| Arc::new(AuthGate::new(v, cfg.realm)));
        Self {
            fs: Arc::new(RootFs::new(cfg.root)),
            prefix: Arc::new(cfg.prefix),
            auth,
            principal: cfg.principal.map(Arc::new),
            read_buf_size: cfg.read_buf_size,
        }
    }
}

/// Per-request state: the resolved target plus the handful of headers
/// the protocol consumes. Created by the dispatcher, dropped when the
/// response is complete.
pub(crate) struct RequestContext {
    pub path: DavPath,
    pub depth: Depth,
    pub destination: Option<String>,
    pub principal: Option<String>,
}

/// PROPFIND traversal depth. Anything that is not exactly `0`,
/// including `infinity`, behaves as depth 1: the target plus its
/// immediate children. Deeper traversal is never done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Depth {
    Zero,
    One,
}

fn parse_depth(headers: &http::HeaderMap) -> Depth {
    match headers.get("depth").and_then(|v| v.to_str().ok()) {
        Some("0") => Depth::Zero,
        _ => Depth::One,
    }
}

impl DavHandler {
    /// Return a configuration builder serving `root`.
    pub fn builder(root: impl Into<PathBuf>) -> DavBuilder {
        DavBuilder::new(root)
    }

    /// Handle a webdav request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
    {
        let raw = req.uri().path().to_string();
        let prefix = self.prefix.as_str().to_string();
        self.handle_inner(req, raw, prefix, None).await
    }

    /// Handle a webdav request, overriding parts of the config.
    ///
    /// For example, the `prefix` can be set per request when the host
    /// router only knows it at request time, or the `principal` when
    /// the host did its own authentication.
    pub async fn handle_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
        principal: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
    {
        let raw = req.uri().path().to_string();
        let prefix = prefix.unwrap_or_else(|| self.prefix.as_str().to_string());
        self.handle_inner(req, raw, prefix, principal).await
    }

    /// Handle a webdav request addressed through a [`HostAdapter`]:
    /// the adapter supplies the raw target path and mount prefix the
    /// way its host flavor does.
    pub async fn handle_with_adapter<A, ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        adapter: &A,
    ) -> Response<Body>
    where
        A: HostAdapter,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
    {
        let raw = adapter.raw_target_path(req.uri());
        let prefix = adapter.mount_prefix().to_string();
        self.handle_inner(req, raw, prefix, None).await
    }

    /// Handles a request with a `Stream` body instead of a `HttpBody`.
    /// Used with webserver frameworks that have not opted to use the
    /// `http_body` crate just yet.
    #[doc(hidden)]
    pub async fn handle_stream<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: Stream<Item = Result<ReqData, ReqError>>,
    {
        let (parts, body) = req.into_parts();
        let req = Request::from_parts(parts, StreamBody::new(body));
        self.handle(req).await
    }

    /// Handles a request with a `Stream` body instead of a `HttpBody`.
    #[doc(hidden)]
    pub async fn handle_stream_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
        principal: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: Stream<Item = Result<ReqData, ReqError>>,
    {
        let (parts, body) = req.into_parts();
        let req = Request::from_parts(parts, StreamBody::new(body));
        self.handle_with(req, prefix, principal).await
    }
}

impl DavHandler {
    // drain the request body, so the connection can be reused.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<()>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut size = 0;
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "UnexpectedEof",
                ))
            })?;
            size += buf.remaining();
            if size > max_size {
                return Err(DavError::StatusClose(StatusCode::PAYLOAD_TOO_LARGE));
            }
            buf.advance(buf.remaining());
        }
        Ok(())
    }

    // internal dispatcher: turn any DavError into a HTTP error response.
    async fn handle_inner<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        raw: String,
        prefix: String,
        principal: Option<String>,
    ) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        match self.handle2(req, raw, prefix, principal).await {
            Ok(resp) => {
                debug!("== END REQUEST result OK");
                resp
            }
            Err(err) => {
                debug!("== END REQUEST result {:?}", err);
                let mut resp = Response::builder()
                    .status(err.statuscode())
                    .header("Content-Length", "0");
                if let DavError::UnknownDavMethod = err {
                    resp = resp.header("Allow", ALLOWED_METHODS);
                }
                if err.must_close() {
                    resp = resp.header("connection", "close");
                }
                resp.body(Body::empty()).unwrap()
            }
        }
    }

    // internal dispatcher part 2.
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        raw: String,
        prefix: String,
        principal: Option<String>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            }
        };

        // OPTIONS answers without consulting the authorization gate.
        if method == DavMethod::Options {
            self.read_request(body, MAX_DRAIN_SIZE).await?;
            return self.handle_options(&req).await;
        }

        // Authorization gate. On denial the gate has already built the
        // complete challenge; nothing more to do.
        let principal = match &self.auth {
            Some(gate) => match gate.authorize(&req) {
                Ok(p) => Some(p),
                Err(challenge) => {
                    debug!("== END REQUEST unauthorized");
                    return Ok(challenge);
                }
            },
            None => principal.or_else(|| self.principal.as_ref().map(|p| p.as_str().to_string())),
        };

        let ctx = RequestContext {
            path: DavPath::from_raw(&raw, &prefix),
            depth: parse_depth(req.headers()),
            destination: req
                .headers()
                .get("destination")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            principal,
        };

        debug!(
            "== START REQUEST {:?} {} (principal {:?})",
            method, ctx.path, ctx.principal
        );

        // PUT is the only handler that consumes the body itself; the
        // rest get it drained here.
        if method == DavMethod::Put {
            return self.handle_put(&ctx, body).await;
        }
        self.read_request(body, MAX_DRAIN_SIZE).await?;

        match method {
            DavMethod::Get => self.handle_get(&req, &ctx, false).await,
            DavMethod::Head => self.handle_get(&req, &ctx, true).await,
            DavMethod::PropFind => self.handle_propfind(&ctx).await,
            DavMethod::MkCol => self.handle_mkcol(&ctx).await,
            DavMethod::Delete => self.handle_delete(&ctx).await,
            DavMethod::Move => self.handle_move(&ctx).await,
            // lock semantics are not provided, not even partially.
            DavMethod::Lock | DavMethod::Unlock | DavMethod::PropPatch => {
                Err(DavError::Status(StatusCode::NOT_IMPLEMENTED))
            }
            DavMethod::Options | DavMethod::Put => unreachable!(),
        }
    }
}
