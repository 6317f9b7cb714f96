//! ## WebDAV handler for a sandboxed directory subtree
//!
//! This library is a `handler`: a piece of code that takes a
//! `http::Request`, processes it, and generates a `http::Response`. It
//! maps the basic Webdav protocol ([RFC4918] minus locking and
//! property patching) onto a single local directory, the *sandbox
//! root*. Any client-supplied path — however mangled, encoded, or
//! `..`-laden — resolves to a filesystem path inside that root before
//! any I/O happens.
//!
//! Because the handler works with the standard types from the `http`
//! and `http_body` crates it can be embedded straight into servers
//! built on [hyper], and a compatibility module for [warp] is provided
//! behind the `warp-compat` feature. Hosts that address the handler
//! differently (script-relative extra path vs. rewritten raw URI) are
//! modeled by the two [`HostAdapter`] implementations.
//!
//! Authorization is injected, never owned: pass a
//! [`CredentialVerifier`] (a plain closure works) and the handler
//! gates every method except OPTIONS behind it, answering the 401
//! Basic challenge itself.
//!
//! ## What is deliberately not here
//!
//! - LOCK, UNLOCK and PROPPATCH always answer `501 Not Implemented`;
//!   there are no partial lock semantics.
//! - No in-memory cache or index: every request re-reads the live
//!   filesystem.
//! - No locking around filesystem operations; concurrent writers race
//!   at OS granularity, and recursive DELETE is not transactional.
//!
//! ## Example
//!
//! Serve `/tmp` on port 4918 with hyper:
//!
//! ```no_run
//! use std::convert::Infallible;
//! use davroot::DavBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dav = DavBuilder::new("/tmp")
//!         .auth(|user: &str, pass: &str| {
//!             (user == "admin" && pass == "secret").then(|| user.to_string())
//!         })
//!         .build();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav = dav.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav = dav.clone();
//!                 async move { Ok::<_, Infallible>(dav.handle(req).await) }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!     let _ = hyper::Server::bind(&addr).serve(make_service).await;
//! }
//! ```
//!
//! [RFC4918]: https://www.rfc-editor.org/rfc/rfc4918
//! [hyper]: https://hyper.rs
//! [warp]: https://crates.io/crates/warp

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod adapter;
mod auth;
mod davhandler;
mod errors;
mod multistatus;
mod rootfs;
mod util;

pub mod body;
pub mod davpath;

#[cfg(any(docsrs, feature = "warp-compat"))]
#[cfg_attr(docsrs, doc(cfg(feature = "warp-compat")))]
pub mod warp;

use crate::errors::DavResult;

pub use crate::adapter::{ExtraPathAdapter, HostAdapter, RewriteUriAdapter};
pub use crate::auth::CredentialVerifier;
pub use crate::davhandler::{DavBuilder, DavHandler};
pub use crate::util::DavMethod;
