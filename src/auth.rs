//! Basic-auth gate.
//!
//! The handler never owns credential material. A host injects a
//! [`CredentialVerifier`] (any `Fn(&str, &str) -> Option<String>`
//! closure works) and the gate turns it into the per-request
//! allow/challenge decision. On denial the gate builds the full 401
//! response, `WWW-Authenticate` header included; the dispatcher sends
//! it without further work.

use std::sync::Arc;

use headers::{authorization::Basic, Authorization, HeaderMapExt};
use http::{Request, Response, StatusCode};

use crate::body::Body;

/// Checks one username/password pair, yielding the principal that the
/// rest of the request runs as.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<String>;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn verify(&self, username: &str, password: &str) -> Option<String> {
        self(username, password)
    }
}

pub(crate) struct AuthGate {
    verifier: Arc<dyn CredentialVerifier>,
    realm: String,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, realm: String) -> AuthGate {
        AuthGate { verifier, realm }
    }

    /// Authorize a request. `Err` carries the ready-to-send challenge.
    pub fn authorize<B>(&self, req: &Request<B>) -> Result<String, Response<Body>> {
        let basic = match req.headers().typed_get::<Authorization<Basic>>() {
            Some(Authorization(basic)) => basic,
            None => return Err(self.challenge()),
        };
        match self.verifier.verify(basic.username(), basic.password()) {
            Some(principal) => Ok(principal),
            None => {
                debug!("authorization failed for {:?}", basic.username());
                Err(self.challenge())
            }
        }
    }

    fn challenge(&self) -> Response<Body> {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(
                "WWW-Authenticate",
                format!("Basic realm=\"{}\"", self.realm),
            )
            .header("Content-Length", "0")
            .body(Body::empty())
            .unwrap()
    }
}
