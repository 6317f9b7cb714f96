use std::io::{Cursor, Write};
use std::time::SystemTime;

use bytes::Bytes;
use headers::Header;

use crate::errors::DavError;
use crate::DavResult;

/// The supported WebDAV methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Options,
    Get,
    Head,
    Put,
    Delete,
    PropFind,
    PropPatch,
    MkCol,
    Move,
    Lock,
    Unlock,
}

/// The fixed supported-method set, as advertised in `Allow` on both
/// OPTIONS responses and 405 rejections.
pub(crate) const ALLOWED_METHODS: &str =
    "OPTIONS, GET, HEAD, PUT, DELETE, PROPFIND, PROPPATCH, MKCOL, MOVE, LOCK, UNLOCK";

// translate method into our own enum that has webdav methods as well.
pub(crate) fn dav_method(m: &http::Method) -> DavResult<DavMethod> {
    let m = match *m {
        http::Method::OPTIONS => DavMethod::Options,
        http::Method::GET => DavMethod::Get,
        http::Method::HEAD => DavMethod::Head,
        http::Method::PUT => DavMethod::Put,
        http::Method::DELETE => DavMethod::Delete,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PropFind,
            "PROPPATCH" => DavMethod::PropPatch,
            "MKCOL" => DavMethod::MkCol,
            "MOVE" => DavMethod::Move,
            "LOCK" => DavMethod::Lock,
            "UNLOCK" => DavMethod::Unlock,
            _ => {
                return Err(DavError::UnknownDavMethod);
            }
        },
    };
    Ok(m)
}

// for external use.
impl std::convert::TryFrom<&http::Method> for DavMethod {
    type Error = http::method::InvalidMethod;

    fn try_from(value: &http::Method) -> Result<Self, Self::Error> {
        dav_method(value).map_err(|_| {
            // A trick to get at the value of http::method::InvalidMethod.
            http::method::Method::from_bytes(b"").unwrap_err()
        })
    }
}

/// RFC-1123 style GMT date, the format used by `Last-Modified` and
/// `<d:getlastmodified>`.
pub(crate) fn systemtime_to_httpdate(t: SystemTime) -> String {
    let d = headers::Date::from(t);
    let mut v = Vec::new();
    d.encode(&mut v);
    v[0].to_str().unwrap().to_owned()
}

// A buffer that implements "Write".
#[derive(Clone)]
pub(crate) struct MemBuffer(Cursor<Vec<u8>>);

impl MemBuffer {
    pub fn new() -> MemBuffer {
        MemBuffer(Cursor::new(Vec::new()))
    }

    pub fn take(&mut self) -> Bytes {
        let buf = std::mem::take(self.0.get_mut());
        self.0.set_position(0);
        Bytes::from(buf)
    }
}

impl Write for MemBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
