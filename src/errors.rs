//
// Errors that can be returned by the handlers, and their mapping
// to HTTP status codes.
//
use std::error::Error;
use std::fmt;
use std::io;

use http::StatusCode;

pub(crate) type DavResult<T> = Result<T, DavError>;

#[derive(Debug)]
pub(crate) enum DavError {
    /// Plain status response.
    Status(StatusCode),
    /// Status response; the connection cannot be reused because the
    /// request body was not (fully) consumed.
    StatusClose(StatusCode),
    /// Request method is not in the supported set.
    UnknownDavMethod,
    /// Filesystem failure. NotFound maps to 404, everything else to 500;
    /// the OS detail stays in the server log.
    Io(io::Error),
    /// Failure while serializing the multistatus document.
    Xml(xml::writer::Error),
}

impl DavError {
    pub(crate) fn statuscode(&self) -> StatusCode {
        match self {
            DavError::Status(code) => *code,
            DavError::StatusClose(code) => *code,
            DavError::UnknownDavMethod => StatusCode::METHOD_NOT_ALLOWED,
            DavError::Io(e) => ioerror_to_status(e),
            DavError::Xml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn must_close(&self) -> bool {
        matches!(self, DavError::StatusClose(_))
    }

    /// Wrap a filesystem error that must surface as a plain 500, no
    /// matter what kind it is (PUT open/stream failures, rename
    /// failures, errors halfway through a directory walk).
    pub(crate) fn internal(e: io::Error) -> DavError {
        debug!("filesystem failure: {}", e);
        DavError::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn ioerror_to_status(e: &io::Error) -> StatusCode {
    match e.kind() {
        io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DavError::Status(code) => write!(f, "{}", code),
            DavError::StatusClose(code) => write!(f, "{} (close)", code),
            DavError::UnknownDavMethod => write!(f, "unsupported request method"),
            DavError::Io(e) => write!(f, "io: {}", e),
            DavError::Xml(e) => write!(f, "xml: {}", e),
        }
    }
}

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::Io(e) => Some(e),
            DavError::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StatusCode> for DavError {
    fn from(code: StatusCode) -> Self {
        DavError::Status(code)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::Io(e)
    }
}

impl From<xml::writer::Error> for DavError {
    fn from(e: xml::writer::Error) -> Self {
        DavError::Xml(e)
    }
}
