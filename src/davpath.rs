//! Sandbox-confined request paths.
//!
//! A [`DavPath`] is the result of resolving a client-supplied target
//! path against a mount prefix: a normalized, percent-decoded list of
//! path segments that is guaranteed to stay below the configured root
//! directory. Normalization is purely syntactic (a segment stack), so
//! the confinement holds for paths that do not exist yet (PUT, MKCOL)
//! and never depends on resolving symlinks.
//!
//! The inverse direction lives here too: [`DavPath::as_url_string`]
//! produces the canonical href used in `Location`-style headers and
//! PROPFIND responses. Only a fixed set of reserved characters is
//! escaped; multi-byte filename characters pass through literally so
//! clients see their own names.

use std::fmt;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use http::StatusCode;
use percent_encoding::percent_decode;
use url::Url;

use crate::errors::DavError;
use crate::DavResult;

/// Characters percent-escaped when generating hrefs. Everything else,
/// including non-ASCII bytes, is emitted as-is.
const HREF_RESERVED: &[u8] = b" \"<>#?{}|\\^~[]`";

/// A normalized, sandbox-relative resource path plus the mount prefix
/// it was addressed under.
#[derive(Clone, PartialEq, Eq)]
pub struct DavPath {
    // decoded path segments, in order; no "." or ".." entries.
    segments: Vec<Vec<u8>>,
    // did the client address this as a collection (trailing slash)?
    collection: bool,
    prefix: String,
}

impl DavPath {
    /// The sandbox root itself.
    pub fn root(prefix: &str) -> DavPath {
        DavPath {
            segments: Vec::new(),
            collection: true,
            prefix: prefix.to_string(),
        }
    }

    /// Resolve a raw target path from the host server.
    ///
    /// The mount prefix is stripped if present (hosts of the extra-path
    /// flavor have already stripped it, which is fine), the remainder is
    /// percent-decoded, and `.`/`..` segments are resolved against a
    /// segment stack. A path that would ascend above the root resolves
    /// to the root instead of erroring; see the crate docs for why this
    /// conservative fallback is kept.
    pub fn from_raw(raw: &str, prefix: &str) -> DavPath {
        let rel = strip_mount_prefix(raw, prefix);
        let decoded: Vec<u8> = percent_decode(rel.as_bytes()).collect();
        let collection = decoded.ends_with(b"/");

        let mut segments: Vec<Vec<u8>> = Vec::new();
        for seg in decoded.split(|&b| b == b'/') {
            match seg {
                b"" | b"." => {}
                b".." => {
                    if segments.pop().is_none() {
                        return DavPath::root(prefix);
                    }
                }
                _ => segments.push(seg.to_vec()),
            }
        }

        let collection = collection || segments.is_empty();
        DavPath {
            segments,
            collection,
            prefix: prefix.to_string(),
        }
    }

    /// Resolve the `Destination` header of a MOVE request: an absolute
    /// URL (some clients send just the path). The path part must be
    /// addressed under the same mount prefix.
    pub fn from_destination(dest: &str, prefix: &str) -> DavResult<DavPath> {
        let path = match Url::parse(dest) {
            Ok(url) => url.path().to_string(),
            Err(url::ParseError::RelativeUrlWithoutBase) => dest.to_string(),
            Err(_) => return Err(DavError::Status(StatusCode::BAD_REQUEST)),
        };
        if !prefix_matches(&path, prefix) {
            return Err(DavError::Status(StatusCode::BAD_REQUEST));
        }
        Ok(DavPath::from_raw(&path, prefix))
    }

    /// The mount prefix this path was resolved under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Mark this path as a collection, so the href gains its trailing
    /// slash. Used after stat reveals the target is a directory.
    pub fn add_slash(&mut self) {
        self.collection = true;
    }

    /// Final path segment, if any (decoded bytes).
    pub fn file_name(&self) -> Option<&[u8]> {
        self.segments.last().map(|s| s.as_slice())
    }

    /// The collection containing this resource.
    pub fn parent(&self) -> DavPath {
        let mut segments = self.segments.clone();
        segments.pop();
        DavPath {
            segments,
            collection: true,
            prefix: self.prefix.clone(),
        }
    }

    /// A direct child of this path (which must be a collection).
    pub(crate) fn child(&self, name: &[u8], collection: bool) -> DavPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_vec());
        DavPath {
            segments,
            collection,
            prefix: self.prefix.clone(),
        }
    }

    /// Canonical encoded href: mount prefix, then each segment with the
    /// reserved set escaped. Collection hrefs end with `/`.
    pub fn as_url_string(&self) -> String {
        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(self.prefix.as_bytes());
        if self.segments.is_empty() {
            out.push(b'/');
        } else {
            for seg in &self.segments {
                out.push(b'/');
                encode_segment(seg, &mut out);
            }
            if self.collection {
                out.push(b'/');
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// The path relative to the sandbox root, as an OS path.
    pub fn as_rel_ospath(&self) -> PathBuf {
        let mut joined: Vec<u8> = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                joined.push(b'/');
            }
            joined.extend_from_slice(seg);
        }
        #[cfg(unix)]
        {
            PathBuf::from(std::ffi::OsStr::from_bytes(&joined).to_os_string())
        }
        #[cfg(not(unix))]
        {
            PathBuf::from(String::from_utf8_lossy(&joined).into_owned())
        }
    }

    /// The absolute filesystem path below `root`.
    pub fn abs_path(&self, root: &Path) -> PathBuf {
        root.join(self.as_rel_ospath())
    }
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_url_string())
    }
}

impl fmt::Debug for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_url_string())
    }
}

// Strip the prefix only on a path-segment boundary, so a prefix of
// "/dav" does not eat into "/davros".
fn strip_mount_prefix<'a>(raw: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return raw;
    }
    match raw.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/') => rest,
        _ => raw,
    }
}

fn prefix_matches(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    matches!(
        path.strip_prefix(prefix),
        Some(rest) if rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/')
    )
}

fn encode_segment(seg: &[u8], out: &mut Vec<u8>) {
    for &b in seg {
        if b < 0x20 || b == 0x7f || HREF_RESERVED.contains(&b) {
            out.push(b'%');
            out.push(HEX[(b >> 4) as usize]);
            out.push(HEX[(b & 0xf) as usize]);
        } else {
            out.push(b);
        }
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";
