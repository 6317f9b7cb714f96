//! Host-server adapters.
//!
//! A host frontend addresses the handler in one of two ways, both
//! reducing to the same contract: a raw target path plus the mount
//! prefix used for hrefs and `Destination` stripping.
//!
//! - [`ExtraPathAdapter`] models hosts that route by script name and
//!   hand over the already-decoded remainder of the path (the
//!   `PATH_INFO` mechanism).
//! - [`RewriteUriAdapter`] models hosts that pass the raw request URI
//!   through untouched and leave prefix stripping to the handler.
//!
//! The resolver normalizes either way, so a host may supply the path
//! decoded or not.

use percent_encoding::percent_decode;

pub trait HostAdapter {
    /// The target path exactly as this host flavor supplies it.
    fn raw_target_path(&self, uri: &http::Uri) -> String;
    /// The portion of the URL space that addresses this handler.
    fn mount_prefix(&self) -> &str;
}

/// Script-relative extra-path flavor: the handler is mounted at
/// `script_name`, and the host supplies the decoded remainder.
pub struct ExtraPathAdapter {
    script_name: String,
}

impl ExtraPathAdapter {
    pub fn new(script_name: impl Into<String>) -> ExtraPathAdapter {
        ExtraPathAdapter {
            script_name: script_name.into(),
        }
    }
}

impl HostAdapter for ExtraPathAdapter {
    fn raw_target_path(&self, uri: &http::Uri) -> String {
        let path = uri.path();
        let extra = match path.strip_prefix(self.script_name.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        };
        // this flavor hands over a decoded path, like PATH_INFO does.
        percent_decode(extra.as_bytes())
            .decode_utf8_lossy()
            .into_owned()
    }

    fn mount_prefix(&self) -> &str {
        &self.script_name
    }
}

/// Raw-URI rewrite flavor: the handler sees the full request URI and
/// strips the configured prefix itself.
pub struct RewriteUriAdapter {
    prefix: String,
}

impl RewriteUriAdapter {
    pub fn new(prefix: impl Into<String>) -> RewriteUriAdapter {
        RewriteUriAdapter {
            prefix: prefix.into(),
        }
    }
}

impl HostAdapter for RewriteUriAdapter {
    fn raw_target_path(&self, uri: &http::Uri) -> String {
        uri.path().to_string()
    }

    fn mount_prefix(&self) -> &str {
        &self.prefix
    }
}
