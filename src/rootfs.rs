//! Filesystem access confined to the sandbox root.
//!
//! `RootFs` is stateless apart from the root directory: every request
//! re-reads the live filesystem, there is no cache or index. All paths
//! handed in are [`DavPath`]s, so confinement has already been decided
//! by the resolver before any I/O happens here.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::davpath::DavPath;
use crate::util::systemtime_to_httpdate;

/// What stat told us about one live resource.
#[derive(Debug, Clone)]
pub(crate) struct ResourceMeta {
    pub len: u64,
    pub modified: SystemTime,
    pub dir: bool,
}

impl From<std::fs::Metadata> for ResourceMeta {
    fn from(m: std::fs::Metadata) -> ResourceMeta {
        ResourceMeta {
            len: m.len(),
            modified: m.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            dir: m.is_dir(),
        }
    }
}

/// Entity tag for a resource: a content-free digest over the formatted
/// last-modified time and the canonical href. Deterministic for an
/// unmodified resource; changes whenever the mtime does. Not a content
/// hash and not guaranteed collision-free.
pub(crate) fn entity_tag(modified: SystemTime, href: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(systemtime_to_httpdate(modified).as_bytes());
    hasher.update(href.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

pub(crate) struct RootFs {
    root: PathBuf,
}

impl RootFs {
    pub fn new(root: impl Into<PathBuf>) -> RootFs {
        RootFs { root: root.into() }
    }

    fn abs(&self, path: &DavPath) -> PathBuf {
        path.abs_path(&self.root)
    }

    pub async fn metadata(&self, path: &DavPath) -> io::Result<ResourceMeta> {
        let meta = fs::metadata(self.abs(path)).await?;
        Ok(meta.into())
    }

    pub async fn exists(&self, path: &DavPath) -> bool {
        fs::metadata(self.abs(path)).await.is_ok()
    }

    pub async fn read_dir(&self, path: &DavPath) -> io::Result<fs::ReadDir> {
        trace!("FS: read_dir {path:?}");
        fs::read_dir(self.abs(path)).await
    }

    pub async fn open_read(&self, path: &DavPath) -> io::Result<fs::File> {
        trace!("FS: open_read {path:?}");
        fs::File::open(self.abs(path)).await
    }

    /// Open for writing, truncating an existing file and creating
    /// missing parent collections on the way.
    pub async fn open_write(&self, path: &DavPath) -> io::Result<fs::File> {
        trace!("FS: open_write {path:?}");
        let abs = self.abs(path);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(abs)
            .await
    }

    /// Create a collection, including missing intermediate segments.
    pub async fn create_collection(&self, path: &DavPath) -> io::Result<()> {
        trace!("FS: create_collection {path:?}");
        fs::create_dir_all(self.abs(path)).await
    }

    pub async fn remove_file(&self, path: &DavPath) -> io::Result<()> {
        trace!("FS: remove_file {path:?}");
        fs::remove_file(self.abs(path)).await
    }

    /// Depth-first recursive delete. Not atomic: a failure partway
    /// leaves the already-deleted part gone.
    pub async fn remove_tree(&self, path: &DavPath) -> io::Result<()> {
        trace!("FS: remove_tree {path:?}");
        remove_tree_inner(self.abs(path)).await
    }

    /// Make sure the collection that will contain `path` exists.
    pub async fn ensure_parent(&self, path: &DavPath) -> io::Result<()> {
        let abs = self.abs(path);
        match abs.parent() {
            Some(parent) => fs::create_dir_all(parent).await,
            None => Ok(()),
        }
    }

    pub async fn rename(&self, from: &DavPath, to: &DavPath) -> io::Result<()> {
        trace!("FS: rename {from:?} {to:?}");
        let p_from = self.abs(from);
        let p_to = self.abs(to);
        match fs::rename(&p_from, &p_to).await {
            Ok(v) => Ok(v),
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(libc::ENOTDIR) && p_from.is_dir() => {
                // webdav allows renaming a collection over a file.
                let _ = fs::remove_file(&p_to).await;
                fs::rename(p_from, p_to).await
            }
            Err(e) => Err(e),
        }
    }
}

// async recursion needs an explicitly boxed future.
fn remove_tree_inner(dir: PathBuf) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let kind = entry.file_type().await?;
            if kind.is_dir() {
                remove_tree_inner(entry.path()).await?;
            } else {
                // covers plain files and symlinks; a symlink to a
                // directory is unlinked, never followed.
                fs::remove_file(entry.path()).await?;
            }
        }
        fs::remove_dir(&dir).await
    })
}
