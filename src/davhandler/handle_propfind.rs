use std::ffi::OsStr;

use http::{Response, StatusCode};

use crate::body::Body;
use crate::davhandler::{Depth, RequestContext};
use crate::errors::DavError;
use crate::multistatus::MultistatusWriter;
use crate::rootfs::ResourceMeta;
use crate::DavResult;

impl crate::DavHandler {
    /// PROPFIND. A missing target is a 404 before any XML is built; a
    /// failure during the directory walk discards the partial document
    /// and surfaces as a 500.
    pub(crate) async fn handle_propfind(&self, ctx: &RequestContext) -> DavResult<Response<Body>> {
        let mut path = ctx.path.clone();
        let meta = self.fs.metadata(&path).await?;
        if meta.dir && !path.is_collection() {
            path.add_slash();
        }

        let mut ms = MultistatusWriter::new()?;
        match ctx.depth {
            Depth::Zero => {
                if meta.dir {
                    ms.collection_response(&path.as_url_string(), meta.modified)?;
                } else {
                    ms.file_response(&path.as_url_string(), &meta)?;
                }
            }
            Depth::One => {
                // at this depth the target itself is always rendered as
                // a collection fragment; a file target just lists no
                // children.
                ms.collection_response(&path.as_url_string(), meta.modified)?;
                if meta.dir {
                    let mut entries =
                        self.fs.read_dir(&path).await.map_err(DavError::internal)?;
                    while let Some(entry) =
                        entries.next_entry().await.map_err(DavError::internal)?
                    {
                        let emeta: ResourceMeta = entry
                            .metadata()
                            .await
                            .map_err(DavError::internal)?
                            .into();
                        let name = entry.file_name();
                        let child = path.child(&name_bytes(&name), emeta.dir);
                        if emeta.dir {
                            ms.collection_response(&child.as_url_string(), emeta.modified)?;
                        } else {
                            ms.file_response(&child.as_url_string(), &emeta)?;
                        }
                    }
                }
            }
        }

        let body = ms.finish()?;
        let res = Response::builder()
            .status(StatusCode::MULTI_STATUS)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("Content-Length", body.len().to_string())
            .body(Body::from(body))
            .unwrap();
        Ok(res)
    }
}

fn name_bytes(name: &OsStr) -> Vec<u8> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        name.as_bytes().to_vec()
    }
    #[cfg(not(unix))]
    {
        name.to_string_lossy().into_owned().into_bytes()
    }
}
