//
// End-to-end tests: hand-built http::Requests through the full
// handler against a throwaway directory.
//

use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::StreamExt;
use headers::HeaderMapExt;
use http::{HeaderMap, Request, StatusCode};

use davroot::body::Body;
use davroot::{DavBuilder, DavHandler};

fn handler(root: &Path) -> DavHandler {
    DavBuilder::new(root).build()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn request_with_body(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn run(h: &DavHandler, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let res = h.handle(req).await;
    let status = res.status();
    let headers = res.headers().clone();
    let mut body = res.into_body();
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    (status, headers, Bytes::from(out))
}

fn response_count(xml: &str) -> usize {
    xml.matches("<d:response>").count()
}

#[tokio::test]
async fn options_needs_no_auth_and_advertises_dav() {
    let dir = tempfile::tempdir().unwrap();
    let h = DavBuilder::new(dir.path())
        .auth(|_: &str, _: &str| None::<String>)
        .build();

    let (status, headers, body) = run(&h, request("OPTIONS", "/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["DAV"], "1, 2");
    assert_eq!(headers["MS-Author-Via"], "DAV");
    assert_eq!(headers["Content-Length"], "0");
    assert!(body.is_empty());

    let allow = headers["Allow"].to_str().unwrap();
    for m in [
        "OPTIONS",
        "GET",
        "HEAD",
        "PUT",
        "DELETE",
        "PROPFIND",
        "PROPPATCH",
        "MKCOL",
        "MOVE",
        "LOCK",
        "UNLOCK",
    ] {
        assert!(allow.contains(m), "Allow misses {m}");
    }
}

#[tokio::test]
async fn put_then_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request_with_body("PUT", "/a/b.txt", "hello")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, headers, body) = run(&h, request("GET", "/a/b.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"hello");
    assert_eq!(headers["Content-Type"], "application/octet-stream");
    assert_eq!(headers["Content-Length"], "5");
    assert!(headers.contains_key("Last-Modified"));
}

#[tokio::test]
async fn put_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    run(&h, request_with_body("PUT", "/f.txt", "first version")).await;
    let (status, _, _) = run(&h, request_with_body("PUT", "/f.txt", "second")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, _, body) = run(&h, request("GET", "/f.txt")).await;
    assert_eq!(&body[..], b"second");
}

#[tokio::test]
async fn get_and_head_on_missing_are_404() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("GET", "/nope.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = run(&h, request("HEAD", "/nope.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_sends_headers_but_no_body() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.bin"), b"12345").unwrap();
    let h = handler(dir.path());

    let (status, headers, body) = run(&h, request("HEAD", "/f.bin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["Content-Length"], "5");
    assert!(headers.contains_key("Last-Modified"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn get_sets_disposition_by_user_agent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), b"x").unwrap();
    let h = handler(dir.path());

    let req = Request::builder()
        .method("GET")
        .uri("/f.txt")
        .header("User-Agent", "Mozilla/5.0 Firefox/119.0")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = run(&h, req).await;
    assert_eq!(
        headers["Content-Disposition"],
        "attachment; filename*=\"utf-8''f.txt\""
    );

    let req = Request::builder()
        .method("GET")
        .uri("/f.txt")
        .header("User-Agent", "Mozilla/4.0 (compatible; MSIE 8.0)")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = run(&h, req).await;
    assert_eq!(
        headers["Content-Disposition"],
        "attachment; filename=\"f.txt\""
    );
}

#[tokio::test]
async fn mkcol_then_mkcol_again_is_405() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("MKCOL", "/x")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(dir.path().join("x").is_dir());

    let (status, _, _) = run(&h, request("MKCOL", "/x")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(dir.path().join("x").is_dir());
}

#[tokio::test]
async fn mkcol_creates_intermediate_collections() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("MKCOL", "/x/y/z")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(dir.path().join("x/y/z").is_dir());
}

#[tokio::test]
async fn delete_collection_is_recursive() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    std::fs::write(dir.path().join("a/top.txt"), b"1").unwrap();
    std::fs::write(dir.path().join("a/b/mid.txt"), b"2").unwrap();
    std::fs::write(dir.path().join("a/b/c/leaf.txt"), b"3").unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("DELETE", "/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!dir.path().join("a").exists());

    let (status, _, _) = run(&h, request("DELETE", "/a")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_preserves_bytes_and_removes_source() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    run(&h, request_with_body("PUT", "/src.txt", "payload bytes")).await;

    let req = Request::builder()
        .method("MOVE")
        .uri("/src.txt")
        .header("Destination", "http://localhost/sub/dst.txt")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = run(&h, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = run(&h, request("GET", "/sub/dst.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"payload bytes");

    let (status, _, _) = run(&h, request("GET", "/src.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_without_destination_or_source_is_400() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("here.txt"), b"x").unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("MOVE", "/here.txt")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("MOVE")
        .uri("/absent.txt")
        .header("Destination", "http://localhost/dst.txt")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = run(&h, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn propfind_depth0_file_is_single_response() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a b.txt"), b"hi").unwrap();
    let h = handler(dir.path());

    let req = Request::builder()
        .method("PROPFIND")
        .uri("/a%20b.txt")
        .header("Depth", "0")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = run(&h, req).await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(headers["Content-Type"], "text/xml; charset=\"utf-8\"");

    let xml = std::str::from_utf8(&body).unwrap();
    assert_eq!(response_count(xml), 1);
    // href echoes the canonical encoded request path
    assert!(xml.contains("<d:href>/a%20b.txt</d:href>"), "{xml}");
    assert!(xml.contains("<d:getcontentlength>2</d:getcontentlength>"));
    assert!(xml.contains("<d:getetag>"));
}

#[tokio::test]
async fn propfind_depth1_lists_immediate_children_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("file1.txt"), b"1").unwrap();
    std::fs::write(dir.path().join("file2.txt"), b"22").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/inner.txt"), b"deep").unwrap();
    let h = handler(dir.path());

    for depth in [None, Some("1"), Some("infinity")] {
        let mut req = Request::builder().method("PROPFIND").uri("/");
        if let Some(d) = depth {
            req = req.header("Depth", d);
        }
        let (status, _, body) = run(&h, req.body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::MULTI_STATUS);

        let xml = std::str::from_utf8(&body).unwrap().to_string();
        // the target plus 3 children; inner.txt is never listed
        assert_eq!(response_count(&xml), 4, "depth {depth:?}: {xml}");
        assert!(xml.contains("<d:href>/sub/</d:href>"));
        assert!(!xml.contains("inner.txt"));
    }
}

#[tokio::test]
async fn propfind_depth1_on_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, body) = run(&h, request("PROPFIND", "/")).await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    let xml = std::str::from_utf8(&body).unwrap();
    assert_eq!(response_count(xml), 1);
    assert!(xml.contains("<d:collection"));
}

#[tokio::test]
async fn propfind_missing_target_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    let (status, _, _) = run(&h, request("PROPFIND", "/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn propfind_etag_tracks_mtime() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), b"x").unwrap();
    let h = handler(dir.path());

    fn set_mtime(path: &Path, secs: u64) {
        let f = std::fs::File::options().write(true).open(path).unwrap();
        f.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }
    fn extract_etag(xml: &str) -> String {
        let start = xml.find("<d:getetag>").unwrap() + "<d:getetag>".len();
        let end = xml[start..].find("</d:getetag>").unwrap() + start;
        xml[start..end].to_string()
    }

    let probe = || {
        let h = h.clone();
        async move {
            let req = Request::builder()
                .method("PROPFIND")
                .uri("/f.txt")
                .header("Depth", "0")
                .body(Body::empty())
                .unwrap();
            let (_, _, body) = run(&h, req).await;
            extract_etag(std::str::from_utf8(&body).unwrap())
        }
    };

    set_mtime(&dir.path().join("f.txt"), 1_700_000_000);
    let tag1 = probe().await;
    let tag2 = probe().await;
    assert_eq!(tag1, tag2);
    assert!(tag1.starts_with('"') && tag1.ends_with('"'));

    set_mtime(&dir.path().join("f.txt"), 1_700_000_060);
    let tag3 = probe().await;
    assert_ne!(tag1, tag3);
}

#[tokio::test]
async fn lock_unlock_proppatch_are_501() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("real.txt"), b"x").unwrap();
    let h = handler(dir.path());

    for method in ["LOCK", "UNLOCK", "PROPPATCH"] {
        for uri in ["/real.txt", "/ghost.txt"] {
            let (status, _, _) = run(&h, request(method, uri)).await;
            assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{method} {uri}");
        }
    }
}

#[tokio::test]
async fn unknown_method_is_405_with_allow() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    for method in ["REPORT", "COPY", "PATCH"] {
        let (status, headers, _) = run(&h, request(method, "/")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        let allow = headers["Allow"].to_str().unwrap();
        assert!(allow.contains("PROPFIND"));
        assert!(allow.contains("MKCOL"));
    }
}

#[tokio::test]
async fn traversal_never_escapes_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    // a clamped PUT lands on the root collection and fails, but
    // never writes outside the sandbox
    let (status, _, _) =
        run(&h, request_with_body("PUT", "/%2e%2e/escape.txt", "boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!dir.path().parent().unwrap().join("escape.txt").exists());

    // a clamped GET sees the root collection, which is not a file
    let (status, _, _) = run(&h, request("GET", "/%2e%2e/%2e%2e/etc/passwd")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // a clamped PROPFIND answers for the root itself
    let req = Request::builder()
        .method("PROPFIND")
        .uri("/%2e%2e/%2e%2e")
        .header("Depth", "0")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = run(&h, req).await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    let xml = std::str::from_utf8(&body).unwrap();
    assert!(xml.contains("<d:href>/</d:href>"));
}

#[tokio::test]
async fn auth_gate_challenges_and_admits() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), b"x").unwrap();
    let h = DavBuilder::new(dir.path())
        .realm("Test Realm")
        .auth(|user: &str, pass: &str| {
            (user == "admin" && pass == "admin123").then(|| user.to_string())
        })
        .build();

    // no credentials
    let (status, headers, _) = run(&h, request("GET", "/f.txt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers["WWW-Authenticate"], "Basic realm=\"Test Realm\"");

    // wrong credentials
    let mut req = request("GET", "/f.txt");
    req.headers_mut()
        .typed_insert(headers::Authorization::basic("admin", "nope"));
    let (status, _, _) = run(&h, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // good credentials
    let mut req = request("GET", "/f.txt");
    req.headers_mut()
        .typed_insert(headers::Authorization::basic("admin", "admin123"));
    let (status, _, body) = run(&h, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"x");
}

#[tokio::test]
async fn mounted_prefix_shows_up_in_hrefs() {
    let dir = tempfile::tempdir().unwrap();
    let h = DavBuilder::new(dir.path()).strip_prefix("/dav").build();

    let (status, _, _) = run(&h, request_with_body("PUT", "/dav/a.txt", "hi")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(dir.path().join("a.txt").is_file());

    let req = Request::builder()
        .method("PROPFIND")
        .uri("/dav/a.txt")
        .header("Depth", "0")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = run(&h, req).await;
    let xml = std::str::from_utf8(&body).unwrap();
    assert!(xml.contains("<d:href>/dav/a.txt</d:href>"), "{xml}");

    // destinations under a foreign prefix are refused
    let req = Request::builder()
        .method("MOVE")
        .uri("/dav/a.txt")
        .header("Destination", "http://localhost/elsewhere/a.txt")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = run(&h, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn host_adapters_address_the_same_tree() {
    use davroot::{ExtraPathAdapter, RewriteUriAdapter};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f.txt"), b"shared").unwrap();
    let h = handler(dir.path());

    let extra = ExtraPathAdapter::new("/webdav");
    let res = h
        .handle_with_adapter(request("GET", "/webdav/f.txt"), &extra)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let rewrite = RewriteUriAdapter::new("/webdav");
    let req = Request::builder()
        .method("PROPFIND")
        .uri("/webdav/f.txt")
        .header("Depth", "0")
        .body(Body::empty())
        .unwrap();
    let res = h.handle_with_adapter(req, &rewrite).await;
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let mut body = res.into_body();
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    let xml = String::from_utf8(out).unwrap();
    // hrefs are rooted at the mount prefix for both flavors
    assert!(xml.contains("<d:href>/webdav/f.txt</d:href>"), "{xml}");
}

#[tokio::test]
async fn multibyte_names_stay_literal() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler(dir.path());

    // 文件.txt
    let (status, _, _) = run(
        &h,
        request_with_body("PUT", "/%E6%96%87%E4%BB%B6.txt", "你好"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(dir.path().join("文件.txt").is_file());

    let (status, _, body) = run(&h, request("GET", "/%E6%96%87%E4%BB%B6.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(std::str::from_utf8(&body).unwrap(), "你好");

    let (_, _, body) = run(&h, request("PROPFIND", "/")).await;
    let xml = std::str::from_utf8(&body).unwrap();
    assert!(xml.contains("<d:href>/文件.txt</d:href>"), "{xml}");
}
