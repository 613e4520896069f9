use text_url_preview::{
    Fetcher, FetcherConfig, MetadataFetcher, PreviewError, ResolvedPreview, UrlValidationConfig,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {status}\r\nConnection: close\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

fn html(body: &str) -> String {
    let length = body.len().to_string();
    response(
        "200 OK",
        &[("Content-Type", "text/html; charset=utf-8"), ("Content-Length", length.as_str())],
        body,
    )
}

/// Serves canned responses keyed by request path until the test ends.
/// Returns the base URL, e.g. `http://127.0.0.1:41234`.
async fn serve(routes: Vec<(&'static str, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let reply = routes
                    .iter()
                    .find(|(route, _)| *route == path)
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| response("404 Not Found", &[("Content-Length", "0")], ""));

                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    base
}

fn local_fetcher(max_content_size: u64) -> Fetcher {
    Fetcher::new_with_config(FetcherConfig {
        url_validation: UrlValidationConfig::permissive(),
        max_content_size,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_image_response_is_its_own_preview() {
    let base = serve(vec![(
        "/photo.png",
        response(
            "200 OK",
            &[("Content-Type", "image/png"), ("Content-Length", "4")],
            "PNG!",
        ),
    )])
    .await;
    let url = format!("{base}/photo.png");

    let data = local_fetcher(1024).fetch(&url).await.unwrap();

    assert_eq!(data.media_type.as_deref(), Some("image"));
    assert_eq!(data.images, vec![url.clone()]);
    assert_eq!(ResolvedPreview::from_metadata(&data).image, Some(url));
}

#[tokio::test]
async fn test_error_statuses_are_mapped() {
    let base = serve(vec![(
        "/broken",
        response("503 Service Unavailable", &[("Content-Length", "0")], ""),
    )])
    .await;
    let fetcher = local_fetcher(1024);

    assert!(matches!(
        fetcher.fetch(&format!("{base}/missing")).await,
        Err(PreviewError::NotFound(_))
    ));
    assert!(matches!(
        fetcher.fetch(&format!("{base}/broken")).await,
        Err(PreviewError::ServerError { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let base = serve(vec![(
        "/notes.txt",
        response(
            "200 OK",
            &[("Content-Type", "text/plain"), ("Content-Length", "5")],
            "notes",
        ),
    )])
    .await;

    assert!(matches!(
        local_fetcher(1024).fetch(&format!("{base}/notes.txt")).await,
        Err(PreviewError::InvalidContentType(kind)) if kind == "text/plain"
    ));
}

#[tokio::test]
async fn test_declared_length_over_limit() {
    let body = "x".repeat(200);
    let base = serve(vec![("/big", html(&body))]).await;

    assert!(matches!(
        local_fetcher(64).fetch(&format!("{base}/big")).await,
        Err(PreviewError::ContentTooLarge(200))
    ));
}

#[tokio::test]
async fn test_undeclared_length_is_still_bounded() {
    let body = format!("<html><body>{}</body></html>", "x".repeat(4096));
    let base = serve(vec![(
        "/stream",
        response("200 OK", &[("Content-Type", "text/html")], &body),
    )])
    .await;

    assert!(matches!(
        local_fetcher(64).fetch(&format!("{base}/stream")).await,
        Err(PreviewError::ContentTooLarge(size)) if size > 64
    ));
}

#[tokio::test]
async fn test_relative_links_resolve_against_redirect_target() {
    let page = r#"<html><head>
        <title>Post</title>
        <meta property="og:image" content="cover.png">
        </head></html>"#;
    let base = serve(vec![
        (
            "/old",
            response(
                "301 Moved Permanently",
                &[("Location", "/blog/post/"), ("Content-Length", "0")],
                "",
            ),
        ),
        ("/blog/post/", html(page)),
    ])
    .await;

    let data = local_fetcher(1024 * 1024)
        .fetch(&format!("{base}/old"))
        .await
        .unwrap();

    assert_eq!(data.url, Some(format!("{base}/blog/post/")));
    assert_eq!(data.title.as_deref(), Some("Post"));
    assert_eq!(data.images, vec![format!("{base}/blog/post/cover.png")]);
    assert_eq!(data.favicons, vec![format!("{base}/favicon.ico")]);
}

#[tokio::test]
async fn test_redirects_are_validated() {
    let base = serve(vec![(
        "/hop",
        response(
            "302 Found",
            &[("Location", "http://blocked.test/landing"), ("Content-Length", "0")],
            "",
        ),
    )])
    .await;
    let fetcher = Fetcher::new_with_config(FetcherConfig {
        url_validation: UrlValidationConfig::permissive().with_blocked_domain("blocked.test"),
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(
        fetcher.fetch(&format!("{base}/hop")).await,
        Err(PreviewError::DomainBlocked(host)) if host == "blocked.test"
    ));
}

#[tokio::test]
async fn test_redirect_limit() {
    let base = serve(vec![(
        "/loop",
        response(
            "302 Found",
            &[("Location", "/loop"), ("Content-Length", "0")],
            "",
        ),
    )])
    .await;
    let fetcher = Fetcher::new_with_config(FetcherConfig {
        url_validation: UrlValidationConfig::permissive(),
        max_redirects: 2,
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(
        fetcher.fetch(&format!("{base}/loop")).await,
        Err(PreviewError::FetchError(msg)) if msg.contains("too many redirects")
    ));
}
