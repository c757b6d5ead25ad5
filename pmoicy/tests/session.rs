//! Session negotiation against a mock Icecast server

use pmoicy::{connect, Error, FramingError, IcyClient, IcyConfig};
use tokio::io::AsyncReadExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `AAAAAAAA` + one `title='x';` block + `BBBBBBBB` + empty block
fn interleaved_body() -> Vec<u8> {
    let mut body = b"AAAAAAAA".to_vec();
    body.push(0x01);
    body.extend_from_slice(b"title='x';");
    body.extend_from_slice(&[0; 6]);
    body.extend_from_slice(b"BBBBBBBB");
    body.push(0x00);
    body
}

async fn icecast_server(metaint: &str) -> MockServer {
    let server = MockServer::start().await;

    // clients asking for metadata get the interleaved body
    Mock::given(method("GET"))
        .and(path("/stream"))
        .and(header("icy-metadata", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("icy-name", "Mock Radio")
                .insert_header("icy-br", "128")
                .insert_header("icy-metaint", metaint)
                .set_body_bytes(interleaved_body()),
        )
        .with_priority(1)
        .mount(&server)
        .await;

    // everyone else gets plain audio
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("icy-name", "Mock Radio")
                .set_body_bytes(b"plain audio bytes".to_vec()),
        )
        .with_priority(2)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_metadata_negotiated() {
    let server = icecast_server("8").await;
    let client = IcyClient::builder().metadata(true).build().unwrap();

    let mut session = client
        .connect(&format!("{}/stream", server.uri()))
        .await
        .unwrap();

    assert_eq!(session.metaint(), Some(8));
    assert_eq!(session.icy().name.as_deref(), Some("Mock Radio"));
    assert_eq!(session.icy().bitrate, Some(128));
    assert_eq!(
        session.request_headers().get("icy-metadata").unwrap(),
        "1"
    );

    let mut metadata = session.take_metadata().expect("metadata receiver");
    let mut audio = Vec::new();
    session.read_to_end(&mut audio).await.unwrap();

    assert_eq!(audio, b"AAAAAAAABBBBBBBB");
    let snapshot = metadata.recv().await.unwrap();
    assert_eq!(snapshot.get("title"), Some("x"));
    assert_eq!(snapshot.len(), 1);

    session.close();
    assert_eq!(metadata.recv().await, None);
}

#[tokio::test]
async fn test_metadata_not_requested_passes_body_through() {
    let server = icecast_server("8").await;
    let client = IcyClient::new().unwrap();

    let mut session = client
        .connect(&format!("{}/stream", server.uri()))
        .await
        .unwrap();

    assert_eq!(session.metaint(), None);
    assert!(session.metadata().is_none());

    let mut audio = Vec::new();
    session.read_to_end(&mut audio).await.unwrap();
    assert_eq!(audio, b"plain audio bytes");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("icy-metadata"));
}

#[tokio::test]
async fn test_requested_but_not_offered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw".to_vec()))
        .mount(&server)
        .await;

    let mut session = connect(&server.uri(), &IcyConfig::with_metadata())
        .await
        .unwrap();

    assert_eq!(session.metaint(), None);
    assert!(session.take_metadata().is_none());
    assert!(session.icy().is_empty());

    let mut audio = Vec::new();
    session.read_to_end(&mut audio).await.unwrap();
    assert_eq!(audio, b"raw");
}

#[tokio::test]
async fn test_invalid_metaint_fails_negotiation() {
    for bad in ["0", "abc", "-16", "100000000000000"] {
        let server = icecast_server(bad).await;
        let result = connect(&format!("{}/stream", server.uri()), &IcyConfig::with_metadata()).await;

        match result {
            Err(Error::InvalidMetaint(value)) => assert_eq!(value, bad),
            other => panic!("metaint {bad:?}: expected InvalidMetaint, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_invalid_metaint_ignored_without_metadata() {
    // the header is only interpreted when metadata was asked for
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("icy-metaint", "abc")
                .set_body_bytes(b"raw".to_vec()),
        )
        .mount(&server)
        .await;

    let session = connect(&server.uri(), &IcyConfig::default()).await.unwrap();
    assert_eq!(session.metaint(), None);
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = connect(&format!("{}/missing", server.uri()), &IcyConfig::default()).await;
    assert!(matches!(
        result,
        Err(Error::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_connection_refused() {
    // bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = connect(&format!("http://{addr}/stream"), &IcyConfig::default()).await;
    assert!(matches!(result, Err(Error::Http(_))));
}

#[tokio::test]
async fn test_truncated_stream_surfaces_framing_error() {
    let server = MockServer::start().await;
    let mut body = b"AAAAAAAA".to_vec();
    body.push(0x02);
    body.extend_from_slice(b"StreamTitle='cut");

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("icy-metaint", "8")
                .set_body_bytes(body),
        )
        .mount(&server)
        .await;

    let mut session = connect(&server.uri(), &IcyConfig::with_metadata())
        .await
        .unwrap();

    let mut audio = Vec::new();
    let err = session.read_to_end(&mut audio).await.unwrap_err();
    assert!(audio.is_empty());
    assert!(matches!(
        Error::from_read_error(err),
        Error::Framing(FramingError::TruncatedMetadata {
            expected: 32,
            received: 16
        })
    ));
}
