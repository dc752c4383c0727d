use std::time::Duration;

use cas_logout_hook::http::encode_form;
use cas_logout_hook::{HttpClient, HttpError, ReqwestHttpClient};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn post_sends_form_content_type_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authentication/logout"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200).set_body_string("bye"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new(&server.uri(), None).unwrap();
    let response = client.post("/api/authentication/logout", None).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "bye");
}

#[tokio::test]
async fn post_forwards_encoded_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(body_string("service=https%3A%2F%2Fsonar.example.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new(&server.uri(), None).unwrap();
    let form = encode_form(&[("service", "https://sonar.example.com")]);
    assert!(client.post("/form", Some(form)).await.is_ok());
}

#[tokio::test]
async fn not_modified_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new(&server.uri(), None).unwrap();
    assert_eq!(client.get("/cached").await.unwrap().status, 304);
}

#[tokio::test]
async fn statuses_map_to_error_kinds() {
    let server = MockServer::start().await;
    for (route, status) in [("/denied", 403), ("/broken", 500), ("/empty", 204)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let client = ReqwestHttpClient::new(&server.uri(), None).unwrap();
    assert_eq!(
        client.get("/denied").await,
        Err(HttpError::Client { status: 403 })
    );
    assert_eq!(
        client.get("/broken").await,
        Err(HttpError::Server { status: 500 })
    );
    assert_eq!(
        client.get("/empty").await,
        Err(HttpError::UnexpectedStatus { status: 204 })
    );
}

#[tokio::test]
async fn slow_server_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/authentication/logout"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new(&server.uri(), Some(Duration::from_millis(100))).unwrap();
    let error = client
        .post("/api/authentication/logout", None)
        .await
        .unwrap_err();
    assert!(matches!(error, HttpError::Network(_)));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Port 9 (discard) on localhost is closed in test environments
    let client = ReqwestHttpClient::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
    assert!(matches!(
        client.get("/").await,
        Err(HttpError::Network(_))
    ));
}
