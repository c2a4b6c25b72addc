// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! End-to-end tests against a local mock server

use std::time::Duration;

use volley::transport::code;
use volley::{Error, ErrorKind, HttpClient, Request, TransferOptions};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_basic_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .and(query_param("name", "volley"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Greeting", "hi")
                .set_body_string("hello volley"),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let req = client
        .get(&format!("{}/hello", server.uri()), &[("name", "volley")], None)
        .await
        .unwrap();

    assert_eq!(req.status().unwrap(), 200);
    assert_eq!(req.text().unwrap(), "hello volley");
    assert_eq!(req.response_headers().unwrap().first("x-greeting"), Some("hi"));
    assert!(req.status_line().unwrap().unwrap().starts_with("HTTP/1.1 200"));

    let info = req.info().unwrap();
    assert_eq!(info.redirect_count, 0);
    assert_eq!(info.size_download, 12);
    assert!(info.request_header.as_deref().unwrap().starts_with("GET /hello?name=volley"));
}

#[tokio::test]
async fn test_redirect_exposes_final_hop() {
    let server = MockServer::start().await;
    Mock::given(path("/start"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/middle")
                .insert_header("X-Hop", "start"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/middle"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/end"))
        .mount(&server)
        .await;
    Mock::given(path("/end"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Final", "yes")
                .set_body_string("arrived"),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let mut req = Request::get(format!("{}/start", server.uri()));
    client.submit(&mut req).await.unwrap();

    assert_eq!(req.status().unwrap(), 200);
    assert_eq!(req.text().unwrap(), "arrived");
    let headers = req.response_headers().unwrap();
    assert_eq!(headers.first("X-Final"), Some("yes"));
    assert!(!headers.contains("X-Hop"));
    assert!(!headers.contains("Location"));

    let info = req.info().unwrap();
    assert_eq!(info.redirect_count, 2);
    assert_eq!(info.effective_url, format!("{}/end", server.uri()));
}

#[tokio::test]
async fn test_post_see_other_switches_to_get() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/done"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/done"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let req = client
        .post_form(&format!("{}/submit", server.uri()), &[("a", "1")], None)
        .await
        .unwrap();
    assert_eq!(req.text().unwrap(), "thanks");
}

#[tokio::test]
async fn test_redirect_limit() {
    let server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let options = TransferOptions {
        max_redirects: Some(2),
        ..Default::default()
    };
    let mut req = Request::get(format!("{}/loop", server.uri())).option(&options);
    let err = client.submit(&mut req).await.unwrap_err();

    assert_eq!(err.as_transfer().unwrap().code, code::TOO_MANY_REDIRECTS);
    assert_eq!(err.kind(), Some(ErrorKind::Generic));
    assert_eq!(req.transport_code().unwrap(), code::TOO_MANY_REDIRECTS);
}

#[tokio::test]
async fn test_batch_with_unreachable_port() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .mount(&server)
        .await;

    let dead = format!("http://127.0.0.1:{}/", unused_port());
    let mut batch = vec![
        Request::get(format!("{}/a", server.uri())),
        Request::get(dead.clone()),
        Request::get(format!("{}/b", server.uri())),
        Request::get(format!("{}/c", server.uri())),
    ];

    let client = HttpClient::new();
    client.submit_all(&mut batch).await.unwrap();

    assert!(batch.iter().all(Request::was_submitted));
    let failure = batch[1].failure().unwrap().unwrap();
    assert_eq!(failure.kind, ErrorKind::ConnectFailure);
    assert_eq!(failure.url(), Some(dead.as_str()));
    assert_eq!(batch[1].status().unwrap(), 0);

    for i in [0, 2, 3] {
        assert!(batch[i].failure().unwrap().is_none());
        assert_eq!(batch[i].text().unwrap(), "up");
    }
}

#[tokio::test]
async fn test_strict_status_failure() {
    let server = MockServer::start().await;

    let client = HttpClient::new();
    let url = format!("{}/missing", server.uri());
    let mut req = Request::get(url.clone());
    let err = client.submit(&mut req).await.unwrap_err();

    assert!(err.is_status());
    assert_eq!(err.url(), Some(url.as_str()));
    assert_eq!(req.status().unwrap(), 404);

    // same response, lenient check
    assert!(req.validate(Some(false)).is_ok());
}

#[tokio::test]
async fn test_timeout_is_per_request() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;
    Mock::given(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut batch = vec![
        Request::get(format!("{}/slow", server.uri())).timeout_ms(100),
        Request::get(format!("{}/fast", server.uri())),
    ];
    HttpClient::new().submit_all(&mut batch).await.unwrap();

    assert_eq!(
        batch[0].failure().unwrap().map(|f| f.kind),
        Some(ErrorKind::Timeout)
    );
    assert!(batch[1].failure().unwrap().is_none());
}

#[tokio::test]
async fn test_form_body_is_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("user=alice&note=a+b%26c"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let req = client
        .post_form(
            &format!("{}/form", server.uri()),
            &[("user", "alice"), ("note", "a b&c")],
            None,
        )
        .await
        .unwrap();
    assert_eq!(req.status().unwrap(), 201);
}

#[tokio::test]
async fn test_credentials_are_sent() {
    let server = MockServer::start().await;
    Mock::given(path("/private"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut options = TransferOptions::new();
    options.set("bearer", "t0ken").unwrap();

    let client = HttpClient::new();
    let req = client
        .get(&format!("{}/private", server.uri()), &[], Some(&options))
        .await
        .unwrap();
    assert_eq!(req.status().unwrap(), 200);
}

#[tokio::test]
async fn test_cookie_jar_persists() {
    let server = MockServer::start().await;
    Mock::given(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "sid=abc123; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/me"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alice"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("cookies.txt");
    let client = HttpClient::new();

    let mut login = Request::get(format!("{}/login", server.uri())).cookie_jar(&jar);
    client.submit(&mut login).await.unwrap();
    let cookies = login.set_cookies().unwrap();
    assert_eq!(cookies[0].name, "sid");

    let contents = std::fs::read_to_string(&jar).unwrap();
    assert!(contents.contains("#HttpOnly_"));
    assert!(contents.contains("sid\tabc123"));

    let mut me = Request::get(format!("{}/me", server.uri())).cookie_jar(&jar);
    client.submit(&mut me).await.unwrap();
    assert_eq!(me.text().unwrap(), "alice");
}

#[tokio::test]
async fn test_resubmission_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("once"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let mut req = Request::get(server.uri());
    client.submit(&mut req).await.unwrap();

    let err = client.submit(&mut req).await.unwrap_err();
    assert!(matches!(err, Error::AlreadySubmitted(_)));
    assert_eq!(req.text().unwrap(), "once");
}
