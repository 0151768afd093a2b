use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use crate::server::router;
use crate::state::testing::{mock_session, test_state, test_state_with_overrides, MockBehavior};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn asndb_crud_round_trip() {
    let (state, _guard) = test_state_with_overrides();
    let app = router(state);

    // PUT
    let response = app
        .clone()
        .oneshot(put_json("/asndb/AS15169", r#"{"name":"Google LLC"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["asn"], "AS15169");
    assert_eq!(value["name"], "Google LLC");

    // GET one
    let response = app.clone().oneshot(get("/asndb/AS15169")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Google LLC");

    // GET list
    let response = app.clone().oneshot(get("/asndb/")).await.unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // DELETE, then GET is 404
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/asndb/AS15169")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/asndb/AS15169")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn asndb_put_validates_its_input() {
    let (state, _guard) = test_state_with_overrides();
    let app = router(state);

    // wrong content type
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/asndb/AS1")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(r#"{"name":"x"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // empty name
    let response = app
        .clone()
        .oneshot(put_json("/asndb/AS1", r#"{"name":""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // malformed ASN id
    let response = app
        .clone()
        .oneshot(put_json("/asndb/15169", r#"{"name":"Google"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // malformed body
    let response = app
        .clone()
        .oneshot(put_json("/asndb/AS1", "{"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn asndb_disabled_answers_406() {
    let (state, _guard) = test_state(5);
    let app = router(state);

    let response = app.clone().oneshot(get("/asndb/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let response = app
        .oneshot(put_json("/asndb/AS1", r#"{"name":"x"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn agents_listing_merges_offline_records() {
    let (state, _guard) = test_state(5);

    // three directory records, one of them live
    for serial in ["1", "2", "3"] {
        let serial = serial.parse().unwrap();
        state.directory.get_or_create(&serial, "probe").unwrap();
    }
    let (session, _srv) = mock_session("1", "203.0.113.9:41000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let app = router(state);
    let response = app.oneshot(get("/agents/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = body_json(response).await;
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    let live: Vec<_> = rows.iter().filter(|r| r["Connected"] == true).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["Serial"], "1");
    assert_eq!(live[0]["Agent"], "203.0.113.0");
    assert_ne!(live[0]["FirstOnline"], "");

    let offline: Vec<_> = rows.iter().filter(|r| r["Connected"] == false).collect();
    assert_eq!(offline.len(), 2);
}

#[tokio::test]
async fn single_agent_lookup() {
    let (state, _guard) = test_state(5);
    let (session, _srv) = mock_session("12345", "203.0.113.7:41000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let app = router(state);

    let response = app.clone().oneshot(get("/agents/12345/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["Name"], "probe-12345");
    assert_eq!(value["Connected"], true);

    // unknown serial: 404 with no body
    let response = app.clone().oneshot(get("/agents/99999/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());

    // unparsable serial is also not found
    let response = app.oneshot(get("/agents/not-a-serial/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn probe_endpoints_reject_malformed_json() {
    let (state, _guard) = test_state(5);
    let app = router(state);

    for uri in ["/dns/", "/curl/", "/mtr/"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn malformed_lookup_urls_are_bad_requests() {
    let (state, _guard) = test_state_with_overrides();
    let app = router(state);

    for uri in [
        "/asnlookup/",
        "/asnlookup/mac/1.2.3.4",
        "/asnlookup/asn",
        "/asnlookup/ip/",
        "/asnlookup/asn/AS1/extra",
        "/asndb/AS1/extra",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(
            bytes.starts_with(b"Bad Request"),
            "{uri} body: {:?}",
            String::from_utf8_lossy(&bytes)
        );
    }

    // a plainly unknown path is still a 404
    let response = app.oneshot(get("/bogus/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repopulate_answers_done() {
    let (state, _guard) = test_state(5);
    let app = router(state);

    let response = app.oneshot(get("/repopulate/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"DONE");
}

#[tokio::test]
async fn dispatch_through_the_api_returns_probe_results() {
    let (state, _guard) = test_state(5);
    let (session, _srv) = mock_session("100", "203.0.113.5:41000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let app = router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/curl/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"Path":"/","Endpoint":"example.com","Host":"example.com","Ssl":true}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = body_json(response).await;
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Id"], "100");
    assert_eq!(rows[0]["Type"], "CurlResult");
    assert_eq!(rows[0]["Result"]["Status"], 200);
    assert_eq!(rows[0]["Agent"], "203.0.113.0");
}
