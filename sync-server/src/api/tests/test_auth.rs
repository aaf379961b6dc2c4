use super::*;

#[tokio::test]
async fn test_health_is_public() {
    let state = create_test_state();
    let (status, body) = send(&state, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["node_id"], state.config.server_node_id.as_str());
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let state = create_test_state();
    let (status, body) = send(&state, request("GET", "/api/orders", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let state = create_test_state();
    let (status, _) = send(
        &state,
        request("GET", "/api/orders", Some("not-a-jwt"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tenant_header_must_match_token() {
    let state = create_test_state();
    let waiter = token(&state, "waiter-1", Role::Waiter);

    let mut req = request("GET", "/api/orders", Some(&waiter), None);
    req.headers_mut()
        .insert(crate::auth::TENANT_HEADER, "tenant-2".parse().unwrap());
    let (status, body) = send(&state, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 3001);

    let mut req = request("GET", "/api/orders", Some(&waiter), None);
    req.headers_mut()
        .insert(crate::auth::TENANT_HEADER, TENANT.parse().unwrap());
    let (status, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_hub_rejects_bad_token_before_upgrade() {
    let state = create_test_state();
    let (status, body) = send(&state, upgrade_request("/hub/notifications?token=nope")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::TokenInvalid.code());

    let (status, _) = send(&state, upgrade_request("/hub/notifications")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn upgrade_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let state = create_test_state();
    let response = build_app(state)
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
