//! Router tests for login, token refresh and the admin gates.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::TimeDelta;

use common::{
    ADMIN_EMAIL, ADMIN_SESSION, FakeAdmins, FakeIdentity, LEGACY_EMAIL, LEGACY_SECRET,
    LOGIN_PASSWORD, LOGIN_USERNAME, SHOPPER_EMAIL, SHOPPER_SESSION, TestAppBuilder, bearer,
    get, get_with, login_request, login_request_with, test_app,
};

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_issues_verifiable_token() {
    let app = test_app();

    let (status, body) = app
        .send(login_request(LOGIN_USERNAME, LOGIN_PASSWORD, "203.0.113.1"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], LOGIN_USERNAME);
    assert_eq!(body["user"]["email"], LEGACY_EMAIL);
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["legacySessionToken"], LEGACY_SECRET);

    let token = body["token"].as_str().unwrap();
    let claims = app.state.tokens().verify(token).unwrap();
    assert_eq!(claims.sub, LOGIN_USERNAME);
}

#[tokio::test]
async fn test_login_wrong_password_is_401() {
    let app = test_app();
    let (status, body) = app
        .send(login_request(LOGIN_USERNAME, "nope", "203.0.113.1"))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_login_missing_fields_is_400() {
    let app = test_app();
    let (status, _) = app.send(login_request("", "", "203.0.113.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rate_limit() {
    let app = TestAppBuilder::default()
        .login_limit(5, Duration::from_millis(300))
        .build();

    for _ in 0..5 {
        let (status, _) = app
            .send(login_request(LOGIN_USERNAME, "wrong", "198.51.100.7"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Sixth attempt is rejected before credentials are compared, even if correct.
    let (status, body) = app
        .send(login_request(LOGIN_USERNAME, LOGIN_PASSWORD, "198.51.100.7"))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "too many login attempts; try again later");

    // Other clients are unaffected.
    let (status, _) = app
        .send(login_request(LOGIN_USERNAME, LOGIN_PASSWORD, "198.51.100.8"))
        .await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let (status, _) = app
        .send(login_request(LOGIN_USERNAME, LOGIN_PASSWORD, "198.51.100.7"))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarding_headers_share_one_budget() {
    let app = TestAppBuilder::default()
        .login_limit(5, Duration::from_secs(60))
        .build();

    for i in 0..5 {
        let spoofed = format!("203.0.113.{i}");
        let (status, _) = app
            .send(login_request_with(
                LOGIN_USERNAME,
                "wrong",
                &[
                    ("fly-client-ip", "198.51.100.30"),
                    ("x-forwarded-for", spoofed.as_str()),
                    ("cf-connecting-ip", spoofed.as_str()),
                    ("x-real-ip", spoofed.as_str()),
                ],
            ))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app
        .send(login_request_with(
            LOGIN_USERNAME,
            "wrong",
            &[
                ("fly-client-ip", "198.51.100.30"),
                ("x-forwarded-for", "203.0.113.99"),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_untrusted_headers_alone_do_not_create_new_clients() {
    let app = TestAppBuilder::default()
        .login_limit(3, Duration::from_secs(60))
        .build();

    let mut statuses = Vec::new();
    for i in 0..10 {
        let spoofed = format!("203.0.113.{i}");
        let (status, _) = app
            .send(login_request_with(
                LOGIN_USERNAME,
                "wrong",
                &[("x-forwarded-for", spoofed.as_str()), ("cf-connecting-ip", spoofed.as_str())],
            ))
            .await;
        statuses.push(status);
    }

    let reached_check = statuses
        .iter()
        .filter(|s| **s == StatusCode::UNAUTHORIZED)
        .count();
    assert_eq!(reached_check, 3);
    assert!(statuses[3..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_successful_login_resets_attempts() {
    let app = TestAppBuilder::default()
        .login_limit(2, Duration::from_secs(60))
        .build();

    let (status, _) = app
        .send(login_request(LOGIN_USERNAME, "wrong", "192.0.2.4"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(login_request(LOGIN_USERNAME, LOGIN_PASSWORD, "192.0.2.4"))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Budget is back to two failures.
    for _ in 0..2 {
        let (status, _) = app
            .send(login_request(LOGIN_USERNAME, "wrong", "192.0.2.4"))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = app
        .send(login_request(LOGIN_USERNAME, "wrong", "192.0.2.4"))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// Token gate
// =============================================================================

#[tokio::test]
async fn test_no_token_is_401() {
    let app = test_app();
    let (status, body) = app.send(get("/admin/auth/refresh")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_bad_token_is_401() {
    let app = test_app();
    let (status, body) = app.send(bearer("/admin/auth/refresh", "garbage")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let app = test_app();
    let token = app.token_with_lifetime(TimeDelta::seconds(-1));
    let (status, _) = app.send(bearer("/admin/auth/refresh", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_header_wins_over_session_header() {
    let app = test_app();
    let token = app.token();

    let request = axum::http::Request::get("/admin/auth/refresh")
        .header("authorization", format!("Bearer {token}"))
        .header("x-admin-session", "garbage")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["source"], "jwt");
}

#[tokio::test]
async fn test_session_header_alone_is_accepted() {
    let app = test_app();
    let token = app.token();
    let (status, body) = app
        .send(get_with("/admin/auth/refresh", "x-admin-session", &token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn test_legacy_secret_yields_legacy_context() {
    let app = test_app();
    let (status, body) = app
        .send(get_with("/admin/auth/refresh", "x-admin-session", LEGACY_SECRET))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], "legacy-admin");
    assert_eq!(body["user"]["email"], LEGACY_EMAIL);
    assert_eq!(body["user"]["source"], "legacy");
    assert_eq!(body["shouldRefresh"], false);
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_session_status_reports_refresh_window() {
    let app = test_app();

    let short = app.token_with_lifetime(TimeDelta::minutes(30));
    let (_, body) = app.send(bearer("/admin/auth/refresh", &short)).await;
    assert_eq!(body["shouldRefresh"], true);

    let long = app.token_with_lifetime(TimeDelta::hours(2));
    let (_, body) = app.send(bearer("/admin/auth/refresh", &long)).await;
    assert_eq!(body["shouldRefresh"], false);
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_refresh_reissues_short_lived_token() {
    let app = test_app();
    let short = app.token_with_lifetime(TimeDelta::minutes(10));

    let request = axum::http::Request::post("/admin/auth/refresh")
        .header("authorization", format!("Bearer {short}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "token refreshed");
    let fresh = body["token"].as_str().unwrap();
    assert_ne!(fresh, short);
    assert!(!app.state.tokens().should_refresh(fresh));
}

#[tokio::test]
async fn test_refresh_keeps_long_lived_token() {
    let app = test_app();
    let token = app.token();

    let request = axum::http::Request::post("/admin/auth/refresh")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (_, body) = app.send(request).await;

    assert_eq!(body["token"], token.as_str());
    assert_eq!(body["message"], "token still valid");
}

#[tokio::test]
async fn test_refresh_legacy_secret_is_not_reissued() {
    let app = test_app();

    let request = axum::http::Request::post("/admin/auth/refresh")
        .header("x-admin-session", LEGACY_SECRET)
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], LEGACY_SECRET);
    assert_eq!(body["message"], "legacy session tokens are not refreshed");
}

// =============================================================================
// Identity gate
// =============================================================================

#[tokio::test]
async fn test_check_role_admin() {
    let app = test_app();
    let (status, body) = app
        .send(get_with("/admin/check-role", "x-stack-access-token", ADMIN_SESSION))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], true);
    assert_eq!(body["userId"], "user-curator");
    assert_eq!(body["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_check_role_non_admin() {
    let app = test_app();
    let (status, body) = app
        .send(get_with("/admin/check-role", "x-stack-access-token", SHOPPER_SESSION))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], false);
    assert_eq!(body["email"], SHOPPER_EMAIL);
}

#[tokio::test]
async fn test_check_role_without_session_is_401() {
    let app = test_app();

    let (status, _) = app.send(get("/admin/check-role")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(get_with("/admin/check-role", "x-stack-access-token", "expired"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_admin_can_list_products() {
    let app = test_app();
    let (status, body) = app
        .send(get_with("/admin/products", "x-stack-access-token", ADMIN_SESSION))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_identity_non_admin_is_403() {
    let app = test_app();
    let (status, body) = app
        .send(get_with("/admin/products", "x-stack-access-token", SHOPPER_SESSION))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "admin access required");
}

#[tokio::test]
async fn test_no_credentials_at_all_is_401() {
    let app = test_app();
    let (status, body) = app.send(get("/admin/products")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_allow_list_failure_fails_closed() {
    let app = TestAppBuilder::default()
        .admins(FakeAdmins::failing())
        .build();
    let (status, _) = app
        .send(get_with("/admin/products", "x-stack-access-token", ADMIN_SESSION))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_identity_provider_outage_is_500() {
    let app = TestAppBuilder::default()
        .identity(Some(FakeIdentity::unreachable()))
        .build();
    let (status, body) = app
        .send(get_with("/admin/products", "x-stack-access-token", ADMIN_SESSION))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal error");
}

#[tokio::test]
async fn test_token_header_selects_token_gate() {
    // A bad admin token is not rescued by a valid identity session.
    let app = test_app();
    let request = axum::http::Request::get("/admin/products")
        .header("authorization", "Bearer garbage")
        .header("x-stack-access-token", ADMIN_SESSION)
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
