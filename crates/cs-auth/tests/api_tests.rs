//! Auth API Integration Tests
//!
//! Drives the assembled router with in-memory storage.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{error_code, error_message, TestApp, PASSWORD};
use cs_auth::{PrincipalStore, Role, TokenKind};

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_returns_token_pair() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let (status, body) = app.login("coach@example.com", PASSWORD).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["expires_in"], 900);
        assert_eq!(body["data"]["principal"]["id"], principal.id.to_string());
        assert_eq!(body["data"]["principal"]["role"], "team_member");
        assert!(body["data"]["principal"].get("password_hash").is_none());
        assert!(body["data"]["principal"]["last_login_at"].is_string());

        let access = body["data"]["access_token"].as_str().unwrap();
        let refresh = body["data"]["refresh_token"].as_str().unwrap();
        let claims = app.tokens.validate_kind(access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, principal.id);
        assert!(app.tokens.validate_kind(refresh, TokenKind::Refresh).is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized_without_tokens() {
        let app = TestApp::new();
        app.seed("coach@example.com", Role::TeamMember, None).await;

        let (status, body) = app.login("coach@example.com", "not-the-password").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(error_code(&body), "UNAUTHORIZED");
        assert_eq!(error_message(&body), "invalid email or password");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_unknown_email_matches_wrong_password() {
        let app = TestApp::new();
        app.seed("coach@example.com", Role::TeamMember, None).await;

        let (unknown_status, unknown) = app.login("nobody@example.com", PASSWORD).await;
        let (wrong_status, wrong) = app.login("coach@example.com", "not-the-password").await;

        assert_eq!(unknown_status, wrong_status);
        assert_eq!(unknown, wrong);
    }

    #[tokio::test]
    async fn test_inactive_account_is_forbidden() {
        let app = TestApp::new();
        let mut principal = app.seed("gone@example.com", Role::TeamMember, None).await;
        principal.deactivate();
        app.store.update(&principal).await.unwrap();

        let (status, body) = app.login("gone@example.com", PASSWORD).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "account is inactive");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = app.send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "BAD_REQUEST");
        assert_eq!(error_message(&body), "invalid request data");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let app = TestApp::new();

        let (status, body) = app
            .post_json(
                "/api/v1/auth/register",
                json!({ "email": "rookie@example.com", "password": "rookie-pass", "full_name": "Rookie" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["role"], "public");
        assert_eq!(body["data"]["status"], "active");

        let (status, _) = app.login("rookie@example.com", "rookie-pass").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .post_json(
                "/api/v1/auth/register",
                json!({ "email": "rookie@example.com", "password": "rookie-pass", "full_name": "Again" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "email already registered");
    }
}

mod authentication_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_header() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/v1/auth/me", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "authorization required");
    }

    #[tokio::test]
    async fn test_wrong_scheme() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/v1/auth/me", Some("Basic dXNlcjpwYXNz")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "invalid header format");
    }

    #[tokio::test]
    async fn test_me_returns_current_principal() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let (status, body) = app.get_as("/api/v1/auth/me", &principal).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "coach@example.com");
    }

    #[tokio::test]
    async fn test_tampered_token() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let token = app.access_token(&principal);
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        let i = chars.len() / 2;
        chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
        let tampered = format!("Bearer {}.{}", head, chars.into_iter().collect::<String>());

        let (status, body) = app.get("/api/v1/auth/me", Some(&tampered)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "invalid or expired token");
    }

    #[tokio::test]
    async fn test_expired_token() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let mut claims = app.tokens.validate(&app.access_token(&principal)).unwrap();
        claims.iat = (Utc::now() - Duration::hours(1)).timestamp();
        claims.nbf = claims.iat;
        claims.exp = claims.iat + 900;
        let token = app.sign(&claims);
        let (status, body) = app.get("/api/v1/auth/me", Some(&format!("Bearer {}", token))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "invalid or expired token");
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let refresh = app.tokens.issue_refresh(&principal).unwrap();
        let (status, _) = app.get("/api/v1/auth/me", Some(&format!("Bearer {}", refresh))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_after_issue_is_forbidden() {
        let app = TestApp::new();
        let mut principal = app.seed("coach@example.com", Role::TeamMember, None).await;
        let bearer = format!("Bearer {}", app.access_token(&principal));

        principal.deactivate();
        app.store.update(&principal).await.unwrap();

        let (status, body) = app.get("/api/v1/auth/me", Some(&bearer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "account is inactive");
    }

    #[tokio::test]
    async fn test_deleted_principal() {
        let app = TestApp::new();
        let ghost = cs_auth::Principal::new("ghost@example.com", "Ghost", Role::SuperAdmin);

        let (status, body) = app.get_as("/api/v1/auth/me", &ghost).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(&body), "user not found");
    }
}

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_uses_current_role() {
        let app = TestApp::new();
        let mut principal = app.seed("coach@example.com", Role::TeamMember, None).await;
        let (_, body) = app.login("coach@example.com", PASSWORD).await;
        let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

        principal.set_role(Role::SuperAdmin);
        app.store.update(&principal).await.unwrap();

        let (status, body) = app
            .post_json("/api/v1/auth/refresh", json!({ "refresh_token": refresh }))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["expires_in"], 900);
        let access = body["data"]["access_token"].as_str().unwrap();
        let claims = app.tokens.validate(access).unwrap();
        assert_eq!(claims.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn test_refresh_with_access_token_fails() {
        let app = TestApp::new();
        let principal = app.seed("coach@example.com", Role::TeamMember, None).await;

        let (status, _) = app
            .post_json(
                "/api/v1/auth/refresh",
                json!({ "refresh_token": app.access_token(&principal) }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_requires_token() {
        let app = TestApp::new();
        let (status, body) = app.post_json("/api/v1/auth/refresh", json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(&body), "refresh token required");
    }
}

mod authorization_tests {
    use super::*;

    #[tokio::test]
    async fn test_org_admin_reads_own_organization() {
        let app = TestApp::new();
        let org = Uuid::new_v4();
        let admin = app.seed("admin@club.example", Role::OrgAdmin, Some(org)).await;
        app.seed("player@club.example", Role::TeamMember, Some(org)).await;
        app.seed("other@rival.example", Role::TeamMember, Some(Uuid::new_v4())).await;

        let (status, body) = app
            .get_as(&format!("/api/v1/organizations/{}/users", org), &admin)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 2);
    }

    #[tokio::test]
    async fn test_org_admin_denied_other_organization() {
        let app = TestApp::new();
        let admin = app.seed("admin@club.example", Role::OrgAdmin, Some(Uuid::new_v4())).await;

        let (status, body) = app
            .get_as(&format!("/api/v1/organizations/{}/users", Uuid::new_v4()), &admin)
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "FORBIDDEN");
        assert_eq!(error_message(&body), "access denied to this organization");
    }

    #[tokio::test]
    async fn test_team_member_fails_role_check_first() {
        let app = TestApp::new();
        let org = Uuid::new_v4();
        let member = app.seed("player@club.example", Role::TeamMember, Some(org)).await;

        let (status, body) = app
            .get_as(&format!("/api/v1/organizations/{}/users", org), &member)
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "insufficient permissions");
    }

    #[tokio::test]
    async fn test_super_admin_reads_any_organization() {
        let app = TestApp::new();
        let root = app.seed("root@example.com", Role::SuperAdmin, None).await;

        let (status, body) = app
            .get_as(&format!("/api/v1/organizations/{}/users", Uuid::new_v4()), &root)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 0);
    }

    #[tokio::test]
    async fn test_admin_user_lookup() {
        let app = TestApp::new();
        let root = app.seed("root@example.com", Role::SuperAdmin, None).await;
        let player = app.seed("player@example.com", Role::TeamMember, None).await;

        let (status, body) = app
            .get_as(&format!("/api/v1/admin/users/{}", player.id), &root)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "player@example.com");

        let (status, body) = app
            .get_as(&format!("/api/v1/admin/users/{}", Uuid::new_v4()), &root)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_code(&body), "NOT_FOUND");

        let (status, _) = app
            .get_as(&format!("/api/v1/admin/users/{}", root.id), &player)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_path_id_uses_envelope() {
        let app = TestApp::new();
        let root = app.seed("root@example.com", Role::SuperAdmin, None).await;

        let (status, body) = app.get_as("/api/v1/admin/users/not-a-uuid", &root).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(error_code(&body), "BAD_REQUEST");
        assert_eq!(error_message(&body), "invalid path parameter");

        let (status, body) = app
            .get_as("/api/v1/organizations/not-a-uuid/users", &root)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_access_with_old_token() {
        let app = TestApp::new();
        let mut root = app.seed("root@example.com", Role::SuperAdmin, None).await;
        let bearer = format!("Bearer {}", app.access_token(&root));

        root.set_role(Role::Public);
        app.store.update(&root).await.unwrap();

        let (status, body) = app
            .get(&format!("/api/v1/admin/users/{}", root.id), Some(&bearer))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_message(&body), "insufficient permissions");
    }
}

mod service_tests {
    use super::*;
    use common::STORE_FAILURE;

    #[tokio::test]
    async fn test_store_failure_hides_cause() {
        let app = TestApp::with_broken_store();
        let principal = cs_auth::Principal::new("coach@example.com", "Coach", Role::TeamMember);

        let (status, body) = app.get_as("/api/v1/auth/me", &principal).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(error_code(&body), "INTERNAL_ERROR");
        assert_eq!(error_message(&body), "internal server error");
        assert!(!body.to_string().contains(STORE_FAILURE));

        let (status, body) = app.login("coach@example.com", PASSWORD).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_message(&body), "internal server error");
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.get("/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy", "service": "courtside" }));
    }

    #[test]
    fn test_openapi_lists_routes() {
        let app = TestApp::new();

        let state = cs_auth::AppState::new(
            app.store.clone(),
            app.credentials.clone(),
            app.tokens.clone(),
            std::time::Duration::from_secs(1),
        );
        let (_, openapi) = cs_auth::api_router(state);

        for path in [
            "/health",
            "/api/v1/auth/login",
            "/api/v1/auth/refresh",
            "/api/v1/auth/register",
            "/api/v1/auth/me",
            "/api/v1/admin/users/{id}",
            "/api/v1/organizations/{organization_id}/users",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
