//! Lazy profile provisioning and self-service profile tests.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use portal_service::models::UserRole;
use portal_service::services::IdentityProvider;
use portal_service::utils::Password;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_first_login_provisions_profile() {
    let app = TestApp::spawn().await;

    // An identity account with no matching portal profile row.
    let identity_id = Uuid::new_v4();
    app.identity
        .create_account(
            identity_id,
            "orphan@example.com",
            "Orphan Member",
            &Password::new("hunter22".to_string()),
        )
        .await
        .unwrap();

    let (status, body) = app
        .post(
            "/auth/login",
            json!({ "email": "orphan@example.com", "password": "hunter22" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["user_id"], identity_id.to_string());
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["invitation_accepted"], true);
    assert_eq!(body["user"]["full_name"], "Orphan Member");

    // Second login returns the same row unchanged.
    let (status, second) = app
        .post(
            "/auth/login",
            json!({ "email": "orphan@example.com", "password": "hunter22" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["user"]["user_id"], identity_id.to_string());
    assert_eq!(second["user"]["created_at"], body["user"]["created_at"]);
}

#[tokio::test]
async fn test_invalid_credentials_are_unauthorized() {
    let app = TestApp::spawn().await;
    let user = app
        .seed_user("member@example.com", "Member", UserRole::Student, "hunter22")
        .await;

    let (status, _) = app
        .post(
            "/auth/login",
            json!({ "email": user.email, "password": "wrong" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/auth/login",
            json!({ "email": "nobody@example.com", "password": "hunter22" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_response_never_leaks_token() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    app.post(
        "/admin/invitations",
        json!({ "email": "invited@example.com", "fullName": "Invited" }),
        Some(&admin_token),
    )
    .await;

    let (status, users) = app.get("/admin/users", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    for user in users.as_array().unwrap() {
        assert!(user.get("invitation_token").is_none());
    }
}

#[tokio::test]
async fn test_update_own_profile() {
    let app = TestApp::spawn().await;
    let user = app
        .seed_user("member@example.com", "Member", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&user.email, "hunter22").await;

    let (status, body) = app
        .patch(
            "/users/me",
            json!({ "fullName": "Renamed Member" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Renamed Member");

    let (_, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(me["full_name"], "Renamed Member");
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = TestApp::spawn().await;
    let user = app
        .seed_user("member@example.com", "Member", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&user.email, "hunter22").await;

    // Wrong current password is refused.
    let (status, _) = app
        .post(
            "/users/me/password",
            json!({ "currentPassword": "wrong", "newPassword": "brand-new-pw" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/users/me/password",
            json!({ "currentPassword": "hunter22", "newPassword": "brand-new-pw" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer works; the new one does.
    let (status, _) = app
        .post(
            "/auth/login",
            json!({ "email": user.email, "password": "hunter22" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.login(&user.email, "brand-new-pw").await;
}

#[tokio::test]
async fn test_discord_verification_needs_configured_endpoint() {
    let app = TestApp::spawn().await;
    let user = app
        .seed_user("member@example.com", "Member", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&user.email, "hunter22").await;

    // The harness has no role endpoint configured; the handle is stored but
    // verification fails and the flag stays unset.
    let (status, _) = app
        .post(
            "/users/me/discord",
            json!({ "discordUsername": "member#1234" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(me["discord_username"], "member#1234");
    assert_eq!(me["discord_verified"], false);
}
