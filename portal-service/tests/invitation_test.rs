//! Invitation creation and redemption tests.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use portal_service::models::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_create_invitation_requires_admin() {
    let app = TestApp::spawn().await;
    let student = app
        .seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&student.email, "hunter22").await;

    let (status, _) = app
        .post(
            "/admin/invitations",
            json!({ "email": "new@example.com", "fullName": "New Member" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/admin/invitations",
            json!({ "email": "new@example.com", "fullName": "New Member" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invitation_flow_end_to_end() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    // Create.
    let (status, created) = app
        .post(
            "/admin/invitations",
            json!({ "email": "new@example.com", "fullName": "New Member" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let token = created["inviteToken"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 26);
    assert!(created["inviteUrl"].as_str().unwrap().ends_with(&token));
    assert_eq!(created["user"]["invitation_accepted"], false);
    assert_eq!(created["user"]["role"], "student");

    // The activation page can look the token up.
    let (status, details) = app.get(&format!("/invitations/{token}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["email"], "new@example.com");
    assert_eq!(details["full_name"], "New Member");

    // Redeem.
    let (status, redeemed) = app
        .post(
            "/invitations/redeem",
            json!({
                "token": token,
                "password": "hunter22",
                "confirmPassword": "hunter22"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{redeemed}");
    assert_eq!(redeemed["success"], true);
    assert_eq!(redeemed["user"]["invitation_accepted"], true);

    // The activated account can sign in.
    let session_token = app.login("new@example.com", "hunter22").await;
    let (status, me) = app.get("/auth/me", Some(&session_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "new@example.com");
    assert_eq!(me["full_name"], "New Member");
}

#[tokio::test]
async fn test_token_is_single_use() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let (_, created) = app
        .post(
            "/admin/invitations",
            json!({ "email": "once@example.com", "fullName": "Once Member" }),
            Some(&admin_token),
        )
        .await;
    let token = created["inviteToken"].as_str().unwrap().to_string();

    let redeem_body = json!({
        "token": token,
        "password": "hunter22",
        "confirmPassword": "hunter22"
    });

    let (status, _) = app
        .post("/invitations/redeem", redeem_body.clone(), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = app.post("/invitations/redeem", redeem_body, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(second["error"].as_str().unwrap().contains("Invalid"));

    // A consumed token no longer resolves on the activation page either.
    let (status, _) = app.get(&format!("/invitations/{token}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redeem_validates_passwords() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let (_, created) = app
        .post(
            "/admin/invitations",
            json!({ "email": "pw@example.com", "fullName": "Pw Member" }),
            Some(&admin_token),
        )
        .await;
    let token = created["inviteToken"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/invitations/redeem",
            json!({
                "token": token,
                "password": "hunter22",
                "confirmPassword": "different"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("match"));

    let (status, body) = app
        .post(
            "/invitations/redeem",
            json!({
                "token": token,
                "password": "short",
                "confirmPassword": "short"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 6"));

    // The failed attempts left the token redeemable.
    let (status, _) = app
        .post(
            "/invitations/redeem",
            json!({
                "token": token,
                "password": "hunter22",
                "confirmPassword": "hunter22"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/invitations/nosuchtoken", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/invitations/redeem",
            json!({
                "token": "nosuchtoken",
                "password": "hunter22",
                "confirmPassword": "hunter22"
            }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_email_invitation_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let body = json!({ "email": "dup@example.com", "fullName": "Dup Member" });
    let (status, _) = app
        .post("/admin/invitations", body.clone(), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = app
        .post("/admin/invitations", body, Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(second["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_invitation_requires_email_and_name() {
    let app = TestApp::spawn().await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let (status, _) = app
        .post(
            "/admin/invitations",
            json!({ "email": "not-an-email", "fullName": "Someone" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/admin/invitations",
            json!({ "email": "ok@example.com", "fullName": "" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
