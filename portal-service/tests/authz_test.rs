//! Role gate coverage across the admin surface.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use portal_service::models::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_admin_routes_reject_students_and_anonymous() {
    let app = TestApp::spawn().await;
    let student = app
        .seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&student.email, "hunter22").await;

    for uri in [
        "/admin/users",
        "/admin/drive-access/requests",
        "/admin/apologies",
    ] {
        let (status, _) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "student allowed on {uri}");

        let (status, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "anonymous allowed on {uri}");
    }
}

#[tokio::test]
async fn test_admin_can_list_users() {
    let app = TestApp::spawn().await;
    app.seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let token = app.login(&admin.email, "hunter22").await;

    let (status, users) = app.get("/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_can_change_roles() {
    let app = TestApp::spawn().await;
    let student = app
        .seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let (status, body) = app
        .patch(
            &format!("/admin/users/{}/role", student.user_id),
            json!({ "role": "admin" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "admin");

    // The promoted user now clears the gate.
    let student_token = app.login(&student.email, "hunter22").await;
    let (status, _) = app.get("/admin/users", Some(&student_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_change_validates_input() {
    let app = TestApp::spawn().await;
    let student = app
        .seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let admin = app
        .seed_user("admin@example.com", "Admin", UserRole::Admin, "hunter22")
        .await;
    let admin_token = app.login(&admin.email, "hunter22").await;

    let (status, _) = app
        .patch(
            &format!("/admin/users/{}/role", student.user_id),
            json!({ "role": "overlord" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            &format!("/admin/users/{}/role", uuid::Uuid::new_v4()),
            json!({ "role": "admin" }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_cannot_change_roles() {
    let app = TestApp::spawn().await;
    let student = app
        .seed_user("student@example.com", "Student", UserRole::Student, "hunter22")
        .await;
    let token = app.login(&student.email, "hunter22").await;

    let (status, _) = app
        .patch(
            &format!("/admin/users/{}/role", student.user_id),
            json!({ "role": "admin" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
