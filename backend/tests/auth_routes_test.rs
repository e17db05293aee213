mod common;

use axum::http::StatusCode;

use common::{TestApp, form_post, get, json, session_cookie};

#[tokio::test]
async fn login_sets_cookie_and_session_reports_user() {
    let t = TestApp::new();

    let response = t
        .send(form_post("/login", "email=user%40example.com&password=secret2", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert!(cookie.starts_with("md_session="));
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "সফলভাবে লগইন হয়েছে!");
    assert_eq!(body["redirect"], "/");

    let state = json(t.send(get("/session", Some(&cookie))).await).await;
    assert_eq!(state["loading"], false);
    assert_eq!(state["user"]["display_name"], "সাধারণ ব্যবহারকারী");
}

#[tokio::test]
async fn wrong_password_shows_provider_message() {
    let t = TestApp::new();

    let response = t
        .send(form_post("/login", "email=user%40example.com&password=nope", None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "লগইন ব্যর্থ");
    assert_eq!(body["notice"]["description"], "Invalid login credentials");
}

#[tokio::test]
async fn logout_tears_down_the_session() {
    let t = TestApp::new();
    let cookie = t.admin_cookie().await;

    let response = t.send(form_post("/logout", "", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let state = json(t.send(get("/session", Some(&cookie))).await).await;
    assert_eq!(state["user"], serde_json::Value::Null);
    let response = t.send(get("/admin", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(t.auth.calls().contains(&"sign_out".to_string()));
}

#[tokio::test]
async fn register_with_confirmation_does_not_sign_in() {
    let t = TestApp::new();
    t.auth.require_confirmation();

    let response = t
        .send(form_post(
            "/register",
            "full_name=Fatima&email=fatima%40example.com&password=secret3",
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(session_cookie(&response).is_none());
    let body = json(response).await;
    assert_eq!(body["redirect"], "/login");
    assert_eq!(body["data"]["display_name"], "Fatima");
}

#[tokio::test]
async fn register_rejects_short_password() {
    let t = TestApp::new();

    let response = t
        .send(form_post("/register", "full_name=A&email=a%40example.com&password=123", None))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(t.auth.calls().is_empty());
}

#[tokio::test]
async fn password_recovery_round_trip() {
    let t = TestApp::new();

    let response = t.send(form_post("/forgot-password", "email=user%40example.com", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        t.auth
            .calls()
            .contains(&"recover:user@example.com:http://localhost:3000/reset-password".to_string())
    );

    let token = t.auth.issue_recovery("user@example.com");
    let response = t
        .send(get(&format!("/reset-password?token_hash={}&type=recovery", token), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(json(response).await["recovery"], true);

    let mismatch = t
        .send(form_post("/reset-password", "password=newpass1&confirm_password=newpass2", Some(&cookie)))
        .await;
    assert_eq!(mismatch.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(mismatch).await["notice"]["description"], "পাসওয়ার্ড মিলছে না!");

    let response = t
        .send(form_post("/reset-password", "password=newpass1&confirm_password=newpass1", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["redirect"], "/login");
    assert_eq!(t.auth.password_of("user@example.com").as_deref(), Some("newpass1"));

    let state = json(t.send(get("/session", Some(&cookie))).await).await;
    assert_eq!(state["user"], serde_json::Value::Null);
}

#[tokio::test]
async fn reset_without_recovery_session_is_refused() {
    let t = TestApp::new();
    let cookie = t.login("user@example.com", "secret2").await;

    let response = t
        .send(form_post("/reset-password", "password=newpass1&confirm_password=newpass1", Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(t.auth.password_of("user@example.com").as_deref(), Some("secret2"));
}
