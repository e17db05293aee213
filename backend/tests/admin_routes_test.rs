mod common;

use axum::http::{StatusCode, header};

use common::{Part, TestApp, form_post, get, json, location, multipart_post};

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login() {
    let t = TestApp::new();

    let response = t.send(get("/admin/courses", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(t.backend.store.calls().is_empty());
}

#[tokio::test]
async fn signed_in_non_admin_is_sent_home_without_content() {
    let t = TestApp::new();
    t.backend.store.seed_course("গোপন খসড়া", "draft", false);
    let cookie = t.login("user@example.com", "secret2").await;

    let response = t.send(get("/admin/courses", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
    assert_eq!(json(response).await, serde_json::Value::Null);
    assert_eq!(t.backend.store.calls(), vec!["roles.is_admin"]);
}

#[tokio::test]
async fn failing_role_lookup_is_treated_as_non_admin() {
    let t = TestApp::new();
    let cookie = t.admin_cookie().await;
    t.backend.store.fail_requests("permission denied for table user_roles");

    let response = t.send(get("/admin", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn bearer_token_admin_reaches_dashboard() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("সহজ সূত্রে কুরআন শিখি", "quran-shikhi", true);
    t.backend.store.seed_lecture(&course.id, "লেকচার ১", 1, true);
    let session = muslimsdeen::auth::AuthProvider::sign_in(t.auth.as_ref(), "admin@example.com", "secret1")
        .await
        .unwrap();

    let request = axum::http::Request::builder()
        .uri("/admin")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.access_token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = t.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["stats"][0]["label"], "মোট কোর্স");
    assert_eq!(body["stats"][0]["value"], 1);
    assert_eq!(body["stats"][1]["value"], 1);
    assert_eq!(body["user"]["id"], "admin-1");
}

#[tokio::test]
async fn creating_course_derives_slug_and_lists_row() {
    let t = TestApp::new();
    let cookie = t.admin_cookie().await;

    let response = t
        .send(multipart_post(
            "/admin/courses",
            &[
                Part::Text("title", "কুরআন বেসিক"),
                Part::Text("slug", ""),
                Part::Text("instructor", "আস-সুন্নাহ ফাউন্ডেশন"),
                Part::Text("is_published", "on"),
            ],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "কোর্স তৈরি হয়েছে");
    assert_eq!(body["data"]["saved"]["slug"], "কুরআন-বেসিক");
    assert_eq!(body["data"]["items"][0]["slug"], "কুরআন-বেসিক");

    let listed = json(t.send(get("/admin/courses", Some(&cookie))).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "কুরআন বেসিক");
    assert_eq!(listed[0]["is_published"], true);
}

#[tokio::test]
async fn duplicate_slug_surfaces_backend_message() {
    let t = TestApp::new();
    t.backend.store.seed_course("Existing", "quran", true);
    let cookie = t.admin_cookie().await;

    let response = t
        .send(multipart_post(
            "/admin/courses",
            &[Part::Text("title", "Quran"), Part::Text("slug", "quran")],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "সংরক্ষণ ব্যর্থ");
    assert_eq!(body["notice"]["level"], "destructive");
    assert!(body["notice"]["description"].as_str().unwrap().contains("courses_slug_key"));
    assert_eq!(t.backend.store.courses().len(), 1);
}

#[tokio::test]
async fn course_thumbnail_is_uploaded_before_row_write() {
    let t = TestApp::new();
    let cookie = t.admin_cookie().await;

    let response = t
        .send(multipart_post(
            "/admin/courses",
            &[
                Part::Text("title", "Tajweed"),
                Part::File("thumbnail", "cover.PNG", b"png-bytes".as_slice()),
            ],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let objects = t.backend.storage.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].0, "thumbnails");
    assert!(objects[0].1.starts_with("courses/") && objects[0].1.ends_with(".png"));
    let stored = &t.backend.store.courses()[0];
    assert_eq!(stored.thumbnail_url.as_deref(), Some(format!("memory://thumbnails/{}", objects[0].1).as_str()));
}

#[tokio::test]
async fn lecture_short_link_is_stored_as_embed_link() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;

    let response = t
        .send(multipart_post(
            "/admin/lectures",
            &[
                Part::Text("course_id", &course.id),
                Part::Text("title", "লেকচার ১"),
                Part::Text("youtube_url", "https://youtu.be/abc123"),
                Part::Text("sort_order", "1"),
            ],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "লেকচার তৈরি হয়েছে");
    assert_eq!(
        t.backend.store.lectures()[0].youtube_url.as_deref(),
        Some("https://www.youtube.com/embed/abc123")
    );
}

#[tokio::test]
async fn lecture_without_title_is_rejected_before_any_backend_call() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;
    t.backend.store.clear_calls();

    let response = t
        .send(multipart_post(
            "/admin/lectures",
            &[
                Part::Text("course_id", &course.id),
                Part::Text("title", "  "),
                Part::File("pdf", "notes.pdf", b"%PDF".as_slice()),
            ],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(response).await;
    assert_eq!(body["notice"]["description"], "শিরোনাম আবশ্যক");
    assert_eq!(body["notice"]["field"], "title");
    assert_eq!(t.backend.store.calls(), vec!["roles.is_admin"]);
    assert!(t.backend.storage.objects().is_empty());
}

#[tokio::test]
async fn lecture_save_succeeds_when_list_refetch_fails() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;
    t.backend.store.fail_lists("statement timeout");

    let response = t
        .send(multipart_post(
            "/admin/lectures",
            &[Part::Text("course_id", &course.id), Part::Text("title", "লেকচার ১")],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "লেকচার তৈরি হয়েছে");
    assert_eq!(body["notice"]["level"], "success");
    assert!(body["notice"]["description"].as_str().unwrap().contains("statement timeout"));
    assert_eq!(body["data"]["saved"]["title"], "লেকচার ১");
    assert_eq!(t.backend.store.lectures().len(), 1);
}

#[tokio::test]
async fn confirmed_delete_reports_success_when_list_refetch_fails() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;
    t.backend.store.fail_lists("statement timeout");

    let response = t
        .send(form_post(&format!("/admin/courses/{}/delete", course.id), "confirm=true", Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "কোর্স মুছে ফেলা হয়েছে");
    assert!(t.backend.store.courses().is_empty());
}

#[tokio::test]
async fn backend_failure_notice_carries_no_field() {
    let t = TestApp::new();
    let cookie = t.admin_cookie().await;
    t.backend.store.fail_writes("connection reset");

    let response = t
        .send(multipart_post(
            "/admin/courses",
            &[Part::Text("title", "Tajweed")],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json(response).await;
    assert_eq!(body["notice"]["description"], "connection reset");
    assert!(body["notice"].get("field").is_none());
}

#[tokio::test]
async fn non_numeric_sort_order_is_a_validation_error() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;

    let response = t
        .send(multipart_post(
            "/admin/lectures",
            &[
                Part::Text("course_id", &course.id),
                Part::Text("title", "L"),
                Part::Text("sort_order", "প্রথম"),
            ],
            &cookie,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(t.backend.store.lectures().is_empty());
}

#[tokio::test]
async fn delete_without_confirmation_keeps_row() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;

    let response = t
        .send(form_post(&format!("/admin/courses/{}/delete", course.id), "", Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["data"][0]["id"], course.id.as_str());
    assert!(t.backend.store.writes().is_empty());

    let response = t
        .send(form_post(&format!("/admin/courses/{}/delete", course.id), "confirm=true", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.backend.store.courses().is_empty());
}

#[tokio::test]
async fn visibility_toggle_refetches_lectures() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let lecture = t.backend.store.seed_lecture(&course.id, "L1", 1, false);
    let cookie = t.admin_cookie().await;

    let response = t
        .send(form_post(&format!("/admin/lectures/{}/visibility", lecture.id), "value=true", Some(&cookie)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["notice"]["title"], "লেকচার উন্মুক্ত করা হয়েছে");
    assert_eq!(body["data"][0]["is_public"], true);
}

#[tokio::test]
async fn edit_form_reports_existing_values() {
    let t = TestApp::new();
    let course = t.backend.store.seed_course("Course", "course", true);
    let cookie = t.admin_cookie().await;

    let body = json(t.send(get(&format!("/admin/courses/{}", course.id), Some(&cookie))).await).await;
    assert_eq!(body["mode"], "edit");
    assert_eq!(body["fields"]["slug"], "course");

    let body = json(t.send(get("/admin/lectures/new", Some(&cookie))).await).await;
    assert_eq!(body["mode"], "create");
    assert_eq!(body["fields"]["course_id"], course.id.as_str());
    assert!(t.backend.store.writes().is_empty());
}

#[tokio::test]
async fn users_tab_flags_admins() {
    let t = TestApp::new();
    t.backend.store.add_profile("admin-1", "প্রশাসক", "admin@example.com");
    t.backend.store.add_profile("user-1", "সাধারণ ব্যবহারকারী", "user@example.com");
    let cookie = t.admin_cookie().await;

    let body = json(t.send(get("/admin/users", Some(&cookie))).await).await;

    assert_eq!(body[0]["is_admin"], true);
    assert_eq!(body[1]["is_admin"], false);
    assert_eq!(body[1]["email"], "user@example.com");
}
