mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use postboard::{api, service::ServiceContext};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    ctx: Arc<ServiceContext>,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> anyhow::Result<Self> {
        let uploads = tempfile::tempdir()?;
        let (ctx, settings) = common::test_context(uploads.path()).await?;
        ctx.admin_service
            .ensure_super_admin("admin", Some("super-secret-pw"))
            .await?;

        let router = api::create_app(ctx.clone(), Arc::new(settings));
        Ok(Self { router, ctx, _uploads: uploads })
    }

    async fn send(&self, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    async fn login(&self, username: &str, password: &str) -> anyhow::Result<String> {
        let (status, body) = self
            .json("POST", "/api/auth/login", None, Some(json!({
                "username": username,
                "password": password,
            })))
            .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        Ok(body["token"].as_str().unwrap_or_default().to_string())
    }
}

fn announcement(title: &str) -> Value {
    json!({
        "title": title,
        "content": "Classes resume on Monday.",
        "category": "School",
        "author": "Office",
        "isPublished": true,
    })
}

#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (status, body) = app.json("GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_login_sets_session_cookie() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, _) = app
        .json("POST", "/api/auth/login", None, Some(json!({
            "username": "admin",
            "password": "wrong-password",
        })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"username": "admin", "password": "super-secret-pw"}).to_string()))?;
    let response = app.router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates
    let token = cookie.trim_start_matches("session=").split(';').next().unwrap_or_default();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("session={}", token))
        .body(Body::empty())?;
    let (status, me) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "super_admin");
    assert!(me.get("passwordHash").is_none());

    Ok(())
}

#[tokio::test]
async fn test_announcement_crud_requires_auth() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, _) = app
        .json("POST", "/api/announcements", None, Some(announcement("Anonymous")))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("admin", "super-secret-pw").await?;
    let (status, created) = app
        .json("POST", "/api/announcements", Some(&token), Some(announcement("Term start")))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["publishStatus"], "published");
    assert_eq!(created["priority"], 1);
    let id = created["id"].as_str().unwrap_or_default().to_string();

    let (status, updated) = app
        .json("PUT", &format!("/api/announcements/{}", id), Some(&token), Some(json!({
            "isPinned": true,
            "priority": 4,
        })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isPinned"], true);
    assert!(updated["pinnedAt"].is_string());
    assert_eq!(updated["priority"], 4);
    assert_eq!(updated["title"], "Term start");

    let (status, list) = app.json("GET", "/api/announcements?keyword=resume", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, categories) = app.json("GET", "/api/categories", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories, json!(["School"]));

    let (status, _) = app
        .json("DELETE", &format!("/api/announcements/{}", id), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("GET", &format!("/api/announcements/{}", id), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_validation_errors_do_not_write() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let (status, body) = app
        .json("POST", "/api/announcements", Some(&token), Some(json!({
            "title": "No body",
            "category": "School",
        })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("content"));

    let mut bad_priority = announcement("Too important");
    bad_priority["priority"] = json!(9);
    let (status, _) = app
        .json("POST", "/api/announcements", Some(&token), Some(bad_priority))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.ctx.announcement_repo.list_all().await?.is_empty());

    let (status, _) = app
        .json("POST", "/api/events", Some(&token), Some(json!({
            "title": "Backwards",
            "startDate": "2024-05-10",
            "endDate": "2024-05-09",
        })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.ctx.event_repo.list(None, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_read_count_deduplicated_per_client() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let (_, created) = app
        .json("POST", "/api/announcements", Some(&token), Some(announcement("Popular")))
        .await?;
    let uri = format!("/api/announcements/{}", created["id"].as_str().unwrap_or_default());

    let read_from = |ip: &'static str| {
        Request::builder()
            .uri(uri.clone())
            .header("x-forwarded-for", ip)
            .body(Body::empty())
    };

    let (_, first) = app.send(read_from("198.51.100.1")?).await?;
    let (_, second) = app.send(read_from("198.51.100.1")?).await?;
    let (_, other) = app.send(read_from("198.51.100.2")?).await?;

    assert_eq!(first["readCount"], 1);
    assert_eq!(second["readCount"], 1);
    assert_eq!(other["readCount"], 2);

    Ok(())
}

#[tokio::test]
async fn test_unpublished_visible_to_admins_only() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let mut draft = announcement("Draft");
    draft["isPublished"] = json!(false);
    let (_, created) = app
        .json("POST", "/api/announcements", Some(&token), Some(draft))
        .await?;
    assert_eq!(created["publishStatus"], "draft");
    let uri = format!("/api/announcements/{}", created["id"].as_str().unwrap_or_default());

    let (status, _) = app.json("GET", &uri, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.json("GET", &uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["readCount"], 0);

    let (_, public) = app.json("GET", "/api/announcements", None, None).await?;
    assert_eq!(public.as_array().map(Vec::len), Some(0));

    let (_, all) = app.json("GET", "/api/admin/announcements", Some(&token), None).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_admin_lifecycle_gated_by_super_admin() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let root = app.login("admin", "super-secret-pw").await?;

    let (status, teacher) = app
        .json("POST", "/api/admins", Some(&root), Some(json!({
            "username": "teacher",
            "password": "teacher-pass",
        })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(teacher["role"], "admin");
    let teacher_id = teacher["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = app
        .json("POST", "/api/admins", Some(&root), Some(json!({
            "username": "teacher",
            "password": "another-pass",
        })))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let teacher_token = app.login("teacher", "teacher-pass").await?;

    // Regular admins can list but not manage accounts
    let (status, admins) = app.json("GET", "/api/admins", Some(&teacher_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(admins.as_array().map(Vec::len), Some(2));

    let (status, _) = app
        .json("POST", "/api/admins", Some(&teacher_token), Some(json!({
            "username": "intruder",
            "password": "intruder-pass",
        })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let root_user = app.ctx.user_repo.find_by_username("admin").await?.unwrap();
    let (status, _) = app
        .json("DELETE", &format!("/api/admins/{}", root_user.id), Some(&teacher_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Not even the super admin can delete a super admin
    let (status, _) = app
        .json("DELETE", &format!("/api/admins/{}", root_user.id), Some(&root), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json("PUT", &format!("/api/admins/{}/password", teacher_id), Some(&root), Some(json!({
            "newPassword": "reset-pass-123",
        })))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Reset revokes the old session
    let (status, _) = app.json("GET", "/api/auth/me", Some(&teacher_token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let teacher_token = app.login("teacher", "reset-pass-123").await?;

    let (status, _) = app
        .json("DELETE", &format!("/api/admins/{}", teacher_id), Some(&root), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("GET", "/api/auth/me", Some(&teacher_token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_change_password_and_logout() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let (status, _) = app
        .json("POST", "/api/auth/change-password", Some(&token), Some(json!({
            "oldPassword": "not-it",
            "newPassword": "brand-new-pw",
        })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json("POST", "/api/auth/change-password", Some(&token), Some(json!({
            "oldPassword": "super-secret-pw",
            "newPassword": "short",
        })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json("POST", "/api/auth/change-password", Some(&token), Some(json!({
            "oldPassword": "super-secret-pw",
            "newPassword": "brand-new-pw",
        })))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("POST", "/api/auth/logout", Some(&token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.login("admin", "brand-new-pw").await?;

    Ok(())
}

#[tokio::test]
async fn test_legacy_plaintext_login_upgrades_hash() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let now = chrono::Utc::now().naive_utc();
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind("legacy")
    .bind("admin123")
    .bind("Admin")
    .bind(now)
    .bind(now)
    .execute(&app.ctx.db_pool)
    .await?;

    app.login("legacy", "admin123").await?;

    let upgraded = app.ctx.user_repo.find_by_username("legacy").await?.unwrap();
    assert!(upgraded.password_hash.starts_with("$argon2"));

    // Still works against the new hash
    app.login("legacy", "admin123").await?;

    Ok(())
}

#[tokio::test]
async fn test_events_crud_and_range() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let (status, event) = app
        .json("POST", "/api/events", Some(&token), Some(json!({
            "title": "Sports day",
            "description": "Field",
            "startDate": "2024-05-10T08:30:00",
            "endDate": "2024-05-11",
        })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["startDate"], "2024-05-10");
    assert_eq!(event["startTime"], "08:30");
    assert_eq!(event["endTime"], Value::Null);

    app.json("POST", "/api/events", Some(&token), Some(json!({
        "title": "Concert",
        "startDate": "2024-06-01",
        "endDate": "2024-06-01",
        "startTime": "18:00",
        "endTime": "20:00",
    })))
    .await?;

    let (status, may) = app.json("GET", "/api/events?from=2024-05-11&to=2024-05-31", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(may.as_array().map(Vec::len), Some(1));
    assert_eq!(may[0]["title"], "Sports day");

    let (_, all) = app.json("GET", "/api/events", None, None).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let id = event["id"].as_str().unwrap_or_default();
    let (status, updated) = app
        .json("PUT", &format!("/api/events/{}", id), Some(&token), Some(json!({
            "title": "Sports day (moved)",
            "startDate": "2024-05-17",
            "endDate": "2024-05-17",
        })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["startDate"], "2024-05-17");

    let (status, _) = app.json("DELETE", &format!("/api/events/{}", id), Some(&token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("GET", &format!("/api/events/{}", id), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_multipart_upload_and_dedup() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.login("admin", "super-secret-pw").await?;

    let upload = |name: &str| -> anyhow::Result<Request<Body>> {
        let boundary = "postboard-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{n}\"\r\nContent-Type: image/png\r\n\r\n",
            b = boundary,
            n = name
        ).as_bytes());
        body.extend_from_slice(&common::png_bytes("banner"));
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Ok(Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))?)
    };

    let (status, first) = app.send(upload("banner.png")?).await?;
    assert_eq!(status, StatusCode::CREATED);
    let url = first["url"].as_str().unwrap_or_default().to_string();
    assert!(url.starts_with("/uploads/"));
    assert_eq!(first["image"]["referenceCount"], 0);

    let (status, second) = app.send(upload("banner-copy.png")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["url"], first["url"]);
    assert_eq!(second["deduplicated"], true);

    // Uploaded files are served back
    let response = app.router.clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
