mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

use common::{coordinator, settings, MemoryRepo, MemoryStore, BUCKET};
use trackmus::avatar::AvatarService;
use trackmus::models::{media_object_key, MediaView, TaskDetail, TaskSummary, UploadUrlView};
use trackmus::serve::{build_router, AppState, USER_ID_HEADER};
use trackmus::service::TaskService;
use trackmus::user::UserService;

const AVATAR_BUCKET: &str = "trackmus-avatars";

struct TestServer {
    url: String,
    repo: Arc<MemoryRepo>,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn at(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

async fn start_test_server() -> TestServer {
    let repo = MemoryRepo::new();
    let store = MemoryStore::new();
    let (media, _cleanup) = coordinator(&repo, &store, settings());

    let avatars = Arc::new(AvatarService::new(
        store.clone(),
        AVATAR_BUCKET,
        Duration::from_secs(900),
    ));
    let state = Arc::new(AppState {
        tasks: TaskService::new(repo.clone(), repo.clone(), repo.clone(), Arc::new(media)),
        users: UserService::new(repo.clone(), avatars.clone()),
        avatars,
    });
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        url: format!("http://{}", addr),
        repo,
        store,
        client: reqwest::Client::new(),
        _handle: handle,
    }
}

#[tokio::test]
async fn test_health() {
    let server = start_test_server().await;
    let resp = server.client.get(server.at("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_user_header_required() {
    let server = start_test_server().await;

    let resp = server
        .client
        .get(server.at("/api/tasks/active"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .get(server.at("/api/tasks/active"))
        .header(USER_ID_HEADER, "nobody")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid user id");
}

#[tokio::test]
async fn test_task_lifecycle() {
    let server = start_test_server().await;
    let user = Uuid::new_v4().to_string();

    let created: TaskSummary = server
        .client
        .post(server.at("/api/tasks"))
        .header(USER_ID_HEADER, &user)
        .json(&json!({"title": "Paradiddles", "target_bpm": 120}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.progress, 0.0);

    let resp = server
        .client
        .post(server.at(&format!("/api/tasks/{}/sessions", created.id)))
        .json(&json!({
            "bpm": 120,
            "confidence": 5,
            "start_time": "2024-05-01T10:00:00Z",
            "end_time": "2024-05-01T10:30:00Z"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Value = resp.json().await.unwrap();
    assert_eq!(session["duration"], 1800);
    assert_eq!(session["note"], "");

    let active: Vec<TaskSummary> = server
        .client
        .get(server.at("/api/tasks/active"))
        .header(USER_ID_HEADER, &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].progress, 100.0);

    let resp = server
        .client
        .put(server.at(&format!("/api/tasks/{}/complete", created.id)))
        .header(USER_ID_HEADER, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let completed: Vec<TaskSummary> = server
        .client
        .get(server.at("/api/tasks/completed"))
        .header(USER_ID_HEADER, &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert!(completed[0].is_completed);
}

#[tokio::test]
async fn test_validation_and_not_found_statuses() {
    let server = start_test_server().await;
    let user = Uuid::new_v4().to_string();

    let resp = server
        .client
        .post(server.at("/api/tasks"))
        .header(USER_ID_HEADER, &user)
        .json(&json!({"title": "x".repeat(51), "target_bpm": 120}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.at("/api/tasks"))
        .header(USER_ID_HEADER, &user)
        .json(&json!({"title": "Missing target"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .get(server.at(&format!("/api/tasks/{}", Uuid::new_v4())))
        .header(USER_ID_HEADER, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let resp = server
        .client
        .get(server.at("/api/tasks/not-a-uuid"))
        .header(USER_ID_HEADER, &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_upload_flow() {
    let server = start_test_server().await;
    let owner = Uuid::new_v4();
    let task = server.repo.add_task(owner, "Recording", 100);

    let upload: UploadUrlView = server
        .client
        .post(server.at(&format!("/api/tasks/{}/media/upload-url", task.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(upload.url.contains(&media_object_key(task.id, upload.media_id)));

    // client uploads straight to the store
    server
        .store
        .put(BUCKET, &media_object_key(task.id, upload.media_id), 4096);

    let resp = server
        .client
        .post(server.at(&format!(
            "/api/tasks/{}/media/{}/confirm",
            task.id, upload.media_id
        )))
        .json(&json!({"type": "audio", "filename": "take.m4a", "size": 4096, "duration": 95}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let confirmed: MediaView = resp.json().await.unwrap();
    assert_eq!(confirmed.id, upload.media_id);

    let listed: Vec<MediaView> = server
        .client
        .get(server.at(&format!("/api/tasks/{}/media", task.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let detail: TaskDetail = server
        .client
        .get(server.at(&format!("/api/tasks/{}", task.id)))
        .header(USER_ID_HEADER, owner.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.media.len(), 1);

    let resp = server
        .client
        .delete(server.at(&format!("/api/media/{}", upload.media_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!server.repo.has_media(upload.media_id));

    let resp = server
        .client
        .delete(server.at(&format!("/api/media/{}", upload.media_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_is_generic_500() {
    let server = start_test_server().await;
    let task = server.repo.add_task(Uuid::new_v4(), "Recording", 100);
    server
        .store
        .fail_presign_put
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let resp = server
        .client
        .post(server.at(&format!("/api/tasks/{}/media/upload-url", task.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "failed to save data");
}

#[tokio::test]
async fn test_avatar() {
    let server = start_test_server().await;
    let user = Uuid::new_v4();

    let body: Value = server
        .client
        .get(server.at("/api/users/me/avatar"))
        .header(USER_ID_HEADER, user.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["url"].is_null());

    let body: Value = server
        .client
        .get(server.at("/api/users/me/avatar/upload-url"))
        .header(USER_ID_HEADER, user.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let upload_url = body["url"].as_str().unwrap();
    assert!(upload_url.contains(&format!("{}/{}", AVATAR_BUCKET, user)));

    server.store.put(AVATAR_BUCKET, &user.to_string(), 512);

    let body: Value = server
        .client
        .get(server.at("/api/users/me/avatar"))
        .header(USER_ID_HEADER, user.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("filename=avatar"));
}

#[tokio::test]
async fn test_links_endpoints() {
    let server = start_test_server().await;
    let task = server.repo.add_task(Uuid::new_v4(), "Transcribe", 100);

    let link: Value = server
        .client
        .post(server.at(&format!("/api/tasks/{}/links", task.id)))
        .json(&json!({"url": "https://youtu.be/x", "title": "Original", "type": "youtube"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(link["type"], "youtube");

    let resp = server
        .client
        .post(server.at(&format!("/api/tasks/{}/links", task.id)))
        .json(&json!({"url": "https://x", "title": "Bad", "type": "vimeo"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let id = link["id"].as_str().unwrap();
    let resp = server
        .client
        .delete(server.at(&format!("/api/links/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_task_routes_check_owner() {
    let server = start_test_server().await;
    let owner = Uuid::new_v4();
    let task = server.repo.add_task(owner, "Mine", 100);
    let stranger = Uuid::new_v4().to_string();

    let resp = server
        .client
        .get(server.at(&format!("/api/tasks/{}", task.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .get(server.at(&format!("/api/tasks/{}", task.id)))
        .header(USER_ID_HEADER, &stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .client
        .put(server.at(&format!("/api/tasks/{}", task.id)))
        .header(USER_ID_HEADER, &stranger)
        .json(&json!({"title": "Theirs now", "target_bpm": 90}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .client
        .put(server.at(&format!("/api/tasks/{}/complete", task.id)))
        .header(USER_ID_HEADER, &stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let detail: TaskDetail = server
        .client
        .get(server.at(&format!("/api/tasks/{}", task.id)))
        .header(USER_ID_HEADER, owner.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.title, "Mine");
    assert!(!detail.is_completed);
}

#[tokio::test]
async fn test_user_profile() {
    let server = start_test_server().await;
    let user = server.repo.add_user("bassist");

    let resp = server
        .client
        .get(server.at("/api/users/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .get(server.at("/api/users/me"))
        .header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let profile: Value = server
        .client
        .get(server.at("/api/users/me"))
        .header(USER_ID_HEADER, user.id.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["username"], "bassist");
    assert!(profile["avatar_url"].is_null());

    server.store.put(AVATAR_BUCKET, &user.id.to_string(), 128);
    let resp = server
        .client
        .put(server.at("/api/users/me"))
        .header(USER_ID_HEADER, user.id.to_string())
        .json(&json!({"first_name": "Jaco", "last_name": "P", "username": "jaco"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["id"], user.id.to_string());
    assert_eq!(updated["first_name"], "Jaco");
    assert!(updated["avatar_url"].as_str().unwrap().contains("filename=avatar"));

    let resp = server
        .client
        .put(server.at("/api/users/me"))
        .header(USER_ID_HEADER, user.id.to_string())
        .json(&json!({"first_name": "Jaco", "last_name": "P", "username": "u".repeat(51)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .put(server.at("/api/users/me"))
        .header(USER_ID_HEADER, user.id.to_string())
        .json(&json!({"first_name": "Jaco"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
