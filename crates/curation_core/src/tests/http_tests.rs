use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use shared::{
    domain::{EntityId, Role, UserId},
    error::ErrorCode,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use super::*;

#[derive(Clone)]
struct ServerState {
    commit_tx: Arc<Mutex<Option<oneshot::Sender<(String, CommitSelectionRequest)>>>>,
    reject_commits: bool,
}

async fn handle_candidates(
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Page<CandidateEntity>> {
    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let all = ["a", "b", "c"];
    let items = all
        .iter()
        .skip(offset)
        .take(limit)
        .map(|id| CandidateEntity::new(format!("{key}-{id}"), id.to_uppercase()))
        .collect();
    Json(Page { items, total: 3 })
}

async fn handle_selection(Path(_key): Path<String>) -> Json<Page<CandidateEntity>> {
    Json(Page {
        items: vec![CandidateEntity::new("x", "X")
            .with_membership(shared::domain::Membership::at(0))],
        total: 1,
    })
}

async fn handle_commit(
    State(state): State<ServerState>,
    Path(key): Path<String>,
    Json(payload): Json<CommitSelectionRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if state.reject_commits {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiError::new(ErrorCode::Conflict, "selection changed elsewhere")),
        ));
    }
    if let Some(tx) = state.commit_tx.lock().await.take() {
        let _ = tx.send((key, payload));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_gallery(
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Page<CandidateEntity>> {
    let items = params
        .into_iter()
        .map(|(key, value)| CandidateEntity::new(format!("{key}={value}"), "param"))
        .collect::<Vec<_>>();
    let total = items.len() as u32;
    Json(Page { items, total })
}

async fn handle_session(headers: HeaderMap) -> Result<Json<SessionInfo>, StatusCode> {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer admin-token");
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(SessionInfo {
        user_id: UserId::new("user-1"),
        role: Role::Admin,
    }))
}

async fn spawn_api_server(
    reject_commits: bool,
) -> anyhow::Result<(String, oneshot::Receiver<(String, CommitSelectionRequest)>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = ServerState {
        commit_tx: Arc::new(Mutex::new(Some(tx))),
        reject_commits,
    };
    let app = Router::new()
        .route("/api/collections/:key/candidates", get(handle_candidates))
        .route(
            "/api/collections/:key/selection",
            get(handle_selection).post(handle_commit),
        )
        .route("/api/gallery", get(handle_gallery))
        .route("/api/session", get(handle_session))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api/"), rx))
}

#[tokio::test]
async fn fetches_candidate_pages_with_offset_and_limit() {
    let (api_url, _commits) = spawn_api_server(false).await.expect("spawn server");
    let api = HttpCurationApi::new(&api_url, None).expect("api");

    let page = api
        .fetch_candidates(&CollectionKey::carousel(), PageRequest::new(2, 2))
        .await
        .expect("page");

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, EntityId::new("carousel-c"));
}

#[tokio::test]
async fn fetches_current_selection_with_membership() {
    let (api_url, _commits) = spawn_api_server(false).await.expect("spawn server");
    let api = HttpCurationApi::new(&api_url, None).expect("api");

    let page = api
        .fetch_current_selection(&CollectionKey::featured(), PageRequest::new(0, 10))
        .await
        .expect("page");

    assert_eq!(page.items[0].membership.order, Some(0));
}

#[tokio::test]
async fn commit_posts_the_whole_change_set() {
    let (api_url, commits) = spawn_api_server(false).await.expect("spawn server");
    let api = HttpCurationApi::new(&api_url, None).expect("api");
    let changes = vec![
        ChangeEntry {
            id: EntityId::new("a"),
            membership: true,
            order: Some(0),
        },
        ChangeEntry {
            id: EntityId::new("b"),
            membership: false,
            order: None,
        },
    ];

    api.commit_selection(&CollectionKey::featured(), &changes)
        .await
        .expect("commit");

    let (key, payload) = commits.await.expect("payload");
    assert_eq!(key, "featured");
    assert_eq!(payload.changes, changes);
}

#[tokio::test]
async fn rejected_commit_surfaces_api_error_message() {
    let (api_url, _commits) = spawn_api_server(true).await.expect("spawn server");
    let api = HttpCurationApi::new(&api_url, None).expect("api");

    let err = api
        .commit_selection(&CollectionKey::carousel(), &[])
        .await
        .expect_err("must fail");

    let text = format!("{err:#}");
    assert!(text.contains("409"), "unexpected error: {text}");
    assert!(
        text.contains("selection changed elsewhere"),
        "unexpected error: {text}"
    );
    let api_err = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(api_err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn gallery_query_is_sent_as_facets() {
    let (api_url, _commits) = spawn_api_server(false).await.expect("spawn server");
    let api = HttpCurationApi::new(&api_url, None).expect("api");
    let query = GalleryQuery {
        search: "blue hour".into(),
        category: Some("photography".into()),
        tags: vec!["night".into()],
        ..GalleryQuery::default()
    };

    let page = api
        .fetch_gallery(&query, PageRequest::new(0, 12))
        .await
        .expect("page");

    let echoed: Vec<&str> = page.items.iter().map(|item| item.id.as_str()).collect();
    assert!(echoed.contains(&"search=blue hour"), "{echoed:?}");
    assert!(echoed.contains(&"category=photography"), "{echoed:?}");
    assert!(echoed.contains(&"tag=night"), "{echoed:?}");
    assert!(echoed.contains(&"limit=12"), "{echoed:?}");
}

#[tokio::test]
async fn session_sends_bearer_token() {
    let (api_url, _commits) = spawn_api_server(false).await.expect("spawn server");

    let anonymous = HttpCurationApi::new(&api_url, None).expect("api");
    assert!(anonymous.session().await.is_err());

    let admin = HttpCurationApi::new(&api_url, Some("admin-token".into())).expect("api");
    let session = admin.session().await.expect("session");
    assert_eq!(session.role, Role::Admin);
}

#[test]
fn rejects_non_base_api_url() {
    assert!(HttpCurationApi::new("mailto:admin@example.com", None).is_err());
    assert!(HttpCurationApi::new("not a url", None).is_err());
}
