use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use docgraph_server::{create_router, Config};
use docgraph_shared::{Document, Relationships};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    workspace_id: Uuid,
    token: Option<String>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        Self {
            token: config.api_token.clone(),
            router: create_router(config),
            workspace_id: Uuid::new_v4(),
        }
    }

    fn docs_url(&self, rest: &str) -> String {
        format!("/api/v1/workspaces/{}/documents{}", self.workspace_id, rest)
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ref token) = self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create(&self, body: Value) -> Document {
        let (status, value) = self.send(Method::POST, &self.docs_url(""), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", value);
        serde_json::from_value(value).unwrap()
    }

    async fn relationships(&self, id: Uuid) -> Relationships {
        let (status, value) = self
            .send(Method::GET, &self.docs_url(&format!("/{}/relationships", id)), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_value(value).unwrap()
    }
}

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::with_config(Config {
        api_token: Some("secret".into()),
        port: 0,
    });
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_configured_token() {
    let mut app = TestApp::with_config(Config {
        api_token: Some("secret".into()),
        port: 0,
    });
    let url = app.docs_url("");

    app.token = None;
    let (status, _) = app.send(Method::GET, &url, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.token = Some("wrong".into());
    let (status, _) = app.send(Method::GET, &url, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.token = Some("secret".into());
    let (status, value) = app.send(Method::GET, &url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn create_keeps_client_assigned_id() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    let doc = app
        .create(json!({ "id": id, "title": "  Lease  ", "folder_path": ["legal", " ", "2024"] }))
        .await;

    assert_eq!(doc.id, id);
    assert_eq!(doc.version_group_id, id);
    assert_eq!(doc.title, "Lease");
    assert_eq!(doc.folder_path, vec!["legal", "2024"]);

    let (status, _) = app
        .send(Method::POST, &app.docs_url(""), Some(json!({ "id": id, "title": "again" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let app = TestApp::new();
    let (status, value) = app
        .send(Method::POST, &app.docs_url(""), Some(json!({ "title": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "Document title is required");
}

#[tokio::test]
async fn version_of_creates_next_current_version() {
    let app = TestApp::new();
    let v1 = app.create(json!({ "title": "Policy" })).await;
    let v2 = app.create(json!({ "title": "Policy", "version_of": v1.id })).await;

    assert_eq!(v2.version_group_id, v1.id);
    assert_eq!(v2.version_number, 2);
    assert!(v2.is_current_version);
    assert_eq!(v2.supersedes_id, Some(v1.id));

    let rels = app.relationships(v2.id).await;
    assert_eq!(rels.versions.len(), 1);
    assert_eq!(rels.versions[0].id, v1.id);
    assert!(!rels.versions[0].is_current_version);
}

#[tokio::test]
async fn set_current_and_move_version_return_group() {
    let app = TestApp::new();
    let v1 = app.create(json!({ "title": "Plan" })).await;
    let v2 = app.create(json!({ "title": "Plan", "version_of": v1.id })).await;

    let (status, value) = app
        .send(Method::POST, &app.docs_url(&format!("/{}/set-current", v1.id)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let group: Vec<Document> = serde_json::from_value(value).unwrap();
    assert!(group.iter().find(|d| d.id == v1.id).unwrap().is_current_version);
    assert!(!group.iter().find(|d| d.id == v2.id).unwrap().is_current_version);

    let (status, value) = app
        .send(
            Method::POST,
            &app.docs_url(&format!("/{}/move-version", v1.id)),
            Some(json!({ "from_version": 1, "to_version": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let group: Vec<Document> = serde_json::from_value(value).unwrap();
    assert_eq!(group[0].id, v2.id);
    assert_eq!(group[1].id, v1.id);
    assert!(group[1].is_current_version);
}

#[tokio::test]
async fn stale_move_version_is_a_conflict() {
    let app = TestApp::new();
    let v1 = app.create(json!({ "title": "Plan" })).await;
    app.create(json!({ "title": "Plan", "version_of": v1.id })).await;

    let (status, _) = app
        .send(
            Method::POST,
            &app.docs_url(&format!("/{}/move-version", v1.id)),
            Some(json!({ "from_version": 2, "to_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            Method::POST,
            &app.docs_url(&format!("/{}/move-version", v1.id)),
            Some(json!({ "from_version": 1, "to_version": 9 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn links_are_deduplicated_and_removable() {
    let app = TestApp::new();
    let x = app.create(json!({ "title": "X" })).await;
    let y = app.create(json!({ "title": "Y" })).await;
    let link_url = app.docs_url(&format!("/{}/link", x.id));

    for _ in 0..2 {
        let (status, value) = app
            .send(Method::POST, &link_url, Some(json!({ "linked_id": y.id, "link_type": "related" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let doc: Document = serde_json::from_value(value).unwrap();
        assert_eq!(doc.links.len(), 1);
    }

    let rels = app.relationships(y.id).await;
    assert_eq!(rels.incoming.len(), 1);
    assert_eq!(rels.incoming[0].id, x.id);

    let unlink_url = app.docs_url(&format!("/{}/link/{}", x.id, y.id));
    for _ in 0..2 {
        let (status, _) = app.send(Method::DELETE, &unlink_url, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    assert!(app.relationships(x.id).await.outgoing.is_empty());
}

#[tokio::test]
async fn self_link_and_unknown_target_are_rejected() {
    let app = TestApp::new();
    let x = app.create(json!({ "title": "X" })).await;
    let link_url = app.docs_url(&format!("/{}/link", x.id));

    let (status, _) = app
        .send(Method::POST, &link_url, Some(json!({ "linked_id": x.id, "link_type": "related" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            &link_url,
            Some(json!({ "linked_id": Uuid::new_v4(), "link_type": "related" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn detach_from_version_group_via_update() {
    let app = TestApp::new();
    let v1 = app.create(json!({ "title": "Memo" })).await;
    let v2 = app.create(json!({ "title": "Memo", "version_of": v1.id })).await;

    let (status, value) = app
        .send(
            Method::PATCH,
            &app.docs_url(&format!("/{}", v2.id)),
            Some(json!({ "title": "Memo (fork)", "detach_from_version_group": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let detached: Document = serde_json::from_value(value).unwrap();
    assert_eq!(detached.title, "Memo (fork)");
    assert_eq!(detached.version_group_id, v2.id);
    assert!(detached.is_current_version);

    let (_, value) = app.send(Method::GET, &app.docs_url(&format!("/{}", v1.id)), None).await;
    let base: Document = serde_json::from_value(value).unwrap();
    assert!(base.is_current_version);
}

#[tokio::test]
async fn delete_leaves_broken_link_and_reelects_current() {
    let app = TestApp::new();
    let v1 = app.create(json!({ "title": "Charter" })).await;
    let v2 = app.create(json!({ "title": "Charter", "version_of": v1.id })).await;
    let x = app.create(json!({ "title": "Notes" })).await;
    app.send(
        Method::POST,
        &app.docs_url(&format!("/{}/link", x.id)),
        Some(json!({ "linked_id": v2.id, "link_type": "cites" })),
    )
    .await;

    let (status, _) = app.send(Method::DELETE, &app.docs_url(&format!("/{}", v2.id)), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &app.docs_url(&format!("/{}", v2.id)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.relationships(x.id).await.broken, vec![v2.id]);
    let (_, value) = app.send(Method::GET, &app.docs_url(&format!("/{}", v1.id)), None).await;
    let base: Document = serde_json::from_value(value).unwrap();
    assert!(base.is_current_version);
}
