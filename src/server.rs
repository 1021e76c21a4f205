use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::client::ResidentClient;
use crate::config::Config;
use crate::profile::{self, Profile};

pub struct AppState {
    pub config: Config,
    pub client: ResidentClient,
}

// --- Error Handling ---
pub enum AppError {
    BadRequest {
        message: String,
        user: String,
    },
    Upstream {
        error: anyhow::Error,
        url: String,
        user: String,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    metadata: ErrorMetadata,
}

#[derive(Serialize)]
struct ErrorMetadata {
    timestamp: String,
    user: String,
    url: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, url, user) = match self {
            AppError::BadRequest { message, user } => {
                (StatusCode::BAD_REQUEST, message, None, user)
            }
            AppError::Upstream { error, url, user } => {
                let message = format!("{error:#}");
                tracing::warn!(%url, error = %message, "profile fetch failed");
                (StatusCode::BAD_GATEWAY, message, Some(url), user)
            }
        };

        let body = ErrorBody {
            success: false,
            error,
            metadata: ErrorMetadata {
                timestamp: now_utc(),
                user,
                url,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    success: bool,
    metadata: FetchMetadata,
    profile: Profile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchMetadata {
    fetched_at: String,
    fetched_by: String,
    request_url: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/api/profile/:uuid", get(profile_handler))
        .with_state(state)
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
}

async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    load_profile(&state, &raw).await.map(Json)
}

async fn load_profile(state: &AppState, raw: &str) -> Result<ProfileResponse, AppError> {
    let uuid = sanitize(raw);
    if uuid.is_empty() {
        return Err(AppError::BadRequest {
            message: "Missing or invalid resident id".to_string(),
            user: state.config.fetched_by.clone(),
        });
    }

    let url = state.client.profile_url(&uuid);
    let html = state
        .client
        .fetch_page(&uuid)
        .await
        .map_err(|error| AppError::Upstream {
            error,
            url: url.clone(),
            user: state.config.fetched_by.clone(),
        })?;

    let page = profile::extract(&html);
    let profile = Profile::from_page(page, &uuid, state.config.reference_date());
    tracing::info!(%uuid, name = %profile.display_name, "profile served");

    Ok(ProfileResponse {
        success: true,
        metadata: FetchMetadata {
            fetched_at: now_utc(),
            fetched_by: state.config.fetched_by.clone(),
            request_url: url,
        },
        profile,
    })
}

/// Keeps only `[A-Za-z0-9.-]`.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect()
}

fn now_utc() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use clap::Parser;
    use tower::ServiceExt;

    const RESIDENT_PAGE: &str = r#"<html><head>
<meta property="og:image" content="https://picture.example.com/good.jpg">
</head><body><div class="details">
<h1 class="resident"><span>Good Resident (good.resident)</span></h1>
<p class="info"><span class="syscat">Resident Since:</span> 2020-02-29 (1 year ago)</p>
</div></body></html>"#;

    fn app_with(extra: &[&str]) -> Router {
        let mut args = vec![
            "resident-card",
            "--fetched-by",
            "tester",
            "--reference-date",
            "2021-02-28",
        ];
        args.extend_from_slice(extra);
        let config = Config::parse_from(args);
        let client = ResidentClient::new(&config).unwrap();
        router(Arc::new(AppState { config, client }))
    }

    fn app() -> Router {
        app_with(&[])
    }

    /// Local stand-in for the resident site: `/good` serves a page, anything
    /// else is a 404.
    async fn spawn_upstream() -> String {
        let upstream = Router::new()
            .route("/good", get(|| async { axum::response::Html(RESIDENT_PAGE) }))
            .fallback(|| async { StatusCode::NOT_FOUND });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn sanitize_strips_everything_but_id_characters() {
        assert_eq!(
            sanitize("a1b2c3d4-0000-4f00-9e00-123456789abc"),
            "a1b2c3d4-0000-4f00-9e00-123456789abc"
        );
        assert_eq!(sanitize("cindy.larkspur"), "cindy.larkspur");
        assert_eq!(sanitize("../etc/passwd?x=1"), "..etcpasswdx1");
        assert_eq!(sanitize("<script>"), "script");
        assert_eq!(sanitize("%$#@!"), "");
    }

    #[tokio::test]
    async fn unusable_id_is_a_bad_request() {
        let (status, json) = get_json(app(), "/api/profile/%24%23%40").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["metadata"]["user"], "tester");
        assert!(json["metadata"]["url"].is_null());
    }

    #[tokio::test]
    async fn fetched_profile_is_served() {
        let base = spawn_upstream().await;
        let app = app_with(&["--base-url", base.as_str()]);

        let (status, json) = get_json(app, "/api/profile/good").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["metadata"]["fetchedBy"], "tester");
        assert_eq!(json["metadata"]["requestUrl"], format!("{base}/good"));
        assert!(json["metadata"]["fetchedAt"].is_string());

        let profile = &json["profile"];
        assert_eq!(profile["uuid"], "good");
        assert_eq!(profile["username"], "good.resident");
        assert_eq!(profile["profileImage"], "https://picture.example.com/good.jpg");
        assert_eq!(profile["birthInfo"], "29-02-2020");
        assert_eq!(profile["ageInfo"], "1 year ago");

        let exact = &profile["ageDetails"]["exact"];
        assert_eq!(exact["years"], 0);
        assert_eq!(exact["months"], 11);
        assert_eq!(exact["days"], 365);
        assert_eq!(exact["formatted"], "0 years, 11 months (365 Days)");
    }

    #[tokio::test]
    async fn upstream_status_error_is_bad_gateway() {
        let base = spawn_upstream().await;
        let app = app_with(&["--base-url", base.as_str()]);

        let (status, json) = get_json(app, "/api/profile/gone").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Resident page returned HTTP 404");
        assert_eq!(json["metadata"]["url"], format!("{base}/gone"));
        assert_eq!(json["metadata"]["user"], "tester");
    }

    #[tokio::test]
    async fn static_index_is_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Resident Card</h1>").unwrap();
        let static_dir = dir.path().to_str().unwrap();

        for uri in ["/index.html", "/"] {
            let resp = app_with(&["--static-dir", static_dir])
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], b"<h1>Resident Card</h1>");
        }
    }

    #[tokio::test]
    async fn missing_static_file_is_not_found() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/definitely-not-here.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
