use super::{AppResult, AppState, JsonResponse};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tourpost_core::{
    decide_on, extract_mentions, Agenda, ImagePromptResult, LocalTime, MatchReason, PostRequest,
    Query, Resolution, Role, TourpostError,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agenda", get(agenda))
        .route("/resolve", post(resolve))
        .route("/generate-social-media-post", post(generate_social_media_post))
        .route("/generate-image-prompt-n-get-topics", post(generate_image_prompt))
        .route("/generate-image", post(generate_image))
        .route("/get-links-from-topics", post(get_links_from_topics))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Count a generation and, when a hosted service failed, which one.
fn observe<T>(state: &AppState, kind: &str, result: &tourpost_core::Result<T>) {
    state.metrics.record_generation(kind, result.is_ok());
    if let Err(TourpostError::Upstream { service, .. }) = result {
        state.metrics.record_upstream_failure(service);
    }
}

fn parse_time(state: &AppState, raw: Option<&str>) -> tourpost_core::Result<LocalTime> {
    match raw.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => LocalTime::parse(t),
        None => Ok(state.clock.now()),
    }
}

fn parse_role(raw: Option<&str>) -> tourpost_core::Result<Role> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r.parse(),
        None => Ok(Role::default()),
    }
}

// --- Health / agenda ---

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_seconds: u64,
    event: String,
    session_count: usize,
    model: String,
}

async fn health(State(state): State<AppState>) -> AppResult<Json<JsonResponse<HealthResponse>>> {
    let agenda = state.store.snapshot();
    Ok(Json(JsonResponse::ok(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        event: agenda.event.name.clone(),
        session_count: agenda.len(),
        model: state.model.clone(),
    })))
}

async fn agenda(State(state): State<AppState>) -> AppResult<Json<JsonResponse<Agenda>>> {
    let agenda = state.store.snapshot();
    Ok(Json(JsonResponse::ok(agenda.as_ref().clone())))
}

// --- Resolve ---

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResolveRequest {
    local_time: Option<String>,
    user_post: Option<String>,
    mentioned_topics: Vec<String>,
    role: Option<String>,
}

#[derive(Serialize)]
struct ResolveResponse {
    #[serde(flatten)]
    resolution: Resolution,
    session_title: Option<String>,
    local_time: String,
    agenda_time: String,
    mentioned_topics: Vec<String>,
    role: Role,
}

async fn resolve(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Json<JsonResponse<ResolveResponse>>> {
    let agenda = state.store.snapshot();
    let local_time = parse_time(&state, req.local_time.as_deref())?;
    let role = parse_role(req.role.as_deref())?;

    let mut mentions = req.mentioned_topics;
    if let Some(text) = req.user_post.as_deref() {
        for found in extract_mentions(text, &agenda) {
            if !mentions.iter().any(|m| m.eq_ignore_ascii_case(&found)) {
                mentions.push(found);
            }
        }
    }

    let query = Query::new(local_time.clone())
        .with_mentions(mentions.clone())
        .with_role(role);
    let decision = decide_on(&query, &agenda)?;
    state.metrics.record_resolution(decision.resolution.reason.as_str());

    Ok(Json(JsonResponse::ok(ResolveResponse {
        session_title: decision.session_title().map(str::to_string),
        agenda_time: decision.agenda_time.format("%H:%M").to_string(),
        resolution: decision.resolution,
        local_time: local_time.to_string(),
        mentioned_topics: mentions,
        role,
    })))
}

// --- Generation ---

#[derive(Deserialize)]
struct SocialMediaPostRequest {
    user_post: String,
    user_role: String,
    social_media_site: String,
    #[serde(default)]
    local_time: Option<String>,
}

#[derive(Serialize)]
struct SocialMediaPostResponse {
    id: String,
    post: String,
    rationale: String,
    current_session: Option<String>,
    reason: MatchReason,
}

async fn generate_social_media_post(
    State(state): State<AppState>,
    Json(req): Json<SocialMediaPostRequest>,
) -> AppResult<Json<JsonResponse<SocialMediaPostResponse>>> {
    let request = PostRequest {
        role: parse_role(Some(req.user_role.as_str()))?,
        local_time: req
            .local_time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(LocalTime::parse)
            .transpose()?,
        user_post: req.user_post,
        site: req.social_media_site,
    };

    let result = state.posts.generate(&request, state.clock.now()).await;
    observe(&state, "post", &result);
    let generated = result?;
    state
        .metrics
        .record_resolution(generated.resolution.reason.as_str());

    Ok(Json(JsonResponse::ok(SocialMediaPostResponse {
        id: generated.id.to_string(),
        post: generated.post,
        rationale: generated.rationale,
        current_session: generated.current_session_title,
        reason: generated.resolution.reason,
    })))
}

#[derive(Deserialize)]
struct ImgGenRequest {
    user_post: String,
    #[serde(default)]
    negative_prompt: Option<String>,
}

async fn generate_image_prompt(
    State(state): State<AppState>,
    Json(req): Json<ImgGenRequest>,
) -> AppResult<Json<JsonResponse<ImagePromptResult>>> {
    let result = state
        .image_prompts
        .generate(&req.user_post, req.negative_prompt.as_deref())
        .await;
    observe(&state, "image-prompt", &result);
    Ok(Json(JsonResponse::ok(result?)))
}

#[derive(Deserialize)]
struct ImgPromptRequest {
    img_prompt: String,
}

#[derive(Serialize)]
struct ImageResponse {
    image_url: String,
}

async fn generate_image(
    State(state): State<AppState>,
    Json(req): Json<ImgPromptRequest>,
) -> AppResult<Json<JsonResponse<ImageResponse>>> {
    let result = state.images.generate(&req.img_prompt).await;
    observe(&state, "image", &result);
    Ok(Json(JsonResponse::ok(ImageResponse {
        image_url: result?.url,
    })))
}

#[derive(Deserialize)]
struct UserTopicsRequest {
    topics: String,
}

async fn get_links_from_topics(
    State(state): State<AppState>,
    Json(req): Json<UserTopicsRequest>,
) -> AppResult<Json<JsonResponse<Vec<String>>>> {
    let result = state.links.find(&req.topics).await;
    observe(&state, "links", &result);
    Ok(Json(JsonResponse::ok(result?)))
}

// --- Metrics ---

async fn metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let uptime = i64::try_from(state.start_time.elapsed().as_secs()).unwrap_or(i64::MAX);
    state.metrics.uptime_seconds.set(uptime);
    state
        .metrics
        .agenda_sessions
        .set(i64::try_from(state.store.snapshot().len()).unwrap_or(i64::MAX));

    let body = state.metrics.render()?;
    Ok((
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    ))
}
