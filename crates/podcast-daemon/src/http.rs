use crate::core::{CoreHandle, Reply};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use podcast_proto::protocol::{Command, EpisodeRef, PROTOCOL_VERSION};
use podcast_proto::view::{self, SortKey};
use podcast_proto::{
    AppState, CatalogError, CatalogStatus, EpisodeId, FavoriteEntry, FavoriteSort, GenreId,
    MediaCommand, PlaybackState, Show, UpdatedAt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    state: Arc<AppState>,
    core: CoreHandle,
    default_sort: SortKey,
}

// ── Response bodies ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Health {
    protocol_version: u32,
    catalog: CatalogStatus,
    generation: u64,
}

#[derive(Serialize)]
struct CatalogPage {
    generation: u64,
    sort: SortKey,
    genre: Option<GenreId>,
    shows: Vec<ShowCard>,
}

/// One row in the browse grid. Seasons stay behind `/api/shows/:id`.
#[derive(Serialize)]
struct ShowCard {
    id: String,
    title: String,
    description: String,
    image_url: String,
    genre_ids: Vec<GenreId>,
    season_count: usize,
    episode_count: usize,
    updated: UpdatedAt,
}

impl From<&Show> for ShowCard {
    fn from(show: &Show) -> Self {
        Self {
            id: show.id.clone(),
            title: show.title.clone(),
            description: show.description.clone(),
            image_url: show.image_url.clone(),
            genre_ids: show.genre_ids.clone(),
            season_count: show.season_count(),
            episode_count: show.episode_count(),
            updated: show.updated,
        }
    }
}

#[derive(Serialize)]
struct ShowGroup {
    show_id: String,
    episodes: Vec<FavoriteEntry>,
}

#[derive(Serialize)]
struct PlaybackView {
    #[serde(flatten)]
    state: PlaybackState,
    progress: f64,
}

impl From<PlaybackState> for PlaybackView {
    fn from(state: PlaybackState) -> Self {
        let progress = state.progress();
        Self { state, progress }
    }
}

/// Outcome of a playback command: what the media element should do, and
/// the state after the transition.
#[derive(Serialize)]
struct PlaybackReply {
    media: Option<MediaCommand>,
    playback: PlaybackView,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        let status = match e {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Network(_) | CatalogError::Decode(_) => StatusCode::BAD_GATEWAY,
            CatalogError::NotLoaded | CatalogError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError(status, e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("HTTP API: core unavailable: {}", e);
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogQuery {
    genre: Option<GenreId>,
    sort: Option<String>,
    q: Option<String>,
}

#[derive(Deserialize)]
struct FavoritesQuery {
    sort: Option<String>,
}

#[derive(Deserialize)]
struct IdentityBody {
    identity: EpisodeId,
}

/// Either a catalog address or a favorite identity.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectBody {
    Favorite { favorite: EpisodeId },
    Episode(EpisodeRef),
}

fn parse_sort<T: std::str::FromStr<Err = String>>(raw: Option<&str>, default: T) -> Result<T, ApiError> {
    match raw {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| ApiError(StatusCode::BAD_REQUEST, e)),
    }
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state: Arc<AppState>,
    core: CoreHandle,
    default_sort: SortKey,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(HttpState {
            state,
            core,
            default_sort,
        });

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn router(app_state: HttpState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/catalog", get(get_catalog))
        .route("/api/catalog/reload", post(reload_catalog))
        .route("/api/genres", get(get_genres))
        .route("/api/shows/:id", get(get_show))
        .route("/api/favorites", get(get_favorites))
        .route("/api/favorites/by-show", get(get_favorites_by_show))
        .route("/api/favorites/toggle", post(toggle_favorite))
        .route("/api/favorites/remove", post(remove_favorite))
        .route("/api/favorites/clear", post(clear_favorites))
        .route("/api/playback", get(get_playback))
        .route("/api/playback/select", post(select))
        .route("/api/playback/toggle-pause", post(toggle_pause))
        .route("/api/playback/seek/:secs", post(seek))
        .route("/api/playback/skip/:delta", post(skip))
        .route("/api/playback/stop", post(stop))
        .route("/api/playback/duration/:secs", post(duration_known))
        .route("/api/playback/position/:secs", post(position_tick))
        .route("/api/playback/ended", post(ended))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// ── Catalog ───────────────────────────────────────────────────────────────────

async fn health(State(state): State<HttpState>) -> Json<Health> {
    let catalog = state.state.catalog().await;
    Json(Health {
        protocol_version: PROTOCOL_VERSION,
        catalog: catalog.status,
        generation: catalog.generation,
    })
}

async fn get_catalog(
    State(state): State<HttpState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogPage>, Response> {
    let sort = parse_sort(query.sort.as_deref(), state.default_sort).map_err(|e| e.into_response())?;
    let catalog = state.state.catalog().await;

    match &catalog.status {
        CatalogStatus::Ready => {}
        CatalogStatus::Failed(message) => {
            let body = ErrorBody {
                error: message.clone(),
            };
            return Err((StatusCode::BAD_GATEWAY, Json(body)).into_response());
        }
        CatalogStatus::Empty | CatalogStatus::Loading => {
            return Err((StatusCode::SERVICE_UNAVAILABLE, Json(catalog.status.clone())).into_response());
        }
    }

    let mut shows = view::project(&catalog.shows, query.genre, sort);
    if let Some(q) = query.q.as_deref() {
        shows = view::search(shows, q);
    }

    Ok(Json(CatalogPage {
        generation: catalog.generation,
        sort,
        genre: query.genre,
        shows: shows.into_iter().map(ShowCard::from).collect(),
    }))
}

async fn reload_catalog(State(state): State<HttpState>) -> Result<StatusCode, ApiError> {
    info!("HTTP API: Reload catalog");
    state.core.request(Command::ReloadCatalog).await??;
    Ok(StatusCode::ACCEPTED)
}

async fn get_genres(State(state): State<HttpState>) -> Json<Vec<GenreId>> {
    let catalog = state.state.catalog().await;
    Json(view::genres(&catalog.shows))
}

async fn get_show(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<Show>, Response> {
    match state.state.show(&id).await {
        Ok(show) => Ok(Json(show)),
        Err(CatalogError::NotLoaded) => {
            let status = state.state.catalog().await.status;
            Err((StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response())
        }
        Err(e) => Err(ApiError::from(e).into_response()),
    }
}

// ── Favorites ─────────────────────────────────────────────────────────────────

async fn get_favorites(
    State(state): State<HttpState>,
    Query(query): Query<FavoritesQuery>,
) -> ApiResult<Vec<FavoriteEntry>> {
    let favorites = state.state.favorites().await;
    let entries = match query.sort.as_deref() {
        None | Some("") => favorites.entries().to_vec(),
        raw => {
            let sort = parse_sort(raw, FavoriteSort::default())?;
            favorites.sorted(sort).into_iter().cloned().collect()
        }
    };
    Ok(Json(entries))
}

async fn get_favorites_by_show(State(state): State<HttpState>) -> Json<Vec<ShowGroup>> {
    let favorites = state.state.favorites().await;
    let groups = favorites
        .by_show()
        .into_iter()
        .map(|(show_id, entries)| ShowGroup {
            show_id: show_id.to_string(),
            episodes: entries.into_iter().cloned().collect(),
        })
        .collect();
    Json(groups)
}

async fn favorites_reply(state: &HttpState, command: Command) -> ApiResult<Vec<FavoriteEntry>> {
    match state.core.request(command).await?? {
        Reply::Favorites(favorites) => Ok(Json(favorites.entries().to_vec())),
        _ => Ok(Json(state.state.favorites().await.entries().to_vec())),
    }
}

async fn toggle_favorite(
    State(state): State<HttpState>,
    Json(episode): Json<EpisodeRef>,
) -> ApiResult<Vec<FavoriteEntry>> {
    info!("HTTP API: Toggle favorite {}", episode.identity());
    favorites_reply(&state, Command::ToggleFavorite { episode }).await
}

async fn remove_favorite(
    State(state): State<HttpState>,
    Json(body): Json<IdentityBody>,
) -> ApiResult<Vec<FavoriteEntry>> {
    info!("HTTP API: Remove favorite {}", body.identity);
    favorites_reply(
        &state,
        Command::RemoveFavorite {
            identity: body.identity,
        },
    )
    .await
}

async fn clear_favorites(State(state): State<HttpState>) -> ApiResult<Vec<FavoriteEntry>> {
    info!("HTTP API: Clear favorites");
    favorites_reply(&state, Command::ClearFavorites).await
}

// ── Playback ──────────────────────────────────────────────────────────────────

async fn get_playback(State(state): State<HttpState>) -> Json<PlaybackView> {
    Json(state.state.playback().await.into())
}

async fn playback_reply(state: &HttpState, command: Command) -> ApiResult<PlaybackReply> {
    let media = match state.core.request(command).await?? {
        Reply::Media(media) => media,
        _ => None,
    };
    Ok(Json(PlaybackReply {
        media,
        playback: state.state.playback().await.into(),
    }))
}

async fn select(State(state): State<HttpState>, Json(body): Json<SelectBody>) -> ApiResult<PlaybackReply> {
    let command = match body {
        SelectBody::Favorite { favorite } => {
            info!("HTTP API: Play favorite {}", favorite);
            Command::SelectFavorite { identity: favorite }
        }
        SelectBody::Episode(episode) => {
            info!("HTTP API: Play {}", episode.identity());
            Command::Select { episode }
        }
    };
    playback_reply(&state, command).await
}

async fn toggle_pause(State(state): State<HttpState>) -> ApiResult<PlaybackReply> {
    info!("HTTP API: Toggle pause");
    playback_reply(&state, Command::TogglePause).await
}

async fn seek(State(state): State<HttpState>, Path(secs): Path<f64>) -> ApiResult<PlaybackReply> {
    info!("HTTP API: Seek to {}s", secs);
    playback_reply(&state, Command::Seek { seconds: secs }).await
}

async fn skip(State(state): State<HttpState>, Path(delta): Path<f64>) -> ApiResult<PlaybackReply> {
    info!("HTTP API: Skip {}s", delta);
    playback_reply(&state, Command::Skip { seconds: delta }).await
}

async fn stop(State(state): State<HttpState>) -> ApiResult<PlaybackReply> {
    info!("HTTP API: Stop");
    playback_reply(&state, Command::Stop).await
}

async fn duration_known(State(state): State<HttpState>, Path(secs): Path<f64>) -> ApiResult<PlaybackReply> {
    playback_reply(&state, Command::DurationKnown { seconds: secs }).await
}

async fn position_tick(State(state): State<HttpState>, Path(secs): Path<f64>) -> ApiResult<PlaybackReply> {
    playback_reply(&state, Command::PositionTick { seconds: secs }).await
}

async fn ended(State(state): State<HttpState>) -> ApiResult<PlaybackReply> {
    playback_reply(&state, Command::Ended).await
}
