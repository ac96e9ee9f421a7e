use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

use crate::server::app::AppState;

pub async fn show_home(State(state): State<AppState>) -> Response {
    render(&state, "/").await
}

pub async fn show_page(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    render(&state, &path).await
}

async fn render(state: &AppState, path: &str) -> Response {
    match state.loader.load(path).await {
        Ok(page) => Html(page.html).into_response(),
        Err(err) if err.is_not_found() => {
            debug!("No page for '{}': {}", path, err);
            (StatusCode::NOT_FOUND, Html("<h1>Page not found</h1>".to_string())).into_response()
        }
        Err(err) => err.into_response(),
    }
}
