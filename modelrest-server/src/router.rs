//! Router configuration for the resource API.

use axum::{
    Router,
    routing::{MethodRouter, get},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

/// Creates the application router.
///
/// The collection path answers with and without a trailing slash. Paths of any other
/// shape, and methods a path does not serve, fall through to a 404 `ErrorMessage`.
pub fn create_router(state: AppState) -> Router {
    let collection = || -> MethodRouter<AppState> {
        get(handlers::list_records)
            .post(handlers::create_record)
            .put(handlers::replace_record_from_body)
    };

    Router::new()
        .route("/{resource}", collection())
        .route("/{resource}/", collection())
        .route(
            "/{resource}/{id}",
            get(handlers::get_record)
                .patch(handlers::patch_record)
                .put(handlers::replace_record)
                .delete(handlers::delete_record),
        )
        .fallback(handlers::route_not_found)
        .method_not_allowed_fallback(handlers::method_not_routed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
