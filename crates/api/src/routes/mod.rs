pub mod cards;
pub mod health;
pub mod images;
pub mod logs;
pub mod trigger;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST   /trigger                  start a run (bearer secret, ?city=)
/// GET    /cards                    public gallery feed
/// GET    /logs                     run history (bearer secret)
/// DELETE /logs/{run_id}            remove one run (bearer secret)
/// GET    /images/{key}             image proxy (?token= or same-host referer)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(trigger::router())
        .nest("/cards", cards::router())
        .nest("/logs", logs::router())
        .nest("/images", images::router())
}
