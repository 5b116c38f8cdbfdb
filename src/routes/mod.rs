use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod health;
pub mod moderate;
pub mod participate;
pub mod sse;
pub mod visit;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(visit::router(state.clone()))
        .merge(participate::router(state.clone()))
        .merge(auth::router(state.clone()))
        .merge(moderate::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
