use axum::{
    Router,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    routing::get,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::storage::Store;

pub mod routes;

/// Server state
pub struct AppState {
    pub store: Store,
}

/// Build the `/api` router over `store`.
pub fn router(store: Store) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/api", get(routes::help))
        .route(
            "/api/topics",
            get(routes::list_topics)
                .post(routes::create_topic)
                .patch(routes::update_topic),
        )
        .route("/api/topics/{id}", get(routes::get_topic))
        .route("/api/topics/{id}/books", get(routes::books_of_topic))
        .route("/api/topics/{id}/quotes", get(routes::quotes_of_topic))
        .route(
            "/api/authors",
            get(routes::list_authors)
                .post(routes::create_author)
                .patch(routes::update_author),
        )
        .route("/api/authors/{id}", get(routes::get_author))
        .route("/api/authors/{id}/books", get(routes::books_of_author))
        .route("/api/authors/{id}/quotes", get(routes::quotes_of_author))
        .route(
            "/api/languages",
            get(routes::list_languages)
                .post(routes::create_language)
                .patch(routes::update_language),
        )
        .route("/api/languages/{id}", get(routes::get_language))
        .route("/api/languages/{id}/books", get(routes::books_of_language))
        .route("/api/languages/{id}/quotes", get(routes::quotes_of_language))
        .route(
            "/api/books",
            get(routes::list_books)
                .post(routes::create_book)
                .patch(routes::update_book),
        )
        .route("/api/books/{id}", get(routes::get_book))
        .route("/api/books/{id}/quotes", get(routes::quotes_of_book))
        .route(
            "/api/quotes",
            get(routes::list_quotes)
                .post(routes::create_quote)
                .patch(routes::update_quote),
        )
        .route("/api/quotes/{id}", get(routes::get_quote))
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Requests running longer than `timeout` answer 408.
fn with_timeout(app: Router, timeout: Duration) -> Router {
    app.layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
}

/// Serve the API until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    store: Store,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = with_timeout(router(store), config.timeout());

    let addr: SocketAddr = config.socket_addr().parse()?;
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}/api", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
