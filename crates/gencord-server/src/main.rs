use std::net::SocketAddr;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gencord_api::{auth, channels, rooms};
use gencord_core::App;
use gencord_gateway::connection;
use gencord_gateway::hub::Hub;
use gencord_store::{Store, writer};

#[derive(Clone)]
struct GatewayState {
    app: App,
    hub: Hub,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gencord=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("GENCORD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GENCORD_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let data_path =
        std::env::var("GENCORD_DATA_PATH").unwrap_or_else(|_| "gencord.json".into());

    // Restore the last snapshot and start the write-behind persistence task.
    let store = Store::new(&data_path);
    let snapshot = store.load();
    let (persist_tx, writer_task) = writer::spawn(store.clone());

    let app_state = App::new(snapshot, persist_tx);
    let hub = Hub::new();

    // Routes
    let api_routes = Router::new()
        .route("/channels", get(channels::list_channels))
        .route("/channels/{id}", delete(channels::delete_channel))
        .route("/channels/{id}/messages", get(channels::get_messages))
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/join", post(rooms::join_room))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let ws_route = Router::new().route("/ws", get(ws_upgrade)).with_state(GatewayState {
        app: app_state.clone(),
        hub,
    });

    let app = Router::new()
        .nest("/api", api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gencord listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // Close the writer queue and wait for it to drain before touching the
    // file ourselves: the final write must never race an in-flight one.
    let final_snapshot = app_state.snapshot().await;
    drop(app_state);
    if writer_task.await.is_err() {
        warn!("snapshot writer exited abnormally");
    }
    match store.save(&final_snapshot) {
        Ok(()) => info!("final snapshot written to {}", data_path),
        Err(e) => warn!("final snapshot failed: {:#}", e),
    }

    Ok(())
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state.hub, state.app))
}
