use axum::Router;
use log::*;
use tokio::net::TcpListener;

pub use service::AppState;

pub mod controller;
pub mod error;
mod extractors;
pub mod router;
mod socket;
pub mod templates;
pub mod watch;

pub use controller::view::{OnMount, View};
pub use controller::{Controller, ControllerOptions};
pub use error::{Error, Result};
pub use templates::{TemplateFiles, Templates};

/// Bind the configured interface and port and serve `views` wrapped in the
/// shared routes until the process is stopped.
pub async fn init_server(app_state: AppState, views: Router) -> Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let host = format!("{interface}:{}", app_state.config.port);

    info!("Server starting... listening for connections on http://{host}");

    let listener = TcpListener::bind(&host).await.map_err(Error::transport)?;
    let router = router::define_routes(app_state, views);

    axum::serve(listener, router).await.map_err(Error::transport)
}
