use axum::Router;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;
use web::{Controller, View};

mod counter;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    let app_state = AppState::new(config);

    let views = match routes(app_state.clone()) {
        Ok(views) => views,
        Err(e) => {
            error!("Failed to build views: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state, views).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

fn routes(app_state: AppState) -> web::Result<Router> {
    let controller = Arc::new(Controller::new(app_state)?);

    let counter = View::new("./templates/counter.html")
        .on_mount(counter::mount)
        .catch_all(counter::Counter);

    Ok(Router::new().route("/", controller.handler(counter)?))
}
