//! The mount/upgrade dispatcher.
//!
//! Every view route is served by one handler. A plain request mounts the page
//! and seeds the user's store with the mount data; an upgrade request turns
//! into a socket session over that store which reads events until the socket
//! closes.

pub mod view;

use crate::error::Result;
use crate::extractors::user_identity::UserIdentity;
use crate::socket::handler::serve;
use crate::socket::session::{SessionOptions, SocketSession};
use crate::templates::DEFAULT_EXTENSIONS;
use crate::watch::TemplateWatcher;
use axum::{
    extract::{FromRequestParts, Request, WebSocketUpgrade},
    http::{header, request::Parts, HeaderMap},
    response::{Html, IntoResponse, Response},
    routing::{any, MethodRouter},
};
use domain::{Dom, DomOptions, UserId};
use fanout::ConnectionId;
use log::*;
use parking_lot::Mutex;
use service::{config::Config, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use view::{LiveView, View};

/// Maps a request to the topic its socket subscribes to.
pub type TopicResolver = Arc<dyn Fn(&Parts) -> String + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub debug_log: bool,
    pub format_html: bool,
    pub disable_template_cache: bool,
    pub enable_watch: bool,
    pub watch_paths: Vec<PathBuf>,
    pub per_connection_topics: bool,
    pub layout: PathBuf,
    pub layout_content_name: String,
    pub partials: Vec<PathBuf>,
    pub extensions: Vec<String>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debug_log: false,
            format_html: false,
            disable_template_cache: false,
            enable_watch: false,
            watch_paths: vec![PathBuf::from("./templates")],
            per_connection_topics: false,
            layout: PathBuf::from("./templates/layouts/index.html"),
            layout_content_name: "content".to_string(),
            partials: vec![PathBuf::from("./templates/partials")],
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ControllerOptions {
    /// Development mode is already folded into the config accessors.
    pub fn from_config(config: &Config) -> Self {
        Self {
            debug_log: config.debug_log(),
            format_html: config.enable_html_formatting(),
            disable_template_cache: config.disable_template_cache(),
            enable_watch: config.enable_watch(),
            watch_paths: config.watch_paths.iter().map(PathBuf::from).collect(),
            per_connection_topics: config.per_connection_topics,
            layout: PathBuf::from(&config.layout),
            layout_content_name: config.layout_content_name.clone(),
            partials: config.partials.iter().map(PathBuf::from).collect(),
            extensions: config.extensions.clone(),
        }
    }

    fn dom_options(&self) -> DomOptions {
        DomOptions {
            format_html: self.format_html,
            debug_log: self.debug_log,
        }
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            debug_log: self.debug_log,
            disable_template_cache: self.disable_template_cache,
        }
    }
}

pub struct Controller {
    options: ControllerOptions,
    app_state: AppState,
    topic_resolver: TopicResolver,
    _watcher: Option<Mutex<TemplateWatcher>>,
}

impl Controller {
    /// Build a controller from the application config. Starts the template
    /// watcher when watching is enabled, so it must run inside a tokio runtime.
    pub fn new(app_state: AppState) -> Result<Self> {
        let options = ControllerOptions::from_config(&app_state.config);
        Self::with_options(app_state, options)
    }

    pub fn with_options(app_state: AppState, options: ControllerOptions) -> Result<Self> {
        let watcher = if options.enable_watch {
            let watcher = TemplateWatcher::start(
                Arc::clone(&app_state.topics),
                &options.watch_paths,
            )?;
            Some(Mutex::new(watcher))
        } else {
            None
        };

        let topic_resolver: TopicResolver = if options.per_connection_topics {
            Arc::new(per_connection_topic)
        } else {
            Arc::new(default_topic)
        };

        info!(
            "Created controller {} with options {options:?}",
            app_state.config.app_name()
        );

        Ok(Self {
            options,
            app_state,
            topic_resolver,
            _watcher: watcher,
        })
    }

    pub fn with_topic_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.topic_resolver = Arc::new(resolver);
        self
    }

    /// Compile `view` and return the handler serving both its mount and its
    /// socket. Template compilation errors are returned here, at startup.
    pub fn handler(self: &Arc<Self>, view: View) -> Result<MethodRouter> {
        let view = Arc::new(view.compile(&self.options)?);
        let controller = Arc::clone(self);

        Ok(any(
            move |UserIdentity(user_id): UserIdentity, request: Request| {
                let controller = Arc::clone(&controller);
                let view = Arc::clone(&view);
                async move { controller.dispatch(view, user_id, request).await }
            },
        ))
    }

    async fn dispatch(&self, view: Arc<LiveView>, user_id: UserId, request: Request) -> Response {
        let (mut parts, _body) = request.into_parts();

        if !is_upgrade_request(&parts.headers) {
            return self.mount(&view, user_id, &parts).await;
        }

        match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => self.upgrade(upgrade, view, user_id, &parts),
            Err(rejection) => {
                warn!(
                    "Rejected socket upgrade on {}: {rejection}",
                    parts.uri.path()
                );
                rejection.into_response()
            }
        }
    }

    async fn mount(&self, view: &LiveView, user_id: UserId, parts: &Parts) -> Response {
        debug!("Mounting {} for user {user_id}", parts.uri.path());

        let mounted = view
            .mount(
                parts,
                self.app_state.config.app_name(),
                self.options.disable_template_cache,
            )
            .await;

        if let Some(data) = mounted.data {
            let store = self.app_state.users.get_or_create(user_id);
            if let Err(e) = store.put(data) {
                error!("Failed seeding store for user {user_id}: {e}");
            }
        }

        (mounted.status, Html(mounted.body)).into_response()
    }

    fn upgrade(
        &self,
        upgrade: WebSocketUpgrade,
        view: Arc<LiveView>,
        user_id: UserId,
        parts: &Parts,
    ) -> Response {
        let topic = (self.topic_resolver)(parts);
        let store = self.app_state.users.get_or_create(user_id);

        let dom = Dom::new(
            Arc::clone(&self.app_state.topics),
            Some(topic.clone()),
            store,
            Arc::clone(&view.templates) as Arc<dyn domain::Renderer>,
            self.options.dom_options(),
        );
        let session = SocketSession::new(view, dom, self.options.session_options());
        let manager = Arc::clone(&self.app_state.topics);

        upgrade.on_upgrade(move |socket| async move {
            debug!("User {user_id} subscribing to topic {topic}");
            serve(socket, manager, topic, session).await;
        })
    }
}

/// `/` subscribes to `root`; any other path to itself with `/` replaced by `_`.
pub fn topic_for_path(path: &str) -> String {
    if path == "/" {
        "root".to_string()
    } else {
        path.replace('/', "_")
    }
}

pub fn default_topic(parts: &Parts) -> String {
    topic_for_path(parts.uri.path())
}

/// A private topic per socket, salted with the handshake key.
pub fn per_connection_topic(parts: &Parts) -> String {
    let salt = parts
        .headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|key| key.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| ConnectionId::new().as_str().to_string());
    format!("{}_{salt}", default_topic(parts))
}

/// `Connection: Upgrade` and `Upgrade: websocket`, case-insensitively.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("websocket"));

    connection_upgrade && upgrade_websocket
}
