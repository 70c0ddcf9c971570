use config::Config;
use domain::{UserIdAllocator, UserRegistry};
use fanout::Manager;
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Process-wide state shared by every controller and socket session.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub topics: Arc<Manager>,
    pub users: Arc<UserRegistry>,
    pub user_ids: Arc<UserIdAllocator>,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        info!(
            "Controller {} starting (development mode: {})",
            app_config.app_name(),
            app_config.development_mode
        );
        Self {
            config: app_config,
            topics: Arc::new(Manager::new()),
            users: Arc::new(UserRegistry::new()),
            user_ids: Arc::new(UserIdAllocator::new()),
        }
    }

    pub fn topics_ref(&self) -> &Manager {
        self.topics.as_ref()
    }

    pub fn users_ref(&self) -> &UserRegistry {
        self.users.as_ref()
    }
}
