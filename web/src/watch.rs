//! Reloads every connected page when a template file changes.

use crate::error::{Error, Result};
use fanout::{Manager, Operation};
use log::*;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period after a reload; changes arriving during it are coalesced.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_secs(1);

pub struct TemplateWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl TemplateWatcher {
    /// Watch `paths` recursively. Missing paths are skipped with a warning.
    /// Must be called from within a tokio runtime.
    pub fn start(manager: Arc<Manager>, paths: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => error!("Template watcher error: {e}"),
        })
        .map_err(Error::watch)?;

        for path in paths {
            if !path.exists() {
                warn!("Not watching {}: path does not exist", path.display());
                continue;
            }
            watcher
                .watch(path, RecursiveMode::Recursive)
                .map_err(Error::watch)?;
            info!("Watching {} for template changes", path.display());
        }

        let task = tokio::spawn(forward_reloads(rx, manager, RELOAD_DEBOUNCE));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for TemplateWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_template_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

async fn forward_reloads(
    mut rx: mpsc::UnboundedReceiver<Event>,
    manager: Arc<Manager>,
    debounce: Duration,
) {
    while let Some(event) = rx.recv().await {
        if !is_template_change(&event.kind) {
            continue;
        }
        info!("Templates changed ({:?}), reloading connected pages", event.paths);
        manager.send_to_all(Operation::reload());

        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message as Frame;
    use fanout::Connection;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind) -> Event {
        Event::new(kind).add_path(PathBuf::from("templates/count.html"))
    }

    #[test]
    fn only_create_modify_remove_count_as_changes() {
        assert!(is_template_change(&EventKind::Create(CreateKind::File)));
        assert!(is_template_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_template_change(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_template_change(&EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test]
    async fn a_burst_of_changes_sends_one_reload_to_every_topic() {
        let manager = Arc::new(Manager::new());
        let (root, mut root_rx) = Connection::channel();
        let (cart, mut cart_rx) = Connection::channel();
        manager.register_connection("root", root);
        manager.register_connection("_cart", cart);

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(event(EventKind::Access(AccessKind::Any))).unwrap();
        tx.send(event(EventKind::Modify(ModifyKind::Any))).unwrap();
        tx.send(event(EventKind::Modify(ModifyKind::Any))).unwrap();
        tx.send(event(EventKind::Create(CreateKind::File))).unwrap();
        drop(tx);

        forward_reloads(rx, Arc::clone(&manager), Duration::from_millis(10)).await;

        for rx in [&mut root_rx, &mut cart_rx] {
            let Ok(Frame::Text(text)) = rx.try_recv() else {
                panic!("expected a reload frame");
            };
            let operation: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(operation["op"], "reload");
            assert!(rx.try_recv().is_err());
        }
    }
}
