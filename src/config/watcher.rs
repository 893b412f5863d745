//! Hot reload of the config file.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by renaming a temp file over the original are still
//! picked up. Only the seed sections take effect on reload; listener, worker
//! and logging settings are read once at startup.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::GatewayConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive for updates to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut reloader = Reloader {
            path: self.path.clone(),
            last: fs::read_to_string(&self.path).ok(),
            tx: self.update_tx,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if reloader.concerns(&event) => reloader.reload(),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last: Option<String>,
    tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl Reloader {
    fn concerns(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event.paths.iter().any(|p| p.file_name() == self.path.file_name())
    }

    fn reload(&mut self) {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Config file unreadable");
                return;
            }
        };
        // Editors often fire several events per save.
        if self.last.as_deref() == Some(content.as_str()) {
            return;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(
                    event_types = config.seed.event_types.len(),
                    functions = config.seed.functions.len(),
                    subscriptions = config.seed.subscriptions.len(),
                    "Config file changed, reloading seed"
                );
                self.last = Some(content);
                if self.tx.send(config).is_err() {
                    tracing::warn!(path = %self.path.display(), "Config reload dropped, server no longer listening");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Invalid config file, keeping current configuration");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    fn reloader(path: &Path) -> (Reloader, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            last: None,
            tx,
        };
        (reloader, rx)
    }

    #[test]
    fn test_only_the_config_file_concerns_it() {
        let (reloader, _rx) = reloader(Path::new("/etc/gateway/gateway.toml"));
        let ours = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/etc/gateway/gateway.toml".into());
        let other = Event::new(EventKind::Create(CreateKind::File)).add_path("/etc/gateway/other.toml".into());
        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path("/etc/gateway/gateway.toml".into());

        assert!(reloader.concerns(&ours));
        assert!(!reloader.concerns(&other));
        assert!(!reloader.concerns(&removed));
    }

    #[test]
    fn test_reload_skips_unchanged_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let (mut reloader, mut rx) = reloader(&path);

        fs::write(&path, "default_space = \"acme\"").unwrap();
        reloader.reload();
        assert_eq!(rx.try_recv().unwrap().default_space, "acme");

        reloader.reload();
        assert!(rx.try_recv().is_err());

        fs::write(&path, "[dispatch]\nworkers = 0").unwrap();
        reloader.reload();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reload_after_receiver_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let (mut reloader, rx) = reloader(&path);
        drop(rx);

        fs::write(&path, "default_space = \"acme\"").unwrap();
        reloader.reload();
        assert_eq!(reloader.last.as_deref(), Some("default_space = \"acme\""));
        assert!(reloader.tx.is_closed());
    }
}
