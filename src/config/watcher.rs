//! Hot reload of the `[dispatch]` section.
//!
//! The watcher remembers the last accepted configuration. On every file
//! change it reloads, validates and compares: only a changed `[dispatch]`
//! section is forwarded, and edits to restart-only sections are reported
//! once and otherwise ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{AppConfig, DispatchConfig};

/// What a reloaded file means for a running server.
#[derive(Debug, Default, PartialEq)]
pub struct Reload {
    /// New dispatch settings, if they differ from the running ones.
    pub dispatch: Option<DispatchConfig>,
    /// Sections that changed but only take effect after a restart.
    pub restart_required: Vec<&'static str>,
}

impl Reload {
    /// Compare the running configuration with a freshly loaded one.
    pub fn between(current: &AppConfig, next: &AppConfig) -> Self {
        let mut restart_required = Vec::new();
        if current.listener != next.listener {
            restart_required.push("listener");
        }
        if current.timeouts != next.timeouts {
            restart_required.push("timeouts");
        }
        if current.observability != next.observability {
            restart_required.push("observability");
        }

        Self {
            dispatch: (current.dispatch != next.dispatch).then(|| next.dispatch.clone()),
            restart_required,
        }
    }
}

/// Watches the configuration file and streams dispatch settings.
pub struct ConfigWatcher {
    path: PathBuf,
    current: AppConfig,
    update_tx: mpsc::UnboundedSender<DispatchConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration the server started with. Returns the
    /// watcher and a receiver of changed dispatch settings.
    pub fn new(path: &Path, current: AppConfig) -> (Self, mpsc::UnboundedReceiver<DispatchConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let next = match load_config(&path) {
                        Ok(next) => next,
                        Err(e) => {
                            tracing::error!(error = %e, "Config reload rejected, keeping current settings");
                            return;
                        }
                    };

                    let reload = Reload::between(&current, &next);
                    if !reload.restart_required.is_empty() {
                        tracing::warn!(
                            sections = ?reload.restart_required,
                            "Config sections changed that need a restart"
                        );
                    }
                    if let Some(dispatch) = reload.dispatch {
                        tracing::info!(path = ?path, "Dispatch settings changed, reloading");
                        if update_tx.send(dispatch).is_err() {
                            tracing::debug!("Dispatch settings receiver dropped");
                        }
                    }
                    current = next;
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}
