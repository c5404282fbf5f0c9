//! Application-wide dispatch state.
//!
//! # Responsibilities
//! - Own the resource registry and the installed mapping table
//! - Rebuild the mapping from the configuration closure (reset / reload)
//! - Hold the hot-swappable dispatch settings
//! - Provide the global lock used when dispatch is synchronized
//!
//! # Design Decisions
//! - The mapping is replaced atomically (`ArcSwap`); in-flight requests keep
//!   the table they started with
//! - A failed rebuild leaves the previous table installed

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::config::DispatchConfig;
use crate::error::MappingError;
use crate::resource::ResourceRegistry;
use crate::routing::mapping::MappingTable;

/// Configuration code that fills a fresh mapping table.
pub type Configurator = dyn Fn(&mut MappingTable) -> Result<(), MappingError> + Send + Sync;

pub struct Application {
    resources: Arc<ResourceRegistry>,
    mapping: ArcSwap<MappingTable>,
    settings: ArcSwap<DispatchConfig>,
    configurator: Mutex<Option<Arc<Configurator>>>,
    lock: Mutex<()>,
}

impl Application {
    pub fn new(resources: ResourceRegistry, settings: DispatchConfig) -> Self {
        let resources = Arc::new(resources);
        let mapping = MappingTable::new(resources.clone());
        Self {
            resources,
            mapping: ArcSwap::from_pointee(mapping),
            settings: ArcSwap::from_pointee(settings),
            configurator: Mutex::new(None),
            lock: Mutex::new(()),
        }
    }

    pub fn resources(&self) -> &Arc<ResourceRegistry> {
        &self.resources
    }

    /// The currently installed mapping table.
    pub fn mapping(&self) -> Arc<MappingTable> {
        self.mapping.load_full()
    }

    pub fn settings(&self) -> Arc<DispatchConfig> {
        self.settings.load_full()
    }

    pub fn update_settings(&self, settings: DispatchConfig) {
        tracing::info!(
            synchronize = settings.synchronize,
            debug = settings.debug,
            "Dispatch settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Build the mapping from `configure` and remember it for reloads.
    pub fn configure<F>(&self, configure: F) -> Result<(), MappingError>
    where
        F: Fn(&mut MappingTable) -> Result<(), MappingError> + Send + Sync + 'static,
    {
        let configure: Arc<Configurator> = Arc::new(configure);
        self.rebuild(configure.as_ref())?;
        *self.configurator() = Some(configure);
        Ok(())
    }

    /// Re-run the remembered configuration into a fresh table.
    pub fn reload(&self) -> Result<(), MappingError> {
        let configure = self.configurator().clone();
        match configure {
            Some(configure) => self.rebuild(configure.as_ref()),
            None => Ok(()),
        }
    }

    /// Forget the configuration and install an empty table.
    pub fn reset(&self) {
        *self.configurator() = None;
        self.mapping
            .store(Arc::new(MappingTable::new(self.resources.clone())));
        tracing::debug!("Mapping reset");
    }

    /// Hold the global dispatch lock. A poisoned lock is recovered since the
    /// guarded data is `()`.
    pub(crate) fn serialize(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configurator(&self) -> MutexGuard<'_, Option<Arc<Configurator>>> {
        self.configurator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn rebuild(&self, configure: &Configurator) -> Result<(), MappingError> {
        let mut mapping = MappingTable::new(self.resources.clone());
        configure(&mut mapping)?;
        tracing::debug!(actions = mapping.actions().len(), "Mapping installed");
        self.mapping.store(Arc::new(mapping));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::routing::Route;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_configure_installs_mapping() {
        let app = Application::new(ResourceRegistry::default(), DispatchConfig::default());
        assert!(app.mapping().is_empty());

        app.configure(|mapping| {
            mapping.register(Route::get("/").to(|_| Ok("home".into())))?;
            Ok(())
        })
        .unwrap();
        assert!(app.mapping().resolve(&Request::get("/").unwrap()).is_ok());
    }

    #[test]
    fn test_reload_reruns_configuration() {
        let app = Application::new(ResourceRegistry::default(), DispatchConfig::default());
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        app.configure(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        app.reload().unwrap();
        app.reload().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failed_configure_keeps_previous_mapping() {
        let app = Application::new(ResourceRegistry::default(), DispatchConfig::default());
        app.configure(|mapping| {
            mapping.register(Route::get("/").to(|_| Ok(String::new())))?;
            Ok(())
        })
        .unwrap();

        let err = app.configure(|mapping| {
            mapping.register(Route::get("/{"))?;
            Ok(())
        });
        assert!(err.is_err());
        assert_eq!(app.mapping().actions().len(), 1);
    }

    #[test]
    fn test_reset() {
        let app = Application::new(ResourceRegistry::default(), DispatchConfig::default());
        app.configure(|mapping| {
            mapping.register(Route::get("/").to(|_| Ok(String::new())))?;
            Ok(())
        })
        .unwrap();

        app.reset();
        assert!(app.mapping().is_empty());
        app.reload().unwrap();
        assert!(app.mapping().is_empty());
    }
}
