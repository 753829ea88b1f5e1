//! Injected collaborator bundle and application bootstrap.
//!
//! A [`Context`] carries everything an entity needs to talk to the outside
//! world: the store dispatch contract, the remote API, the error channel,
//! navigation, and the reference catalog. Entities receive it at construction
//! and clone it freely; nothing is reached through ambient state.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error};

use crate::api::RemoteApi;
use crate::catalog::{Catalog, StatusRecord, TypeRecord};
use crate::error::{ErrorChannel, JotterError, Result};
use crate::store::{Action, StateStore};

/// Location replacement after a note's first successful create.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn StateStore>,
    pub api: Arc<dyn RemoteApi>,
    pub errors: Arc<dyn ErrorChannel>,
    pub navigator: Arc<dyn Navigator>,
    pub catalog: Arc<RwLock<Catalog>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        store: Arc<dyn StateStore>,
        api: Arc<dyn RemoteApi>,
        errors: Arc<dyn ErrorChannel>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            api,
            errors,
            navigator,
            catalog: Arc::new(RwLock::new(Catalog::default())),
        }
    }

    /// Application bootstrap: reset scroll state, load the reference catalog,
    /// then clear the init-loading flag whether or not loading succeeded.
    pub async fn init_application(&self) -> Result<()> {
        self.store
            .dispatch(Action::SetMainListScrollTop(0.0))
            .await?;

        if let Err(err) = self.load_reference_data().await {
            error!(error = %err, "failed to load reference data");
            self.errors.report(err.report());
        }

        self.store
            .dispatch(Action::SetIsInitInfoLoading(false))
            .await
    }

    /// Fetch types and statuses from the remote API into the catalog.
    pub async fn load_reference_data(&self) -> Result<()> {
        let types = self.api.get_types().await?;
        let statuses = self.api.get_statuses().await?;

        let mut catalog = self
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(
            types = types.len(),
            statuses = statuses.len(),
            "reference catalog loaded"
        );
        catalog.set_types(types);
        catalog.set_statuses(statuses);
        Ok(())
    }

    pub fn resolve_type_by_id(&self, id: i64) -> Result<TypeRecord> {
        let found = self.read_catalog(|c| c.type_by_id(id).cloned());
        found.ok_or_else(|| self.missing(format!("Type '{}' not found", id)))
    }

    pub fn resolve_status_by_id(&self, id: i64) -> Result<StatusRecord> {
        let found = self.read_catalog(|c| c.status_by_id(id).cloned());
        found.ok_or_else(|| self.missing(format!("Status '{}' not found", id)))
    }

    pub fn resolve_type_by_name(&self, name: &str) -> Result<TypeRecord> {
        let found = self.read_catalog(|c| c.type_by_name(name).cloned());
        found.ok_or_else(|| self.missing(format!("Type '{}' not found", name)))
    }

    pub fn resolve_status_by_name(&self, name: &str) -> Result<StatusRecord> {
        let found = self.read_catalog(|c| c.status_by_name(name).cloned());
        found.ok_or_else(|| self.missing(format!("Status '{}' not found", name)))
    }

    /// The default type for new notes.
    pub fn resolve_default_type(&self) -> Result<TypeRecord> {
        let found = self.read_catalog(|c| c.default_type().cloned());
        found.ok_or_else(|| self.missing("Default type not found".to_string()))
    }

    /// The default status for new notes.
    pub fn resolve_active_status(&self) -> Result<StatusRecord> {
        let found = self.read_catalog(|c| c.active_status().cloned());
        found.ok_or_else(|| self.missing("Default status not found".to_string()))
    }

    fn read_catalog<T>(&self, f: impl FnOnce(&Catalog) -> T) -> T {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        f(&catalog)
    }

    /// A reference miss is a data-integrity failure: report it and hand the
    /// caller an error that aborts entity construction.
    fn missing(&self, message: String) -> JotterError {
        error!(%message, "reference catalog miss");
        let err = JotterError::ReferenceNotFound(message);
        self.errors.report(err.report());
        err
    }
}
