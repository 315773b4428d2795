//! Per-host registry of host models.
//!
//! The registry is an ordinary owned value handed to the analysis by
//! reference. Providers join and leave through explicit `register` /
//! `unregister` calls on the host's [`CompositeHostModel`].

use super::host::{CompositeHostModel, CpuTimeProvider, ProviderId, ThreadOnCpuProvider};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps host identifiers to their composite model
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<CompositeHostModel>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the model for `host_id`, creating an empty one on first use
    pub fn model_for(&self, host_id: &str) -> Arc<CompositeHostModel> {
        if let Some(model) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host_id)
        {
            return Arc::clone(model);
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(models.entry(host_id.to_string()).or_insert_with(|| {
            debug!("Creating host model for {}", host_id);
            Arc::new(CompositeHostModel::new())
        }))
    }

    /// Register a CPU time provider for `host_id`
    pub fn register_cpu_time_provider(
        &self,
        host_id: &str,
        provider: Arc<dyn CpuTimeProvider>,
    ) -> ProviderId {
        self.model_for(host_id).register_cpu_time_provider(provider)
    }

    /// Register a thread-on-CPU provider for `host_id`
    pub fn register_thread_on_cpu_provider(
        &self,
        host_id: &str,
        provider: Arc<dyn ThreadOnCpuProvider>,
    ) -> ProviderId {
        self.model_for(host_id)
            .register_thread_on_cpu_provider(provider)
    }

    /// Remove a provider from `host_id`'s model
    ///
    /// # Returns
    /// `true` if the provider was registered on that host
    pub fn unregister(&self, host_id: &str, id: ProviderId) -> bool {
        let model = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host_id)
            .cloned();
        model.is_some_and(|model| model.unregister(id))
    }

    /// Drop the whole model of `host_id`
    pub fn remove_host(&self, host_id: &str) -> Option<Arc<CompositeHostModel>> {
        let removed = self
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(host_id);
        if removed.is_some() {
            info!("Removed host model for {}", host_id);
        }
        removed
    }

    /// Hosts that currently have a model
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        hosts.sort();
        hosts
    }
}
