//! Host model: CPU-time and thread-on-CPU facts supplied by other analyses.
//!
//! A [`CompositeHostModel`] holds an explicitly owned list of providers.
//! Queries use a first-responder policy: providers are asked in registration
//! order and the first answer that is not a sentinel wins. Answers are never
//! summed across providers.

use crate::utils::config::{TIME_UNKNOWN, UNKNOWN_TID};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Source of the CPU time a thread spent in a time range
pub trait CpuTimeProvider: Send + Sync {
    /// CPU time of `tid` within `[start, end)`, or `TIME_UNKNOWN`
    fn cpu_time(&self, tid: i32, start: i64, end: i64) -> i64;
}

/// Source of the thread running on a CPU at a given time
pub trait ThreadOnCpuProvider: Send + Sync {
    /// Thread running on `cpu` at `time`, or `UNKNOWN_TID`
    fn thread_on_cpu_at(&self, cpu: u32, time: i64) -> i32;
}

/// Read-only view over the facts known about one host
pub trait HostModel: Send + Sync {
    /// CPU time of `tid` within `[start, end)`, or `TIME_UNKNOWN`
    fn cpu_time(&self, tid: i32, start: i64, end: i64) -> i64;

    /// Thread running on `cpu` at `time`, or `UNKNOWN_TID`
    fn thread_on_cpu(&self, cpu: u32, time: i64) -> i32;
}

/// Identifier returned when a provider is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

struct Registered<P: ?Sized> {
    id: ProviderId,
    provider: Arc<P>,
}

/// Host model composed of registered providers
#[derive(Default)]
pub struct CompositeHostModel {
    cpu_time_providers: RwLock<Vec<Registered<dyn CpuTimeProvider>>>,
    thread_on_cpu_providers: RwLock<Vec<Registered<dyn ThreadOnCpuProvider>>>,
    next_id: AtomicU64,
}

impl CompositeHostModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_provider_id(&self) -> ProviderId {
        ProviderId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a CPU time provider, queried after those already present
    pub fn register_cpu_time_provider(&self, provider: Arc<dyn CpuTimeProvider>) -> ProviderId {
        let id = self.next_provider_id();
        self.cpu_time_providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered { id, provider });
        debug!("Registered CPU time provider {:?}", id);
        id
    }

    /// Register a thread-on-CPU provider, queried after those already present
    pub fn register_thread_on_cpu_provider(
        &self,
        provider: Arc<dyn ThreadOnCpuProvider>,
    ) -> ProviderId {
        let id = self.next_provider_id();
        self.thread_on_cpu_providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered { id, provider });
        debug!("Registered thread-on-CPU provider {:?}", id);
        id
    }

    /// Remove a provider of either kind
    ///
    /// # Returns
    /// `true` if a provider with this id was registered
    pub fn unregister(&self, id: ProviderId) -> bool {
        let removed_cpu = remove_provider(&self.cpu_time_providers, id);
        let removed_thread = remove_provider(&self.thread_on_cpu_providers, id);
        if removed_cpu || removed_thread {
            debug!("Unregistered provider {:?}", id);
        }
        removed_cpu || removed_thread
    }

    pub fn cpu_time_provider_count(&self) -> usize {
        self.cpu_time_providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn thread_on_cpu_provider_count(&self) -> usize {
        self.thread_on_cpu_providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_time_provider_count() == 0 && self.thread_on_cpu_provider_count() == 0
    }
}

fn remove_provider<P: ?Sized>(providers: &RwLock<Vec<Registered<P>>>, id: ProviderId) -> bool {
    let mut providers = providers.write().unwrap_or_else(PoisonError::into_inner);
    let before = providers.len();
    providers.retain(|registered| registered.id != id);
    providers.len() != before
}

impl HostModel for CompositeHostModel {
    fn cpu_time(&self, tid: i32, start: i64, end: i64) -> i64 {
        let providers = self
            .cpu_time_providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers
            .iter()
            .map(|registered| registered.provider.cpu_time(tid, start, end))
            .find(|&cpu_time| cpu_time != TIME_UNKNOWN)
            .unwrap_or(TIME_UNKNOWN)
    }

    fn thread_on_cpu(&self, cpu: u32, time: i64) -> i32 {
        let providers = self
            .thread_on_cpu_providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers
            .iter()
            .map(|registered| registered.provider.thread_on_cpu_at(cpu, time))
            .find(|&tid| tid != UNKNOWN_TID)
            .unwrap_or(UNKNOWN_TID)
    }
}

impl std::fmt::Debug for CompositeHostModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHostModel")
            .field("cpu_time_providers", &self.cpu_time_provider_count())
            .field("thread_on_cpu_providers", &self.thread_on_cpu_provider_count())
            .finish()
    }
}
