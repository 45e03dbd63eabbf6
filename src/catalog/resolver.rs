use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::{CatalogClient, CatalogResponse, MetadataRecord, ResolveError};
use crate::config::RetryConfig;
use crate::work::number::WorkNumber;

type Slot = Arc<Mutex<Option<Arc<MetadataRecord>>>>;

/// Resolves work numbers to metadata, following at most one redirect hop.
///
/// Successful resolutions are cached for the lifetime of the resolver, keyed
/// by the requested identifier. Callers asking for the same identifier
/// concurrently wait on one shared slot, so a single fetch is in flight.
pub struct CatalogResolver<C> {
    client: C,
    retry: RetryConfig,
    cache: Mutex<HashMap<WorkNumber, Slot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: CatalogClient> CatalogResolver<C> {
    pub fn new(client: C, retry: RetryConfig) -> Self {
        Self {
            client,
            retry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn resolve(&self, work: &WorkNumber) -> Result<Arc<MetadataRecord>, ResolveError> {
        let slot = lock(&self.cache).entry(work.clone()).or_default().clone();

        let mut cached = lock(&slot);
        if let Some(record) = cached.as_ref() {
            debug!("[{}] catalog cache hit", work);
            return Ok(Arc::clone(record));
        }

        let record = Arc::new(self.resolve_uncached(work)?);
        *cached = Some(Arc::clone(&record));
        Ok(record)
    }

    fn resolve_uncached(&self, work: &WorkNumber) -> Result<MetadataRecord, ResolveError> {
        let target = match self.fetch_with_retry(work)? {
            CatalogResponse::Found(record) => return Ok(record),
            CatalogResponse::Redirect(target) => target,
        };

        if &target == work {
            return Err(ResolveError::RedirectChain {
                from: work.clone(),
                via: target.clone(),
                to: target,
            });
        }

        info!("[{}] catalog redirects to {}", work, target);
        match self.fetch_with_retry(&target)? {
            CatalogResponse::Found(record) => Ok(record),
            CatalogResponse::Redirect(next) => Err(ResolveError::RedirectChain {
                from: work.clone(),
                via: target,
                to: next,
            }),
        }
    }

    fn fetch_with_retry(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = Duration::from_millis(self.retry.initial_backoff_ms);
        let mut attempt = 1;

        loop {
            match self.client.fetch(work) {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "[{}] attempt {}/{} failed: {}; retrying in {:?}",
                        work, attempt, max_attempts, e, backoff
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
