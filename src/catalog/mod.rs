//! Remote catalog interface.
//!
//! The resolver only depends on [`CatalogClient`]; the production scraper
//! lives in [`dlsite`].

use std::sync::Arc;

use crate::work::number::WorkNumber;

pub mod dlsite;
pub mod resolver;

/// Raw metadata scraped for one work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Identifier whose catalog page supplied this data. Differs from the
    /// requested identifier after a redirect.
    pub work_number: WorkNumber,
    pub work_title: String,
    pub circle_name: String,
    pub genres: Vec<String>,
    pub voice_actors: Vec<String>,
    /// `YYYY-MM-DD`
    pub sale_date: Option<String>,
    pub cover: Option<Arc<Vec<u8>>>,
}

impl MetadataRecord {
    pub fn new(work_number: WorkNumber, work_title: impl Into<String>) -> Self {
        Self {
            work_number,
            work_title: work_title.into(),
            circle_name: String::new(),
            genres: Vec::new(),
            voice_actors: Vec::new(),
            sale_date: None,
            cover: None,
        }
    }
}

/// What the catalog answered for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResponse {
    Found(MetadataRecord),
    /// The identifier was merged or renumbered upstream.
    Redirect(WorkNumber),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("{0} not found in catalog")]
    NotFound(WorkNumber),
    #[error("network error for {work}: {message}")]
    Network { work: WorkNumber, message: String },
    #[error("unexpected catalog page for {work}: {message}")]
    Parse { work: WorkNumber, message: String },
    #[error("{from} redirects to {via}, which redirects again to {to}")]
    RedirectChain {
        from: WorkNumber,
        via: WorkNumber,
        to: WorkNumber,
    },
}

impl ResolveError {
    pub fn network(work: &WorkNumber, message: impl ToString) -> Self {
        ResolveError::Network {
            work: work.clone(),
            message: message.to_string(),
        }
    }

    pub fn parse(work: &WorkNumber, message: impl ToString) -> Self {
        ResolveError::Parse {
            work: work.clone(),
            message: message.to_string(),
        }
    }

    /// Only transient transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Network { .. })
    }
}

/// Fetches one catalog entry. Implementations must not follow
/// identifier-changing redirects themselves; they report them as
/// [`CatalogResponse::Redirect`].
pub trait CatalogClient: Send + Sync {
    fn fetch(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError>;
}

impl<C: CatalogClient + ?Sized> CatalogClient for Arc<C> {
    fn fetch(&self, work: &WorkNumber) -> Result<CatalogResponse, ResolveError> {
        (**self).fetch(work)
    }
}
