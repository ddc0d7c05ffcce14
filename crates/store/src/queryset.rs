//! Lazy, cached query set over one kind.

use std::ops::Range;
use std::sync::Arc;

use kubeset_core::{Error, Record, ResourceDescriptor, Result};
use kubeset_kubehub::ClusterApi;
use kubeset_schema::Kind;
use kubeset_search::{filter_records, order_records, Q};
use tracing::debug;

use crate::fetch::{fetch_all, FetchReport};

/// Cardinality of a `get()`.
#[derive(Debug, Clone, PartialEq)]
pub enum GetOutcome {
    Found(Arc<Record>),
    NotFound,
    Ambiguous(usize),
}

impl GetOutcome {
    pub fn into_result(self, kind: &str) -> Result<Arc<Record>> {
        match self {
            GetOutcome::Found(r) => Ok(r),
            GetOutcome::NotFound => Err(Error::NotFound { kind: kind.to_string() }),
            GetOutcome::Ambiguous(count) => Err(Error::MultipleResults { kind: kind.to_string(), count }),
        }
    }
}

/// Records of one kind. Unfetched until the first access that needs data;
/// from then on every derived store works on the cached list.
///
/// Cloning keeps the cache (the list is copied, the records are shared).
#[derive(Clone)]
pub struct RecordStore {
    kind: Arc<Kind>,
    api: Arc<dyn ClusterApi>,
    cache: Option<Vec<Arc<Record>>>,
    report: FetchReport,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("kind", &self.kind.descriptor().gvk_key())
            .field("cached", &self.cache.as_ref().map(Vec::len))
            .finish()
    }
}

/// Same kind and same cached records in the same order. Unfetched stores
/// only equal other unfetched stores of the kind.
impl PartialEq for RecordStore {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor() == other.descriptor() && self.cache == other.cache
    }
}

impl RecordStore {
    pub fn new(kind: Arc<Kind>, api: Arc<dyn ClusterApi>) -> Self {
        Self { kind, api, cache: None, report: FetchReport::default() }
    }

    fn derived(&self, records: Vec<Arc<Record>>) -> Self {
        Self { kind: self.kind.clone(), api: self.api.clone(), cache: Some(records), report: self.report.clone() }
    }

    pub fn kind(&self) -> &Arc<Kind> {
        &self.kind
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        self.kind.descriptor()
    }

    /// Populate the cache. Does nothing once cached.
    pub async fn fetch(&mut self) -> Result<()> {
        if self.cache.is_some() {
            return Ok(());
        }
        let (records, report) = fetch_all(self.api.as_ref(), &self.kind).await?;
        self.cache = Some(records);
        self.report = report;
        Ok(())
    }

    async fn loaded(&mut self) -> Result<&Vec<Arc<Record>>> {
        self.fetch().await?;
        let records: &Vec<Arc<Record>> = self.cache.get_or_insert_with(Vec::new);
        Ok(records)
    }

    /// Same kind, empty cache.
    pub fn fresh(&self) -> Self {
        Self::new(self.kind.clone(), self.api.clone())
    }

    pub async fn all(&mut self) -> Result<RecordStore> {
        let records = self.loaded().await?.clone();
        Ok(self.derived(records))
    }

    pub async fn filter(&mut self, q: &Q) -> Result<RecordStore> {
        let kept = filter_records(q, self.loaded().await?);
        Ok(self.derived(kept))
    }

    pub async fn exclude(&mut self, q: &Q) -> Result<RecordStore> {
        self.filter(&!q.clone()).await
    }

    /// `order_by(&["namespace", "-name"])`; a leading `-` sorts that key descending.
    pub async fn order_by<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<RecordStore> {
        let mut records = self.loaded().await?.clone();
        order_records(&mut records, fields);
        Ok(self.derived(records))
    }

    pub async fn get(&mut self, q: &Q) -> Result<GetOutcome> {
        let mut matched = filter_records(q, self.loaded().await?);
        debug!(gvk = %self.descriptor().gvk_key(), predicate = %q, matched = matched.len(), "get");
        Ok(match matched.len() {
            0 => GetOutcome::NotFound,
            1 => GetOutcome::Found(matched.remove(0)),
            n => GetOutcome::Ambiguous(n),
        })
    }

    pub async fn count(&mut self) -> Result<usize> {
        Ok(self.loaded().await?.len())
    }

    /// Same as [`count`](Self::count).
    pub async fn len(&mut self) -> Result<usize> {
        self.count().await
    }

    pub async fn exists(&mut self) -> Result<bool> {
        Ok(!self.loaded().await?.is_empty())
    }

    pub async fn records(&mut self) -> Result<&[Arc<Record>]> {
        Ok(self.loaded().await?.as_slice())
    }

    pub async fn at(&mut self, index: usize) -> Result<Option<Arc<Record>>> {
        Ok(self.loaded().await?.get(index).cloned())
    }

    /// Out-of-range bounds are clamped.
    pub async fn slice(&mut self, range: Range<usize>) -> Result<Vec<Arc<Record>>> {
        let records = self.loaded().await?;
        let end = range.end.min(records.len());
        let start = range.start.min(end);
        Ok(records[start..end].to_vec())
    }

    pub async fn into_records(mut self) -> Result<Vec<Arc<Record>>> {
        self.fetch().await?;
        Ok(self.cache.unwrap_or_default())
    }

    pub fn cached(&self) -> Option<&[Arc<Record>]> {
        self.cache.as_deref()
    }

    pub fn is_fetched(&self) -> bool {
        self.cache.is_some()
    }

    pub fn fetch_report(&self) -> &FetchReport {
        &self.report
    }
}
