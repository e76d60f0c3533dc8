//! Dashboard session: loaded data plus the most recent filter result.
//!
//! A session owns the [`LoadCache`] for one data directory and answers
//! filter requests against it. Filter failures are per request; the loaded
//! table and the previous outcome stay available.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use meter_core::error::Result;
use meter_core::models::FilterSpec;
use meter_data::analysis::{analyze, default_filter, FilterOutcome, LoadedData};

use crate::load_cache::LoadCache;

pub struct DashboardSession {
    data_dir: PathBuf,
    aggregate: String,
    threshold: f64,
    cache: LoadCache,
    data: Option<Arc<LoadedData>>,
    outcome: Option<FilterOutcome>,
}

impl DashboardSession {
    /// Create a session for `data_dir`. Nothing is read until [`load`] or
    /// [`apply_filter`] is called.
    ///
    /// [`load`]: DashboardSession::load
    /// [`apply_filter`]: DashboardSession::apply_filter
    pub fn new(data_dir: impl Into<PathBuf>, aggregate: impl Into<String>, threshold: f64) -> Self {
        Self {
            data_dir: data_dir.into(),
            aggregate: aggregate.into(),
            threshold,
            cache: LoadCache::new(),
            data: None,
            outcome: None,
        }
    }

    /// Load (or revalidate) the data directory.
    pub fn load(&mut self) -> Result<Arc<LoadedData>> {
        let data = self.cache.get_or_load(&self.data_dir)?;
        self.data = Some(Arc::clone(&data));
        Ok(data)
    }

    /// Discard cached data and read the directory again.
    pub fn reload(&mut self) -> Result<Arc<LoadedData>> {
        self.cache.invalidate();
        self.load()
    }

    /// Answer one filter request.
    ///
    /// The directory is revalidated first, so edits on disk are picked up.
    /// On a filter error the previous outcome is kept.
    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<FilterOutcome> {
        let data = self.load()?;
        match analyze(&data.table, &spec, &self.aggregate, self.threshold) {
            Ok(outcome) => {
                self.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("filter {} to {} rejected: {}", spec.start, spec.end, e);
                Err(e)
            }
        }
    }

    /// The request to show first: full range with the aggregate, or every
    /// appliance when `all_appliances` is set.
    pub fn default_filter(&mut self, all_appliances: bool) -> Result<Option<FilterSpec>> {
        let data = self.load()?;
        Ok(default_filter(&data.table, all_appliances, &self.aggregate))
    }

    /// Most recently loaded data, if any.
    pub fn data(&self) -> Option<&Arc<LoadedData>> {
        self.data.as_ref()
    }

    /// Outcome of the last successful [`apply_filter`](Self::apply_filter).
    pub fn last_outcome(&self) -> Option<&FilterOutcome> {
        self.outcome.as_ref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn aggregate(&self) -> &str {
        &self.aggregate
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }
}
