use chrono::NaiveDate;
use hmpi_monitor::config::StoreConfig;
use hmpi_monitor::monitoring::{InMemoryTableStore, RestTableStore, StoreError, TableStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The hosted store when `STORE_URL` is set, otherwise a process-local one.
pub(crate) fn build_store(config: &StoreConfig) -> Result<Arc<dyn TableStore>, StoreError> {
    match RestTableStore::from_config(config)? {
        Some(store) => {
            info!(base_url = ?config.base_url, "using hosted table store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("STORE_URL not set, records are kept in memory only");
            Ok(Arc::new(InMemoryTableStore::new()))
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
