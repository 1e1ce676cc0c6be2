//! CSV bodies kept from recent dashboard renders, so a download matches the
//! table the page showed instead of re-running terminus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::terminus::MetricsQuery;

/// How long a rendered table stays downloadable.
pub const EXPORT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct ExportCache {
    entries: Arc<RwLock<HashMap<String, (Instant, Vec<u8>)>>>,
    ttl: Duration,
}

impl Default for ExportCache {
    fn default() -> Self {
        Self::new(EXPORT_TTL)
    }
}

impl ExportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn key(query: &MetricsQuery) -> String {
        format!("{}/{}", query.site_env(), query.period)
    }

    /// Store the CSV for `query`, dropping anything that has expired.
    pub async fn put(&self, query: &MetricsQuery, csv: Vec<u8>) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(Self::key(query), (Instant::now(), csv));
    }

    /// The CSV stored for `query`, if it has not expired.
    pub async fn get(&self, query: &MetricsQuery) -> Option<Vec<u8>> {
        let entries = self.entries.read().await;
        entries
            .get(&Self::key(query))
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, csv)| csv.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminus::MetricsPeriod;

    #[tokio::test]
    async fn test_round_trip_is_keyed_by_site_env_and_period() {
        let cache = ExportCache::default();
        let week = MetricsQuery::new("mysite", "live", MetricsPeriod::Week);
        cache.put(&week, b"Period\n".to_vec()).await;

        assert_eq!(cache.get(&week).await.as_deref(), Some(&b"Period\n"[..]));
        assert!(cache
            .get(&MetricsQuery::new("mysite", "live", MetricsPeriod::Day))
            .await
            .is_none());
        assert!(cache
            .get(&MetricsQuery::new("mysite", "dev", MetricsPeriod::Week))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_served() {
        let cache = ExportCache::new(Duration::ZERO);
        let q = MetricsQuery::new("mysite", "live", MetricsPeriod::Day);
        cache.put(&q, b"x".to_vec()).await;
        assert!(cache.get(&q).await.is_none());
    }
}
