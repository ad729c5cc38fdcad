use chrono::NaiveDate;
use dashmap::DashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    News,
    History,
    Insight,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub date: NaiveDate,
    pub kind: QueryKind,
}

impl CacheKey {
    pub fn new(symbol: &str, date: NaiveDate, kind: QueryKind) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            date,
            kind,
        }
    }
}

/// Internal cache entry with timestamp. Replaced wholesale, never mutated.
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// TTL cache with single-flight computation per key.
///
/// Reads go straight to the entry map. A miss takes the key's own gate, so
/// concurrent callers for the same key wait for one computation while other
/// keys proceed untouched. Expired entries are dropped when next touched.
pub struct ResultCache<V> {
    entries: DashMap<CacheKey, Arc<CacheEntry<V>>>,
    gates: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl<V> ResultCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Fresh value for `key`, evicting it if it has expired
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if entry.is_fresh() {
            return Some(Arc::clone(&entry.value));
        }
        // Only evict the entry we inspected; a newer one may have landed since
        self.entries.remove_if(key, |_, current| Arc::ptr_eq(current, &entry));
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, ttl: Duration, compute: F) -> Arc<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let result = self
            .get_or_try_compute(key, ttl, move || async move { Ok::<V, Infallible>(compute().await) })
            .await;
        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but a failed computation
    /// is returned to the caller and nothing is cached.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!("Cache hit for {:?} {} {}", key.kind, key.symbol, key.date);
            return Ok(hit);
        }

        let gate = self
            .gates
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = gate.lock().await;
            match self.get(&key) {
                Some(hit) => Ok(hit),
                None => match compute().await {
                    Ok(value) => {
                        let value = Arc::new(value);
                        self.entries.insert(
                            key.clone(),
                            Arc::new(CacheEntry {
                                value: Arc::clone(&value),
                                created_at: Instant::now(),
                                ttl,
                            }),
                        );
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
            }
        };

        // Drop the gate once nobody else holds or waits on it
        self.gates.remove_if(&key, |_, g| Arc::strong_count(g) <= 2);
        result
    }
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
