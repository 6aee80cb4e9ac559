//! Keyed memoization of rendered HTML with TTL expiry.
//!
//! Entries live in a `RwLock<HashMap>`; every operation is one in-memory
//! lookup or insert under the lock. A poisoned lock is recovered rather than
//! reported because a cache miss is never an error.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use snote_store::WriteHook;
use snote_types::Note;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// TTL used by [`RenderCache::put_default`] unless configured otherwise.
pub const DEFAULT_RENDER_TTL: Duration = Duration::from_secs(60 * 60);

/// Digest of the markdown an entry was rendered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn of(contents: &str) -> Self {
        Self(blake3::hash(contents.as_bytes()))
    }
}

#[derive(Debug)]
struct CacheEntry {
    html: Arc<str>,
    fingerprint: Fingerprint,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe render cache shared by all request handlers.
#[derive(Debug)]
pub struct RenderCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_TTL)
    }
}

impl RenderCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unexpired HTML for `note_id`, whatever it was rendered from.
    pub fn get(&self, note_id: &str) -> Option<Arc<str>> {
        let now = Instant::now();
        self.read()
            .get(note_id)
            .filter(|e| e.is_live(now))
            .map(|e| Arc::clone(&e.html))
    }

    /// Unexpired HTML for `note_id` rendered from contents matching
    /// `fingerprint`.
    pub fn get_fresh(&self, note_id: &str, fingerprint: &Fingerprint) -> Option<Arc<str>> {
        let now = Instant::now();
        self.read()
            .get(note_id)
            .filter(|e| e.is_live(now) && e.fingerprint == *fingerprint)
            .map(|e| Arc::clone(&e.html))
    }

    /// Store `html` for `note_id`, expiring after `ttl`.
    pub fn put(&self, note_id: &str, fingerprint: Fingerprint, html: Arc<str>, ttl: Duration) {
        let entry = CacheEntry {
            html,
            fingerprint,
            expires_at: Instant::now() + ttl,
        };
        self.write().insert(note_id.to_string(), entry);
        trace!(note_id = %note_id, ttl_secs = ttl.as_secs(), "render_cache: put");
    }

    /// [`put`](Self::put) with the cache's default TTL.
    pub fn put_default(&self, note_id: &str, fingerprint: Fingerprint, html: Arc<str>) {
        self.put(note_id, fingerprint, html, self.default_ttl);
    }

    /// Drop any entry for `note_id`. Returns `true` if one existed.
    pub fn invalidate(&self, note_id: &str) -> bool {
        let removed = self.write().remove(note_id).is_some();
        if removed {
            trace!(note_id = %note_id, "render_cache: invalidated");
        }
        removed
    }

    /// Evict every expired entry. Returns the number evicted.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Number of entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `every` until
    /// `cancel` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("render_cache: sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = self.sweep_expired();
                        if evicted > 0 {
                            debug!(evicted, remaining = self.len(), "render_cache: swept expired entries");
                        }
                    }
                }
            }
        })
    }
}

impl WriteHook for RenderCache {
    fn after_save(&self, note: &Note) {
        self.invalidate(&note.id);
    }

    fn after_delete(&self, id: &str) {
        self.invalidate(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn put_then_get() {
        let cache = RenderCache::default();
        let fp = Fingerprint::of("# a");
        cache.put_default("a", fp, html("<h1>a</h1>"));
        assert_eq!(cache.get("a").as_deref(), Some("<h1>a</h1>"));
        assert_eq!(cache.get_fresh("a", &fp).as_deref(), Some("<h1>a</h1>"));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn stale_fingerprint_is_a_miss() {
        let cache = RenderCache::default();
        cache.put_default("a", Fingerprint::of("old"), html("<p>old</p>"));
        assert!(cache.get_fresh("a", &Fingerprint::of("new")).is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = RenderCache::default();
        cache.put_default("a", Fingerprint::of("x"), html("x"));
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn write_hook_invalidates() {
        let cache = RenderCache::default();
        cache.put_default("a", Fingerprint::of("x"), html("x"));
        cache.put_default("b", Fingerprint::of("y"), html("y"));
        cache.after_save(&Note::new("a", "changed"));
        cache.after_delete("b");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_and_sweep() {
        let cache = RenderCache::new(Duration::from_secs(10));
        cache.put_default("short", Fingerprint::of("s"), html("s"));
        cache.put("long", Fingerprint::of("l"), html("l"), Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("short").is_none());
        assert!(cache.get("long").is_some());
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_until_cancelled() {
        let cache = Arc::new(RenderCache::new(Duration::from_secs(5)));
        cache.put_default("a", Fingerprint::of("a"), html("a"));
        let cancel = CancellationToken::new();
        let task = Arc::clone(&cache).spawn_sweeper(Duration::from_secs(1), cancel.clone());

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(cache.is_empty());

        cancel.cancel();
        task.await.unwrap();
    }
}
