use std::{
  hash::Hash,
  num::NonZeroUsize,
  sync::RwLock,
  time::{Duration, Instant},
};

use lru::LruCache;

struct Timed<T> {
  value: T,
  created: Instant,
}

/// An LRU cache whose entries go stale after a fixed time-to-live. Stale
/// entries are dropped on lookup, so the next caller recomputes them.
pub struct TimedLruCache<K: Hash + Eq, V: Clone> {
  map: RwLock<LruCache<K, Timed<V>>>,
  ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TimedLruCache<K, V> {
  pub fn new(max_entries: usize, ttl: Duration) -> Self {
    let max_entries = max_entries.try_into().unwrap_or(NonZeroUsize::MIN);
    Self {
      map: RwLock::new(LruCache::new(max_entries)),
      ttl,
    }
  }

  pub fn get_cached(&self, key: &K) -> Option<V> {
    let mut map = self.map.write().ok()?;
    let entry = map.get(key)?;
    if entry.created.elapsed() > self.ttl {
      map.pop(key);
      return None;
    }
    Some(entry.value.clone())
  }

  pub fn insert(&self, key: K, value: V) -> Option<()> {
    let timed = Timed {
      value,
      created: Instant::now(),
    };
    self.map.write().ok()?.push(key, timed);
    Some(())
  }

  #[allow(dead_code)]
  pub fn remove(&self, key: &K) -> Option<V> {
    self.map.write().ok()?.pop(key).map(|timed| timed.value)
  }

  #[allow(dead_code)]
  pub fn len(&self) -> usize {
    self.map.read().map(|map| map.len()).unwrap_or(0)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_insert_and_get() {
    let cache = TimedLruCache::new(2, Duration::from_secs(60));
    cache.insert("/", "home".to_string());
    cache.insert("/post/a", "a".to_string());
    assert_eq!(cache.get_cached(&"/").as_deref(), Some("home"));
    assert_eq!(cache.len(), 2);

    // "/" was touched last, so "/post/a" is evicted
    cache.insert("/post/b", "b".to_string());
    assert_eq!(cache.get_cached(&"/post/a"), None);
    assert_eq!(cache.get_cached(&"/post/b").as_deref(), Some("b"));
  }

  #[test]
  fn test_expired_entries_are_dropped() {
    let cache = TimedLruCache::new(4, Duration::ZERO);
    cache.insert("/", "home".to_string());
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.get_cached(&"/"), None);
    assert_eq!(cache.len(), 0);
  }

  #[test]
  fn test_remove() {
    let cache = TimedLruCache::new(0, Duration::from_secs(60));
    cache.insert(1, 10);
    assert_eq!(cache.remove(&1), Some(10));
    assert_eq!(cache.remove(&1), None);
  }
}
