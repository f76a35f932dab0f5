
pub use ahash::AHashMap;
use std::hash::Hash;
use std::sync::{Mutex, OnceLock};

/**************************** Constants**************************************/

/**************************** Types *****************************************/

///
/// Generic Cache store object. One use case will be to use a search string as the key and store
/// the search parsing object here.
///
pub type RUMCache<K, V> = AHashMap<K, V>;

///
/// A cache that populates itself on first use rather than at construction time. The
/// backing map lives behind a [OnceLock], which (unlike [RUMCache] itself) has a `const`
/// constructor, so a [LazyRUMCache] can sit in a `static` such as
/// [crate::threading::thread_primitives::rt_cache].
///
pub struct LazyRUMCache<K, V> {
    inner: OnceLock<Mutex<RUMCache<K, V>>>,
}

impl<K, V> LazyRUMCache<K, V> {
    pub const fn new() -> LazyRUMCache<K, V> {
        LazyRUMCache {
            inner: OnceLock::new(),
        }
    }

    fn map(&self) -> &Mutex<RUMCache<K, V>> {
        self.inner.get_or_init(|| Mutex::new(RUMCache::default()))
    }
}

impl<K: Hash + Eq + Clone, V: Clone> LazyRUMCache<K, V> {
    ///
    /// Returns the cached value for `key`, computing it via `factory` and storing it on
    /// a miss.
    ///
    pub fn fetch(&self, key: &K, factory: impl FnOnce(&K) -> V) -> V {
        let mut map = self.map().lock().unwrap();
        if let Some(v) = map.get(key) {
            return v.clone();
        }
        let v = factory(key);
        map.insert(key.clone(), v.clone());
        v
    }
}

///
/// Builds an empty [LazyRUMCache], usable as a `const` initializer in a `static`.
///
pub const fn new_cache<K, V>() -> LazyRUMCache<K, V> {
    LazyRUMCache::new()
}

/**************************** Traits ****************************************/

/**************************** Helpers ***************************************/

///
/// Looks up `key` in `$cache` (a [LazyRUMCache]), computing and storing it via
/// `$factory` on a miss.
///
#[macro_export]
macro_rules! rumtk_cache_fetch {
    ( $cache:expr, $key:expr, $factory:expr ) => {{
        $cache.fetch($key, $factory)
    }};
}
