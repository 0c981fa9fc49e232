/// Single entry cache: the value is recomputed only when the key changes.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    entry: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Memo { entry: None }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce(&K) -> V) -> V {
        match &self.entry {
            Some((cached_key, value)) if *cached_key == key => value.clone(),
            _ => {
                let value = compute(&key);
                self.entry = Some((key, value.clone()));
                value
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self, key: &K) -> bool {
        matches!(&self.entry, Some((cached_key, _)) if cached_key == key)
    }
}
