use std::collections::{BTreeMap, HashMap};

struct Slot<V> {
    value: V,
    last_access: u64,
}

/// Bounded map evicting the entry with the oldest last-access tick.
///
/// Access order is tracked by a monotonically increasing tick rather than wall
/// clock time, so two accesses never share a timestamp.
pub(crate) struct LruMap<V> {
    entries: HashMap<String, Slot<V>>,
    order: BTreeMap<u64, String>,
    tick: u64,
    capacity: usize,
}

impl<V> LruMap<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the value and refreshes its last-access tick.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let tick = self.next_tick();
        let slot = self.entries.get_mut(key)?;
        self.order.remove(&slot.last_access);
        slot.last_access = tick;
        self.order.insert(tick, key.to_string());
        Some(&slot.value)
    }

    /// Inserts or replaces `key`. Returns the evicted key when a new entry
    /// pushed the map past capacity.
    pub fn insert(&mut self, key: String, value: V) -> Option<String> {
        let tick = self.next_tick();

        if let Some(slot) = self.entries.get_mut(&key) {
            self.order.remove(&slot.last_access);
            slot.value = value;
            slot.last_access = tick;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.order.insert(tick, key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                last_access: tick,
            },
        );
        evicted
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
