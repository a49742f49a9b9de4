//! Non-bisim cache (C5)
//!
//! Maps a pair of discrete configurations (location + integer-valuation, one
//! per side) to the union of virtual-constraint regions on which
//! bisimilarity has already been refuted. Grounded directly on
//! `strong-timed-bisim/non_bisim_cache.cc` / `.hh`: `emplace` canonicalizes
//! the stored union on write via `combine`+`compress`; the point-query paths
//! (`already_cached`, `is_cached`) do not re-canonicalize on read, matching
//! the asymmetry the source leaves undocumented (kept intentionally, see
//! the design ledger's Open Question decision).

#![forbid(unsafe_code)]

use crate::zone::{Zone, ZoneContainer};
use std::collections::HashMap;

/// The discrete part of a symbolic state: location name plus
/// integer-variable valuation. Two keys are equal iff both components are
/// equal, mirroring the source's `custom_equal` on `(intval, vloc)` pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiscreteKey {
    /// location vector, rendered as one string per process joined by `,`
    pub vloc: Vec<String>,
    /// integer-variable valuation
    pub intval: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MapKey {
    left: DiscreteKey,
    right: DiscreteKey,
}

/// Append-only cache from discrete-configuration pairs to refutation
/// regions.
#[derive(Debug, Default)]
pub struct NonBisimCache {
    storage: HashMap<MapKey, ZoneContainer>,
}

impl NonBisimCache {
    /// A fresh, empty cache.
    pub fn new() -> NonBisimCache {
        NonBisimCache { storage: HashMap::new() }
    }

    /// `emplace(s1, s2, container)`: preconditions `s1`/`s2` are virtually
    /// equivalent (not checked here; enforced by the bisimulation core
    /// before calling). The stored union is extended with `container`, then
    /// canonicalised via `combine` (which itself compresses).
    pub fn emplace(&mut self, left: DiscreteKey, right: DiscreteKey, container: ZoneContainer) {
        let key = MapKey { left, right };
        let entry = self.storage.entry(key).or_insert_with(ZoneContainer::new);
        entry.combine(&container);
    }

    /// `already_cached(s1, s2) -> container`: the intersection of `zone`
    /// (the projection of either symbolic state onto virtual clocks) with
    /// the stored union for this discrete key. An empty return means
    /// "nothing cached here". Does not canonicalize its input.
    pub fn already_cached(&self, left: &DiscreteKey, right: &DiscreteKey, zone: &Zone) -> ZoneContainer {
        let key = MapKey { left: left.clone(), right: right.clone() };
        match self.storage.get(&key) {
            Some(container) => container.intersect_with(zone),
            None => ZoneContainer::new(),
        }
    }

    /// `is_cached(location_pair, valuation)`: point query — does the stored
    /// union contain the virtual projection of `valuation`'s integer-scaled
    /// coordinates. Does not canonicalize its input (see module docs).
    pub fn is_cached(&self, left: &DiscreteKey, right: &DiscreteKey, virtual_valuation: &[i64]) -> bool {
        let key = MapKey { left: left.clone(), right: right.clone() };
        match self.storage.get(&key) {
            Some(container) => container.contains_int(virtual_valuation),
            None => false,
        }
    }

    /// Number of distinct discrete-key pairs stored; used for statistics.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the cache has any entries.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::{Bound, Dbm};

    fn key(name: &str) -> DiscreteKey {
        DiscreteKey { vloc: vec![name.to_string()], intval: Vec::new() }
    }

    fn zone_with_bound(b: i64) -> Zone {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::le(b)).unwrap();
        Zone::new(d)
    }

    #[test]
    fn emplace_then_already_cached_intersects() {
        let mut cache = NonBisimCache::new();
        let mut container = ZoneContainer::new();
        container.append_zone(zone_with_bound(5));
        cache.emplace(key("l0"), key("m0"), container);

        let probe = zone_with_bound(3);
        let hit = cache.already_cached(&key("l0"), &key("m0"), &probe);
        assert!(!hit.is_empty());

        let miss = cache.already_cached(&key("l0"), &key("other"), &probe);
        assert!(miss.is_empty());
    }

    #[test]
    fn growth_is_monotone_never_shrinks() {
        let mut cache = NonBisimCache::new();
        let mut c1 = ZoneContainer::new();
        c1.append_zone(zone_with_bound(2));
        cache.emplace(key("l0"), key("m0"), c1);
        let before = cache.already_cached(&key("l0"), &key("m0"), &Zone::universal(2)).len();

        let mut c2 = ZoneContainer::new();
        c2.append_zone(zone_with_bound(10));
        cache.emplace(key("l0"), key("m0"), c2);
        let after = cache.already_cached(&key("l0"), &key("m0"), &Zone::universal(2)).len();
        assert!(after >= before);
    }

    #[test]
    fn is_cached_point_query() {
        let mut cache = NonBisimCache::new();
        let mut container = ZoneContainer::new();
        container.append_zone(zone_with_bound(5));
        cache.emplace(key("l0"), key("m0"), container);
        assert!(cache.is_cached(&key("l0"), &key("m0"), &[0, 3]));
        assert!(!cache.is_cached(&key("l0"), &key("m0"), &[0, 10]));
    }
}
