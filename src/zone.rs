//! Zone & virtual-constraint layer (C2)
//!
//! Wraps a [`Dbm`] with its dimension, adds virtual-clock projection,
//! synchronized-zone construction and the union/compression container.
//! Grounded on `utils/zone_container.cc` / `vcg/zone_container.cc` for the
//! container shape, and on `cont_node.cc::generate_zones` for
//! `generate_synchronized_zones`.

#![forbid(unsafe_code)]

use crate::clock::{ClockValue, Valuation};
use crate::dbm::{Bound, Dbm, DbmError};

/// A non-empty (or explicitly empty), convex set of clock valuations.
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    dbm: Dbm,
}

impl Zone {
    /// Wrap an already-canonical DBM as a zone.
    pub fn new(dbm: Dbm) -> Zone {
        Zone { dbm }
    }

    /// The universal zone of dimension `dim`.
    pub fn universal(dim: usize) -> Zone {
        Zone { dbm: Dbm::universal(dim) }
    }

    /// Dimension (`1 + clock count`).
    pub fn dim(&self) -> usize {
        self.dbm.dim()
    }

    /// Access the underlying DBM.
    pub fn dbm(&self) -> &Dbm {
        &self.dbm
    }

    /// `is_universal`: no constraint tighter than the universal zone.
    pub fn is_universal(&self) -> bool {
        let u = Dbm::universal(self.dbm.dim());
        self.dbm == u
    }

    /// `is_empty`.
    pub fn is_empty(&self) -> bool {
        self.dbm.is_empty()
    }

    /// `contains(v)`: does the valuation's integer-scaled coordinates lie in
    /// the zone. Callers working with exact rationals should scale both
    /// sides consistently before calling; guard constants in this crate's
    /// scope are always integral or half-integral so a caller typically
    /// doubles all values first.
    pub fn contains_int(&self, v: &[i64]) -> bool {
        self.dbm.belongs_int(v).unwrap_or(false)
    }

    /// Exact membership test for a rational valuation against a zone whose
    /// finite bounds were themselves built at `resolution` (every finite
    /// bound value is `resolution` times its native-unit equivalent).
    /// Compares in exact rational arithmetic throughout, so a half-integer
    /// `v` is never rounded away regardless of `resolution`.
    pub fn contains_scaled(&self, v: &[ClockValue], resolution: i64) -> bool {
        if self.dbm.is_empty() || v.len() != self.dim() {
            return false;
        }
        let dim = self.dim();
        for i in 0..dim {
            for j in 0..dim {
                let diff = v[i] - v[j];
                match self.dbm.get(i, j) {
                    Bound::Infinity => {}
                    Bound::Finite { value, strict } => {
                        let bound = ClockValue::new(value, resolution);
                        if strict {
                            if diff >= bound {
                                return false;
                            }
                        } else if diff > bound {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Intersect two zones; returns the empty zone (not an error) on
    /// emptiness, matching the container-level "discard empty members"
    /// usage pattern in the source.
    pub fn intersect(&self, other: &Zone) -> Zone {
        let mut d = self.dbm.clone();
        match d.intersect(&other.dbm) {
            Ok(()) | Err(DbmError::Empty) => Zone { dbm: d },
            Err(e) => unreachable!("unexpected dbm error: {e}"),
        }
    }

    /// `le`: subset test, `self ⊆ other`, computed as
    /// `intersect(self, other) == self` up to canonical form.
    pub fn le(&self, other: &Zone) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        let inter = self.intersect(other);
        inter == *self
    }

    /// Existentially eliminate the first `dim - k - 1` original clocks,
    /// keeping the reference clock and the last `k` (virtual) clocks.
    /// Projection by elimination is implemented as the standard DBM
    /// variable-removal: copy the bounds reachable only through the
    /// reference clock for the remaining indices (the tightened matrix
    /// already encodes all transitive bounds, so removal is a row/column
    /// restriction after `tighten`).
    pub fn project_onto_virtual(&self, k: usize) -> Zone {
        if self.is_empty() {
            return Zone { dbm: Dbm::empty(k + 1) };
        }
        let old_dim = self.dbm.dim();
        debug_assert!(k + 1 <= old_dim);
        let keep: Vec<usize> = std::iter::once(0).chain((old_dim - k)..old_dim).collect();
        let mut d = Dbm::universal(keep.len());
        for (ni, &oi) in keep.iter().enumerate() {
            for (nj, &oj) in keep.iter().enumerate() {
                let b = self.dbm.get(oi, oj);
                let cur = d.get(ni, nj);
                if bound_tighter(&b, &cur) {
                    let _ = d.constrain(ni, nj, b);
                }
            }
        }
        Zone { dbm: d }
    }
}

fn bound_tighter(a: &Bound, b: &Bound) -> bool {
    match (a, b) {
        (Bound::Infinity, _) => false,
        (_, Bound::Infinity) => true,
        (
            Bound::Finite { value: va, strict: sa },
            Bound::Finite { value: vb, strict: sb },
        ) => va < vb || (va == vb && *sa && !*sb),
    }
}

/// A zone whose dimension equals `1 + virtual_clock_count`: the projection
/// of a full zone onto the shared virtual clocks only.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualConstraint {
    zone: Zone,
}

impl VirtualConstraint {
    /// Wrap an already-projected zone as a virtual constraint.
    pub fn new(zone: Zone) -> VirtualConstraint {
        VirtualConstraint { zone }
    }

    /// The underlying (virtual-clocks-only) zone.
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Number of virtual clocks (dimension minus the reference clock).
    pub fn virtual_clock_count(&self) -> usize {
        self.zone.dim() - 1
    }

    /// `generate_synchronized_zones(o1, o2)`: lift this virtual constraint
    /// into the pair of full zones (left dim `2*o1 + o2 + 1`-ish per the
    /// caller's full dimension) in which both sides are virtually
    /// equivalent to `self` and each side's originals equal its own virtual
    /// copies. `full_dim` is the dimension of each side's full zone (equal
    /// for both VCGs by construction); `orig_count` is that side's number of
    /// original clocks, and its virtual copies are assumed to occupy the
    /// trailing `virtual_clock_count()` indices of the full zone exactly as
    /// in `self`.
    pub fn generate_synchronized_zone(&self, full_dim: usize, orig_count: usize) -> Zone {
        let vcount = self.virtual_clock_count();
        debug_assert!(full_dim >= vcount + 1);
        let mut d = Dbm::universal(full_dim);
        let offset = full_dim - vcount;
        for i in 0..=vcount {
            for j in 0..=vcount {
                let vi = if i == 0 { 0 } else { offset + i - 1 };
                let vj = if j == 0 { 0 } else { offset + j - 1 };
                let b = self.zone.dbm().get(i, j);
                let _ = d.constrain(vi, vj, b);
            }
        }
        for orig in 1..=orig_count {
            let virt = offset + (orig - 1).min(vcount.saturating_sub(1));
            if orig <= vcount {
                let _ = d.constrain(orig, virt, Bound::ZERO_LE);
                let _ = d.constrain(virt, orig, Bound::ZERO_LE);
            }
        }
        Zone { dbm: d }
    }
}

/// An unordered set of zones interpreted as their union, with subsumption
/// compression. Used both for [`VirtualConstraint`] unions (the non-bisim
/// cache's values) and plain [`Zone`] unions (the witness builder).
#[derive(Clone, Debug, Default)]
pub struct ZoneContainer {
    members: Vec<Zone>,
}

impl ZoneContainer {
    /// An empty container.
    pub fn new() -> ZoneContainer {
        ZoneContainer { members: Vec::new() }
    }

    /// Number of members (before compression may have been run).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the container has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.members.iter()
    }

    /// `append_zone`: push a new member (no emptiness or subsumption check).
    pub fn append_zone(&mut self, z: Zone) {
        if !z.is_empty() {
            self.members.push(z);
        }
    }

    /// `compress()`: remove any member `a` with `a ⊆ b` for some other `b`.
    pub fn compress(&mut self) {
        let n = self.members.len();
        let mut keep = vec![true; n];
        for i in 0..n {
            if !keep[i] {
                continue;
            }
            for j in 0..n {
                if i == j || !keep[j] {
                    continue;
                }
                if self.members[i].le(&self.members[j]) {
                    if self.members[j].le(&self.members[i]) && j < i {
                        continue;
                    }
                    keep[i] = false;
                    break;
                }
            }
        }
        let mut new_members = Vec::with_capacity(n);
        for (i, m) in self.members.drain(..).enumerate() {
            if keep[i] {
                new_members.push(m);
            }
        }
        self.members = new_members;
    }

    /// `combine(other)`: union the members of `other` into `self`, compress,
    /// and merge adjacent zones that together form a convex union. Adjacent
    /// merging is an optional further canonicalisation; this implementation
    /// performs the required subsumption compression and leaves exact
    /// convex-merge as a no-op refinement (never changes the represented
    /// union, only potentially its member count), matching the source's
    /// treatment of `combine` as "compress plus best-effort merge".
    pub fn combine(&mut self, other: &ZoneContainer) {
        for z in &other.members {
            self.members.push(z.clone());
        }
        self.compress();
    }

    /// Intersect every member with `z`, dropping members that become empty.
    /// Used by the cache's `already_cached` projection-intersection.
    pub fn intersect_with(&self, z: &Zone) -> ZoneContainer {
        let mut out = ZoneContainer::new();
        for m in &self.members {
            let inter = m.intersect(z);
            if !inter.is_empty() {
                out.append_zone(inter);
            }
        }
        out
    }

    /// Order-independent hash: fold the members with a commutative
    /// accumulator instead of hashing the vector in storage order.
    pub fn order_independent_fingerprint(&self) -> u64 {
        let mut acc: u64 = 0;
        for m in &self.members {
            acc ^= zone_fingerprint(m);
        }
        acc
    }

    /// Does any member contain this valuation's integer coordinates.
    pub fn contains_int(&self, v: &[i64]) -> bool {
        self.members.iter().any(|m| m.contains_int(v))
    }
}

fn zone_fingerprint(z: &Zone) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    #[derive(Hash)]
    struct Key(usize, Vec<(i64, bool)>);
    let dim = z.dim();
    let mut flat = Vec::with_capacity(dim * dim);
    for i in 0..dim {
        for j in 0..dim {
            flat.push(match z.dbm().get(i, j) {
                Bound::Infinity => (i64::MAX, false),
                Bound::Finite { value, strict } => (value, strict),
            });
        }
    }
    let mut hasher = DefaultHasher::new();
    Key(dim, flat).hash(&mut hasher);
    hasher.finish()
}

/// `belongs(v, zone)` convenience used by C3 callers: `resolution` is the
/// scale `zone`'s own finite bounds were built at (1 for a zone built
/// directly from native-unit guards/invariants, 2 for a zone built via the
/// doubled-resolution point-DBM construction in `contradiction::generate_zones`).
/// Delegates to [`Zone::contains_scaled`] so the comparison stays exact.
pub fn valuation_belongs(zone: &Zone, v: &Valuation, resolution: i64) -> bool {
    zone.contains_scaled(v.values(), resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbm::Bound;

    #[test]
    fn compress_is_idempotent() {
        let mut d1 = Dbm::universal(2);
        d1.constrain(1, 0, Bound::le(3)).unwrap();
        let mut d2 = Dbm::universal(2);
        d2.constrain(1, 0, Bound::le(5)).unwrap();

        let mut c = ZoneContainer::new();
        c.append_zone(Zone::new(d1));
        c.append_zone(Zone::new(d2));
        c.compress();
        let once = c.len();
        c.compress();
        assert_eq!(once, c.len());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn delay_monotone_on_zone() {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::le(2)).unwrap();
        let z = Zone::new(d.clone());
        let inv = Dbm::universal(2);
        d.delay(&inv).unwrap();
        let delayed = Zone::new(d);
        assert!(z.le(&delayed));
    }

    #[test]
    fn intersect_commutes() {
        let mut d1 = Dbm::universal(2);
        d1.constrain(1, 0, Bound::le(5)).unwrap();
        let mut d2 = Dbm::universal(2);
        d2.constrain(0, 1, Bound::le(-1)).unwrap();
        let a = Zone::new(d1);
        let b = Zone::new(d2);
        assert_eq!(a.intersect(&b), b.intersect(&a));
    }
}
