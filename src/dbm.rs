//! DBM kernel (C1)
//!
//! Canonical Difference Bound Matrices over clock index `0..N`, clock `0`
//! being the fictitious reference clock that is always `0`. Entry `(i, j)`
//! stores the tightest known constraint `x_i - x_j <= b` or `< b`.
//!
//! Grounded on `tchecker::dbm` as exercised from
//! `strong-timed-bisim/certificate/contradiction/cont_node.cc` (universal
//! zone construction, `reduce_to_valuation`, `max_delay`'s use of `constrain`)
//! and `utils/zone_container.cc` / `vcg/zone_container.cc` for the container
//! semantics layered in `crate::zone`.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

/// Bound used on a DBM entry: either a finite integer or "infinity" (no
/// constraint). Strictness distinguishes `<` from `<=`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    /// `x_i - x_j <= value` or `< value` depending on `strict`.
    Finite {
        /// the constant on the right-hand side
        value: i64,
        /// `true` for `<`, `false` for `<=`
        strict: bool,
    },
    /// No constraint: `x_i - x_j < infinity`.
    Infinity,
}

impl Bound {
    /// The `(0, <=)` entry used on the diagonal of a universal/canonical DBM.
    pub const ZERO_LE: Bound = Bound::Finite { value: 0, strict: false };

    /// `(value, <)`.
    pub fn lt(value: i64) -> Bound {
        Bound::Finite { value, strict: true }
    }

    /// `(value, <=)`.
    pub fn le(value: i64) -> Bound {
        Bound::Finite { value, strict: false }
    }

    /// Whether this bound is strict (`<`). Infinity is treated as non-strict
    /// for addition purposes (it never tightens anything).
    pub fn is_strict(&self) -> bool {
        matches!(self, Bound::Finite { strict: true, .. })
    }

    /// DBM addition: `(a, s1) + (b, s2) = (a + b, s1 || s2)`, saturating at
    /// infinity. Used by `tighten`'s all-pairs shortest paths.
    pub fn add(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Infinity, _) | (_, Bound::Infinity) => Bound::Infinity,
            (
                Bound::Finite { value: a, strict: s1 },
                Bound::Finite { value: b, strict: s2 },
            ) => match a.checked_add(b) {
                Some(value) => Bound::Finite { value, strict: s1 || s2 },
                None => Bound::Infinity,
            },
        }
    }

    /// Whether `self` is strictly tighter than `other` when taking a min
    /// (ties keep the non-strict side, matching `<=` dominating `<` at equal
    /// value only when picking the looser of the two — here we want the
    /// *tighter*, so equal value with strict wins).
    fn tighter_than(&self, other: &Bound) -> bool {
        match (self, other) {
            (Bound::Infinity, Bound::Infinity) => false,
            (Bound::Infinity, _) => false,
            (_, Bound::Infinity) => true,
            (
                Bound::Finite { value: a, strict: sa },
                Bound::Finite { value: b, strict: sb },
            ) => match a.cmp(b) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => *sa && !*sb,
            },
        }
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Infinity => write!(f, "inf"),
            Bound::Finite { value, strict: true } => write!(f, "<{value}"),
            Bound::Finite { value, strict: false } => write!(f, "<={value}"),
        }
    }
}

/// Errors from DBM operations that can fail.
#[derive(Debug, thiserror::Error)]
pub enum DbmError {
    /// `constrain`/`intersect`/`tighten` produced the empty zone.
    #[error("DBM became empty")]
    Empty,
    /// A valuation's length did not match the DBM's dimension.
    #[error("valuation length {got} does not match dimension {expected}")]
    BadValuationLen {
        /// length supplied
        got: usize,
        /// dimension required
        expected: usize,
    },
}

/// A canonical (or explicitly-empty) Difference Bound Matrix of dimension
/// `dim = 1 + clock_count`.
#[derive(Clone, PartialEq, Eq)]
pub struct Dbm {
    dim: usize,
    /// Row-major `dim * dim` entries. `None` marks the matrix as the empty
    /// sentinel (all entries conceptually meaningless).
    entries: Option<Vec<Bound>>,
}

impl Dbm {
    /// `universal(N)`: no constraint except `x_i - x_i <= 0`. Canonical.
    pub fn universal(dim: usize) -> Dbm {
        let mut entries = vec![Bound::Infinity; dim * dim];
        for i in 0..dim {
            entries[i * dim + i] = Bound::ZERO_LE;
        }
        Dbm { dim, entries: Some(entries) }
    }

    /// The empty-zone sentinel of dimension `dim`.
    pub fn empty(dim: usize) -> Dbm {
        Dbm { dim, entries: None }
    }

    /// Dimension `N = 1 + clock_count`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether this DBM represents the empty zone.
    pub fn is_empty(&self) -> bool {
        self.entries.is_none()
    }

    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.dim + j
    }

    /// Raw entry access; panics on the empty sentinel (callers must check
    /// `is_empty` first, matching the source's "empty DBMs are not indexed").
    pub fn get(&self, i: usize, j: usize) -> Bound {
        let idx = self.idx(i, j);
        self.entries.as_ref().expect("DBM is empty")[idx]
    }

    fn set(&mut self, i: usize, j: usize, b: Bound) {
        let idx = self.idx(i, j);
        self.entries.as_mut().expect("DBM is empty")[idx] = b;
    }

    /// All-pairs shortest paths under `Bound::add`/min; becomes the empty
    /// sentinel if any diagonal tightens below `(0, <=)`.
    pub fn tighten(&mut self) {
        if self.is_empty() {
            return;
        }
        let n = self.dim;
        for k in 0..n {
            for i in 0..n {
                let ik = self.get(i, k);
                if matches!(ik, Bound::Infinity) {
                    continue;
                }
                for j in 0..n {
                    let kj = self.get(k, j);
                    let via = ik.add(kj);
                    let ij = self.get(i, j);
                    if via.tighter_than(&ij) {
                        self.set(i, j, via);
                    }
                }
            }
        }
        for i in 0..n {
            if let Bound::Finite { value, strict } = self.get(i, i) {
                if value < 0 || (value == 0 && strict) {
                    self.entries = None;
                    return;
                }
            }
        }
    }

    /// `constrain(i, j, bound)`: intersect with `x_i - x_j <prec> bound`,
    /// re-tighten. Returns `Err(Empty)` (and leaves `self` as the empty
    /// sentinel) when the result is empty.
    pub fn constrain(&mut self, i: usize, j: usize, bound: Bound) -> Result<(), DbmError> {
        if self.is_empty() {
            return Err(DbmError::Empty);
        }
        let cur = self.get(i, j);
        if bound.tighter_than(&cur) {
            self.set(i, j, bound);
        }
        self.tighten();
        if self.is_empty() {
            Err(DbmError::Empty)
        } else {
            Ok(())
        }
    }

    /// Intersection in place; fails with `Empty` (leaving `self` empty) if
    /// the result has no valuations. Matches `constrain` applied to every
    /// entry of `other`.
    pub fn intersect(&mut self, other: &Dbm) -> Result<(), DbmError> {
        debug_assert_eq!(self.dim, other.dim, "intersect requires equal dimension");
        if self.is_empty() || other.is_empty() {
            self.entries = None;
            return Err(DbmError::Empty);
        }
        let n = self.dim;
        for i in 0..n {
            for j in 0..n {
                let ob = other.get(i, j);
                let cur = self.get(i, j);
                if ob.tighter_than(&cur) {
                    self.set(i, j, ob);
                }
            }
        }
        self.tighten();
        if self.is_empty() {
            Err(DbmError::Empty)
        } else {
            Ok(())
        }
    }

    /// `reset(i)`: sets `x_i := 0`; re-tightens (always stays non-empty, a
    /// reset of a non-empty DBM cannot introduce emptiness).
    pub fn reset(&mut self, i: usize) {
        if self.is_empty() {
            return;
        }
        let n = self.dim;
        for k in 0..n {
            if k == i {
                continue;
            }
            self.set(i, k, self.get(0, k));
            self.set(k, i, self.get(k, 0));
        }
        self.set(i, i, Bound::ZERO_LE);
        self.tighten();
    }

    /// Future-close: drop all upper bounds on `x_0 - x_i` (time may pass),
    /// then intersect with `inv`. Canonical on return.
    pub fn delay(&mut self, inv: &Dbm) -> Result<(), DbmError> {
        if self.is_empty() {
            return Err(DbmError::Empty);
        }
        let n = self.dim;
        for i in 1..n {
            self.set(0, i, Bound::Infinity);
        }
        self.tighten();
        self.intersect(inv)
    }

    /// `belongs(valuation)`: for all `i, j`, `v(i) - v(j) <prec> bound(i,j)`.
    /// Valuation is given in sixty-fourths-free exact form via `i64`
    /// fixed-point callers normalize; here we take already-compared
    /// integer differences through [`crate::clock::Valuation::belongs`]
    /// which calls back into this with rational bound comparison.
    pub fn belongs_int(&self, v: &[i64]) -> Result<bool, DbmError> {
        if self.is_empty() {
            return Ok(false);
        }
        if v.len() != self.dim {
            return Err(DbmError::BadValuationLen { got: v.len(), expected: self.dim });
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                let diff = v[i] - v[j];
                match self.get(i, j) {
                    Bound::Infinity => {}
                    Bound::Finite { value, strict } => {
                        if strict {
                            if diff >= value {
                                return Ok(false);
                            }
                        } else if diff > value {
                            return Ok(false);
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// `reduce_to_valuation(v)`: constrain so the only contained valuation is
    /// `v`, i.e. set every `(i, j)` to `(v(i) - v(j), <=)`.
    pub fn reduce_to_valuation(dim: usize, v: &[i64]) -> Dbm {
        debug_assert_eq!(v.len(), dim);
        let mut entries = vec![Bound::Infinity; dim * dim];
        for i in 0..dim {
            for j in 0..dim {
                entries[i * dim + j] = Bound::le(v[i] - v[j]);
            }
        }
        Dbm { dim, entries: Some(entries) }
    }

    /// Abstract inclusion under local LU bounds. Referenced for completeness
    /// (used by reachability variants outside the bisimulation core path);
    /// kept dead-but-tested per the source's own treatment of this operation
    /// as auxiliary.
    pub fn is_alu_included(d1: &Dbm, d2: &Dbm, l: &[i64], u: &[i64]) -> bool {
        if d1.is_empty() {
            return true;
        }
        if d2.is_empty() {
            return false;
        }
        let n = d1.dim;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d1ij = d1.get(i, j);
                let d2ij = d2.get(i, j);
                if let Bound::Finite { value: v1, .. } = d1ij {
                    let bound_i = if i == 0 { 0 } else { l[i - 1] };
                    let bound_j = if j == 0 { 0 } else { u[j - 1] };
                    if -bound_j <= v1 && v1 < bound_i {
                        match d2ij {
                            Bound::Infinity => return false,
                            Bound::Finite { value: v2, strict: s2 } => {
                                let (v1s, s1) = match d1ij {
                                    Bound::Finite { value, strict } => (value, strict),
                                    Bound::Infinity => unreachable!(),
                                };
                                let _ = v1s;
                                if v1 > v2 || (v1 == v2 && s1 && !s2) {
                                    return false;
                                }
                            }
                        }
                    }
                }
            }
        }
        true
    }
}

impl fmt::Debug for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entries {
            None => write!(f, "Dbm::empty(dim={})", self.dim),
            Some(e) => {
                writeln!(f, "Dbm(dim={}) {{", self.dim)?;
                for i in 0..self.dim {
                    write!(f, "  ")?;
                    for j in 0..self.dim {
                        write!(f, "{:?} ", e[i * self.dim + j])?;
                    }
                    writeln!(f)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_is_canonical_and_nonempty() {
        let d = Dbm::universal(3);
        assert!(!d.is_empty());
        assert!(d.belongs_int(&[0, 0, 0]).unwrap());
        assert!(d.belongs_int(&[0, 100, 100]).unwrap());
    }

    #[test]
    fn constrain_to_emptiness() {
        let mut d = Dbm::universal(2);
        d.constrain(0, 1, Bound::le(-1)).unwrap();
        let err = d.constrain(1, 0, Bound::le(-1));
        assert!(matches!(err, Err(DbmError::Empty)));
        assert!(d.is_empty());
    }

    #[test]
    fn tighten_propagates_triangle() {
        let mut d = Dbm::universal(3);
        d.constrain(1, 2, Bound::le(3)).unwrap();
        d.constrain(2, 0, Bound::le(2)).unwrap();
        assert!(matches!(d.get(1, 0), Bound::Finite { value: 5, strict: false }));
    }

    #[test]
    fn reset_sets_zero() {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::le(5)).unwrap();
        d.constrain(0, 1, Bound::le(-2)).unwrap();
        d.reset(1);
        assert!(d.belongs_int(&[0, 0]).unwrap());
        assert!(!d.belongs_int(&[0, 1]).unwrap());
    }

    #[test]
    fn delay_is_monotone_and_respects_invariant() {
        let mut d = Dbm::universal(2);
        d.constrain(1, 0, Bound::le(2)).unwrap();
        let inv = Dbm::universal(2);
        d.delay(&inv).unwrap();
        assert!(matches!(d.get(1, 0), Bound::Infinity));
    }

    #[test]
    fn reduce_to_valuation_is_a_point() {
        let d = Dbm::reduce_to_valuation(2, &[0, 3]);
        assert!(d.belongs_int(&[0, 3]).unwrap());
        assert!(!d.belongs_int(&[0, 2]).unwrap());
    }

    #[test]
    fn intersect_is_commutative_on_result() {
        let mut a = Dbm::universal(2);
        a.constrain(1, 0, Bound::le(5)).unwrap();
        let mut b = Dbm::universal(2);
        b.constrain(0, 1, Bound::le(-1)).unwrap();

        let mut ab = a.clone();
        ab.intersect(&b).unwrap();
        let mut ba = b.clone();
        ba.intersect(&a).unwrap();
        assert_eq!(ab, ba);
    }
}
