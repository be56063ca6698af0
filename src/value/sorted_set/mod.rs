//! # Sorted set engine
//!
//! A `SortedSet` is a mapping from a member (an opaque, non-empty byte string) to a score (a
//! finite or infinite `f64`, never NaN). It exposes three derived orderings: by score (ties
//! broken lexicographically), by rank (the dense position in that ordering), and by lex (only
//! meaningful when every member shares one score).
mod insert;

use bytes::Bytes;
use float_ord::FloatOrd;
use rand::{seq::SliceRandom, Rng};
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    ops::Bound,
};

pub use insert::{IOption, IResult};
use insert::{IPolicy, UPolicyScore};

/// Aggregate function used by `union`/`intersect` to combine per-input weighted scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum of the weighted scores
    Sum,
    /// Smallest of the weighted scores
    Min,
    /// Largest of the weighted scores
    Max,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::Sum
    }
}

/// MIN or MAX, as passed to `pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopPolicy {
    /// Pop the lowest-scoring members first
    Min,
    /// Pop the highest-scoring members first
    Max,
}

/// An inclusive/exclusive score bound, as used by the `BYSCORE`-style range queries. `-inf`
/// and `+inf` are ordinary (included) values here: since every score lies between them, they
/// naturally express an unbounded range without needing a separate "unbounded" variant.
pub type ScoreBound = Bound<f64>;

/// A lexicographic bound, as used by the `BYLEX`-style range queries: `-`/`+` stand for the
/// smallest/largest possible value, `[x` is inclusive, `(x` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// Smaller than every member
    NegInfinity,
    /// Larger than every member
    PosInfinity,
    /// `member >= value` (ascending) / `member <= value` (descending)
    Included(Bytes),
    /// `member > value` (ascending) / `member < value` (descending)
    Excluded(Bytes),
}

fn score_key(score: f64, member: &Bytes) -> (FloatOrd<f64>, Bytes) {
    (FloatOrd(score), member.clone())
}

/// Parses a `ZCOUNT`/`ZRANGEBYSCORE`-style bound: a bare number (or `-inf`/`+inf`) is
/// inclusive, a `(`-prefixed number is exclusive.
pub fn parse_score_bound(raw: &[u8]) -> Result<ScoreBound, crate::error::Error> {
    if let Some(rest) = raw.strip_prefix(b"(") {
        Ok(Bound::Excluded(crate::value::bytes_to_score(rest)?))
    } else {
        Ok(Bound::Included(crate::value::bytes_to_score(raw)?))
    }
}

/// Parses a `ZRANGEBYLEX`-style bound: `-`/`+` for the unbounded ends, `[value` for inclusive,
/// `(value` for exclusive. Any other shape is a syntax error.
pub fn parse_lex_bound(raw: &[u8]) -> Result<LexBound, crate::error::Error> {
    match raw.first() {
        Some(b'-') if raw.len() == 1 => Ok(LexBound::NegInfinity),
        Some(b'+') if raw.len() == 1 => Ok(LexBound::PosInfinity),
        Some(b'[') => Ok(LexBound::Included(Bytes::copy_from_slice(&raw[1..]))),
        Some(b'(') => Ok(LexBound::Excluded(Bytes::copy_from_slice(&raw[1..]))),
        _ => Err(crate::error::Error::Syntax),
    }
}

/// An ordered collection keyed by member with a floating point score.
#[derive(Debug, Clone)]
pub struct SortedSet {
    scores: HashMap<Bytes, f64>,
    order: BTreeSet<(FloatOrd<f64>, Bytes)>,
}

impl Default for SortedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SortedSet {
    fn eq(&self, other: &SortedSet) -> bool {
        self.scores == other.scores
    }
}

impl SortedSet {
    /// Creates an empty sorted set.
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            order: BTreeSet::new(),
        }
    }

    /// Creates a sorted set from a sequence of (member, score) pairs. Later pairs for the same
    /// member overwrite earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Bytes, f64)>) -> Self {
        let mut set = Self::new();
        for (member, score) in pairs {
            set.force_insert(member, score);
        }
        set
    }

    fn force_insert(&mut self, member: Bytes, score: f64) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.order.remove(&score_key(old, &member));
        }
        self.order.insert(score_key(score, &member));
    }

    /// Whether `member` is present.
    pub fn contains(&self, member: &Bytes) -> bool {
        self.scores.contains_key(member)
    }

    /// The member's current score, if present.
    pub fn get(&self, member: &Bytes) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// All (member, score) pairs, in no particular order.
    pub fn get_all(&self) -> Vec<(Bytes, f64)> {
        self.scores.iter().map(|(m, s)| (m.clone(), *s)).collect()
    }

    /// Number of entries.
    pub fn cardinality(&self) -> usize {
        self.scores.len()
    }

    /// Alias of [`cardinality`](Self::cardinality), matching the collection-ish naming used
    /// elsewhere.
    pub fn len(&self) -> usize {
        self.cardinality()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Removes `member`. Returns true iff removal occurred.
    pub fn remove(&mut self, member: &Bytes) -> bool {
        if let Some(score) = self.scores.remove(member) {
            self.order.remove(&score_key(score, member));
            true
        } else {
            false
        }
    }

    /// Applies an add-or-update policy to a single (member, score) pair.
    ///
    /// `score` is the literal score unless `option.incr` is set, in which case it is an
    /// increment applied to the member's current score (or to 0.0 if the member is absent).
    pub fn insert(&mut self, score: f64, member: Bytes, option: &IOption) -> Result<IResult, InsertError> {
        match self.scores.get(&member).copied() {
            Some(current) => {
                if option.insert_policy == Some(IPolicy::NX) {
                    return Ok(IResult::NoOp);
                }

                if option.incr && current.is_infinite() {
                    return Err(InsertError::IncrInfinite);
                }

                let new_score = if option.incr { current + score } else { score };

                if new_score.is_nan() {
                    return Err(InsertError::ScoreNotANumber);
                }

                let passes_comparison = match option.update_policy_score {
                    Some(UPolicyScore::GT) => new_score > current,
                    Some(UPolicyScore::LT) => new_score < current,
                    None => true,
                };

                if !passes_comparison {
                    return Ok(IResult::NoOp);
                }

                let changed = new_score != current;
                self.force_insert(member, new_score);
                Ok(IResult::Updated { changed })
            }
            None => {
                if option.insert_policy == Some(IPolicy::XX) {
                    if option.incr {
                        // There is nothing to increment: XX forbids creating the member, and
                        // unlike a plain ZADD XX no-op, ZINCRBY-style callers need to surface
                        // this rather than silently report a nil score.
                        return Err(InsertError::IncrMissing);
                    }
                    return Ok(IResult::NoOp);
                }

                if score.is_nan() {
                    return Err(InsertError::ScoreNotANumber);
                }
                self.force_insert(member, score);
                Ok(IResult::Inserted)
            }
        }
    }

    /// A new set containing every (member, score) of `self` whose member does not appear in
    /// any of `others`. Scores are taken from `self`.
    pub fn subtract(&self, others: &[&SortedSet]) -> SortedSet {
        let mut result = SortedSet::new();
        for (member, score) in self.scores.iter() {
            if !others.iter().any(|o| o.contains(member)) {
                result.force_insert(member.clone(), *score);
            }
        }
        result
    }

    fn weighted_combine<'a>(
        member: &Bytes,
        sets: &[&'a SortedSet],
        weights: &[f64],
        aggregate: Aggregate,
    ) -> Option<f64> {
        let mut acc: Option<f64> = None;
        for (set, weight) in sets.iter().zip(weights.iter()) {
            if let Some(score) = set.get(member) {
                let contribution = score * weight;
                acc = Some(match acc {
                    None => contribution,
                    Some(prev) => match aggregate {
                        Aggregate::Sum => prev + contribution,
                        Aggregate::Min => prev.min(contribution),
                        Aggregate::Max => prev.max(contribution),
                    },
                });
            }
        }
        acc
    }

    /// A new set with every member present in `self` or any of `others`, combining weighted
    /// contributions with `aggregate`. `weights[0]` applies to `self`, `weights[1..]` to
    /// `others` in order.
    pub fn union(&self, others: &[&SortedSet], weights: &[f64], aggregate: Aggregate) -> SortedSet {
        let mut sets = vec![self];
        sets.extend_from_slice(others);

        let mut members: Vec<&Bytes> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for set in sets.iter() {
            for member in set.scores.keys() {
                if seen.insert(member) {
                    members.push(member);
                }
            }
        }

        let mut result = SortedSet::new();
        for member in members {
            if let Some(score) = Self::weighted_combine(member, &sets, weights, aggregate) {
                result.force_insert(member.clone(), score);
            }
        }
        result
    }

    /// A new set containing only members present in `self` *and* every one of `others`,
    /// combining weighted contributions with `aggregate`.
    pub fn intersect(
        &self,
        others: &[&SortedSet],
        weights: &[f64],
        aggregate: Aggregate,
    ) -> SortedSet {
        let mut sets = vec![self];
        sets.extend_from_slice(others);

        let mut result = SortedSet::new();
        for member in self.scores.keys() {
            if others.iter().all(|o| o.contains(member)) {
                if let Some(score) = Self::weighted_combine(member, &sets, weights, aggregate) {
                    result.force_insert(member.clone(), score);
                }
            }
        }
        result
    }

    /// Removes and returns up to `count` members with the lowest (`PopPolicy::Min`) or highest
    /// (`PopPolicy::Max`) scores, tie-broken by ascending lex order of member.
    pub fn pop(&mut self, count: usize, policy: PopPolicy) -> Vec<(Bytes, f64)> {
        let keys: Vec<(FloatOrd<f64>, Bytes)> = match policy {
            PopPolicy::Min => self.order.iter().take(count).cloned().collect(),
            PopPolicy::Max => self.order.iter().rev().take(count).cloned().collect(),
        };

        let mut result = Vec::with_capacity(keys.len());
        for (score, member) in keys {
            self.order.remove(&(score, member.clone()));
            self.scores.remove(&member);
            result.push((member, score.0));
        }
        result
    }

    /// Returns a random sample of members. `count >= 0` samples that many *distinct* members
    /// (capped at the cardinality); `count < 0` samples `|count|` members *with replacement*.
    pub fn get_random(&self, count: i64) -> Vec<(Bytes, f64)> {
        if count == 0 || self.scores.is_empty() {
            return vec![];
        }

        let mut rng = rand::thread_rng();
        let entries: Vec<(&Bytes, &f64)> = self.scores.iter().collect();

        if count > 0 {
            let n = (count as usize).min(entries.len());
            let mut indices: Vec<usize> = (0..entries.len()).collect();
            indices.shuffle(&mut rng);
            indices
                .into_iter()
                .take(n)
                .map(|i| (entries[i].0.clone(), *entries[i].1))
                .collect()
        } else {
            let n = count.unsigned_abs() as usize;
            (0..n)
                .map(|_| {
                    let i = rng.gen_range(0..entries.len());
                    (entries[i].0.clone(), *entries[i].1)
                })
                .collect()
        }
    }

    /// 0-based rank of `member` under ascending-by-score order (`rev = false`) or
    /// descending-by-score order (`rev = true`). Lex tie-breaks follow the same direction.
    pub fn rank(&self, member: &Bytes, rev: bool) -> Option<usize> {
        let score = self.get(member)?;
        let key = score_key(score, member);
        let ascending_rank = self.order.range(..&key).count();
        Some(if rev {
            self.cardinality() - 1 - ascending_rank
        } else {
            ascending_rank
        })
    }

    fn score_range_bounds(
        min: ScoreBound,
        max: ScoreBound,
    ) -> (
        Bound<(FloatOrd<f64>, Bytes)>,
        Bound<(FloatOrd<f64>, Bytes)>,
    ) {
        let lo = Bytes::new();
        let hi = Bytes::from(vec![0xffu8; 8192]);

        let low = match min {
            Bound::Included(s) => Bound::Included((FloatOrd(s), lo.clone())),
            Bound::Excluded(s) => Bound::Excluded((FloatOrd(s), hi.clone())),
            Bound::Unbounded => Bound::Unbounded,
        };
        let high = match max {
            Bound::Included(s) => Bound::Included((FloatOrd(s), hi)),
            Bound::Excluded(s) => Bound::Excluded((FloatOrd(s), lo)),
            Bound::Unbounded => Bound::Unbounded,
        };
        (low, high)
    }

    /// Number of members with `min <= score <= max` (subject to the bound exclusivity).
    pub fn count_by_score(&self, min: ScoreBound, max: ScoreBound) -> usize {
        self.order.range(Self::score_range_bounds(min, max)).count()
    }

    /// Members with `min <= score <= max`, ascending by (score, member). Use `.rev()` on the
    /// caller side (via the `rev` flag of range commands) to reverse.
    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound) -> Vec<(Bytes, f64)> {
        self.order
            .range(Self::score_range_bounds(min, max))
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }

    /// Whether every member currently shares the same score (a precondition for the lex-range
    /// operations). An empty set is vacuously uniform.
    fn has_uniform_score(&self) -> bool {
        let mut scores = self.scores.values();
        match scores.next() {
            None => true,
            Some(first) => scores.all(|s| s == first),
        }
    }

    fn lex_cmp(a: &Bytes, b: &Bytes) -> Ordering {
        a.as_ref().cmp(b.as_ref())
    }

    fn passes_lex(member: &Bytes, min: &LexBound, max: &LexBound) -> bool {
        let above_min = match min {
            LexBound::NegInfinity => true,
            LexBound::PosInfinity => false,
            LexBound::Included(v) => Self::lex_cmp(member, v) != Ordering::Less,
            LexBound::Excluded(v) => Self::lex_cmp(member, v) == Ordering::Greater,
        };
        let below_max = match max {
            LexBound::PosInfinity => true,
            LexBound::NegInfinity => false,
            LexBound::Included(v) => Self::lex_cmp(member, v) != Ordering::Greater,
            LexBound::Excluded(v) => Self::lex_cmp(member, v) == Ordering::Less,
        };
        above_min && below_max
    }

    /// Members whose value lies in `[min, max]` (lex semantics), sorted ascending. Returns
    /// empty if the set does not share a single score.
    pub fn range_by_lex(&self, min: &LexBound, max: &LexBound) -> Vec<Bytes> {
        if !self.has_uniform_score() {
            return vec![];
        }
        let mut members: Vec<Bytes> = self
            .order
            .iter()
            .map(|(_, m)| m.clone())
            .filter(|m| Self::passes_lex(m, min, max))
            .collect();
        members.sort_by(|a, b| Self::lex_cmp(a, b));
        members
    }

    /// Number of members in the lex range. 0 if the set does not share a single score.
    pub fn count_by_lex(&self, min: &LexBound, max: &LexBound) -> usize {
        self.range_by_lex(min, max).len()
    }

    /// Removes members with `min <= score <= max`, returning the count removed.
    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> usize {
        let members: Vec<Bytes> = self.range_by_score(min, max).into_iter().map(|(m, _)| m).collect();
        for member in members.iter() {
            self.remove(member);
        }
        members.len()
    }

    /// Removes members in the lex range, returning the count removed (0 if the set does not
    /// share a single score).
    pub fn remove_range_by_lex(&mut self, min: &LexBound, max: &LexBound) -> usize {
        let members = self.range_by_lex(min, max);
        for member in members.iter() {
            self.remove(member);
        }
        members.len()
    }

    /// Removes members whose ascending rank lies in `[start, stop]` (already normalized,
    /// 0-based, inclusive), returning the count removed.
    pub fn remove_range_by_rank(&mut self, start: usize, stop: usize) -> usize {
        let members: Vec<Bytes> = self
            .order
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= start && *i <= stop)
            .map(|(_, (_, m))| m.clone())
            .collect();
        for member in members.iter() {
            self.remove(member);
        }
        members.len()
    }
}

/// Errors raised by [`SortedSet::insert`] under the constraints described in the ZADD/ZINCRBY
/// option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The new score (a literal value, or the result of an INCR) is NaN.
    ScoreNotANumber,
    /// INCR was applied to a member whose current score is already `+inf`/`-inf`.
    IncrInfinite,
    /// INCR was combined with XX against a member that does not exist.
    IncrMissing,
}

impl From<InsertError> for crate::error::Error {
    fn from(err: InsertError) -> Self {
        match err {
            InsertError::ScoreNotANumber => crate::error::Error::ScoreNotANumber,
            InsertError::IncrInfinite => crate::error::Error::IncrInfinite,
            InsertError::IncrMissing => crate::error::Error::IncrMissing,
        }
    }
}
