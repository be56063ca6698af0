//! # Sorted-set command handlers
//!
//! One function per command named in `ZADD`..`ZUNIONSTORE`. Argument parsing follows a common
//! shape: the command name at `args[0]` is skipped, the remaining arguments are drained into a
//! `VecDeque` so option tokens (`NX`, `WEIGHTS 1 2`, `LIMIT 0 10`, ...) can be peeled off the
//! front the same way `IOption::new` already does for `ZADD`.
use crate::{
    connection::Connection,
    error::Error,
    value::{
        bytes_to_number, bytes_to_score, score_to_value,
        sorted_set::{parse_lex_bound, parse_score_bound, Aggregate, IOption, IResult, LexBound, PopPolicy, SortedSet},
        Value,
    },
};
use bytes::Bytes;
use std::{collections::VecDeque, ops::Bound};

fn member_value(member: &Bytes) -> Value {
    Value::from(member)
}

fn pair_value(member: &Bytes, score: f64) -> Value {
    Value::Array(vec![member_value(member), score_to_value(score)])
}

fn members_reply(pairs: Vec<(Bytes, f64)>, withscores: bool) -> Value {
    if withscores {
        Value::Array(pairs.iter().map(|(m, s)| pair_value(m, *s)).collect())
    } else {
        Value::Array(pairs.iter().map(|(m, _)| member_value(m)).collect())
    }
}

/// Ascending (score, member) order, the natural output order for any derived set.
fn sorted_pairs(set: &SortedSet) -> Vec<(Bytes, f64)> {
    set.range_by_score(Bound::Unbounded, Bound::Unbounded)
}

fn args_tail(args: &[Bytes], skip: usize) -> VecDeque<Bytes> {
    args.iter().skip(skip).cloned().collect()
}

fn is_one_of(tok: &[u8], reserved: &[&[u8]]) -> bool {
    reserved.iter().any(|r| tok.eq_ignore_ascii_case(r))
}

/// Collects the leading run of plain key tokens, stopping at the first token that matches one
/// of `reserved` (case-insensitively) or at the end of `args`.
fn take_keys(args: &mut VecDeque<Bytes>, reserved: &[&[u8]]) -> Vec<Bytes> {
    let mut keys = Vec::new();
    while let Some(t) = args.front() {
        if is_one_of(t, reserved) {
            break;
        }
        keys.push(args.pop_front().expect("front just peeked"));
    }
    keys
}

/// Reads a `LIMIT offset count` clause, `LIMIT` already consumed from `args`.
fn parse_limit(args: &mut VecDeque<Bytes>) -> Result<(usize, Option<usize>), Error> {
    let offset_raw = args.pop_front().ok_or(Error::Syntax)?;
    let count_raw = args.pop_front().ok_or(Error::Syntax)?;
    let offset: i64 = bytes_to_number(&offset_raw).map_err(|_| Error::Syntax)?;
    let count: i64 = bytes_to_number(&count_raw).map_err(|_| Error::Syntax)?;
    if offset < 0 {
        return Err(Error::OutOfRange);
    }
    Ok((offset as usize, if count < 0 { None } else { Some(count as usize) }))
}

fn apply_limit(mut items: Vec<(Bytes, f64)>, limit: Option<(usize, Option<usize>)>) -> Vec<(Bytes, f64)> {
    if let Some((offset, count)) = limit {
        if offset >= items.len() {
            return vec![];
        }
        items = items.split_off(offset);
        if let Some(count) = count {
            items.truncate(count);
        }
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeMode {
    Score,
    Lex,
}

struct RangeSpec {
    mode: RangeMode,
    rev: bool,
    start: Bytes,
    stop: Bytes,
    limit: Option<(usize, Option<usize>)>,
}

/// Parses `start stop [BYSCORE|BYLEX] [REV] [LIMIT offset count] [WITHSCORES]`, `start`/`stop`
/// not yet consumed from `args`. `WITHSCORES` is only recognized when `allow_withscores`.
fn parse_range_spec(args: &mut VecDeque<Bytes>, allow_withscores: bool) -> Result<(RangeSpec, bool), Error> {
    let start = args.pop_front().ok_or(Error::Syntax)?;
    let stop = args.pop_front().ok_or(Error::Syntax)?;
    let mut mode = RangeMode::Score;
    let mut rev = false;
    let mut limit = None;
    let mut withscores = false;

    while let Some(t) = args.front() {
        match t.to_ascii_uppercase().as_slice() {
            b"BYSCORE" => {
                mode = RangeMode::Score;
                args.pop_front();
            }
            b"BYLEX" => {
                mode = RangeMode::Lex;
                args.pop_front();
            }
            b"REV" => {
                rev = true;
                args.pop_front();
            }
            b"LIMIT" => {
                args.pop_front();
                limit = Some(parse_limit(args)?);
            }
            b"WITHSCORES" if allow_withscores => {
                withscores = true;
                args.pop_front();
            }
            _ => return Err(Error::Syntax),
        }
    }

    Ok((
        RangeSpec {
            mode,
            rev,
            start,
            stop,
            limit,
        },
        withscores,
    ))
}

/// Selects and orders the members named by `spec` out of `set`. `REV` swaps which endpoint
/// holds the lower/upper bound before selection, then reverses the selected slice; `LIMIT` is
/// applied last, after the reversal.
fn collect_range(set: &SortedSet, spec: &RangeSpec) -> Result<Vec<(Bytes, f64)>, Error> {
    let (lo_raw, hi_raw) = if spec.rev {
        (&spec.stop, &spec.start)
    } else {
        (&spec.start, &spec.stop)
    };

    let mut items = match spec.mode {
        RangeMode::Score => {
            let lo = parse_score_bound(lo_raw)?;
            let hi = parse_score_bound(hi_raw)?;
            set.range_by_score(lo, hi)
        }
        RangeMode::Lex => {
            let lo = parse_lex_bound(lo_raw)?;
            let hi = parse_lex_bound(hi_raw)?;
            set.range_by_lex(&lo, &hi)
                .into_iter()
                .map(|m| {
                    let score = set.get(&m).unwrap_or(0.0);
                    (m, score)
                })
                .collect()
        }
    };

    if spec.rev {
        items.reverse();
    }

    Ok(apply_limit(items, spec.limit))
}

/// `ZADD key [NX|XX] [GT|LT] [CH] [INCR] score member [score member ...]`
///
/// Adds or updates members of the sorted set at `key`, creating it if absent. See
/// [`IOption`] for the option grammar. Without `INCR`, replies with the number of inserted
/// members (or inserted+updated when `CH` is given); with `INCR`, replies with the resulting
/// score of the single affected member.
pub async fn zadd(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).cloned().ok_or(Error::Syntax)?;
    let mut rest = args_tail(args, 2);
    let option = IOption::new(&mut rest)?;

    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(Error::Syntax);
    }
    if option.incr && rest.len() != 2 {
        return Err(Error::IncrArity);
    }

    let mut pairs = Vec::with_capacity(rest.len() / 2);
    while let Some(score_raw) = rest.pop_front() {
        let score = bytes_to_score(&score_raw)?;
        let member = rest.pop_front().ok_or(Error::Syntax)?;
        pairs.push((score, member));
    }

    if option.incr {
        let (score, member) = pairs.into_iter().next().expect("arity checked above");
        let new_score = conn.db().write_sorted_set(&key, |set| {
            set.insert(score, member.clone(), &option)?;
            Ok(set
                .get(&member)
                .expect("member is present after a successful insert"))
        })?;
        return Ok(score_to_value(new_score));
    }

    let (inserted, changed) = conn.db().write_sorted_set(&key, |set| {
        let mut inserted = 0usize;
        let mut changed = 0usize;
        for (score, member) in pairs {
            match set.insert(score, member, &option)? {
                IResult::Inserted => {
                    inserted += 1;
                    changed += 1;
                }
                IResult::Updated { changed: did_change } => {
                    if did_change {
                        changed += 1;
                    }
                }
                IResult::NoOp => {}
            }
        }
        Ok((inserted, changed))
    })?;

    Ok(if option.return_change { changed } else { inserted }.into())
}

/// `ZINCRBY key increment member` — adds `increment` to `member`'s score, creating `key` and
/// `member` as needed. Rejects the increment if `member` already holds `+inf`/`-inf`.
pub async fn zincrby(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).cloned().ok_or(Error::Syntax)?;
    let increment = bytes_to_score(args.get(2).ok_or(Error::Syntax)?)?;
    let member = args.get(3).cloned().ok_or(Error::Syntax)?;

    let option = IOption::incr();
    let new_score = conn.db().write_sorted_set(&key, |set| {
        set.insert(increment, member.clone(), &option)?;
        Ok(set
            .get(&member)
            .expect("member is present after a successful insert"))
    })?;

    Ok(score_to_value(new_score))
}

/// `ZCARD key` — cardinality of the sorted set at `key`, 0 if absent.
pub async fn zcard(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let n = conn
        .db()
        .read_sorted_set(key, |opt| opt.map(|s| s.cardinality()).unwrap_or(0))?;
    Ok(n.into())
}

/// `ZCOUNT key min max` — number of members with `min <= score <= max`.
pub async fn zcount(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let min = parse_score_bound(args.get(2).ok_or(Error::Syntax)?)?;
    let max = parse_score_bound(args.get(3).ok_or(Error::Syntax)?)?;
    let n = conn
        .db()
        .read_sorted_set(key, |opt| opt.map(|s| s.count_by_score(min, max)).unwrap_or(0))?;
    Ok(n.into())
}

/// `ZLEXCOUNT key min max` — number of members in the lex range; 0 if scores are not uniform.
pub async fn zlexcount(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let min = parse_lex_bound(args.get(2).ok_or(Error::Syntax)?)?;
    let max = parse_lex_bound(args.get(3).ok_or(Error::Syntax)?)?;
    let n = conn
        .db()
        .read_sorted_set(key, |opt| opt.map(|s| s.count_by_lex(&min, &max)).unwrap_or(0))?;
    Ok(n.into())
}

/// `ZDIFF key [key ...] [WITHSCORES]` — members of the first key's set absent from every other
/// key's set. An absent base key replies with an empty array; absent non-base keys count as
/// empty sets.
pub async fn zdiff(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let mut rest = args_tail(args, 1);
    let keys = take_keys(&mut rest, &[b"WITHSCORES"]);
    if keys.is_empty() {
        return Err(Error::Syntax);
    }
    let withscores = match rest.pop_front() {
        Some(t) if t.eq_ignore_ascii_case(b"WITHSCORES") => true,
        Some(_) => return Err(Error::Syntax),
        None => false,
    };
    if !rest.is_empty() {
        return Err(Error::Syntax);
    }

    let base = conn.db().read_sorted_set(&keys[0], |opt| opt.cloned())?;
    let base = match base {
        Some(set) => set,
        None => return Ok(Value::Array(vec![])),
    };

    let mut others = Vec::new();
    for key in &keys[1..] {
        if let Some(set) = conn.db().read_sorted_set(key, |opt| opt.cloned())? {
            others.push(set);
        }
    }
    let other_refs: Vec<&SortedSet> = others.iter().collect();
    let result = base.subtract(&other_refs);

    Ok(members_reply(sorted_pairs(&result), withscores))
}

/// `ZDIFFSTORE destination key [key ...]` — stores [`zdiff`]'s result at `destination`,
/// replying with its cardinality. If the base key is absent, `destination` is left untouched
/// and the reply is 0.
pub async fn zdiffstore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let destination = args.get(1).cloned().ok_or(Error::Syntax)?;
    let mut rest = args_tail(args, 2);
    let keys = take_keys(&mut rest, &[]);
    if keys.is_empty() || !rest.is_empty() {
        return Err(Error::Syntax);
    }

    let base = conn.db().read_sorted_set(&keys[0], |opt| opt.cloned())?;
    let base = match base {
        Some(set) => set,
        None => return Ok(0.into()),
    };

    let mut others = Vec::new();
    for key in &keys[1..] {
        if let Some(set) = conn.db().read_sorted_set(key, |opt| opt.cloned())? {
            others.push(set);
        }
    }
    let other_refs: Vec<&SortedSet> = others.iter().collect();
    let result = base.subtract(&other_refs);
    let len = conn.db().store_sorted_set(&destination, result);
    Ok(len.into())
}

/// Consumes the optional `WEIGHTS`/`AGGREGATE`/`WITHSCORES` tail shared by `ZINTER`, `ZUNION`
/// and their `*STORE` variants. Defaults weights to `1` per key and aggregate to `SUM`.
fn parse_weighted_opts(
    args: &mut VecDeque<Bytes>,
    nkeys: usize,
    allow_withscores: bool,
) -> Result<(Vec<f64>, Aggregate, bool), Error> {
    let mut weights = vec![1.0; nkeys];
    let mut aggregate = Aggregate::Sum;
    let mut withscores = false;

    while let Some(t) = args.front() {
        match t.to_ascii_uppercase().as_slice() {
            b"WEIGHTS" => {
                args.pop_front();
                let mut w = Vec::new();
                while let Some(t) = args.front() {
                    if is_one_of(t, &[b"AGGREGATE", b"WITHSCORES"]) {
                        break;
                    }
                    let raw = args.pop_front().expect("front just peeked");
                    w.push(bytes_to_number::<f64>(&raw).map_err(|_| Error::NotANumber)?);
                }
                if w.len() != nkeys {
                    return Err(Error::WeightsCountMismatch);
                }
                weights = w;
            }
            b"AGGREGATE" => {
                args.pop_front();
                let raw = args.pop_front().ok_or(Error::Syntax)?;
                aggregate = match raw.to_ascii_uppercase().as_slice() {
                    b"SUM" => Aggregate::Sum,
                    b"MIN" => Aggregate::Min,
                    b"MAX" => Aggregate::Max,
                    _ => return Err(Error::UnsupportedOption("AGGREGATE".to_owned())),
                };
            }
            b"WITHSCORES" if allow_withscores => {
                args.pop_front();
                withscores = true;
            }
            _ => return Err(Error::Syntax),
        }
    }

    Ok((weights, aggregate, withscores))
}

enum Combine {
    Inter,
    Union,
}

/// Shared core for `ZINTER`/`ZUNION` and their `*STORE` variants: parses the key list plus the
/// weighted-option tail, fetches each input (missing keys read as empty sets), and combines.
fn combine_sets(
    conn: &Connection,
    args: &[Bytes],
    skip: usize,
    combine: Combine,
    allow_withscores: bool,
) -> Result<(SortedSet, bool), Error> {
    let mut rest = args_tail(args, skip);
    let keys = take_keys(&mut rest, &[b"WEIGHTS", b"AGGREGATE", b"WITHSCORES"]);
    if keys.is_empty() {
        return Err(Error::Syntax);
    }
    let (weights, aggregate, withscores) = parse_weighted_opts(&mut rest, keys.len(), allow_withscores)?;

    let sets: Vec<Option<SortedSet>> = keys
        .iter()
        .map(|key| conn.db().read_sorted_set(key, |opt| opt.cloned()))
        .collect::<Result<_, Error>>()?;

    let result = match combine {
        Combine::Inter => {
            if sets.iter().any(Option::is_none) {
                SortedSet::new()
            } else {
                let base = sets[0].clone().expect("checked above");
                let others: Vec<SortedSet> = sets[1..].iter().map(|s| s.clone().expect("checked above")).collect();
                let other_refs: Vec<&SortedSet> = others.iter().collect();
                base.intersect(&other_refs, &weights, aggregate)
            }
        }
        Combine::Union => {
            let base = sets[0].clone().unwrap_or_default();
            let others: Vec<SortedSet> = sets[1..].iter().map(|s| s.clone().unwrap_or_default()).collect();
            let other_refs: Vec<&SortedSet> = others.iter().collect();
            base.union(&other_refs, &weights, aggregate)
        }
    };

    Ok((result, withscores))
}

/// `ZINTER key [key ...] [WEIGHTS w ...] [AGGREGATE SUM|MIN|MAX] [WITHSCORES]`
pub async fn zinter(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let (result, withscores) = combine_sets(conn, args, 1, Combine::Inter, true)?;
    Ok(members_reply(sorted_pairs(&result), withscores))
}

/// `ZINTERSTORE destination key [key ...] [WEIGHTS ...] [AGGREGATE ...]`
pub async fn zinterstore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let destination = args.get(1).cloned().ok_or(Error::Syntax)?;
    let (result, _) = combine_sets(conn, args, 2, Combine::Inter, false)?;
    let len = conn.db().store_sorted_set(&destination, result);
    Ok(len.into())
}

/// `ZUNION key [key ...] [WEIGHTS w ...] [AGGREGATE SUM|MIN|MAX] [WITHSCORES]`
pub async fn zunion(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let (result, withscores) = combine_sets(conn, args, 1, Combine::Union, true)?;
    Ok(members_reply(sorted_pairs(&result), withscores))
}

/// `ZUNIONSTORE destination key [key ...] [WEIGHTS ...] [AGGREGATE ...]`
pub async fn zunionstore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let destination = args.get(1).cloned().ok_or(Error::Syntax)?;
    let (result, _) = combine_sets(conn, args, 2, Combine::Union, false)?;
    let len = conn.db().store_sorted_set(&destination, result);
    Ok(len.into())
}

fn parse_count(raw: &Bytes) -> Result<usize, Error> {
    let count: i64 = bytes_to_number(raw).map_err(|_| Error::NotANumber)?;
    if count <= 0 {
        return Err(Error::CountOutOfRange);
    }
    Ok(count as usize)
}

/// `ZMPOP key [key ...] <MIN|MAX> [COUNT c]` — pops from the first key (in order) whose
/// sorted set is non-empty; keys holding something other than a sorted set are skipped rather
/// than raising `WRONGTYPE`. Replies `nil` if every key is missing, empty, or not a sorted set.
pub async fn zmpop(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let mut rest = args_tail(args, 1);
    let keys = take_keys(&mut rest, &[b"MIN", b"MAX"]);
    if keys.is_empty() {
        return Err(Error::Syntax);
    }
    let policy_tok = rest.pop_front().ok_or(Error::Syntax)?;
    let policy = match policy_tok.to_ascii_uppercase().as_slice() {
        b"MIN" => PopPolicy::Min,
        b"MAX" => PopPolicy::Max,
        _ => return Err(Error::Syntax),
    };

    let mut count = 1usize;
    if let Some(t) = rest.front() {
        if t.eq_ignore_ascii_case(b"COUNT") {
            rest.pop_front();
            count = parse_count(&rest.pop_front().ok_or(Error::Syntax)?)?;
        } else {
            return Err(Error::Syntax);
        }
    }
    if !rest.is_empty() {
        return Err(Error::Syntax);
    }

    for key in &keys {
        let nonempty = match conn.db().read_sorted_set(key, |opt| opt.map(|s| !s.is_empty()).unwrap_or(false)) {
            Ok(nonempty) => nonempty,
            Err(Error::WrongType) => false,
            Err(e) => return Err(e),
        };
        if !nonempty {
            continue;
        }
        let popped = conn.db().write_sorted_set(key, |set| Ok(set.pop(count, policy)))?;
        return Ok(Value::Array(popped.iter().map(|(m, s)| pair_value(m, *s)).collect()));
    }

    Ok(Value::NullArray)
}

async fn zpop(conn: &Connection, args: &[Bytes], policy: PopPolicy) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let count = match args.get(2) {
        Some(raw) => parse_count(raw)?,
        None => 1,
    };
    let popped = conn.db().write_sorted_set(key, |set| Ok(set.pop(count, policy)))?;
    Ok(Value::Array(popped.iter().map(|(m, s)| pair_value(m, *s)).collect()))
}

/// `ZPOPMIN key [count]` — pops up to `count` (default 1) lowest-scoring members.
pub async fn zpopmin(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    zpop(conn, args, PopPolicy::Min).await
}

/// `ZPOPMAX key [count]` — pops up to `count` (default 1) highest-scoring members.
pub async fn zpopmax(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    zpop(conn, args, PopPolicy::Max).await
}

/// `ZMSCORE key member [member ...]` — scores for each member, `nil` for an absent member. An
/// absent `key` replies with an *empty* array, unlike [`zscore`]'s `nil`.
pub async fn zmscore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let members = &args[2.min(args.len())..];
    if members.is_empty() {
        return Err(Error::Syntax);
    }

    let scores = conn
        .db()
        .read_sorted_set(key, |opt| opt.map(|set| members.iter().map(|m| set.get(m)).collect::<Vec<_>>()))?;

    match scores {
        None => Ok(Value::Array(vec![])),
        Some(scores) => Ok(Value::Array(
            scores
                .into_iter()
                .map(|s| s.map(score_to_value).unwrap_or(Value::NullBulk))
                .collect(),
        )),
    }
}

/// `ZSCORE key member` — the member's score, or `nil` if `key` or `member` is absent.
pub async fn zscore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let member = args.get(2).ok_or(Error::Syntax)?;
    let score = conn.db().read_sorted_set(key, |opt| opt.and_then(|s| s.get(member)))?;
    Ok(match score {
        Some(s) => score_to_value(s),
        None => Value::NullBulk,
    })
}

/// `ZRANDMEMBER key [count [WITHSCORES]]` — without `count`, a single random member (`nil` if
/// `key` is absent); with `count`, an array (`nil` array if `key` is absent). Positive `count`
/// samples distinct members, negative samples with replacement.
pub async fn zrandmember(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;

    let count_raw = match args.get(2) {
        Some(raw) => raw,
        None => {
            let picked = conn
                .db()
                .read_sorted_set(key, |opt| opt.and_then(|s| s.get_random(1).into_iter().next()))?;
            return Ok(match picked {
                Some((member, _)) => member_value(&member),
                None => Value::NullBulk,
            });
        }
    };
    let count: i64 = bytes_to_number(count_raw).map_err(|_| Error::NotANumber)?;

    let withscores = match args.get(3) {
        None => false,
        Some(t) if t.eq_ignore_ascii_case(b"WITHSCORES") && args.len() == 4 => true,
        Some(_) => return Err(Error::Syntax),
    };

    let picked = conn.db().read_sorted_set(key, |opt| opt.map(|s| s.get_random(count)))?;
    match picked {
        None => Ok(Value::NullArray),
        Some(pairs) => Ok(members_reply(pairs, withscores)),
    }
}

async fn zrank_impl(conn: &Connection, args: &[Bytes], rev: bool) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let member = args.get(2).ok_or(Error::Syntax)?;
    let withscore = match args.get(3) {
        None => false,
        Some(t) if t.eq_ignore_ascii_case(b"WITHSCORE") && args.len() == 4 => true,
        Some(_) => return Err(Error::Syntax),
    };

    let found = conn
        .db()
        .read_sorted_set(key, |opt| opt.and_then(|s| s.rank(member, rev).map(|r| (r, s.get(member).unwrap()))))?;

    Ok(match found {
        None => {
            if withscore {
                Value::NullArray
            } else {
                Value::NullBulk
            }
        }
        Some((rank, score)) => {
            if withscore {
                Value::Array(vec![rank.into(), score_to_value(score)])
            } else {
                rank.into()
            }
        }
    })
}

/// `ZRANK key member [WITHSCORE]` — ascending-order rank, or `nil` if missing.
pub async fn zrank(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    zrank_impl(conn, args, false).await
}

/// `ZREVRANK key member [WITHSCORE]` — descending-order rank, or `nil` if missing.
pub async fn zrevrank(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    zrank_impl(conn, args, true).await
}

/// `ZREM key member [member ...]` — removes the named members, replying with the count
/// actually removed.
pub async fn zrem(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let members = &args[2.min(args.len())..];
    if members.is_empty() {
        return Err(Error::Syntax);
    }
    let removed = conn
        .db()
        .write_sorted_set(key, |set| Ok(members.iter().filter(|m| set.remove(m)).count()))?;
    Ok(removed.into())
}

/// `ZREMRANGEBYSCORE key min max` — removes members with `min <= score <= max`.
pub async fn zremrangebyscore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let min = parse_score_bound(args.get(2).ok_or(Error::Syntax)?)?;
    let max = parse_score_bound(args.get(3).ok_or(Error::Syntax)?)?;
    let removed = conn.db().write_sorted_set(key, |set| Ok(set.remove_range_by_score(min, max)))?;
    Ok(removed.into())
}

/// `ZREMRANGEBYLEX key min max` — removes members in the lex range; 0 if scores are not
/// uniform.
pub async fn zremrangebylex(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let min = parse_lex_bound(args.get(2).ok_or(Error::Syntax)?)?;
    let max = parse_lex_bound(args.get(3).ok_or(Error::Syntax)?)?;
    let removed = conn.db().write_sorted_set(key, |set| Ok(set.remove_range_by_lex(&min, &max)))?;
    Ok(removed.into())
}

/// `ZREMRANGEBYRANK key start stop` — removes members whose ascending rank falls in
/// `[start, stop]` after negative-index normalization (`-1` is the last member). An absent or
/// empty set simply removes nothing; otherwise an index left out of `[0, cardinality-1]` after
/// normalization is an error.
pub async fn zremrangebyrank(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).ok_or(Error::Syntax)?;
    let start: i64 = bytes_to_number(args.get(2).ok_or(Error::Syntax)?).map_err(|_| Error::NotANumber)?;
    let stop: i64 = bytes_to_number(args.get(3).ok_or(Error::Syntax)?).map_err(|_| Error::NotANumber)?;

    let removed = conn.db().write_sorted_set(key, |set| {
        if set.is_empty() {
            return Ok(0);
        }
        let len = set.cardinality() as i64;
        let normalize = |i: i64| if i < 0 { i + len } else { i };
        let (ns, ne) = (normalize(start), normalize(stop));
        if ns < 0 || ne < 0 || ns >= len || ne >= len {
            return Err(Error::OutOfRange);
        }
        if ns > ne {
            return Ok(0);
        }
        Ok(set.remove_range_by_rank(ns as usize, ne as usize))
    })?;
    Ok(removed.into())
}

/// `ZRANGE key start stop [BYSCORE|BYLEX] [REV] [LIMIT offset count] [WITHSCORES]` — `BYSCORE`
/// is the default mode (there is no rank/index mode in this command set).
pub async fn zrange(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let key = args.get(1).cloned().ok_or(Error::Syntax)?;
    let mut rest = args_tail(args, 2);
    let (spec, withscores) = parse_range_spec(&mut rest, true)?;

    let result = conn.db().read_sorted_set(&key, |opt| match opt {
        Some(set) => collect_range(set, &spec),
        None => Ok(vec![]),
    })??;

    Ok(members_reply(result, withscores))
}

/// `ZRANGESTORE destination source start stop [BYSCORE|BYLEX] [REV] [LIMIT offset count]` —
/// stores the selection at `destination`, replying with its cardinality.
pub async fn zrangestore(conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
    let destination = args.get(1).cloned().ok_or(Error::Syntax)?;
    let source = args.get(2).cloned().ok_or(Error::Syntax)?;
    let mut rest = args_tail(args, 3);
    let (spec, _) = parse_range_spec(&mut rest, false)?;

    let result = conn.db().read_sorted_set(&source, |opt| match opt {
        Some(set) => collect_range(set, &spec),
        None => Ok(vec![]),
    })??;

    let len = conn.db().store_sorted_set(&destination, SortedSet::from_pairs(result));
    Ok(len.into())
}

#[cfg(test)]
mod test {
    use crate::{
        bytes,
        cmd::test::{create_connection, run_command},
        error::Error,
        value::Value,
    };
    use bytes::BytesMut;

    #[tokio::test]
    async fn wrong_type_is_reported() {
        let c = create_connection();
        c.db()
            .insert_for_test(&bytes!("foo"), Value::Blob(BytesMut::from(&b"hi"[..])));

        assert!(matches!(
            run_command(&c, &["zcard", "foo"]).await,
            Err(Error::WrongType)
        ));
        assert!(matches!(
            run_command(&c, &["zadd", "foo", "5", "a"]).await,
            Err(Error::WrongType)
        ));
    }

    #[tokio::test]
    async fn zadd_and_zcard_and_zscore() {
        let c = create_connection();
        assert_eq!(
            Ok(5.into()),
            run_command(
                &c,
                &["zadd", "k", "5.5", "m1", "67.77", "m2", "10", "m3", "-inf", "m4", "+inf", "m5"]
            )
            .await
        );
        assert_eq!(Ok(5.into()), run_command(&c, &["zcard", "k"]).await);
        assert_eq!(Ok(Value::Blob("-inf".into())), run_command(&c, &["zscore", "k", "m4"]).await);
    }

    #[tokio::test]
    async fn zadd_nx_is_noop_on_existing() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "m"]).await.unwrap();
        assert_eq!(Ok(0.into()), run_command(&c, &["zadd", "k", "nx", "99", "m"]).await);
        assert_eq!(Ok(Value::Blob("1".into())), run_command(&c, &["zscore", "k", "m"]).await);
    }

    #[tokio::test]
    async fn zadd_xx_is_noop_on_absent() {
        let c = create_connection();
        assert_eq!(Ok(0.into()), run_command(&c, &["zadd", "k", "xx", "1", "m"]).await);
        assert_eq!(Ok(0.into()), run_command(&c, &["zcard", "k"]).await);
    }

    #[tokio::test]
    async fn zadd_xx_ch_gt_scenario() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "5.5", "m1", "67.77", "m2", "10", "m3"]).await.unwrap();
        assert_eq!(
            Ok(1.into()),
            run_command(&c, &["zadd", "k", "xx", "ch", "gt", "7.5", "m1", "100.5", "m4", "15", "m5"]).await
        );
        assert_eq!(Ok(Value::Blob("7.5".into())), run_command(&c, &["zscore", "k", "m1"]).await);
        assert_eq!(Ok(Value::NullBulk), run_command(&c, &["zscore", "k", "m4"]).await);
    }

    #[tokio::test]
    async fn zadd_incr_requires_single_pair() {
        let c = create_connection();
        assert_eq!(
            Err(Error::IncrArity),
            run_command(&c, &["zadd", "k", "incr", "1", "a", "2", "b"]).await
        );
    }

    #[tokio::test]
    async fn zadd_incr_replies_with_new_score() {
        let c = create_connection();
        assert_eq!(Ok(Value::Blob("5".into())), run_command(&c, &["zadd", "k", "incr", "5", "m"]).await);
        assert_eq!(Ok(Value::Blob("8".into())), run_command(&c, &["zincrby", "k", "3", "m"]).await);
    }

    #[tokio::test]
    async fn zincrby_on_infinite_errors() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "+inf", "m"]).await.unwrap();
        assert_eq!(Err(Error::IncrInfinite), run_command(&c, &["zincrby", "k", "1", "m"]).await);
    }

    #[tokio::test]
    async fn zcount_and_zlexcount() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b", "3", "c"]).await.unwrap();
        assert_eq!(Ok(2.into()), run_command(&c, &["zcount", "k", "1", "2"]).await);
        assert_eq!(Ok(3.into()), run_command(&c, &["zcount", "k", "-inf", "+inf"]).await);

        let c2 = create_connection();
        run_command(&c2, &["zadd", "c2", "1", "a", "1", "b", "1", "c"]).await.unwrap();
        assert_eq!(Ok(2.into()), run_command(&c2, &["zlexcount", "c2", "[a", "(c"]).await);
    }

    #[tokio::test]
    async fn zdiff_scenario() {
        let a = create_connection();
        run_command(&a, &["zadd", "a", "1", "one", "2", "two", "3", "three", "4", "four"]).await.unwrap();
        run_command(&a, &["zadd", "b", "3", "three", "4", "four", "5", "five"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![
                Value::Array(vec![Value::from("one"), Value::Blob("1".into())]),
                Value::Array(vec![Value::from("two"), Value::Blob("2".into())]),
            ])),
            run_command(&a, &["zdiff", "a", "b", "withscores"]).await
        );
    }

    #[tokio::test]
    async fn zdiffstore_leaves_destination_untouched_when_base_missing() {
        let c = create_connection();
        run_command(&c, &["zadd", "dest", "1", "keepme"]).await.unwrap();
        assert_eq!(Ok(0.into()), run_command(&c, &["zdiffstore", "dest", "missing", "other"]).await);
        assert_eq!(Ok(1.into()), run_command(&c, &["zcard", "dest"]).await);
    }

    #[tokio::test]
    async fn zinter_weighted_aggregate_scenario() {
        let c = create_connection();
        run_command(&c, &["zadd", "a", "1", "one", "2", "two"]).await.unwrap();
        run_command(&c, &["zadd", "b", "1", "one", "2", "two"]).await.unwrap();
        run_command(&c, &["zadd", "c", "1", "one"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![Value::Array(vec![Value::from("one"), Value::Blob("1".into())])])),
            run_command(
                &c,
                &["zinter", "a", "b", "c", "withscores", "aggregate", "min", "weights", "1", "5", "3"]
            )
            .await
        );
    }

    #[tokio::test]
    async fn zinter_with_missing_key_is_empty() {
        let c = create_connection();
        run_command(&c, &["zadd", "a", "1", "one"]).await.unwrap();
        assert_eq!(Ok(Value::Array(vec![])), run_command(&c, &["zinter", "a", "missing"]).await);
    }

    #[tokio::test]
    async fn zunion_with_empty_equals_input() {
        let c = create_connection();
        run_command(&c, &["zadd", "a", "1", "one", "2", "two"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![
                Value::Array(vec![Value::from("one"), Value::Blob("1".into())]),
                Value::Array(vec![Value::from("two"), Value::Blob("2".into())]),
            ])),
            run_command(&c, &["zunion", "a", "missing", "withscores"]).await
        );
    }

    #[tokio::test]
    async fn zmpop_scenario() {
        let c = create_connection();
        run_command(
            &c,
            &["zadd", "k", "1", "one", "2", "two", "3", "three", "4", "four", "5", "five", "6", "six"],
        )
        .await
        .unwrap();
        assert_eq!(
            Ok(Value::Array(vec![
                Value::Array(vec![Value::from("six"), Value::Blob("6".into())]),
                Value::Array(vec![Value::from("five"), Value::Blob("5".into())]),
                Value::Array(vec![Value::from("four"), Value::Blob("4".into())]),
                Value::Array(vec![Value::from("three"), Value::Blob("3".into())]),
                Value::Array(vec![Value::from("two"), Value::Blob("2".into())]),
            ])),
            run_command(&c, &["zmpop", "k", "max", "count", "5"]).await
        );
        assert_eq!(Ok(1.into()), run_command(&c, &["zcard", "k"]).await);
    }

    #[tokio::test]
    async fn zmpop_skips_missing_keys() {
        let c = create_connection();
        run_command(&c, &["zadd", "k2", "1", "a"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![Value::Array(vec![Value::from("a"), Value::Blob("1".into())])])),
            run_command(&c, &["zmpop", "missing", "k2", "min"]).await
        );
    }

    #[tokio::test]
    async fn zmpop_nil_when_all_absent() {
        let c = create_connection();
        assert_eq!(Ok(Value::NullArray), run_command(&c, &["zmpop", "a", "b", "min"]).await);
    }

    #[tokio::test]
    async fn zpopmin_and_zpopmax() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b", "3", "c"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![Value::Array(vec![Value::from("a"), Value::Blob("1".into())])])),
            run_command(&c, &["zpopmin", "k"]).await
        );
        assert_eq!(
            Ok(Value::Array(vec![Value::Array(vec![Value::from("c"), Value::Blob("3".into())])])),
            run_command(&c, &["zpopmax", "k"]).await
        );
    }

    #[tokio::test]
    async fn zpopmin_on_absent_key_is_empty() {
        let c = create_connection();
        assert_eq!(Ok(Value::Array(vec![])), run_command(&c, &["zpopmin", "missing"]).await);
    }

    #[tokio::test]
    async fn zmscore_distinguishes_missing_key_from_missing_member() {
        let c = create_connection();
        assert_eq!(Ok(Value::Array(vec![])), run_command(&c, &["zmscore", "missing", "a"]).await);

        run_command(&c, &["zadd", "k", "1", "a"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![Value::Blob("1".into()), Value::NullBulk])),
            run_command(&c, &["zmscore", "k", "a", "b"]).await
        );
        assert_eq!(Ok(Value::NullBulk), run_command(&c, &["zscore", "missing", "a"]).await);
    }

    #[tokio::test]
    async fn zrandmember_distinct_and_with_replacement() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b"]).await.unwrap();
        assert_eq!(Ok(Value::NullBulk), run_command(&c, &["zrandmember", "missing"]).await);
        assert_eq!(Ok(Value::NullArray), run_command(&c, &["zrandmember", "missing", "3"]).await);
        if let Ok(Value::Array(v)) = run_command(&c, &["zrandmember", "k", "-4"]).await {
            assert_eq!(4, v.len());
        } else {
            panic!("expected array reply");
        }
    }

    #[tokio::test]
    async fn zrank_and_zrevrank() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b", "3", "c"]).await.unwrap();
        assert_eq!(Ok(0.into()), run_command(&c, &["zrank", "k", "a"]).await);
        assert_eq!(Ok(0.into()), run_command(&c, &["zrevrank", "k", "c"]).await);
        assert_eq!(Ok(Value::NullBulk), run_command(&c, &["zrank", "k", "missing"]).await);
        assert_eq!(
            Ok(Value::Array(vec![0.into(), Value::Blob("1".into())])),
            run_command(&c, &["zrank", "k", "a", "withscore"]).await
        );
    }

    #[tokio::test]
    async fn zrem_counts_actual_removals() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b"]).await.unwrap();
        assert_eq!(Ok(1.into()), run_command(&c, &["zrem", "k", "a", "missing"]).await);
    }

    #[tokio::test]
    async fn zremrangebylex_scenario() {
        let c = create_connection();
        run_command(
            &c,
            &["zadd", "k", "1", "a", "1", "b", "1", "c", "1", "d", "1", "e", "1", "f", "1", "g", "1", "h", "1", "i", "1", "j"],
        )
        .await
        .unwrap();
        assert_eq!(Ok(4.into()), run_command(&c, &["zremrangebylex", "k", "[a", "[d"]).await);
        assert_eq!(
            Ok(Value::Array(
                ["e", "f", "g", "h", "i", "j"].iter().map(|m| Value::from(*m)).collect()
            )),
            run_command(&c, &["zrange", "k", "-inf", "+inf", "byscore"]).await
        );
    }

    #[tokio::test]
    async fn zremrangebyrank_empties_set() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b", "3", "c"]).await.unwrap();
        assert_eq!(Ok(3.into()), run_command(&c, &["zremrangebyrank", "k", "0", "-1"]).await);
        assert_eq!(Ok(0.into()), run_command(&c, &["zcard", "k"]).await);
    }

    #[tokio::test]
    async fn zremrangebyrank_oob_errors() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a"]).await.unwrap();
        assert_eq!(Err(Error::OutOfRange), run_command(&c, &["zremrangebyrank", "k", "5", "10"]).await);
    }

    #[tokio::test]
    async fn zrange_default_is_byscore_and_supports_limit() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b", "3", "c", "4", "d"]).await.unwrap();
        assert_eq!(
            Ok(Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c"), Value::from("d")])),
            run_command(&c, &["zrange", "k", "-inf", "+inf"]).await
        );
        assert_eq!(
            Ok(Value::Array(vec![Value::from("b"), Value::from("c")])),
            run_command(&c, &["zrange", "k", "-inf", "+inf", "limit", "1", "2"]).await
        );
        assert_eq!(
            Ok(Value::Array(vec![Value::from("d"), Value::from("c"), Value::from("b"), Value::from("a")])),
            run_command(&c, &["zrange", "k", "+inf", "-inf", "rev"]).await
        );
    }

    #[tokio::test]
    async fn zrange_limit_rejects_negative_offset() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a"]).await.unwrap();
        assert_eq!(
            Err(Error::OutOfRange),
            run_command(&c, &["zrange", "k", "-inf", "+inf", "limit", "-1", "10"]).await
        );
    }

    #[tokio::test]
    async fn zrangestore_scenario() {
        let c = create_connection();
        run_command(&c, &["zadd", "src", "1", "a", "2", "b", "3", "c"]).await.unwrap();
        assert_eq!(Ok(2.into()), run_command(&c, &["zrangestore", "dst", "src", "1", "2", "byscore"]).await);
        assert_eq!(Ok(2.into()), run_command(&c, &["zcard", "dst"]).await);
    }

    #[tokio::test]
    async fn zrange_bylex_requires_uniform_scores() {
        let c = create_connection();
        run_command(&c, &["zadd", "k", "1", "a", "2", "b"]).await.unwrap();
        assert_eq!(Ok(Value::Array(vec![])), run_command(&c, &["zrange", "k", "-", "+", "bylex"]).await);
    }
}
