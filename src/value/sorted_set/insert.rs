//! # ZADD option parsing
//!
//! `ZADD key [NX|XX] [GT|LT] [CH] [INCR] score member [score member ...]` accepts a run of
//! leading option tokens before the score/member pairs start. This module pulls those tokens
//! off the front of the argument list and turns them into a typed `IOption`.
use crate::error::Error;
use bytes::Bytes;
use std::collections::VecDeque;

/// NX/XX: restricts whether `insert` may create, update, or both.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum IPolicy {
    NX,
    XX,
}

/// GT/LT: restricts an update to cases where the new score compares favorably.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum UPolicyScore {
    LT,
    GT,
}

/// Parsed ZADD option block.
#[derive(Debug, Default, Clone)]
pub struct IOption {
    pub(crate) insert_policy: Option<IPolicy>,
    pub(crate) update_policy_score: Option<UPolicyScore>,
    /// CH: report the number of changed elements (inserted + updated) rather than just inserted.
    pub return_change: bool,
    /// INCR: the provided score is a delta applied to the member's current score.
    pub incr: bool,
}

impl IOption {
    /// Options for a bare ZINCRBY-style increment: no restrictions, always INCR.
    pub fn incr() -> Self {
        Self {
            incr: true,
            ..Default::default()
        }
    }

    /// Consumes the leading NX/XX/GT/LT/CH/INCR tokens of `args`, leaving the score/member
    /// pairs (or the INCR increment/member pair) behind.
    pub fn new(args: &mut VecDeque<Bytes>) -> Result<Self, Error> {
        let mut insert_policy = None;
        let mut update_policy_score = None;
        let mut return_change = false;
        let mut incr = false;

        while let Some(t) = args.front() {
            match t.to_ascii_uppercase().as_slice() {
                b"NX" => {
                    if insert_policy == Some(IPolicy::XX) {
                        return Err(Error::OptsNotCompatible("XX and NX".to_owned()));
                    }
                    insert_policy = Some(IPolicy::NX);
                }
                b"XX" => {
                    if insert_policy == Some(IPolicy::NX) {
                        return Err(Error::OptsNotCompatible("XX and NX".to_owned()));
                    }
                    insert_policy = Some(IPolicy::XX);
                }
                b"LT" => {
                    if update_policy_score == Some(UPolicyScore::GT) {
                        return Err(Error::OptsNotCompatible("GT and LT".to_owned()));
                    }
                    update_policy_score = Some(UPolicyScore::LT);
                }
                b"GT" => {
                    if update_policy_score == Some(UPolicyScore::LT) {
                        return Err(Error::OptsNotCompatible("GT and LT".to_owned()));
                    }
                    update_policy_score = Some(UPolicyScore::GT);
                }
                b"CH" => {
                    return_change = true;
                }
                b"INCR" => {
                    incr = true;
                }
                _ => break,
            }
            args.pop_front();
        }

        if insert_policy == Some(IPolicy::NX) && update_policy_score.is_some() {
            return Err(Error::OptsNotCompatible(
                "GT, LT, and/or NX".to_owned(),
            ));
        }

        Ok(Self {
            insert_policy,
            update_policy_score,
            return_change,
            incr,
        })
    }
}

/// Outcome of a single `insert` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IResult {
    /// Nothing happened: filtered by NX/XX/GT/LT
    NoOp,
    /// The member was freshly inserted
    Inserted,
    /// The member already existed; `changed` is false when the new score equals the old one
    /// (relevant only to ZADD's CH count, INCR always reports the resulting score)
    Updated {
        /// Whether the stored score actually differs from the previous one
        changed: bool,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytes;

    fn args(tokens: &[&str]) -> VecDeque<Bytes> {
        tokens.iter().map(|t| bytes!(t)).collect()
    }

    #[test]
    fn parses_nx_ch() {
        let mut a = args(&["NX", "CH", "5", "m"]);
        let opt = IOption::new(&mut a).unwrap();
        assert_eq!(Some(IPolicy::NX), opt.insert_policy);
        assert!(opt.return_change);
        assert_eq!(2, a.len());
    }

    #[test]
    fn rejects_nx_with_gt() {
        let mut a = args(&["NX", "GT", "5", "m"]);
        assert!(IOption::new(&mut a).is_err());
    }

    #[test]
    fn rejects_xx_with_nx() {
        let mut a = args(&["XX", "NX", "5", "m"]);
        assert!(IOption::new(&mut a).is_err());
    }

    #[test]
    fn no_options() {
        let mut a = args(&["5", "m"]);
        let opt = IOption::new(&mut a).unwrap();
        assert_eq!(None, opt.insert_policy);
        assert_eq!(2, a.len());
    }
}
