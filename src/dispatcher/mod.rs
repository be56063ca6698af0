//! # Dispatcher
//!
//! Here is where every command is defined. Each command has some definition and a handler. Their
//! handler are rust functions.
//!
//! Each command is defined with the dispatcher macro, which generates efficient and developer
//! friendly code. This build only speaks the sorted-set command family; see `cmd` for why.
use crate::{cmd, connection::Connection, dispatcher, error::Error, value::Value};
use bytes::Bytes;
use command::Flag;

pub mod command;

dispatcher! {
    sorted_set {
        ZADD {
            cmd::sorted_set::zadd,
            [Flag::Write Flag::DenyOom],
            -4,
            1,
            1,
            1,
        },
        ZCARD {
            cmd::sorted_set::zcard,
            [Flag::ReadOnly Flag::Fast],
            2,
            1,
            1,
            1,
        },
        ZCOUNT {
            cmd::sorted_set::zcount,
            [Flag::ReadOnly Flag::Fast],
            4,
            1,
            1,
            1,
        },
        ZLEXCOUNT {
            cmd::sorted_set::zlexcount,
            [Flag::ReadOnly Flag::Fast],
            4,
            1,
            1,
            1,
        },
        ZDIFF {
            cmd::sorted_set::zdiff,
            [Flag::ReadOnly Flag::SortForScript],
            -2,
            1,
            -1,
            1,
        },
        ZDIFFSTORE {
            cmd::sorted_set::zdiffstore,
            [Flag::Write Flag::DenyOom],
            -3,
            1,
            -1,
            1,
        },
        ZINCRBY {
            cmd::sorted_set::zincrby,
            [Flag::Write Flag::DenyOom Flag::Fast],
            4,
            1,
            1,
            1,
        },
        ZINTER {
            cmd::sorted_set::zinter,
            [Flag::ReadOnly Flag::SortForScript],
            -2,
            1,
            -1,
            1,
        },
        ZINTERSTORE {
            cmd::sorted_set::zinterstore,
            [Flag::Write Flag::DenyOom],
            -3,
            1,
            -1,
            1,
        },
        ZMPOP {
            cmd::sorted_set::zmpop,
            [Flag::Write],
            -3,
            1,
            -1,
            1,
        },
        ZPOPMIN {
            cmd::sorted_set::zpopmin,
            [Flag::Write Flag::Fast],
            -2,
            1,
            1,
            1,
        },
        ZPOPMAX {
            cmd::sorted_set::zpopmax,
            [Flag::Write Flag::Fast],
            -2,
            1,
            1,
            1,
        },
        ZMSCORE {
            cmd::sorted_set::zmscore,
            [Flag::ReadOnly Flag::Fast],
            -3,
            1,
            1,
            1,
        },
        ZSCORE {
            cmd::sorted_set::zscore,
            [Flag::ReadOnly Flag::Fast],
            3,
            1,
            1,
            1,
        },
        ZRANDMEMBER {
            cmd::sorted_set::zrandmember,
            [Flag::ReadOnly Flag::Random],
            -2,
            1,
            1,
            1,
        },
        ZRANK {
            cmd::sorted_set::zrank,
            [Flag::ReadOnly Flag::Fast],
            -3,
            1,
            1,
            1,
        },
        ZREVRANK {
            cmd::sorted_set::zrevrank,
            [Flag::ReadOnly Flag::Fast],
            -3,
            1,
            1,
            1,
        },
        ZREM {
            cmd::sorted_set::zrem,
            [Flag::Write Flag::Fast],
            -3,
            1,
            1,
            1,
        },
        ZREMRANGEBYSCORE {
            cmd::sorted_set::zremrangebyscore,
            [Flag::Write],
            4,
            1,
            1,
            1,
        },
        ZREMRANGEBYRANK {
            cmd::sorted_set::zremrangebyrank,
            [Flag::Write],
            4,
            1,
            1,
            1,
        },
        ZREMRANGEBYLEX {
            cmd::sorted_set::zremrangebylex,
            [Flag::Write],
            4,
            1,
            1,
            1,
        },
        ZRANGE {
            cmd::sorted_set::zrange,
            [Flag::ReadOnly],
            -4,
            1,
            1,
            1,
        },
        ZRANGESTORE {
            cmd::sorted_set::zrangestore,
            [Flag::Write Flag::DenyOom],
            -5,
            1,
            2,
            1,
        },
        ZUNION {
            cmd::sorted_set::zunion,
            [Flag::ReadOnly Flag::SortForScript],
            -2,
            1,
            -1,
            1,
        },
        ZUNIONSTORE {
            cmd::sorted_set::zunionstore,
            [Flag::Write Flag::DenyOom],
            -3,
            1,
            -1,
            1,
        },
    },
}
