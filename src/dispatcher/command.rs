//! # Command definitions
//!
//! Every command known to the dispatcher is described by one of these: its name, group, COMMAND
//! flags, arity and the slice of its arguments that name database keys. Definitions are built by
//! the `dispatcher!` macro from a compact DSL; this module is just the data they populate.
use crate::{connection::Connection, error::Error, macros::Executable, value::Value};
use bytes::Bytes;
use std::{convert::TryInto, fmt};

/// Command flags, matching the set Redis reports from the `COMMAND` introspection command.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Flag {
    /// May result in database modification
    Write,
    /// Will never modify database
    ReadOnly,
    /// Can fail if the server runs out of memory
    DenyOom,
    /// Server admin command
    Admin,
    /// Not used, added to be compatible
    NoScript,
    /// Random result
    Random,
    /// Not used, added to be compatible
    SortForScript,
    /// Allow command while database is loading
    Loading,
    /// Allow command while replica has stale data
    Stale,
    /// Do not show this command in MONITOR
    SkipMonitor,
    /// Do not gather stats about slow log
    SkipSlowlog,
    /// The command is fast (close to O(log N))
    Fast,
    /// Command may be replicated to other nodes
    MayReplicate,
}

impl ToString for Flag {
    fn to_string(&self) -> String {
        match self {
            Self::Write => "write",
            Self::DenyOom => "denyoom",
            Self::ReadOnly => "readonly",
            Self::Admin => "admin",
            Self::NoScript => "noscript",
            Self::Random => "random",
            Self::SortForScript => "sort_for_script",
            Self::Loading => "loading",
            Self::Stale => "stale",
            Self::SkipMonitor => "skip_monitor",
            Self::SkipSlowlog => "skip_slowlog",
            Self::Fast => "fast",
            Self::MayReplicate => "may_replicate",
        }
        .to_owned()
    }
}

/// Command definition
pub struct Command {
    name: &'static str,
    group: &'static str,
    flags: &'static [Flag],
    min_args: i32,
    key_start: i32,
    key_stop: i32,
    key_step: usize,
    handler: Executable,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("flags", &self.flags)
            .field("min_args", &self.min_args)
            .finish()
    }
}

impl Command {
    /// Creates a new command definition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        group: &'static str,
        flags: &'static [Flag],
        min_args: i32,
        key_start: i32,
        key_stop: i32,
        key_step: usize,
        handler: Executable,
    ) -> Self {
        Self {
            name,
            group,
            flags,
            min_args,
            key_start,
            key_stop,
            key_step,
            handler,
        }
    }

    /// Invokes this command's handler.
    pub async fn execute(&self, conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
        (self.handler)(conn, args).await
    }

    /// Returns all database keys named by the command's arguments.
    pub fn get_keys<'a>(&self, args: &'a [Bytes]) -> Vec<&'a Bytes> {
        let start = self.key_start;
        let stop = if self.key_stop > 0 {
            self.key_stop
        } else {
            (args.len() as i32) + self.key_stop
        };

        if start == 0 {
            return vec![];
        }

        let mut result = vec![];
        for i in (start..stop + 1).step_by(self.key_step) {
            result.push(&args[i as usize]);
        }
        result
    }

    /// Checks if a given number of args is expected by this command.
    pub fn check_number_args(&self, n: usize) -> bool {
        if self.min_args >= 0 {
            n == (self.min_args as i32).try_into().unwrap_or(0)
        } else {
            let s: usize = (self.min_args as i32).unsigned_abs().try_into().unwrap_or(0);
            n >= s
        }
    }

    /// Returns information about this command, encoded the way the `COMMAND` command reports
    /// it.
    pub fn get_command_info(&self) -> Value {
        Value::Array(vec![
            self.name().into(),
            self.get_min_args().into(),
            Value::Array(
                self.get_flags()
                    .iter()
                    .map(|m| m.to_string().into())
                    .collect(),
            ),
            self.get_key_start().into(),
            self.get_key_stop().into(),
            self.get_key_step().into(),
        ])
    }

    /// Returns the command's flags.
    pub fn get_flags(&self) -> Vec<Flag> {
        self.flags.to_vec()
    }

    /// Returns the minimum arguments (including the command name itself) that this command
    /// takes. Also known as its arity.
    pub fn get_min_args(&self) -> i32 {
        self.min_args
    }

    /// Where the first database key starts in the arguments list.
    pub fn get_key_start(&self) -> i32 {
        self.key_start
    }

    /// Where the last database key ends in the arguments list.
    pub fn get_key_stop(&self) -> i32 {
        self.key_stop
    }

    /// The stride between successive keys in the arguments list.
    pub fn get_key_step(&self) -> usize {
        self.key_step
    }

    /// Command group.
    pub fn group(&self) -> &'static str {
        self.group
    }

    /// Command name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
