use crate::{connection::Connection, error::Error, value::Value};
use bytes::Bytes;

/// A type-erased command handler. Every `cmd::*` async function gets boxed into one of
/// these by the `dispatcher!` macro so the registry can hold them all in a single map.
pub type Executable = for<'a> fn(
    &'a Connection,
    &'a [Bytes],
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, Error>> + Send + 'a>>;

#[macro_export]
macro_rules! dispatcher {
    {
        $($group:ident {
            $($command:ident {
                $handler:expr,
                [$($tag:expr)+],
                $min_args:expr,
                $key_start:expr,
                $key_stop:expr,
                $key_step:expr,
            },)+
        },)+
    } => {
        use $crate::dispatcher::command::Command;

        /// Registry of every known command, keyed by its upper-case name.
        pub struct Dispatcher {
            commands: std::collections::HashMap<&'static str, Command>,
        }

        impl Dispatcher {
            /// Builds the full command table. Cheap enough to call once per server.
            pub fn new() -> Self {
                let mut commands = std::collections::HashMap::new();
                $(
                    $(
                        commands.insert(
                            stringify!($command),
                            Command::new(
                                stringify!($command),
                                stringify!($group),
                                &[$($tag,)+],
                                $min_args,
                                $key_start,
                                $key_stop,
                                $key_step,
                                (|conn: &Connection, args: &[Bytes]| {
                                    Box::pin($handler(conn, args))
                                        as std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, Error>> + Send + '_>>
                                }) as $crate::macros::Executable,
                            ),
                        );
                    )+
                )+
                Self { commands }
            }

            /// Looks up a command by name and validates its arity.
            pub fn get_handler(&self, args: &[Bytes]) -> Result<&Command, Error> {
                let name = args.first().ok_or(Error::Syntax)?;
                let name = String::from_utf8_lossy(name).to_uppercase();

                let command = self
                    .commands
                    .get(name.as_str())
                    .ok_or_else(|| Error::CommandNotFound(name.to_lowercase()))?;

                if !command.check_number_args(args.len()) {
                    return Err(Error::InvalidArgsCount(command.name().to_lowercase()));
                }

                Ok(command)
            }

            /// Looks up and runs the handler for a command line in one step.
            pub async fn execute(&self, conn: &Connection, args: &[Bytes]) -> Result<Value, Error> {
                let command = self.get_handler(args)?;
                command.execute(conn, args).await
            }

            /// All registered commands, used by the COMMAND introspection handler.
            pub fn commands(&self) -> impl Iterator<Item = &Command> {
                self.commands.values()
            }
        }

        impl Default for Dispatcher {
            fn default() -> Self {
                Self::new()
            }
        }
    }
}

/// Compares `args[$idx]` against a string literal, case-insensitively.
#[macro_export]
macro_rules! check_arg {
    ($args:expr, $idx:expr, $str:expr) => {
        $args
            .get($idx)
            .map(|arg| arg.eq_ignore_ascii_case($str.as_bytes()))
            .unwrap_or(false)
    };
}

/// Fetches `args[$idx]` as an owned `Bytes`, or bails out with a syntax error.
#[macro_export]
macro_rules! try_get_arg {
    ($args:expr, $idx:expr) => {
        $args.get($idx).cloned().ok_or($crate::error::Error::Syntax)?
    };
}

/// Fetches `args[$idx]` as an owned, UTF-8 `String`, or bails out with a syntax error.
#[macro_export]
macro_rules! try_get_arg_str {
    ($args:expr, $idx:expr) => {
        String::from_utf8_lossy(&$crate::try_get_arg!($args, $idx)).to_string()
    };
}

/// Builds an owned `Bytes` from anything that can be viewed as a byte slice.
#[macro_export]
macro_rules! bytes {
    ($e:expr) => {
        bytes::Bytes::copy_from_slice($e.as_ref())
    };
}

#[macro_export]
macro_rules! value_try_from {
    {$type: ty, $value: expr} => {
        impl From<$type> for Value {
            fn from(value: $type) -> Value {
                $value(value.into())
            }
        }

        value_vec_try_from!($type);
    }
}

#[macro_export]
macro_rules! value_vec_try_from {
    {$type: ty} => {
        impl From<Vec<$type>> for Value {
            fn from(value: Vec<$type>) -> Value {
                Value::Array(value.iter().map(|x| (*x).into()).collect())
            }
        }
    }
}
