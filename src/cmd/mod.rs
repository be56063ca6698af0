//! # Command handlers
//!
//! One submodule per command family exposed by the dispatcher. This build only speaks the
//! sorted-set family; the surface CLI, configuration, TLS, replication, ACL, HTTP transport,
//! plug-ins, persistence and every other data-type family are out of scope here.
pub mod sorted_set;
