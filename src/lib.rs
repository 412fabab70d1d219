//! rootserve: an HTTP server whose URL space is a directory tree
//!
//! Request paths resolve against configured code roots, whose files are
//! scriptlet manifests bound to compiled-in handlers, and then against
//! static roots served as plain files.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod path;
pub mod server;
