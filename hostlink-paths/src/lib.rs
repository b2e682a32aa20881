//! Path safety checks for user-chosen data directories.
//!
//! A directory is acceptable when it exists, is writable, carries no system
//! attribute, and lies outside every protected root (program installation
//! directories, shared program directories, system directories). The
//! validator is stateless apart from its root list. [`PathValidator::prepare`]
//! creates a user-named directory before checking it.

mod roots;
mod validator;
mod verdict;

pub use roots::system_roots;
pub use validator::PathValidator;
pub use verdict::{PathVerdict, RejectReason};
