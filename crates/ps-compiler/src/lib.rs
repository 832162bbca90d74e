//! PrivShield Filter List Compiler
//!
//! This crate parses ABP-syntax filter lists into `ps_core` rule lists and
//! loads the bundled list assets at startup.

pub mod parser;
pub mod repository;

pub use parser::{parse_filter_list, version_of};
pub use repository::{CancelToken, LoadHandle, RepositoryError, RuleListRepository};
