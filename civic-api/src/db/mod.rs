//! Issue and media queries
//!
//! Users, departments and workers live in `civic_common::db`; this layer owns
//! the tables only the HTTP service writes.

pub mod issues;
pub mod media;

pub use issues::{IssueChanges, IssueFilter, NewIssue, VoteKind};
pub use media::NewMedia;
