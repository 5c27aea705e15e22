//! Client-side helpers: the cooperative status poll loop a submitter runs
//! while waiting for an admin decision.

pub mod poll;

pub use poll::{PollConfig, PollHandle, PollState, PollTarget, StatusPoller};
