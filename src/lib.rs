//! Fetch Exchange calendar appointments or free/busy data for a list of
//! mailboxes and deliver the result as JSON.

pub mod cli;
pub mod delivery;
pub mod payload;
