//! Wire and domain types shared by every `ddc` crate.
//!
//! These types describe what the control plane wants running on this host.
//! They carry no behaviour beyond validation helpers and are safe to clone freely.

mod domain;
pub use domain::*;
