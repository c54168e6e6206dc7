//! Internal Implementation Details
//!
//! Not part of the public API.
//!
//! - [`constants`]: default timing budgets, limits and tolerances
//! - [`trace`]: logging macros over `defmt` and `log`

pub(crate) mod constants;
pub(crate) mod trace;
