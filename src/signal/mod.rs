//! Signal extraction: preprocessing, extremum detection and prominence
//! filtering.
//!
//! ```text
//!   Table ──prepare──▶ Table ──detect──▶ candidates ──filter──▶ Filtered
//!         (bounds, columns,      (sign flip,          (prominence >
//!          ewm smoothing)         min height)          threshold)
//! ```
//!
//! Every function here is pure; nothing is cached between calls.

pub mod detect;
pub mod prepare;
pub mod prominence;
pub mod summary;

pub use detect::{Direction, detect};
pub use prepare::{Smoothing, prepare};
pub use prominence::{Filtered, filter};
