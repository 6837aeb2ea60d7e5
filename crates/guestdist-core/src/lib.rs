pub mod distance;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod search;
pub mod types;

pub use engine::{distance, guest_distance, nearest_neighbors};
pub use error::{GdcError, GdcResult};
pub use matcher::GuestMatcher;
pub use types::*;
