//! Concrete record types for restaurant listings and reviews

pub mod restaurant;
pub mod review;

pub use restaurant::{Restaurant, RestaurantPatch};
pub use review::{Review, ReviewPatch};
