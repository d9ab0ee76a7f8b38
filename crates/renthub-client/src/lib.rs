pub mod client;
pub mod optimistic;

pub use client::{ClientError, LikeControl, RentHubClient};
pub use optimistic::{OptimisticToggle, ToggleState};
