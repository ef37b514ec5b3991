//! Subscription domain - a user's ongoing right to enroll.

mod status;
mod subscription;

pub use status::SubscriptionState;
pub use subscription::{Renewal, Subscription};
