//! Payment domain - payment lifecycle and the events it emits.

mod events;
mod payment;
mod status;

pub use events::{payment_envelope, PaymentEvent};
pub use payment::{EntityType, NewPayment, Payment, PaymentType};
pub use status::PaymentStatus;
