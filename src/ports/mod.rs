//! Ports - interfaces between the application core and the outside world.
//!
//! Repositories front the two persistent stores, the event bus ports
//! front the broker, the gateway traits front external payment
//! processors, and the token/lookup ports front the identity and
//! subscription services.

mod activity_repository;
mod enrollment_repository;
mod event_bus;
mod payment_gateway;
mod payment_repository;
mod plan_repository;
mod subscription_lookup;
mod subscription_repository;
mod token_service;
mod user_repository;

pub use activity_repository::{ActivityRepository, ActivitySearch};
pub use enrollment_repository::EnrollmentRepository;
pub use event_bus::{EventHandler, EventPublisher, EventSubscriber};
pub use payment_gateway::{
    GatewayPaymentRequest, GatewayPaymentResult, GatewayPaymentStatus, GatewayProvider,
    GatewayRefund, GatewayStatus, GatewayWebhookEvent, PaymentGateway, RecurringGateway,
    RecurringRequest, RecurringResult, RecurringWebhookEvent,
};
pub use payment_repository::PaymentRepository;
pub use plan_repository::{PageRequest, PagedPlans, PlanFilter, PlanRepository};
pub use subscription_lookup::{SubscriptionLookup, VerifiedPlan, VerifiedSubscription};
pub use subscription_repository::SubscriptionRepository;
pub use token_service::{TokenIssuer, TokenVerifier};
pub use user_repository::UserRepository;
