//! Payment gateway adapters and the name -> instance factory.

mod cash;
mod factory;
mod mercadopago;
mod mock;

pub use cash::CashGateway;
pub use factory::GatewayFactory;
pub use mercadopago::{MercadoPagoGateway, MercadoPagoRecurringGateway};
pub use mock::{MockGateway, MockGatewayBehavior};
