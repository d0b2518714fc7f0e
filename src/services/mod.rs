pub mod commerce;
pub mod payment_gateway;
pub mod payments;
pub mod reviews;
