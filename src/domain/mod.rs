//! Domain model: invoices, payments and the ports the engine talks through.

pub mod customer;
pub mod invoice;
pub mod money;
pub mod payment;
pub mod ports;
pub mod receipt;
pub mod trends;
