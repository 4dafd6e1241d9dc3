//! Settlement documents (invoices, bills, estimates, orders) and payments

pub mod document;
pub mod totals;

pub use document::*;
pub use totals::*;
