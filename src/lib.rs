//! # Bookkeeping Core
//!
//! Double-entry journal posting and invoice/bill settlement for accounting
//! backends.
//!
//! ## Features
//!
//! - **Chart of accounts**: Assets, Liabilities, Equity, Income and Expense accounts with hierarchy
//! - **Journal entries**: Draft, validate and post balanced entries; balances move atomically
//! - **Settlement documents**: Invoices, bills, estimates and orders with line-level discount and tax
//! - **Payments**: Apply, track and reverse payments against open invoices and bills
//! - **Reporting**: Trial balance, point-in-time balances and integrity checks
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bookkeeping_core::{DocumentBuilder, DocumentKind, Ledger, LineItem, Payment, PaymentMode};
//! use bookkeeping_core::utils::MemoryStorage;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> bookkeeping_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStorage::new());
//! let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
//!
//! let invoice = DocumentBuilder::new(DocumentKind::Invoice, "INV-1".into(), "CUST-1".into(), date)
//!     .item(LineItem::new("SKU-1".into(), BigDecimal::from(1), BigDecimal::from(1000))
//!         .with_tax_rate(BigDecimal::from(18)))
//!     .sent();
//! let invoice = ledger.create_document(invoice).await?;
//! assert_eq!(invoice.total(), &BigDecimal::from(1180));
//!
//! let payment = Payment::new(date, PaymentMode::BankTransfer, BigDecimal::from(500)).for_document("INV-1".into());
//! ledger.record_payment(payment).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod settlement;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::LedgerConfig;
pub use ledger::*;
pub use settlement::*;
pub use traits::*;
pub use types::*;

// Re-export journal patterns for convenience
pub use ledger::journal::patterns;
