//! Core types and data structures for the bookkeeping system

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of fractional digits carried by every monetary field unless configured otherwise
pub const DEFAULT_SCALE: i64 = 2;

/// Round a monetary value half-up to `scale` fractional digits
pub fn round_money(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::HalfUp)
}

/// Returns true if `value` carries no more than `scale` fractional digits
pub fn fits_scale(value: &BigDecimal, scale: i64) -> bool {
    value.with_scale(scale) == *value
}

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Receivables, Inventory, etc.)
    Asset,
    /// Liabilities - what the business owes (Payables, Loans, GST Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business
    Equity,
    /// Income - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    ///
    /// Assets and Expenses normally carry debit balances; Liabilities, Equity
    /// and Income normally carry credit balances.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => EntryType::Credit,
        }
    }

    /// Net change in balance caused by a line with the given debit and credit amounts
    pub fn balance_effect(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        match self.normal_balance() {
            EntryType::Debit => debit - credit,
            EntryType::Credit => credit - debit,
        }
    }
}

/// Side of a double-entry posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Increases Assets and Expenses, decreases Liabilities, Equity and Income
    Debit,
    /// Increases Liabilities, Equity and Income, decreases Assets and Expenses
    Credit,
}

/// A node in the chart of accounts carrying a running balance.
///
/// Balances are not publicly settable. `current_balance` moves only when a
/// journal entry touching this account is posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Unique account code (e.g. "1000")
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account, fixing the sign convention of its balance
    pub account_type: AccountType,
    /// Optional parent account code for a hierarchical chart
    pub parent_code: Option<String>,
    pub description: Option<String>,
    /// Inactive accounts keep their history but accept no new postings
    pub is_active: bool,
    pub(crate) opening_balance: BigDecimal,
    pub(crate) current_balance: BigDecimal,
    pub(crate) version: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LedgerAccount {
    /// Create a new account with zero balances
    pub fn new(
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            code,
            name,
            account_type,
            parent_code,
            description: None,
            is_active: true,
            opening_balance: BigDecimal::from(0),
            current_balance: BigDecimal::from(0),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn opening_balance(&self) -> &BigDecimal {
        &self.opening_balance
    }

    pub fn current_balance(&self) -> &BigDecimal {
        &self.current_balance
    }

    /// Optimistic concurrency counter, bumped on every stored change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply one journal line to the running balance
    pub(crate) fn apply_line(&mut self, debit: &BigDecimal, credit: &BigDecimal) {
        self.current_balance += self.account_type.balance_effect(debit, credit);
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    pub(crate) fn reset_opening_balance(&mut self, amount: BigDecimal) {
        self.current_balance = amount.clone();
        self.opening_balance = amount;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// Origin of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEntryType {
    Manual,
    System,
    Recurring,
}

/// A single debit or credit line within a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    /// Code of the account being affected
    pub account_code: String,
    pub description: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
}

impl JournalEntryLine {
    /// Create a debit line
    pub fn debit(account_code: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self {
            account_code,
            description,
            debit_amount: amount,
            credit_amount: BigDecimal::from(0),
        }
    }

    /// Create a credit line
    pub fn credit(account_code: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self {
            account_code,
            description,
            debit_amount: BigDecimal::from(0),
            credit_amount: amount,
        }
    }

    /// The side this line posts to, if exactly one side is nonzero
    pub fn side(&self) -> Option<EntryType> {
        let zero = BigDecimal::from(0);
        match (self.debit_amount != zero, self.credit_amount != zero) {
            (true, false) => Some(EntryType::Debit),
            (false, true) => Some(EntryType::Credit),
            _ => None,
        }
    }

    /// Structural checks that do not depend on the configured scale
    pub fn check_shape(&self) -> LedgerResult<()> {
        if self.account_code.trim().is_empty() {
            return Err(LedgerError::validation(
                "Journal line must reference an account",
            ));
        }

        let zero = BigDecimal::from(0);
        if self.debit_amount < zero || self.credit_amount < zero {
            return Err(LedgerError::validation(format!(
                "Journal line for account '{}' has a negative amount",
                self.account_code
            )));
        }

        if self.side().is_none() {
            return Err(LedgerError::validation(format!(
                "Journal line for account '{}' must carry an amount on exactly one of debit or credit",
                self.account_code
            )));
        }

        Ok(())
    }

    /// Full line validation at the given monetary scale
    pub fn validate(&self, scale: i64) -> LedgerResult<()> {
        self.check_shape()?;

        if !fits_scale(&self.debit_amount, scale) || !fits_scale(&self.credit_amount, scale) {
            return Err(LedgerError::validation(format!(
                "Journal line for account '{}' exceeds {} decimal places",
                self.account_code, scale
            )));
        }

        Ok(())
    }
}

/// Balanced set of debit/credit lines, posted atomically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry number (e.g. "JE-0001")
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub entry_type: JournalEntryType,
    /// Optional external reference (invoice number, cheque number, etc.)
    pub reference: Option<String>,
    pub description: String,
    pub(crate) lines: Vec<JournalEntryLine>,
    pub(crate) total_debit: BigDecimal,
    pub(crate) total_credit: BigDecimal,
    pub(crate) is_posted: bool,
    pub(crate) posted_at: Option<NaiveDateTime>,
    pub(crate) version: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl JournalEntry {
    /// Create a new, empty draft entry
    pub fn new(
        entry_number: String,
        entry_date: NaiveDate,
        entry_type: JournalEntryType,
        description: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            entry_number,
            entry_date,
            entry_type,
            reference: None,
            description,
            lines: Vec::new(),
            total_debit: BigDecimal::from(0),
            total_credit: BigDecimal::from(0),
            is_posted: false,
            posted_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lines(&self) -> &[JournalEntryLine] {
        &self.lines
    }

    pub fn total_debit(&self) -> &BigDecimal {
        &self.total_debit
    }

    pub fn total_credit(&self) -> &BigDecimal {
        &self.total_credit
    }

    pub fn is_posted(&self) -> bool {
        self.is_posted
    }

    pub fn posted_at(&self) -> Option<NaiveDateTime> {
        self.posted_at
    }

    /// Optimistic concurrency counter, bumped on every stored change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if debits equal credits
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }

    /// Append a line to a draft entry
    pub fn add_line(&mut self, line: JournalEntryLine) -> LedgerResult<()> {
        self.ensure_draft()?;
        line.check_shape()?;
        self.lines.push(line);
        self.recompute_totals();
        Ok(())
    }

    /// Replace every line of a draft entry
    pub fn replace_lines(&mut self, lines: Vec<JournalEntryLine>) -> LedgerResult<()> {
        self.ensure_draft()?;
        for line in &lines {
            line.check_shape()?;
        }
        self.lines = lines;
        self.recompute_totals();
        Ok(())
    }

    /// Line count, line shape and debit/credit equality, independent of scale
    pub fn check_balanced(&self) -> LedgerResult<()> {
        if self.lines.len() < 2 {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' must have at least two lines",
                self.entry_number
            )));
        }

        for line in &self.lines {
            line.check_shape()?;
        }

        // Cached totals may be stale on deserialized records
        let debits: BigDecimal = self.lines.iter().map(|l| &l.debit_amount).sum();
        let credits: BigDecimal = self.lines.iter().map(|l| &l.credit_amount).sum();
        if debits != credits {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' is not balanced: debits = {}, credits = {}",
                self.entry_number, debits, credits
            )));
        }

        Ok(())
    }

    /// Validate that the entry may be posted at the given monetary scale
    pub fn validate(&self, scale: i64) -> LedgerResult<()> {
        self.check_balanced()?;
        for line in &self.lines {
            line.validate(scale)?;
        }
        Ok(())
    }

    pub(crate) fn ensure_draft(&self) -> LedgerResult<()> {
        if self.is_posted {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' is posted and cannot be modified",
                self.entry_number
            )));
        }
        Ok(())
    }

    pub(crate) fn recompute_totals(&mut self) {
        self.total_debit = self.lines.iter().map(|l| &l.debit_amount).sum();
        self.total_credit = self.lines.iter().map(|l| &l.credit_amount).sum();
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    pub(crate) fn mark_posted(&mut self, at: NaiveDateTime) {
        self.is_posted = true;
        self.posted_at = Some(at);
        self.updated_at = at;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// Kind of line-itemised document. All kinds share one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Bill,
    Estimate,
    SalesOrder,
    PurchaseOrder,
}

impl DocumentKind {
    /// Only invoices and bills carry an outstanding balance that payments settle
    pub fn accepts_payments(&self) -> bool {
        matches!(self, DocumentKind::Invoice | DocumentKind::Bill)
    }

    /// Direction of cash for payments against this kind
    pub fn payment_direction(&self) -> Option<PaymentDirection> {
        match self {
            DocumentKind::Invoice => Some(PaymentDirection::Received),
            DocumentKind::Bill => Some(PaymentDirection::Made),
            _ => None,
        }
    }
}

/// Lifecycle status of a settlement document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Paid,
    Partial,
    Overdue,
    Void,
}

/// One line of a settlement document.
///
/// `tax` and `amount` are derived when the owning document computes its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog item reference
    pub item: String,
    pub description: Option<String>,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    /// Flat discount taken off `quantity * rate`
    pub discount: BigDecimal,
    /// Tax percentage applied to the discounted amount
    pub tax_rate: BigDecimal,
    pub(crate) tax: BigDecimal,
    pub(crate) amount: BigDecimal,
}

impl LineItem {
    pub fn new(item: String, quantity: BigDecimal, rate: BigDecimal) -> Self {
        Self {
            item,
            description: None,
            quantity,
            rate,
            discount: BigDecimal::from(0),
            tax_rate: BigDecimal::from(0),
            tax: BigDecimal::from(0),
            amount: BigDecimal::from(0),
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_discount(mut self, discount: BigDecimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: BigDecimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn tax(&self) -> &BigDecimal {
        &self.tax
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }
}

/// Invoice, bill, estimate or order: a line-itemised document with computed
/// totals and, for settlement kinds, a decrementing outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementDocument {
    pub kind: DocumentKind,
    /// Unique document number (e.g. "INV-0001")
    pub number: String,
    /// Customer or vendor reference
    pub counterparty: String,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub(crate) status: DocumentStatus,
    pub(crate) items: Vec<LineItem>,
    pub(crate) subtotal: BigDecimal,
    pub(crate) discount: BigDecimal,
    pub(crate) tax: BigDecimal,
    pub(crate) total: BigDecimal,
    pub(crate) balance: BigDecimal,
    pub(crate) version: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SettlementDocument {
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn subtotal(&self) -> &BigDecimal {
        &self.subtotal
    }

    pub fn discount(&self) -> &BigDecimal {
        &self.discount
    }

    pub fn tax(&self) -> &BigDecimal {
        &self.tax
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    /// Amount still outstanding
    pub fn balance(&self) -> &BigDecimal {
        &self.balance
    }

    /// Total of all payments currently applied
    pub fn amount_applied(&self) -> BigDecimal {
        &self.total - &self.balance
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_overdue_on(&self, as_of: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < as_of)
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    BankTransfer,
    CreditCard,
    Upi,
    Cheque,
}

/// Direction of cash for a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    /// Customer paying an invoice
    Received,
    /// Business paying a vendor bill
    Made,
}

/// Cash applied against a settlement document, or held unapplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Document this payment settles, if any
    pub document_number: Option<String>,
    pub counterparty: Option<String>,
    pub payment_date: NaiveDate,
    pub mode: PaymentMode,
    pub reference_no: Option<String>,
    pub amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Payment {
    /// Create a new unapplied payment
    pub fn new(payment_date: NaiveDate, mode: PaymentMode, amount: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_number: None,
            counterparty: None,
            payment_date,
            mode,
            reference_no: None,
            amount,
            notes: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Link the payment to a document
    pub fn for_document(mut self, document_number: String) -> Self {
        self.document_number = Some(document_number);
        self
    }

    pub fn with_counterparty(mut self, counterparty: String) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    pub fn with_reference(mut self, reference_no: String) -> Self {
        self.reference_no = Some(reference_no);
        self
    }
}

/// Snapshot of all account balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub currency: String,
    pub generated_at: NaiveDateTime,
    /// One row per account, ordered by account code
    pub balances: Vec<AccountBalance>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

/// Account balance row for the trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: LedgerAccount,
    pub debit_balance: Option<BigDecimal>,
    pub credit_balance: Option<BigDecimal>,
}

impl AccountBalance {
    /// Place a signed balance in the debit or credit column
    pub fn from_account(account: LedgerAccount) -> Self {
        let balance = account.current_balance.clone();
        let zero = BigDecimal::from(0);
        let debit_column = match account.account_type.normal_balance() {
            EntryType::Debit => balance >= zero,
            EntryType::Credit => balance < zero,
        };

        if debit_column {
            Self {
                account,
                debit_balance: Some(balance.abs()),
                credit_balance: None,
            }
        } else {
            Self {
                account,
                debit_balance: None,
                credit_balance: Some(balance.abs()),
            }
        }
    }

    /// Get the balance amount regardless of debit/credit
    pub fn balance_amount(&self) -> BigDecimal {
        self.debit_balance
            .clone()
            .or_else(|| self.credit_balance.clone())
            .unwrap_or_else(|| BigDecimal::from(0))
    }
}

/// Broad classification of ledger errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Journal entry not found: {0}")]
    JournalEntryNotFound(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) | LedgerError::Config(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_)
            | LedgerError::JournalEntryNotFound(_)
            | LedgerError::DocumentNotFound(_)
            | LedgerError::PaymentNotFound(_) => ErrorKind::NotFound,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
