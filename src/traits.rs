//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the ledger system
///
/// This trait allows the bookkeeping core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
///
/// Records handed to the `update_*` and `commit_*` methods carry their *next*
/// version. An implementation must accept such a record only if the stored
/// copy is at exactly `version - 1`, and must otherwise fail with
/// [`LedgerError::Conflict`] without writing anything. Each `commit_*` call is
/// one atomic unit: either every record it names is written, or none is.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert a new account. Fails with `Conflict` if the code is taken.
    async fn save_account(&mut self, account: &LedgerAccount) -> LedgerResult<()>;

    /// Get an account by code
    async fn get_account(&self, code: &str) -> LedgerResult<Option<LedgerAccount>>;

    /// List all accounts ordered by code, optionally filtered by type
    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<LedgerAccount>>;

    /// Replace a stored account (version checked)
    async fn update_account(&mut self, account: &LedgerAccount) -> LedgerResult<()>;

    /// Delete an account. Fails with `Conflict` if posted lines reference it or
    /// another account names it as parent; both checks run inside the same write.
    async fn delete_account(&mut self, code: &str) -> LedgerResult<()>;

    /// Whether any posted journal line references the account
    async fn account_has_postings(&self, code: &str) -> LedgerResult<bool>;

    /// Insert a new draft journal entry. Fails with `Conflict` if the number is taken.
    async fn save_journal_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Get a journal entry by number
    async fn get_journal_entry(&self, entry_number: &str) -> LedgerResult<Option<JournalEntry>>;

    /// List journal entries within a date range, ordered by date then number
    async fn list_journal_entries(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>>;

    /// Replace a draft journal entry (version checked). Fails with `Conflict` if the stored copy is posted.
    async fn update_journal_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Delete a draft journal entry. Fails with `Conflict` if the stored copy is posted.
    async fn delete_journal_entry(&mut self, entry_number: &str) -> LedgerResult<()>;

    /// Atomically store a freshly posted entry together with every account it moved.
    ///
    /// Fails with `Conflict` if the stored entry is already posted, or if the
    /// entry or any account version is stale.
    async fn commit_posting(
        &mut self,
        entry: &JournalEntry,
        accounts: &[LedgerAccount],
    ) -> LedgerResult<()>;

    /// Insert a new document. Fails with `Conflict` if the number is taken.
    async fn save_document(&mut self, document: &SettlementDocument) -> LedgerResult<()>;

    /// Get a document by number
    async fn get_document(&self, number: &str) -> LedgerResult<Option<SettlementDocument>>;

    /// List documents ordered by number, optionally filtered by kind
    async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
    ) -> LedgerResult<Vec<SettlementDocument>>;

    /// Replace a stored document (version checked)
    async fn update_document(&mut self, document: &SettlementDocument) -> LedgerResult<()>;

    /// Get a payment by id
    async fn get_payment(&self, payment_id: Uuid) -> LedgerResult<Option<Payment>>;

    /// List payments ordered by date, optionally only those linked to a document
    async fn list_payments(&self, document_number: Option<&str>) -> LedgerResult<Vec<Payment>>;

    /// Atomically insert a payment and, if linked, the document it settled (version checked)
    async fn commit_payment(
        &mut self,
        payment: &Payment,
        document: Option<&SettlementDocument>,
    ) -> LedgerResult<()>;

    /// Atomically remove a payment and, if linked, store the restored document (version checked)
    async fn commit_payment_reversal(
        &mut self,
        payment_id: Uuid,
        document: Option<&SettlementDocument>,
    ) -> LedgerResult<()>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &LedgerAccount) -> LedgerResult<()>;
}

/// Trait for implementing custom journal entry validation rules
pub trait JournalValidator: Send + Sync {
    /// Validate an entry before it is posted
    fn validate_entry(&self, entry: &JournalEntry, scale: i64) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &LedgerAccount) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::validation("Account code cannot be empty"));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::validation("Account name cannot be empty"));
        }

        if account.parent_code.as_deref() == Some(account.code.as_str()) {
            return Err(LedgerError::validation(format!(
                "Account '{}' cannot be its own parent",
                account.code
            )));
        }

        Ok(())
    }
}

/// Default journal validator enforcing the double-entry rules
pub struct DefaultJournalValidator;

impl JournalValidator for DefaultJournalValidator {
    fn validate_entry(&self, entry: &JournalEntry, scale: i64) -> LedgerResult<()> {
        entry.validate(scale)
    }
}
