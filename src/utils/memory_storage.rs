//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<String, LedgerAccount>,
    entries: HashMap<String, JournalEntry>,
    documents: HashMap<String, SettlementDocument>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn check_account_version(&self, account: &LedgerAccount) -> LedgerResult<()> {
        let stored = self
            .accounts
            .get(&account.code)
            .ok_or_else(|| LedgerError::AccountNotFound(account.code.clone()))?;
        check_version("Account", &account.code, stored.version, account.version)
    }

    /// The stored draft an incoming entry replaces, version checked
    fn check_draft_version(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let stored = self
            .entries
            .get(&entry.entry_number)
            .ok_or_else(|| LedgerError::JournalEntryNotFound(entry.entry_number.clone()))?;
        if stored.is_posted {
            return Err(LedgerError::conflict(format!(
                "Journal entry '{}' is already posted",
                entry.entry_number
            )));
        }
        check_version("Journal entry", &entry.entry_number, stored.version, entry.version)
    }

    fn has_postings(&self, code: &str) -> bool {
        self.entries
            .values()
            .filter(|entry| entry.is_posted)
            .any(|entry| entry.lines.iter().any(|line| line.account_code == code))
    }

    fn check_document_version(&self, document: &SettlementDocument) -> LedgerResult<()> {
        let stored = self
            .documents
            .get(&document.number)
            .ok_or_else(|| LedgerError::DocumentNotFound(document.number.clone()))?;
        check_version("Document", &document.number, stored.version, document.version)
    }
}

fn check_version(what: &str, key: &str, stored: u64, incoming: u64) -> LedgerResult<()> {
    if incoming != stored + 1 {
        return Err(LedgerError::conflict(format!(
            "{} '{}' was modified concurrently (stored version {}, update carries {})",
            what, key, stored, incoming
        )));
    }
    Ok(())
}

fn within(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same tables. Every trait method takes the lock once, so
/// each `commit_*` call is applied atomically with respect to other callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| LedgerError::storage("memory storage lock poisoned"))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| LedgerError::storage("memory storage lock poisoned"))
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&mut self, account: &LedgerAccount) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.accounts.contains_key(&account.code) {
            return Err(LedgerError::conflict(format!(
                "Account '{}' already exists",
                account.code
            )));
        }
        tables
            .accounts
            .insert(account.code.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, code: &str) -> LedgerResult<Option<LedgerAccount>> {
        Ok(self.read()?.accounts.get(code).cloned())
    }

    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<LedgerAccount>> {
        let tables = self.read()?;
        let mut accounts: Vec<LedgerAccount> = tables
            .accounts
            .values()
            .filter(|account| {
                account_type
                    .as_ref()
                    .is_none_or(|t| &account.account_type == t)
            })
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn update_account(&mut self, account: &LedgerAccount) -> LedgerResult<()> {
        let mut tables = self.write()?;
        tables.check_account_version(account)?;
        tables
            .accounts
            .insert(account.code.clone(), account.clone());
        Ok(())
    }

    async fn delete_account(&mut self, code: &str) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(code) {
            return Err(LedgerError::AccountNotFound(code.to_string()));
        }
        if tables.has_postings(code) {
            return Err(LedgerError::conflict(format!(
                "Account '{}' has posted entries",
                code
            )));
        }
        if tables
            .accounts
            .values()
            .any(|account| account.parent_code.as_deref() == Some(code))
        {
            return Err(LedgerError::conflict(format!(
                "Account '{}' has child accounts",
                code
            )));
        }
        tables.accounts.remove(code);
        Ok(())
    }

    async fn account_has_postings(&self, code: &str) -> LedgerResult<bool> {
        Ok(self.read()?.has_postings(code))
    }

    async fn save_journal_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.entries.contains_key(&entry.entry_number) {
            return Err(LedgerError::conflict(format!(
                "Journal entry '{}' already exists",
                entry.entry_number
            )));
        }
        tables
            .entries
            .insert(entry.entry_number.clone(), entry.clone());
        Ok(())
    }

    async fn get_journal_entry(&self, entry_number: &str) -> LedgerResult<Option<JournalEntry>> {
        Ok(self.read()?.entries.get(entry_number).cloned())
    }

    async fn list_journal_entries(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let tables = self.read()?;
        let mut entries: Vec<JournalEntry> = tables
            .entries
            .values()
            .filter(|entry| within(entry.entry_date, start_date, end_date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.entry_date
                .cmp(&b.entry_date)
                .then_with(|| a.entry_number.cmp(&b.entry_number))
        });
        Ok(entries)
    }

    async fn update_journal_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut tables = self.write()?;
        tables.check_draft_version(entry)?;
        tables
            .entries
            .insert(entry.entry_number.clone(), entry.clone());
        Ok(())
    }

    async fn delete_journal_entry(&mut self, entry_number: &str) -> LedgerResult<()> {
        let mut tables = self.write()?;
        match tables.entries.get(entry_number) {
            None => Err(LedgerError::JournalEntryNotFound(entry_number.to_string())),
            Some(stored) if stored.is_posted => Err(LedgerError::conflict(format!(
                "Journal entry '{}' is already posted",
                entry_number
            ))),
            Some(_) => {
                tables.entries.remove(entry_number);
                Ok(())
            }
        }
    }

    async fn commit_posting(
        &mut self,
        entry: &JournalEntry,
        accounts: &[LedgerAccount],
    ) -> LedgerResult<()> {
        let mut tables = self.write()?;

        tables.check_draft_version(entry)?;
        for account in accounts {
            tables.check_account_version(account)?;
        }

        for account in accounts {
            tables
                .accounts
                .insert(account.code.clone(), account.clone());
        }
        tables
            .entries
            .insert(entry.entry_number.clone(), entry.clone());
        Ok(())
    }

    async fn save_document(&mut self, document: &SettlementDocument) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.documents.contains_key(&document.number) {
            return Err(LedgerError::conflict(format!(
                "Document '{}' already exists",
                document.number
            )));
        }
        tables
            .documents
            .insert(document.number.clone(), document.clone());
        Ok(())
    }

    async fn get_document(&self, number: &str) -> LedgerResult<Option<SettlementDocument>> {
        Ok(self.read()?.documents.get(number).cloned())
    }

    async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
    ) -> LedgerResult<Vec<SettlementDocument>> {
        let tables = self.read()?;
        let mut documents: Vec<SettlementDocument> = tables
            .documents
            .values()
            .filter(|document| kind.as_ref().is_none_or(|k| &document.kind == k))
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(documents)
    }

    async fn update_document(&mut self, document: &SettlementDocument) -> LedgerResult<()> {
        let mut tables = self.write()?;
        tables.check_document_version(document)?;
        tables
            .documents
            .insert(document.number.clone(), document.clone());
        Ok(())
    }

    async fn get_payment(&self, payment_id: Uuid) -> LedgerResult<Option<Payment>> {
        Ok(self.read()?.payments.get(&payment_id).cloned())
    }

    async fn list_payments(&self, document_number: Option<&str>) -> LedgerResult<Vec<Payment>> {
        let tables = self.read()?;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|payment| {
                document_number.is_none_or(|n| payment.document_number.as_deref() == Some(n))
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            a.payment_date
                .cmp(&b.payment_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(payments)
    }

    async fn commit_payment(
        &mut self,
        payment: &Payment,
        document: Option<&SettlementDocument>,
    ) -> LedgerResult<()> {
        let mut tables = self.write()?;

        if tables.payments.contains_key(&payment.id) {
            return Err(LedgerError::conflict(format!(
                "Payment '{}' already exists",
                payment.id
            )));
        }
        if let Some(document) = document {
            tables.check_document_version(document)?;
            tables
                .documents
                .insert(document.number.clone(), document.clone());
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn commit_payment_reversal(
        &mut self,
        payment_id: Uuid,
        document: Option<&SettlementDocument>,
    ) -> LedgerResult<()> {
        let mut tables = self.write()?;

        if !tables.payments.contains_key(&payment_id) {
            return Err(LedgerError::PaymentNotFound(payment_id.to_string()));
        }
        if let Some(document) = document {
            tables.check_document_version(document)?;
            tables
                .documents
                .insert(document.number.clone(), document.clone());
        }
        tables.payments.remove(&payment_id);
        Ok(())
    }
}
