//! Journal entry processing and posting

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::btree_map::{BTreeMap, Entry};
use tracing::{debug, info, warn};

use crate::traits::*;
use crate::types::*;

/// Journal manager for drafting, editing and posting journal entries
pub struct JournalManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn JournalValidator>,
    scale: i64,
}

impl<S: LedgerStorage> JournalManager<S> {
    /// Create a new journal manager
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(DefaultJournalValidator))
    }

    /// Create a new journal manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn JournalValidator>) -> Self {
        Self {
            storage,
            validator,
            scale: DEFAULT_SCALE,
        }
    }

    pub(crate) fn set_scale(&mut self, scale: i64) {
        self.scale = scale;
    }

    /// Store a new draft entry.
    ///
    /// Drafts may be unbalanced, but every line must be well formed and
    /// reference an existing account.
    pub async fn create_entry(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        if entry.entry_number.trim().is_empty() {
            return Err(LedgerError::validation("Entry number cannot be empty"));
        }

        if entry.is_posted() {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' must be created as a draft",
                entry.entry_number
            )));
        }

        if self
            .storage
            .get_journal_entry(&entry.entry_number)
            .await?
            .is_some()
        {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' already exists",
                entry.entry_number
            )));
        }

        let mut entry = entry;
        self.check_lines(entry.lines()).await?;
        entry.recompute_totals();

        self.storage.save_journal_entry(&entry).await?;
        debug!(
            entry_number = %entry.entry_number,
            lines = entry.lines().len(),
            "journal entry drafted"
        );

        Ok(entry)
    }

    /// Get an entry by number
    pub async fn get_entry(&self, entry_number: &str) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_journal_entry(entry_number).await
    }

    /// Get an entry by number, returning an error if not found
    pub async fn get_entry_required(&self, entry_number: &str) -> LedgerResult<JournalEntry> {
        self.storage
            .get_journal_entry(entry_number)
            .await?
            .ok_or_else(|| LedgerError::JournalEntryNotFound(entry_number.to_string()))
    }

    /// List entries within a date range
    pub async fn list_entries(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_journal_entries(start_date, end_date).await
    }

    /// Replace the lines of a draft entry
    pub async fn update_lines(
        &mut self,
        entry_number: &str,
        lines: Vec<JournalEntryLine>,
    ) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(entry_number).await?;
        entry.ensure_draft()?;
        self.check_lines(&lines).await?;
        entry.replace_lines(lines)?;
        entry.bump_version();

        self.storage.update_journal_entry(&entry).await?;
        debug!(entry_number = %entry_number, "journal entry lines replaced");
        Ok(entry)
    }

    /// Replace the header fields and lines of a draft entry
    pub async fn update_entry(&mut self, changes: &JournalEntry) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(&changes.entry_number).await?;
        entry.ensure_draft()?;
        self.check_lines(changes.lines()).await?;

        entry.entry_date = changes.entry_date;
        entry.entry_type = changes.entry_type;
        entry.reference = changes.reference.clone();
        entry.description = changes.description.clone();
        entry.replace_lines(changes.lines().to_vec())?;
        entry.bump_version();

        self.storage.update_journal_entry(&entry).await?;
        debug!(entry_number = %entry.entry_number, "journal entry updated");
        Ok(entry)
    }

    /// Delete a draft entry
    pub async fn delete_entry(&mut self, entry_number: &str) -> LedgerResult<()> {
        let entry = self.get_entry_required(entry_number).await?;
        entry.ensure_draft()?;
        self.storage.delete_journal_entry(entry_number).await?;
        info!(entry_number = %entry_number, "journal entry deleted");
        Ok(())
    }

    /// Post a draft entry, moving the balance of every account it touches.
    ///
    /// The posted flag and all account balances are committed as one unit.
    pub async fn post_entry(&mut self, entry_number: &str) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(entry_number).await?;

        if entry.is_posted() {
            return Err(LedgerError::validation(format!(
                "Journal entry '{}' is already posted",
                entry_number
            )));
        }

        if let Err(err) = self.validator.validate_entry(&entry, self.scale) {
            warn!(entry_number = %entry_number, error = %err, "journal entry rejected");
            return Err(err);
        }

        let mut touched: BTreeMap<String, LedgerAccount> = BTreeMap::new();
        for line in entry.lines() {
            let account = match touched.entry(line.account_code.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let account = self
                        .storage
                        .get_account(&line.account_code)
                        .await?
                        .ok_or_else(|| LedgerError::AccountNotFound(line.account_code.clone()))?;
                    if !account.is_active {
                        return Err(LedgerError::validation(format!(
                            "Account '{}' is inactive",
                            account.code
                        )));
                    }
                    slot.insert(account)
                }
            };
            account.apply_line(&line.debit_amount, &line.credit_amount);
        }

        let accounts: Vec<LedgerAccount> = touched
            .into_values()
            .map(|mut account| {
                account.bump_version();
                account
            })
            .collect();

        entry.recompute_totals();
        entry.mark_posted(chrono::Utc::now().naive_utc());
        entry.bump_version();
        self.storage.commit_posting(&entry, &accounts).await?;

        info!(
            entry_number = %entry.entry_number,
            total = %entry.total_debit(),
            accounts = accounts.len(),
            "journal entry posted"
        );

        Ok(entry)
    }

    /// Draft and immediately post an entry
    pub async fn record_and_post(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        let entry_number = entry.entry_number.clone();
        self.create_entry(entry).await?;
        self.post_entry(&entry_number).await
    }

    async fn check_lines(&self, lines: &[JournalEntryLine]) -> LedgerResult<()> {
        for line in lines {
            line.validate(self.scale)?;
            if self.storage.get_account(&line.account_code).await?.is_none() {
                return Err(LedgerError::AccountNotFound(line.account_code.clone()));
            }
        }
        Ok(())
    }
}

/// Builder for journal entries
#[derive(Debug)]
pub struct JournalEntryBuilder {
    entry: JournalEntry,
    lines: Vec<JournalEntryLine>,
}

impl JournalEntryBuilder {
    /// Start a manual entry
    pub fn new(entry_number: String, date: NaiveDate, description: String) -> Self {
        Self {
            entry: JournalEntry::new(entry_number, date, JournalEntryType::Manual, description),
            lines: Vec::new(),
        }
    }

    pub fn entry_type(mut self, entry_type: JournalEntryType) -> Self {
        self.entry.entry_type = entry_type;
        self
    }

    pub fn reference(mut self, reference: String) -> Self {
        self.entry.reference = Some(reference);
        self
    }

    pub fn debit(
        mut self,
        account_code: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.lines
            .push(JournalEntryLine::debit(account_code, amount, description));
        self
    }

    pub fn credit(
        mut self,
        account_code: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.lines
            .push(JournalEntryLine::credit(account_code, amount, description));
        self
    }

    pub fn line(mut self, line: JournalEntryLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Build a draft entry; lines must be well formed but may not balance yet
    pub fn build(self) -> LedgerResult<JournalEntry> {
        let mut entry = self.entry;
        entry.replace_lines(self.lines)?;
        Ok(entry)
    }

    /// Build a draft entry whose debits and credits already balance.
    ///
    /// The monetary scale is checked when the entry is posted.
    pub fn build_balanced(self) -> LedgerResult<JournalEntry> {
        let entry = self.build()?;
        entry.check_balanced()?;
        Ok(entry)
    }
}

/// Account codes used when journalising a sales invoice
pub struct InvoicePostingAccounts {
    pub receivables_account: String,
    pub revenue_account: String,
    pub tax_payable_account: String,
}

/// Account codes used when journalising a purchase bill
pub struct BillPostingAccounts {
    pub expense_account: String,
    pub tax_recoverable_account: String,
    pub payables_account: String,
}

/// Balanced system entries for common document flows
pub mod patterns {
    use super::*;

    fn system_entry(
        entry_number: String,
        date: NaiveDate,
        description: String,
        reference: String,
    ) -> JournalEntryBuilder {
        JournalEntryBuilder::new(entry_number, date, description)
            .entry_type(JournalEntryType::System)
            .reference(reference)
    }

    fn expect_kind(document: &SettlementDocument, kind: DocumentKind) -> LedgerResult<()> {
        if document.kind != kind {
            return Err(LedgerError::validation(format!(
                "Document '{}' is {:?}, expected {:?}",
                document.number, document.kind, kind
            )));
        }
        Ok(())
    }

    /// Debit receivables with the invoice total, credit revenue and tax payable
    pub fn sales_invoice_entry(
        entry_number: String,
        invoice: &SettlementDocument,
        accounts: &InvoicePostingAccounts,
    ) -> LedgerResult<JournalEntry> {
        expect_kind(invoice, DocumentKind::Invoice)?;

        let net = invoice.subtotal() - invoice.discount();
        let mut builder = system_entry(
            entry_number,
            invoice.date,
            format!("Invoice {} to {}", invoice.number, invoice.counterparty),
            invoice.number.clone(),
        )
        .debit(
            accounts.receivables_account.clone(),
            invoice.total().clone(),
            Some("Invoice total".to_string()),
        )
        .credit(
            accounts.revenue_account.clone(),
            net,
            Some("Revenue".to_string()),
        );

        if invoice.tax() > &BigDecimal::from(0) {
            builder = builder.credit(
                accounts.tax_payable_account.clone(),
                invoice.tax().clone(),
                Some("Tax payable".to_string()),
            );
        }

        builder.build_balanced()
    }

    /// Debit expense and recoverable tax, credit payables with the bill total
    pub fn purchase_bill_entry(
        entry_number: String,
        bill: &SettlementDocument,
        accounts: &BillPostingAccounts,
    ) -> LedgerResult<JournalEntry> {
        expect_kind(bill, DocumentKind::Bill)?;

        let net = bill.subtotal() - bill.discount();
        let mut builder = system_entry(
            entry_number,
            bill.date,
            format!("Bill {} from {}", bill.number, bill.counterparty),
            bill.number.clone(),
        )
        .debit(
            accounts.expense_account.clone(),
            net,
            Some("Expense".to_string()),
        );

        if bill.tax() > &BigDecimal::from(0) {
            builder = builder.debit(
                accounts.tax_recoverable_account.clone(),
                bill.tax().clone(),
                Some("Tax recoverable".to_string()),
            );
        }

        builder
            .credit(
                accounts.payables_account.clone(),
                bill.total().clone(),
                Some("Bill total".to_string()),
            )
            .build_balanced()
    }

    fn cash_entry(
        entry_number: String,
        payment: &Payment,
        direction: PaymentDirection,
        reference: String,
        cash_account: String,
        control_account: String,
    ) -> LedgerResult<JournalEntry> {
        let builder = system_entry(
            entry_number,
            payment.payment_date,
            format!("Payment {:?} via {:?}", direction, payment.mode),
            reference,
        );

        let builder = match direction {
            PaymentDirection::Received => builder
                .debit(cash_account, payment.amount.clone(), None)
                .credit(control_account, payment.amount.clone(), None),
            PaymentDirection::Made => builder
                .debit(control_account, payment.amount.clone(), None)
                .credit(cash_account, payment.amount.clone(), None),
        };

        builder.build_balanced()
    }

    /// Cash side of a payment applied to `document`.
    ///
    /// The direction follows the document kind. An invoice payment debits cash
    /// and credits the receivables control account; a bill payment debits the
    /// payables control account and credits cash.
    pub fn payment_entry(
        entry_number: String,
        payment: &Payment,
        document: &SettlementDocument,
        cash_account: String,
        control_account: String,
    ) -> LedgerResult<JournalEntry> {
        let direction = document.kind.payment_direction().ok_or_else(|| {
            LedgerError::validation(format!(
                "{:?} '{}' does not accept payments",
                document.kind, document.number
            ))
        })?;

        if payment.document_number.as_deref() != Some(document.number.as_str()) {
            return Err(LedgerError::validation(format!(
                "Payment '{}' is not linked to document '{}'",
                payment.id, document.number
            )));
        }

        cash_entry(
            entry_number,
            payment,
            direction,
            document.number.clone(),
            cash_account,
            control_account,
        )
    }

    /// Cash side of a payment with no linked document (advance or on-account)
    pub fn unapplied_payment_entry(
        entry_number: String,
        payment: &Payment,
        direction: PaymentDirection,
        cash_account: String,
        control_account: String,
    ) -> LedgerResult<JournalEntry> {
        if let Some(number) = &payment.document_number {
            return Err(LedgerError::validation(format!(
                "Payment '{}' is linked to '{}'; journalise it against the document",
                payment.id, number
            )));
        }

        cash_entry(
            entry_number,
            payment,
            direction,
            payment.id.to_string(),
            cash_account,
            control_account,
        )
    }
}
