//! Settlement documents and payment application

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::settlement::totals::DocumentTotals;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

impl SettlementDocument {
    fn apply_totals(&mut self, items: Vec<LineItem>, totals: DocumentTotals) {
        self.items = items;
        self.subtotal = totals.subtotal;
        self.discount = totals.discount;
        self.tax = totals.tax;
        self.balance = totals.total.clone();
        self.total = totals.total;
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Reduce the outstanding balance by `amount` and derive the new status
    pub(crate) fn apply_payment(&mut self, amount: &BigDecimal) -> LedgerResult<()> {
        let zero = BigDecimal::from(0);

        if !self.kind.accepts_payments() {
            return Err(LedgerError::validation(format!(
                "{:?} '{}' does not accept payments",
                self.kind, self.number
            )));
        }

        validate_positive_amount(amount)?;

        if matches!(self.status, DocumentStatus::Void | DocumentStatus::Paid) {
            return Err(LedgerError::validation(format!(
                "Document '{}' is {:?} and cannot take payments",
                self.number, self.status
            )));
        }

        if *amount > self.balance {
            return Err(LedgerError::validation(format!(
                "Payment of {} exceeds outstanding balance {} on '{}'",
                amount, self.balance, self.number
            )));
        }

        self.balance -= amount;
        if self.balance <= zero {
            self.balance = zero;
            self.status = DocumentStatus::Paid;
        } else {
            self.status = DocumentStatus::Partial;
        }
        self.touch();
        Ok(())
    }

    /// Give back `amount` of a reversed payment
    pub(crate) fn restore_payment(&mut self, amount: &BigDecimal, today: NaiveDate) -> LedgerResult<()> {
        if self.status == DocumentStatus::Void {
            return Err(LedgerError::validation(format!(
                "Document '{}' is void",
                self.number
            )));
        }

        let restored = &self.balance + amount;
        if restored > self.total {
            return Err(LedgerError::conflict(format!(
                "Reversal of {} would push '{}' above its total {}",
                amount, self.number, self.total
            )));
        }

        self.status = if self.is_overdue_on(today) {
            DocumentStatus::Overdue
        } else if restored == self.total {
            DocumentStatus::Sent
        } else {
            DocumentStatus::Partial
        };
        self.balance = restored;
        self.touch();
        Ok(())
    }
}

/// Builder for new documents
#[derive(Debug)]
pub struct DocumentBuilder {
    kind: DocumentKind,
    number: String,
    counterparty: String,
    date: NaiveDate,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    status: DocumentStatus,
    items: Vec<LineItem>,
}

impl DocumentBuilder {
    pub fn new(kind: DocumentKind, number: String, counterparty: String, date: NaiveDate) -> Self {
        Self {
            kind,
            number,
            counterparty,
            date,
            due_date: None,
            notes: None,
            status: DocumentStatus::Draft,
            items: Vec::new(),
        }
    }

    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Issue the document as `sent` rather than `draft`
    pub fn sent(mut self) -> Self {
        self.status = DocumentStatus::Sent;
        self
    }

    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    /// Compute totals and produce the unsaved document
    pub fn build(self, scale: i64) -> LedgerResult<SettlementDocument> {
        if self.number.trim().is_empty() {
            return Err(LedgerError::validation("Document number cannot be empty"));
        }

        if self.counterparty.trim().is_empty() {
            return Err(LedgerError::validation("Document counterparty cannot be empty"));
        }

        if let Some(due) = self.due_date {
            if due < self.date {
                return Err(LedgerError::validation(format!(
                    "Due date {} precedes document date {}",
                    due, self.date
                )));
            }
        }

        let mut items = self.items;
        let totals = DocumentTotals::compute(&mut items, scale)?;
        let now = chrono::Utc::now().naive_utc();

        let mut document = SettlementDocument {
            kind: self.kind,
            number: self.number,
            counterparty: self.counterparty,
            date: self.date,
            due_date: self.due_date,
            notes: self.notes,
            status: self.status,
            items: Vec::new(),
            subtotal: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            tax: BigDecimal::from(0),
            total: BigDecimal::from(0),
            balance: BigDecimal::from(0),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        document.apply_totals(items, totals);
        Ok(document)
    }
}

/// Result of recording a payment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// The settled document after the payment, if the payment was linked
    pub document: Option<SettlementDocument>,
}

/// Settlement manager for documents and the payments applied to them
pub struct SettlementManager<S: LedgerStorage> {
    storage: S,
    scale: i64,
}

impl<S: LedgerStorage> SettlementManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            scale: DEFAULT_SCALE,
        }
    }

    pub(crate) fn set_scale(&mut self, scale: i64) {
        self.scale = scale;
    }

    /// Compute totals for a new document and store it with `balance = total`
    pub async fn create_document(
        &mut self,
        builder: DocumentBuilder,
    ) -> LedgerResult<SettlementDocument> {
        let document = builder.build(self.scale)?;

        if self.storage.get_document(&document.number).await?.is_some() {
            return Err(LedgerError::validation(format!(
                "Document '{}' already exists",
                document.number
            )));
        }

        self.storage.save_document(&document).await?;
        info!(
            number = %document.number,
            kind = ?document.kind,
            total = %document.total(),
            "document created"
        );

        Ok(document)
    }

    /// Get a document by number
    pub async fn get_document(&self, number: &str) -> LedgerResult<Option<SettlementDocument>> {
        self.storage.get_document(number).await
    }

    /// Get a document by number, returning an error if not found
    pub async fn get_document_required(&self, number: &str) -> LedgerResult<SettlementDocument> {
        self.storage
            .get_document(number)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(number.to_string()))
    }

    /// List documents, optionally of one kind
    pub async fn list_documents(
        &self,
        kind: Option<DocumentKind>,
    ) -> LedgerResult<Vec<SettlementDocument>> {
        self.storage.list_documents(kind).await
    }

    /// Replace the line items of a document with no payments applied
    pub async fn replace_items(
        &mut self,
        number: &str,
        items: Vec<LineItem>,
    ) -> LedgerResult<SettlementDocument> {
        let mut document = self.get_document_required(number).await?;

        if !matches!(
            document.status,
            DocumentStatus::Draft | DocumentStatus::Sent
        ) {
            return Err(LedgerError::validation(format!(
                "Items of '{}' cannot change while it is {:?}",
                number, document.status
            )));
        }

        if document.amount_applied() != BigDecimal::from(0) {
            return Err(LedgerError::validation(format!(
                "Document '{}' has payments applied",
                number
            )));
        }

        let mut items = items;
        let totals = DocumentTotals::compute(&mut items, self.scale)?;
        document.apply_totals(items, totals);
        document.touch();

        self.storage.update_document(&document).await?;
        debug!(number = %number, total = %document.total(), "document items replaced");
        Ok(document)
    }

    /// Move a document to `draft`, `sent`, `overdue` or `void`.
    ///
    /// `paid` and `partial` only ever result from payments.
    pub async fn set_status(
        &mut self,
        number: &str,
        status: DocumentStatus,
    ) -> LedgerResult<SettlementDocument> {
        let mut document = self.get_document_required(number).await?;

        if matches!(status, DocumentStatus::Paid | DocumentStatus::Partial) {
            return Err(LedgerError::validation(format!(
                "Status {:?} is derived from payments and cannot be set directly",
                status
            )));
        }

        if matches!(
            document.status,
            DocumentStatus::Paid | DocumentStatus::Void
        ) {
            return Err(LedgerError::validation(format!(
                "Document '{}' is {:?}; its status is final",
                number, document.status
            )));
        }

        if status == DocumentStatus::Void && document.amount_applied() != BigDecimal::from(0) {
            return Err(LedgerError::validation(format!(
                "Document '{}' has payments applied; reverse them before voiding",
                number
            )));
        }

        if status == document.status {
            return Ok(document);
        }

        document.status = status;
        document.touch();
        self.storage.update_document(&document).await?;
        info!(number = %number, status = ?status, "document status changed");
        Ok(document)
    }

    /// Mark unpaid settlement documents past their due date as overdue.
    ///
    /// Returns the numbers of the documents that changed.
    pub async fn refresh_overdue(&mut self, as_of: NaiveDate) -> LedgerResult<Vec<String>> {
        let zero = BigDecimal::from(0);
        let mut changed = Vec::new();

        for mut document in self.storage.list_documents(None).await? {
            let eligible = document.kind.accepts_payments()
                && matches!(
                    document.status,
                    DocumentStatus::Sent | DocumentStatus::Partial
                )
                && document.balance > zero
                && document.is_overdue_on(as_of);

            if eligible {
                document.status = DocumentStatus::Overdue;
                document.touch();
                self.storage.update_document(&document).await?;
                changed.push(document.number);
            }
        }

        if !changed.is_empty() {
            info!(count = changed.len(), as_of = %as_of, "documents marked overdue");
        }
        Ok(changed)
    }

    /// Record a payment, applying it to its linked document if any
    pub async fn record_payment(&mut self, payment: Payment) -> LedgerResult<PaymentReceipt> {
        validate_positive_amount(&payment.amount)?;

        if !fits_scale(&payment.amount, self.scale) {
            return Err(LedgerError::validation(format!(
                "Payment amount exceeds {} decimal places",
                self.scale
            )));
        }

        if self.storage.get_payment(payment.id).await?.is_some() {
            return Err(LedgerError::validation(format!(
                "Payment '{}' already recorded",
                payment.id
            )));
        }

        let document = match payment.document_number.as_deref() {
            Some(number) => {
                let mut document = self.get_document_required(number).await?;
                if let Err(err) = document.apply_payment(&payment.amount) {
                    warn!(number = %number, amount = %payment.amount, error = %err, "payment rejected");
                    return Err(err);
                }
                Some(document)
            }
            None => None,
        };

        self.storage
            .commit_payment(&payment, document.as_ref())
            .await?;

        match document {
            Some(ref document) => info!(
                payment_id = %payment.id,
                number = %document.number,
                amount = %payment.amount,
                balance = %document.balance(),
                status = ?document.status(),
                "payment applied"
            ),
            None => info!(
                payment_id = %payment.id,
                amount = %payment.amount,
                "unapplied payment recorded"
            ),
        }

        Ok(PaymentReceipt { payment, document })
    }

    /// Get a payment by id
    pub async fn get_payment(&self, payment_id: Uuid) -> LedgerResult<Option<Payment>> {
        self.storage.get_payment(payment_id).await
    }

    /// List payments, optionally only those against one document
    pub async fn list_payments(&self, document_number: Option<&str>) -> LedgerResult<Vec<Payment>> {
        self.storage.list_payments(document_number).await
    }

    /// Delete a payment and restore the balance of the document it settled
    pub async fn reverse_payment(
        &mut self,
        payment_id: Uuid,
    ) -> LedgerResult<Option<SettlementDocument>> {
        let payment = self
            .storage
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;

        let document = match payment.document_number.as_deref() {
            Some(number) => {
                let mut document = self.get_document_required(number).await?;
                let today = chrono::Utc::now().date_naive();
                document.restore_payment(&payment.amount, today)?;
                Some(document)
            }
            None => None,
        };

        self.storage
            .commit_payment_reversal(payment_id, document.as_ref())
            .await?;
        info!(payment_id = %payment_id, amount = %payment.amount, "payment reversed");

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn amount(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(number: &str) -> DocumentBuilder {
        DocumentBuilder::new(
            DocumentKind::Invoice,
            number.to_string(),
            "CUST-1".to_string(),
            date(2024, 4, 1),
        )
        .due_date(date(2999, 12, 31))
        .sent()
        .item(
            LineItem::new("SKU-1".to_string(), amount("1"), amount("1000"))
                .with_tax_rate(amount("18")),
        )
    }

    fn pay(number: &str, value: &str) -> Payment {
        Payment::new(date(2024, 4, 10), PaymentMode::BankTransfer, amount(value))
            .for_document(number.to_string())
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        let doc = manager.create_document(invoice("INV-1")).await.unwrap();
        assert_eq!(doc.subtotal(), &amount("1000"));
        assert_eq!(doc.tax(), &amount("180"));
        assert_eq!(doc.total(), &amount("1180.00"));
        assert_eq!(doc.balance(), doc.total());

        let first = manager.record_payment(pay("INV-1", "500")).await.unwrap();
        let after_first = first.document.unwrap();
        assert_eq!(after_first.balance(), &amount("680.00"));
        assert_eq!(after_first.status(), DocumentStatus::Partial);

        let second = manager.record_payment(pay("INV-1", "680")).await.unwrap();
        let after_second = second.document.unwrap();
        assert_eq!(after_second.balance(), &amount("0.00"));
        assert_eq!(after_second.status(), DocumentStatus::Paid);

        let stored = manager.get_document_required("INV-1").await.unwrap();
        assert_eq!(stored, after_second);
        assert_eq!(manager.list_payments(Some("INV-1")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-2")).await.unwrap();

        let result = manager.record_payment(pay("INV-2", "1180.01")).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let stored = manager.get_document_required("INV-2").await.unwrap();
        assert_eq!(stored.balance(), &amount("1180"));
        assert!(manager.list_payments(Some("INV-2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payments_rejected() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-3")).await.unwrap();

        assert!(manager.record_payment(pay("INV-3", "0")).await.is_err());
        assert!(manager.record_payment(pay("INV-3", "-5")).await.is_err());
        assert!(manager.record_payment(pay("INV-3", "1.005")).await.is_err());
        assert!(matches!(
            manager.record_payment(pay("INV-404", "5")).await,
            Err(LedgerError::DocumentNotFound(_))
        ));

        manager.record_payment(pay("INV-3", "1180")).await.unwrap();
        let paid_again = manager.record_payment(pay("INV-3", "1")).await;
        assert!(matches!(paid_again, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_void_document_rejects_payment() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-4")).await.unwrap();
        manager
            .set_status("INV-4", DocumentStatus::Void)
            .await
            .unwrap();

        assert!(manager.record_payment(pay("INV-4", "10")).await.is_err());
        assert!(manager
            .set_status("INV-4", DocumentStatus::Sent)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_estimate_does_not_take_payments() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        let estimate = DocumentBuilder::new(
            DocumentKind::Estimate,
            "EST-1".to_string(),
            "CUST-1".to_string(),
            date(2024, 4, 1),
        )
        .item(LineItem::new("SKU-1".to_string(), amount("2"), amount("50")));
        manager.create_document(estimate).await.unwrap();

        assert!(manager.record_payment(pay("EST-1", "10")).await.is_err());
    }

    #[tokio::test]
    async fn test_reverse_payment_restores_balance() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-5")).await.unwrap();

        let first = manager.record_payment(pay("INV-5", "500")).await.unwrap();
        let second = manager.record_payment(pay("INV-5", "680")).await.unwrap();

        let restored = manager
            .reverse_payment(second.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.balance(), &amount("680"));
        assert_eq!(restored.status(), DocumentStatus::Partial);

        let restored = manager
            .reverse_payment(first.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.balance(), &amount("1180"));
        assert_eq!(restored.status(), DocumentStatus::Sent);

        assert!(matches!(
            manager.reverse_payment(first.payment.id).await,
            Err(LedgerError::PaymentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unapplied_payment() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        let advance = Payment::new(date(2024, 4, 1), PaymentMode::Cash, amount("100"))
            .with_counterparty("CUST-9".to_string());

        let receipt = manager.record_payment(advance).await.unwrap();
        assert!(receipt.document.is_none());
        assert!(manager.reverse_payment(receipt.payment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_document_conflicts() {
        let storage = MemoryStorage::new();
        let mut manager = SettlementManager::new(storage.clone());
        manager.create_document(invoice("INV-6")).await.unwrap();

        // Two callers read the same version
        let mut first = manager.get_document_required("INV-6").await.unwrap();
        let mut second = first.clone();

        first.apply_payment(&amount("100")).unwrap();
        second.apply_payment(&amount("200")).unwrap();

        let mut writer = storage.clone();
        writer
            .commit_payment(&pay("INV-6", "100"), Some(&first))
            .await
            .unwrap();
        let lost = writer.commit_payment(&pay("INV-6", "200"), Some(&second)).await;
        assert!(matches!(lost, Err(LedgerError::Conflict(_))));

        let stored = manager.get_document_required("INV-6").await.unwrap();
        assert_eq!(stored.balance(), &amount("1080"));
        assert_eq!(manager.list_payments(Some("INV-6")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_items_recomputes_totals() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-7")).await.unwrap();

        let updated = manager
            .replace_items(
                "INV-7",
                vec![LineItem::new("SKU-2".to_string(), amount("4"), amount("25"))],
            )
            .await
            .unwrap();
        assert_eq!(updated.total(), &amount("100"));
        assert_eq!(updated.balance(), &amount("100"));

        manager.record_payment(pay("INV-7", "10")).await.unwrap();
        let locked = manager
            .replace_items(
                "INV-7",
                vec![LineItem::new("SKU-2".to_string(), amount("1"), amount("25"))],
            )
            .await;
        assert!(locked.is_err());
    }

    #[tokio::test]
    async fn test_derived_status_cannot_be_set() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        manager.create_document(invoice("INV-8")).await.unwrap();

        let result = manager.set_status("INV-8", DocumentStatus::Paid).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        manager.record_payment(pay("INV-8", "1")).await.unwrap();
        let void = manager.set_status("INV-8", DocumentStatus::Void).await;
        assert!(void.is_err());
    }

    #[tokio::test]
    async fn test_refresh_overdue() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        let past_due = DocumentBuilder::new(
            DocumentKind::Bill,
            "BILL-1".to_string(),
            "VEND-1".to_string(),
            date(2024, 1, 1),
        )
        .due_date(date(2024, 1, 31))
        .sent()
        .item(LineItem::new("SKU-1".to_string(), amount("1"), amount("300")));
        manager.create_document(past_due).await.unwrap();
        manager.create_document(invoice("INV-9")).await.unwrap();

        let changed = manager.refresh_overdue(date(2024, 2, 15)).await.unwrap();
        assert_eq!(changed, vec!["BILL-1".to_string()]);

        let bill = manager.get_document_required("BILL-1").await.unwrap();
        assert_eq!(bill.status(), DocumentStatus::Overdue);

        // Overdue documents still accept payments
        let receipt = manager.record_payment(pay("BILL-1", "300")).await.unwrap();
        assert_eq!(receipt.document.unwrap().status(), DocumentStatus::Paid);
    }

    #[tokio::test]
    async fn test_reversal_on_past_due_document_is_overdue() {
        let mut manager = SettlementManager::new(MemoryStorage::new());
        let past_due = DocumentBuilder::new(
            DocumentKind::Invoice,
            "INV-10".to_string(),
            "CUST-1".to_string(),
            date(2024, 1, 1),
        )
        .due_date(date(2024, 1, 31))
        .sent()
        .item(LineItem::new("SKU-1".to_string(), amount("1"), amount("1000")).with_tax_rate(amount("18")));
        manager.create_document(past_due).await.unwrap();

        let first = manager.record_payment(pay("INV-10", "500")).await.unwrap();
        let second = manager.record_payment(pay("INV-10", "680")).await.unwrap();
        assert_eq!(second.document.unwrap().status(), DocumentStatus::Paid);

        // Partial reversal
        let restored = manager
            .reverse_payment(second.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.balance(), &amount("680"));
        assert_eq!(restored.status(), DocumentStatus::Overdue);

        // Full reversal
        let restored = manager
            .reverse_payment(first.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.balance(), restored.total());
        assert_eq!(restored.status(), DocumentStatus::Overdue);

        let stored = manager.get_document_required("INV-10").await.unwrap();
        assert_eq!(stored, restored);
        assert!(manager.list_payments(Some("INV-10")).await.unwrap().is_empty());
    }

    #[test]
    fn test_apply_payment_requires_positive_amount() {
        let mut document = invoice("INV-11").build(DEFAULT_SCALE).unwrap();
        assert!(matches!(
            document.apply_payment(&amount("0")),
            Err(LedgerError::Validation(_))
        ));
        assert!(document.apply_payment(&amount("-1")).is_err());
        assert_eq!(document.balance(), document.total());
        assert_eq!(document.version(), 0);
    }

    #[test]
    fn test_builder_rejects_due_before_date() {
        let result = DocumentBuilder::new(
            DocumentKind::Invoice,
            "INV-X".to_string(),
            "CUST-1".to_string(),
            date(2024, 4, 1),
        )
        .due_date(date(2024, 3, 1))
        .item(LineItem::new("SKU-1".to_string(), amount("1"), amount("1")))
        .build(DEFAULT_SCALE);
        assert!(result.is_err());
    }
}
