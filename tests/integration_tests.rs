//! Integration tests for bookkeeping-core

use bookkeeping_core::{
    patterns,
    utils::{EnhancedAccountValidator, EnhancedJournalValidator, MemoryStorage},
    AccountType, BillPostingAccounts, DocumentBuilder, DocumentKind, DocumentStatus,
    InvoicePostingAccounts, JournalEntryBuilder, Ledger, LedgerConfig, LedgerError, LineItem,
    Payment, PaymentMode,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn amount(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

fn gst_invoice(number: &str) -> DocumentBuilder {
    DocumentBuilder::new(
        DocumentKind::Invoice,
        number.to_string(),
        "CUST-1".to_string(),
        date(2024, 4, 1),
    )
    .item(LineItem::new("SKU-1".to_string(), amount("1"), amount("1000")).with_tax_rate(amount("18")))
    .sent()
}

#[tokio::test]
async fn test_invoice_settlement_workflow() {
    let mut ledger = Ledger::new(MemoryStorage::new());

    let invoice = ledger.create_document(gst_invoice("INV-001")).await.unwrap();
    assert_eq!(invoice.total(), &amount("1180"));
    assert_eq!(invoice.balance(), &amount("1180"));
    assert_eq!(invoice.status(), DocumentStatus::Sent);

    let first = Payment::new(date(2024, 4, 10), PaymentMode::BankTransfer, amount("500"))
        .for_document("INV-001".to_string());
    let receipt = ledger.record_payment(first).await.unwrap();
    let partial = receipt.document.unwrap();
    assert_eq!(partial.balance(), &amount("680"));
    assert_eq!(partial.status(), DocumentStatus::Partial);

    let second = Payment::new(date(2024, 4, 20), PaymentMode::Upi, amount("680"))
        .for_document("INV-001".to_string());
    let paid = ledger.record_payment(second).await.unwrap().document.unwrap();
    assert_eq!(paid.balance(), &amount("0"));
    assert_eq!(paid.status(), DocumentStatus::Paid);
    assert_eq!(paid.amount_applied(), amount("1180"));

    // A settled document accepts no further payments
    let extra = Payment::new(date(2024, 4, 21), PaymentMode::Cash, amount("1"))
        .for_document("INV-001".to_string());
    assert!(matches!(
        ledger.record_payment(extra).await,
        Err(LedgerError::Validation(_))
    ));

    let report = ledger.validate_integrity().await.unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
}

#[tokio::test]
async fn test_overpayment_is_rejected() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    ledger.create_document(gst_invoice("INV-002")).await.unwrap();

    let too_much = Payment::new(date(2024, 4, 10), PaymentMode::BankTransfer, amount("1180.01"))
        .for_document("INV-002".to_string());
    assert!(ledger.record_payment(too_much).await.is_err());

    let unchanged = ledger.get_document("INV-002").await.unwrap().unwrap();
    assert_eq!(unchanged.balance(), &amount("1180"));
    assert_eq!(unchanged.status(), DocumentStatus::Sent);
}

#[tokio::test]
async fn test_payment_reversal_restores_balance() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    ledger.create_document(gst_invoice("INV-003")).await.unwrap();

    let payment = Payment::new(date(2024, 4, 10), PaymentMode::Cheque, amount("1180"))
        .for_document("INV-003".to_string())
        .with_reference("CHQ-88".to_string());
    let receipt = ledger.record_payment(payment).await.unwrap();
    assert_eq!(receipt.document.unwrap().status(), DocumentStatus::Paid);

    let restored = ledger
        .reverse_payment(receipt.payment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.balance(), &amount("1180"));
    assert_eq!(restored.status(), DocumentStatus::Sent);

    let again = ledger.reverse_payment(receipt.payment.id).await;
    assert!(matches!(again, Err(LedgerError::PaymentNotFound(_))));
}

#[tokio::test]
async fn test_split_journal_entry_posting() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    ledger
        .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset, None)
        .await
        .unwrap();
    ledger
        .create_account("4000".to_string(), "Sales".to_string(), AccountType::Income, None)
        .await
        .unwrap();
    ledger
        .create_account("4100".to_string(), "Services".to_string(), AccountType::Income, None)
        .await
        .unwrap();

    let split = JournalEntryBuilder::new("JE-1".to_string(), date(2024, 4, 1), "Split sale".to_string())
        .debit("1000".to_string(), amount("500"), None)
        .credit("4000".to_string(), amount("300"), None)
        .credit("4100".to_string(), amount("200"), None)
        .build()
        .unwrap();
    let posted = ledger.record_journal_entry(split).await.unwrap();
    assert!(posted.is_posted());

    assert_eq!(ledger.get_account_balance("1000").await.unwrap(), amount("500"));
    assert_eq!(ledger.get_account_balance("4000").await.unwrap(), amount("300"));
    assert_eq!(ledger.get_account_balance("4100").await.unwrap(), amount("200"));

    // Posting the same entry twice is rejected and balances stay put
    assert!(ledger.post_journal_entry("JE-1").await.is_err());
    assert_eq!(ledger.get_account_balance("1000").await.unwrap(), amount("500"));

    let unbalanced = JournalEntryBuilder::new("JE-2".to_string(), date(2024, 4, 2), "Short".to_string())
        .debit("1000".to_string(), amount("500"), None)
        .credit("4000".to_string(), amount("450"), None)
        .build()
        .unwrap();
    ledger.create_journal_entry(unbalanced).await.unwrap();
    assert!(matches!(
        ledger.post_journal_entry("JE-2").await,
        Err(LedgerError::Validation(_))
    ));
    assert_eq!(ledger.get_account_balance("1000").await.unwrap(), amount("500"));

    let trial_balance = ledger.get_trial_balance().await.unwrap();
    assert!(trial_balance.is_balanced);
    assert_eq!(trial_balance.total_debits, amount("500"));
    assert_eq!(trial_balance.currency, "INR");
}

#[tokio::test]
async fn test_bill_flow_with_patterns() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();

    let bill = ledger
        .create_document(
            DocumentBuilder::new(
                DocumentKind::Bill,
                "BILL-001".to_string(),
                "VEND-1".to_string(),
                date(2024, 5, 1),
            )
            .item(
                LineItem::new("RENT".to_string(), amount("1"), amount("20000"))
                    .with_tax_rate(amount("18")),
            )
            .sent(),
        )
        .await
        .unwrap();
    assert_eq!(bill.total(), &amount("23600"));

    let accounts = BillPostingAccounts {
        expense_account: chart["rent_expense"].code.clone(),
        tax_recoverable_account: chart["gst_input"].code.clone(),
        payables_account: chart["accounts_payable"].code.clone(),
    };
    let entry = patterns::purchase_bill_entry("JE-B1".to_string(), &bill, &accounts).unwrap();
    ledger.record_journal_entry(entry).await.unwrap();

    let payable = &chart["accounts_payable"].code;
    assert_eq!(ledger.get_account_balance(payable).await.unwrap(), amount("23600"));

    let payment = Payment::new(date(2024, 5, 15), PaymentMode::BankTransfer, amount("23600"))
        .for_document("BILL-001".to_string());
    let receipt = ledger.record_payment(payment).await.unwrap();
    let settled = receipt.document.unwrap();
    assert_eq!(settled.status(), DocumentStatus::Paid);

    // Bill payments are journalised as cash paid out
    let cash_side = patterns::payment_entry(
        "JE-B2".to_string(),
        &receipt.payment,
        &settled,
        chart["bank"].code.clone(),
        payable.clone(),
    )
    .unwrap();
    ledger.record_journal_entry(cash_side).await.unwrap();

    assert_eq!(ledger.get_account_balance(payable).await.unwrap(), amount("0"));
    assert_eq!(
        ledger.get_account_balance(&chart["bank"].code).await.unwrap(),
        amount("-23600")
    );

    // Point-in-time balance before the payment was journalised
    let before_payment = ledger
        .get_account_balance_as_of(payable, date(2024, 5, 10))
        .await
        .unwrap();
    assert_eq!(before_payment, amount("23600"));

    let report = ledger.validate_integrity().await.unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
    assert_eq!(report.posted_entries, 2);
}

#[tokio::test]
async fn test_invoice_pattern_rejects_bill() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    let bill = ledger
        .create_document(
            DocumentBuilder::new(
                DocumentKind::Bill,
                "BILL-002".to_string(),
                "VEND-1".to_string(),
                date(2024, 5, 1),
            )
            .item(LineItem::new("PAPER".to_string(), amount("10"), amount("5"))),
        )
        .await
        .unwrap();

    let accounts = InvoicePostingAccounts {
        receivables_account: "1200".to_string(),
        revenue_account: "4000".to_string(),
        tax_payable_account: "2200".to_string(),
    };
    assert!(patterns::sales_invoice_entry("JE-X".to_string(), &bill, &accounts).is_err());
}

#[tokio::test]
async fn test_estimates_do_not_accept_payments() {
    let mut ledger = Ledger::new(MemoryStorage::new());
    ledger
        .create_document(
            DocumentBuilder::new(
                DocumentKind::Estimate,
                "EST-001".to_string(),
                "CUST-1".to_string(),
                date(2024, 6, 1),
            )
            .item(LineItem::new("SKU-1".to_string(), amount("2"), amount("50"))),
        )
        .await
        .unwrap();

    let payment = Payment::new(date(2024, 6, 2), PaymentMode::Cash, amount("10"))
        .for_document("EST-001".to_string());
    assert!(ledger.record_payment(payment).await.is_err());
}

#[tokio::test]
async fn test_enhanced_validators() {
    let mut ledger = Ledger::with_validators(
        MemoryStorage::new(),
        Box::new(EnhancedAccountValidator),
        Box::new(EnhancedJournalValidator),
    );

    let invalid_code = ledger
        .create_account("cash box".to_string(), "Cash".to_string(), AccountType::Asset, None)
        .await;
    assert!(invalid_code.is_err());

    ledger
        .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset, None)
        .await
        .unwrap();
    ledger
        .create_account("4000".to_string(), "Sales".to_string(), AccountType::Income, None)
        .await
        .unwrap();

    // Balanced, but repeats an account on the debit side
    let repeated = JournalEntryBuilder::new("JE-1".to_string(), date(2024, 4, 1), "Repeated".to_string())
        .debit("1000".to_string(), amount("5"), None)
        .debit("1000".to_string(), amount("5"), None)
        .credit("4000".to_string(), amount("10"), None)
        .build()
        .unwrap();
    assert!(ledger.record_journal_entry(repeated).await.is_err());
    assert_eq!(ledger.get_account_balance("1000").await.unwrap(), amount("0"));
}

#[tokio::test]
async fn test_configured_scale_applies_to_documents() {
    let config = LedgerConfig {
        currency: "USD".to_string(),
        scale: 0,
    };
    let mut ledger = Ledger::with_config(MemoryStorage::new(), config).unwrap();
    assert_eq!(ledger.config().currency, "USD");

    let fractional = DocumentBuilder::new(
        DocumentKind::Invoice,
        "INV-9".to_string(),
        "CUST-1".to_string(),
        date(2024, 7, 1),
    )
    .item(LineItem::new("SKU-1".to_string(), amount("1"), amount("10.50")));
    assert!(ledger.create_document(fractional).await.is_err());

    let bad = LedgerConfig {
        currency: "RUPEES".to_string(),
        scale: 2,
    };
    assert!(Ledger::with_config(MemoryStorage::new(), bad).is_err());
}
