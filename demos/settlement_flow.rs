//! Invoice and bill settlement walkthrough

use bookkeeping_core::utils::MemoryStorage;
use bookkeeping_core::{
    patterns, telemetry, BillPostingAccounts, DocumentBuilder, DocumentKind,
    InvoicePostingAccounts, Ledger, LedgerConfig, LineItem, Payment, PaymentMode,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    println!("🧾 Bookkeeping Core - Settlement Flow Example\n");

    let config = LedgerConfig::load()?;
    let mut ledger = Ledger::with_config(MemoryStorage::new(), config)?;

    // 1. Chart of accounts
    println!("📊 Setting up Chart of Accounts...");
    let accounts = ledger.setup_standard_chart_of_accounts().await?;
    let mut listed: Vec<_> = accounts.values().collect();
    listed.sort_by(|a, b| a.code.cmp(&b.code));
    for account in listed {
        println!(
            "  ✓ {} - {} ({:?})",
            account.code, account.name, account.account_type
        );
    }
    println!();

    // 2. Raise an invoice and journalise it
    println!("📄 Raising invoice INV-001...");
    let invoice = ledger
        .create_document(
            DocumentBuilder::new(
                DocumentKind::Invoice,
                "INV-001".to_string(),
                "Acme Traders".to_string(),
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            )
            .due_date(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap())
            .item(
                LineItem::new("Consulting".to_string(), BigDecimal::from(10), BigDecimal::from(100))
                    .with_tax_rate(BigDecimal::from(18)),
            )
            .sent(),
        )
        .await?;
    println!(
        "  Subtotal: {} | Tax: {} | Total: {}",
        invoice.subtotal(),
        invoice.tax(),
        invoice.total()
    );

    let sales_accounts = InvoicePostingAccounts {
        receivables_account: accounts["accounts_receivable"].code.clone(),
        revenue_account: accounts["service_revenue"].code.clone(),
        tax_payable_account: accounts["gst_output"].code.clone(),
    };
    let entry = patterns::sales_invoice_entry("JE-001".to_string(), &invoice, &sales_accounts)?;
    ledger.record_journal_entry(entry).await?;
    println!("  ✓ Posted JE-001\n");

    // 3. Collect in two instalments
    println!("💰 Collecting payments...");
    for (number, amount) in [("JE-002", 500), ("JE-003", 680)] {
        let payment = Payment::new(
            NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            PaymentMode::BankTransfer,
            BigDecimal::from(amount),
        )
        .for_document("INV-001".to_string());
        let receipt = ledger.record_payment(payment).await?;

        if let Some(document) = &receipt.document {
            let cash_side = patterns::payment_entry(
                number.to_string(),
                &receipt.payment,
                document,
                accounts["bank"].code.clone(),
                accounts["accounts_receivable"].code.clone(),
            )?;
            ledger.record_journal_entry(cash_side).await?;

            println!(
                "  ✓ Received {} -> balance {} ({:?})",
                amount,
                document.balance(),
                document.status()
            );
        }
    }
    println!();

    // 4. Record a vendor bill
    println!("🧾 Recording bill BILL-001...");
    let bill = ledger
        .create_document(
            DocumentBuilder::new(
                DocumentKind::Bill,
                "BILL-001".to_string(),
                "City Utilities".to_string(),
                NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
            )
            .item(
                LineItem::new("Electricity".to_string(), BigDecimal::from(1), BigDecimal::from(2000))
                    .with_tax_rate(BigDecimal::from(5)),
            )
            .sent(),
        )
        .await?;
    let bill_accounts = BillPostingAccounts {
        expense_account: accounts["utilities_expense"].code.clone(),
        tax_recoverable_account: accounts["gst_input"].code.clone(),
        payables_account: accounts["accounts_payable"].code.clone(),
    };
    let entry = patterns::purchase_bill_entry("JE-004".to_string(), &bill, &bill_accounts)?;
    ledger.record_journal_entry(entry).await?;
    println!("  ✓ Bill total {} posted as JE-004\n", bill.total());

    // 5. Reports
    println!("📈 Trial Balance ({}):", ledger.config().currency);
    let trial_balance = ledger.get_trial_balance().await?;
    for balance in &trial_balance.balances {
        if let Some(debit) = &balance.debit_balance {
            println!("  {:<28} Dr {:>12}", balance.account.name, debit);
        }
        if let Some(credit) = &balance.credit_balance {
            println!("  {:<28} Cr {:>12}", balance.account.name, credit);
        }
    }
    println!(
        "  Totals: Dr {} / Cr {} (balanced: {})\n",
        trial_balance.total_debits, trial_balance.total_credits, trial_balance.is_balanced
    );

    let report = ledger.validate_integrity().await?;
    if report.is_valid {
        println!("✅ Ledger integrity check passed ({} posted entries)", report.posted_entries);
    } else {
        println!("❌ Ledger integrity issues:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
    }

    Ok(())
}
