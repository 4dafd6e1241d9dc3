//! Main ledger orchestrator that coordinates accounts, journal and settlement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::ledger::{AccountManager, JournalManager};
use crate::settlement::{DocumentBuilder, PaymentReceipt, SettlementManager};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all bookkeeping operations
pub struct Ledger<S: LedgerStorage> {
    config: LedgerConfig,
    account_manager: AccountManager<S>,
    journal_manager: JournalManager<S>,
    settlement_manager: SettlementManager<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default configuration
    pub fn new(storage: S) -> Self {
        Self {
            config: LedgerConfig::default(),
            account_manager: AccountManager::new(storage.clone()),
            journal_manager: JournalManager::new(storage.clone()),
            settlement_manager: SettlementManager::new(storage),
        }
    }

    /// Create a new ledger with an explicit configuration
    pub fn with_config(storage: S, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let mut ledger = Self::new(storage);
        ledger.account_manager.set_scale(config.scale);
        ledger.journal_manager.set_scale(config.scale);
        ledger.settlement_manager.set_scale(config.scale);
        ledger.config = config;
        Ok(ledger)
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        account_validator: Box<dyn AccountValidator>,
        journal_validator: Box<dyn JournalValidator>,
    ) -> Self {
        Self {
            config: LedgerConfig::default(),
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            journal_manager: JournalManager::with_validator(storage.clone(), journal_validator),
            settlement_manager: SettlementManager::new(storage),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn accounts(&mut self) -> &mut AccountManager<S> {
        &mut self.account_manager
    }

    pub fn journal(&mut self) -> &mut JournalManager<S> {
        &mut self.journal_manager
    }

    pub fn settlement(&mut self) -> &mut SettlementManager<S> {
        &mut self.settlement_manager
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &mut self,
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> LedgerResult<LedgerAccount> {
        self.account_manager
            .create_account(code, name, account_type, parent_code)
            .await
    }

    /// Get an account by code
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<LedgerAccount>> {
        self.account_manager.get_account(code).await
    }

    /// Get the current balance of an account
    pub async fn get_account_balance(&self, code: &str) -> LedgerResult<BigDecimal> {
        self.account_manager.get_balance(code).await
    }

    /// Balance of an account from its opening balance and entries posted on or before `as_of`
    pub async fn get_account_balance_as_of(
        &self,
        code: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<BigDecimal> {
        let account = self.account_manager.get_account_required(code).await?;
        let entries = self.journal_manager.list_entries(None, Some(as_of)).await?;

        let mut balance = account.opening_balance().clone();
        for entry in entries.iter().filter(|e| e.is_posted()) {
            for line in entry.lines().iter().filter(|l| l.account_code == code) {
                balance += account
                    .account_type
                    .balance_effect(&line.debit_amount, &line.credit_amount);
            }
        }

        Ok(balance)
    }

    /// Setup a standard chart of accounts for small business
    pub async fn setup_standard_chart_of_accounts(
        &mut self,
    ) -> LedgerResult<HashMap<String, LedgerAccount>> {
        crate::ledger::account::utils::create_standard_chart(&mut self.account_manager).await
    }

    // Journal operations
    /// Store a draft journal entry
    pub async fn create_journal_entry(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        self.journal_manager.create_entry(entry).await
    }

    /// Post a draft journal entry
    pub async fn post_journal_entry(&mut self, entry_number: &str) -> LedgerResult<JournalEntry> {
        self.journal_manager.post_entry(entry_number).await
    }

    /// Draft and post a journal entry in one step
    pub async fn record_journal_entry(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        self.journal_manager.record_and_post(entry).await
    }

    // Settlement operations
    /// Create a document with computed totals
    pub async fn create_document(
        &mut self,
        builder: DocumentBuilder,
    ) -> LedgerResult<SettlementDocument> {
        self.settlement_manager.create_document(builder).await
    }

    /// Get a document by number
    pub async fn get_document(&self, number: &str) -> LedgerResult<Option<SettlementDocument>> {
        self.settlement_manager.get_document(number).await
    }

    /// Record a payment, settling its linked document
    pub async fn record_payment(&mut self, payment: Payment) -> LedgerResult<PaymentReceipt> {
        self.settlement_manager.record_payment(payment).await
    }

    /// Reverse a payment, restoring its document's balance
    pub async fn reverse_payment(
        &mut self,
        payment_id: Uuid,
    ) -> LedgerResult<Option<SettlementDocument>> {
        self.settlement_manager.reverse_payment(payment_id).await
    }

    // Reporting
    /// Trial balance from current account balances
    pub async fn get_trial_balance(&self) -> LedgerResult<TrialBalance> {
        let accounts = self.account_manager.list_accounts().await?;
        let mut balances = Vec::with_capacity(accounts.len());
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in accounts {
            let row = AccountBalance::from_account(account);
            if let Some(ref debit) = row.debit_balance {
                total_debits += debit;
            }
            if let Some(ref credit) = row.credit_balance {
                total_credits += credit;
            }
            balances.push(row);
        }

        let is_balanced = total_debits == total_credits;

        Ok(TrialBalance {
            currency: self.config.currency.clone(),
            generated_at: chrono::Utc::now().naive_utc(),
            balances,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Validate the integrity of the ledger
    pub async fn validate_integrity(&self) -> LedgerResult<LedgerIntegrityReport> {
        let zero = BigDecimal::from(0);
        let mut issues = Vec::new();

        // Posted entries must balance and carry totals that match their lines
        let entries = self.journal_manager.list_entries(None, None).await?;
        let mut posted_effects: HashMap<String, Vec<(BigDecimal, BigDecimal)>> = HashMap::new();
        let mut posted_entries = 0;
        for entry in entries.iter().filter(|e| e.is_posted()) {
            posted_entries += 1;
            if let Err(err) = entry.validate(self.config.scale) {
                issues.push(err.to_string());
            }
            let debits: BigDecimal = entry.lines().iter().map(|l| &l.debit_amount).sum();
            let credits: BigDecimal = entry.lines().iter().map(|l| &l.credit_amount).sum();
            if &debits != entry.total_debit() || &credits != entry.total_credit() {
                issues.push(format!(
                    "Journal entry '{}' totals do not match its lines",
                    entry.entry_number
                ));
            }
            for line in entry.lines() {
                posted_effects
                    .entry(line.account_code.clone())
                    .or_default()
                    .push((line.debit_amount.clone(), line.credit_amount.clone()));
            }
        }

        // Running balances must equal opening balance plus posted effects
        let accounts = self.account_manager.list_accounts().await?;
        for account in &accounts {
            let mut expected = account.opening_balance().clone();
            if let Some(effects) = posted_effects.get(&account.code) {
                for (debit, credit) in effects {
                    expected += account.account_type.balance_effect(debit, credit);
                }
            }
            if &expected != account.current_balance() {
                issues.push(format!(
                    "Account '{}' balance {} does not match postings ({})",
                    account.code,
                    account.current_balance(),
                    expected
                ));
            }
        }

        // Outstanding balances must equal total minus applied payments
        let documents = self.settlement_manager.list_documents(None).await?;
        for document in &documents {
            let paid: BigDecimal = if document.kind.accepts_payments() {
                self.settlement_manager
                    .list_payments(Some(document.number.as_str()))
                    .await?
                    .iter()
                    .map(|p| &p.amount)
                    .sum()
            } else {
                BigDecimal::from(0)
            };
            let mut expected = document.total() - &paid;
            if expected < zero {
                expected = zero.clone();
            }
            if &expected != document.balance() {
                issues.push(format!(
                    "Document '{}' balance {} does not match payments ({})",
                    document.number,
                    document.balance(),
                    expected
                ));
            }
        }

        let trial_balance = self.get_trial_balance().await?;
        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        if issues.is_empty() {
            info!(
                posted_entries,
                accounts = accounts.len(),
                documents = documents.len(),
                "ledger integrity verified"
            );
        } else {
            warn!(issues = issues.len(), "ledger integrity check found issues");
        }

        Ok(LedgerIntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            posted_entries,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
        })
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub posted_entries: usize,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
}
