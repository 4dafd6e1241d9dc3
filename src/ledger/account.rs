//! Account management functionality

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
    scale: i64,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(DefaultAccountValidator))
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self {
            storage,
            validator,
            scale: DEFAULT_SCALE,
        }
    }

    pub(crate) fn set_scale(&mut self, scale: i64) {
        self.scale = scale;
    }

    /// Create a new account with zero balances
    pub async fn create_account(
        &mut self,
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> LedgerResult<LedgerAccount> {
        let account = LedgerAccount::new(code, name, account_type, parent_code);

        self.validator.validate_account(&account)?;

        if self.storage.get_account(&account.code).await?.is_some() {
            return Err(LedgerError::validation(format!(
                "Account with code '{}' already exists",
                account.code
            )));
        }

        if let Some(ref parent_code) = account.parent_code {
            self.check_parent(&account.code, account.account_type, parent_code)
                .await?;
        }

        self.storage.save_account(&account).await?;
        info!(code = %account.code, account_type = ?account.account_type, "account created");

        Ok(account)
    }

    /// Get an account by code
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<LedgerAccount>> {
        self.storage.get_account(code).await
    }

    /// Get an account by code, returning an error if not found
    pub async fn get_account_required(&self, code: &str) -> LedgerResult<LedgerAccount> {
        self.storage
            .get_account(code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<LedgerAccount>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<LedgerAccount>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// Update the descriptive fields of an account.
    ///
    /// Name, description, parent and active flag are taken from `changes`.
    /// Type and balances always stay as stored.
    pub async fn update_account(&mut self, changes: &LedgerAccount) -> LedgerResult<LedgerAccount> {
        self.validator.validate_account(changes)?;

        let mut account = self.get_account_required(&changes.code).await?;

        if changes.account_type != account.account_type {
            return Err(LedgerError::validation(format!(
                "Account type of '{}' cannot be changed",
                account.code
            )));
        }

        if changes.parent_code != account.parent_code {
            if let Some(ref parent_code) = changes.parent_code {
                self.check_parent(&account.code, account.account_type, parent_code)
                    .await?;
            }
        }

        account.name = changes.name.clone();
        account.description = changes.description.clone();
        account.parent_code = changes.parent_code.clone();
        account.is_active = changes.is_active;
        account.updated_at = chrono::Utc::now().naive_utc();
        account.bump_version();

        self.storage.update_account(&account).await?;
        debug!(code = %account.code, version = account.version(), "account updated");

        Ok(account)
    }

    /// Set the opening balance of an account that has no postings yet
    pub async fn set_opening_balance(
        &mut self,
        code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<LedgerAccount> {
        if !fits_scale(&amount, self.scale) {
            return Err(LedgerError::validation(format!(
                "Opening balance exceeds {} decimal places",
                self.scale
            )));
        }

        let mut account = self.get_account_required(code).await?;

        if self.storage.account_has_postings(code).await? {
            return Err(LedgerError::validation(format!(
                "Account '{}' has posted entries; its opening balance is fixed",
                code
            )));
        }

        account.reset_opening_balance(amount);
        account.bump_version();
        self.storage.update_account(&account).await?;
        info!(code = %code, opening_balance = %account.opening_balance(), "opening balance set");

        Ok(account)
    }

    /// Delete an account with no postings and no children
    pub async fn delete_account(&mut self, code: &str) -> LedgerResult<()> {
        self.get_account_required(code).await?;

        if self.storage.account_has_postings(code).await? {
            return Err(LedgerError::validation(format!(
                "Account '{}' has posted entries and cannot be deleted",
                code
            )));
        }

        if !self.child_accounts(code).await?.is_empty() {
            return Err(LedgerError::validation(format!(
                "Account '{}' has child accounts and cannot be deleted",
                code
            )));
        }

        // The store repeats both checks inside its own write
        self.storage.delete_account(code).await?;
        info!(code = %code, "account deleted");
        Ok(())
    }

    /// Get the current balance of an account
    pub async fn get_balance(&self, code: &str) -> LedgerResult<BigDecimal> {
        Ok(self.get_account_required(code).await?.current_balance)
    }

    /// Direct children of an account
    pub async fn child_accounts(&self, parent_code: &str) -> LedgerResult<Vec<LedgerAccount>> {
        let all_accounts = self.list_accounts().await?;
        Ok(all_accounts
            .into_iter()
            .filter(|account| account.parent_code.as_deref() == Some(parent_code))
            .collect())
    }

    /// Accounts from the root down to `code`
    pub async fn account_path(&self, code: &str) -> LedgerResult<Vec<LedgerAccount>> {
        let mut path = Vec::new();
        let mut current_code = Some(code.to_string());

        while let Some(code) = current_code {
            if path.iter().any(|a: &LedgerAccount| a.code == code) {
                return Err(LedgerError::validation(format!(
                    "Cycle detected in account hierarchy at '{}'",
                    code
                )));
            }
            let account = self.get_account_required(&code).await?;
            current_code = account.parent_code.clone();
            path.insert(0, account);
        }

        Ok(path)
    }

    async fn check_parent(
        &self,
        code: &str,
        account_type: AccountType,
        parent_code: &str,
    ) -> LedgerResult<()> {
        let parent = self.storage.get_account(parent_code).await?.ok_or_else(|| {
            LedgerError::validation(format!("Parent account '{}' does not exist", parent_code))
        })?;

        if parent.account_type != account_type {
            return Err(LedgerError::validation(format!(
                "Parent account '{}' is {:?}, expected {:?}",
                parent_code, parent.account_type, account_type
            )));
        }

        // The new parent must not sit underneath the account itself
        for ancestor in self.account_path(parent_code).await? {
            if ancestor.code == code {
                return Err(LedgerError::validation(format!(
                    "Account '{}' cannot be placed under its own descendant '{}'",
                    code, parent_code
                )));
            }
        }

        Ok(())
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// (key, code, name, type, parent) rows of the standard chart
    const STANDARD_CHART: &[(&str, &str, &str, AccountType, Option<&str>)] = &[
        ("cash", "1000", "Cash", AccountType::Asset, None),
        ("bank", "1010", "Bank", AccountType::Asset, None),
        ("accounts_receivable", "1200", "Accounts Receivable", AccountType::Asset, None),
        ("inventory", "1300", "Inventory", AccountType::Asset, None),
        ("gst_input", "1400", "GST Input Credit", AccountType::Asset, None),
        ("accounts_payable", "2000", "Accounts Payable", AccountType::Liability, None),
        ("gst_output", "2200", "GST Payable", AccountType::Liability, None),
        ("loans_payable", "2500", "Loans Payable", AccountType::Liability, None),
        ("owners_equity", "3000", "Owner's Equity", AccountType::Equity, None),
        ("retained_earnings", "3200", "Retained Earnings", AccountType::Equity, None),
        ("sales_revenue", "4000", "Sales Revenue", AccountType::Income, None),
        ("service_revenue", "4100", "Service Revenue", AccountType::Income, None),
        ("cost_of_goods_sold", "5000", "Cost of Goods Sold", AccountType::Expense, None),
        ("operating_expenses", "6000", "Operating Expenses", AccountType::Expense, None),
        ("rent_expense", "6100", "Rent Expense", AccountType::Expense, Some("6000")),
        ("utilities_expense", "6200", "Utilities Expense", AccountType::Expense, Some("6000")),
    ];

    /// Create a standard chart of accounts for a small business
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &mut AccountManager<S>,
    ) -> LedgerResult<HashMap<String, LedgerAccount>> {
        let mut accounts = HashMap::new();

        for (key, code, name, account_type, parent) in STANDARD_CHART {
            let account = account_manager
                .create_account(
                    code.to_string(),
                    name.to_string(),
                    *account_type,
                    parent.map(str::to_string),
                )
                .await?;
            accounts.insert(key.to_string(), account);
        }

        Ok(accounts)
    }
}
