//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::traits::*;
use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::validation("Amount must be positive"))
    } else {
        Ok(())
    }
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::validation("Account code cannot be empty"));
    }

    if code.len() > 20 {
        return Err(LedgerError::validation(
            "Account code cannot exceed 20 characters",
        ));
    }

    // Alphanumeric, dashes, underscores and dots for sub-accounts ("1000.01")
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(LedgerError::validation(
            "Account code can only contain alphanumeric characters, dashes, underscores and dots",
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("Account name cannot be empty"));
    }

    if name.len() > 200 {
        return Err(LedgerError::validation(
            "Account name cannot exceed 200 characters",
        ));
    }

    Ok(())
}

/// Validate that a journal entry description is valid
pub fn validate_entry_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::validation(
            "Journal entry description cannot be empty",
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::validation(
            "Journal entry description cannot exceed 500 characters",
        ));
    }

    Ok(())
}

/// Enhanced journal validator with detailed checks
pub struct EnhancedJournalValidator;

impl JournalValidator for EnhancedJournalValidator {
    fn validate_entry(&self, entry: &JournalEntry, scale: i64) -> LedgerResult<()> {
        entry.validate(scale)?;

        validate_entry_description(&entry.description)?;

        for line in entry.lines() {
            validate_account_code(&line.account_code)?;
        }

        // Same account cannot appear twice on the same side
        let mut seen = HashSet::new();
        for line in entry.lines() {
            if !seen.insert((&line.account_code, line.side())) {
                return Err(LedgerError::validation(format!(
                    "Account '{}' appears multiple times on the same side of entry '{}'",
                    line.account_code, entry.entry_number
                )));
            }
        }

        // An entry must move value between at least two accounts
        let accounts: HashSet<_> = entry.lines().iter().map(|l| &l.account_code).collect();
        if accounts.len() < 2 {
            return Err(LedgerError::validation(format!(
                "Entry '{}' only touches one account",
                entry.entry_number
            )));
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &LedgerAccount) -> LedgerResult<()> {
        DefaultAccountValidator.validate_account(account)?;
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;

        if let Some(ref parent) = account.parent_code {
            validate_account_code(parent)?;
        }

        Ok(())
    }
}
