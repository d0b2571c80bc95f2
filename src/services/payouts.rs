use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CURRENCY, Repositories, wallet::WalletService};
use crate::{
    api::razorpay::{PaymentGateway, PayoutRequest},
    app_error::AppError,
    models::{
        BankDetails, CreatePayoutEntity, EntrySource, EntryType, PayoutConfig, PayoutEntity,
        PayoutStatus,
    },
    store::{LedgerRepository, PayoutRepository, ProfileRepository, StoreError},
    webhooks::PayoutEvent,
};

static ACCOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{9,18}$").expect("account number pattern is valid"));
static IFSC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("IFSC pattern is valid"));

/// Returns every violated rule, joined with `; `.
pub fn validate_bank_details(bank: &BankDetails) -> Result<(), String> {
    let mut violations = Vec::new();
    if bank.account_holder_name.trim().is_empty() {
        violations.push("account holder name is required");
    }
    if !ACCOUNT_NUMBER.is_match(&bank.account_number) {
        violations.push("invalid account number: must be 9-18 digits");
    }
    if !IFSC.is_match(&bank.ifsc) {
        violations.push("invalid IFSC code: must match format XXXX0XXXXXX");
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.join("; "))
    }
}

/// Keeps only the last four digits.
pub fn mask_account_number(account_number: &str) -> String {
    let chars: Vec<char> = account_number.chars().collect();
    if chars.len() <= 4 {
        return account_number.to_string();
    }
    let last_four: String = chars[chars.len() - 4..].iter().collect();
    format!("XXXX{last_four}")
}

#[derive(Serialize, Debug, PartialEq, ToSchema)]
pub struct BalanceSummary {
    pub available_balance: i64,
    pub pending_payout: i64,
    pub total_earned: i64,
    pub total_withdrawn: i64,
}

#[derive(Clone)]
pub struct PayoutService {
    payouts: Arc<dyn PayoutRepository>,
    profiles: Arc<dyn ProfileRepository>,
    ledger: Arc<dyn LedgerRepository>,
    gateway: Arc<dyn PaymentGateway>,
    wallet: WalletService,
    min_withdrawal: i64,
}

impl PayoutService {
    pub fn new(
        repos: &Repositories,
        gateway: Arc<dyn PaymentGateway>,
        wallet: WalletService,
        min_withdrawal: i64,
    ) -> Self {
        Self {
            payouts: repos.payouts.clone(),
            profiles: repos.profiles.clone(),
            ledger: repos.ledger.clone(),
            gateway,
            wallet,
            min_withdrawal,
        }
    }

    pub async fn save_payout_config(
        &self,
        creator_id: Uuid,
        bank: BankDetails,
    ) -> Result<PayoutConfig, AppError> {
        validate_bank_details(&bank).map_err(AppError::BadRequest)?;

        let profile = self
            .profiles
            .find_by_creator_id(creator_id)
            .await?
            .ok_or_else(|| AppError::NotFound("creator profile".into()))?;

        let contact_id = match profile.gateway_contact_id.filter(|id| !id.is_empty()) {
            Some(contact_id) => contact_id,
            None => {
                self.gateway
                    .create_contact(
                        &profile.display_name,
                        &profile.email,
                        &format!("creator_{}", creator_id.simple()),
                    )
                    .await?
            }
        };
        let fund_account_id = self.gateway.create_fund_account(&contact_id, &bank).await?;

        let config = PayoutConfig {
            account_holder_name: bank.account_holder_name.trim().to_string(),
            account_number_masked: mask_account_number(&bank.account_number),
            ifsc: bank.ifsc,
            gateway_contact_id: contact_id,
            gateway_fund_account_id: fund_account_id,
            is_verified: true,
        };
        self.profiles
            .save_payout_config(creator_id, config.clone())
            .await?;

        tracing::info!(%creator_id, "Payout settings saved");
        Ok(config)
    }

    pub async fn get_payout_config(&self, creator_id: Uuid) -> Result<Option<PayoutConfig>, AppError> {
        let profile = self
            .profiles
            .find_by_creator_id(creator_id)
            .await?
            .ok_or_else(|| AppError::NotFound("creator profile".into()))?;
        Ok(profile.payout_config())
    }

    /// Submits a withdrawal. At most one payout per creator is ever `processing`: the reservation
    /// insert is the single-flight guard, the earlier lookup only produces a friendlier error.
    pub async fn withdraw_funds(&self, creator_id: Uuid, amount: i64) -> Result<PayoutEntity, AppError> {
        if amount < self.min_withdrawal {
            return Err(AppError::MinimumNotMet {
                minimum: self.min_withdrawal,
            });
        }
        if self
            .payouts
            .find_processing_by_creator_id(creator_id)
            .await?
            .is_some()
        {
            return Err(AppError::PayoutInProgress);
        }

        let available = self.wallet.balance(creator_id).await?;
        if amount > available {
            return Err(AppError::InsufficientBalance { available });
        }

        let fund_account_id = self
            .profiles
            .find_by_creator_id(creator_id)
            .await?
            .and_then(|profile| profile.payout_config())
            .filter(|config| config.is_verified)
            .map(|config| config.gateway_fund_account_id)
            .ok_or(AppError::NotConfigured)?;

        let payout = match self
            .payouts
            .reserve(CreatePayoutEntity {
                id: Uuid::new_v4(),
                creator_id,
                amount,
                platform_fee: 0,
                net_amount: amount,
                status: PayoutStatus::Processing,
            })
            .await
        {
            Ok(payout) => payout,
            Err(StoreError::Conflict(_)) => return Err(AppError::PayoutInProgress),
            Err(err) => return Err(err.into()),
        };

        let request = PayoutRequest {
            fund_account_id,
            amount,
            currency: CURRENCY.to_string(),
            reference_id: payout.id.simple().to_string(),
            narration: "Creator payout".to_string(),
        };

        match self.gateway.create_payout(&request).await {
            Ok(gateway_payout_id) => {
                let payout = match self
                    .payouts
                    .attach_gateway_id(payout.id, &gateway_payout_id)
                    .await
                {
                    Ok(updated) => updated,
                    Err(err) => {
                        tracing::error!(
                            critical = true,
                            payout_id = %payout.id,
                            %gateway_payout_id,
                            error = %err,
                            "Failed to record gateway payout id"
                        );
                        payout
                    }
                };
                self.debit_withdrawal(&payout, &gateway_payout_id).await;
                tracing::info!(payout_id = %payout.id, %creator_id, amount, "Payout submitted");
                Ok(payout)
            }
            Err(err) if err.outcome_unknown() => {
                // The transfer may exist. Keep the reservation and the debit; the payout webhook
                // settles it either way.
                tracing::error!(
                    critical = true,
                    payout_id = %payout.id,
                    %creator_id,
                    amount,
                    error = %err,
                    "Payout outcome unknown, awaiting gateway webhook"
                );
                self.debit_withdrawal(&payout, &payout.id.simple().to_string())
                    .await;
                Err(err.into())
            }
            Err(err) => {
                tracing::warn!(payout_id = %payout.id, error = %err, "Payout rejected by gateway");
                if let Err(store_err) = self.payouts.finish(payout.id, PayoutStatus::Failed).await {
                    tracing::error!(
                        critical = true,
                        payout_id = %payout.id,
                        error = %store_err,
                        "Failed to release rejected payout"
                    );
                }
                Err(err.into())
            }
        }
    }

    async fn debit_withdrawal(&self, payout: &PayoutEntity, gateway_reference: &str) {
        let debited = self
            .wallet
            .debit(
                payout.creator_id,
                payout.amount,
                format!("Payout withdrawal via {gateway_reference}"),
                payout.id.to_string(),
                EntrySource::Payout,
            )
            .await;
        if let Err(err) = debited {
            tracing::error!(
                critical = true,
                payout_id = %payout.id,
                creator_id = %payout.creator_id,
                amount = payout.amount,
                error = %err,
                "Ledger debit failed after payout submission"
            );
        }
    }

    /// Applies a terminal payout status reported by the gateway. Returns `None` when the payout
    /// had already reached a terminal state, so replays never credit twice.
    pub async fn handle_payout_webhook(
        &self,
        event: PayoutEvent,
    ) -> Result<Option<PayoutEntity>, AppError> {
        let mut payout = self.payouts.find_by_gateway_id(&event.gateway_payout_id).await?;
        if payout.is_none() {
            if let Some(id) = event
                .reference_id
                .as_deref()
                .and_then(|reference| Uuid::parse_str(reference).ok())
            {
                payout = self.payouts.find_by_id(id).await?;
            }
        }
        let payout = payout.ok_or_else(|| AppError::NotFound("payout".into()))?;

        if event.status == PayoutStatus::Completed
            && payout.status == PayoutStatus::Failed
            && payout.gateway_payout_id.is_none()
        {
            return self.complete_released(payout, &event.gateway_payout_id).await;
        }

        if payout.gateway_payout_id.is_none() {
            self.payouts
                .attach_gateway_id(payout.id, &event.gateway_payout_id)
                .await?;
        }

        let Some(payout) = self.payouts.finish(payout.id, event.status).await? else {
            tracing::info!(payout_id = %payout.id, status = %event.status, "Payout already terminal");
            return Ok(None);
        };
        tracing::info!(payout_id = %payout.id, status = %payout.status, "Payout finished");

        if payout.status.restores_balance() {
            let credited = self
                .wallet
                .credit(
                    payout.creator_id,
                    payout.amount,
                    format!("Payout reversal {} ({})", event.gateway_payout_id, payout.status),
                    payout.id.to_string(),
                    EntrySource::Payout,
                )
                .await;
            if let Err(err) = credited {
                tracing::error!(
                    critical = true,
                    payout_id = %payout.id,
                    creator_id = %payout.creator_id,
                    amount = payout.amount,
                    error = %err,
                    "Compensating credit failed for returned payout"
                );
            }
        }

        Ok(Some(payout))
    }

    /// The gateway executed a transfer we released as rejected. The money is gone, so the debit
    /// that was skipped at submission is written now.
    async fn complete_released(
        &self,
        payout: PayoutEntity,
        gateway_payout_id: &str,
    ) -> Result<Option<PayoutEntity>, AppError> {
        let Some(payout) = self
            .payouts
            .complete_released(payout.id, gateway_payout_id)
            .await?
        else {
            tracing::info!(payout_id = %payout.id, "Released payout already reconciled");
            return Ok(None);
        };
        tracing::error!(
            critical = true,
            payout_id = %payout.id,
            creator_id = %payout.creator_id,
            amount = payout.amount,
            %gateway_payout_id,
            "Gateway processed a payout released as rejected, debiting now"
        );
        self.debit_withdrawal(&payout, gateway_payout_id).await;
        Ok(Some(payout))
    }

    pub async fn balance_summary(&self, creator_id: Uuid) -> Result<BalanceSummary, AppError> {
        let available_balance = self.ledger.balance(creator_id).await?;
        let entries = self.ledger.find_all_by_creator_id(creator_id).await?;

        let (mut total_earned, mut total_withdrawn) = (0, 0);
        for entry in &entries {
            match (entry.entry_type, entry.source) {
                (EntryType::Credit, EntrySource::Order) => total_earned += entry.amount,
                (EntryType::Debit, EntrySource::Payout) => total_withdrawn += entry.amount,
                _ => {}
            }
        }

        let pending_payout = self
            .payouts
            .find_processing_by_creator_id(creator_id)
            .await?
            .map_or(0, |payout| payout.amount);

        Ok(BalanceSummary {
            available_balance,
            pending_payout,
            total_earned,
            total_withdrawn,
        })
    }

    pub async fn payout_history(&self, creator_id: Uuid) -> Result<Vec<PayoutEntity>, AppError> {
        Ok(self.payouts.find_all_by_creator_id(creator_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(name: &str, account: &str, ifsc: &str) -> BankDetails {
        BankDetails {
            account_holder_name: name.into(),
            account_number: account.into(),
            ifsc: ifsc.into(),
        }
    }

    #[test]
    fn accepts_well_formed_details() {
        assert!(validate_bank_details(&bank("Asha Rao", "123456789012", "HDFC0001234")).is_ok());
    }

    #[test]
    fn reports_each_violated_rule() {
        let err = validate_bank_details(&bank(" ", "12ab", "hdfc0001234")).unwrap_err();

        assert!(err.contains("account holder name is required"));
        assert!(err.contains("9-18 digits"));
        assert!(err.contains("IFSC"));
        assert_eq!(err.matches("; ").count(), 2);
    }

    #[test]
    fn ifsc_fifth_character_must_be_zero() {
        let err = validate_bank_details(&bank("Asha Rao", "123456789", "HDFC1001234")).unwrap_err();
        assert!(err.contains("IFSC"));
        assert!(!err.contains("digits"));
    }

    #[test]
    fn account_number_length_bounds() {
        assert!(ACCOUNT_NUMBER.is_match(&"1".repeat(9)));
        assert!(ACCOUNT_NUMBER.is_match(&"1".repeat(18)));
        assert!(!ACCOUNT_NUMBER.is_match(&"1".repeat(8)));
        assert!(!ACCOUNT_NUMBER.is_match(&"1".repeat(19)));
        assert!(IFSC.is_match("SBIN0A1B2C3"));
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_account_number("123456789012"), "XXXX9012");
        assert_eq!(mask_account_number("1234"), "1234");
    }
}
