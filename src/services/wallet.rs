use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    models::{CreateLedgerEntryEntity, EntrySource, EntryType, LedgerEntryEntity},
    store::LedgerRepository,
};

#[derive(Serialize, Debug, ToSchema)]
pub struct WalletDetails {
    pub balance: i64,
    /// Newest first.
    pub transactions: Vec<LedgerEntryEntity>,
}

/// Credit/debit facade over the append-only ledger.
#[derive(Clone)]
pub struct WalletService {
    ledger: Arc<dyn LedgerRepository>,
}

impl WalletService {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    pub async fn credit(
        &self,
        creator_id: Uuid,
        amount: i64,
        description: String,
        reference_id: String,
        source: EntrySource,
    ) -> Result<LedgerEntryEntity, AppError> {
        self.append(creator_id, amount, EntryType::Credit, description, reference_id, source)
            .await
    }

    pub async fn debit(
        &self,
        creator_id: Uuid,
        amount: i64,
        description: String,
        reference_id: String,
        source: EntrySource,
    ) -> Result<LedgerEntryEntity, AppError> {
        self.append(creator_id, amount, EntryType::Debit, description, reference_id, source)
            .await
    }

    async fn append(
        &self,
        creator_id: Uuid,
        amount: i64,
        entry_type: EntryType,
        description: String,
        reference_id: String,
        source: EntrySource,
    ) -> Result<LedgerEntryEntity, AppError> {
        if amount <= 0 {
            return Err(AppError::BadRequest(format!(
                "ledger amount must be positive, got {amount}"
            )));
        }

        let entry = self
            .ledger
            .append(CreateLedgerEntryEntity {
                id: Uuid::new_v4(),
                creator_id,
                amount,
                entry_type,
                source,
                reference_id,
                description,
            })
            .await?;

        tracing::info!(
            %creator_id,
            amount,
            entry_type = %entry.entry_type,
            source = %entry.source,
            reference_id = %entry.reference_id,
            "Ledger entry appended"
        );
        Ok(entry)
    }

    pub async fn balance(&self, creator_id: Uuid) -> Result<i64, AppError> {
        Ok(self.ledger.balance(creator_id).await?)
    }

    pub async fn details(&self, creator_id: Uuid) -> Result<WalletDetails, AppError> {
        let balance = self.ledger.balance(creator_id).await?;
        let transactions = self.ledger.find_all_by_creator_id(creator_id).await?;
        Ok(WalletDetails {
            balance,
            transactions,
        })
    }
}
