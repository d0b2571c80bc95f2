mod common;

use common::{Harness, MIN_WITHDRAWAL, PayoutMode};
use creator_settlement::{
    app_error::AppError,
    models::{BankDetails, EntrySource, PayoutStatus},
    webhooks::PayoutEvent,
};
use uuid::Uuid;

fn bank() -> BankDetails {
    BankDetails {
        account_holder_name: "Asha Rao".into(),
        account_number: "123456789012".into(),
        ifsc: "HDFC0001234".into(),
    }
}

/// Creator with verified payout settings and `balance` paise of order revenue.
async fn funded_creator(h: &Harness, balance: i64) -> Uuid {
    let creator_id = h.add_creator(None);
    h.services
        .payouts
        .save_payout_config(creator_id, bank())
        .await
        .unwrap();
    h.services
        .wallet
        .credit(
            creator_id,
            balance,
            "Order payment".into(),
            Uuid::new_v4().to_string(),
            EntrySource::Order,
        )
        .await
        .unwrap();
    creator_id
}

fn event(payout_id: &str, status: PayoutStatus) -> PayoutEvent {
    PayoutEvent {
        gateway_payout_id: payout_id.into(),
        reference_id: None,
        status,
    }
}

#[tokio::test]
async fn withdrawal_debits_the_wallet_and_submits_one_transfer() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;

    let payout = h.services.payouts.withdraw_funds(creator_id, 95_000).await.unwrap();

    assert_eq!(payout.status, PayoutStatus::Processing);
    assert_eq!(payout.amount, 95_000);
    assert!(payout.gateway_payout_id.is_some());
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);

    let requests = h.gateway.payout_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].reference_id, payout.id.simple().to_string());
    assert_eq!(requests[0].currency, "INR");

    let summary = h.services.payouts.balance_summary(creator_id).await.unwrap();
    assert_eq!(summary.available_balance, 0);
    assert_eq!(summary.pending_payout, 95_000);
    assert_eq!(summary.total_earned, 95_000);
    assert_eq!(summary.total_withdrawn, 95_000);
}

#[tokio::test]
async fn concurrent_withdrawals_reach_the_gateway_once() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;

    let (a, b) = tokio::join!(
        h.services.payouts.withdraw_funds(creator_id, 95_000),
        h.services.payouts.withdraw_funds(creator_id, 95_000),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::PayoutInProgress)))
    );
    assert_eq!(h.gateway.payout_calls(), 1);
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);
}

#[tokio::test]
async fn second_withdrawal_waits_for_the_first_to_finish() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 200_000).await;

    h.services.payouts.withdraw_funds(creator_id, 50_000).await.unwrap();
    let err = h
        .services
        .payouts
        .withdraw_funds(creator_id, 50_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PayoutInProgress));
    assert_eq!(h.gateway.payout_calls(), 1);
}

#[tokio::test]
async fn reversal_restores_the_balance_once() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    let payout = h.services.payouts.withdraw_funds(creator_id, 95_000).await.unwrap();
    let gateway_id = payout.gateway_payout_id.clone().unwrap();

    let reversed = h
        .services
        .payouts
        .handle_payout_webhook(event(&gateway_id, PayoutStatus::Reversed))
        .await
        .unwrap()
        .expect("first delivery applies");
    let replay = h
        .services
        .payouts
        .handle_payout_webhook(event(&gateway_id, PayoutStatus::Reversed))
        .await
        .unwrap();

    assert_eq!(reversed.status, PayoutStatus::Reversed);
    assert!(reversed.completed_at.is_some());
    assert!(replay.is_none());
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 95_000);

    // The slot is free again.
    h.services.payouts.withdraw_funds(creator_id, 95_000).await.unwrap();
}

#[tokio::test]
async fn completed_payout_keeps_the_debit() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    let payout = h.services.payouts.withdraw_funds(creator_id, 95_000).await.unwrap();

    h.services
        .payouts
        .handle_payout_webhook(event(
            payout.gateway_payout_id.as_deref().unwrap(),
            PayoutStatus::Completed,
        ))
        .await
        .unwrap();

    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);
    let history = h.services.payouts.payout_history(creator_id).await.unwrap();
    assert_eq!(history[0].status, PayoutStatus::Completed);
}

#[tokio::test]
async fn withdrawal_guards() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;

    let below_min = h
        .services
        .payouts
        .withdraw_funds(creator_id, MIN_WITHDRAWAL - 1)
        .await
        .unwrap_err();
    assert!(matches!(below_min, AppError::MinimumNotMet { minimum: MIN_WITHDRAWAL }));

    let too_much = h
        .services
        .payouts
        .withdraw_funds(creator_id, 200_000)
        .await
        .unwrap_err();
    assert!(matches!(too_much, AppError::InsufficientBalance { available: 95_000 }));

    let unconfigured = h.add_creator(None);
    h.services
        .wallet
        .credit(
            unconfigured,
            95_000,
            "Order payment".into(),
            "ref".into(),
            EntrySource::Order,
        )
        .await
        .unwrap();
    let err = h
        .services
        .payouts
        .withdraw_funds(unconfigured, 50_000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotConfigured));

    assert_eq!(h.gateway.payout_calls(), 0);
    assert!(h.store.payouts().is_empty());
}

#[tokio::test]
async fn rejected_transfer_releases_the_reservation() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    h.gateway.set_payout_mode(PayoutMode::Reject);

    let err = h
        .services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Gateway(_)));
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 95_000);
    assert_eq!(h.store.payouts()[0].status, PayoutStatus::Failed);

    h.gateway.set_payout_mode(PayoutMode::Accept);
    h.services.payouts.withdraw_funds(creator_id, 95_000).await.unwrap();
}

#[tokio::test]
async fn timed_out_transfer_is_settled_by_the_webhook() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    h.gateway.set_payout_mode(PayoutMode::Timeout);

    let err = h
        .services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    // Outcome unknown: the reservation and the debit stay.
    let payout = h.store.payouts().remove(0);
    assert_eq!(payout.status, PayoutStatus::Processing);
    assert!(payout.gateway_payout_id.is_none());
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);

    // The gateway reports the transfer under its own id and our reference.
    let failed = h
        .services
        .payouts
        .handle_payout_webhook(PayoutEvent {
            gateway_payout_id: "pout_late".into(),
            reference_id: Some(payout.id.simple().to_string()),
            status: PayoutStatus::Failed,
        })
        .await
        .unwrap()
        .expect("payout found by reference");

    assert_eq!(failed.status, PayoutStatus::Failed);
    assert_eq!(failed.gateway_payout_id.as_deref(), Some("pout_late"));
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 95_000);
}

#[tokio::test]
async fn unknown_payout_is_not_found() {
    let h = Harness::new();

    let err = h
        .services
        .payouts
        .handle_payout_webhook(event("pout_nobody", PayoutStatus::Completed))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn payout_settings_store_only_the_masked_account() {
    let h = Harness::new();
    let creator_id = h.add_creator(None);

    let config = h
        .services
        .payouts
        .save_payout_config(creator_id, bank())
        .await
        .unwrap();
    assert_eq!(config.account_number_masked, "XXXX9012");
    assert!(config.is_verified);

    // A second save reuses the gateway contact.
    h.services
        .payouts
        .save_payout_config(creator_id, bank())
        .await
        .unwrap();
    assert_eq!(
        h.gateway
            .contacts_created
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    let stored = h
        .services
        .payouts
        .get_payout_config(creator_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.account_number_masked, "XXXX9012");
    assert_eq!(stored.ifsc, "HDFC0001234");
}

#[tokio::test]
async fn invalid_bank_details_are_rejected_before_the_gateway() {
    let h = Harness::new();
    let creator_id = h.add_creator(None);

    let err = h
        .services
        .payouts
        .save_payout_config(
            creator_id,
            BankDetails {
                ifsc: "HDFC1234".into(),
                ..bank()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(
        h.gateway
            .contacts_created
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert!(
        h.services
            .payouts
            .get_payout_config(creator_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn gateway_server_error_is_not_treated_as_a_refusal() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    h.gateway.set_payout_mode(PayoutMode::ServerError);

    let err = h
        .services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    // A 5xx may hide an executed transfer: nothing is released for a retry.
    let payout = h.store.payouts().remove(0);
    assert_eq!(payout.status, PayoutStatus::Processing);
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);

    h.gateway.set_payout_mode(PayoutMode::Accept);
    let retry = h
        .services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();
    assert!(matches!(retry, AppError::PayoutInProgress));
    assert_eq!(h.gateway.payout_calls(), 1);

    let processed = h
        .services
        .payouts
        .handle_payout_webhook(PayoutEvent {
            gateway_payout_id: "pout_late".into(),
            reference_id: Some(payout.id.simple().to_string()),
            status: PayoutStatus::Completed,
        })
        .await
        .unwrap()
        .expect("payout found by reference");
    assert_eq!(processed.status, PayoutStatus::Completed);
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);
}

#[tokio::test]
async fn processed_event_for_a_rejected_payout_writes_the_debit() {
    let h = Harness::new();
    let creator_id = funded_creator(&h, 95_000).await;
    h.gateway.set_payout_mode(PayoutMode::Reject);
    h.services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();
    let released = h.store.payouts().remove(0);
    assert_eq!(released.status, PayoutStatus::Failed);
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 95_000);

    let processed = PayoutEvent {
        gateway_payout_id: "pout_late".into(),
        reference_id: Some(released.id.simple().to_string()),
        status: PayoutStatus::Completed,
    };
    let completed = h
        .services
        .payouts
        .handle_payout_webhook(processed.clone())
        .await
        .unwrap()
        .expect("released payout is reconciled");
    let replay = h
        .services
        .payouts
        .handle_payout_webhook(processed)
        .await
        .unwrap();

    assert_eq!(completed.status, PayoutStatus::Completed);
    assert_eq!(completed.gateway_payout_id.as_deref(), Some("pout_late"));
    assert!(replay.is_none());
    assert_eq!(h.services.wallet.balance(creator_id).await.unwrap(), 0);

    h.gateway.set_payout_mode(PayoutMode::Accept);
    let again = h
        .services
        .payouts
        .withdraw_funds(creator_id, 95_000)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::InsufficientBalance { available: 0 }));
    assert_eq!(h.gateway.payout_calls(), 1);
}
