//! Races on the same aggregate must resolve to exactly one winner.

use compact_str::format_compact;
use kanau::processor::Processor;
use oskx_core::entities::{ExchangeStatus, ExchangeTerms, UserRecord};
use oskx_core::events::Relay;
use oskx_core::services::{
    AcceptExchange, ChangeExchangeStatus, CreateExchange, ExchangeEngine, Ledger, Notifier,
};
use oskx_core::store::{MemoryStore, Page, UserStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

async fn engine_with_users(balances: &[(Uuid, Decimal)]) -> (ExchangeEngine, Ledger) {
    let store = Arc::new(MemoryStore::new());
    for (user_id, balance) in balances {
        store
            .insert_user(&UserRecord {
                user_id: *user_id,
                display_name: format_compact!("user-{user_id}"),
                points_balance: *balance,
                average_rating: None,
            })
            .await
            .unwrap();
    }
    let relay = Relay::new();
    let ledger = Ledger::new(store.clone());
    let notifier = Notifier::new(store.clone(), relay.clone());
    (
        ExchangeEngine::new(store, ledger.clone(), notifier, relay),
        ledger,
    )
}

fn terms() -> ExchangeTerms {
    ExchangeTerms {
        skill_id: Uuid::now_v7(),
        skill_label: "Chess coaching".into(),
        skill_level: None,
        description: None,
        session_type: None,
        hourly_rate: dec!(20),
        duration_hours: dec!(2),
        scheduled_date: None,
        is_mutual_exchange: false,
    }
}

async fn in_progress_exchange(
    engine: &ExchangeEngine,
    requester: Uuid,
    provider: Uuid,
) -> Uuid {
    let exchange = engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: terms(),
        })
        .await
        .unwrap();
    let id = exchange.exchange_id;
    engine
        .process(AcceptExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::InProgress,
        })
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn racing_completions_settle_exactly_once() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let (engine, ledger) =
        engine_with_users(&[(requester, dec!(100)), (provider, dec!(0))]).await;
    let id = in_progress_exchange(&engine, requester, provider).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .process(ChangeExchangeStatus {
                    exchange_id: id,
                    actor_id: provider,
                    target: ExchangeStatus::Completed,
                })
                .await
        }));
    }

    let mut won = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            won += 1;
        }
    }
    assert_eq!(won, 1);
    // The 40-point escrow was credited to the provider exactly once.
    assert_eq!(ledger.balance_of(provider).await.unwrap(), dec!(40));
    assert_eq!(ledger.balance_of(requester).await.unwrap(), dec!(60));
    let page = ledger
        .transactions_of(provider, Page::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn complete_and_cancel_race_has_one_winner() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let (engine, ledger) =
        engine_with_users(&[(requester, dec!(100)), (provider, dec!(0))]).await;
    let id = in_progress_exchange(&engine, requester, provider).await;

    let complete = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .process(ChangeExchangeStatus {
                    exchange_id: id,
                    actor_id: provider,
                    target: ExchangeStatus::Completed,
                })
                .await
        })
    };
    let cancel = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .process(ChangeExchangeStatus {
                    exchange_id: id,
                    actor_id: requester,
                    target: ExchangeStatus::Cancelled,
                })
                .await
        })
    };

    let completed = complete.await.unwrap().is_ok();
    let cancelled = cancel.await.unwrap().is_ok();
    assert!(completed ^ cancelled, "exactly one transition must win");

    // Whichever won, the escrow resolved exactly once and no points were
    // minted or burned.
    let requester_balance = ledger.balance_of(requester).await.unwrap();
    let provider_balance = ledger.balance_of(provider).await.unwrap();
    assert_eq!(requester_balance + provider_balance, dec!(100));
    if completed {
        assert_eq!(provider_balance, dec!(40));
    } else {
        assert_eq!(requester_balance, dec!(100));
    }
}

#[tokio::test]
async fn concurrent_creates_share_one_balance_check() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let (engine, ledger) =
        engine_with_users(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    // Each create escrows 40; 100 points only cover two of them.
    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .process(CreateExchange {
                    requester_id: requester,
                    provider_id: provider,
                    terms: terms(),
                })
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            created += 1;
        }
    }
    assert_eq!(created, 2);
    assert_eq!(ledger.balance_of(requester).await.unwrap(), dec!(20));
}
