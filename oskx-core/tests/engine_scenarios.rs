//! End-to-end lifecycle scenarios against the in-memory store.

use compact_str::format_compact;
use kanau::processor::Processor;
use oskx_core::entities::{ExchangeStatus, ExchangeTerms, MessageKind, UserRecord};
use oskx_core::error::EngineError;
use oskx_core::events::Relay;
use oskx_core::services::{
    AcceptExchange, ChangeExchangeStatus, CreateExchange, DeclineExchange, ExchangeEngine,
    GetExchangeDetail, Ledger, ListExchangesFor, ListNotifications, Notifier, RateExchange,
    SendExchangeMessage,
};
use oskx_core::store::{MemoryStore, Page, UserStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

struct World {
    engine: ExchangeEngine,
    notifier: Notifier,
    ledger: Ledger,
    store: Arc<MemoryStore>,
}

async fn world(balances: &[(Uuid, Decimal)]) -> World {
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
    let engine = ExchangeEngine::new(
        store.clone(),
        ledger.clone(),
        notifier.clone(),
        relay,
    );
    World {
        engine,
        notifier,
        ledger,
        store,
    }
}

fn mentoring_terms(rate: Decimal, hours: Decimal) -> ExchangeTerms {
    ExchangeTerms {
        skill_id: Uuid::now_v7(),
        skill_label: "Sourdough baking".into(),
        skill_level: Some("Beginner".into()),
        description: Some("starter maintenance and shaping".to_owned()),
        session_type: Some("video call".into()),
        hourly_rate: rate,
        duration_hours: hours,
        scheduled_date: None,
        is_mutual_exchange: false,
    }
}

#[tokio::test]
async fn happy_path_settles_escrow_to_provider() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(200)), (provider, dec!(10))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(30), dec!(1.5)),
        })
        .await
        .unwrap();
    assert_eq!(exchange.total_cost, dec!(45));
    assert_eq!(exchange.status, ExchangeStatus::Pending);

    // Escrow is taken immediately.
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(155));
    assert_eq!(w.ledger.balance_of(provider).await.unwrap(), dec!(10));

    let id = exchange.exchange_id;
    w.engine
        .process(AcceptExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: requester,
            target: ExchangeStatus::InProgress,
        })
        .await
        .unwrap();
    let done = w
        .engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::Completed,
        })
        .await
        .unwrap();
    assert_eq!(done.status, ExchangeStatus::Completed);

    // Settlement lands on the provider, the requester pays exactly once.
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(155));
    assert_eq!(w.ledger.balance_of(provider).await.unwrap(), dec!(55));

    // Points are conserved across the pair.
    let total = w.ledger.balance_of(requester).await.unwrap()
        + w.ledger.balance_of(provider).await.unwrap();
    assert_eq!(total, dec!(210));
}

#[tokio::test]
async fn decline_refunds_the_requester() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(40), dec!(2)),
        })
        .await
        .unwrap();
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(20));

    let declined = w
        .engine
        .process(DeclineExchange {
            exchange_id: exchange.exchange_id,
            actor_id: provider,
        })
        .await
        .unwrap();
    assert_eq!(declined.status, ExchangeStatus::Cancelled);
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(100));
    assert_eq!(w.ledger.balance_of(provider).await.unwrap(), dec!(0));

    // The refund is a distinct award entry tagged to the exchange.
    let page = w
        .ledger
        .transactions_of(requester, Page::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(
        page.items
            .iter()
            .all(|t| t.related_exchange_id == Some(exchange.exchange_id))
    );
}

#[tokio::test]
async fn cancel_mid_flight_refunds_the_requester() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(10), dec!(3)),
        })
        .await
        .unwrap();
    let id = exchange.exchange_id;
    w.engine
        .process(AcceptExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::InProgress,
        })
        .await
        .unwrap();

    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: requester,
            target: ExchangeStatus::Cancelled,
        })
        .await
        .unwrap();
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(100));
    assert_eq!(w.ledger.balance_of(provider).await.unwrap(), dec!(0));
}

#[tokio::test]
async fn insufficient_funds_blocks_creation_without_traces() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(10)), (provider, dec!(0))]).await;

    let err = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(30), dec!(1)),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));

    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(10));
    let listed = w
        .engine
        .process(ListExchangesFor { actor_id: requester })
        .await
        .unwrap();
    assert!(listed.is_empty());
    let page = w
        .ledger
        .transactions_of(requester, Page::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn terminal_states_reject_further_transitions() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();
    let id = exchange.exchange_id;
    w.engine
        .process(DeclineExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();

    for target in [
        ExchangeStatus::Accepted,
        ExchangeStatus::InProgress,
        ExchangeStatus::Completed,
        ExchangeStatus::Cancelled,
    ] {
        let err = w
            .engine
            .process(ChangeExchangeStatus {
                exchange_id: id,
                actor_id: requester,
                target,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
    // Balance untouched by the rejected attempts.
    assert_eq!(w.ledger.balance_of(requester).await.unwrap(), dec!(100));
}

#[tokio::test]
async fn skipping_states_is_rejected() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();

    // Pending -> Completed must go through Accepted and InProgress.
    let err = w
        .engine
        .process(ChangeExchangeStatus {
            exchange_id: exchange.exchange_id,
            actor_id: provider,
            target: ExchangeStatus::Completed,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            to: oskx_sdk::objects::ExchangeStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn detail_view_collects_messages_and_rating() {
    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();
    let id = exchange.exchange_id;

    for (who, text) in [
        (requester, "when works for you?"),
        (provider, "thursday evening"),
        (requester, "perfect"),
    ] {
        w.engine
            .process(SendExchangeMessage {
                exchange_id: id,
                actor_id: who,
                content: text.to_owned(),
                kind: MessageKind::Text,
            })
            .await
            .unwrap();
    }

    w.engine
        .process(AcceptExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::InProgress,
        })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::Completed,
        })
        .await
        .unwrap();
    w.engine
        .process(RateExchange {
            exchange_id: id,
            actor_id: requester,
            rated_user_id: provider,
            score: 5,
            review_text: Some("clear and patient".to_owned()),
        })
        .await
        .unwrap();

    let detail = w
        .engine
        .process(GetExchangeDetail { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    assert_eq!(detail.messages.len(), 3);
    assert_eq!(detail.messages[0].content, "when works for you?");
    assert_eq!(detail.messages[2].content, "perfect");
    assert_eq!(detail.ratings.len(), 1);
    assert_eq!(detail.ratings[0].score, 5);

    let provider_record = w.store.find_user(provider).await.unwrap().unwrap();
    assert_eq!(provider_record.average_rating, Some(dec!(5)));
}

#[tokio::test]
async fn lifecycle_produces_expected_inbox_entries() {
    use oskx_core::entities::NotificationKind;

    let requester = Uuid::now_v7();
    let provider = Uuid::now_v7();
    let w = world(&[(requester, dec!(100)), (provider, dec!(0))]).await;

    let exchange = w
        .engine
        .process(CreateExchange {
            requester_id: requester,
            provider_id: provider,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();
    let id = exchange.exchange_id;
    w.engine
        .process(AcceptExchange { exchange_id: id, actor_id: provider })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::InProgress,
        })
        .await
        .unwrap();
    w.engine
        .process(ChangeExchangeStatus {
            exchange_id: id,
            actor_id: provider,
            target: ExchangeStatus::Completed,
        })
        .await
        .unwrap();

    let requester_inbox = w
        .notifier
        .process(ListNotifications { user_id: requester, limit: None })
        .await
        .unwrap();
    let kinds: Vec<NotificationKind> = requester_inbox.iter().map(|n| n.kind).collect();
    // Newest first: two status pushes after the initial deduction.
    assert_eq!(
        kinds,
        vec![
            NotificationKind::ExchangeStatusChange,
            NotificationKind::ExchangeStatusChange,
            NotificationKind::ExchangeAccepted,
            NotificationKind::PointsDeducted,
        ]
    );

    let provider_inbox = w
        .notifier
        .process(ListNotifications { user_id: provider, limit: None })
        .await
        .unwrap();
    let kinds: Vec<NotificationKind> = provider_inbox.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::PointsAwarded,
            NotificationKind::NewExchangeRequest,
        ]
    );
}

#[tokio::test]
async fn list_is_scoped_to_the_actor() {
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();
    let carol = Uuid::now_v7();
    let w = world(&[(alice, dec!(100)), (bob, dec!(100)), (carol, dec!(0))]).await;

    w.engine
        .process(CreateExchange {
            requester_id: alice,
            provider_id: carol,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();
    w.engine
        .process(CreateExchange {
            requester_id: bob,
            provider_id: carol,
            terms: mentoring_terms(dec!(10), dec!(1)),
        })
        .await
        .unwrap();

    let for_alice = w
        .engine
        .process(ListExchangesFor { actor_id: alice })
        .await
        .unwrap();
    assert_eq!(for_alice.len(), 1);
    assert_eq!(for_alice[0].requester_id, alice);

    let for_carol = w
        .engine
        .process(ListExchangesFor { actor_id: carol })
        .await
        .unwrap();
    assert_eq!(for_carol.len(), 2);
}
