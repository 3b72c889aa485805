//! The exchange state machine.
//!
//! Owns the lifecycle of the exchange aggregate and orchestrates every
//! side effect of a transition: escrow through the ledger, inbox
//! notifications, and relay broadcasts. Transitions are linearized per
//! exchange id with a keyed lock, and the status write itself is a
//! compare-and-swap at the store layer, so escrow resolution executes at
//! most once per exchange even across racing callers.
//!
//! Side-effect ordering follows the compensation rule: everything that
//! can fail validation runs before the first write, the escrow debit
//! runs before the exchange insert (and is refunded if the insert
//! fails), and notification/relay failures are logged and swallowed.

use crate::entities::{
    Exchange, ExchangeStatus, ExchangeTerms, Message, MessageKind, NotificationKind, Rating,
};
use crate::error::EngineError;
use crate::events::{Relay, RelayEvent, Topic};
use crate::services::ledger::Ledger;
use crate::services::notify::Notifier;
use crate::store::Store;
use crate::utils::keyed_lock::KeyedLocks;
use compact_str::{CompactString, format_compact};
use kanau::processor::Processor;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ExchangeEngine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) ledger: Ledger,
    pub(crate) notifier: Notifier,
    pub(crate) relay: Relay,
    pub(crate) locks: Arc<KeyedLocks<Uuid>>,
}

impl ExchangeEngine {
    pub fn new(store: Arc<dyn Store>, ledger: Ledger, notifier: Notifier, relay: Relay) -> Self {
        Self {
            store,
            ledger,
            notifier,
            relay,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub(crate) async fn display_name_of(&self, user_id: Uuid) -> CompactString {
        match self.store.find_user(user_id).await {
            Ok(Some(user)) => user.display_name,
            _ => CompactString::const_new("Unknown User"),
        }
    }

    async fn broadcast_status(&self, exchange_id: Uuid, status: ExchangeStatus, changed_by: Uuid) {
        self.relay
            .publish(
                Topic::Exchange(exchange_id),
                RelayEvent::ExchangeStatusChanged {
                    exchange_id,
                    status,
                    changed_by,
                },
            )
            .await;
    }

    fn load_checked(
        exchange: Option<Exchange>,
        actor_id: Uuid,
    ) -> Result<Exchange, EngineError> {
        let exchange = exchange.ok_or(EngineError::NotFound("exchange"))?;
        if !exchange.is_party(actor_id) {
            return Err(EngineError::Forbidden);
        }
        Ok(exchange)
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Open a new exchange: escrow the cost from the requester and create
/// the aggregate in `Pending`.
#[derive(Debug, Clone)]
pub struct CreateExchange {
    pub requester_id: Uuid,
    pub provider_id: Uuid,
    pub terms: ExchangeTerms,
}

impl Processor<CreateExchange> for ExchangeEngine {
    type Output = Exchange;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:CreateExchange")]
    async fn process(&self, msg: CreateExchange) -> Result<Exchange, EngineError> {
        msg.terms.validate()?;
        if msg.requester_id == msg.provider_id {
            return Err(EngineError::SelfExchange);
        }
        let requester = self
            .store
            .find_user(msg.requester_id)
            .await?
            .ok_or(EngineError::NotFound("user"))?;
        if self.store.find_user(msg.provider_id).await?.is_none() {
            return Err(EngineError::NotFound("provider"));
        }

        let exchange = Exchange::new(msg.requester_id, msg.provider_id, msg.terms);
        let total_cost = exchange.total_cost;
        let reason = format_compact!("Exchange request for {}", exchange.skill_label);

        // Escrow before insert. The debit is the only step that can fail
        // a business rule (insufficient funds); doing it first means a
        // failed create leaves no trace.
        self.ledger
            .debit(
                msg.requester_id,
                total_cost,
                reason.clone(),
                Some(exchange.exchange_id),
            )
            .await?;

        if let Err(e) = self.store.insert_exchange(&exchange).await {
            // Compensate: the escrow must not stay orphaned.
            tracing::error!(
                error = %e,
                exchange_id = %exchange.exchange_id,
                "exchange insert failed after escrow debit, refunding"
            );
            // Bound to a local so no `format_args!` temporary lives
            // across the await; the future must stay `Send`.
            let refund_reason = format_compact!(
                "Refund for failed exchange creation: {}",
                exchange.skill_label
            );
            if let Err(refund_err) = self
                .ledger
                .credit(
                    msg.requester_id,
                    total_cost,
                    refund_reason,
                    Some(exchange.exchange_id),
                )
                .await
            {
                tracing::error!(
                    error = %refund_err,
                    exchange_id = %exchange.exchange_id,
                    "compensating refund failed, escrow orphaned"
                );
            }
            return Err(e.into());
        }

        self.notifier
            .notify(
                msg.requester_id,
                NotificationKind::PointsDeducted,
                json!({
                    "amount": total_cost,
                    "reason": reason.as_str(),
                    "exchange_id": exchange.exchange_id,
                }),
            )
            .await;
        self.notifier
            .notify(
                msg.provider_id,
                NotificationKind::NewExchangeRequest,
                json!({
                    "exchange_id": exchange.exchange_id,
                    "requester_name": requester.display_name.as_str(),
                    "skill": exchange.skill_label.as_str(),
                    "description": exchange.description,
                }),
            )
            .await;

        Ok(exchange)
    }
}

// ---------------------------------------------------------------------------
// Accept / Decline
// ---------------------------------------------------------------------------

/// Provider accepts a pending exchange. Funds stay escrowed.
#[derive(Debug, Clone)]
pub struct AcceptExchange {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
}

impl Processor<AcceptExchange> for ExchangeEngine {
    type Output = Exchange;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:AcceptExchange")]
    async fn process(&self, msg: AcceptExchange) -> Result<Exchange, EngineError> {
        let _guard = self.locks.acquire(msg.exchange_id).await;

        let mut exchange = self
            .store
            .find_exchange(msg.exchange_id)
            .await?
            .ok_or(EngineError::NotFound("exchange"))?;
        if exchange.provider_id != msg.actor_id {
            return Err(EngineError::Forbidden);
        }
        if exchange.status != ExchangeStatus::Pending {
            return Err(EngineError::InvalidTransition {
                from: exchange.status.into(),
                to: ExchangeStatus::Accepted.into(),
            });
        }

        let now = time::OffsetDateTime::now_utc();
        if !self
            .store
            .update_status(
                msg.exchange_id,
                ExchangeStatus::Pending,
                ExchangeStatus::Accepted,
                now,
            )
            .await?
        {
            return Err(EngineError::Conflict);
        }
        exchange.status = ExchangeStatus::Accepted;
        exchange.updated_at = now;

        let provider_name = self.display_name_of(msg.actor_id).await;
        self.notifier
            .notify(
                exchange.requester_id,
                NotificationKind::ExchangeAccepted,
                json!({
                    "exchange_id": exchange.exchange_id,
                    "provider_name": provider_name.as_str(),
                    "skill": exchange.skill_label.as_str(),
                }),
            )
            .await;
        self.broadcast_status(msg.exchange_id, ExchangeStatus::Accepted, msg.actor_id)
            .await;

        Ok(exchange)
    }
}

/// Provider declines a pending exchange; the escrow is refunded to the
/// requester.
#[derive(Debug, Clone)]
pub struct DeclineExchange {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
}

impl Processor<DeclineExchange> for ExchangeEngine {
    type Output = Exchange;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:DeclineExchange")]
    async fn process(&self, msg: DeclineExchange) -> Result<Exchange, EngineError> {
        let _guard = self.locks.acquire(msg.exchange_id).await;

        let mut exchange = self
            .store
            .find_exchange(msg.exchange_id)
            .await?
            .ok_or(EngineError::NotFound("exchange"))?;
        if exchange.provider_id != msg.actor_id {
            return Err(EngineError::Forbidden);
        }
        if exchange.status != ExchangeStatus::Pending {
            return Err(EngineError::InvalidTransition {
                from: exchange.status.into(),
                to: ExchangeStatus::Cancelled.into(),
            });
        }

        let now = time::OffsetDateTime::now_utc();
        if !self
            .store
            .update_status(
                msg.exchange_id,
                ExchangeStatus::Pending,
                ExchangeStatus::Cancelled,
                now,
            )
            .await?
        {
            return Err(EngineError::Conflict);
        }
        exchange.status = ExchangeStatus::Cancelled;
        exchange.updated_at = now;

        let reason = format_compact!("Refund for declined exchange: {}", exchange.skill_label);
        self.resolve_escrow(&exchange, exchange.requester_id, reason)
            .await?;

        let provider_name = self.display_name_of(msg.actor_id).await;
        self.notifier
            .notify(
                exchange.requester_id,
                NotificationKind::ExchangeDeclined,
                json!({
                    "exchange_id": exchange.exchange_id,
                    "provider_name": provider_name.as_str(),
                    "skill": exchange.skill_label.as_str(),
                }),
            )
            .await;
        self.broadcast_status(msg.exchange_id, ExchangeStatus::Cancelled, msg.actor_id)
            .await;

        Ok(exchange)
    }
}

// ---------------------------------------------------------------------------
// Generic status change
// ---------------------------------------------------------------------------

/// Move an exchange along the transition table. Reaching `Completed`
/// settles the escrow to the provider; reaching `Cancelled` refunds the
/// requester.
#[derive(Debug, Clone)]
pub struct ChangeExchangeStatus {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
    pub target: ExchangeStatus,
}

impl Processor<ChangeExchangeStatus> for ExchangeEngine {
    type Output = Exchange;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:ChangeExchangeStatus")]
    async fn process(&self, msg: ChangeExchangeStatus) -> Result<Exchange, EngineError> {
        let _guard = self.locks.acquire(msg.exchange_id).await;

        let mut exchange = Self::load_checked(
            self.store.find_exchange(msg.exchange_id).await?,
            msg.actor_id,
        )?;
        if !exchange.status.can_transition_to(msg.target) {
            return Err(EngineError::InvalidTransition {
                from: exchange.status.into(),
                to: msg.target.into(),
            });
        }

        let now = time::OffsetDateTime::now_utc();
        let previous = exchange.status;
        if !self
            .store
            .update_status(msg.exchange_id, previous, msg.target, now)
            .await?
        {
            return Err(EngineError::Conflict);
        }
        exchange.status = msg.target;
        exchange.updated_at = now;

        // Escrow resolution happens only in the call that won the CAS
        // above, so it executes at most once per exchange.
        match msg.target {
            ExchangeStatus::Completed => {
                let reason =
                    format_compact!("Completed exchange: {}", exchange.skill_label);
                self.resolve_escrow(&exchange, exchange.provider_id, reason)
                    .await?;
            }
            ExchangeStatus::Cancelled => {
                let reason =
                    format_compact!("Refund for cancelled exchange: {}", exchange.skill_label);
                self.resolve_escrow(&exchange, exchange.requester_id, reason)
                    .await?;
            }
            _ => {}
        }

        let updated_by = self.display_name_of(msg.actor_id).await;
        self.notifier
            .notify(
                exchange.counterpart_of(msg.actor_id),
                NotificationKind::ExchangeStatusChange,
                json!({
                    "exchange_id": exchange.exchange_id,
                    "status": oskx_sdk::objects::ExchangeStatus::from(msg.target),
                    "updated_by": updated_by.as_str(),
                }),
            )
            .await;
        self.broadcast_status(msg.exchange_id, msg.target, msg.actor_id)
            .await;

        Ok(exchange)
    }
}

impl ExchangeEngine {
    /// Credit the escrowed `total_cost` to `beneficiary` and notify them.
    ///
    /// Called exactly once per exchange, by the transition that reached a
    /// terminal status. A storage failure here leaves the escrow
    /// unresolved with the exchange already terminal; that is surfaced
    /// loudly for operator reconciliation instead of retried blindly.
    async fn resolve_escrow(
        &self,
        exchange: &Exchange,
        beneficiary: Uuid,
        reason: CompactString,
    ) -> Result<(), EngineError> {
        if let Err(e) = self
            .ledger
            .credit(
                beneficiary,
                exchange.total_cost,
                reason.clone(),
                Some(exchange.exchange_id),
            )
            .await
        {
            tracing::error!(
                error = %e,
                exchange_id = %exchange.exchange_id,
                %beneficiary,
                "escrow resolution failed after terminal transition"
            );
            return Err(e);
        }
        self.notifier
            .notify(
                beneficiary,
                NotificationKind::PointsAwarded,
                json!({
                    "amount": exchange.total_cost,
                    "reason": reason.as_str(),
                    "exchange_id": exchange.exchange_id,
                }),
            )
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// An exchange with its conversation and ratings, party-scoped.
#[derive(Debug, Clone)]
pub struct ExchangeDetail {
    pub exchange: Exchange,
    pub messages: Vec<Message>,
    pub ratings: Vec<Rating>,
}

/// Fetch one exchange with messages and ratings.
#[derive(Debug, Clone)]
pub struct GetExchangeDetail {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
}

impl Processor<GetExchangeDetail> for ExchangeEngine {
    type Output = ExchangeDetail;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:GetExchangeDetail")]
    async fn process(&self, msg: GetExchangeDetail) -> Result<ExchangeDetail, EngineError> {
        let exchange = Self::load_checked(
            self.store.find_exchange(msg.exchange_id).await?,
            msg.actor_id,
        )?;
        let messages = self.store.messages_of(msg.exchange_id).await?;
        let ratings = self
            .store
            .rating_for_exchange(msg.exchange_id)
            .await?
            .into_iter()
            .collect();
        Ok(ExchangeDetail {
            exchange,
            messages,
            ratings,
        })
    }
}

/// Every exchange the actor is a party to, newest first.
#[derive(Debug, Clone)]
pub struct ListExchangesFor {
    pub actor_id: Uuid,
}

impl Processor<ListExchangesFor> for ExchangeEngine {
    type Output = Vec<Exchange>;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:ListExchangesFor")]
    async fn process(&self, msg: ListExchangesFor) -> Result<Vec<Exchange>, EngineError> {
        Ok(self.store.list_exchanges_for(msg.actor_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Persist a chat message, then broadcast the durable copy to the
/// exchange room (sender included).
#[derive(Debug, Clone)]
pub struct SendExchangeMessage {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
}

impl Processor<SendExchangeMessage> for ExchangeEngine {
    type Output = Message;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:SendExchangeMessage")]
    async fn process(&self, msg: SendExchangeMessage) -> Result<Message, EngineError> {
        let exchange = Self::load_checked(
            self.store.find_exchange(msg.exchange_id).await?,
            msg.actor_id,
        )?;
        if msg.content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }

        // Conversation is allowed in any status, including terminal ones.
        let message = Message::new(
            exchange.exchange_id,
            msg.actor_id,
            msg.content,
            msg.kind,
        );
        self.store.append_message(&message).await?;
        self.relay
            .publish(
                Topic::Exchange(exchange.exchange_id),
                RelayEvent::MessageReceived {
                    message: message.clone(),
                },
            )
            .await;
        Ok(message)
    }
}
