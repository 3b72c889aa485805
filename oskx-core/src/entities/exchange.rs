use crate::error::EngineError;
use compact_str::CompactString;
use oskx_sdk::objects::ExchangeStatus as SdkExchangeStatus;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Lifecycle status of an exchange.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `oskx_sdk::objects::ExchangeStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "exchange_status")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    /// The allowed-transition table.
    ///
    /// `Pending → {Accepted, Cancelled}`,
    /// `Accepted → {InProgress, Cancelled}`,
    /// `InProgress → {Completed, Cancelled}`.
    /// `Completed` and `Cancelled` absorb.
    pub fn can_transition_to(self, target: ExchangeStatus) -> bool {
        use ExchangeStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted)
                | (Pending, Cancelled)
                | (Accepted, InProgress)
                | (Accepted, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeStatus::Completed | ExchangeStatus::Cancelled)
    }
}

impl From<ExchangeStatus> for SdkExchangeStatus {
    fn from(value: ExchangeStatus) -> Self {
        match value {
            ExchangeStatus::Pending => SdkExchangeStatus::Pending,
            ExchangeStatus::Accepted => SdkExchangeStatus::Accepted,
            ExchangeStatus::InProgress => SdkExchangeStatus::InProgress,
            ExchangeStatus::Completed => SdkExchangeStatus::Completed,
            ExchangeStatus::Cancelled => SdkExchangeStatus::Cancelled,
        }
    }
}

impl From<SdkExchangeStatus> for ExchangeStatus {
    fn from(value: SdkExchangeStatus) -> Self {
        match value {
            SdkExchangeStatus::Pending => ExchangeStatus::Pending,
            SdkExchangeStatus::Accepted => ExchangeStatus::Accepted,
            SdkExchangeStatus::InProgress => ExchangeStatus::InProgress,
            SdkExchangeStatus::Completed => ExchangeStatus::Completed,
            SdkExchangeStatus::Cancelled => ExchangeStatus::Cancelled,
        }
    }
}

/// The immutable terms of an exchange, fixed at creation.
#[derive(Debug, Clone)]
pub struct ExchangeTerms {
    pub skill_id: Uuid,
    pub skill_label: CompactString,
    pub skill_level: Option<CompactString>,
    pub description: Option<String>,
    pub session_type: Option<CompactString>,
    pub hourly_rate: Decimal,
    pub duration_hours: Decimal,
    pub scheduled_date: Option<time::OffsetDateTime>,
    pub is_mutual_exchange: bool,
}

impl ExchangeTerms {
    /// Validate the terms before any mutation.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.skill_label.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "skill label must not be empty".to_owned(),
            ));
        }
        if self.hourly_rate < Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "hourly rate must not be negative".to_owned(),
            ));
        }
        if self.duration_hours <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "duration must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// `hourly_rate * duration_hours`, the amount escrowed at creation.
    pub fn total_cost(&self) -> Decimal {
        self.hourly_rate * self.duration_hours
    }
}

/// The exchange aggregate.
///
/// Parties and terms are immutable after creation; `status` and
/// `updated_at` change only through the state machine.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Exchange {
    pub exchange_id: Uuid,
    pub requester_id: Uuid,
    pub provider_id: Uuid,
    pub skill_id: Uuid,
    pub skill_label: CompactString,
    pub skill_level: Option<CompactString>,
    pub description: Option<String>,
    pub session_type: Option<CompactString>,
    pub hourly_rate: Decimal,
    pub duration_hours: Decimal,
    pub total_cost: Decimal,
    pub scheduled_date: Option<time::OffsetDateTime>,
    pub is_mutual_exchange: bool,
    pub status: ExchangeStatus,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

impl Exchange {
    /// Build a fresh `Pending` exchange from validated terms.
    pub fn new(requester_id: Uuid, provider_id: Uuid, terms: ExchangeTerms) -> Self {
        let now = time::OffsetDateTime::now_utc();
        Self {
            exchange_id: Uuid::now_v7(),
            requester_id,
            provider_id,
            skill_id: terms.skill_id,
            total_cost: terms.total_cost(),
            skill_label: terms.skill_label,
            skill_level: terms.skill_level,
            description: terms.description,
            session_type: terms.session_type,
            hourly_rate: terms.hourly_rate,
            duration_hours: terms.duration_hours,
            scheduled_date: terms.scheduled_date,
            is_mutual_exchange: terms.is_mutual_exchange,
            status: ExchangeStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.provider_id == user_id
    }

    /// The party that is not `user_id`. Callers must have checked
    /// `is_party` first.
    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.provider_id
        } else {
            self.requester_id
        }
    }
}
