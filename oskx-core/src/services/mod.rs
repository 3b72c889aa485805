pub mod exchange;
pub mod ledger;
pub mod notify;
pub mod rating;

pub use exchange::{
    AcceptExchange, ChangeExchangeStatus, CreateExchange, DeclineExchange, ExchangeDetail,
    ExchangeEngine, GetExchangeDetail, ListExchangesFor, SendExchangeMessage,
};
pub use ledger::Ledger;
pub use notify::{
    DeleteNotification, ListNotifications, MarkAllNotificationsRead, MarkNotificationRead,
    Notifier, UnreadNotificationCount,
};
pub use rating::RateExchange;
