pub mod exchange;
pub mod message;
pub mod notification;
pub mod rating;
pub mod transaction;
pub mod user;

pub use exchange::{Exchange, ExchangeStatus, ExchangeTerms};
pub use message::{Message, MessageKind};
pub use notification::{Notification, NotificationKind};
pub use rating::Rating;
pub use transaction::{TransactionKind, TransactionRecord};
pub use user::UserRecord;
