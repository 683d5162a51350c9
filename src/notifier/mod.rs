mod dispatcher;
pub mod format;
mod telegram;

pub use dispatcher::{Channel, DeliveryError, DeliveryReport, Dispatcher, RetryPolicy};
pub use telegram::TelegramChannel;
