pub mod log;
pub mod telegram;

pub use log::LogPublisher;
pub use telegram::TelegramPublisher;
