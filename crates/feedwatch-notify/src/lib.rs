//! Outbound adapters: AI summarization and Telegram delivery.

pub mod openai;
pub mod telegram;

pub use openai::OpenAiSummarizer;
pub use telegram::TelegramNotifier;
