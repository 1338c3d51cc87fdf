pub mod file_tailer;
pub mod webhook_sink;

pub use file_tailer::LogTailer;
pub use webhook_sink::WebhookSink;
