pub mod client;
pub mod data;
pub mod error;
pub mod extract;
pub mod languages;
pub mod logging;
pub mod providers;
pub mod reencode;
pub mod server;
pub mod settings;
pub mod store;
pub mod translations;
mod translator;
pub mod ui;

#[cfg(test)]
mod test_util;

pub use error::{ExtractError, PersistenceError, TranslationError, UploadError};
pub use languages::TargetLanguage;
pub use providers::{OpenAICompatible, Provider, ProviderUsage};
pub use translations::TranslateOptions;
pub use translator::{ExecutionOutput, Translator};
