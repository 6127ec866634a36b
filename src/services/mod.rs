pub mod confirmation;
pub mod context;
pub mod extractor;
pub mod fetcher;
pub mod pause;

pub use confirmation::{prompt_channel, ChannelPrompt, ConfirmationGate, ConsolePrompt, PromptReceiver, PromptRequest};
pub use context::WorkflowContext;
pub use extractor::DownloadExtractor;
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use pause::PauseController;
