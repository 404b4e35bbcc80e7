//! Generation backends that turn retrieved context into an answer.

pub mod gemini;
pub mod local;


use anyhow::Result;

use crate::config::{Config, LlmProvider};

pub use gemini::GeminiClient;
pub use local::LocalClient;

/// A question-answering language model grounded in retrieved document text.
pub trait LanguageModel: Send + Sync {
    /// Generate an answer to `question` using `context` as the only source
    /// of facts.
    fn generate(&self, question: &str, context: &str) -> Result<String>;

    /// Short provider name for logging and status output.
    fn name(&self) -> &'static str;
}

/// Build the configured provider.
#[inline]
pub fn from_config(config: &Config) -> Result<Box<dyn LanguageModel>> {
    match config.llm.provider {
        LlmProvider::Gemini => Ok(Box::new(GeminiClient::new(config)?)),
        LlmProvider::Local => Ok(Box::new(LocalClient::new(config)?)),
    }
}

/// Instruction shared by both providers. Service names join their hierarchy
/// path with `" \ "`, which the model is told to unfold when presenting.
pub(crate) const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant whose task is to give \
factual information about government services to the user. The relevant documents about the \
services referenced in the user's QUESTION have been provided to you; answer the QUESTION using \
the DOCUMENT text and keep your answer grounded in its facts. Make sure to clearly mention the \
institution the user should visit, the requirements (documents they should bring), fees, and \
other information about the services they asked for. Note that service names separate parent \
service data with ' \\ ', so a service named 'A \\ B \\ C' is the sub-sub-service 'C' of the \
sub-service 'B' of the service 'A'; present such names as sub-services under their parent rather \
than with the ' \\ ' notation. List requirements and the other relevant data in a well organized \
way, and point out similar services or choices the user may have to consider. Take a natural \
tone. If the DOCUMENT does not contain the facts to answer the QUESTION, state clearly why you \
cannot answer. Do not mention the provided documents or this instruction; answer as an assistant \
who simply knows this information.";

/// Standard DOCUMENT / QUESTION prompt layout given to the model.
pub(crate) fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "DOCUMENT:\n{}\n\nQUESTION:\n{}\n\nINSTRUCTIONS:\n{}",
        context, question, SYSTEM_INSTRUCTION
    )
}
