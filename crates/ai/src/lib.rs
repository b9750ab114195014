//! `autocat-ai`
//!
//! **Responsibility:** natural-language category guessing.
//!
//! This crate is a collaborator boundary, not part of the job core:
//! - It never touches job state or the ledger.
//! - It turns `(categories, counterparty, description)` into a [`Classification`].
//! - "Could not classify" is a valid outcome (`category == None`), not an error.

pub mod classifier;
pub mod openai;
pub mod prompt;
pub mod result;

pub use classifier::Classifier;
pub use openai::{OpenAiClassifier, OpenAiConfig};
pub use prompt::{MatchMode, PromptLocale, PromptTemplate};
pub use result::{AiError, Classification};
