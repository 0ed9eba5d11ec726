//! The Doppel response pipeline.
//!
//! Every inbound utterance goes through the same five stages:
//!
//! 1. **Identify** the visitor from self-introductions in recent turns
//! 2. **Screen** the utterance against the input guard
//! 3. **Retrieve** corpus chunks with TF-IDF
//! 4. **Generate** a reply through the configured provider
//! 5. **Screen** the reply against the output guard
//!
//! A refusal at step 2 or 5 replaces the reply with a fixed deflection. A
//! provider failure at step 4 becomes a retry message. See [`Pipeline`].

pub mod generator;
pub mod identity;
pub mod pipeline;
pub mod prompt;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use generator::{FIRST_TURN_FOLLOW_UP, Generator};
pub use identity::identify;
pub use pipeline::Pipeline;
pub use prompt::{ComposedPrompt, PromptInput, PromptMetadata, compose};
