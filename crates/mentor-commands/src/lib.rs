//! Global command interceptor consulted once per turn before the stack runs.
//!
//! Classification is a pure function over text against a fixed vocabulary;
//! the caller decides what a recognized command does to the stack.

mod command_vocabulary;

pub use command_vocabulary::{CommandVocabulary, ConversationCommand};
