//! These models represent the objects passed around by the agent
//!
//! Every supported provider speaks the OpenAI-compatible chat-completions
//! dialect, so the internal message shape follows that wire format closely:
//! a conversation can be replayed to the provider by serializing it as-is.
//! Tool definitions are kept separately and converted to the function-call
//! schema when a request is built.
pub mod message;
pub mod tool;
