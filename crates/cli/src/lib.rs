//! # Meeting Agent
//!
//! Chat front end for the meeting catalog.
//!
//! ```text
//! stdin line ──> Classifier (rules | llm) ──> CommandRequest
//!                                                │
//!                     CommandHandler ──> schedule / cancel / query
//!                                                │
//!                          Catalog (record store + semantic index)
//!                                                │
//! stdout <── "Agent: ..." <── CommandResponse ───┘
//! ```

pub mod app;
pub mod classifier;
pub mod command;
pub mod config;
pub mod history;
pub mod notifier;
pub mod session;

pub use app::AppContext;
pub use config::AgentConfig;
pub use history::ConversationHistory;
pub use session::run_session;
