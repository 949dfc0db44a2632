mod active_view;
mod chat;
mod id_clock;
mod orchestrator;
mod session_store;

pub use active_view::*;
pub use chat::*;
pub use id_clock::*;
pub use orchestrator::*;
pub use session_store::*;
