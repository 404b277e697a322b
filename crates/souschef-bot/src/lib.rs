//! SousChef bot — per-user conversation state and the dialogue turn handler.

pub mod session;
pub mod souschef;

pub use session::{start_sweeper, Session, SessionHandle, SessionStore};
pub use souschef::{SousChef, DISPLAY_LIMIT};
