/// Update routing and the dispatch boundary
pub mod dispatch;
/// Free-text flood protection
pub mod guard;
/// Command, callback and question handlers
pub mod handlers;
/// Reply delivery with retries
pub mod resilient;
/// Menu state and dialogue management
pub mod state;
/// Texts, keyboards and formatters
pub mod views;

pub use guard::{MessageGuard, RateLimiter};
pub use handlers::{BotContext, Command};
pub use state::{Menu, MenuDialogue, MenuStorage};
