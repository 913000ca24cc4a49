//! Process-lifetime state shared across scheduling cycles.
//!
//! Every structure sits behind its own lock so concurrent season tasks
//! serialize their writes per structure.

mod ignore;
mod retry;
mod session;

pub use ignore::IgnoreService;
pub use retry::{RetryTracker, RetryTransition};
pub use session::{SessionSnapshot, SessionState};
