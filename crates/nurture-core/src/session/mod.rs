// ── Session state machine ──
//
// State, events, the pure reducer, the setup heuristic and navigation
// parsing. The resolver in `crate::resolver` drives these.

pub mod event;
pub mod navigation;
pub mod reducer;
pub mod setup;
pub mod state;

pub use event::AuthEvent;
pub use navigation::Navigation;
pub use reducer::on_auth_event;
pub use state::{SessionState, SubscriptionExpired};
