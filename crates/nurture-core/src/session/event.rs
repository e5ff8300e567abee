use crate::model::{Identity, Role, SetupStatus};

/// Everything that may advance the session state machine.
///
/// Closed on purpose: the reducer matches exhaustively, so a new kind of
/// event cannot be added without deciding how it transforms state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoginSuccess {
        identity: Identity,
        role: Role,
        setup_status: SetupStatus,
    },
    Logout,
    ProfileCompleted,
    SubscriptionExpired {
        renewal_url: Option<String>,
    },
}
