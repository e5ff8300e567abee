use super::event::AuthEvent;
use super::state::SessionState;

/// Compute the next state. Pure: no I/O, no clock.
///
/// `LoginSuccess` and `Logout` replace the state wholesale; the other two
/// events adjust one field of the existing state.
pub fn on_auth_event(state: &SessionState, event: AuthEvent) -> SessionState {
    match event {
        AuthEvent::LoginSuccess {
            identity,
            role,
            setup_status,
        } => SessionState::authenticated(identity, role, setup_status),
        AuthEvent::Logout => SessionState::empty(),
        AuthEvent::ProfileCompleted => state.with_setup_complete(),
        AuthEvent::SubscriptionExpired { renewal_url } => {
            state.with_subscription_expired(renewal_url)
        }
    }
}
