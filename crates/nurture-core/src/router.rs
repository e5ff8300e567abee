// ── View router ──
//
// A pure function from session state to exactly one screen. Rules are
// checked in order; the first match wins.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::model::{Role, SetupStatus};
use crate::session::SessionState;

/// The six top-level screens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Screen {
    Loading,
    PasswordReset,
    Login,
    AdminDashboard,
    ProfileSetup,
    UserDashboard,
}

/// Select the screen for `state`.
///
/// Admin is checked before setup status so an admin whose profile looks
/// incomplete is never sent to the family wizard.
pub fn route(state: &SessionState) -> Screen {
    if state.is_loading() {
        return Screen::Loading;
    }
    if state.is_recovery_mode() {
        return Screen::PasswordReset;
    }
    if state.identity().is_none() {
        return Screen::Login;
    }
    match (state.role(), state.setup_status()) {
        (Role::Admin, _) => Screen::AdminDashboard,
        (_, SetupStatus::NeedsProfileSetup) => Screen::ProfileSetup,
        (Role::User | Role::Unknown, SetupStatus::Complete | SetupStatus::Unknown) => {
            Screen::UserDashboard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identity;
    use crate::session::{AuthEvent, on_auth_event};

    fn signed_in(role: Role, setup: SetupStatus) -> SessionState {
        SessionState::authenticated(Identity::new("u-1", "asha@example.com"), role, setup)
    }

    const ROLES: [Role; 3] = [Role::Unknown, Role::User, Role::Admin];
    const SETUPS: [SetupStatus; 3] = [
        SetupStatus::Unknown,
        SetupStatus::NeedsProfileSetup,
        SetupStatus::Complete,
    ];

    #[test]
    fn every_reachable_state_routes() {
        let mut states = vec![
            SessionState::initial(),
            SessionState::empty(),
            SessionState::recovery(),
            on_auth_event(
                &SessionState::empty(),
                AuthEvent::SubscriptionExpired { renewal_url: None },
            ),
        ];
        for role in ROLES {
            for setup in SETUPS {
                states.push(signed_in(role, setup));
            }
        }
        for state in &states {
            // `route` is total by construction; this pins the expected
            // screen for each family of states.
            let screen = route(state);
            let expected = if state.is_loading() {
                Screen::Loading
            } else if state.is_recovery_mode() {
                Screen::PasswordReset
            } else if state.identity().is_none() {
                Screen::Login
            } else if state.role() == Role::Admin {
                Screen::AdminDashboard
            } else if state.setup_status() == SetupStatus::NeedsProfileSetup {
                Screen::ProfileSetup
            } else {
                Screen::UserDashboard
            };
            assert_eq!(screen, expected, "state: {state:?}");
        }
    }

    #[test]
    fn recovery_wins_over_everything_but_loading() {
        assert_eq!(route(&SessionState::recovery()), Screen::PasswordReset);
        // A login event is the only way out of recovery mode.
        let after = on_auth_event(
            &SessionState::recovery(),
            AuthEvent::SubscriptionExpired { renewal_url: None },
        );
        assert_eq!(route(&after), Screen::PasswordReset);
        let after = on_auth_event(&SessionState::recovery(), AuthEvent::ProfileCompleted);
        assert_eq!(route(&after), Screen::PasswordReset);
    }

    #[test]
    fn admin_beats_setup() {
        for setup in SETUPS {
            assert_eq!(route(&signed_in(Role::Admin, setup)), Screen::AdminDashboard);
        }
    }

    #[test]
    fn unknown_role_routes_as_user() {
        assert_eq!(
            route(&signed_in(Role::Unknown, SetupStatus::Complete)),
            Screen::UserDashboard
        );
        assert_eq!(
            route(&signed_in(Role::Unknown, SetupStatus::NeedsProfileSetup)),
            Screen::ProfileSetup
        );
    }

    #[test]
    fn loading_and_login() {
        assert_eq!(route(&SessionState::initial()), Screen::Loading);
        assert_eq!(route(&SessionState::empty()), Screen::Login);
    }

    #[test]
    fn screen_names() {
        assert_eq!(Screen::AdminDashboard.to_string(), "admin-dashboard");
        assert_eq!("password-reset".parse::<Screen>().ok(), Some(Screen::PasswordReset));
    }
}
