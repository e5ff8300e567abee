//! Command dispatch: bootstraps the session, then hands off to the handler.

pub mod admin;
pub mod config_cmd;
pub mod profile;
pub mod session;
pub mod tools;
pub mod util;

use std::sync::Arc;

use tracing::warn;

use nurture_core::{
    AdminService, Navigation, ServiceConfig, SessionResolver, SessionState, SupabaseBackend,
    ToolService,
};

use crate::cli::{Command, GlobalOpts, PasswordArgs, PasswordCommand};
use crate::config::FileSessionStore;
use crate::error::{CliError, renewal_hint};
use crate::output::Painter;

/// Everything a handler needs: the started resolver and the adapter
/// behind it.
pub struct Context {
    pub profile_name: String,
    pub backend: Arc<SupabaseBackend>,
    pub resolver: SessionResolver,
    pub painter: Painter,
}

impl Context {
    async fn open(
        profile_name: String,
        service: ServiceConfig,
        navigation: &Navigation,
        global: &GlobalOpts,
    ) -> Result<Self, CliError> {
        let backend = Arc::new(SupabaseBackend::new(service)?);
        let store = Arc::new(FileSessionStore::at_default_path());
        let resolver = SessionResolver::new(backend.clone(), store);
        resolver.start(navigation).await;

        Ok(Self {
            profile_name,
            backend,
            resolver,
            painter: Painter::new(&global.color),
        })
    }

    pub fn snapshot(&self) -> SessionState {
        self.resolver.snapshot()
    }

    /// Tool service for the signed-in user, if AI access is configured.
    pub fn tools(&self) -> Result<ToolService, CliError> {
        let completion =
            self.backend
                .completion_service()?
                .ok_or_else(|| CliError::AiNotConfigured {
                    profile: self.profile_name.clone(),
                })?;
        Ok(ToolService::new(completion, self.backend.clone()))
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(self.backend.clone())
    }

    /// Re-check the signed-in user's subscription. A lapsed one is
    /// reported to the resolver, which signs the session out.
    ///
    /// Admins are never checked; a failed check lets the command run.
    pub async fn subscription_lapsed(&self) -> Result<bool, CliError> {
        let state = self.snapshot();
        let Some(identity) = state.identity() else {
            return Ok(false);
        };
        if state.role().is_admin() {
            return Ok(false);
        }
        match self.backend.subscription_status(&identity.email).await {
            Ok(status) if status.is_expired() => {
                let renewal_url = self.backend.renewal_url().await.unwrap_or_else(|e| {
                    warn!(error = %e, "could not fetch renewal URL");
                    None
                });
                self.resolver.report_subscription_expired(renewal_url).await?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) => {
                warn!(error = %e, "subscription check failed; continuing");
                Ok(false)
            }
        }
    }

    /// Fail with the renewal hint if the subscription has lapsed.
    pub async fn require_active_subscription(&self) -> Result<(), CliError> {
        if !self.subscription_lapsed().await? {
            return Ok(());
        }
        let state = self.snapshot();
        let renewal_url = state
            .subscription_expired()
            .and_then(|e| e.renewal_url.as_deref());
        Err(CliError::SubscriptionExpired {
            renewal: renewal_hint(renewal_url),
        })
    }
}

/// Where this invocation enters the app. Deep links only come from
/// `open` and `password reset --link`.
fn navigation_for(cmd: &Command) -> Navigation {
    match cmd {
        Command::Open { link }
        | Command::Password(PasswordArgs {
            command: PasswordCommand::Reset {
                link: Some(link), ..
            },
        }) => Navigation::parse(link),
        _ => Navigation::none(),
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    profile_name: String,
    service: ServiceConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let navigation = navigation_for(&cmd);
    let ctx = Context::open(profile_name, service, &navigation, global).await?;

    let result = match cmd {
        Command::Login(args) => session::login(&ctx, args, global).await,
        Command::Logout => session::logout(&ctx, global).await,
        Command::Status(args) => session::status(&ctx, &args, global).await,
        Command::Open { .. } => session::open(&ctx, &navigation, global).await,
        Command::Password(args) => session::password(&ctx, args, &navigation, global).await,
        Command::Profile(args) => profile::handle(&ctx, args, global).await,
        Command::Plan(args) => tools::plan(&ctx, args, global).await,
        Command::Meal(args) => tools::meal(&ctx, args, global).await,
        Command::Checkin(args) => tools::checkin(&ctx, args, global).await,
        Command::History(args) => tools::history(&ctx, &args, global).await,
        Command::Admin(args) => admin::handle(&ctx, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not need a session".into(),
        }),
    };

    ctx.resolver.shutdown().await;
    result
}
