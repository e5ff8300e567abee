// ── Hosted backend adapter ──
//
// Implements the core seams against the hosted backend through
// `nurture_api::BackendClient`. Native record shapes are normalized in
// `crate::convert` before anything leaves this module.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use nurture_api::GenerativeClient;
use nurture_api::backend::{
    AdminStatsRecord, AppUserRecord, BackendClient, EmotionLogRecord, JsonRunRecord, Order,
    PlannerRunRecord, Select, SubscriptionStatusRecord, UserProfileRecord,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::admin::AdminBackend;
use crate::backend::{AuthenticatedIdentity, IdentityBackend};
use crate::config::{AiAccess, ServiceConfig};
use crate::convert::{json_run_entry, profile_record};
use crate::error::{AuthError, CoreError};
use crate::model::{
    CreatedUser, FamilyProfile, HistoryEntry, Identity, PersistedIdentity, Profile, Role,
    SubscriptionStatus, ToolKind, UsageStats, UserId, UserSummary,
};
use crate::tools::{CompletionService, ToolRun, ToolStore};

/// Lifetime of an administrator-created account.
const CREATED_ACCOUNT_DAYS: i64 = 365;

const APP_USERS: &str = "app_users";
const USER_PROFILES: &str = "user_profiles";

/// The hosted backend behind every core seam.
pub struct SupabaseBackend {
    client: Arc<BackendClient>,
    config: ServiceConfig,
}

impl SupabaseBackend {
    pub fn new(config: ServiceConfig) -> Result<Self, CoreError> {
        let client = BackendClient::new(
            config.backend_url.as_str(),
            &config.anon_key,
            &config.transport(),
        )?;
        Ok(Self::with_client(client, config))
    }

    /// Wrap an existing client (tests point one at a mock server).
    pub fn with_client(client: BackendClient, config: ServiceConfig) -> Self {
        Self {
            client: Arc::new(client),
            config,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// The completion service `config.ai` describes, if any.
    pub fn completion_service(&self) -> Result<Option<Arc<dyn CompletionService>>, CoreError> {
        let client = match &self.config.ai {
            AiAccess::Disabled => return Ok(None),
            AiAccess::Direct {
                api_key,
                model,
                base_url,
            } => GenerativeClient::direct(base_url, model, api_key, &self.config.transport())?,
            AiAccess::Proxy { function } => GenerativeClient::proxy(
                self.client.function_url(function)?,
                &self.config.anon_key,
                &self.config.transport(),
            )?,
        };
        debug!(model = client.model(), endpoint = %client.endpoint(), "completion service ready");
        let service: Arc<dyn CompletionService> = Arc::new(client);
        Ok(Some(service))
    }

    // ── Subscription ─────────────────────────────────────────────

    /// Status reported by `get_user_subscription_status`. No row means
    /// "nothing known", which counts as active.
    pub async fn subscription_status(&self, email: &str) -> Result<SubscriptionStatus, CoreError> {
        let rows: Vec<SubscriptionStatusRecord> = self
            .client
            .rpc("get_user_subscription_status", &json!({ "user_email": email }))
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map_or_else(SubscriptionStatus::unknown, SubscriptionStatus::from))
    }

    pub async fn renewal_url(&self) -> Result<Option<String>, CoreError> {
        let url: Option<String> = self.client.rpc("get_renewal_url", &json!({})).await?;
        Ok(url.filter(|u| !u.trim().is_empty()))
    }

    // ── Lookups ──────────────────────────────────────────────────

    /// `app_users` first, then `user_profiles`, both keyed on `column`.
    async fn find_profile(&self, column: &str, value: &str) -> Result<Option<Profile>, CoreError> {
        let account: Option<AppUserRecord> = Select::new(APP_USERS)
            .eq(column, value)
            .fetch_one(&self.client)
            .await?;
        if let Some(account) = account {
            return Ok(Some(account.into()));
        }

        let details: Option<UserProfileRecord> = Select::new(USER_PROFILES)
            .eq(column, value)
            .fetch_one(&self.client)
            .await?;
        Ok(details.map(Profile::from))
    }

    async fn find_account(&self, email: &str) -> Result<Option<AppUserRecord>, CoreError> {
        Ok(Select::new(APP_USERS)
            .eq("email", email)
            .fetch_one(&self.client)
            .await?)
    }
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::Internal(format!("serialize run: {e}")))
}

// ── IdentityBackend ──────────────────────────────────────────────

#[async_trait]
impl IdentityBackend for SupabaseBackend {
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let session = self.client.sign_in_with_password(email, password).await?;
        let email = session
            .user
            .email
            .clone()
            .unwrap_or_else(|| email.trim().to_lowercase());

        match self.subscription_status(&email).await {
            Ok(status) if status.is_expired() => {
                let renewal_url = self.renewal_url().await.unwrap_or_else(|e| {
                    warn!(error = %e, "could not fetch renewal URL");
                    None
                });
                if let Err(e) = self.client.sign_out().await {
                    warn!(error = %e, "sign-out after expired subscription failed");
                }
                return Err(AuthError::SubscriptionExpired { renewal_url });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "subscription check failed; allowing sign-in"),
        }

        Ok(AuthenticatedIdentity {
            identity: Identity::new(session.user.id.clone(), email),
            display_name: session.user.metadata_full_name().map(str::to_owned),
            access_token: Some(session.access_token),
            refresh_token: session.refresh_token,
        })
    }

    async fn lookup_profile_by_identity(&self, id: &UserId) -> Result<Option<Profile>, CoreError> {
        self.find_profile("auth_user_id", id.as_str()).await
    }

    async fn lookup_profile_by_email(&self, email: &str) -> Result<Option<Profile>, CoreError> {
        self.find_profile("email", email).await
    }

    async fn complete_profile(
        &self,
        identity: &Identity,
        profile: &FamilyProfile,
    ) -> Result<(), CoreError> {
        let row = profile_record(identity, profile);
        let _: Option<Value> = self
            .client
            .upsert(USER_PROFILES, "auth_user_id", &row)
            .await?;

        self.client
            .update_eq(
                APP_USERS,
                "auth_user_id",
                identity.id.as_str(),
                &json!({
                    "name": profile.full_name.trim(),
                    "updated_at": Utc::now(),
                }),
            )
            .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        Ok(self.client.sign_out().await?)
    }

    fn restore_session(&self, persisted: &PersistedIdentity) {
        self.client
            .set_session_token(persisted.access_token.clone().map(SecretString::from));
    }

    async fn refresh_session(
        &self,
        persisted: &PersistedIdentity,
    ) -> Result<PersistedIdentity, CoreError> {
        let Some(refresh_token) = persisted.refresh_token.clone() else {
            return Err(CoreError::SessionExpired);
        };
        let session = self
            .client
            .refresh_session(&SecretString::from(refresh_token))
            .await?;
        Ok(PersistedIdentity {
            access_token: Some(session.access_token.expose_secret().to_owned()),
            refresh_token: session
                .refresh_token
                .map(|t| t.expose_secret().to_owned())
                .or_else(|| persisted.refresh_token.clone()),
            ..persisted.clone()
        })
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), CoreError> {
        let redirect = self.config.password_reset_redirect();
        Ok(self
            .client
            .request_password_reset(email, redirect.as_ref())
            .await?)
    }

    async fn complete_password_reset(
        &self,
        recovery_token: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .update_password(recovery_token, new_password)
            .await?)
    }
}

// ── ToolStore ────────────────────────────────────────────────────

#[async_trait]
impl ToolStore for SupabaseBackend {
    async fn record_run(&self, user: &UserId, run: &ToolRun) -> Result<(), CoreError> {
        let user_id = user.to_string();
        let table = run.kind().table();
        let row = match run {
            ToolRun::Planner {
                request,
                prompt,
                plan,
            } => to_json(&PlannerRunRecord {
                user_id,
                requested_routine: request.focus_areas.clone(),
                parenting_tip_of_the_day: plan
                    .get("parenting_tip")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                prompt: prompt.clone(),
                result: plan.clone(),
                start_time: request.start_time.clone(),
                end_time: request.end_time.clone(),
                language: request.language.clone(),
                requested_text: request.notes.clone(),
                ..PlannerRunRecord::default()
            })?,
            ToolRun::MealPlan { request, plan } => to_json(&JsonRunRecord {
                user_id,
                prompt: to_json(request)?,
                result: plan.clone(),
                ..JsonRunRecord::default()
            })?,
            ToolRun::Recipe { request, recipe } => to_json(&JsonRunRecord {
                user_id,
                prompt: to_json(request)?,
                result: recipe.clone(),
                ..JsonRunRecord::default()
            })?,
            ToolRun::Emotion {
                check_in,
                prompt,
                reply,
            } => to_json(&EmotionLogRecord {
                user_id,
                mood: check_in.mood.clone(),
                prompt: Some(prompt.clone()),
                result: reply.clone(),
                context: Some(json!({
                    "note": check_in.note,
                    "language": check_in.language,
                })),
                ..EmotionLogRecord::default()
            })?,
        };

        let _: Option<Value> = self.client.insert(table, &row).await?;
        Ok(())
    }

    async fn history(
        &self,
        user: &UserId,
        tool: ToolKind,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, CoreError> {
        let query = Select::new(tool.table())
            .eq("user_id", user)
            .order("created_at", Order::Descending)
            .limit(limit);

        let entries = match tool {
            ToolKind::Planner => query
                .fetch::<PlannerRunRecord>(&self.client)
                .await?
                .into_iter()
                .map(HistoryEntry::from)
                .collect(),
            ToolKind::Emotion => query
                .fetch::<EmotionLogRecord>(&self.client)
                .await?
                .into_iter()
                .map(HistoryEntry::from)
                .collect(),
            ToolKind::MealPlan | ToolKind::Recipe => query
                .fetch::<JsonRunRecord>(&self.client)
                .await?
                .into_iter()
                .map(|r| json_run_entry(tool, r))
                .collect(),
        };
        Ok(entries)
    }
}

// ── AdminBackend ─────────────────────────────────────────────────

#[async_trait]
impl AdminBackend for SupabaseBackend {
    /// The `admin_dashboard_stats` view, falling back to the
    /// `get_admin_statistics` function when the view is unavailable.
    async fn usage_stats(&self) -> Result<UsageStats, CoreError> {
        let from_view: Result<Option<AdminStatsRecord>, _> = Select::new("admin_dashboard_stats")
            .fetch_one(&self.client)
            .await;
        match from_view {
            Ok(Some(row)) => return Ok(row.into()),
            Ok(None) => debug!("stats view is empty; using the statistics function"),
            Err(e) => warn!(error = %e, "stats view unavailable; using the statistics function"),
        }

        let raw: Value = self.client.rpc("get_admin_statistics", &json!({})).await?;
        let row = match raw {
            Value::Array(rows) => rows.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        if row.is_null() {
            return Ok(UsageStats::default());
        }
        let record: AdminStatsRecord = serde_json::from_value(row)
            .map_err(|e| CoreError::Internal(format!("unexpected statistics shape: {e}")))?;
        Ok(record.into())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, CoreError> {
        let rows: Vec<AppUserRecord> = Select::new(APP_USERS)
            .order("created_at", Order::Descending)
            .fetch(&self.client)
            .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<CreatedUser, CoreError> {
        if self.find_account(email).await?.is_some() {
            return Err(CoreError::Rejected {
                message: format!("an account for {email} already exists"),
            });
        }

        let name = local_part(email);
        let user = self.client.sign_up(email, password, Some(name)).await?;
        let expiry = Utc::now() + Duration::days(CREATED_ACCOUNT_DAYS);

        let _: Option<Value> = self
            .client
            .insert(
                APP_USERS,
                &json!({
                    "auth_user_id": user.id,
                    "email": email,
                    "name": name,
                    "role": role,
                    "status": "active",
                    "subscription_renewed": true,
                    "subscription_expiry": expiry,
                }),
            )
            .await?;

        Ok(CreatedUser {
            id: user.id,
            email: user.email.unwrap_or_else(|| email.to_owned()),
            role,
            subscription_expiry: expiry,
        })
    }

    async fn promote_user(&self, email: &str) -> Result<(), CoreError> {
        let account = self
            .find_account(email)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "user".into(),
                identifier: email.to_owned(),
            })?;
        if Role::from_stored(account.role.as_deref()) == Some(Role::Admin) {
            return Err(CoreError::Rejected {
                message: format!("{email} is already an admin"),
            });
        }

        self.client
            .update_eq(
                APP_USERS,
                "email",
                email,
                &json!({ "role": Role::Admin, "updated_at": Utc::now() }),
            )
            .await?;
        Ok(())
    }

    async fn subscription_status(&self, email: &str) -> Result<SubscriptionStatus, CoreError> {
        SupabaseBackend::subscription_status(self, email).await
    }

    async fn renewal_url(&self) -> Result<Option<String>, CoreError> {
        SupabaseBackend::renewal_url(self).await
    }

    async fn set_renewal_url(&self, url: &str) -> Result<(), CoreError> {
        Ok(self
            .client
            .rpc_void("update_renewal_url", &json!({ "new_url": url }))
            .await?)
    }

    async fn renew_subscription(&self, email: &str) -> Result<(), CoreError> {
        Ok(self
            .client
            .rpc_void("renew_user_subscription", &json!({ "user_email": email }))
            .await?)
    }

    async fn refresh_subscription_statuses(&self) -> Result<(), CoreError> {
        Ok(self
            .client
            .rpc_void("refresh_all_subscription_statuses", &json!({}))
            .await?)
    }

    async fn expiring_soon(&self, days: u32) -> Result<Vec<UserSummary>, CoreError> {
        let rows: Vec<AppUserRecord> = self
            .client
            .rpc("get_users_expiring_soon", &json!({ "days_threshold": days }))
            .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }
}
