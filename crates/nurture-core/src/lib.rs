// nurture-core: Session resolution, view routing and tool services between nurture-api and the CLI.

pub mod admin;
pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod resolver;
pub mod router;
pub mod session;
pub mod stream;
pub mod supabase;
pub mod tools;

// ── Primary re-exports ──────────────────────────────────────────────
pub use admin::{AdminBackend, AdminService};
pub use backend::{AuthenticatedIdentity, IdentityBackend, MemorySessionStore, SessionStore};
pub use config::{AiAccess, ServiceConfig, TlsVerification};
pub use error::{AuthError, CoreError};
pub use resolver::SessionResolver;
pub use router::{Screen, route};
pub use session::{AuthEvent, Navigation, SessionState, SubscriptionExpired};
pub use stream::SessionStream;
pub use supabase::SupabaseBackend;
pub use tools::{CompletionService, ToolRun, ToolService, ToolStore};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Session
    Identity, PersistedIdentity, Profile, Role, SetupStatus, UserId,
    // Family profile
    Address, ChildDetails, FamilyProfile, SpouseDetails,
    // Tools
    DailyPlan, EmotionCheckIn, HistoryEntry, MealPlan, MealPlanRequest, PlannerRequest, Recipe,
    RecipeRequest, ToolKind,
    // Admin
    CreatedUser, SubscriptionStatus, UsageStats, UserSummary,
};
