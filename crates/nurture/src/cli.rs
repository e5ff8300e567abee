//! Clap derive structures for the `nurture` CLI.
//!
//! Defines the complete command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use nurture_core::{Role, ToolKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nurture -- parenting assistant from the command line
#[derive(Debug, Parser)]
#[command(
    name = "nurture",
    version,
    about = "Plan your child's day, cook for the family and check in on yourself",
    long_about = "Command-line client for the nurture parenting assistant.\n\n\
        Sign in once and the session is remembered; every command resolves\n\
        which screen you would land on (login, profile setup, dashboard)\n\
        and refuses what that screen does not allow.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "NURTURE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend project URL (overrides profile)
    #[arg(long, env = "NURTURE_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Backend anon key (overrides profile)
    #[arg(long, env = "NURTURE_ANON_KEY", global = true, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NURTURE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NURTURE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login(LoginArgs),

    /// Sign out and forget the saved session
    Logout,

    /// Show the current session and the screen it routes to
    #[command(alias = "whoami")]
    Status(StatusArgs),

    /// Resolve a deep link (e.g. a password-reset email link)
    Open {
        /// Full link or path, e.g. "https://app.example.com/reset-password#access_token=..."
        link: String,
    },

    /// Recover a forgotten password
    Password(PasswordArgs),

    /// Complete or view the family profile
    Profile(ProfileArgs),

    /// Generate a daily activity plan for your child
    Plan(PlanArgs),

    /// Meal plans and single recipes
    Meal(MealArgs),

    /// Share how you are feeling and get a supportive reply
    #[command(alias = "mood")]
    Checkin(CheckinArgs),

    /// List previous runs of a tool, newest first
    History(HistoryArgs),

    /// Administrator dashboard (admin role required)
    Admin(AdminArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (prompted if omitted)
    pub email: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Show the saved session as-is, without re-checking role and setup
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Debug, Args)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommand,
}

#[derive(Debug, Subcommand)]
pub enum PasswordCommand {
    /// Email a password-reset link
    Forgot {
        /// Account email
        email: String,
    },

    /// Set a new password using a reset link or its token
    Reset {
        /// The link from the reset email
        #[arg(long, conflicts_with = "token", required_unless_present = "token")]
        link: Option<String>,

        /// The recovery token alone
        #[arg(long, hide_env_values = true, env = "NURTURE_RECOVERY_TOKEN")]
        token: Option<String>,
    },
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Fill in the family profile (first-run setup)
    Setup {
        /// Read the profile from a JSON file instead of prompting
        #[arg(long, short = 'f')]
        from_file: Option<PathBuf>,
    },

    /// Show the stored profile facts for the signed-in account
    Show,
}

// ── Tools ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Child's name
    #[arg(long, short = 'c')]
    pub child: String,

    /// Child's age in years
    #[arg(long, short = 'a')]
    pub age: u32,

    /// Areas to focus on (e.g. "motor skills, reading")
    #[arg(long, short = 'f', default_value = "balanced development")]
    pub focus: String,

    /// Your name as the plan should address you
    #[arg(long)]
    pub parent: Option<String>,

    /// Day starts at (e.g. "07:00")
    #[arg(long)]
    pub start: Option<String>,

    /// Day ends at (e.g. "20:00")
    #[arg(long)]
    pub end: Option<String>,

    /// Extra instructions
    #[arg(long)]
    pub notes: Option<String>,

    /// Language of the reply
    #[arg(long, short = 'l', default_value = "English")]
    pub language: String,
}

#[derive(Debug, Args)]
pub struct MealArgs {
    #[command(subcommand)]
    pub command: MealCommand,
}

#[derive(Debug, Subcommand)]
pub enum MealCommand {
    /// One day of meals for baby and mother, with a shopping list
    Plan {
        /// Child's name
        #[arg(long, short = 'c')]
        child: String,

        /// Child's age in months
        #[arg(long, short = 'm')]
        months: u32,

        /// Mother's age in years
        #[arg(long)]
        mother_age: Option<u32>,

        /// Dietary preference (repeatable, e.g. --diet vegetarian --diet "no nuts")
        #[arg(long = "diet")]
        diets: Vec<String>,

        /// Extra instructions
        #[arg(long)]
        instructions: Option<String>,

        /// Language of the reply
        #[arg(long, short = 'l', default_value = "English")]
        language: String,
    },

    /// A detailed recipe for one dish
    Recipe {
        /// Dish name
        dish: String,

        /// Language of the reply
        #[arg(long, short = 'l', default_value = "English")]
        language: String,
    },
}

#[derive(Debug, Args)]
pub struct CheckinArgs {
    /// How you feel, in a word or two
    pub mood: String,

    /// Anything you want to add
    #[arg(long, short = 'n')]
    pub note: Option<String>,

    /// Language of the reply
    #[arg(long, short = 'l', default_value = "English")]
    pub language: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Which tool's runs to list
    pub tool: HistoryTool,

    /// Max entries to show
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HistoryTool {
    /// Daily activity plans
    Planner,
    /// Meal plans
    MealPlan,
    /// Single recipes
    Recipe,
    /// Emotion check-ins
    Emotion,
}

impl From<HistoryTool> for ToolKind {
    fn from(tool: HistoryTool) -> Self {
        match tool {
            HistoryTool::Planner => Self::Planner,
            HistoryTool::MealPlan => Self::MealPlan,
            HistoryTool::Recipe => Self::Recipe,
            HistoryTool::Emotion => Self::Emotion,
        }
    }
}

// ── Admin ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Usage statistics across all accounts
    Stats,

    /// List registered accounts
    #[command(alias = "ls")]
    Users,

    /// Create an account (password is prompted)
    CreateUser {
        /// Email of the new account
        email: String,

        /// Role to grant
        #[arg(long, default_value = "user")]
        role: RoleArg,
    },

    /// Grant the admin role to an existing account
    Promote {
        /// Account email
        email: String,
    },

    /// Show or change the subscription renewal link
    RenewalUrl {
        /// New URL (omit to show the current one)
        url: Option<String>,
    },

    /// Show one account's subscription status
    Subscription {
        /// Account email
        email: String,
    },

    /// Extend an account's subscription
    Renew {
        /// Account email
        email: String,
    },

    /// Accounts whose subscription ends soon
    Expiring {
        /// Window in days
        #[arg(long, short = 'd', default_value = "7")]
        days: u32,
    },

    /// Recompute every account's subscription status
    RefreshStatuses,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Self::User,
            RoleArg::Admin => Self::Admin,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config and session file locations
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a profile secret in the system keyring
    SetSecret {
        /// Which secret to store
        slot: SecretArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretArg {
    /// Backend anon key
    AnonKey,
    /// Generative-AI API key
    AiApiKey,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
