// crates/draftline-cli/src/main.rs
// ============================================================================
// Module: Draftline CLI Entry Point
// Description: Command dispatcher for pipeline runs and reviewer actions.
// Purpose: Wire configuration, store, and providers into the core runtime.
// Dependencies: clap, draftline-config, draftline-core, draftline-providers,
// draftline-store-sqlite, tracing-subscriber
// ============================================================================

//! ## Overview
//! The CLI is the host shell around the core: it loads configuration, opens
//! the SQLite store, builds the provider adapters, and dispatches one
//! operation per invocation — run, approve, skip, edit, regenerate, resume,
//! style-update, weekly-report, or init-db. The orchestrator returns a run id
//! on success and a typed error on failure; this layer translates outcomes to
//! exit codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use draftline_config::Settings;
use draftline_config::load_blocked_terms;
use draftline_config::runtime_bool;
use draftline_config::runtime_f64;
use draftline_config::runtime_i64;
use draftline_config::runtime_string;
use draftline_core::Clock;
use draftline_core::DraftId;
use draftline_core::DraftStore;
use draftline_core::EvidenceSource;
use draftline_core::Notifier;
use draftline_core::Orchestrator;
use draftline_core::OrchestratorConfig;
use draftline_core::PublishConfig;
use draftline_core::RateLimiter;
use draftline_core::ReviewConfig;
use draftline_core::ReviewOutcome;
use draftline_core::Reviewer;
use draftline_core::RunDispatcher;
use draftline_core::RunId;
use draftline_core::SocialClient;
use draftline_core::SystemClock;
use draftline_core::ThreadPolicy;
use draftline_providers::CompositeNotifier;
use draftline_providers::DevlogSource;
use draftline_providers::GitCommitSource;
use draftline_providers::GithubSource;
use draftline_providers::NotifyConfig;
use draftline_providers::OpenRouterClient;
use draftline_providers::OpenRouterConfig;
use draftline_providers::RssSource;
use draftline_providers::XApiClient;
use draftline_providers::XApiConfig;
use draftline_store_sqlite::SqliteDraftStore;
use draftline_store_sqlite::SqliteStoreConfig;
use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "draftline", version, arg_required_else_help = true)]
struct Cli {
    /// Configuration file path (defaults to `DRAFTLINE_CONFIG` or
    /// `draftline.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one pipeline run.
    Run {
        /// Invocation source label recorded on the run.
        #[arg(long, default_value = "manual")]
        source: String,
        /// Submit the run to a background worker and return immediately
        /// after printing the run id (the process still waits for the
        /// worker before exiting).
        #[arg(long)]
        background: bool,
    },
    /// Approve a draft by its approve token and publish it.
    Approve {
        /// Raw approve bearer token.
        #[arg(long)]
        token: String,
    },
    /// Skip a draft by its skip token.
    Skip {
        /// Raw skip bearer token.
        #[arg(long)]
        token: String,
    },
    /// Replace the draft texts and re-run policy.
    Edit {
        /// Raw edit bearer token.
        #[arg(long)]
        token: String,
        /// Replacement texts, one per tweet position.
        #[arg(long = "text", required = true)]
        texts: Vec<String>,
    },
    /// Re-run generation from the stored plans.
    Regenerate {
        /// Raw regenerate bearer token.
        #[arg(long)]
        token: String,
    },
    /// Resume a crashed or failed publication.
    Resume {
        /// Draft identifier to resume.
        #[arg(long)]
        draft_id: String,
    },
    /// Re-learn the style profile from recent posts.
    StyleUpdate,
    /// Generate and persist the weekly report.
    WeeklyReport,
    /// Create the database schema and exit.
    InitDb,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI wiring errors.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] draftline_config::ConfigError),
    /// Store failure.
    #[error("store error: {0}")]
    Store(String),
    /// Provider construction failure.
    #[error("provider error: {0}")]
    Provider(String),
    /// Runtime failure.
    #[error("runtime error: {0}")]
    Runtime(String),
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes one result line for the operator.
#[allow(clippy::print_stdout, reason = "CLI result output is the command contract.")]
fn emit(line: &str) {
    println!("{line}");
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
    let cli = Cli::parse();
    match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the selected subcommand.
fn dispatch(cli: &Cli) -> Result<ExitCode, CliError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let store = SqliteDraftStore::open(&SqliteStoreConfig::at(settings.store.path.clone()))
        .map_err(|err| CliError::Store(err.to_string()))?;

    match &cli.command {
        Commands::InitDb => {
            emit(&format!("schema ready at {}", settings.store.path.display()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { source, background } => run_pipeline(&settings, &store, source, *background),
        Commands::Approve { token } => review(&settings, &store, |reviewer| {
            reviewer.approve(token).map_err(|err| CliError::Runtime(err.to_string()))
        }),
        Commands::Skip { token } => review(&settings, &store, |reviewer| {
            reviewer.skip(token).map_err(|err| CliError::Runtime(err.to_string()))
        }),
        Commands::Edit { token, texts } => review(&settings, &store, |reviewer| {
            reviewer.edit(token, texts).map_err(|err| CliError::Runtime(err.to_string()))
        }),
        Commands::Regenerate { token } => review(&settings, &store, |reviewer| {
            reviewer.regenerate(token).map_err(|err| CliError::Runtime(err.to_string()))
        }),
        Commands::Resume { draft_id } => {
            let draft_id = DraftId::new(draft_id.clone());
            review(&settings, &store, |reviewer| {
                reviewer.resume(&draft_id).map_err(|err| CliError::Runtime(err.to_string()))
            })
        }
        Commands::StyleUpdate => style_update(&settings, &store),
        Commands::WeeklyReport => weekly_report(&settings, &store),
    }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Builds the orchestrator configuration, applying app-config overrides.
fn orchestrator_config(settings: &Settings, store: &SqliteDraftStore) -> OrchestratorConfig {
    let pipeline = &settings.pipeline;
    let rewrite_max = runtime_i64(store, "REWRITE_MAX", i64::from(pipeline.rewrite_max));
    let similarity =
        runtime_f64(store, "SIMILARITY_THRESHOLD", pipeline.similarity_threshold);
    let ttl = runtime_i64(store, "TOKEN_TTL_HOURS", pipeline.token_ttl_hours);
    OrchestratorConfig {
        rewrite_max: u32::try_from(rewrite_max.max(0)).unwrap_or(u32::MAX),
        token_ttl_hours: ttl,
        recent_posts_days: pipeline.recent_posts_days,
        recent_posts_limit: pipeline.recent_posts_limit,
        style_input_posts: pipeline.style_input_posts,
        similarity_threshold: similarity,
        blocked_terms: blocked_terms(settings, store),
        thread_policy: thread_policy(settings, store),
        retry: draftline_core::RetryPolicy::default(),
    }
}

/// Resolves the thread policy with app-config overrides.
fn thread_policy(settings: &Settings, store: &SqliteDraftStore) -> ThreadPolicy {
    ThreadPolicy {
        enabled: runtime_bool(store, "THREAD_ENABLED", settings.thread.enabled),
        max_tweets: u32::try_from(
            runtime_i64(store, "THREAD_MAX_TWEETS", i64::from(settings.thread.max_tweets))
                .max(2),
        )
        .unwrap_or(settings.thread.max_tweets),
        numbering_enabled: runtime_bool(
            store,
            "THREAD_NUMBERING_ENABLED",
            settings.thread.numbering_enabled,
        ),
    }
}

/// Resolves the blocked-term list: app-config list, else the YAML file at
/// the (app-config overridable) blocked-terms path.
fn blocked_terms(settings: &Settings, store: &SqliteDraftStore) -> Vec<String> {
    let from_config = store
        .get_app_config("blocked_terms")
        .ok()
        .flatten()
        .and_then(|payload| payload.get("value").cloned())
        .and_then(|value| serde_json::from_value::<Vec<String>>(value).ok())
        .filter(|terms| !terms.is_empty());
    from_config.unwrap_or_else(|| {
        let path = runtime_string(
            store,
            "BLOCKED_TERMS_PATH",
            &settings.pipeline.blocked_terms_path.to_string_lossy(),
        );
        load_blocked_terms(Path::new(&path))
    })
}

/// Builds the language model client.
fn llm_client(settings: &Settings) -> Result<OpenRouterClient, CliError> {
    OpenRouterClient::new(OpenRouterConfig {
        base_url: settings.llm.base_url.clone(),
        api_key: Settings::secret_from_env(&settings.llm.api_key_env).unwrap_or_default(),
        model: settings.llm.model.clone(),
        timeout_ms: settings.llm.timeout_ms,
    })
    .map_err(|err| CliError::Provider(err.to_string()))
}

/// Builds the social publish client.
fn social_client(settings: &Settings) -> Result<XApiClient, CliError> {
    XApiClient::new(XApiConfig {
        base_url: settings.publish.base_url.clone(),
        bearer_token: Settings::secret_from_env(&settings.publish.bearer_token_env)
            .unwrap_or_default(),
        timeout_ms: settings.publish.timeout_ms,
    })
    .map_err(|err| CliError::Provider(err.to_string()))
}

/// Builds the notifier.
fn notifier(settings: &Settings) -> CompositeNotifier {
    CompositeNotifier::new(NotifyConfig {
        base_public_url: settings.notify.base_public_url.clone(),
        email_enabled: settings.notify.email_enabled,
        email_api_url: settings.notify.email_api_url.clone(),
        email_api_key: Settings::secret_from_env(&settings.notify.email_api_key_env)
            .unwrap_or_default(),
        email_from: settings.notify.email_from.clone(),
        email_to: settings.notify.email_to.clone(),
        webhook_enabled: settings.notify.webhook_enabled,
        webhook_url: settings.notify.webhook_url.clone(),
        timeout_ms: settings.notify.timeout_ms,
    })
}

/// Builds the reviewer configuration, applying app-config overrides.
fn review_config(settings: &Settings, store: &SqliteDraftStore) -> ReviewConfig {
    ReviewConfig {
        blocked_terms: blocked_terms(settings, store),
        similarity_threshold: runtime_f64(
            store,
            "SIMILARITY_THRESHOLD",
            settings.pipeline.similarity_threshold,
        ),
        recent_posts_days: settings.pipeline.recent_posts_days,
        recent_posts_limit: settings.pipeline.recent_posts_limit,
        retry: draftline_core::RetryPolicy::default(),
        publish: PublishConfig {
            dry_run: runtime_bool(store, "DRY_RUN", settings.publish.dry_run),
            retry: draftline_core::RetryPolicy::default(),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes one pipeline run, optionally through the worker pool.
fn run_pipeline(
    settings: &Settings,
    store: &SqliteDraftStore,
    source: &str,
    background: bool,
) -> Result<ExitCode, CliError> {
    if background {
        let dispatcher = RunDispatcher::new(1);
        let settings = settings.clone();
        let store = store.clone();
        let source = source.to_string();
        let run_id = dispatcher.submit(move |run_id| {
            match execute_run(&settings, &store, &source, Some(run_id)) {
                Ok(run_id) => info!(run_id = %run_id, "background run completed"),
                Err(err) => error!(error = %err, "background run failed"),
            }
        });
        emit(&format!("run submitted: {run_id}"));
        dispatcher.join();
        return Ok(ExitCode::SUCCESS);
    }
    match execute_run(settings, store, source, None) {
        Ok(run_id) => {
            emit(&format!("run completed: {run_id}"));
            Ok(ExitCode::SUCCESS)
        }
        Err(CliError::Runtime(message)) => {
            emit(&format!("run failed: {message}"));
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

/// Wires the providers and executes the orchestrator once.
fn execute_run(
    settings: &Settings,
    store: &SqliteDraftStore,
    source: &str,
    run_id: Option<RunId>,
) -> Result<RunId, CliError> {
    let clock = SystemClock;
    let llm = llm_client(settings)?;
    let notify = notifier(settings);
    let config = orchestrator_config(settings, store);

    let git = GitCommitSource::new(settings.sources.git_repo_path.clone());
    let devlog = DevlogSource::new(settings.sources.devlog_path.clone());
    let mut owned_sources: Vec<Box<dyn EvidenceSource>> =
        vec![Box::new(git), Box::new(devlog)];
    if settings.sources.enable_github {
        let token =
            Settings::secret_from_env(&settings.sources.github_token_env).unwrap_or_default();
        let github = GithubSource::new(
            settings.sources.github_repo.clone(),
            token,
            settings.sources.timeout_ms,
            clock.now(),
        )
        .map_err(|err| CliError::Provider(err.to_string()))?;
        owned_sources.push(Box::new(github));
    }
    if settings.sources.enable_rss {
        let rss = RssSource::new(
            settings.sources.rss_feed_urls.clone(),
            settings.sources.timeout_ms,
            clock.now(),
        )
        .map_err(|err| CliError::Provider(err.to_string()))?;
        owned_sources.push(Box::new(rss));
    }
    let sources: Vec<&dyn EvidenceSource> =
        owned_sources.iter().map(AsRef::as_ref).collect();

    let orchestrator =
        Orchestrator::new(store, &llm, &clock, sources, &notify as &dyn Notifier, config);
    orchestrator.start_run(source, run_id).map_err(|err| CliError::Runtime(err.to_string()))
}

/// Runs one reviewer action and prints its outcome.
fn review<F>(
    settings: &Settings,
    store: &SqliteDraftStore,
    action: F,
) -> Result<ExitCode, CliError>
where
    F: FnOnce(&Reviewer<'_, SqliteDraftStore, OpenRouterClient>) -> Result<ReviewOutcome, CliError>,
{
    let clock = SystemClock;
    let llm = llm_client(settings)?;
    let social = social_client(settings)?;
    let limiter = RateLimiter::default();
    let config = review_config(settings, store);
    let reviewer = Reviewer::new(
        store,
        &llm,
        &clock,
        &social as &dyn SocialClient,
        Some(&limiter),
        config,
    );
    let outcome = action(&reviewer)?;
    let code = outcome.status_code();
    emit(&format!("{code} {}", describe(&outcome)));
    if code < 400 { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Renders a reviewer outcome for the operator.
fn describe(outcome: &ReviewOutcome) -> String {
    match outcome {
        ReviewOutcome::Published { tweet_ids, dry_run } => {
            let label = if *dry_run { "dry-run published" } else { "published" };
            format!("{label}: {}", tweet_ids.join(", "))
        }
        ReviewOutcome::AlreadyProcessed { status } => {
            format!("already processed: {}", status.as_str())
        }
        ReviewOutcome::Edited { report } | ReviewOutcome::Regenerated { report } => {
            format!("policy action {}", report.action.as_str())
        }
        ReviewOutcome::Skipped => "skipped".to_string(),
        ReviewOutcome::InvalidTexts => "invalid texts".to_string(),
        ReviewOutcome::PolicyRefused { action, risk_level } => {
            format!("policy refused: {} ({})", action.as_str(), risk_level.as_str())
        }
        ReviewOutcome::NotFound => "not found".to_string(),
        ReviewOutcome::Conflict { reason } => reason.clone(),
        ReviewOutcome::Expired => "token expired".to_string(),
        ReviewOutcome::RateLimited => "rate limited".to_string(),
        ReviewOutcome::PublishFailed { error } => format!("publish failed: {error}"),
    }
}

/// Re-learns the style profile.
fn style_update(settings: &Settings, store: &SqliteDraftStore) -> Result<ExitCode, CliError> {
    let clock = SystemClock;
    let llm = llm_client(settings)?;
    let notify = notifier(settings);
    let config = orchestrator_config(settings, store);
    let orchestrator = Orchestrator::new(
        store,
        &llm,
        &clock,
        Vec::new(),
        &notify as &dyn Notifier,
        config,
    );
    let devlog = DevlogSource::new(settings.sources.devlog_path.clone());
    let excerpt = devlog
        .fetch()
        .ok()
        .and_then(|items| items.into_iter().next())
        .map(|item| item.raw_snippet)
        .unwrap_or_default();
    let profile = orchestrator
        .update_style_profile(&excerpt)
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    emit(&format!("style profile updated: {} openers", profile.preferred_openers.len()));
    Ok(ExitCode::SUCCESS)
}

/// Generates the weekly report.
fn weekly_report(settings: &Settings, store: &SqliteDraftStore) -> Result<ExitCode, CliError> {
    let clock = SystemClock;
    let llm = llm_client(settings)?;
    let notify = notifier(settings);
    let config = orchestrator_config(settings, store);
    let orchestrator = Orchestrator::new(
        store,
        &llm,
        &clock,
        Vec::new(),
        &notify as &dyn Notifier,
        config,
    );
    let report = orchestrator
        .generate_weekly_report()
        .map_err(|err| CliError::Runtime(err.to_string()))?;
    emit(&format!(
        "weekly report: {} buckets, {} recommendations",
        report.top_topic_buckets.len(),
        report.recommendations.len()
    ));
    Ok(ExitCode::SUCCESS)
}
