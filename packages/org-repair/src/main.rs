//! CLI entry point: runs the diagnostic and/or seeding routine against the
//! Supabase project configured in the environment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use org_repair::{
    create_test_data, diagnose_user_organization, verify_link, Config, ConflictPolicy, Console,
    SupabaseBackend,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "org-repair")]
#[command(about = "Diagnose and repair user/organization links in a Supabase project")]
struct Cli {
    /// Which failed creates count as "already exists" (overrides REPAIR_CONFLICT_POLICY)
    #[arg(long, value_enum)]
    conflict_policy: Option<ConflictPolicy>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Commands {
    /// Diagnose, then seed (default)
    #[default]
    All,

    /// Check the user, organization and profile; repair the profile
    Diagnose,

    /// Create the organization, account and profile, reusing existing rows
    Seed,

    /// Print the current profile/organization link without writing
    Verify,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,org_repair=info,supabase_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(policy) = cli.conflict_policy {
        config.conflict_policy = policy;
    }
    tracing::debug!(?config, "Configuration loaded");

    let backend = SupabaseBackend::from_config(&config)?;
    let mut console = Console::stdout();

    match cli.command.unwrap_or_default() {
        Commands::All => {
            console.banner("Diagnostic du problème utilisateur-organisation");
            let outcome =
                diagnose_user_organization(&backend, &config.target, &mut console).await?;
            tracing::info!(?outcome, "Diagnosis finished");

            console.heading("🛠️ Création de données de test");
            let seeded =
                create_test_data(&backend, &config.target, config.conflict_policy, &mut console)
                    .await?;
            tracing::info!(?seeded, "Seeding finished");
        }
        Commands::Diagnose => {
            console.banner("Diagnostic du problème utilisateur-organisation");
            let outcome =
                diagnose_user_organization(&backend, &config.target, &mut console).await?;
            tracing::info!(?outcome, "Diagnosis finished");
        }
        Commands::Seed => {
            console.heading("🛠️ Création de données de test");
            let seeded =
                create_test_data(&backend, &config.target, config.conflict_policy, &mut console)
                    .await?;
            tracing::info!(?seeded, "Seeding finished");
        }
        Commands::Verify => {
            let linked = verify_link(&backend, &config.target, &mut console).await?;
            tracing::info!(linked, "Verification finished");
        }
    }

    Ok(())
}
