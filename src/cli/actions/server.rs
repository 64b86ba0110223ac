use crate::{
    api::{self, AdminGuard},
    identity::{
        BcryptHasher, CredentialStore, IdentifierPolicy, MemoryStore, PostgresStore, Registrar,
        RegistrarConfig,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub student_domain: String,
    pub bcrypt_cost: u32,
    pub legacy_plaintext: bool,
    pub admin: Option<(String, SecretString)>,
    pub frontend_origin: Option<String>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn.as_deref().map(redact_dsn))
            .field("student_domain", &self.student_domain)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("legacy_plaintext", &self.legacy_plaintext)
            .field(
                "admin_username",
                &self.admin.as_ref().map(|(username, _)| username),
            )
            .field("frontend_origin", &self.frontend_origin)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = connect_store(args.dsn.as_deref()).await?;

    let config = RegistrarConfig::new(IdentifierPolicy::new(&args.student_domain))
        .with_legacy_plaintext(args.legacy_plaintext);

    let registrar = Registrar::new(store, Arc::new(BcryptHasher::new(args.bcrypt_cost)), config);

    let admin = match args.admin {
        Some((username, password)) => AdminGuard::new(&username, password),
        None => {
            warn!("No admin credentials configured; admin routes are disabled");
            AdminGuard::disabled()
        }
    };

    api::new(
        args.port,
        Arc::new(registrar),
        Arc::new(admin),
        args.frontend_origin,
    )
    .await
}

async fn connect_store(dsn: Option<&str>) -> Result<Arc<dyn CredentialStore>> {
    let Some(dsn) = dsn else {
        warn!("No DSN configured; students are kept in memory and lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PostgresStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;

    Ok(Arc::new(store))
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "store",
            args.dsn
                .as_deref()
                .map_or_else(|| "memory".to_string(), redact_dsn),
        ),
        ("student_domain", args.student_domain.clone()),
        ("bcrypt_cost", args.bcrypt_cost.to_string()),
        ("legacy_plaintext", args.legacy_plaintext.to_string()),
        ("admin_enabled", args.admin.is_some().to_string()),
        (
            "frontend_origin",
            args.frontend_origin
                .clone()
                .unwrap_or_else(|| "any".to_string()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
