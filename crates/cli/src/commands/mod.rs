//! CLI subcommands.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;

/// Read the admin database URL (`ADMIN_DATABASE_URL`, then `DATABASE_URL`).
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
