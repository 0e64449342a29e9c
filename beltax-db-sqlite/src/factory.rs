use std::path::PathBuf;

use async_trait::async_trait;

use beltax_core::db::repository::{RepositoryError, RuleRepository};
use beltax_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRuleRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`BELTAX_DB_SQLITE_SEEDS_DIR`** — if set, use this path (override for
///    packagers or custom layouts).
/// 2. **`./seeds`** — if the directory exists in the current working directory.
/// 3. **Crate manifest dir** — `$CARGO_MANIFEST_DIR/seeds` as last resort
///    (dev/tests when run from the build tree).
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BELTAX_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`beltax_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use beltax_core::db::RepositoryRegistry;
/// use beltax_db_sqlite::SqliteRuleRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRuleRepositoryFactory));
/// ```
pub struct SqliteRuleRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRuleRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string`.
    ///
    /// Accepted connection-string values:
    /// * A bare file path — e.g. `"beltax.db"`.  The file is created if it
    ///   does not exist.
    /// * `":memory:"` — an ephemeral in-memory database (useful for tests).
    ///
    /// Migrations always run; seed SQL files are loaded from a directory
    /// resolved at runtime (see [`seeds_dir`]). For packaged distribution,
    /// set `BELTAX_DB_SQLITE_SEEDS_DIR` or run with a `seeds` directory in
    /// the current working directory.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn RuleRepository>, RepositoryError> {
        let repo = SqliteRuleRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use beltax_core::db::{DbConfig, RepositoryFactory};

    use super::SqliteRuleRepositoryFactory;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRuleRepositoryFactory.backend_name(), "sqlite");
    }

    /// Full round-trip: factory → SqliteRuleRepository with an in-memory DB,
    /// migrations and seeds included. Seeds resolve via the crate manifest
    /// dir, so this works from any working directory.
    #[tokio::test]
    async fn creates_in_memory_repository() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        };

        let result = SqliteRuleRepositoryFactory.create(&config).await;
        assert!(
            result.is_ok(),
            "failed to create in-memory repository: {:#?}",
            result.err()
        );
    }
}
