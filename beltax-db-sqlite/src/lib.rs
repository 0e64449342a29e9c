pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRuleRepositoryFactory;
pub use repository::SqliteRuleRepository;
