//! Unit tests for password lookup from `.env` files

use lutra::config::load_env_file;
use lutra::strategies::{BackupProvider, ProviderRegistry};
use test_utils::{target, ConfigBuilder, DatabaseType, SecretResolver, TestContext};

#[test]
fn test_dotenv_password_reaches_command_env() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let env_file = ctx.create_file(".env", "LUTRA_TEST_ORDERS_PASSWORD=from-dotenv\n");

    let secrets = SecretResolver::from_env(load_env_file(&env_file).unwrap());
    let mut target = target("orders-db", DatabaseType::PostgreSql, "pg", "orders_db");
    target.password_env = Some("LUTRA_TEST_ORDERS_PASSWORD".to_string());

    let registry = ProviderRegistry::default();
    let cmd = registry
        .get(&DatabaseType::PostgreSql)
        .unwrap()
        .build_command(&target, &secrets);

    assert_eq!(cmd.env.get("PGPASSWORD").map(String::as_str), Some("from-dotenv"));
    assert!(!cmd.display_redacted().contains("from-dotenv"));
}

#[test]
fn test_unresolved_reference_sends_no_password() {
    let secrets = SecretResolver::default();
    let mut target = target("erp", DatabaseType::SqlServer, "mssql", "Erp");
    target.password_env = Some("LUTRA_TEST_NEVER_SET".to_string());

    let registry = ProviderRegistry::default();
    let cmd = registry
        .get(&DatabaseType::SqlServer)
        .unwrap()
        .build_command(&target, &secrets);

    assert!(cmd.env.is_empty());
}
