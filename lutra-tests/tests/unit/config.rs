//! Unit tests for configuration loading and validation

use lutra::config::{load_config, load_env_file, ConfigError};
use test_utils::{
    minimal_config_toml, multi_target_config_toml, render_config, CompressionType, ConfigBuilder,
    DatabaseType, OptionAssertions, ResultAssertions, RetentionPolicy, TestContext,
};

fn context() -> TestContext {
    TestContext::from_builder(ConfigBuilder::new())
}

#[test]
fn test_load_minimal_config() {
    let ctx = context();
    let backup_dir = ctx.temp_dir().join("backups");
    let path = ctx.create_file("lutra.toml", &render_config(minimal_config_toml(), &backup_dir));

    let config = load_config(&path).assert_ok();
    assert_eq!(config.backup_directory, backup_dir);
    assert_eq!(config.retention, RetentionPolicy::default());
    assert!(config.timeout_seconds.is_none());
    assert!(config.log_directory.is_none());
    assert_eq!(config.log_level, "info");

    let target = &config.databases[0];
    assert_eq!(target.name, "orders-db");
    assert_eq!(target.db_type, DatabaseType::PostgreSql);
    assert_eq!(target.compression, CompressionType::Gzip);
    target.username.as_deref().assert_none();
}

#[test]
fn test_load_multi_target_config() {
    let ctx = context();
    let path = ctx.create_file(
        "lutra.toml",
        &render_config(multi_target_config_toml(), &ctx.temp_dir().join("backups")),
    );

    let config = load_config(&path).assert_ok();
    assert_eq!(config.timeout_seconds, Some(3600));
    assert_eq!(config.retention, RetentionPolicy { max_count: 7, max_age_days: 14 });

    let types: Vec<_> = config.databases.iter().map(|t| t.db_type.clone()).collect();
    assert_eq!(
        types,
        vec![DatabaseType::PostgreSql, DatabaseType::SqlServer, DatabaseType::MongoDb]
    );

    let orders = config.find_target("orders-db").assert_ok();
    assert_eq!(orders.compression, CompressionType::None);
    assert_eq!(orders.format.as_deref(), Some("plain"));
    assert_eq!(*orders.effective_retention(&config.retention), config.retention);

    let events = config.find_target("EVENTS").assert_ok();
    assert_eq!(events.schedule, "30 1 * * *");
    let retention = events.retention.assert_some();
    assert_eq!(*events.effective_retention(&config.retention), retention);
    assert_eq!(retention.max_count, 3);
}

#[test]
fn test_unknown_type_loads() {
    let ctx = context();
    let toml = render_config(minimal_config_toml(), ctx.temp_dir()).replace("postgresql", "oracle");
    let path = ctx.create_file("lutra.toml", &toml);

    let config = load_config(&path).assert_ok();
    assert_eq!(config.databases[0].db_type, DatabaseType::Other("oracle".to_string()));
}

#[test]
fn test_duplicate_names_rejected() {
    let ctx = context();
    let mut toml = render_config(minimal_config_toml(), ctx.temp_dir());
    toml.push_str(
        r#"
[[databases]]
name = "Orders-DB"
type = "postgresql"
container = "pg2"
database = "orders"
"#,
    );
    let path = ctx.create_file("lutra.toml", &toml);

    load_config(&path).assert_err_contains("duplicate target name");
}

#[test]
fn test_name_with_separator_rejected() {
    let ctx = context();
    let toml = render_config(minimal_config_toml(), ctx.temp_dir())
        .replace("name = \"orders-db\"", "name = \"../orders\"");
    let path = ctx.create_file("lutra.toml", &toml);

    assert!(matches!(load_config(&path), Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_no_databases_rejected() {
    let ctx = context();
    let path = ctx.create_file("lutra.toml", "backup_directory = \"/var/backups/lutra\"\n");

    load_config(&path).assert_err_contains("At least one database target");
}

#[test]
fn test_missing_container_rejected() {
    let ctx = context();
    let toml = render_config(minimal_config_toml(), ctx.temp_dir())
        .replace("container = \"pg\"", "container = \"\"");
    let path = ctx.create_file("lutra.toml", &toml);

    load_config(&path).assert_err_contains("'container' is required");
}

#[test]
fn test_invalid_toml_rejected() {
    let ctx = context();
    let path = ctx.create_file("lutra.toml", "backup_directory = [");

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_nonexistent_file_rejected() {
    assert!(matches!(
        load_config("/nonexistent/lutra.toml"),
        Err(ConfigError::ReadError(_))
    ));
}

#[test]
fn test_find_target_lists_available_names() {
    let config = ConfigBuilder::new()
        .add_postgres("orders-db", "pg", "orders_db")
        .add_mongo("events", "mongo", "events")
        .build();

    config.find_target("billing").assert_err_contains("orders-db, events");
}

#[test]
fn test_load_env_file() {
    let ctx = context();
    let path = ctx.create_file(
        ".env",
        "# database passwords\nORDERS_DB_PASSWORD=s3cret\n\n  ERP_SA_PASSWORD = a=b=c \ngarbage\n=novalue\n",
    );

    let vars = load_env_file(&path).assert_ok();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars["ORDERS_DB_PASSWORD"], "s3cret");
    assert_eq!(vars["ERP_SA_PASSWORD"], "a=b=c");
}

#[test]
fn test_missing_env_file_is_empty() {
    let ctx = context();
    let vars = load_env_file(ctx.temp_dir().join("missing.env")).assert_ok();
    assert!(vars.is_empty());
}
