//! Repository selection from the environment and from `[repository]` config.

mod support;

use std::str::FromStr;

use mill_jit::db::{
    LimitsRepository, RepositoryBuilder, RepositoryConfig, RepositoryFactory, RepositoryType,
    TimeSeriesRepository,
};

#[test]
fn test_repository_type_aliases() {
    for s in ["postgres", "POSTGRES", "pg"] {
        assert_eq!(RepositoryType::from_str(s).unwrap(), RepositoryType::Postgres);
    }
    for s in ["local", "LOCAL", "memory"] {
        assert_eq!(RepositoryType::from_str(s).unwrap(), RepositoryType::Local);
    }
    let err = RepositoryType::from_str("influx").unwrap_err();
    assert!(err.contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_database_url_selects_postgres() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", Some("postgres://localhost/yard")),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres),
    );
}

#[test]
fn test_explicit_type_wins_over_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("DATABASE_URL", Some("postgres://localhost/yard")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);

            let mut config = RepositoryConfig::default();
            config.apply_env();
            assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
            assert_eq!(config.postgres.database_url, "postgres://localhost/yard");
        },
    );
}

#[test]
fn test_invalid_env_type_defaults_to_local() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("invalid")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_pool_settings_from_env() {
    support::with_scoped_env(
        &[("PG_POOL_MAX", Some("32")), ("PG_RETRY_DELAY_MS", Some("not-a-number"))],
        || {
            let mut config = RepositoryConfig::default();
            config.apply_env();
            assert_eq!(config.postgres.max_connections, 32);
            assert_eq!(config.postgres.retry_delay_ms, 100);
        },
    );
}

#[tokio::test]
async fn test_local_repository_is_empty_and_healthy() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
    assert!(repo.latest_snapshot().await.unwrap().is_none());
    assert!(repo.list_limits().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_builder_from_config() {
    let config: RepositoryConfig = toml::from_str("[repository]\ntype = \"memory\"").unwrap();
    let repo = RepositoryBuilder::new()
        .from_config(&config)
        .unwrap()
        .build()
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[cfg(feature = "postgres-repo")]
#[tokio::test]
async fn test_create_postgres_without_config_fails() {
    let err = RepositoryFactory::create(RepositoryType::Postgres, None)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("requires PostgresConfig"));
}

#[cfg(not(feature = "postgres-repo"))]
#[tokio::test]
async fn test_create_postgres_without_feature_fails() {
    let err = RepositoryFactory::create(RepositoryType::Postgres, None)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}
