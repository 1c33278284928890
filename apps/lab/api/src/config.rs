use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::postgres::PostgresConfig;
use job_queue::BrokerConfig;

pub use core_config::Environment;

/// Application-specific configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub broker: BrokerConfig,
    pub server: ServerConfig,
    pub environment: Environment,
}

impl Config {
    /// Every value has a default, so this only fails on malformed input.
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            database: PostgresConfig::from_env()?,
            broker: BrokerConfig::from_env()?,
            server: ServerConfig::from_env()?,
            environment: Environment::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        temp_env::with_vars_unset(
            [
                "DATABASE_URL",
                "DB_HOST",
                "RMQ_HOST",
                "RMQ_QUEUE",
                "PORT",
                "HOST",
                "APP_ENV",
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "lab_api");
                assert_eq!(config.broker.queue, "work_queue");
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.environment, Environment::Development);
                assert!(config.database.url().contains("@postgres:5432/appdb"));
            },
        );
    }

    #[test]
    fn test_malformed_port_is_an_error() {
        temp_env::with_var("RMQ_PORT", Some("amqp"), || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("RMQ_PORT"));
        });
    }
}
