use anyhow::bail;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

/// Process configuration. Every flag falls back to an environment variable,
/// and `main` loads `.env` before parsing.
#[derive(Debug, Clone, Parser)]
#[command(name = "foodhive-server", about = "FoodHive marketplace API")]
pub struct Config {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Document store backend
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Mongo)]
    pub store: StoreBackend,

    /// Full MongoDB connection string; overrides the user/pass/host settings
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "cluster0.joj1d.mongodb.net")]
    pub db_host: String,

    #[arg(long, env = "DB_NAME", default_value = "foodhive")]
    pub db_name: String,

    /// HS256 secret for session tokens
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn mongodb_uri(&self) -> anyhow::Result<String> {
        if let Some(uri) = &self.mongodb_uri {
            return Ok(uri.clone());
        }
        match (&self.db_user, &self.db_pass) {
            (Some(user), Some(pass)) => Ok(format!(
                "mongodb+srv://{user}:{pass}@{}/?retryWrites=true&w=majority&appName=Cluster0",
                self.db_host
            )),
            _ => bail!("MongoDB is not configured: set MONGODB_URI or DB_USER and DB_PASS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["foodhive-server", "--token-secret", "s"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn builds_srv_uri_from_credentials() {
        let config = parse(&["--db-user", "hive", "--db-pass", "pw", "--db-host", "db.example.net"]);
        assert_eq!(
            config.mongodb_uri().unwrap(),
            "mongodb+srv://hive:pw@db.example.net/?retryWrites=true&w=majority&appName=Cluster0"
        );
    }

    #[test]
    fn explicit_uri_wins() {
        let config = parse(&["--mongodb-uri", "mongodb://localhost:27017", "--db-user", "x"]);
        assert_eq!(config.mongodb_uri().unwrap(), "mongodb://localhost:27017");
    }

    #[test]
    fn production_flag_parses() {
        let config = parse(&["--environment", "production", "--store", "memory"]);
        assert!(config.is_production());
        assert_eq!(config.store, StoreBackend::Memory);
    }
}
