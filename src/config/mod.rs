// brutility/src/config/mod.rs
pub(crate) mod secrets;

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::errors::{AppError, Result};

pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const RECIPIENT_EMAIL: &str = "RECIPIENT_EMAIL";
pub const AWS_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
pub const AWS_SECRET_KEY: &str = "AWS_SECRET_KEY";
pub const S3_BUCKET: &str = "S3_BUCKET";
pub const S3_REGION: &str = "S3_REGION";
pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const S3_PREFIX: &str = "S3_PREFIX";
pub const FTP_HOST: &str = "FTP_HOST";
pub const FTP_USER: &str = "FTP_USER";
pub const FTP_PASSWORD: &str = "FTP_PASSWORD";

pub const MAIL_KEYS: &[&str] = &[SMTP_HOST, SMTP_PORT, SMTP_USER, SMTP_PASSWORD, RECIPIENT_EMAIL];
pub const S3_KEYS: &[&str] = &[AWS_ACCESS_KEY, AWS_SECRET_KEY, S3_BUCKET];
pub const FTP_KEYS: &[&str] = &[FTP_HOST, FTP_USER, FTP_PASSWORD];

const OPTIONAL_KEYS: &[&str] = &[S3_REGION, S3_ENDPOINT, S3_PREFIX];
const DEFAULT_S3_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DbType {
    Mysql,
    Pgsql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionFormat {
    Zip,
    Tar,
    Gz,
}

impl CompressionFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CompressionFormat::Zip => "zip",
            CompressionFormat::Tar => "tar",
            CompressionFormat::Gz => "gz",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "zip" => Some(CompressionFormat::Zip),
            "tar" => Some(CompressionFormat::Tar),
            "gz" => Some(CompressionFormat::Gz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StorageType {
    #[default]
    Local,
    S3,
    Ftp,
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Local => "local",
            StorageType::S3 => "s3",
            StorageType::Ftp => "ftp",
        }
    }

    /// Settings that must be present before a backup can be sent here.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            StorageType::Local => &[],
            StorageType::S3 => S3_KEYS,
            StorageType::Ftp => FTP_KEYS,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details handed to the dump and restore tools.
#[derive(Clone)]
pub struct ConnectionParams {
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub host: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Raw database flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct DatabaseArgs {
    pub db_type: Option<DbType>,
    pub db_name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
}

impl DatabaseArgs {
    /// Checks the flag combination needed by backup and restore.
    pub fn connection(&self) -> Result<ConnectionParams> {
        match self.db_type {
            None => return Err(AppError::validation("--db_type is required for backup and restore")),
            Some(DbType::Pgsql) => {
                return Err(AppError::validation("Unsupported database type: pgsql (only mysql is implemented)"));
            }
            Some(DbType::Mysql) => {}
        }

        let fields = [
            ("--db_name", &self.db_name),
            ("--user", &self.user),
            ("--password", &self.password),
            ("--host", &self.host),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(flag, _)| *flag)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "missing required flags for mysql: {}",
                missing.join(", ")
            )));
        }

        let db_name = self.db_name.clone().unwrap_or_default();
        if db_name.contains(|c: char| !c.is_alphanumeric() && c != '_' && c != '-' && c != '$') {
            return Err(AppError::validation(format!("Invalid character in database name: {}", db_name)));
        }

        Ok(ConnectionParams {
            db_name,
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            host: self.host.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub folder_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FtpSettings {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// Key-value settings read from the environment (after `.env` is loaded).
/// Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Loads `env_file` into the process environment, then reads every
    /// recognized key. Variables already set in the environment win.
    pub fn load(env_file: &Path) -> Self {
        match dotenv::from_path(env_file) {
            Ok(()) => debug!(env_file = %env_file.display(), "loaded environment file"),
            Err(e) => debug!(env_file = %env_file.display(), error = %e, "environment file not loaded"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let known = MAIL_KEYS.iter().chain(S3_KEYS).chain(FTP_KEYS).chain(OPTIONAL_KEYS);
        Self::from_pairs(known.filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value))))
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Settings::default();
        for (key, value) in pairs {
            settings.set(key, value);
        }
        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn missing<'a>(&self, keys: &[&'a str]) -> Vec<&'a str> {
        keys.iter().copied().filter(|key| self.get(key).is_none()).collect()
    }

    fn required(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn mail(&self) -> Result<MailSettings> {
        let missing = self.missing(MAIL_KEYS);
        if !missing.is_empty() {
            return Err(AppError::MailConfig(format!(
                "missing settings in environment/.env: {}",
                missing.join(", ")
            )));
        }
        let port = self
            .required(SMTP_PORT)
            .trim()
            .parse::<u16>()
            .map_err(|e| AppError::MailConfig(format!("SMTP_PORT must be a port number ({})", e)))?;
        Ok(MailSettings {
            host: self.required(SMTP_HOST),
            port,
            user: self.required(SMTP_USER),
            password: self.required(SMTP_PASSWORD),
            recipient: self.required(RECIPIENT_EMAIL),
        })
    }

    pub fn s3(&self) -> Result<S3Settings> {
        self.ensure_present(S3_KEYS, "S3")?;
        Ok(S3Settings {
            access_key_id: self.required(AWS_ACCESS_KEY),
            secret_access_key: self.required(AWS_SECRET_KEY),
            bucket_name: self.required(S3_BUCKET),
            region: self.get(S3_REGION).unwrap_or(DEFAULT_S3_REGION).to_string(),
            endpoint_url: self.get(S3_ENDPOINT).map(str::to_string),
            folder_prefix: self.get(S3_PREFIX).map(str::to_string),
        })
    }

    pub fn ftp(&self) -> Result<FtpSettings> {
        self.ensure_present(FTP_KEYS, "FTP")?;
        Ok(FtpSettings {
            host: self.required(FTP_HOST),
            user: self.required(FTP_USER),
            password: self.required(FTP_PASSWORD),
        })
    }

    fn ensure_present(&self, keys: &[&str], what: &str) -> Result<()> {
        let missing = self.missing(keys);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!("missing {} settings: {}", what, missing.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_args() -> DatabaseArgs {
        DatabaseArgs {
            db_type: Some(DbType::Mysql),
            db_name: Some("orders".into()),
            user: Some("root".into()),
            password: Some("s3cret".into()),
            host: Some("localhost".into()),
        }
    }

    #[test]
    fn test_mysql_connection_params() -> anyhow::Result<()> {
        let params = mysql_args().connection()?;
        assert_eq!(params.db_name, "orders");
        assert!(!format!("{:?}", params).contains("s3cret"));
        Ok(())
    }

    #[test]
    fn test_pgsql_is_rejected_explicitly() {
        let args = DatabaseArgs { db_type: Some(DbType::Pgsql), ..mysql_args() };
        let err = args.connection().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("Unsupported database type"));
    }

    #[test]
    fn test_missing_flags_are_named() {
        let args = DatabaseArgs { user: None, host: Some(" ".into()), ..mysql_args() };
        let err = args.connection().unwrap_err().to_string();
        assert!(err.contains("--user"));
        assert!(err.contains("--host"));
        assert!(!err.contains("--db_name"));

        let no_type = DatabaseArgs { db_type: None, ..mysql_args() };
        assert!(no_type.connection().unwrap_err().to_string().contains("--db_type"));
    }

    #[test]
    fn test_mail_settings_list_every_missing_key() {
        let settings = Settings::from_pairs([(SMTP_HOST, "smtp.example.com"), (SMTP_USER, "")]);
        let err = settings.mail().unwrap_err();
        assert!(matches!(err, AppError::MailConfig(_)));
        let msg = err.to_string();
        for key in [SMTP_PORT, SMTP_USER, SMTP_PASSWORD, RECIPIENT_EMAIL] {
            assert!(msg.contains(key), "{} not named in {}", key, msg);
        }
        assert!(!msg.contains(SMTP_HOST));
    }

    #[test]
    fn test_mail_settings_reject_bad_port() {
        let settings = Settings::from_pairs([
            (SMTP_HOST, "smtp.example.com"),
            (SMTP_PORT, "five-eight-seven"),
            (SMTP_USER, "ops@example.com"),
            (SMTP_PASSWORD, "pw"),
            (RECIPIENT_EMAIL, "dba@example.com"),
        ]);
        assert!(matches!(settings.mail(), Err(AppError::MailConfig(_))));
    }

    #[test]
    fn test_s3_settings_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_pairs([(AWS_ACCESS_KEY, "AKIA"), (AWS_SECRET_KEY, "secret"), (S3_BUCKET, "backups")]);
        let s3 = settings.s3()?;
        assert_eq!(s3.region, "us-east-1");
        assert!(s3.endpoint_url.is_none());
        assert!(Settings::default().s3().is_err());
        assert_eq!(Settings::default().missing(StorageType::Ftp.required_keys()), FTP_KEYS.to_vec());
        Ok(())
    }

    #[test]
    fn test_compression_extensions() {
        for format in [CompressionFormat::Zip, CompressionFormat::Tar, CompressionFormat::Gz] {
            assert_eq!(CompressionFormat::from_extension(format.extension()), Some(format));
        }
        assert_eq!(CompressionFormat::from_extension("sql"), None);
    }
}
