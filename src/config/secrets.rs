// brutility/src/config/secrets.rs
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::info;

use super::{
    AWS_ACCESS_KEY, AWS_SECRET_KEY, FTP_HOST, FTP_PASSWORD, FTP_USER, S3_BUCKET, Settings, StorageType,
};
use crate::errors::{AppError, Result};

/// Interactive questions asked of the operator.
pub trait Prompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
    /// Like [`Prompter::ask`] but the answer is not echoed.
    fn ask_secret(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads answers from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt).map(|s| s.trim().to_string())
    }
}

/// Durable home for credentials entered at the prompt.
pub trait SecretStore {
    fn persist(&mut self, entries: &[(&str, String)]) -> Result<()>;
}

/// Appends `KEY='value'` lines to the `.env` file, keeping it owner-only.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EnvFileStore { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SecretStore for EnvFileStore {
    fn persist(&mut self, entries: &[(&str, String)]) -> Result<()> {
        let mut options = OpenOptions::new();
        options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        if needs_leading_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        for (key, value) in entries {
            writeln!(file, "{}={}", key, quote_value(value))?;
        }
        file.sync_all()?;
        info!(env_file = %self.path.display(), keys = entries.len(), "stored credentials");
        Ok(())
    }
}

fn needs_leading_newline(file: &mut fs::File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Single quotes keep the value literal (no `$` substitution); values that
/// contain a single quote fall back to escaped double quotes.
fn quote_value(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{}\"", escaped)
}

struct CredentialField {
    key: &'static str,
    prompt: &'static str,
    secret: bool,
}

fn fields_for(storage: StorageType) -> &'static [CredentialField] {
    const S3: &[CredentialField] = &[
        CredentialField { key: AWS_ACCESS_KEY, prompt: "Enter AWS Access Key: ", secret: false },
        CredentialField { key: AWS_SECRET_KEY, prompt: "Enter AWS Secret Key: ", secret: true },
        CredentialField { key: S3_BUCKET, prompt: "Enter S3 Bucket Name: ", secret: false },
    ];
    const FTP: &[CredentialField] = &[
        CredentialField { key: FTP_HOST, prompt: "Enter FTP Host: ", secret: false },
        CredentialField { key: FTP_USER, prompt: "Enter FTP Username: ", secret: false },
        CredentialField { key: FTP_PASSWORD, prompt: "Enter FTP Password: ", secret: true },
    ];
    match storage {
        StorageType::Local => &[],
        StorageType::S3 => S3,
        StorageType::Ftp => FTP,
    }
}

/// Prompts once for any credential `storage` needs that is not configured,
/// persists the answers and applies them to `settings`.
///
/// Returns the keys that were collected.
pub fn ensure_storage_credentials(
    settings: &mut Settings,
    storage: StorageType,
    prompter: &mut dyn Prompter,
    store: &mut dyn SecretStore,
) -> Result<Vec<&'static str>> {
    let missing = settings.missing(storage.required_keys());
    if missing.is_empty() {
        return Ok(Vec::new());
    }
    println!("🔐 {} credentials are not configured ({}).", storage, missing.join(", "));

    let mut collected = Vec::new();
    for field in fields_for(storage).iter().filter(|f| missing.contains(&f.key)) {
        let answer = if field.secret {
            prompter.ask_secret(field.prompt)?
        } else {
            prompter.ask(field.prompt)?
        };
        if answer.is_empty() {
            return Err(AppError::validation(format!("{} cannot be empty", field.key)));
        }
        collected.push((field.key, answer));
    }

    store.persist(&collected)?;
    for (key, value) in &collected {
        settings.set(*key, value.clone());
    }
    println!("✅ {} credentials stored.", storage);
    Ok(collected.into_iter().map(|(key, _)| key).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers prompts from a script and records what was asked.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedPrompter {
        pub answers: VecDeque<String>,
        pub asked: Vec<(String, bool)>,
    }

    impl ScriptedPrompter {
        pub fn with_answers(answers: &[&str]) -> Self {
            ScriptedPrompter {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }

        fn next(&mut self, prompt: &str, secret: bool) -> io::Result<String> {
            self.asked.push((prompt.to_string(), secret));
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, prompt: &str) -> io::Result<String> {
            self.next(prompt, false)
        }

        fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
            self.next(prompt, true)
        }
    }

    #[test]
    fn test_missing_ftp_credentials_are_prompted_and_persisted() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env_path = dir.path().join(".env");
        fs::write(&env_path, "SMTP_HOST=smtp.example.com")?;
        let mut store = EnvFileStore::new(&env_path);
        let mut settings = Settings::from_pairs([(FTP_HOST, "ftp.example.com")]);
        let mut prompter = ScriptedPrompter::with_answers(&["backup", "pa\"ss"]);

        let collected = ensure_storage_credentials(&mut settings, StorageType::Ftp, &mut prompter, &mut store)?;

        assert_eq!(collected, vec![FTP_USER, FTP_PASSWORD]);
        assert_eq!(
            prompter.asked,
            vec![("Enter FTP Username: ".to_string(), false), ("Enter FTP Password: ".to_string(), true)]
        );
        assert_eq!(settings.get(FTP_PASSWORD), Some("pa\"ss"));
        let content = fs::read_to_string(&env_path)?;
        assert_eq!(
            content,
            "SMTP_HOST=smtp.example.com\nFTP_USER='backup'\nFTP_PASSWORD='pa\"ss'\n"
        );
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&env_path)?.permissions().mode() & 0o777, 0o600);
        }
        Ok(())
    }

    #[test]
    fn test_configured_credentials_are_not_prompted() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = EnvFileStore::new(dir.path().join(".env"));
        let mut settings = Settings::from_pairs([(AWS_ACCESS_KEY, "a"), (AWS_SECRET_KEY, "b"), (S3_BUCKET, "c")]);
        let mut prompter = ScriptedPrompter::default();

        let collected = ensure_storage_credentials(&mut settings, StorageType::S3, &mut prompter, &mut store)?;
        assert!(collected.is_empty());
        assert!(prompter.asked.is_empty());
        assert!(!store.path().exists());
        Ok(())
    }

    #[test]
    fn test_empty_answer_is_rejected_before_persisting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = EnvFileStore::new(dir.path().join(".env"));
        let mut settings = Settings::default();
        let mut prompter = ScriptedPrompter::with_answers(&[""]);

        let err = ensure_storage_credentials(&mut settings, StorageType::S3, &mut prompter, &mut store).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!store.path().exists());
        Ok(())
    }

    #[test]
    fn test_persisted_values_load_back_through_dotenv() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env_path = dir.path().join(".env");
        let mut store = EnvFileStore::new(&env_path);
        let literal = "with \"quotes\", \\slash and $HOME";
        let apostrophe = "it's $5 \"off\"";
        store.persist(&[
            ("BRUTILITY_TEST_LITERAL", literal.to_string()),
            ("BRUTILITY_TEST_APOSTROPHE", apostrophe.to_string()),
        ])?;

        let parsed: Vec<(String, String)> = dotenv::from_path_iter(&env_path)?.collect::<std::result::Result<_, _>>()?;
        assert_eq!(
            parsed,
            vec![
                ("BRUTILITY_TEST_LITERAL".to_string(), literal.to_string()),
                ("BRUTILITY_TEST_APOSTROPHE".to_string(), apostrophe.to_string()),
            ]
        );
        Ok(())
    }
}
