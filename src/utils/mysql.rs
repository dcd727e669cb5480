// brutility/src/utils/mysql.rs
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::ConnectionParams;
use crate::errors::Result;

/// Writes the password into a private option file for `--defaults-extra-file`,
/// so it never appears on the command line and the client never prompts.
///
/// The file is removed when the returned handle is dropped.
pub fn option_file(params: &ConnectionParams) -> Result<NamedTempFile> {
    // tempfile creates the file readable by the owner only.
    let mut file = tempfile::Builder::new().prefix("brutility-my-").suffix(".cnf").tempfile()?;
    writeln!(file, "[client]")?;
    writeln!(file, "password=\"{}\"", escape_option_value(&params.password))?;
    file.as_file().sync_all()?;
    Ok(file)
}

fn escape_option_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Arguments shared by `mysqldump` and `mysql`. `--defaults-extra-file` must
/// come first.
pub fn connection_args(option_file: &Path, params: &ConnectionParams) -> Vec<OsString> {
    let mut defaults = OsString::from("--defaults-extra-file=");
    defaults.push(option_file.as_os_str());
    vec![
        defaults,
        "-h".into(),
        params.host.clone().into(),
        "-u".into(),
        params.user.clone().into(),
        params.db_name.clone().into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn params() -> ConnectionParams {
        ConnectionParams {
            db_name: "orders".into(),
            user: "root".into(),
            password: "p\"a\\ss".into(),
            host: "db.internal".into(),
        }
    }

    #[test]
    fn test_password_only_in_option_file() -> anyhow::Result<()> {
        let file = option_file(&params())?;
        let content = fs::read_to_string(file.path())?;
        assert_eq!(content, "[client]\npassword=\"p\\\"a\\\\ss\"\n");

        let args = connection_args(file.path(), &params());
        assert!(args[0].to_string_lossy().starts_with("--defaults-extra-file="));
        assert_eq!(&args[1..], &["-h", "db.internal", "-u", "root", "orders"].map(OsString::from));
        assert!(args.iter().all(|a| !a.to_string_lossy().contains("p\"a")));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_option_file_is_private() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let file = option_file(&params())?;
        assert_eq!(fs::metadata(file.path())?.permissions().mode() & 0o077, 0);
        Ok(())
    }
}
