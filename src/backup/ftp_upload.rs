// brutility/src/backup/ftp_upload.rs
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use url::Url;

use crate::config::FtpSettings;
use crate::utils::{find_executable, stderr_text};

/// Destination URL for `file_name` on the configured FTP host. `FTP_HOST`
/// may be a bare host (`ftp.example.com`), carry a directory
/// (`ftp.example.com/db`) or be a full `ftp://` / `ftps://` URL.
pub fn ftp_url_for(ftp: &FtpSettings, file_name: &str) -> Result<Url> {
    let host = ftp.host.trim();
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("ftp://{}", host)
    };
    let mut url = Url::parse(&base).with_context(|| format!("Invalid FTP_HOST: {}", ftp.host))?;
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }
    url.join(file_name)
        .with_context(|| format!("Invalid backup file name for FTP upload: {}", file_name))
}

/// curl reads credentials from this config on stdin, keeping them off argv.
pub fn curl_config(ftp: &FtpSettings) -> String {
    let user = format!("{}:{}", ftp.user, ftp.password);
    format!("user = \"{}\"\n", user.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Uploads a file with `curl -T`, creating missing remote directories.
pub fn upload_file_to_ftp(ftp: &FtpSettings, file_path: &Path) -> Result<()> {
    let curl = find_executable("curl")?;
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Backup path has no file name: {}", file_path.display()))?;
    let url = ftp_url_for(ftp, &file_name)?;
    println!("Attempting to upload {} to {}", file_path.display(), url);

    let mut child = Command::new(curl)
        .args(["--silent", "--show-error", "--fail", "--ftp-create-dirs", "--config", "-", "-T"])
        .arg(file_path)
        .arg(url.as_str())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to execute curl for FTP upload")?;

    {
        let mut stdin = child.stdin.take().context("curl stdin was not captured")?;
        stdin
            .write_all(curl_config(ftp).as_bytes())
            .context("Failed to pass FTP credentials to curl")?;
    }

    let output = child.wait_with_output().context("Failed to wait for curl")?;
    if !output.status.success() {
        anyhow::bail!(
            "curl upload to {} failed with status: {}\nStderr: {}",
            url,
            output.status,
            stderr_text(&output)
        );
    }

    println!("✅ Successfully uploaded {} to {}", file_path.display(), url);
    Ok(())
}
