// brutility/src/utils/progress.rs
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::process::{Command, Output};
use std::time::Duration;

/// Runs `command` to completion behind a terminal spinner.
///
/// The spinner draws on stderr and stays hidden when stderr is not a terminal.
pub fn run_with_spinner(command: &mut Command, message: impl Into<String>) -> io::Result<Output> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = command.spawn().and_then(|child| child.wait_with_output());
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[cfg(unix)]
    #[test]
    fn test_output_and_status_are_passed_through() -> anyhow::Result<()> {
        let output = run_with_spinner(
            Command::new("sh")
                .args(["-c", "echo dumped; echo denied >&2; exit 3"])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            "Dumping orders",
        )?;
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout, b"dumped\n");
        assert_eq!(output.stderr, b"denied\n");
        Ok(())
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let result = run_with_spinner(&mut Command::new("brutility-no-such-program"), "nothing");
        assert!(result.is_err());
    }
}
