//! Progress feedback for the govboard CLI
//!
//! Spinners are suppressed when:
//! - `--quiet` is passed
//! - `GOVBOARD_QUIET=1` is set
//! - stderr is not a TTY (cron, CI, piped output)

use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

static QUIET_MODE: OnceLock<bool> = OnceLock::new();

/// Call once at startup with the --quiet flag value.
pub fn init_quiet_mode(quiet_flag: bool) {
    let is_quiet = quiet_flag
        || std::env::var("GOVBOARD_QUIET").map(|v| v == "1").unwrap_or(false)
        || !std::io::stderr().is_terminal();

    QUIET_MODE.set(is_quiet).ok();
}

pub fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

/// `None` in quiet mode.
pub fn spinner(msg: impl Into<String>) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

pub fn finish_success(pb: Option<ProgressBar>, msg: impl Into<String>) {
    finish(pb, format!("✓ {}", msg.into()));
}

pub fn finish_error(pb: Option<ProgressBar>, msg: impl Into<String>) {
    finish(pb, format!("✗ {}", msg.into()));
}

fn finish(pb: Option<ProgressBar>, line: String) {
    if let Some(pb) = pb {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            pb.set_style(style);
        }
        pb.finish_with_message(line);
    }
}

/// Run `f` under a spinner that ends with `success_msg` or the error.
pub async fn with_spinner_async<T, E: std::fmt::Display>(
    msg: impl Into<String>,
    success_msg: impl FnOnce(&T) -> String,
    f: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, E> {
    let msg = msg.into();
    let pb = spinner(&msg);

    match f.await {
        Ok(result) => {
            finish_success(pb, success_msg(&result));
            Ok(result)
        }
        Err(e) => {
            finish_error(pb, format!("{}: {}", msg, e));
            Err(e)
        }
    }
}
