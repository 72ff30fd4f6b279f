use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {msg} {spinner:.green}";
const SPINNER_TICK_MS: u64 = 200;

/// Spinner for the blocking dataset sources (file, remote sheet, snapshot).
pub fn create_spinner(quiet_mode: bool, msg: &str) -> ProgressBar {
    let spinner = match quiet_mode {
        true => ProgressBar::hidden(),
        false => ProgressBar::new_spinner(),
    };

    spinner.set_message(msg);
    spinner.set_style(ProgressStyle::default_spinner().template(SPINNER_TEMPLATE));
    spinner.enable_steady_tick(SPINNER_TICK_MS);
    spinner.inc(0); // Just to avoid the drawing after the log.

    spinner
}

pub fn finish_spinner(spinner: &ProgressBar, outcome: &str) {
    spinner.finish_with_message(outcome);
}
