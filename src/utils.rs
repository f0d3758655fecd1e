use chrono::Local;

pub fn human(b: u64) -> String {
    use humansize::{format_size, BINARY};
    format_size(b, BINARY)
}

/// Timestamp prefix for log-file lines.
pub fn log_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn print_banner(out: &crate::output::OutputCtx) {
    use colored::Colorize;
    out.println(
        &format!(
            " ❄ Coldpack v{}  — verifiable cold-storage archives ",
            env!("CARGO_PKG_VERSION")
        )
        .black()
        .on_cyan()
        .bold()
        .to_string(),
    );
    out.println("");
}
