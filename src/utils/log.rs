// src/utils/log.rs

//! Step and summary helpers layered over the `log` facade.

/// Log a section header
pub fn header(title: &str) {
    log::info!("=== {} ===", title);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
