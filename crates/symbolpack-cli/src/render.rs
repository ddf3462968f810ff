use std::path::Path;

use symbolpack_cache::LockFile;
use symbolpack_resolver::ResolutionReport;

use crate::settings::Settings;

pub(crate) fn format_report_lines(report: &ResolutionReport) -> Vec<String> {
    let mut lines = vec![format!(
        "resolved {} package(s) ({} download(s), {} feed quer{})",
        report.packages.len(),
        report.downloads,
        report.feed_queries,
        if report.feed_queries == 1 { "y" } else { "ies" }
    )];
    if report.reused_lock {
        lines.push("lock file reused".to_string());
    }

    let width = report
        .packages
        .keys()
        .map(|id| id.len())
        .max()
        .unwrap_or(0);
    for package in report.packages.values() {
        lines.push(format!(
            "  {:<width$}  {}",
            package.package_id, package.version
        ));
    }

    if !report.conflicts.is_empty() {
        lines.push("conflicts:".to_string());
        for conflict in &report.conflicts {
            lines.push(format!(
                "  {}: requested >= {}, resolved {} (best available {})",
                conflict.package_id, conflict.requested, conflict.resolved, conflict.best_available
            ));
        }
    }
    if !report.warnings.is_empty() {
        lines.push("warnings:".to_string());
        lines.extend(report.warnings.iter().map(|warning| format!("  {warning}")));
    }

    lines.push(format!("lock file: {}", report.lock_path.display()));
    lines
}

pub(crate) fn format_lock_lines(lock: &LockFile, path: &Path) -> Vec<String> {
    let mut lines = vec![
        format!("lock file: {}", path.display()),
        format!("app: {} ({}) by {}", lock.app_name, lock.app_id, lock.publisher),
        format!("runtime: {}", display_or_dash(&lock.runtime)),
        format!(
            "application: {}",
            display_or_dash(lock.application_version.as_deref().unwrap_or(""))
        ),
        format!(
            "platform: {}",
            display_or_dash(lock.platform_version.as_deref().unwrap_or(""))
        ),
        format!("updated: {}", lock.updated_at_unix),
        "feeds:".to_string(),
    ];
    lines.extend(lock.feeds.iter().map(|feed| format!("  {feed}")));
    lines.push(format!("packages ({}):", lock.packages.len()));
    lines.extend(
        lock.packages
            .iter()
            .map(|(id, version)| format!("  {id} {version}")),
    );
    lines
}

pub(crate) fn format_doctor_lines(settings: &Settings) -> Vec<String> {
    let mut lines = vec![
        format!("cache: {}", settings.cache_root.display()),
        format!(
            "config: {}{}",
            settings.config_path.display(),
            if settings.config_path.is_file() {
                ""
            } else {
                " (not found, using defaults)"
            }
        ),
        format!("timeout: {}s", settings.config.timeout_secs()),
        "feeds:".to_string(),
    ];
    lines.extend(
        settings
            .config
            .effective_feeds(&[])
            .into_iter()
            .map(|feed| format!("  {feed}")),
    );
    lines
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
