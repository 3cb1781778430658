// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `busline check` command implementation.
//!
//! Completes the configuration and loads the handlers the way `start` would,
//! without touching the broker, and prints what it found.

use std::io::IsTerminal;

use busline_config::{LoadedConfig, RuntimeConfig};
use busline_plugin::LoadReport;
use busline_router::CallbackRegistry;

use crate::serve::load_handlers;

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

/// Runs the checks and prints them. Returns `false` if any check failed.
pub fn run_check(loaded: &LoadedConfig) -> bool {
    let report = load_handlers(&loaded.config.callbacks);
    let results = collect_results(loaded, &report);
    print_results(&results, std::io::stdout().is_terminal());
    !results.iter().any(|r| r.status == CheckStatus::Fail)
}

pub(crate) fn collect_results(loaded: &LoadedConfig, report: &LoadReport) -> Vec<CheckResult> {
    let config = &loaded.config;
    let mut results = vec![
        check_source(loaded),
        check_broker(config),
        check_password(config),
        CheckResult::new(
            "subscription",
            CheckStatus::Pass,
            format!(
                "{} at qos {}",
                config.subscription.filter(),
                config.subscription.qos
            ),
        ),
    ];
    results.push(check_handlers(report));
    for err in &report.errors {
        results.push(CheckResult::new(
            err.unit.display().to_string(),
            CheckStatus::Warn,
            format!("skipped: {}", err.reason),
        ));
    }
    results
}

fn check_source(loaded: &LoadedConfig) -> CheckResult {
    match &loaded.source {
        Some(path) => CheckResult::new("config", CheckStatus::Pass, path.display().to_string()),
        None => CheckResult::new(
            "config",
            CheckStatus::Warn,
            "no config file found, using defaults and environment",
        ),
    }
}

fn check_broker(config: &RuntimeConfig) -> CheckResult {
    let endpoint = format!(
        "{}://{}:{} (MQTT {})",
        config.session.transport, config.broker.ip, config.broker.port, config.session.protocol
    );
    CheckResult::new("broker", CheckStatus::Pass, endpoint)
}

fn check_password(config: &RuntimeConfig) -> CheckResult {
    if config.needs_password() {
        CheckResult::new("password", CheckStatus::Warn, "will be prompted at start")
    } else if config.broker.password.is_some() {
        CheckResult::new("password", CheckStatus::Pass, "configured")
    } else {
        CheckResult::new("password", CheckStatus::Pass, "not required")
    }
}

fn check_handlers(report: &LoadReport) -> CheckResult {
    let registry = CallbackRegistry::new();
    registry.add_all(report.handlers.iter().cloned());
    let names = registry.message_names();

    if names.is_empty() {
        return CheckResult::new(
            "handlers",
            CheckStatus::Warn,
            "none loaded, every inbound command would be dropped",
        );
    }
    let mut message = format!(
        "{} handler(s) for {}",
        report.handlers.len(),
        names.join(", ")
    );
    if !report.plugins.is_empty() {
        message.push_str(&format!(" ({} plugin package(s))", report.plugins.len()));
    }
    if report.disabled > 0 {
        message.push_str(&format!(", {} disabled", report.disabled));
    }
    CheckResult::new("handlers", CheckStatus::Pass, message)
}

fn print_results(results: &[CheckResult], use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  busline check");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in results {
        let tag = match (result.status, use_color) {
            (CheckStatus::Pass, true) => "✓".green().to_string(),
            (CheckStatus::Warn, true) => "!".yellow().to_string(),
            (CheckStatus::Fail, true) => "✗".red().to_string(),
            (CheckStatus::Pass, false) => "[OK]  ".to_string(),
            (CheckStatus::Warn, false) => "[WARN]".to_string(),
            (CheckStatus::Fail, false) => "[FAIL]".to_string(),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("    {tag} {:<20} {}", result.name, result.message);
    }

    println!();
    match issues {
        0 => println!("  All checks passed."),
        1 => println!("  1 issue found."),
        n => println!("  {n} issues found."),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn loaded(toml: &str, source: Option<&str>) -> LoadedConfig {
        LoadedConfig {
            config: busline_config::complete_str(toml).unwrap(),
            source: source.map(PathBuf::from),
        }
    }

    fn status_of<'a>(results: &'a [CheckResult], name: &str) -> &'a CheckResult {
        results.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn defaults_without_handlers_warn() {
        let loaded = loaded("", None);
        let results = collect_results(&loaded, &LoadReport::default());
        assert_eq!(status_of(&results, "config").status, CheckStatus::Warn);
        assert_eq!(status_of(&results, "broker").status, CheckStatus::Pass);
        assert_eq!(status_of(&results, "handlers").status, CheckStatus::Warn);
        assert!(results.iter().all(|r| r.status != CheckStatus::Fail));
    }

    #[test]
    fn broker_line_names_endpoint_and_protocol() {
        let loaded = loaded(
            "[mqtt_broker]\nip = \"10.0.0.5\"\n[mqtt_session]\ntransport = \"websockets\"\n",
            Some("/etc/busline.toml"),
        );
        let results = collect_results(&loaded, &LoadReport::default());
        let broker = status_of(&results, "broker");
        assert_eq!(broker.status, CheckStatus::Pass);
        assert_eq!(broker.message, "websockets://10.0.0.5:1883 (MQTT 3.1.1)");
    }

    #[test]
    fn prompted_password_is_a_warning() {
        let loaded = loaded("[mqtt_broker]\npassword_required = true\n", None);
        let results = collect_results(&loaded, &LoadReport::default());
        assert_eq!(status_of(&results, "password").status, CheckStatus::Warn);
    }

    #[test]
    fn subscription_shows_filter() {
        let loaded = loaded("[subscription]\nbase_topic = \"loung\"\n", None);
        let results = collect_results(&loaded, &LoadReport::default());
        assert_eq!(status_of(&results, "subscription").message, "loung/+ at qos 0");
    }
}
