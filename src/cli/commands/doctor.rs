//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::storage::Collection;
use console::style;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&PathBuf>) -> anyhow::Result<()> {
    Output::header("STUD Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let tools = vec![
        check_tool("yt-dlp", "yt-dlp --version", install_hint_ytdlp()),
        check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg()),
        check_tool("ffprobe", "ffprobe -version", install_hint_ffmpeg()),
    ];
    print_section("External Tools", &tools);

    let keys = vec![
        check_api_key(
            "OPENAI_API_KEY",
            settings.openai.api_key.as_deref(),
            "Set with: export OPENAI_API_KEY='sk-...'",
            true,
        ),
        check_api_key(
            "YOUTUBE_API_KEY",
            settings.youtube.api_key.as_deref(),
            "Needed for playlist ingestion. Set with: export YOUTUBE_API_KEY='...'",
            false,
        ),
    ];
    print_section("API Configuration", &keys);

    let dirs = check_storage(&settings.storage_path());
    print_section("Storage", &dirs);

    let config = vec![check_config_file(config_path)];
    print_section("Configuration", &config);

    let checks: Vec<&CheckResult> = tools.iter().chain(&keys).chain(&dirs).chain(&config).collect();
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using STUD.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! STUD is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let mut parts = version_cmd.split_whitespace();
    let Some(cmd) = parts.next() else {
        return CheckResult::error(name, "no command given", hint);
    };

    match Command::new(cmd).args(parts).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check an API key. A missing optional key is only a warning.
fn check_api_key(name: &str, key: Option<&str>, hint: &str, required: bool) -> CheckResult {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask_key(key)))
        }
        _ if required => CheckResult::error(name, "not set", hint),
        _ => CheckResult::warning(name, "not set", hint),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check the storage root and report what it holds.
fn check_storage(root: &Path) -> Vec<CheckResult> {
    if !root.exists() {
        return vec![CheckResult::warning(
            "Storage directory",
            &format!("{} (will be created)", root.display()),
            "Directory will be created on first use",
        )];
    }

    let mut results = vec![CheckResult::ok(
        "Storage directory",
        &format!("{}", root.display()),
    )];

    for collection in [
        Collection::Playlists,
        Collection::Transcripts,
        Collection::Embeddings,
        Collection::Quizzes,
    ] {
        let dir = root.join(collection.dir_name());
        let (count, bytes) = dir_usage(&dir);
        results.push(CheckResult::ok(
            collection.dir_name(),
            &format!("{} file(s), {}", count, format_size(bytes)),
        ));
    }

    results
}

fn dir_usage(dir: &Path) -> (usize, u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };
    entries
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .fold((0, 0), |(count, bytes), m| (count + 1, bytes + m.len()))
}

/// Check if config file exists.
fn check_config_file(path: Option<&PathBuf>) -> CheckResult {
    let config_path = path.cloned().unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: stud config set <section.field> <value>",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_api_key_checks() {
        let ok = check_api_key("OPENAI_API_KEY", Some("sk-abcdefghijklmnop1234"), "", true);
        assert_eq!(ok.status, CheckStatus::Ok);
        assert!(ok.message.contains("sk-abcd...1234"));

        let missing = check_api_key("OPENAI_API_KEY", Some("  "), "set it", true);
        assert_eq!(missing.status, CheckStatus::Error);

        let optional = check_api_key("YOUTUBE_API_KEY", None, "set it", false);
        assert_eq!(optional.status, CheckStatus::Warning);
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("abc"), "***");
    }

    #[test]
    fn test_storage_counts_files() {
        let dir = tempdir().unwrap();
        let missing = check_storage(&dir.path().join("nope"));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].status, CheckStatus::Warning);

        let transcripts = dir.path().join("transcripts");
        std::fs::create_dir_all(&transcripts).unwrap();
        std::fs::write(transcripts.join("a.json"), "{}").unwrap();

        let results = check_storage(dir.path());
        assert_eq!(results.len(), 5);
        let row = results.iter().find(|r| r.name == "transcripts").unwrap();
        assert_eq!(row.message, "1 file(s), 2 B");
    }
}
