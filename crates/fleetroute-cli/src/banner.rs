use fleetroute_config::AppConfig;
use fleetroute_db::RunReport;

/// Print the startup banner with a config and migration summary.
pub fn print_banner(config: &AppConfig, report: &RunReport) {
    for line in banner_lines(config, report) {
        println!("{line}");
    }
}

fn banner_lines(config: &AppConfig, report: &RunReport) -> Vec<String> {
    let version = env!("CARGO_PKG_VERSION");
    let url = format!("http://{}:{}", config.server.host, config.server.port);

    let migrations = if report.is_noop() {
        format!("up to date ({})", report.skipped.len())
    } else {
        format!(
            "{} applied, {} already present",
            report.applied.len(),
            report.skipped.len()
        )
    };

    let width = 64;
    let label_w = 12;
    let value_w = width - label_w - 4; // "│ " + " │"

    let title = format!("FleetRoute v{version}");
    let title_dashes = width - 2 - title.len() - 5; // 2 for ╭╮, 5 for "─── " + " "
    let top = format!("╭─── {title} {}╮", "─".repeat(title_dashes));
    let bottom = format!("╰{}╯", "─".repeat(width - 2));

    let row = |l: &str, r: &str| {
        let r = truncate(r, value_w);
        format!("│ {:<label_w$}{:<value_w$} │", l, r)
    };

    vec![
        top,
        row("", ""),
        row("Gateway", &url),
        row("Database", &config.database.path.display().to_string()),
        row("Scripts", &config.database.migrations_dir.display().to_string()),
        row("Migrations", &migrations),
        row("", ""),
        row("", "Press Ctrl+C to stop"),
        bottom,
    ]
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let tail: String = s
        .chars()
        .rev()
        .take(max.saturating_sub(1))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_one_width() {
        let report = RunReport {
            applied: vec!["001_create_vehicle.sql".into()],
            skipped: vec![],
        };
        let lines = banner_lines(&AppConfig::default(), &report);
        let widths: Vec<_> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{widths:?}");
        assert!(lines.iter().any(|l| l.contains("1 applied, 0 already present")));
    }

    #[test]
    fn long_paths_keep_their_tail() {
        let long = format!("/{}/data.sqlite", "x".repeat(80));
        let cut = truncate(&long, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with("data.sqlite"));
    }
}
