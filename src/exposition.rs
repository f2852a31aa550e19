//! Prometheus text exposition rendering.

use std::collections::HashMap;
use std::fmt::Write;

use crate::collector::{CollectorStats, ScrapeOutput};
use crate::metric::Sample;

/// Render one scrape cycle in the text exposition format.
///
/// Families are sorted by metric name with `# HELP`/`# TYPE` written once
/// each; a descriptor with no samples this cycle produces no lines. The
/// exporter's own series are appended under `<namespace>_exporter_`.
pub fn render(output: &ScrapeOutput, namespace: &str, stats: &CollectorStats) -> String {
    let mut by_name: HashMap<&str, Vec<&Sample>> = HashMap::new();
    for sample in &output.samples {
        by_name.entry(sample.desc.fq_name()).or_default().push(sample);
    }

    let mut descriptors: Vec<_> = output.descriptors.iter().collect();
    descriptors.sort_by_key(|d| d.fq_name());

    let mut body = String::with_capacity(output.samples.len() * 80 + 512);
    for desc in descriptors {
        let Some(samples) = by_name.get(desc.fq_name()) else {
            continue;
        };

        writeln!(
            body,
            "# HELP {} {}",
            desc.fq_name(),
            escape_help(desc.help())
        )
        .ok();
        writeln!(body, "# TYPE {} {}", desc.fq_name(), desc.kind().as_str()).ok();

        for sample in samples {
            let labels = format_labels(desc.label_names(), &sample.label_values);
            writeln!(
                body,
                "{}{} {}",
                desc.fq_name(),
                labels,
                format_value(sample.value)
            )
            .ok();
        }
    }

    render_exporter_stats(&mut body, namespace, stats);
    body
}

fn render_exporter_stats(body: &mut String, namespace: &str, stats: &CollectorStats) {
    let series: [(&str, &str, &str, u64); 3] = [
        (
            "exporter_scrapes_total",
            "counter",
            "Number of scrape cycles attempted since startup.",
            stats.scrapes,
        ),
        (
            "exporter_scrape_failures_total",
            "counter",
            "Number of scrape cycles that failed to fetch statistics.",
            stats.scrape_failures,
        ),
        (
            "exporter_statistics",
            "gauge",
            "Number of raw statistics in the last snapshot.",
            stats.last_statistics,
        ),
    ];

    for (name, kind, help, value) in series {
        writeln!(body, "# HELP {}_{} {}", namespace, name, help).ok();
        writeln!(body, "# TYPE {}_{} {}", namespace, name, kind).ok();
        writeln!(body, "{}_{} {}", namespace, name, value).ok();
    }
}

/// Format label pairs for the exposition format.
fn format_labels(names: &[&'static str], values: &[String]) -> String {
    if names.is_empty() || values.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in HELP text.
fn escape_help(help: &str) -> String {
    let mut result = String::with_capacity(help.len());
    for c in help.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition format.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
