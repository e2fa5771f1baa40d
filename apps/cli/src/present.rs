//! Rendering of query outcomes for the terminal and the chat front end.

use std::fmt::Write as _;

use color_eyre::eyre::Result;
use herdbook_core::QueryOutcome;

/// Output format selected with `--format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Plain sentences and indented lists.
    Text,
    /// `<ul><li>` markup as consumed by the chat front end.
    Html,
    /// The raw outcome as one JSON object.
    Json,
}

/// Render `outcome` in `format`.
pub(crate) fn render(outcome: &QueryOutcome, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => text(outcome),
        OutputFormat::Html => html(outcome),
        OutputFormat::Json => serde_json::to_string(outcome)?,
    })
}

fn text(outcome: &QueryOutcome) -> String {
    let mut out = outcome.message();

    match outcome {
        QueryOutcome::Lookup { rows, .. } => {
            for (i, pairs) in rows.iter().enumerate() {
                let _ = write!(out, "\n\nRecord {}:", i + 1);
                for (key, value) in pairs {
                    let _ = write!(out, "\n  {key}: {value}");
                }
            }
        }
        QueryOutcome::Distribution(d) => {
            for entry in &d.entries {
                let _ = write!(
                    out,
                    "\n  {:<24} {:>6.2}%  ({})",
                    entry.breed, entry.percentage, entry.count
                );
            }
            if let Some(notice) = d.notice() {
                let _ = write!(out, "\n{notice}");
            }
        }
        QueryOutcome::Region(r) => {
            for s in &r.species {
                let _ = write!(out, "\n  {}: {}", s.species, s.count);
            }
        }
        _ => {}
    }

    out
}

fn html(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Lookup { identifier, rows } => {
            let items = rows
                .iter()
                .flatten()
                .map(|(key, value)| format!("{}: {}", escape(key), escape(value)));
            format!(
                "Here is the information for animal {}: {}",
                escape(identifier),
                list(items)
            )
        }
        QueryOutcome::Distribution(d) => {
            let mut out = String::new();
            if let Some(notice) = d.notice() {
                out.push_str(&notice);
                out.push('\n');
            }
            let items = d
                .entries
                .iter()
                .map(|e| format!("{}: {:.2}%", escape(&e.breed), e.percentage));
            let _ = write!(
                out,
                "Breed distribution for {}: {}",
                escape(&d.species),
                list(items)
            );
            out
        }
        QueryOutcome::Species { names } => format!(
            "Species in the registry: {}",
            list(names.iter().map(|n| escape(n)))
        ),
        QueryOutcome::Region(r) => format!(
            "{} {}",
            escape(&outcome.message()),
            list(
                r.species
                    .iter()
                    .map(|s| format!("{}: {}", escape(&s.species), s.count))
            )
        ),
        _ => escape(&outcome.message()),
    }
}

fn list(items: impl Iterator<Item = String>) -> String {
    let mut out = String::from("<ul>");
    for item in items {
        let _ = write!(out, "\n<li>{item}</li>");
    }
    out.push_str("\n</ul>");
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdbook_core::{BreedDistribution, BreedShare, Parameter};

    #[test]
    fn lookup_renders_as_list_items() {
        let outcome = QueryOutcome::Lookup {
            identifier: "IT123".into(),
            rows: vec![vec![
                ("Animal ID".into(), "IT123".into()),
                ("Breed".into(), "Holstein".into()),
            ]],
        };
        let markup = html(&outcome);
        assert!(markup.starts_with("Here is the information for animal IT123: <ul>"));
        assert!(markup.contains("<li>Breed: Holstein</li>"));
        assert!(markup.ends_with("</ul>"));
    }

    #[test]
    fn truncated_distribution_carries_notice() {
        let outcome = QueryOutcome::Distribution(BreedDistribution {
            species: "Cattle".into(),
            total: 20,
            entries: vec![BreedShare {
                breed: "Holstein".into(),
                count: 9,
                percentage: 45.0,
            }],
            truncated: true,
        });
        assert!(text(&outcome).contains("showing the top 10"));
        assert!(html(&outcome).contains("<li>Holstein: 45.00%</li>"));
    }

    #[test]
    fn failures_render_their_sentence() {
        let outcome = QueryOutcome::MissingParameter {
            parameter: Parameter::Identifier,
        };
        assert_eq!(text(&outcome), "Please provide a valid Animal ID.");
        let json = render(&outcome, OutputFormat::Json).expect("json");
        assert!(json.contains("\"missing_parameter\""));
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(escape("<b>&"), "&lt;b&gt;&amp;");
    }
}
