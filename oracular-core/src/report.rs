//! Run diagnostics and ratio listings
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::classify::ClassCounts;
use crate::deps::Propagation;
use crate::ratio::RatioSet;
use crate::search::Boundary;
use crate::Plan;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one classification run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassificationSummary {
    pub threshold: f64,
    pub target_slowdown: f64,
    pub baseline_cost: u128,
    pub target_cost: f64,
    /// Cost at the chosen threshold before propagation and unmeasured methods
    pub search_cost: u128,
    /// Cost of the written classification
    pub predicted_cost: u128,
    pub predicted_slowdown: f64,
    pub boundary: Boundary,
    pub propagation: Propagation,
    pub ranked_methods: usize,
    pub classified_methods: usize,
    pub counts: ClassCounts,
    /// Forced methods with no cost in either run
    pub unpriced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl ClassificationSummary {
    pub fn new(plan: &Plan, target_slowdown: f64, propagation: Propagation) -> Self {
        let baseline = plan.baseline_cost as f64;
        ClassificationSummary {
            threshold: plan.choice.threshold,
            target_slowdown,
            baseline_cost: plan.baseline_cost,
            target_cost: target_slowdown * baseline,
            search_cost: plan.choice.predicted_cost,
            predicted_cost: plan.predicted_cost,
            predicted_slowdown: plan.predicted_cost as f64 / baseline,
            boundary: plan.choice.boundary,
            propagation,
            ranked_methods: plan.ratios.ratios.len(),
            classified_methods: plan.classification.len(),
            counts: plan.classification.counts(),
            unpriced: plan.unpriced,
            output: None,
        }
    }

    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }
}

/// Render a summary as text output
pub fn render_text(summary: &ClassificationSummary) -> String {
    let mut output = String::new();
    let counts = &summary.counts;

    output.push_str(&format!(
        "Target slowdown:    {:.2}x (cost {:.0})\n",
        summary.target_slowdown, summary.target_cost
    ));
    output.push_str(&format!(
        "Selected threshold: {} ({})\n",
        summary.threshold,
        boundary_str(summary.boundary)
    ));
    output.push_str(&format!(
        "Predicted cost:     {} ({:.2}x of baseline {})\n",
        summary.predicted_cost, summary.predicted_slowdown, summary.baseline_cost
    ));
    if summary.search_cost != summary.predicted_cost {
        output.push_str(&format!(
            "  at threshold:     {} before propagation\n",
            summary.search_cost
        ));
    }
    output.push_str(&format!(
        "Methods:            {} classified, {} ranked\n",
        summary.classified_methods, summary.ranked_methods
    ));
    output.push_str(&format!(
        "  2-object:            {}\n",
        counts.object_sensitive
    ));
    output.push_str(&format!(
        "  context-insensitive: {}\n",
        counts.context_insensitive
    ));
    output.push_str(&format!(
        "  propagated ({}): {}\n",
        summary.propagation.as_str(),
        counts.propagated
    ));
    if counts.missing > 0 {
        output.push_str(&format!(
            "  missing precision data: {}\n",
            counts.missing
        ));
    }
    if counts.pattern_forced > 0 {
        output.push_str(&format!(
            "  forced by pattern:   {}\n",
            counts.pattern_forced
        ));
    }
    if counts.unmeasured > 0 {
        output.push_str(&format!("  unmeasured:          {}\n", counts.unmeasured));
    }
    if summary.unpriced > 0 {
        output.push_str(&format!("  unpriced:            {}\n", summary.unpriced));
    }
    if let Some(ref path) = summary.output {
        output.push_str(&format!("Output:             {}\n", path.display()));
    }

    output
}

/// Render a summary as JSON output
pub fn render_json(summary: &ClassificationSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}

fn boundary_str(boundary: Boundary) -> &'static str {
    match boundary {
        Boundary::Minimum => "target at or below cheapest selection",
        Boundary::Maximum => "target at or above costliest selection",
        Boundary::Interior => "closest match",
    }
}

/// One row of the ratio listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatioRow {
    pub method: String,
    pub ratio: f64,
}

/// Measured methods ordered by ratio ascending, ties by id
pub fn ratio_rows(ratios: &RatioSet) -> Vec<RatioRow> {
    ratios
        .ranked()
        .into_iter()
        .map(|(method, ratio)| RatioRow {
            method: method.to_string(),
            ratio,
        })
        .collect()
}

/// Render the ratio listing as text
pub fn render_ratio_table(rows: &[RatioRow]) -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<12} {}\n", "RATIO", "METHOD"));
    for row in rows {
        output.push_str(&format!("{:<12.6} {}\n", row.ratio, row.method));
    }
    output
}

/// Render the ratio listing as JSON
pub fn render_ratio_json(rows: &[RatioRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactMap;
    use crate::ratio::compute_ratios;

    fn facts(entries: &[(&str, u64)]) -> FactMap {
        entries.iter().map(|(m, v)| (m.to_string(), *v)).collect()
    }

    fn summary() -> ClassificationSummary {
        ClassificationSummary {
            threshold: 0.2,
            target_slowdown: 3.0,
            baseline_cost: 150,
            target_cost: 450.0,
            search_cost: 450,
            predicted_cost: 450,
            predicted_slowdown: 3.0,
            boundary: Boundary::Minimum,
            propagation: Propagation::OneHop,
            ranked_methods: 2,
            classified_methods: 3,
            counts: ClassCounts {
                object_sensitive: 2,
                context_insensitive: 1,
                missing: 1,
                ..ClassCounts::default()
            },
            unpriced: 0,
            output: None,
        }
    }

    #[test]
    fn test_render_text_mentions_threshold_and_missing() {
        let text = render_text(&summary());
        assert!(text.contains("Selected threshold: 0.2"));
        assert!(text.contains("missing precision data: 1"));
        assert!(!text.contains("unmeasured"));
        assert!(!text.contains("Output:"));
        assert!(!text.contains("before propagation"));
    }

    #[test]
    fn test_render_text_shows_search_cost_when_propagation_adds_cost() {
        let summary = ClassificationSummary {
            predicted_cost: 500,
            predicted_slowdown: 500.0 / 150.0,
            ..summary()
        };
        let text = render_text(&summary);
        assert!(text.contains("Predicted cost:     500 (3.33x of baseline 150)"));
        assert!(text.contains("at threshold:     450 before propagation"));
    }

    #[test]
    fn test_render_json_is_parseable() {
        let json = render_json(&summary().with_output(PathBuf::from("out/temp.facts")));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["threshold"], 0.2);
        assert_eq!(value["baseline_cost"], 150);
        assert_eq!(value["search_cost"], 450);
        assert_eq!(value["predicted_cost"], 450);
        assert_eq!(value["propagation"], "one-hop");
        assert_eq!(value["boundary"], "minimum");
        assert_eq!(value["counts"]["missing"], 1);
        assert_eq!(value["output"], "out/temp.facts");
    }

    #[test]
    fn test_ratio_rows_sorted_ascending() {
        let ratios = compute_ratios(
            &facts(&[("b", 10), ("a", 10), ("z", 0)]),
            &facts(&[("b", 3), ("a", 7), ("z", 1)]),
        );
        let rows = ratio_rows(&ratios);
        let methods: Vec<&str> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["z", "b", "a"]);

        let table = render_ratio_table(&rows);
        assert_eq!(table.lines().count(), 4);
        assert!(table.lines().nth(1).unwrap().starts_with("0.000000"));
    }
}
