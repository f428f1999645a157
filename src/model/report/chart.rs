use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How a chart should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
    Line,
}

/// One named sequence of values, aligned with the chart's labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<u64>,
}

/// A renderable chart: everything the frontend needs to draw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// A single-series chart from label-to-count tallies.
    /// The `BTreeMap` keeps label order deterministic.
    pub fn from_tallies<K: Display>(
        kind: ChartKind,
        title: impl Into<String>,
        series_name: impl Into<String>,
        tallies: &BTreeMap<K, u64>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            labels: tallies.keys().map(|key| key.to_string()).collect(),
            series: vec![Series {
                name: series_name.into(),
                data: tallies.values().copied().collect(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_keep_numeric_order() {
        let mut tallies = BTreeMap::new();
        tallies.insert(100_u32, 1);
        tallies.insert(25, 3);
        tallies.insert(9, 2);

        let chart = ChartSpec::from_tallies(ChartKind::Pie, "Ages", "participants", &tallies);
        assert_eq!(chart.labels, ["9", "25", "100"]);
        assert_eq!(chart.series[0].data, [2, 3, 1]);
        assert_eq!(chart.series[0].name, "participants");
    }
}
