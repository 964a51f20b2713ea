//! Chart definitions: one or more data ranges plotted on a shared
//! time-bucketed axis.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::Ordered;
use super::types::{Aggregator, ChartKind, DateInterval};
use super::ModelError;

/// A chart built from one or more report-backed ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: ChartKind,
    pub ranges: Vec<ChartRange>,
}

impl Chart {
    /// Ranges in ascending display order. The first range defines the
    /// shared axis ticks and the bucket interval for the whole chart.
    pub fn ordered_ranges(&self) -> Vec<&ChartRange> {
        let mut ranges: Vec<&ChartRange> = self.ranges.iter().collect();
        ranges.sort_by_key(|r| r.position);
        ranges
    }

    /// A chart without ranges has nothing to plot.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.ranges.is_empty() {
            return Err(ModelError::ChartWithoutRanges { chart: self.id });
        }
        for range in &self.ranges {
            if range.chart_id != self.id {
                return Err(ModelError::ForeignChild {
                    parent: self.id,
                    child: range.id,
                });
            }
        }
        Ok(())
    }
}

/// One data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRange {
    pub id: Uuid,
    pub chart_id: Uuid,
    /// Report whose dataset and filters feed this range.
    pub report_id: Uuid,
    /// Date/time column bucketed onto the X axis. Must belong to the
    /// report's dataset.
    pub x_column_id: Uuid,
    /// Value column aggregated onto the Y axis.
    pub y_column_id: Uuid,
    pub aggregator: Aggregator,
    /// Bucket width. All ranges of a chart share the first range's
    /// interval; a differing value here is ignored.
    pub interval: DateInterval,
    /// Synthesize zero-valued buckets for empty intervals.
    pub fill_date_gaps: bool,
    /// Display color, passed through to the presentation layer.
    pub color: Option<String>,
    /// Dense 0-based display order among the chart's ranges.
    pub position: u32,
}

impl Ordered for ChartRange {
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}
