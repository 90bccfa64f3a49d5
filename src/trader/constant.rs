//! General constant enums used in the chart engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Chart timeframe. The base timeframe is the one the raw feed arrives in,
/// every coarser one is derived by bucket aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 minute
    #[serde(rename = "1m")]
    Minute1,
    /// 5 minutes
    #[serde(rename = "5m")]
    Minute5,
    /// 15 minutes
    #[serde(rename = "15m")]
    Minute15,
    /// 1 hour
    #[serde(rename = "1h")]
    Hour1,
    /// 4 hours
    #[serde(rename = "4h")]
    Hour4,
    /// Daily
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    /// Get timeframe value string
    pub fn value(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1 min",
            Timeframe::Minute5 => "5 min",
            Timeframe::Minute15 => "15 min",
            Timeframe::Hour1 => "1 hour",
            Timeframe::Hour4 => "4 hours",
            Timeframe::Day1 => "1 day",
        }
    }

    /// Number of minutes covered by one bar
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Day1 => 1440,
        }
    }

    /// Bucket width in milliseconds
    pub fn bucket_ms(&self) -> i64 {
        self.minutes() * 60_000
    }

    /// Short timeframes keep the viewport pinned to the latest bar by default
    pub fn is_short(&self) -> bool {
        self.minutes() <= 15
    }

    /// Parse a value string such as "15m"
    pub fn from_value(value: &str) -> Option<Timeframe> {
        Timeframe::all().into_iter().find(|tf| tf.value() == value)
    }

    /// Get all timeframes, finest first
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Day1,
        ]
    }
}

impl FromStr for Timeframe {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Timeframe::from_value(value).ok_or_else(|| ChartError::UnknownTimeframe(value.to_string()))
    }
}

/// How the main series is painted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Candles,
    Line,
    Area,
}

impl ChartMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChartMode::Candles => "Candles",
            ChartMode::Line => "Line",
            ChartMode::Area => "Area",
        }
    }

    pub fn all() -> Vec<ChartMode> {
        vec![ChartMode::Candles, ChartMode::Line, ChartMode::Area]
    }
}

/// Kind of mutation carried by a store change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Reset,
    Append,
    Timeframe,
    Instrument,
    Events,
}

/// Where an indicator is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    /// Drawn over the price pane
    Overlay,
    /// Drawn in its own pane below the price pane
    Panel,
}

/// Output shape of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Line,
    Band,
    Oscillator,
    Macd,
}

/// Line style shared by indicators and drawing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Dash and gap length in pixels, `None` for a solid line
    pub fn pattern(&self) -> Option<(f32, f32)> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some((6.0, 4.0)),
            LineStyle::Dotted => Some((1.5, 3.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_bucket_ms() {
        assert_eq!(Timeframe::Minute1.bucket_ms(), 60_000);
        assert_eq!(Timeframe::Hour4.bucket_ms(), 4 * 3_600_000);
        assert_eq!(Timeframe::Day1.bucket_ms(), 86_400_000);
    }

    #[test]
    fn test_timeframe_from_value() {
        for tf in Timeframe::all() {
            assert_eq!(Timeframe::from_value(tf.value()), Some(tf));
        }
        assert_eq!(Timeframe::from_value("2m"), None);

        assert_eq!("4h".parse::<Timeframe>().ok(), Some(Timeframe::Hour4));
        let err = "2m".parse::<Timeframe>().unwrap_err();
        assert!(matches!(err, ChartError::UnknownTimeframe(value) if value == "2m"));
    }

    #[test]
    fn test_timeframe_serde_uses_value() {
        let json = serde_json::to_string(&Timeframe::Minute15).unwrap();
        assert_eq!(json, "\"15m\"");
    }

    #[test]
    fn test_line_style_pattern() {
        assert!(LineStyle::Solid.pattern().is_none());
        assert!(LineStyle::Dashed.pattern().is_some());
    }
}
