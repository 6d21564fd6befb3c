// Verdict Module
// Result aggregation organized into:
// - aggregation: raw backend response -> immutable Verdict
// - presentation: display rules (classes, confidence bands, chart, bars, source visibility)

pub mod aggregation;
pub mod presentation;

pub use aggregation::{to_verdict, AggregationError};
pub use presentation::{
    chart_slices,
    confidence_band,
    displayed_source,
    highlight_attribution,
    metric_bars,
    parse_dimensions,
    presentation_class,
    Attribution,
    ChartSlice,
    ConfidenceBand,
    MetricBar,
    PresentationClass,
    VerdictView,
};
