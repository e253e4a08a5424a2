pub mod collector;
pub mod extract;
pub mod metric;

pub use collector::ResultCollector;
pub use metric::{Metric, MetricSet, TextValue};
