pub mod build;
pub mod model;
pub mod render;
pub mod sections;

pub use build::build;
pub use model::{Report, RunMetadata, SectionEntry, ToolInfo};
