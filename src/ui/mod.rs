pub mod icons;
pub mod progress;
pub mod render;

pub use progress::{PipelineUI, UiMode};
pub use render::{format_duration, render_pipeline, render_run, render_session};
