// Page-budgeted layout: metrics, styling, line breaking, pagination, PDF output,
// page counting, and the compression loop that ties them together.
// CPU-bound generation must run inside tokio::task::spawn_blocking.

pub mod composer;
pub mod controller;
pub mod font_metrics;
pub mod line_breaker;
pub mod page_counter;
pub mod renderer;
pub mod style;

// Re-export the public API consumed by the driver and library callers.
pub use composer::estimate_pages;
pub use controller::{
    generate, generate_blocking, BudgetWarning, CompressionAttempt, CompressionConfig,
    CompressionController, ContentLevel, GenerationOutcome, GenerationRequest, Strategy,
};
pub use page_counter::{
    CountSource, MeasuringCounter, PageCounter, PdfPageCounter, SizeEstimateCounter,
};
pub use renderer::{render, RenderedDocument};
pub use style::{PageSize, StyleFloors, StyleParameters, StyleSteps};
