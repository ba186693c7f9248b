//! Compression Controller: renders, measures, and compresses until the page budget holds.
//!
//! # Architecture
//! - Strategies are an ordered table of step functions
//!   `(&RunState, &StepContext) -> Option<RunState>`. A step returns `None` once
//!   it has nothing left to give (a floor is reached, content is already pruned).
//! - One generic loop walks the table. After every step it renders, counts the
//!   real pages, and stops as soon as `pages <= max_pages`.
//! - InitialPrune runs before the first render, only for one-page requests or
//!   content estimated at more than twice the budget.
//! - Bounded by `max_stages` and `max_attempts`. On exhaustion the best attempt
//!   (fewest pages, earliest on ties) comes back with a warning.
//!
//! # spawn_blocking pattern
//! Layout and PDF serialization are CPU-bound. `generate` moves the whole run
//! onto the blocking pool; `generate_blocking` is the synchronous core. Run
//! state is local to one call, so independent requests can run concurrently.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::LayoutError;
use crate::generation::pruner::{prune_document, SectionCaps};
use crate::layout::composer::estimate_pages;
use crate::layout::page_counter::{
    CountSource, MeasuringCounter, PageCounter, PdfPageCounter, DEFAULT_BYTES_PER_PAGE,
};
use crate::layout::renderer::render;
use crate::layout::style::{PageSize, StyleFloors, StyleParameters, StyleSteps};
use crate::models::{JobKeywordSet, ResumeDocument};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Render-and-count cycles per run, including the first render.
    pub max_attempts: usize,
    /// Strategies that may engage per run, including InitialPrune.
    pub max_stages: usize,
    pub defaults: StyleParameters,
    pub floors: StyleFloors,
    pub steps: StyleSteps,
    pub estimate_bytes_per_page: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            max_stages: 5,
            defaults: StyleParameters::default(),
            floors: StyleFloors::default(),
            steps: StyleSteps::default(),
            estimate_bytes_per_page: DEFAULT_BYTES_PER_PAGE,
        }
    }
}

impl CompressionConfig {
    /// Starting style: the defaults, raised to the floors where needed.
    pub fn initial_style(&self) -> StyleParameters {
        self.defaults.clamped_to(&self.floors)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// First render with no compression applied.
    Baseline,
    InitialPrune,
    FontShrink,
    MarginShrink,
    LineSpacingShrink,
    AggressivePrune,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentLevel {
    Full,
    Trimmed,
    Aggressive,
}

/// One render-and-count cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionAttempt {
    pub index: usize,
    pub strategy: Strategy,
    pub style: StyleParameters,
    pub page_count: usize,
    pub count_source: CountSource,
    pub content_level: ContentLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWarning {
    pub max_pages: usize,
    pub page_count: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub document: ResumeDocument,
    pub keywords: JobKeywordSet,
    pub max_pages: usize,
    pub page_size: PageSize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// PDF bytes of the best attempt.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub attempts: Vec<CompressionAttempt>,
    pub budget_met: bool,
    pub warning: Option<BudgetWarning>,
    pub final_style: StyleParameters,
    /// The content actually rendered, after any pruning.
    pub document: ResumeDocument,
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy table
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunState {
    pub style: StyleParameters,
    pub level: ContentLevel,
    pub document: ResumeDocument,
}

pub struct StepContext<'a> {
    pub canonical: &'a ResumeDocument,
    pub keywords: &'a JobKeywordSet,
    pub config: &'a CompressionConfig,
    pub max_pages: usize,
    pub page_size: PageSize,
}

type StepFn = fn(&RunState, &StepContext<'_>) -> Option<RunState>;

const STRATEGIES: [(Strategy, StepFn); 5] = [
    (Strategy::InitialPrune, initial_prune),
    (Strategy::FontShrink, font_shrink),
    (Strategy::MarginShrink, margin_shrink),
    (Strategy::LineSpacingShrink, line_spacing_shrink),
    (Strategy::AggressivePrune, aggressive_prune),
];

fn initial_prune(state: &RunState, ctx: &StepContext<'_>) -> Option<RunState> {
    if state.level != ContentLevel::Full {
        return None;
    }
    let caps = if ctx.max_pages == 1 {
        SectionCaps::single_page()
    } else if estimate_pages(&state.document, &state.style, ctx.page_size)
        > ctx.max_pages.saturating_mul(2)
    {
        SectionCaps::multi_page()
    } else {
        return None;
    };
    Some(RunState {
        style: state.style,
        level: ContentLevel::Trimmed,
        document: prune_document(ctx.canonical, ctx.keywords, &caps),
    })
}

fn font_shrink(state: &RunState, ctx: &StepContext<'_>) -> Option<RunState> {
    let style = state
        .style
        .shrink_font(ctx.config.steps.font_size_pt, ctx.config.floors.font_size_pt)?;
    Some(RunState {
        style,
        ..state.clone()
    })
}

fn margin_shrink(state: &RunState, ctx: &StepContext<'_>) -> Option<RunState> {
    let style = state
        .style
        .shrink_margin(ctx.config.steps.margin_in, ctx.config.floors.margin_in)?;
    Some(RunState {
        style,
        ..state.clone()
    })
}

fn line_spacing_shrink(state: &RunState, ctx: &StepContext<'_>) -> Option<RunState> {
    let style = state
        .style
        .shrink_line_spacing(ctx.config.steps.line_spacing, ctx.config.floors.line_spacing)?;
    Some(RunState {
        style,
        ..state.clone()
    })
}

fn aggressive_prune(state: &RunState, ctx: &StepContext<'_>) -> Option<RunState> {
    if state.level == ContentLevel::Aggressive {
        return None;
    }
    Some(RunState {
        style: state.style,
        level: ContentLevel::Aggressive,
        document: prune_document(ctx.canonical, ctx.keywords, &SectionCaps::aggressive()),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Run bookkeeping
// ────────────────────────────────────────────────────────────────────────────

struct BestAttempt {
    bytes: Vec<u8>,
    page_count: usize,
    style: StyleParameters,
    document: ResumeDocument,
}

/// Attempt trace plus the single retained artifact.
struct Run<P: PageCounter = PdfPageCounter> {
    counter: MeasuringCounter<P>,
    max_pages: usize,
    page_size: PageSize,
    attempts: Vec<CompressionAttempt>,
    best: Option<BestAttempt>,
}

impl<P: PageCounter> Run<P> {
    /// Renders and counts `state`. Returns `true` when the budget is met.
    fn record(&mut self, strategy: Strategy, state: &RunState) -> Result<bool, LayoutError> {
        let rendered = render(&state.document, &state.style, self.page_size)?;
        let measured = self.counter.measure(&rendered.bytes);
        if measured.source == CountSource::Parsed && measured.pages != rendered.laid_out_pages {
            debug!(
                parsed = measured.pages,
                laid_out = rendered.laid_out_pages,
                "Parsed page count differs from layout"
            );
        }

        let attempt = CompressionAttempt {
            index: self.attempts.len(),
            strategy,
            style: state.style,
            page_count: measured.pages,
            count_source: measured.source,
            content_level: state.level,
        };
        info!(
            attempt = attempt.index,
            strategy = ?strategy,
            font_size_pt = state.style.font_size_pt,
            margin_in = state.style.margin_in,
            line_spacing = state.style.line_spacing,
            pages = measured.pages,
            source = ?measured.source,
            "Layout attempt"
        );
        self.attempts.push(attempt);

        // Strictly fewer pages replaces; ties keep the earlier attempt.
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| measured.pages < best.page_count);
        if improves {
            self.best = Some(BestAttempt {
                bytes: rendered.bytes,
                page_count: measured.pages,
                style: state.style,
                document: state.document.clone(),
            });
        }

        Ok(measured.pages <= self.max_pages)
    }

    fn finish(self, budget_met: bool) -> Result<GenerationOutcome, LayoutError> {
        let best = self.best.ok_or_else(|| {
            LayoutError::Internal(anyhow::anyhow!("compression run recorded no attempts"))
        })?;

        let warning = if budget_met {
            None
        } else {
            warn!(
                max_pages = self.max_pages,
                pages = best.page_count,
                attempts = self.attempts.len(),
                "Page budget not met; returning best attempt"
            );
            Some(BudgetWarning {
                max_pages: self.max_pages,
                page_count: best.page_count,
                message: format!(
                    "Could not fit the document within {} page(s); best attempt uses {}",
                    self.max_pages, best.page_count
                ),
            })
        };

        Ok(GenerationOutcome {
            bytes: best.bytes,
            page_count: best.page_count,
            attempts: self.attempts,
            budget_met,
            warning,
            final_style: best.style,
            document: best.document,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CompressionController {
    config: CompressionConfig,
}

impl CompressionController {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Runs the whole compression loop on the current thread.
    ///
    /// Steps:
    /// 1. Validate the request and content
    /// 2. For each strategy in order, step, render, and count until the
    ///    budget holds or the strategy is spent
    /// 3. The first render happens right after InitialPrune (engaged or not)
    /// 4. Stop at `max_stages` engaged strategies or `max_attempts` renders
    pub fn generate_blocking(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, LayoutError> {
        let counter = MeasuringCounter::new(self.config.estimate_bytes_per_page);
        self.generate_with_counter(request, counter)
    }

    /// Same run as `generate_blocking`, measured by `counter`.
    pub fn generate_with_counter<P: PageCounter>(
        &self,
        request: &GenerationRequest,
        counter: MeasuringCounter<P>,
    ) -> Result<GenerationOutcome, LayoutError> {
        if request.max_pages == 0 {
            return Err(LayoutError::InvalidRequest(
                "max_pages must be at least 1".to_string(),
            ));
        }
        request.document.validate()?;

        let ctx = StepContext {
            canonical: &request.document,
            keywords: &request.keywords,
            config: &self.config,
            max_pages: request.max_pages,
            page_size: request.page_size,
        };
        let mut run = Run {
            counter,
            max_pages: request.max_pages,
            page_size: request.page_size,
            attempts: Vec::new(),
            best: None,
        };
        let mut state = RunState {
            style: self.config.initial_style(),
            level: ContentLevel::Full,
            document: request.document.clone(),
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut stages_used = 0;

        for (strategy, step) in STRATEGIES {
            let mut engaged = false;
            while run.attempts.len() < max_attempts {
                if !engaged && stages_used >= self.config.max_stages {
                    break;
                }
                let Some(next) = step(&state, &ctx) else {
                    break;
                };
                if !engaged {
                    stages_used += 1;
                    engaged = true;
                }
                state = next;
                if run.record(strategy, &state)? {
                    return run.finish(true);
                }
            }

            // InitialPrune declined: the first render uses the untouched content.
            if run.attempts.is_empty() && run.record(Strategy::Baseline, &state)? {
                return run.finish(true);
            }
        }

        run.finish(false)
    }

    /// Async entry point; the run executes on the blocking pool.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, LayoutError> {
        let controller = self.clone();
        tokio::task::spawn_blocking(move || controller.generate_blocking(&request))
            .await
            .map_err(|e| {
                LayoutError::Internal(anyhow::anyhow!("spawn_blocking failed in layout generation: {e}"))
            })?
    }
}

/// One-shot convenience with the default configuration.
pub fn generate_blocking(request: &GenerationRequest) -> Result<GenerationOutcome, LayoutError> {
    CompressionController::default().generate_blocking(request)
}

/// Async one-shot convenience with the default configuration.
pub async fn generate(request: GenerationRequest) -> Result<GenerationOutcome, LayoutError> {
    CompressionController::default().generate(request).await
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
