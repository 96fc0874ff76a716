//! Strictly sequential multi-step workflows with a per-step failure policy.
//!
//! A [`Waterfall`] is a list of named async steps.  Each step is awaited to
//! completion before the next one starts.  When a step fails, its
//! [`StepPolicy`] decides what happens:
//!
//! * [`StepPolicy::Fatal`] – stop here and return the error;
//! * [`StepPolicy::LogAndContinue`] – log a warning and run the next step.
//!
//! [`for_each_serial`] applies the same policy to a loop over a list, one
//! item at a time (e.g. one `clearbreakpoint` per stale breakpoint).
//!
//! # Send futures
//!
//! Step futures are boxed as [`BoxFuture`], which must be `Send` because the
//! session runs each command on the multi-threaded runtime.  Anything a step
//! holds across an `.await` must be `Send` as well.  Borrowing iterators over
//! a response body are the usual trap, so collect ids into a `Vec` before
//! looping over them.

use std::fmt::Display;
use std::future::Future;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

/// What a failed step does to the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Fatal,
    LogAndContinue,
}

/// Outcome of a waterfall that ran to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaterfallReport {
    /// Names of the `LogAndContinue` steps that failed.
    pub tolerated: Vec<&'static str>,
}

struct Step<'a, E> {
    name: &'static str,
    policy: StepPolicy,
    run: BoxFuture<'a, Result<(), E>>,
}

/// An ordered pipeline of named steps.
///
/// Steps are futures, so nothing runs until [`Waterfall::run`] is awaited.
///
/// ```rust
/// # tokio_test::block_on(async {
/// use inspector_bridge::application::pipeline::{StepPolicy, Waterfall};
///
/// let report = Waterfall::<String>::new("demo")
///     .step("first", StepPolicy::LogAndContinue, async { Err("ignored".to_string()) })
///     .step("second", StepPolicy::Fatal, async { Ok(()) })
///     .run()
///     .await
///     .unwrap();
/// assert_eq!(report.tolerated, vec!["first"]);
/// # });
/// ```
pub struct Waterfall<'a, E> {
    name: &'static str,
    steps: Vec<Step<'a, E>>,
}

impl<'a, E: Display> Waterfall<'a, E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step<F>(mut self, name: &'static str, policy: StepPolicy, run: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'a,
    {
        self.steps.push(Step {
            name,
            policy,
            run: Box::pin(run),
        });
        self
    }

    /// Runs every step in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first `Fatal` step that fails; later steps
    /// never start.
    pub async fn run(self) -> Result<WaterfallReport, E> {
        let mut report = WaterfallReport::default();
        for step in self.steps {
            debug!(waterfall = self.name, step = step.name, "running step");
            match (step.run.await, step.policy) {
                (Ok(()), _) => {}
                (Err(e), StepPolicy::Fatal) => {
                    warn!(waterfall = self.name, step = step.name, "step failed: {e}");
                    return Err(e);
                }
                (Err(e), StepPolicy::LogAndContinue) => {
                    warn!(waterfall = self.name, step = step.name, "step failed, continuing: {e}");
                    report.tolerated.push(step.name);
                }
            }
        }
        Ok(report)
    }
}

/// Runs `f` on each item in turn, awaiting each before starting the next.
///
/// Returns the number of tolerated failures.
///
/// # Errors
///
/// Under [`StepPolicy::Fatal`], the first failure is returned and the
/// remaining items are skipped.
pub async fn for_each_serial<T, E, F, Fut>(
    label: &str,
    items: impl IntoIterator<Item = T>,
    policy: StepPolicy,
    mut f: F,
) -> Result<usize, E>
where
    E: Display,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut tolerated = 0;
    for item in items {
        if let Err(e) = f(item).await {
            match policy {
                StepPolicy::Fatal => return Err(e),
                StepPolicy::LogAndContinue => {
                    warn!("{label}: {e}");
                    tolerated += 1;
                }
            }
        }
    }
    Ok(tolerated)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
