use std::time::Duration;

use crate::config::BudgetConfig;

/// Search width carried from one turn to the next.
///
/// Overruns shrink the width quickly (straight to the overrun ceiling, then
/// one step per overrun), turns that finish in time widen it by the growth
/// increment. The width never drops below the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetController {
    width: usize,
    config: BudgetConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthChange {
    pub before: usize,
    pub after: usize,
    pub overrun: bool,
}

impl BudgetController {
    pub fn new(config: &BudgetConfig) -> Self {
        let mut width = config.initial_width.max(config.floor);
        if let Some(cap) = config.cap {
            width = width.min(cap);
        }
        Self {
            width,
            config: config.clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Adjusts the width once the turn's elapsed time is known.
    pub fn record(&mut self, elapsed: Duration, deadline: Duration) -> WidthChange {
        let before = self.width;
        let overrun = elapsed > deadline;

        let after = if overrun {
            let shrunk = if before > self.config.overrun_ceiling {
                self.config.overrun_ceiling
            } else {
                before.saturating_sub(1)
            };
            shrunk.max(self.config.floor)
        } else {
            let grown = before.saturating_add(self.config.growth);
            self.config.cap.map_or(grown, |cap| grown.min(cap))
        };
        self.width = after;

        if overrun {
            tracing::warn!(
                target: "zone_control::budget",
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                deadline_ms = deadline.as_secs_f64() * 1000.0,
                width_before = before,
                width_after = after,
                "budget.width_decreased"
            );
        }

        WidthChange {
            before,
            after,
            overrun,
        }
    }
}
