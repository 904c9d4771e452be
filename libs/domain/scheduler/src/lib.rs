// [libs/domain/scheduler/src/lib.rs]
//! Minute-tick strategy evaluator: calendar-window gating and the
//! anti-backflow template (C10).

mod strategy;
mod tick;

pub use strategy::{AntiBackflowParams, CalendarWindow, Mode, Strategy, TemplateType};
pub use tick::{evaluate_tick, ScheduledCommand};
