// [libs/domain/scheduler/src/strategy.rs]
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateType {
    AntiBackflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntiBackflowParams {
    pub threshold_kw: f64,
    pub min_kw: f64,
    pub max_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWindow {
    pub date: NaiveDate,
    pub enabled: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Per-station policy (spec.md §3 `Strategy`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub tenant_id: String,
    pub station_id: String,
    pub mode: Mode,
    pub enabled: bool,
    pub template_type: TemplateType,
    pub template_params: AntiBackflowParams,
    pub calendar_windows: Vec<CalendarWindow>,
}

impl Strategy {
    /// A calendar window covers `date`/`time_of_day` when it is `enabled`
    /// and `[start_time, end_time)` contains the minute (spec.md §4.10).
    pub fn window_active_at(&self, date: NaiveDate, time_of_day: NaiveTime) -> bool {
        self.calendar_windows
            .iter()
            .any(|w| w.date == date && w.enabled && w.start_time <= time_of_day && time_of_day < w.end_time)
    }
}
