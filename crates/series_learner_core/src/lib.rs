pub mod budget;
pub mod dashboard;
pub mod domain;
pub mod format;
pub mod ports;
pub mod service;
pub mod tracking;

pub use budget::{calculate_budget_summary, BudgetStatus, BudgetSummary};
pub use dashboard::{build_dashboard_summary, DashboardSummary, LanguageTotal, RecentLog, TopTitle};
pub use domain::{
    ContentType, Language, NewWatchLog, OwnerKey, Profile, Title, UnitMinutesBounds, WatchLog,
};
pub use ports::{PortError, PortResult, TrackerStore, TrackerTransaction};
pub use service::{
    AddWatchLog, AddedWatchLog, NewTitle, RemovedTitle, RemovedWatchLog, TitleFilter, TitleUpdate,
    Tracker,
};
pub use tracking::{recalculate_title_aggregates, resolve_unit_minutes, TitleAggregates};
