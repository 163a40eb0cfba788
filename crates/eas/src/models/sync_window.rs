//! Per-folder sync window (ActiveSync FilterType)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How far back a folder is synchronized.
///
/// The wire code is the FilterType value. Ordering is by time span, so
/// `All` compares greater than every bounded window even though its wire
/// code is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncWindow {
    All,
    OneDay,
    ThreeDays,
    #[default]
    OneWeek,
    TwoWeeks,
    OneMonth,
}

/// Unit for presenting a window to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWindowUnit {
    All,
    Days,
    Weeks,
    Months,
}

impl SyncWindow {
    /// FilterType value sent in Sync options
    pub fn code(&self) -> u32 {
        match self {
            SyncWindow::All => 0,
            SyncWindow::OneDay => 1,
            SyncWindow::ThreeDays => 2,
            SyncWindow::OneWeek => 3,
            SyncWindow::TwoWeeks => 4,
            SyncWindow::OneMonth => 5,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(SyncWindow::All),
            1 => Some(SyncWindow::OneDay),
            2 => Some(SyncWindow::ThreeDays),
            3 => Some(SyncWindow::OneWeek),
            4 => Some(SyncWindow::TwoWeeks),
            5 => Some(SyncWindow::OneMonth),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SyncWindow::OneDay => 0,
            SyncWindow::ThreeDays => 1,
            SyncWindow::OneWeek => 2,
            SyncWindow::TwoWeeks => 3,
            SyncWindow::OneMonth => 4,
            SyncWindow::All => 5,
        }
    }

    /// The next larger window, or `None` when already unbounded
    pub fn next(&self) -> Option<Self> {
        match self {
            SyncWindow::OneDay => Some(SyncWindow::ThreeDays),
            SyncWindow::ThreeDays => Some(SyncWindow::OneWeek),
            SyncWindow::OneWeek => Some(SyncWindow::TwoWeeks),
            SyncWindow::TwoWeeks => Some(SyncWindow::OneMonth),
            SyncWindow::OneMonth => Some(SyncWindow::All),
            SyncWindow::All => None,
        }
    }

    /// Limit this window to `max`
    pub fn capped_at(self, max: SyncWindow) -> Self {
        self.min(max)
    }

    /// (value, unit) pair for display, e.g. (2, Weeks)
    pub fn span(&self) -> (u32, SyncWindowUnit) {
        match self {
            SyncWindow::All => (0, SyncWindowUnit::All),
            SyncWindow::OneDay => (1, SyncWindowUnit::Days),
            SyncWindow::ThreeDays => (3, SyncWindowUnit::Days),
            SyncWindow::OneWeek => (1, SyncWindowUnit::Weeks),
            SyncWindow::TwoWeeks => (2, SyncWindowUnit::Weeks),
            SyncWindow::OneMonth => (1, SyncWindowUnit::Months),
        }
    }
}

impl PartialOrd for SyncWindow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SyncWindow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
