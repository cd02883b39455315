//! Process identities used as addressing keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LocioError;

/// Group and name of the coordinator every process reports to.
pub const MASTER_NAME: &str = "master";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Data,
    Replay,
    Backtest,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Live, Mode::Data, Mode::Replay, Mode::Backtest];

    pub const fn name(self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Data => "data",
            Mode::Replay => "replay",
            Mode::Backtest => "backtest",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = LocioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| LocioError::parse("mode", s))
    }
}

/// System-level processes vs. the application categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Md,
    Td,
    Strategy,
    System,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Md, Category::Td, Category::Strategy, Category::System];

    pub const fn name(self) -> &'static str {
        match self {
            Category::Md => "md",
            Category::Td => "td",
            Category::Strategy => "strategy",
            Category::System => "system",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = LocioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| LocioError::parse("category", s))
    }
}

/// Identity of a process or logical endpoint.
///
/// Fields are fixed at construction; a location carries no behaviour beyond
/// naming. Well-formedness (non-empty group and name, no path separators) is
/// the caller's contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    mode: Mode,
    category: Category,
    group: String,
    name: String,
}

impl Location {
    pub fn new(mode: Mode, category: Category, group: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mode, category, group: group.into(), name: name.into() }
    }

    /// The coordinator: always live, system category, group and name `master`.
    pub fn master() -> Self {
        Self::new(Mode::Live, Category::System, MASTER_NAME, MASTER_NAME)
    }

    pub fn mode(&self) -> Mode { self.mode }
    pub fn category(&self) -> Category { self.category }
    pub fn group(&self) -> &str { &self.group }
    pub fn name(&self) -> &str { &self.name }

    /// `category/group/name/mode`
    pub fn uname(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.category, self.group, self.name, self.mode)
    }
}
