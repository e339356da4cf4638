use crate::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const FIRST_MODULE_ID: u8 = 1;
pub const LAST_MODULE_ID: u8 = 14;

/// Number of distinct curriculum modules a participant must complete to graduate
pub const GRADUATION_MODULE_COUNT: usize = LAST_MODULE_ID as usize;

/// Identifier of a curriculum module, always within 1..=14
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ModuleId(u8);

impl ModuleId {
    pub fn new(raw: i64) -> DomainResult<Self> {
        Self::from_raw(raw).ok_or(DomainError::InvalidModule(raw))
    }

    /// Lenient constructor for boundary data; out-of-range IDs yield None
    pub fn from_raw(raw: i64) -> Option<Self> {
        if (FIRST_MODULE_ID as i64..=LAST_MODULE_ID as i64).contains(&raw) {
            Some(Self(raw as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every curriculum module ID in order
    pub fn all() -> impl Iterator<Item = ModuleId> {
        (FIRST_MODULE_ID..=LAST_MODULE_ID).map(ModuleId)
    }

    /// The first `count` module IDs, capped at the curriculum size
    pub fn first_n(count: usize) -> BTreeSet<ModuleId> {
        Self::all().take(count.min(GRADUATION_MODULE_COUNT)).collect()
    }
}

impl TryFrom<i64> for ModuleId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ModuleId::new(value)
    }
}

impl From<ModuleId> for u8 {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category tag grouping related curriculum units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    Personal,
    Relationships,
    Parenting,
    LifeSkills,
}

impl ModuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::Personal => "personal",
            ModuleCategory::Relationships => "relationships",
            ModuleCategory::Parenting => "parenting",
            ModuleCategory::LifeSkills => "life_skills",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Curriculum unit. Static reference data, never created at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: &'static str,
    pub category: ModuleCategory,
}

const fn m(id: u8, title: &'static str, category: ModuleCategory) -> Module {
    Module { id: ModuleId(id), title, category }
}

static CATALOG: [Module; GRADUATION_MODULE_COUNT] = [
    m(1, "Family History", ModuleCategory::Personal),
    m(2, "What It Means to Be a Man", ModuleCategory::Personal),
    m(3, "Showing and Handling Feelings", ModuleCategory::Personal),
    m(4, "Men's Health", ModuleCategory::Personal),
    m(5, "Communication", ModuleCategory::Relationships),
    m(6, "The Father's Role", ModuleCategory::Parenting),
    m(7, "Discipline", ModuleCategory::Parenting),
    m(8, "Children's Growth", ModuleCategory::Parenting),
    m(9, "Getting Involved", ModuleCategory::Parenting),
    m(10, "Working With Mom and Co-Parenting", ModuleCategory::Relationships),
    m(11, "Anger Management", ModuleCategory::Relationships),
    m(12, "Work and Money", ModuleCategory::LifeSkills),
    m(13, "Goal Setting", ModuleCategory::LifeSkills),
    m(14, "Celebration and Next Steps", ModuleCategory::LifeSkills),
];

/// The full curriculum in module order
pub fn catalog() -> &'static [Module] {
    &CATALOG
}

pub fn module(id: ModuleId) -> &'static Module {
    &CATALOG[(id.get() - FIRST_MODULE_ID) as usize]
}

/// Modules not yet in `completed`, in curriculum order
pub fn remaining_modules(completed: &BTreeSet<ModuleId>) -> Vec<&'static Module> {
    CATALOG.iter().filter(|m| !completed.contains(&m.id)).collect()
}

pub fn next_module(completed: &BTreeSet<ModuleId>) -> Option<&'static Module> {
    CATALOG.iter().find(|m| !completed.contains(&m.id))
}
