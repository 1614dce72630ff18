//! Administrative levels and their static display/simplification tables.

use serde::{Deserialize, Serialize};

/// Deepest administrative level supported.
pub const MAX_LEVEL: u8 = 4;

/// Display descriptor for an administrative level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDescriptor {
    pub label: &'static str,
    /// Badge color name
    pub color: &'static str,
    pub description: &'static str,
}

/// Paint inputs for the boundary layers of one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStyle {
    pub fill_color: &'static str,
    pub line_color: &'static str,
    pub line_width: f64,
}

const DESCRIPTORS: [LevelDescriptor; MAX_LEVEL as usize + 1] = [
    LevelDescriptor {
        label: "Country",
        color: "blue",
        description: "National boundaries",
    },
    LevelDescriptor {
        label: "Province",
        color: "cyan",
        description: "First-level subdivisions (provinces, states, regions)",
    },
    LevelDescriptor {
        label: "District",
        color: "teal",
        description: "Second-level subdivisions (districts, counties)",
    },
    LevelDescriptor {
        label: "Subdistrict",
        color: "green",
        description: "Third-level subdivisions (subdistricts, municipalities)",
    },
    LevelDescriptor {
        label: "Village",
        color: "lime",
        description: "Finest subdivisions (villages, neighbourhoods)",
    },
];

const STYLES: [LevelStyle; MAX_LEVEL as usize + 1] = [
    LevelStyle {
        fill_color: "#3b82f6",
        line_color: "#1d4ed8",
        line_width: 1.5,
    },
    LevelStyle {
        fill_color: "#06b6d4",
        line_color: "#0e7490",
        line_width: 1.2,
    },
    LevelStyle {
        fill_color: "#14b8a6",
        line_color: "#0f766e",
        line_width: 1.0,
    },
    LevelStyle {
        fill_color: "#22c55e",
        line_color: "#15803d",
        line_width: 0.8,
    },
    LevelStyle {
        fill_color: "#84cc16",
        line_color: "#4d7c0f",
        line_width: 0.6,
    },
];

/// Coarser levels use looser simplification to bound payload size.
const TOLERANCES: [f64; MAX_LEVEL as usize + 1] = [0.01, 0.0, 0.0, 0.0, 0.0];

/// A tier in the administrative hierarchy, 0 (country) through [`MAX_LEVEL`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct AdminLevel(u8);

impl AdminLevel {
    pub const TOP: AdminLevel = AdminLevel(0);
    pub const MAX: AdminLevel = AdminLevel(MAX_LEVEL);

    /// Returns `None` when `level` is above [`MAX_LEVEL`]
    pub fn new(level: u8) -> Option<Self> {
        (level <= MAX_LEVEL).then_some(Self(level))
    }

    /// Clamp an arbitrary integer into `[0, MAX_LEVEL]`
    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(0, MAX_LEVEL as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_top(self) -> bool {
        self.0 == 0
    }

    /// The next finer level, if any
    pub fn deeper(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// The next coarser level, saturating at the top
    pub fn shallower(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    pub fn descriptor(self) -> &'static LevelDescriptor {
        &DESCRIPTORS[self.0 as usize]
    }

    pub fn style(self) -> &'static LevelStyle {
        &STYLES[self.0 as usize]
    }

    /// Simplification tolerance used when requesting boundaries at this level
    pub fn tolerance(self) -> f64 {
        TOLERANCES[self.0 as usize]
    }

    /// All levels, coarsest first
    pub fn all() -> impl Iterator<Item = AdminLevel> {
        (0..=MAX_LEVEL).map(AdminLevel)
    }
}

impl TryFrom<u8> for AdminLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("admin level {value} exceeds {MAX_LEVEL}"))
    }
}

impl From<AdminLevel> for u8 {
    fn from(level: AdminLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
