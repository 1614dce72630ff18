//! Read-only view of a drill-down state for front ends.

use std::fmt;

use super::DrillState;

/// Entity count line under a final selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCount {
    Filtering,
    Count(usize),
}

impl fmt::Display for EntityCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityCount::Filtering => f.write_str("Filtering..."),
            EntityCount::Count(n) => write!(f, "{n} organizations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    /// e.g. `Level 1: Province`
    pub level_badge: String,
    pub level_color: &'static str,
    pub level_description: &'static str,
    /// e.g. `Select up to District`
    pub max_level_hint: String,
    pub selected_area_name: Option<String>,
    pub is_final: bool,
    /// Present only for a final selection
    pub entities: Option<EntityCount>,
    pub can_zoom_out: bool,
    pub boundary_status: String,
    pub hovered_area_name: Option<String>,
}

impl Panel {
    pub fn from_state<E>(state: &DrillState<E>) -> Self {
        let level = state.current_level();
        let descriptor = level.descriptor();

        let entities = state.is_final().then(|| {
            if state.filter().is_filtering() {
                EntityCount::Filtering
            } else {
                EntityCount::Count(state.filter_result().len())
            }
        });

        let boundaries = state.boundaries();
        let boundary_status = if boundaries.loading {
            "Loading boundaries...".to_string()
        } else {
            match &boundaries.data {
                Some(data) => format!("{} areas loaded", data.len()),
                None => "No data".to_string(),
            }
        };

        Self {
            level_badge: format!("Level {}: {}", level, descriptor.label),
            level_color: descriptor.color,
            level_description: descriptor.description,
            max_level_hint: format!("Select up to {}", state.max_level().descriptor().label),
            selected_area_name: state.selected_area_name().map(str::to_string),
            is_final: state.is_final(),
            entities,
            can_zoom_out: !level.is_top(),
            boundary_status,
            hovered_area_name: state.hovered_area_name().map(str::to_string),
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.level_badge, self.level_description)?;
        writeln!(f, "{}", self.max_level_hint)?;
        if let Some(name) = &self.selected_area_name {
            let marker = if self.is_final { " [final]" } else { "" };
            writeln!(f, "Selected: {name}{marker}")?;
        }
        if let Some(count) = &self.entities {
            writeln!(f, "Organizations in area: {count}")?;
        }
        if let Some(name) = &self.hovered_area_name {
            writeln!(f, "Hovering: {name}")?;
        }
        write!(f, "{}", self.boundary_status)
    }
}
