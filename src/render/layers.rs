//! Desired boundary layers for a drill-down state.

use std::sync::Arc;

use crate::drill::DrillState;
use crate::models::{AdminLevel, BoundaryFeatureCollection, FeatureId, LevelStyle};

pub const DEFAULT_LAYER_ID: &str = "admin-boundaries";

/// Outline color of the final selection
pub const SELECTED_LINE_COLOR: &str = "#22c55e";

/// A paint value that depends on the feature's selected/hover flags.
/// `selected` wins over `hover`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCase<T> {
    pub selected: T,
    pub hover: T,
    pub otherwise: T,
}

impl<T: Clone> FeatureCase<T> {
    pub fn resolve(&self, selected: bool, hover: bool) -> T {
        if selected {
            self.selected.clone()
        } else if hover {
            self.hover.clone()
        } else {
            self.otherwise.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerPaint {
    Fill {
        color: String,
        opacity: FeatureCase<f64>,
    },
    Line {
        color: FeatureCase<String>,
        width: FeatureCase<f64>,
        opacity: FeatureCase<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub paint: LayerPaint,
}

/// The source plus fill and outline layers one boundary collection renders as
#[derive(Debug, Clone)]
pub struct LayerSet {
    pub source_id: String,
    pub data: Arc<BoundaryFeatureCollection>,
    pub fill: LayerSpec,
    pub outline: LayerSpec,
    /// Feature flagged `selected` after mounting
    pub selected_feature: Option<FeatureId>,
}

/// Collections compare by identity: a refetched collection is a new one.
impl PartialEq for LayerSet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            && self.source_id == other.source_id
            && self.fill == other.fill
            && self.outline == other.outline
            && self.selected_feature == other.selected_feature
    }
}

impl LayerSet {
    /// Build the layers for `data` shown at `level`.
    ///
    /// At the top level non-hovered features are fully transparent so only the
    /// hovered and the finally selected feature are visible.
    pub fn build(
        layer_id: &str,
        data: Arc<BoundaryFeatureCollection>,
        style: &LevelStyle,
        level: AdminLevel,
        selected_code: Option<&str>,
        is_final: bool,
    ) -> Self {
        let top = level.is_top();

        let fill = LayerSpec {
            id: format!("{layer_id}-fill"),
            source: layer_id.to_string(),
            paint: LayerPaint::Fill {
                color: style.fill_color.to_string(),
                opacity: FeatureCase {
                    selected: 0.8,
                    hover: 0.7,
                    otherwise: if top { 0.0 } else { 0.4 },
                },
            },
        };

        let outline = LayerSpec {
            id: format!("{layer_id}-outline"),
            source: layer_id.to_string(),
            paint: LayerPaint::Line {
                color: FeatureCase {
                    selected: SELECTED_LINE_COLOR.to_string(),
                    hover: style.line_color.to_string(),
                    otherwise: style.line_color.to_string(),
                },
                width: FeatureCase {
                    selected: style.line_width * 2.0,
                    hover: style.line_width,
                    otherwise: style.line_width,
                },
                opacity: FeatureCase {
                    selected: 1.0,
                    hover: 1.0,
                    otherwise: if top { 0.0 } else { 1.0 },
                },
            },
        };

        let selected_feature = selected_code
            .filter(|_| is_final)
            .and_then(|code| data.find_by_code(code))
            .map(|f| f.id.clone());

        Self {
            source_id: layer_id.to_string(),
            data,
            fill,
            outline,
            selected_feature,
        }
    }

    /// Layers for the collection displayed in `state`, if one is loaded
    pub fn for_state<E>(layer_id: &str, state: &DrillState<E>) -> Option<Self> {
        let data = state.boundaries().data.clone()?;
        let level = state.current_level();
        Some(Self::build(
            layer_id,
            data,
            level.style(),
            level,
            state.selected_area(),
            state.is_final(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundaryFeature, MAX_LEVEL};

    fn data() -> Arc<BoundaryFeatureCollection> {
        Arc::new(BoundaryFeatureCollection::new(vec![
            BoundaryFeature {
                id: FeatureId::Number(10),
                name: "Bangkok".into(),
                code: "TH-10".into(),
                geometry: geo::MultiPolygon(vec![]),
                properties: Default::default(),
            },
            BoundaryFeature {
                id: FeatureId::Number(50),
                name: "Chiang Mai".into(),
                code: "TH-50".into(),
                geometry: geo::MultiPolygon(vec![]),
                properties: Default::default(),
            },
        ]))
    }

    #[test]
    fn test_top_level_hides_idle_features() {
        let level = AdminLevel::TOP;
        let set = LayerSet::build(DEFAULT_LAYER_ID, data(), level.style(), level, None, false);
        let LayerPaint::Fill { opacity, .. } = &set.fill.paint else {
            panic!("fill layer expected");
        };
        assert_eq!(opacity.resolve(false, false), 0.0);
        assert_eq!(opacity.resolve(false, true), 0.7);
        let LayerPaint::Line { opacity, .. } = &set.outline.paint else {
            panic!("line layer expected");
        };
        assert_eq!(opacity.resolve(false, false), 0.0);
        assert_eq!(set.fill.id, "admin-boundaries-fill");
        assert_eq!(set.outline.id, "admin-boundaries-outline");
    }

    #[test]
    fn test_deeper_levels_show_all_features() {
        let level = AdminLevel::new(MAX_LEVEL).unwrap();
        let set = LayerSet::build(DEFAULT_LAYER_ID, data(), level.style(), level, None, false);
        let LayerPaint::Fill { opacity, .. } = &set.fill.paint else {
            panic!("fill layer expected");
        };
        assert_eq!(opacity.resolve(false, false), 0.4);
    }

    #[test]
    fn test_final_selection_outline() {
        let level = AdminLevel::new(1).unwrap();
        let style = level.style();
        let set = LayerSet::build(DEFAULT_LAYER_ID, data(), style, level, Some("TH-50"), true);
        assert_eq!(set.selected_feature, Some(FeatureId::Number(50)));

        let LayerPaint::Line { color, width, .. } = &set.outline.paint else {
            panic!("line layer expected");
        };
        assert_eq!(color.resolve(true, false), SELECTED_LINE_COLOR);
        assert_eq!(color.resolve(true, true), SELECTED_LINE_COLOR);
        assert_eq!(width.resolve(true, false), style.line_width * 2.0);

        let not_final = LayerSet::build(DEFAULT_LAYER_ID, data(), style, level, Some("TH-50"), false);
        assert_eq!(not_final.selected_feature, None);
    }

    #[test]
    fn test_identity_equality() {
        let level = AdminLevel::new(1).unwrap();
        let shared = data();
        let a = LayerSet::build(DEFAULT_LAYER_ID, shared.clone(), level.style(), level, None, false);
        let b = LayerSet::build(DEFAULT_LAYER_ID, shared, level.style(), level, None, false);
        let c = LayerSet::build(DEFAULT_LAYER_ID, data(), level.style(), level, None, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
