//! The scenegraph handed to the painter by the host. The host owns and
//! rebuilds it; the painter reads it and the paint tool mutates leaf items.

use crate::error::{PainterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

pub type Datum = serde_json::Map<String, Value>;
pub type SceneRef = Rc<RefCell<Scene>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub Uuid);

impl Default for ItemId {
    fn default() -> Self {
        ItemId(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(pub Uuid);

impl Default for MarkId {
    fn default() -> Self {
        MarkId(Uuid::new_v4())
    }
}

/// Identity of one scene revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub Uuid);

impl Default for SceneId {
    fn default() -> Self {
        SceneId(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub id: String,
    #[serde(default)]
    pub x1: f32,
    #[serde(default)]
    pub y1: f32,
    #[serde(default = "one")]
    pub x2: f32,
    #[serde(default)]
    pub y2: f32,
    #[serde(default)]
    pub stops: Vec<GradientStop>,
}

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

/// Fill or stroke reference: a CSS color or a linear gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Color(String),
    Gradient(Gradient),
}

impl Paint {
    pub fn color(css: &str) -> Self {
        Paint::Color(css.to_string())
    }

    pub fn is_gradient(&self) -> bool {
        matches!(self, Paint::Gradient(_))
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Paint::Color(c) if c == "transparent")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Rect,
    Symbol,
    Path,
    Rule,
    Area,
    Line,
    Group,
    Text,
    Image,
    /// Arc, trail, shape and anything else: drawn as nothing.
    #[serde(other)]
    Unsupported,
}

impl MarkType {
    /// Nested marks draw all their items as one shape.
    pub fn is_nested(&self) -> bool {
        matches!(self, MarkType::Area | MarkType::Line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    #[serde(skip)]
    pub id: MarkId,
    pub marktype: MarkType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "yes")]
    pub interactive: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Mark {
    pub fn new(marktype: MarkType, items: Vec<Item>) -> Self {
        Self {
            id: MarkId::default(),
            marktype,
            name: None,
            role: None,
            interactive: true,
            items,
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    #[serde(skip)]
    pub id: ItemId,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub x2: Option<f32>,
    pub y2: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub size: Option<f32>,
    pub shape: Option<String>,
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub opacity: Option<f32>,
    pub fill_opacity: Option<f32>,
    pub stroke_opacity: Option<f32>,
    pub stroke_width: Option<f32>,
    pub stroke_cap: Option<String>,
    pub corner_radius: Option<f32>,
    pub path: Option<String>,
    pub orient: Option<String>,
    pub defined: Option<bool>,
    pub text: Option<Value>,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<Value>,
    pub align: Option<String>,
    pub baseline: Option<String>,
    pub angle: Option<f32>,
    pub url: Option<String>,
    pub clip: bool,
    pub href: Option<String>,
    pub tooltip: Option<Value>,
    pub datum: Option<Datum>,
    pub exit: bool,
    /// Child marks of a group item.
    pub items: Vec<Mark>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn x(&self) -> f32 {
        self.x.unwrap_or(0.0)
    }

    pub fn y(&self) -> f32 {
        self.y.unwrap_or(0.0)
    }

    pub fn width(&self) -> f32 {
        self.width.unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        self.height.unwrap_or(0.0)
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.unwrap_or(1.0)
    }

    /// Fill alpha after opacity; zero when the fill is unset or transparent.
    pub fn fill_alpha(&self) -> f32 {
        match &self.fill {
            Some(p) if !p.is_transparent() => self.opacity() * self.fill_opacity.unwrap_or(1.0),
            _ => 0.0,
        }
    }

    pub fn stroke_alpha(&self) -> f32 {
        match &self.stroke {
            Some(p) if !p.is_transparent() => {
                self.opacity() * self.stroke_opacity.unwrap_or(1.0)
            }
            _ => 0.0,
        }
    }

    /// Stroke width the shape shaders use: zero without a visible stroke.
    pub fn shader_stroke_width(&self) -> f32 {
        match &self.stroke {
            Some(p) if !p.is_transparent() => self.stroke_width.unwrap_or(1.0),
            _ => 0.0,
        }
    }

    pub fn has_gradient(&self) -> bool {
        self.fill.as_ref().is_some_and(Paint::is_gradient)
            || self.stroke.as_ref().is_some_and(Paint::is_gradient)
    }

    pub fn text_content(&self) -> Option<String> {
        match &self.text {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(lines)) => Some(
                lines
                    .iter()
                    .map(|l| match l {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub root: Mark,
}

impl Scene {
    pub fn new(root: Mark) -> Self {
        Self {
            id: SceneId::default(),
            root,
        }
    }

    /// Parses the host's JSON scenegraph (the root mark). Every mark and
    /// item receives a fresh id.
    pub fn from_json(text: &str) -> Result<Self> {
        let root: Mark =
            serde_json::from_str(text).map_err(|e| PainterError::Scene(e.to_string()))?;
        Ok(Self::new(root))
    }

    pub fn into_ref(self) -> SceneRef {
        Rc::new(RefCell::new(self))
    }

    /// Starts a new revision; caches keyed on the scene id go stale.
    pub fn touch(&mut self) {
        self.id = SceneId::default();
    }

    /// Depth-first, draw order. Visits group items before their children.
    pub fn visit_items<F: FnMut(&Mark, &Item)>(&self, mut f: F) {
        fn walk<F: FnMut(&Mark, &Item)>(mark: &Mark, f: &mut F) {
            for item in &mark.items {
                f(mark, item);
                for child in &item.items {
                    walk(child, f);
                }
            }
        }
        walk(&self.root, &mut f);
    }

    pub fn visit_items_mut<F: FnMut(MarkType, &mut Item)>(&mut self, mut f: F) {
        fn walk<F: FnMut(MarkType, &mut Item)>(mark: &mut Mark, f: &mut F) {
            let marktype = mark.marktype;
            for item in &mut mark.items {
                f(marktype, item);
                for child in &mut item.items {
                    walk(child, f);
                }
            }
        }
        walk(&mut self.root, &mut f);
    }

    pub fn visit_marks<F: FnMut(&Mark)>(&self, mut f: F) {
        fn walk<F: FnMut(&Mark)>(mark: &Mark, f: &mut F) {
            f(mark);
            for item in &mark.items {
                for child in &item.items {
                    walk(child, f);
                }
            }
        }
        walk(&self.root, &mut f);
    }

    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        fn walk(mark: &Mark, id: ItemId) -> Option<&Item> {
            for item in &mark.items {
                if item.id == id {
                    return Some(item);
                }
                for child in &item.items {
                    if let Some(found) = walk(child, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(&self.root, id)
    }

    pub fn find_item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        fn walk(mark: &mut Mark, id: ItemId) -> Option<&mut Item> {
            for item in &mut mark.items {
                if item.id == id {
                    return Some(item);
                }
                for child in &mut item.items {
                    if let Some(found) = walk(child, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(&mut self.root, id)
    }

    /// The mark whose item list holds `id`.
    pub fn parent_mark(&self, id: ItemId) -> Option<&Mark> {
        fn walk(mark: &Mark, id: ItemId) -> Option<&Mark> {
            if mark.items.iter().any(|i| i.id == id) {
                return Some(mark);
            }
            mark.items
                .iter()
                .flat_map(|item| item.items.iter())
                .find_map(|child| walk(child, id))
        }
        walk(&self.root, id)
    }

    pub fn contains_item(&self, id: ItemId) -> bool {
        self.find_item(id).is_some()
    }

    pub fn item_count(&self) -> usize {
        let mut n = 0;
        self.visit_items(|_, _| n += 1);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "marktype": "group",
        "items": [{
            "x": 10, "y": 20, "width": 100, "height": 50, "clip": true,
            "fill": "white",
            "items": [{
                "marktype": "symbol",
                "name": "points",
                "items": [
                    {"x": 1, "y": 2, "fill": "steelblue", "shape": "circle", "datum": {"a": 1}},
                    {"x": 3, "y": 4, "fill": {"id": "g1", "stops": [{"offset": 0, "color": "red"}]}}
                ]
            }, {
                "marktype": "arc",
                "items": [{}]
            }]
        }]
    }"#;

    #[test]
    fn parses_nested_groups_and_paints() {
        let scene = Scene::from_json(SCENE).unwrap();
        assert_eq!(scene.root.marktype, MarkType::Group);
        let group = &scene.root.items[0];
        assert!(group.clip);
        let symbols = &group.items[0];
        assert_eq!(symbols.marktype, MarkType::Symbol);
        assert!(symbols.interactive);
        assert_eq!(symbols.items[0].fill, Some(Paint::color("steelblue")));
        assert!(symbols.items[1].has_gradient());
        assert_eq!(group.items[1].marktype, MarkType::Unsupported);
        assert_eq!(scene.item_count(), 4);
    }

    #[test]
    fn fresh_ids_and_lookup() {
        let scene = Scene::from_json(SCENE).unwrap();
        let point = &scene.root.items[0].items[0].items[0];
        assert_ne!(point.id, scene.root.items[0].items[0].items[1].id);
        assert!(scene.contains_item(point.id));
        assert_eq!(
            scene.parent_mark(point.id).map(|m| m.name.clone()),
            Some(Some("points".to_string()))
        );
        assert!(!scene.contains_item(ItemId::default()));
    }

    #[test]
    fn alpha_rules() {
        let mut item = Item::at(0.0, 0.0);
        assert_eq!(item.fill_alpha(), 0.0);
        item.fill = Some(Paint::color("transparent"));
        assert_eq!(item.fill_alpha(), 0.0);
        item.fill = Some(Paint::color("red"));
        item.opacity = Some(0.5);
        item.fill_opacity = Some(0.5);
        assert!((item.fill_alpha() - 0.25).abs() < 1e-6);
        assert_eq!(item.shader_stroke_width(), 0.0);
        item.stroke = Some(Paint::color("black"));
        assert_eq!(item.shader_stroke_width(), 1.0);
    }

    #[test]
    fn bad_json_is_a_scene_error() {
        assert!(matches!(
            Scene::from_json("{\"items\": 3}"),
            Err(PainterError::Scene(_))
        ));
    }
}
