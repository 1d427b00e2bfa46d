//! Brush painting over rendered points: recolours (or hides) the items whose
//! datum falls inside the brush and reports which rows changed.

use crate::error::{PainterError, Result};
use crate::scene::{Datum, ItemId, Paint};
use crate::traits::PAINTER_MODULE;
use crate::view::View;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintMode {
    Color,
    #[default]
    Hide,
}

/// A datum's index value, hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Non-integral numbers by their JSON text.
    Number(String),
    Text(String),
    Other(String),
}

impl From<&Value> for IndexValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => IndexValue::Null,
            Value::Bool(b) => IndexValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => IndexValue::Int(i),
                None => IndexValue::Number(n.to_string()),
            },
            Value::String(s) => IndexValue::Text(s.clone()),
            other => IndexValue::Other(other.to_string()),
        }
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

/// Row changes to push upstream: rows to drop by index, rows to add.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub removed: HashSet<IndexValue>,
    pub inserted: Vec<Datum>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove<I: IntoIterator<Item = IndexValue>>(&mut self, indices: I) -> &mut Self {
        self.removed.extend(indices);
        self
    }

    pub fn insert<I: IntoIterator<Item = Datum>>(&mut self, rows: I) -> &mut Self {
        self.inserted.extend(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty()
    }

    /// Applies the changes to `rows`, matching rows on `index_key`.
    pub fn apply(&self, rows: &mut Vec<Datum>, index_key: &str) {
        rows.retain(|row| {
            let index = row.get(index_key).map_or(IndexValue::Null, IndexValue::from);
            !self.removed.contains(&index)
        });
        rows.extend(self.inserted.iter().cloned());
    }
}

#[derive(Clone)]
pub struct PaintConfig {
    pub view: View,
    pub mode: PaintMode,
    pub changes: Changeset,
    /// Datum fields read as the x and y of each point.
    pub fields: [String; 2],
    pub point: [f64; 2],
    pub radius: f64,
    /// `[a, b]` for an ellipse with those semi-axes, or a number for a band
    /// along the first field.
    pub range: Value,
    pub group_key: String,
    pub group_value: Value,
    pub index_key: String,
    pub new_color: String,
}

impl PaintConfig {
    pub fn new(view: View) -> Self {
        Self {
            view,
            mode: PaintMode::default(),
            changes: Changeset::new(),
            fields: ["x".to_string(), "y".to_string()],
            point: [0.0, 0.0],
            radius: 1.0,
            range: Value::Null,
            group_key: String::new(),
            group_value: Value::Null,
            index_key: String::new(),
            new_color: String::new(),
        }
    }
}

pub struct PaintResult {
    pub mut_indices: HashSet<IndexValue>,
    pub mut_values: Vec<Datum>,
    pub changes: Changeset,
    pub view: View,
    /// Items restyled by the stroke.
    pub items: Vec<ItemId>,
}

impl PaintResult {
    /// Re-renders the painted items. Await before reading visual state back.
    pub async fn rendered(&self) -> Result<()> {
        self.view.run_async().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Brush {
    Ellipse { a: f64, b: f64 },
    Band { range: f64 },
}

impl Brush {
    fn from_range(range: &Value) -> Result<Brush> {
        match range {
            Value::Array(axes) if axes.len() == 2 => match (axes[0].as_f64(), axes[1].as_f64()) {
                (Some(a), Some(b)) => Ok(Brush::Ellipse { a, b }),
                _ => Err(PainterError::InvalidRange),
            },
            Value::Number(n) => n
                .as_f64()
                .filter(|r| r.is_finite())
                .map(|range| Brush::Band { range })
                .ok_or(PainterError::InvalidRange),
            _ => Err(PainterError::InvalidRange),
        }
    }

    /// Missing or non-numeric fields read as NaN and never match.
    fn covers(&self, datum: &Datum, fields: &[String; 2], point: [f64; 2], radius: f64) -> bool {
        let field = |name: &str| datum.get(name).and_then(Value::as_f64).unwrap_or(f64::NAN);
        let (x, y) = (field(&fields[0]), field(&fields[1]));
        match *self {
            Brush::Ellipse { a, b } => {
                ((x - point[0]) / a).powi(2) + ((y - point[1]) / b).powi(2) <= radius * radius
            }
            Brush::Band { range } => y == point[1] && (x - point[0]).abs() < radius * range.sqrt(),
        }
    }
}

/// Paints every rendered item under the brush. Switches the view to the
/// painter first; the re-render runs when the result's `rendered` is
/// awaited.
pub fn paint(config: PaintConfig) -> Result<PaintResult> {
    let PaintConfig {
        view,
        mode,
        mut changes,
        fields,
        point,
        radius,
        range,
        group_key,
        group_value,
        index_key,
        new_color,
    } = config;
    let brush = Brush::from_range(&range)?;

    if view.renderer_type() != PAINTER_MODULE {
        view.renderer(PAINTER_MODULE)?;
    }

    let scene = view.scene();
    let candidates: HashSet<ItemId> = {
        let current = scene.borrow();
        view.with_painter(|painter| painter.select_items(&current, None))
            .ok_or(PainterError::NotInitialized)?
            .iter()
            .copied()
            .collect()
    };

    let mut mut_indices = HashSet::new();
    let mut mut_values = Vec::new();
    let mut items = Vec::new();
    scene.borrow_mut().visit_items_mut(|_, item| {
        if !candidates.contains(&item.id) {
            return;
        }
        let Some(datum) = item.datum.as_mut() else {
            return;
        };
        if !brush.covers(datum, &fields, point, radius) {
            return;
        }
        let index = datum.get(&index_key).map_or(IndexValue::Null, IndexValue::from);
        match mode {
            PaintMode::Color => {
                datum.insert(group_key.clone(), group_value.clone());
                mut_values.push(datum.clone());
                item.fill = Some(Paint::Color(new_color.clone()));
            }
            PaintMode::Hide => {
                item.fill = Some(Paint::color("white"));
                item.opacity = Some(0.0);
                item.size = Some(0.0);
            }
        }
        mut_indices.insert(index);
        items.push(item.id);
    });

    changes.remove(mut_indices.iter().cloned());
    if mode == PaintMode::Color {
        changes.insert(mut_values.iter().cloned());
    }
    log::debug!("painted {} items ({:?})", items.len(), mode);
    view.mark_dirty(items.iter().copied());

    Ok(PaintResult {
        mut_indices,
        mut_values,
        changes,
        view,
        items,
    })
}

/// Starts a paint gesture: tooltips stay hidden until `stop_paint`.
pub fn start_paint(view: &View) -> Result<()> {
    view.set_painting(true)
}

pub fn stop_paint(view: &View) -> Result<()> {
    view.set_painting(false)
}
