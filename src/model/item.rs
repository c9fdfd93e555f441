use crate::{
    foundation::core::{Affine, Canvas, Point, Rect},
    foundation::error::{ReelError, ReelResult},
    model::animation::{Animation, renumber_animations},
};

/// Stable, position-independent item identity.
///
/// `Item::id` is renumbered whenever the list changes; anything that must survive a removal or a
/// reorder (selection, toolbar anchors, erase sessions) holds a `ItemUid` instead.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ItemUid(pub uuid::Uuid);

impl ItemUid {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ItemUid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Shape sub-kinds.
pub enum ShapeKind {
    /// Axis-aligned rectangle (optionally rounded).
    Rectangle,
    /// Ellipse inscribed in the item box; a true circle when the box is square.
    Circle,
    /// Speech bubble: rounded body with a tail at the bottom left.
    Dialog,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Style for shape and text items.
pub struct StyleConfig {
    /// Fill color (any CSS color accepted by SVG).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Stroke width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Corner radius for rectangles and dialog bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Item payload by type.
pub enum ItemKind {
    /// Raster image: remote URL, relative path or `data:` URI.
    Image {
        /// Image source.
        src: String,
    },
    /// Vector shape.
    Shape {
        /// Shape sub-kind.
        shape: ShapeKind,
        /// Fill/stroke style.
        #[serde(default)]
        config: StyleConfig,
    },
    /// Text block.
    Text {
        /// Font and content.
        #[serde(default)]
        config: StyleConfig,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Item placement in canvas pixels.
pub struct Geometry {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Rotation about the box center, degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Horizontal scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    /// Vertical scale factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
}

impl Geometry {
    /// Unrotated, unscaled box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    /// Box covering a whole canvas.
    pub fn covering(canvas: Canvas) -> Self {
        Self::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height))
    }

    /// Box center in canvas coordinates (ignoring rotation, which is about the center).
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Local-to-canvas transform: translate, rotate about the box center, then scale.
    pub fn to_affine(&self) -> Affine {
        local_affine(
            self.x,
            self.y,
            self.width,
            self.height,
            self.rotation.unwrap_or(0.0),
            self.scale_x.unwrap_or(1.0),
            self.scale_y.unwrap_or(1.0),
        )
    }

    /// Axis-aligned box before rotation/scale.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub(crate) fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !v.is_finite() {
                return Err(ReelError::validation(format!("item {name} must be finite")));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(ReelError::validation("item width/height must be >= 0"));
        }
        for v in [self.rotation, self.scale_x, self.scale_y].into_iter().flatten() {
            if !v.is_finite() {
                return Err(ReelError::validation(
                    "item rotation/scale must be finite when set",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn local_affine(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rotation_deg: f64,
    scale_x: f64,
    scale_y: f64,
) -> Affine {
    let center = Point::new(width / 2.0, height / 2.0);
    Affine::translate((x, y))
        * Affine::rotate_about(rotation_deg.to_radians(), center)
        * Affine::scale_non_uniform(scale_x, scale_y)
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A positioned visual element inside a layer.
pub struct Item {
    /// `item_<n>`, equal to the item's list position.
    #[serde(default)]
    pub id: String,
    /// Stable identity.
    #[serde(default)]
    pub uid: ItemUid,
    /// Explicit z-order, equal to the list position.
    #[serde(default)]
    pub z_index: u32,
    /// Type-specific payload, inlined next to the geometry on the wire.
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Placement.
    #[serde(flatten)]
    pub geometry: Geometry,
    /// Ordered animations; later entries win per property.
    #[serde(default)]
    pub animations: Vec<Animation>,
    /// Soft visibility toggle, independent of deletion.
    #[serde(default)]
    pub is_hidden: bool,
}

impl Item {
    fn with_kind(kind: ItemKind, geometry: Geometry) -> Self {
        Self {
            id: String::new(),
            uid: ItemUid::new(),
            z_index: 0,
            kind,
            geometry,
            animations: Vec::new(),
            is_hidden: false,
        }
    }

    /// New image item.
    pub fn image(src: impl Into<String>, geometry: Geometry) -> Self {
        Self::with_kind(ItemKind::Image { src: src.into() }, geometry)
    }

    /// New shape item.
    pub fn shape(shape: ShapeKind, geometry: Geometry, config: StyleConfig) -> Self {
        Self::with_kind(ItemKind::Shape { shape, config }, geometry)
    }

    /// New text item.
    pub fn text(text: impl Into<String>, geometry: Geometry, mut config: StyleConfig) -> Self {
        config.text = Some(text.into());
        Self::with_kind(ItemKind::Text { config }, geometry)
    }

    /// Image source, when this is an image item.
    pub fn src(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Image { src } => Some(src),
            _ => None,
        }
    }

    /// Shape sub-kind, when this is a shape item.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match &self.kind {
            ItemKind::Shape { shape, .. } => Some(*shape),
            _ => None,
        }
    }

    /// Append an animation, assigning the next `animation_<n>` id.
    pub fn add_animation(&mut self, animation: Animation) -> ReelResult<&Animation> {
        animation.validate()?;
        self.animations.push(animation);
        renumber_animations(&mut self.animations);
        let last = self.animations.len() - 1;
        Ok(&self.animations[last])
    }

    /// Remove an animation by id and renumber the rest. Unknown ids are a no-op.
    pub fn remove_animation(&mut self, animation_id: &str) -> Option<Animation> {
        let pos = self.animations.iter().position(|a| a.id == animation_id)?;
        let removed = self.animations.remove(pos);
        renumber_animations(&mut self.animations);
        Some(removed)
    }

    /// Validate geometry and animations.
    pub fn validate(&self) -> ReelResult<()> {
        self.geometry.validate()?;
        if let ItemKind::Image { src } = &self.kind
            && src.trim().is_empty()
        {
            return Err(ReelError::validation(format!(
                "image item '{}' has an empty src",
                self.id
            )));
        }
        for anim in &self.animations {
            anim.validate()?;
        }
        Ok(())
    }

    /// Copy with a fresh `uid`, used when duplicating content.
    pub(crate) fn fresh_copy(&self) -> Self {
        Self {
            uid: ItemUid::new(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Ordered item list; order is z-order.
///
/// Every structural change renumbers `id`, `z_index` and animation ids so that the dense
/// `item_0..item_{n-1}` invariant holds after each call.
pub struct ItemList(Vec<Item>);

impl ItemList {
    /// Empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from items, renumbering them.
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut list = Self(items);
        list.renumber();
        list
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Items in z-order.
    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }

    /// Iterate in z-order.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    /// Visible items in z-order.
    pub fn visible(&self) -> impl Iterator<Item = &Item> {
        self.0.iter().filter(|i| !i.is_hidden)
    }

    /// Item at a list position.
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.0.get(index)
    }

    /// List position of `uid`.
    pub fn position(&self, uid: ItemUid) -> Option<usize> {
        self.0.iter().position(|i| i.uid == uid)
    }

    /// Look up by stable identity.
    pub fn find(&self, uid: ItemUid) -> Option<&Item> {
        self.0.iter().find(|i| i.uid == uid)
    }

    /// Mutable lookup by stable identity. Callers must not change `id`/`z_index`.
    pub fn find_mut(&mut self, uid: ItemUid) -> Option<&mut Item> {
        self.0.iter_mut().find(|i| i.uid == uid)
    }

    /// Look up by positional id (`item_<n>`).
    pub fn find_by_id(&self, id: &str) -> Option<&Item> {
        self.0.iter().find(|i| i.id == id)
    }

    /// Append on top.
    pub fn push(&mut self, item: Item) -> ItemUid {
        let uid = item.uid;
        self.0.push(item);
        self.renumber();
        uid
    }

    /// Insert at `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, item: Item) -> ItemUid {
        let uid = item.uid;
        let index = index.min(self.0.len());
        self.0.insert(index, item);
        self.renumber();
        uid
    }

    /// Remove by identity and renumber the rest.
    pub fn remove(&mut self, uid: ItemUid) -> Option<Item> {
        let pos = self.position(uid)?;
        let removed = self.0.remove(pos);
        self.renumber();
        Some(removed)
    }

    /// Move an item to a new z position.
    pub fn move_to(&mut self, uid: ItemUid, index: usize) -> bool {
        let Some(pos) = self.position(uid) else {
            return false;
        };
        let item = self.0.remove(pos);
        let index = index.min(self.0.len());
        self.0.insert(index, item);
        self.renumber();
        true
    }

    /// Replace the item with `uid` in place, keeping its position, `id`, `uid` and `z_index`.
    pub fn replace(&mut self, uid: ItemUid, mut replacement: Item) -> bool {
        let Some(pos) = self.position(uid) else {
            return false;
        };
        replacement.uid = uid;
        self.0[pos] = replacement;
        self.renumber();
        true
    }

    /// Reassign dense ids, z-order and animation ids.
    pub fn renumber(&mut self) {
        for (i, item) in self.0.iter_mut().enumerate() {
            item.id = format!("item_{i}");
            item.z_index = i as u32;
            renumber_animations(&mut item.animations);
        }
    }

    /// Deep copy with fresh item identities.
    pub(crate) fn fresh_copy(&self) -> Self {
        Self::from_items(self.0.iter().map(Item::fresh_copy).collect())
    }

    pub(crate) fn validate(&self) -> ReelResult<()> {
        for item in &self.0 {
            item.validate()?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/item.rs"]
mod tests;
