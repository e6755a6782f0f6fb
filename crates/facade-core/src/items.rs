//! Diagram item store.

use crate::geometry::PlaneSize;
use crate::image::ImageRef;
use crate::transform::Transform;
use uuid::Uuid;

/// Unique identifier for a placed diagram. UUIDv7, so ids sort by creation time.
pub type ItemId = Uuid;

/// Loading state of an item's texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureState {
    /// Decode still in flight; nothing is drawn.
    Pending,
    /// Texture uploaded; the plane has its final size.
    Ready { plane: PlaneSize },
}

/// A diagram placed in the scene.
#[derive(Debug, Clone)]
pub struct DiagramItem {
    id: ItemId,
    /// The diagram image.
    pub image: ImageRef,
    /// Specification sheet paired with the diagram.
    pub spec_image: Option<ImageRef>,
    pub texture: TextureState,
    pub transform: Transform,
    pub selected: bool,
}

impl DiagramItem {
    pub fn new(image: ImageRef, spec_image: Option<ImageRef>, transform: Transform) -> Self {
        Self {
            id: Uuid::now_v7(),
            image,
            spec_image,
            texture: TextureState::Pending,
            transform,
            selected: false,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.texture, TextureState::Ready { .. })
    }
}

/// Ordered collection of diagram items, back to front.
#[derive(Debug, Clone, Default)]
pub struct DiagramStore {
    items: Vec<DiagramItem>,
}

impl DiagramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform for the next item: a copy of the last item's, or identity.
    pub fn default_transform(&self) -> Transform {
        self.items
            .last()
            .map(|item| item.transform)
            .unwrap_or(Transform::IDENTITY)
    }

    /// Append a new item with the default transform and return its id.
    pub fn add(&mut self, image: ImageRef, spec_image: Option<ImageRef>) -> ItemId {
        let item = DiagramItem::new(image, spec_image, self.default_transform());
        let id = item.id();
        self.items.push(item);
        id
    }

    /// Remove an item, preserving the order of the others.
    pub fn remove(&mut self, id: ItemId) -> Option<DiagramItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: ItemId) -> Option<&DiagramItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut DiagramItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Replace an item's transform. Returns false if the item is unknown.
    pub fn set_transform(&mut self, id: ItemId, transform: Transform) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Mark exactly one item (or none) as selected.
    pub fn mark_selected(&mut self, id: Option<ItemId>) {
        for item in &mut self.items {
            item.selected = Some(item.id) == id;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagramItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
