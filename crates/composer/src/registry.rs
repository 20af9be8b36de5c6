use std::fmt;

use uuid::Uuid;

use crate::resource::{ColorResource, Named, TextureResource};

/// Opaque key minted for every registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion-ordered map from [`ResourceId`] to entries.
///
/// Order is significant: it decides declaration order in the composed shader
/// and the texture unit each sampler is bound to. Replacing an entry keeps its
/// slot. Names are not checked here.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: Vec<(ResourceId, T)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` at the end, or replaces the existing entry in place.
    pub fn put(&mut self, id: ResourceId, entry: T) {
        match self.position(id) {
            Some(index) => self.entries[index].1 = entry,
            None => self.entries.push((id, entry)),
        }
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<T> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: ResourceId) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, entry)| entry)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(key, _)| *key == id)
            .map(|(_, entry)| entry)
    }

    /// Entries in insertion order.
    pub fn list(&self) -> Vec<&T> {
        self.entries.iter().map(|(_, entry)| entry).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &T)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: ResourceId) -> Option<usize> {
        self.entries.iter().position(|(key, _)| *key == id)
    }
}

impl<T: Named> Registry<T> {
    /// Looks an entry up by display name, returning the first match.
    pub fn find_by_name(&self, name: &str) -> Option<ResourceId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.name() == name)
            .map(|(id, _)| *id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(_, entry)| entry.name())
    }
}

/// The texture and color registries consumed by a render request.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub textures: Registry<TextureResource>,
    pub colors: Registry<ColorResource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a texture under a fresh identifier.
    pub fn add_texture(&mut self, texture: TextureResource) -> ResourceId {
        let id = ResourceId::generate();
        tracing::debug!(%id, name = %texture.name, "registered texture");
        self.textures.put(id, texture);
        id
    }

    /// Registers a color under a fresh identifier.
    pub fn add_color(&mut self, color: ColorResource) -> ResourceId {
        let id = ResourceId::generate();
        tracing::debug!(%id, name = %color.name, color = %color.color, "registered color");
        self.colors.put(id, color);
        id
    }

    /// Default name for the next texture (`tex0`, `tex1`, ...).
    pub fn next_texture_name(&self) -> String {
        self.free_name("tex", self.textures.len())
    }

    /// Default name for the next color (`col0`, `col1`, ...).
    pub fn next_color_name(&self) -> String {
        self.free_name("col", self.colors.len())
    }

    /// `{stem}{n}` for the first `n >= start` no resource uses yet.
    fn free_name(&self, stem: &str, start: usize) -> String {
        (start..)
            .map(|n| format!("{stem}{n}"))
            .find(|candidate| self.all_names().all(|name| name != candidate))
            .unwrap_or_else(|| stem.to_string())
    }

    /// Every display name in use, textures first.
    pub fn all_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.textures.names().chain(self.colors.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_appends_then_replaces_in_place() {
        let mut registry = Registry::new();
        let a = ResourceId::generate();
        let b = ResourceId::generate();
        let c = ResourceId::generate();
        registry.put(a, "a");
        registry.put(b, "b");
        registry.put(c, "c");
        registry.put(b, "b2");

        assert_eq!(registry.list(), vec![&"a", &"b2", &"c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn remove_preserves_remaining_order() {
        let mut registry = Registry::new();
        let ids: Vec<_> = (0..4).map(|_| ResourceId::generate()).collect();
        for (index, id) in ids.iter().enumerate() {
            registry.put(*id, index);
        }

        assert_eq!(registry.remove(ids[1]), Some(1));
        assert_eq!(registry.remove(ids[1]), None);
        assert_eq!(registry.list(), vec![&0, &2, &3]);

        registry.put(ids[1], 9);
        assert_eq!(registry.list(), vec![&0, &2, &3, &9]);
    }

    #[test]
    fn default_names_follow_counts() {
        let mut resources = Resources::new();
        assert_eq!(resources.next_color_name(), "col0");
        resources.add_color(ColorResource::new("col0", "#ffffff"));
        resources.add_color(ColorResource::new("accent", "#ff0000"));
        assert_eq!(resources.next_color_name(), "col2");
        assert_eq!(resources.next_texture_name(), "tex0");
        assert!(resources.colors.find_by_name("accent").is_some());

        resources.add_texture(TextureResource::new(
            "tex1",
            std::sync::Arc::new(image::RgbaImage::new(1, 1)),
        ));
        assert_eq!(resources.next_texture_name(), "tex2");
        assert_eq!(
            resources.all_names().collect::<Vec<_>>(),
            vec!["tex1", "col0", "accent"]
        );
    }
}
