use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

impl TextureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Decode options applied when an image file becomes a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextureOptions {
    pub flip_y: bool,
    pub srgb: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_y: false,
            srgb: true,
        }
    }
}

/// RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub enum TextureState {
    Pending { requested: bool },
    Ready(TextureImage),
    Failed(String),
}

#[derive(Debug)]
struct TextureSlot {
    path: Option<PathBuf>,
    options: TextureOptions,
    state: TextureState,
    revision: u64,
}

/// A file-backed texture that still has to be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub id: TextureId,
    pub path: PathBuf,
    pub options: TextureOptions,
}

/// All textures known to the scene. File textures are deduplicated by path
/// and options so several nodes can share one decode.
#[derive(Debug, Default)]
pub struct TextureStore {
    slots: Vec<TextureSlot>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn register(&mut self, path: impl AsRef<Path>, options: TextureOptions) -> TextureId {
        let path = path.as_ref();
        if let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.path.as_deref() == Some(path) && slot.options == options)
        {
            return TextureId(index as u32);
        }
        self.push(TextureSlot {
            path: Some(path.to_path_buf()),
            options,
            state: TextureState::Pending { requested: false },
            revision: 0,
        })
    }

    /// Adds an already decoded image, e.g. one embedded in a glTF file.
    pub fn insert_ready(&mut self, image: TextureImage, options: TextureOptions) -> TextureId {
        self.push(TextureSlot {
            path: None,
            options,
            state: TextureState::Ready(image),
            revision: 1,
        })
    }

    fn push(&mut self, slot: TextureSlot) -> TextureId {
        let id = TextureId(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    /// Hands out every pending file texture exactly once.
    pub fn take_load_requests(&mut self) -> Vec<TextureRequest> {
        let mut requests = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let TextureState::Pending { requested } = &mut slot.state else {
                continue;
            };
            if *requested {
                continue;
            }
            let Some(path) = slot.path.clone() else {
                continue;
            };
            *requested = true;
            requests.push(TextureRequest {
                id: TextureId(index as u32),
                path,
                options: slot.options,
            });
        }
        requests
    }

    pub fn complete(&mut self, id: TextureId, result: Result<TextureImage, String>) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            log::warn!("Texture completion for unknown id {:?}", id);
            return;
        };
        slot.state = match result {
            Ok(image) => TextureState::Ready(image),
            Err(message) => TextureState::Failed(message),
        };
        slot.revision += 1;
    }

    pub fn state(&self, id: TextureId) -> Option<&TextureState> {
        self.slots.get(id.index()).map(|slot| &slot.state)
    }

    pub fn image(&self, id: TextureId) -> Option<&TextureImage> {
        match self.state(id)? {
            TextureState::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn options(&self, id: TextureId) -> Option<TextureOptions> {
        self.slots.get(id.index()).map(|slot| slot.options)
    }

    pub fn path(&self, id: TextureId) -> Option<&Path> {
        self.slots.get(id.index()).and_then(|slot| slot.path.as_deref())
    }

    /// Bumped whenever the slot's image changes; zero while nothing is decoded.
    pub fn revision(&self, id: TextureId) -> u64 {
        self.slots.get(id.index()).map_or(0, |slot| slot.revision)
    }
}

/// Named texture variants for one node, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureRegistry {
    entries: Vec<(String, TextureId)>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, id: TextureId) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = id,
            None => self.entries.push((key, id)),
        }
    }

    pub fn get(&self, key: &str) -> Option<TextureId> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, id)| *id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(key, _)| key.as_str())
    }

}

#[cfg(test)]
mod tests {
    use super::{TextureImage, TextureOptions, TextureRegistry, TextureState, TextureStore};

    fn pixel(rgba: [u8; 4]) -> TextureImage {
        TextureImage {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    #[test]
    fn register_dedupes_same_path_and_options() {
        let mut store = TextureStore::new();
        let options = TextureOptions::default();
        let a = store.register("assets/Label1.png", options);
        let b = store.register("assets/Label1.png", options);
        let c = store.register(
            "assets/Label1.png",
            TextureOptions {
                flip_y: true,
                srgb: true,
            },
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn load_requests_are_handed_out_once() {
        let mut store = TextureStore::new();
        let id = store.register("a.png", TextureOptions::default());
        store.insert_ready(pixel([255; 4]), TextureOptions::default());

        let requests = store.take_load_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, id);
        assert!(store.take_load_requests().is_empty());
    }

    #[test]
    fn completion_bumps_revision_and_exposes_image() {
        let mut store = TextureStore::new();
        let id = store.register("a.png", TextureOptions::default());
        assert_eq!(store.revision(id), 0);
        assert!(store.image(id).is_none());

        store.complete(id, Ok(pixel([1, 2, 3, 4])));
        assert_eq!(store.revision(id), 1);
        assert_eq!(store.image(id).map(|image| image.pixels.clone()), Some(vec![1, 2, 3, 4]));

        store.complete(id, Err("gone".to_string()));
        assert!(matches!(store.state(id), Some(TextureState::Failed(_))));
        assert_eq!(store.revision(id), 2);
    }

    #[test]
    fn registry_keeps_insertion_order_and_replaces_keys() {
        let mut store = TextureStore::new();
        let first = store.register("1.png", TextureOptions::default());
        let second = store.register("2.png", TextureOptions::default());
        let mut registry = TextureRegistry::new();
        registry.insert("label1", first);
        registry.insert("label2", second);
        registry.insert("label1", second);

        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["label1", "label2"]);
        assert_eq!(registry.get("label1"), Some(second));
        assert_eq!(registry.first_key(), Some("label1"));
        assert!(registry.get("label3").is_none());
    }
}
