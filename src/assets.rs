use std::collections::HashMap;

use bevy::prelude::*;

/// Native pixel size of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

/// Answers the native size of an asset id. Decoding and GPU upload belong to
/// whoever implements this; the simulation only scales by the answer.
pub trait TextureProvider: Send + Sync {
    fn size_of(&self, id: &str) -> Option<TextureSize>;
}

/// Fixed table of sizes, for embedders that already decoded their art.
#[derive(Default, Clone)]
pub struct StaticTextures {
    sizes: HashMap<String, TextureSize>,
}

impl StaticTextures {
    pub fn with(mut self, id: impl Into<String>, width: u32, height: u32) -> Self {
        self.sizes.insert(id.into(), TextureSize { width, height });
        self
    }
}

impl TextureProvider for StaticTextures {
    fn size_of(&self, id: &str) -> Option<TextureSize> {
        self.sizes.get(id).copied()
    }
}

/// Reads image headers from an assets directory.
#[cfg(not(target_arch = "wasm32"))]
pub struct ImageDirectory {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl ImageDirectory {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TextureProvider for ImageDirectory {
    fn size_of(&self, id: &str) -> Option<TextureSize> {
        if id.is_empty() {
            return None;
        }
        let path = resolve_asset_path(id, &self.root);
        match image::image_dimensions(&path) {
            Ok((width, height)) => Some(TextureSize { width, height }),
            Err(e) => {
                warn!("[Tilerun assets] Cannot read {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn resolve_asset_path(id: &str, root: &std::path::Path) -> std::path::PathBuf {
    let p = std::path::Path::new(id);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[derive(Resource)]
pub struct Textures(pub Box<dyn TextureProvider>);

impl Textures {
    pub fn size_of(&self, id: &str) -> Option<TextureSize> {
        self.0.size_of(id)
    }
}

pub struct AssetsPlugin;

impl Plugin for AssetsPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<Textures>() {
            return;
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let dir = app
                .world()
                .get_resource::<crate::components::GameConfig>()
                .map(|c| c.assets_dir.clone())
                .unwrap_or_else(|| "assets".to_string());
            app.insert_resource(Textures(Box::new(ImageDirectory::new(dir))));
        }
        #[cfg(target_arch = "wasm32")]
        app.insert_resource(Textures(Box::new(StaticTextures::default())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_table_answers_known_ids() {
        let textures = StaticTextures::default().with("poziom_1_tlo.jpg", 1920, 1080);
        assert_eq!(
            textures.size_of("poziom_1_tlo.jpg"),
            Some(TextureSize {
                width: 1920,
                height: 1080
            })
        );
        assert_eq!(textures.size_of("missing.png"), None);
    }

    #[test]
    fn image_directory_reads_headers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let img = image::RgbImage::new(40, 12);
        img.save(dir.path().join("bg.png")).expect("write png");
        let provider = ImageDirectory::new(dir.path());
        assert_eq!(
            provider.size_of("bg.png"),
            Some(TextureSize {
                width: 40,
                height: 12
            })
        );
        assert_eq!(provider.size_of("nope.png"), None);
        assert_eq!(provider.size_of(""), None);
    }
}
