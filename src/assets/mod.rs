pub mod environment;
pub mod gltf;
pub mod texture;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import glTF at {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: ::gltf::Error,
    },
    #[error("glTF at {path} contains no scene")]
    NoScene { path: String },
    #[error("failed to decode image at {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image at {path} has no pixels")]
    EmptyImage { path: String },
}
