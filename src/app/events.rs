use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use winit::event_loop::EventLoopProxy;

use crate::assets::environment::load_environment;
use crate::assets::gltf::{load_model, LoadedModel};
use crate::assets::texture::load_texture;
use crate::assets::AssetError;
use crate::scene::environment::EnvironmentImage;
use crate::scene::textures::{TextureId, TextureImage, TextureRequest};

/// Completed background work, delivered on the event loop thread.
#[derive(Debug)]
pub enum AppEvent {
    EnvironmentLoaded {
        path: PathBuf,
        result: Result<EnvironmentImage, AssetError>,
    },
    ModelLoaded {
        path: PathBuf,
        result: Result<LoadedModel, AssetError>,
    },
    TextureLoaded {
        id: TextureId,
        path: PathBuf,
        result: Result<TextureImage, AssetError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    Environment(PathBuf),
    Model(PathBuf),
    Texture(TextureRequest),
}

impl LoadRequest {
    fn kind(&self) -> &'static str {
        match self {
            LoadRequest::Environment(_) => "environment",
            LoadRequest::Model(_) => "model",
            LoadRequest::Texture(_) => "texture",
        }
    }

    /// Does the blocking decode. Runs on a loader thread.
    pub fn run(self) -> AppEvent {
        match self {
            LoadRequest::Environment(path) => {
                let result = load_environment(&path);
                AppEvent::EnvironmentLoaded { path, result }
            }
            LoadRequest::Model(path) => {
                let result = load_model(&path);
                AppEvent::ModelLoaded { path, result }
            }
            LoadRequest::Texture(request) => {
                let result = load_texture(&request.path, request.options);
                AppEvent::TextureLoaded {
                    id: request.id,
                    path: request.path,
                    result,
                }
            }
        }
    }
}

/// Where loader threads deliver their results.
pub trait EventSink: Clone + Send + 'static {
    /// Returns false once the receiving side is gone.
    fn post(&self, event: AppEvent) -> bool;
}

impl EventSink for EventLoopProxy<AppEvent> {
    fn post(&self, event: AppEvent) -> bool {
        self.send_event(event).is_ok()
    }
}

impl EventSink for mpsc::Sender<AppEvent> {
    fn post(&self, event: AppEvent) -> bool {
        self.send(event).is_ok()
    }
}

pub fn spawn_load<S: EventSink>(sink: &S, request: LoadRequest) -> std::io::Result<()> {
    let sink = sink.clone();
    thread::Builder::new()
        .name(format!("load-{}", request.kind()))
        .spawn(move || {
            let event = request.run();
            if !sink.post(event) {
                log::debug!("Event loop closed; dropping load result");
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{spawn_load, AppEvent, LoadRequest};
    use crate::scene::textures::{TextureOptions, TextureStore};
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn failed_model_load_is_delivered_as_an_event() {
        let (sender, receiver) = mpsc::channel();
        let path = PathBuf::from("no/such/model.gltf");
        spawn_load(&sender, LoadRequest::Model(path.clone())).unwrap();

        match receiver.recv_timeout(Duration::from_secs(10)).unwrap() {
            AppEvent::ModelLoaded { path: loaded, result } => {
                assert_eq!(loaded, path);
                assert!(result.is_err());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn texture_results_keep_their_id() {
        let mut store = TextureStore::new();
        store.register("a.png", TextureOptions::default());
        let id = store.register("missing/label.png", TextureOptions::default());
        let request = store
            .take_load_requests()
            .into_iter()
            .find(|request| request.id == id)
            .unwrap();

        match LoadRequest::Texture(request).run() {
            AppEvent::TextureLoaded { id: loaded, result, .. } => {
                assert_eq!(loaded, id);
                assert!(result.is_err());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
