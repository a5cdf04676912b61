pub mod config;
pub mod decoder;
mod error;
pub mod loader;
pub mod progress;
pub mod session;
pub mod transport;


pub use config::{LoaderConfig, UrlRemap};
pub use decoder::{AssetDecoder, BufferDecoder, GeometryBuffer, Texture, TextureDecoder, TextureFormat};
pub use error::{LoadError, LoadResult};
pub use loader::{AssetLoader, BufferLoader, LoadCallbacks, TextureLoader};
pub use progress::ProgressAggregator;
pub use session::{LoadingSession, SessionCallbacks};
pub use transport::{AssetTransport, FileAssetIO, HttpAssetIO, TransportOp, TransportPayload, TransportRequest};

pub use pigment_base::{AggregateProgress, AssetHandle, AssetKey, AssetKind, LoadState, ProgressTick};

use std::sync::Arc;

//
// Everything a scene needs to stream its textures and geometry buffers: one session, and one
// loader per asset kind sharing it and a transport.
//
// Callers load through the manager and call update() regularly. Nothing is delivered between
// updates.
//
pub struct AssetManager {
    session: LoadingSession,
    textures: TextureLoader,
    buffers: BufferLoader,
}

impl AssetManager {
    pub fn new(
        config: &LoaderConfig,
        transport: Arc<dyn AssetTransport>,
        callbacks: SessionCallbacks,
    ) -> Self {
        let session = LoadingSession::from_config(config, callbacks);

        let mut textures = TextureLoader::new(TextureDecoder, session.clone(), transport.clone());
        if let Some(texture_path) = &config.texture_path {
            textures.set_path(texture_path.as_str());
        }

        let mut buffers = BufferLoader::new(BufferDecoder, session.clone(), transport);
        if let Some(buffer_path) = &config.buffer_path {
            buffers.set_path(buffer_path.as_str());
        }

        AssetManager {
            session,
            textures,
            buffers,
        }
    }

    /// Reads assets from `config.asset_root` on disk
    pub fn with_file_io(
        config: &LoaderConfig,
        callbacks: SessionCallbacks,
    ) -> LoadResult<Self> {
        let transport = FileAssetIO::new(config.asset_root.clone(), config.io_thread_count)?;
        Ok(Self::new(config, Arc::new(transport), callbacks))
    }

    /// Fetches assets over http(s). Urls must be absolute after remapping.
    pub fn with_http_io(
        config: &LoaderConfig,
        callbacks: SessionCallbacks,
    ) -> LoadResult<Self> {
        let transport = HttpAssetIO::new(config.io_thread_count)?;
        Ok(Self::new(config, Arc::new(transport), callbacks))
    }

    pub fn session(&self) -> &LoadingSession {
        &self.session
    }

    pub fn textures(&self) -> &TextureLoader {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureLoader {
        &mut self.textures
    }

    pub fn buffers(&self) -> &BufferLoader {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferLoader {
        &mut self.buffers
    }

    pub fn load_texture(
        &mut self,
        url: &str,
        callbacks: LoadCallbacks<Texture>,
    ) -> AssetHandle<Texture> {
        self.textures.load(url, callbacks)
    }

    pub fn load_buffer(
        &mut self,
        url: &str,
        callbacks: LoadCallbacks<GeometryBuffer>,
    ) -> AssetHandle<GeometryBuffer> {
        self.buffers.load(url, callbacks)
    }

    pub fn update(&mut self) {
        self.buffers.update();
        self.textures.update();
    }

    /// True when neither loader has work outstanding
    pub fn is_idle(&self) -> bool {
        self.textures.is_idle() && self.buffers.is_idle()
    }
}
