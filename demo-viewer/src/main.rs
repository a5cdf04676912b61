use pigment::loader::config::LoaderConfigJson;
use pigment::loader::{AssetManager, GeometryBuffer, LoadCallbacks, LoaderConfig, SessionCallbacks, Texture};
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Default, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
enum TransportJson {
    #[default]
    File,
    Http,
}

// What to load, and how to fetch it
#[derive(Deserialize)]
struct SceneJson {
    #[serde(default)]
    transport: TransportJson,
    loader: LoaderConfigJson,
    #[serde(default)]
    textures: Vec<String>,
    #[serde(default)]
    buffers: Vec<String>,
}

pub fn default_scene_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data/viewer.json"))
}

fn session_callbacks() -> SessionCallbacks {
    SessionCallbacks {
        on_start: Some(Box::new(|url, finished, total| {
            log::info!("Started loading {} ({}/{} items finished)", url, finished, total);
        })),
        on_progress: Some(Box::new(|progress| {
            match progress.fraction() {
                Some(fraction) => println!(
                    "progress {}/{} bytes ({:.0}%)",
                    progress.loaded,
                    progress.total,
                    fraction * 100.0
                ),
                None => println!("progress unknown"),
            }
        })),
        on_load: Some(Box::new(|| println!("all items finished"))),
        on_error: Some(Box::new(|url| println!("failed to load {}", url))),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Setup logging
    env_logger::Builder::default()
        .write_style(env_logger::WriteStyle::Always)
        .filter_level(log::LevelFilter::Debug)
        .init();

    let scene_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_scene_path);
    log::info!("Loading scene {:?}", scene_path);

    let scene: SceneJson = serde_json::from_str(&std::fs::read_to_string(&scene_path)?)?;
    let root_path = scene_path.parent().unwrap_or_else(|| Path::new(""));
    let config = LoaderConfig::from_json(root_path, scene.loader)?;

    let mut manager = match scene.transport {
        TransportJson::File => AssetManager::with_file_io(&config, session_callbacks())?,
        TransportJson::Http => AssetManager::with_http_io(&config, session_callbacks())?,
    };

    // Every texture is requested twice. The second request joins the first instead of fetching
    // again.
    for url in &scene.textures {
        for request in 0..2 {
            let loaded_url = url.clone();
            let failed_url = url.clone();
            let handle = manager.load_texture(
                url,
                LoadCallbacks::new()
                    .on_load(move |texture: std::sync::Arc<Texture>| {
                        println!(
                            "texture {} (request {}) loaded: {} bytes {:?} {:?}",
                            loaded_url,
                            request,
                            texture.data.len(),
                            texture.format,
                            texture.mime_type
                        );
                    })
                    .on_error(move |error| {
                        println!("texture {} (request {}) failed: {}", failed_url, request, error);
                    }),
            );
            log::debug!("requested {:?}", handle);
        }
    }

    for url in &scene.buffers {
        let loaded_url = url.clone();
        let failed_url = url.clone();
        manager.load_buffer(
            url,
            LoadCallbacks::new()
                .on_load(move |buffer: std::sync::Arc<GeometryBuffer>| {
                    println!("buffer {} loaded: {} bytes", loaded_url, buffer.data.len());
                })
                .on_error(move |error| {
                    println!("buffer {} failed: {}", failed_url, error);
                }),
        );
    }

    while !manager.is_idle() {
        std::thread::sleep(std::time::Duration::from_millis(15));
        manager.update();
    }

    let session = manager.session();
    println!(
        "finished {} items, {} failed, {:?}",
        session.items_finished(),
        session.items_failed(),
        session.progress()
    );

    Ok(())
}
