use super::{
    payload_buffer, AssetTransport, FetchWorker, TransportOp, TransportPayload, TransportRequest,
    TransportThreadPool,
};
use crate::{LoadError, LoadResult};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const READ_CHUNK_SIZE: usize = 64 * 1024;

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ktx2" => "image/ktx2",
        "bin" => "application/octet-stream",
        "gltf" => "model/gltf+json",
        "glb" => "model/gltf-binary",
        _ => return None,
    };
    Some(content_type)
}

struct FileFetchWorker {
    root_path: PathBuf,
}

impl FileFetchWorker {
    // Only paths below the root can be read. Absolute paths and `..` are rejected.
    fn file_path(
        &self,
        url: &str,
    ) -> LoadResult<PathBuf> {
        // Query strings are meaningful to servers, not to the filesystem
        let path = match url.find('?') {
            Some(index) => &url[..index],
            None => url,
        };
        let path = Path::new(path.strip_prefix("file://").unwrap_or(path));

        let below_root = path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !below_root {
            return Err(LoadError::StringError(format!(
                "{} is outside of the asset root",
                url
            )));
        }

        Ok(self.root_path.join(path))
    }
}

impl FetchWorker for FileFetchWorker {
    fn fetch(
        &self,
        url: &str,
        op: &TransportOp,
    ) -> LoadResult<TransportPayload> {
        let path = self.file_path(url)?;
        log::trace!("Start file read {:?}", path);

        let mut file = std::fs::File::open(&path)?;
        let total = file.metadata()?.len();

        let mut data = payload_buffer(total);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = {
                profiling::scope!("std::fs::File::read");
                file.read(&mut chunk)?
            };
            if read == 0 {
                break;
            }

            data.extend_from_slice(&chunk[..read]);
            op.progress(data.len() as u64, total);
        }

        // Empty files never went through the loop, still tell the loader we started
        if data.is_empty() {
            op.progress(0, total);
        }

        Ok(TransportPayload::new(data, guess_content_type(&path)))
    }
}

/// Reads assets from a directory on disk. Urls are treated as paths relative to the root.
pub struct FileAssetIO {
    thread_pool: TransportThreadPool,
}

impl FileAssetIO {
    pub fn new(
        root_path: PathBuf,
        thread_count: usize,
    ) -> LoadResult<Self> {
        log::info!("FileAssetIO reading from {:?}", root_path);
        let worker = Arc::new(FileFetchWorker { root_path });
        let thread_pool = TransportThreadPool::new(worker, thread_count, "File IO Thread")?;
        Ok(FileAssetIO { thread_pool })
    }

    pub fn active_request_count(&self) -> usize {
        self.thread_pool.active_request_count()
    }
}

impl AssetTransport for FileAssetIO {
    fn request(
        &self,
        request: TransportRequest,
    ) {
        log::debug!("request {:?} {}", request.load_handle, request.url);
        self.thread_pool.add_request(request);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::TransportEvent;
    use crate::LoadError;
    use pigment_base::{AssetKey, LoadHandle, ProgressTick};
    use std::time::Duration;

    fn request(
        url: &str,
        handle: u64,
        tx: &crossbeam_channel::Sender<TransportEvent>,
    ) -> TransportRequest {
        TransportRequest {
            load_handle: LoadHandle(handle),
            url: AssetKey::new(url),
            op: TransportOp::new(tx.clone(), LoadHandle(handle)),
        }
    }

    #[test]
    fn reads_file_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let bytes: Vec<u8> = (0..(READ_CHUNK_SIZE * 2 + 10)).map(|x| x as u8).collect();
        std::fs::write(dir.path().join("mesh.bin"), &bytes).unwrap();

        let io = FileAssetIO::new(dir.path().to_path_buf(), 1).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request("mesh.bin?v=2", 1, &tx));

        let total = bytes.len() as u64;
        let mut ticks = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                TransportEvent::Progress(_, tick) => ticks.push(tick),
                TransportEvent::Complete(handle, payload) => {
                    assert_eq!(handle, LoadHandle(1));
                    assert_eq!(payload.bytes, bytes);
                    assert_eq!(payload.content_type.as_deref(), Some("application/octet-stream"));
                    break;
                }
                TransportEvent::Failed(_, error) => panic!("unexpected failure {}", error),
            }
        }

        assert!(!ticks.is_empty());
        assert!(ticks.windows(2).all(|pair| pair[0].loaded <= pair[1].loaded));
        assert!(ticks.iter().all(|tick| tick.total == total));
        assert_eq!(*ticks.last().unwrap(), ProgressTick::new(total, total));
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let io = FileAssetIO::new(dir.path().to_path_buf(), 2).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request("missing.png", 5, &tx));

        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            TransportEvent::Failed(handle, LoadError::IoError(error)) => {
                assert_eq!(handle, LoadHandle(5));
                assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
            }
            event => panic!("unexpected event {:?}", event),
        }
    }

    #[test]
    fn paths_outside_root_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("secret.bin"), [1u8]).unwrap();
        std::fs::write(dir.path().join("assets").join("a.bin"), [2u8]).unwrap();
        let root = dir.path().join("assets");
        let absolute = dir.path().join("secret.bin").to_string_lossy().into_owned();

        let io = FileAssetIO::new(root, 1).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request("../secret.bin", 1, &tx));
        io.request(request(&absolute, 2, &tx));
        io.request(request("./a.bin", 3, &tx));

        for expected in 1..=2 {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                TransportEvent::Failed(handle, LoadError::StringError(_)) => {
                    assert_eq!(handle, LoadHandle(expected));
                }
                event => panic!("unexpected event {:?}", event),
            }
        }

        loop {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                TransportEvent::Progress(..) => {}
                TransportEvent::Complete(handle, payload) => {
                    assert_eq!(handle, LoadHandle(3));
                    assert_eq!(payload.bytes, vec![2]);
                    break;
                }
                event => panic!("unexpected event {:?}", event),
            }
        }
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type(Path::new("a/b.JPG")), Some("image/jpeg"));
        assert_eq!(guess_content_type(Path::new("a/b.png")), Some("image/png"));
        assert_eq!(guess_content_type(Path::new("a/b")), None);
    }
}
