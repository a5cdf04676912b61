use super::{
    payload_buffer, AssetTransport, FetchWorker, TransportOp, TransportPayload, TransportRequest,
    TransportThreadPool,
};
use crate::{LoadError, LoadResult};
use std::io::Read;
use std::sync::Arc;

const READ_CHUNK_SIZE: usize = 16 * 1024;

struct HttpFetchWorker {
    client: reqwest::blocking::Client,
}

impl FetchWorker for HttpFetchWorker {
    fn fetch(
        &self,
        url: &str,
        op: &TransportOp,
    ) -> LoadResult<TransportPayload> {
        let mut response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus(status.as_u16()));
        }

        // Zero when the server did not send a length (chunked encoding)
        let total = response.content_length().unwrap_or(0);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut data = payload_buffer(total);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        op.progress(0, total);
        loop {
            let read = response.read(&mut chunk)?;
            if read == 0 {
                break;
            }

            data.extend_from_slice(&chunk[..read]);
            op.progress(data.len() as u64, total);
        }

        Ok(TransportPayload::new(data, content_type.as_deref()))
    }
}

/// Fetches assets with HTTP GET requests. Every url must be absolute.
pub struct HttpAssetIO {
    thread_pool: TransportThreadPool,
}

impl HttpAssetIO {
    pub fn new(thread_count: usize) -> LoadResult<Self> {
        let client = reqwest::blocking::Client::builder().build()?;
        Self::with_client(client, thread_count)
    }

    /// Uses a preconfigured client, for example one with custom proxy or TLS settings
    pub fn with_client(
        client: reqwest::blocking::Client,
        thread_count: usize,
    ) -> LoadResult<Self> {
        let worker = Arc::new(HttpFetchWorker { client });
        let thread_pool = TransportThreadPool::new(worker, thread_count, "HTTP IO Thread")?;
        Ok(HttpAssetIO { thread_pool })
    }

    pub fn active_request_count(&self) -> usize {
        self.thread_pool.active_request_count()
    }
}

impl AssetTransport for HttpAssetIO {
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
    use crossbeam_channel::{Receiver, Sender};
    use pigment_base::{AssetKey, LoadHandle, ProgressTick};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::Duration;

    // Answers one connection per canned response, in order, then exits
    fn serve(responses: Vec<&'static str>) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let join_handle = std::thread::spawn(move || {
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                loop {
                    line.clear();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                }

                // The client may hang up early on a bad response
                let _ = reader.get_mut().write_all(response.as_bytes());
            }
        });
        (format!("http://{}", address), join_handle)
    }

    fn http_io(thread_count: usize) -> HttpAssetIO {
        // Keep requests to the local server away from any proxy configured in the environment
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .build()
            .unwrap();
        HttpAssetIO::with_client(client, thread_count).unwrap()
    }

    fn request(
        url: String,
        handle: u64,
        tx: &Sender<TransportEvent>,
    ) -> TransportRequest {
        TransportRequest {
            load_handle: LoadHandle(handle),
            url: AssetKey::from(url),
            op: TransportOp::new(tx.clone(), LoadHandle(handle)),
        }
    }

    // Collects progress until the terminal event for a request arrives
    fn finish(rx: &Receiver<TransportEvent>) -> (Vec<ProgressTick>, TransportEvent) {
        let mut ticks = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                TransportEvent::Progress(_, tick) => ticks.push(tick),
                event => return (ticks, event),
            }
        }
    }

    #[test]
    fn fetches_body_with_known_length() {
        let (base_url, server) = serve(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Type: image/jpeg; q=1\r\nConnection: close\r\n\r\nhello",
        ]);
        let io = http_io(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request(format!("{}/a.jpg", base_url), 1, &tx));

        let (ticks, event) = finish(&rx);
        match event {
            TransportEvent::Complete(handle, payload) => {
                assert_eq!(handle, LoadHandle(1));
                assert_eq!(payload.bytes, b"hello".to_vec());
                assert_eq!(payload.content_type.as_deref(), Some("image/jpeg"));
            }
            event => panic!("unexpected event {:?}", event),
        }
        assert_eq!(ticks.first(), Some(&ProgressTick::new(0, 5)));
        assert_eq!(ticks.last(), Some(&ProgressTick::new(5, 5)));
        server.join().unwrap();
    }

    #[test]
    fn chunked_body_has_unknown_total() {
        let (base_url, server) = serve(vec![
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
        ]);
        let io = http_io(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request(format!("{}/a.png", base_url), 1, &tx));

        let (ticks, event) = finish(&rx);
        match event {
            TransportEvent::Complete(_, payload) => {
                assert_eq!(payload.bytes, b"abcde".to_vec());
                assert_eq!(payload.content_type.as_deref(), Some("image/png"));
            }
            event => panic!("unexpected event {:?}", event),
        }
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|tick| tick.total == 0));
        assert_eq!(ticks.last().unwrap().loaded, 5);
        server.join().unwrap();
    }

    #[test]
    fn error_status_fails_request() {
        let (base_url, server) = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ]);
        let io = http_io(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request(format!("{}/missing.png", base_url), 4, &tx));

        let (ticks, event) = finish(&rx);
        assert!(ticks.is_empty());
        assert!(matches!(
            event,
            TransportEvent::Failed(LoadHandle(4), LoadError::HttpStatus(404))
        ));
        server.join().unwrap();
    }

    #[test]
    fn absurd_content_length_does_not_kill_worker() {
        let (base_url, server) = serve(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 9223372036854775808\r\nConnection: close\r\n\r\nabc",
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        ]);

        // One worker, so the second request only succeeds if the first left it alive
        let io = http_io(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        io.request(request(format!("{}/huge.bin", base_url), 1, &tx));
        io.request(request(format!("{}/small.bin", base_url), 2, &tx));

        // The body ends long before the claimed length
        let (_, event) = finish(&rx);
        match event {
            TransportEvent::Failed(handle, error) => {
                assert_eq!(handle, LoadHandle(1));
                assert!(!matches!(error, LoadError::RequestDropped));
            }
            event => panic!("unexpected event {:?}", event),
        }

        let (_, event) = finish(&rx);
        match event {
            TransportEvent::Complete(handle, payload) => {
                assert_eq!(handle, LoadHandle(2));
                assert_eq!(payload.bytes, b"ok".to_vec());
            }
            event => panic!("unexpected event {:?}", event),
        }
        assert_eq!(io.active_request_count(), 0);
        server.join().unwrap();
    }
}
