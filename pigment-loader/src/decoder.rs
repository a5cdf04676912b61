use crate::transport::TransportPayload;
use crate::{LoadError, LoadResult};
use pigment_base::{AssetKey, AssetKind};

/// Turns the bytes fetched for an asset into its in-memory representation. Called once per unique
/// asset, after the transport succeeds. The result is shared by every caller that asked for the
/// asset.
pub trait AssetDecoder {
    type Asset;

    fn kind(&self) -> AssetKind;

    fn decode(
        &mut self,
        key: &AssetKey,
        payload: TransportPayload,
    ) -> LoadResult<Self::Asset>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb,
    Rgba,
}

/// Encoded image bytes ready to hand to the renderer's image decoder
#[derive(Debug)]
pub struct Texture {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub format: TextureFormat,
}

// JPEGs can't have an alpha channel, so the renderer can save memory by storing them as RGB
fn is_jpeg_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    if url.starts_with("data:image/jpeg") {
        return true;
    }

    let path = match url.find('?') {
        Some(index) => &url[..index],
        None => url.as_str(),
    };
    path.ends_with(".jpg") || path.ends_with(".jpeg")
}

#[derive(Default)]
pub struct TextureDecoder;

impl AssetDecoder for TextureDecoder {
    type Asset = Texture;

    fn kind(&self) -> AssetKind {
        AssetKind::Texture
    }

    fn decode(
        &mut self,
        key: &AssetKey,
        payload: TransportPayload,
    ) -> LoadResult<Texture> {
        if payload.bytes.is_empty() {
            return Err(LoadError::DecodeError(format!("{} is empty", key)));
        }

        let is_jpeg = is_jpeg_url(key.as_str())
            || payload.content_type.as_deref() == Some("image/jpeg");
        let format = if is_jpeg {
            TextureFormat::Rgb
        } else {
            TextureFormat::Rgba
        };

        Ok(Texture {
            data: payload.bytes,
            mime_type: payload.content_type,
            format,
        })
    }
}

/// Vertex/index data as fetched
#[derive(Debug)]
pub struct GeometryBuffer {
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct BufferDecoder;

impl AssetDecoder for BufferDecoder {
    type Asset = GeometryBuffer;

    fn kind(&self) -> AssetKind {
        AssetKind::Buffer
    }

    fn decode(
        &mut self,
        _key: &AssetKey,
        payload: TransportPayload,
    ) -> LoadResult<GeometryBuffer> {
        Ok(GeometryBuffer {
            data: payload.bytes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_texture(
        url: &str,
        content_type: Option<&str>,
    ) -> LoadResult<Texture> {
        TextureDecoder.decode(
            &AssetKey::new(url),
            TransportPayload::new(vec![0xff, 0xd8], content_type),
        )
    }

    #[test]
    fn jpeg_textures_are_rgb() {
        assert_eq!(decode_texture("a.jpg", None).unwrap().format, TextureFormat::Rgb);
        assert_eq!(decode_texture("a/b.JPEG?x=1", None).unwrap().format, TextureFormat::Rgb);
        assert_eq!(
            decode_texture("data:image/jpeg;base64,AAAA", None).unwrap().format,
            TextureFormat::Rgb
        );
        assert_eq!(
            decode_texture("blob", Some("image/jpeg")).unwrap().format,
            TextureFormat::Rgb
        );
    }

    #[test]
    fn other_textures_are_rgba() {
        assert_eq!(decode_texture("a.png", None).unwrap().format, TextureFormat::Rgba);
        assert_eq!(decode_texture("a.jpg.png", None).unwrap().format, TextureFormat::Rgba);
        assert_eq!(
            decode_texture("a.png?name=b.jpg", Some("image/png")).unwrap().format,
            TextureFormat::Rgba
        );
    }

    #[test]
    fn empty_texture_is_an_error() {
        let result = TextureDecoder.decode(&AssetKey::new("a.png"), TransportPayload::new(vec![], None));
        assert!(matches!(result, Err(LoadError::DecodeError(_))));
    }

    #[test]
    fn buffers_pass_through() {
        let buffer = BufferDecoder
            .decode(&AssetKey::new("a.bin"), TransportPayload::new(vec![1, 2, 3], None))
            .unwrap();
        assert_eq!(buffer.data, vec![1, 2, 3]);
        assert_eq!(BufferDecoder.kind(), AssetKind::Buffer);
    }
}
