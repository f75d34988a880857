use bytes::Bytes;
use std::fmt;
use std::io;
use std::sync::LazyLock;

/// An encoded sprite image.
#[derive(Clone, PartialEq, Eq)]
pub struct Sprite {
    pub bytes: Bytes,
    pub is_placeholder: bool,
}

impl Sprite {
    pub const SIZE: u32 = 96;

    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            is_placeholder: false,
        }
    }

    /// A grey silhouette shown when a sprite cannot be fetched.
    pub fn placeholder() -> Self {
        static PLACEHOLDER: LazyLock<Bytes> = LazyLock::new(draw_placeholder);

        Self {
            bytes: PLACEHOLDER.clone(),
            is_placeholder: true,
        }
    }
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("bytes", &self.bytes.len())
            .field("is_placeholder", &self.is_placeholder)
            .finish()
    }
}

fn draw_placeholder() -> Bytes {
    const OUTER: f32 = 40.0;
    const INNER: f32 = 10.0;
    const BAND: f32 = 3.0;

    let center = Sprite::SIZE as f32 / 2.0;
    let grey = image::Rgba([0x62, 0x72, 0xa4, 0xff]);
    let clear = image::Rgba([0, 0, 0, 0]);

    let silhouette = image::RgbaImage::from_fn(Sprite::SIZE, Sprite::SIZE, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let distance = (dx * dx + dy * dy).sqrt();

        let is_outline = (OUTER - BAND..=OUTER).contains(&distance);
        let is_band = distance < OUTER && dy.abs() < BAND / 2.0 && distance > INNER;
        let is_button = (INNER - BAND..=INNER).contains(&distance);

        if is_outline || is_band || is_button {
            grey
        } else {
            clear
        }
    });

    let mut png = Vec::new();

    match silhouette.write_to(&mut io::Cursor::new(&mut png), image::ImageFormat::Png) {
        Ok(()) => Bytes::from(png),
        Err(error) => {
            log::error!("Could not encode placeholder sprite: {error}");

            Bytes::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_a_png_of_sprite_size() {
        let sprite = Sprite::placeholder();

        assert!(sprite.is_placeholder);
        assert_eq!(
            image::guess_format(&sprite.bytes).ok(),
            Some(image::ImageFormat::Png)
        );

        let decoded = image::load_from_memory(&sprite.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (Sprite::SIZE, Sprite::SIZE));
    }
}
