use crate::pokedex::Session;
use crate::pokedex::creature;

use bytes::Bytes;
use std::fmt;
use std::io;
use tokio::task;

/// A decoded sprite, ready to be turned into an image handle.
#[derive(Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Bytes,
    pub is_placeholder: bool,
}

impl Image {
    pub fn fetch(
        session: &Session,
        id: creature::Id,
        shiny: bool,
    ) -> impl Future<Output = Result<Image, anywho::Error>> + 'static {
        let session = session.clone();

        async move {
            let sprite = session.fetch_sprite(id, shiny).await;
            let is_placeholder = sprite.is_placeholder;

            // Decode image as RGBA in a background blocking thread
            task::spawn_blocking(move || {
                let image = image::ImageReader::new(io::Cursor::new(sprite.bytes))
                    .with_guessed_format()?
                    .decode()?
                    .to_rgba8();

                Ok(Image {
                    width: image.width(),
                    height: image.height(),
                    rgba: Bytes::from(image.into_raw()),
                    is_placeholder,
                })
            })
            .await?
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgba", &self.rgba.len())
            .field("is_placeholder", &self.is_placeholder)
            .finish()
    }
}
