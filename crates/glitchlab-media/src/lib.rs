pub mod decoder;
pub mod encoder;
pub mod error;

pub use decoder::{decode_image, load_image};
pub use encoder::{save_current, save_image, SaveFormat};
pub use error::{MediaError, Result};
