mod api;
mod codec;
mod error;
mod nii;
mod raster;
mod util;


pub use api::{export_slice_png, load_image};
pub use codec::{FileLoader, ImageLoader, LoadedImage, MemoryLoader};
pub use error::{IoError, Result};
