use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// Outcome of a single detection pass: the annotated image and how many
/// vehicles were found in it.
pub struct Detection {
    pub image: RgbImage,
    pub vehicle_count: u32,
}

/// Closed set of ways a detection pass can fail. The display text is what
/// the upload page shows; the sources carry the detail that only goes to
/// the logs.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("the uploaded file could not be read")]
    Io(#[source] std::io::Error),
    #[error("the uploaded file could not be decoded as an image")]
    InvalidImage(#[source] image::ImageError),
    #[error("vehicle detection failed on the uploaded image")]
    Inference(String),
}

/// Seam between the HTTP front-end and the detection backend. The server
/// builds one implementation at startup and shares it across requests.
pub trait VehicleDetector: Send + Sync {
    fn detect_vehicles(&self, path: &Path) -> Result<Detection, DetectorError>;
}
