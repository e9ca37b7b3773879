use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::types::ValidationError;

pub const UPLOAD_DIR: &str = "posts";
pub const MEDIA_URL: &str = "/media/";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// An image as it arrives inside a JSON form: file name plus base64 bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    pub name: String,
    pub content: String,
}

/// Decoded, checked image ready to be stored.
#[derive(Debug)]
pub struct Image {
    pub name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Accepts the upload only if it decodes completely as an image.
    pub fn decode(&self) -> std::result::Result<Image, ValidationError> {
        let bytes = STANDARD
            .decode(self.content.trim())
            .map_err(|_| ValidationError::from("image", INVALID_IMAGE))?;
        if bytes.is_empty() {
            return Err(ValidationError::from("image", "The submitted file is empty."));
        }
        let format = image::guess_format(&bytes).map_err(|_| ValidationError::from("image", INVALID_IMAGE))?;
        if let Err(e) = image::load_from_memory_with_format(&bytes, format) {
            info!("rejected upload {}: {}", self.name, e);
            return Err(ValidationError::from("image", INVALID_IMAGE));
        }
        Ok(Image {
            name: self.name.clone(),
            format,
            bytes,
        })
    }
}

/// File extension for a stored image.
fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Keeps only the final path component and replaces anything unusual.
fn clean_name(name: &str, kind: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        format!("image.{}", kind)
    } else {
        cleaned
    }
}

fn with_suffix(name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    match name.rfind('.') {
        Some(dot) => format!("{}_{}{}", &name[..dot], suffix, &name[dot..]),
        None => format!("{}_{}", name, suffix),
    }
}

/// Uploaded files on disk, below the media root.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> MediaStore {
        MediaStore { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root.
    /// An existing file is never overwritten; the name gets a random suffix.
    pub fn save(&self, image: &Image) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        fs::create_dir_all(&dir)?;

        let base = clean_name(&image.name, extension(image.format));
        let mut name = base.clone();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(dir.join(&name)) {
                Ok(mut file) => {
                    file.write_all(&image.bytes)?;
                    break;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => name = with_suffix(&base),
                Err(e) => return Err(e.into()),
            }
        }
        info!("stored upload {}/{}", UPLOAD_DIR, name);
        Ok(format!("{}/{}", UPLOAD_DIR, name))
    }

    /// Deletes a stored upload, given the path `save` returned.
    pub fn remove(&self, path: &str) {
        match fs::remove_file(self.root.join(path)) {
            Ok(()) => info!("removed upload {}", path),
            Err(e) => warn!("could not remove upload {}: {}", path, e),
        }
    }
}

pub fn media_url(path: &str) -> String {
    format!("{}{}", MEDIA_URL, path)
}
