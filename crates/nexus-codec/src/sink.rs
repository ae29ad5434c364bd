use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use nexus_core::{CodecError, ImageSink};
use sha2::{Digest, Sha256};

/// Escribe `<dir>/<id>.png`. Si el id contiene caracteres no aptos para
/// nombre de archivo se reemplazan por `_` y se agrega un sufijo derivado del
/// hash del id original, para que dos ids distintos nunca compartan archivo.
#[derive(Debug, Clone)]
pub struct DirectoryImageSink {
    dir: PathBuf,
}

impl DirectoryImageSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(attendee_id: &str) -> String {
        let safe: String = attendee_id.chars()
                                      .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                                      .collect();
        if safe == attendee_id {
            return format!("{safe}.png");
        }
        let digest = Sha256::digest(attendee_id.as_bytes());
        let suffix: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
        format!("{safe}-{suffix}.png")
    }
}

impl ImageSink for DirectoryImageSink {
    fn store_image(&self, attendee_id: &str, image: &[u8]) -> Result<String, CodecError> {
        fs::create_dir_all(&self.dir).map_err(|e| CodecError::Sink(format!("create {}: {e}", self.dir.display())))?;
        let path = self.dir.join(Self::file_name_for(attendee_id));
        fs::write(&path, image).map_err(|e| CodecError::Sink(format!("write {}: {e}", path.display())))?;
        debug!("store_image attendee_id={attendee_id} path={}", path.display());
        Ok(path.display().to_string())
    }

    fn discard_image(&self, image_ref: &str) -> Result<(), CodecError> {
        match fs::remove_file(image_ref) {
            Ok(()) => {
                debug!("discard_image path={image_ref}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CodecError::Sink(format!("remove {image_ref}: {e}"))),
        }
    }
}
