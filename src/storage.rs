//! Local-disk image storage for portfolio uploads. Files land under the
//! uploads root and are served back by actix-files at `/uploads`.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

pub const PORTFOLIO_BUCKET: &str = "portfolio";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported image type")]
    UnsupportedType,
    #[error("image larger than {MAX_IMAGE_BYTES} bytes")]
    TooLarge,
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    pub fn user_message(&self) -> &'static str {
        match self {
            UploadError::UnsupportedType => "Apenas arquivos de imagem são permitidos (PNG, JPG ou WEBP).",
            UploadError::TooLarge => "A imagem deve ter no máximo 5MB.",
            UploadError::Io(_) => "Erro ao salvar a imagem. Tente novamente.",
        }
    }
}

#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.root.join(PORTFOLIO_BUCKET))
    }

    /// Validates and persists an uploaded image, returning the public URL
    /// path under which actix-files serves it.
    pub fn save_image(
        &self,
        bucket: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let extension = image_extension(original_name).ok_or(UploadError::UnsupportedType)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge);
        }

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let dir = self.root.join(bucket);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(&file_name), bytes)?;

        Ok(format!("/uploads/{bucket}/{file_name}"))
    }
}

fn image_extension(file_name: &str) -> Option<String> {
    let extension = file_name.rsplit('.').next()?.to_lowercase();
    if file_name.contains('.') && IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(extension)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> UploadStore {
        UploadStore::new(std::env::temp_dir().join(format!("petshop-test-{}", Uuid::new_v4())))
    }

    #[test]
    fn accepts_known_image_extensions_only() {
        let store = temp_store();
        let url = store
            .save_image(PORTFOLIO_BUCKET, "racao.png", b"fake image bytes")
            .unwrap();
        assert!(url.starts_with("/uploads/portfolio/"));
        assert!(url.ends_with(".png"));

        assert!(matches!(
            store.save_image(PORTFOLIO_BUCKET, "script.sh", b"echo"),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            store.save_image(PORTFOLIO_BUCKET, "noextension", b"data"),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[test]
    fn rejects_images_over_the_size_cap() {
        let store = temp_store();
        let oversized = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            store.save_image(PORTFOLIO_BUCKET, "big.jpg", &oversized),
            Err(UploadError::TooLarge)
        ));
    }

    #[test]
    fn written_file_exists_on_disk() {
        let store = temp_store();
        let url = store
            .save_image(PORTFOLIO_BUCKET, "foto.webp", b"bytes")
            .unwrap();
        let file_name = url.rsplit('/').next().unwrap();
        let path = store.root().join(PORTFOLIO_BUCKET).join(file_name);
        assert!(path.exists());
        std::fs::remove_dir_all(store.root()).unwrap();
    }
}
