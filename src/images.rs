use std::{fs, path::PathBuf, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::{constants::MEDIA_URL, error::RecipeError};

const RECIPE_IMAGE_DIR: &str = "recipes";

/// Image store collaborator: turns an encoded upload into a stable reference.
pub trait ImageStore: Send + Sync {
    fn save(&self, encoded: &str) -> Result<String, RecipeError>;
}

/// Runs `save` on the blocking thread pool.
pub async fn store_image(images: Arc<dyn ImageStore>, encoded: String) -> Result<String, RecipeError> {
    tokio::task::spawn_blocking(move || images.save(&encoded))
        .await
        .map_err(|e| RecipeError::Image(format!("Image task failed: {e}")))?
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// Accepts `data:image/<type>;base64,<payload>` or bare base64. The file type
/// is taken from the decoded bytes, not from the declared media type.
pub fn decode_image(encoded: &str) -> Result<(&'static str, Vec<u8>), RecipeError> {
    let payload = match encoded.trim().split_once(',') {
        Some((header, payload)) => {
            if !(header.starts_with("data:image/") && header.ends_with(";base64")) {
                return Err(RecipeError::validation(
                    "image",
                    "Expected a base64 encoded image data URI",
                ));
            }
            payload
        }
        None => encoded.trim(),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| RecipeError::validation("image", "Image is not valid base64"))?;

    let extension = sniff_extension(&bytes).ok_or_else(|| {
        RecipeError::validation("image", "Upload a valid image (png, jpg, gif or webp)")
    })?;

    Ok((extension, bytes))
}

/// Stores images on disk, content addressed by their SHA-256 digest.
#[derive(Debug, Clone)]
pub struct MediaDirectory {
    root: PathBuf,
}

impl MediaDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageStore for MediaDirectory {
    fn save(&self, encoded: &str) -> Result<String, RecipeError> {
        let (extension, bytes) = decode_image(encoded)?;
        let filename = format!("{}.{extension}", hex::encode(Sha256::digest(&bytes)));

        let directory = self.root.join(RECIPE_IMAGE_DIR);
        fs::create_dir_all(&directory).map_err(|e| RecipeError::Image(format!("{e}")))?;

        let path = directory.join(&filename);
        if !path.exists() {
            fs::write(&path, &bytes).map_err(|e| RecipeError::Image(format!("{e}")))?;
            log::debug!("Stored image {}", path.display());
        }

        Ok(format!("{MEDIA_URL}/{RECIPE_IMAGE_DIR}/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn png_data_uri() -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))
    }

    #[rstest]
    fn stores_content_addressed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaDirectory::new(dir.path());

        let reference = store.save(&png_data_uri()).unwrap();
        let again = store.save(&STANDARD.encode(PNG_BYTES)).unwrap();

        assert_eq!(reference, again);
        assert!(reference.starts_with("/media/recipes/"));
        assert!(reference.ends_with(".png"));

        let filename = reference.rsplit('/').next().unwrap();
        let stored = fs::read(dir.path().join("recipes").join(filename)).unwrap();
        assert_eq!(stored, PNG_BYTES);
    }

    #[rstest]
    #[tokio::test]
    async fn stores_off_the_executor() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ImageStore> = Arc::new(MediaDirectory::new(dir.path()));

        let reference = store_image(store.clone(), png_data_uri()).await.unwrap();
        assert_eq!(reference, store.save(&png_data_uri()).unwrap());

        assert!(matches!(
            store_image(store, String::from("data:text/plain;base64,aGVsbG8=")).await,
            Err(RecipeError::Validation(_))
        ));
    }

    #[rstest]
    #[case("data:image/png;base64,!!!")]
    #[case("data:text/plain;base64,aGVsbG8=")]
    #[case("aGVsbG8gd29ybGQ=")]
    fn rejects_invalid_images(#[case] encoded: &str) {
        assert!(matches!(
            decode_image(encoded),
            Err(RecipeError::Validation(errors)) if errors.field("image").is_some()
        ));
    }
}
