use crate::core::Session;
use crate::errors::{PageModelError, Result};
use base64::Engine;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct ScreenshotManager;

impl ScreenshotManager {
    /// `screenshot_<YYYY_MM_DD-HH_MM_SS>` in local time.
    pub fn default_name() -> String {
        format!("screenshot_{}", Self::timestamp())
    }

    pub fn timestamp() -> String {
        Local::now().format("%Y_%m_%d-%H_%M_%S").to_string()
    }

    pub async fn take_base64(session: &Session) -> Result<String> {
        session.driver().capture_screenshot_base64().await
    }

    pub async fn take_bytes(session: &Session) -> Result<Vec<u8>> {
        let encoded = Self::take_base64(session).await?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| PageModelError::ScreenshotFailed(e.to_string()))
    }

    /// Capture the viewport into `<dir>/<name>.png`, creating `dir` when missing and
    /// overwriting an existing file of the same name. `dir` defaults to the configured
    /// screenshot directory, `name` to a timestamped one.
    pub async fn save(session: &Session, dir: Option<&Path>, name: Option<&str>) -> Result<PathBuf> {
        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| session.config().screenshots.dir.clone());
        let name = name.map(str::to_string).unwrap_or_else(Self::default_name);

        tokio::fs::create_dir_all(&dir).await?;
        let bytes = Self::take_bytes(session).await?;
        let file_path = dir.join(format!("{}.png", name));
        tokio::fs::write(&file_path, bytes).await?;

        warn!(path = %file_path.display(), "saving screenshot");
        session.debug(&format!("Saving screenshot to: {}", file_path.display()));
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestHelper, MOCK_PNG};
    use tokio_test::assert_ok;

    fn png_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().map(|x| x == "png").unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_save_creates_directory_and_decodes() {
        let (_driver, session) = TestHelper::mock_session();
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("shots");

        let path = assert_ok!(ScreenshotManager::save(&session, Some(&dir), Some("home")).await);
        assert_eq!(path, dir.join("home.png"));
        assert_eq!(std::fs::read(&path).unwrap(), MOCK_PNG);
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let (_driver, session) = TestHelper::mock_session();
        let dir = tempfile::tempdir().unwrap();
        let before = png_count(dir.path());

        assert_ok!(ScreenshotManager::save(&session, Some(dir.path()), Some("repeat")).await);
        assert_ok!(ScreenshotManager::save(&session, Some(dir.path()), Some("repeat")).await);
        assert_ok!(ScreenshotManager::save(&session, Some(dir.path()), Some("repeat")).await);
        assert_eq!(png_count(dir.path()), before + 1);
    }

    #[tokio::test]
    async fn test_default_directory_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let (_driver, session) =
            TestHelper::mock_session_with(TestHelper::fast_config().with_screenshot_dir(dir.path()));
        let path = assert_ok!(ScreenshotManager::save(&session, None, None).await);
        assert!(path.starts_with(dir.path()));
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("screenshot_"));
        assert!(file_name.ends_with(".png"));
    }
}
