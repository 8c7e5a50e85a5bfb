/*!
 * Tests for file utilities
 */

use anyhow::Result;
use narrata::file_utils::FileManager;
use crate::common;

#[test]
fn test_write_bytes_withMissingParent_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("a").join("b").join("audio.webm");

    FileManager::write_bytes(&path, b"\x1a\x45\xdf\xa3")?;

    assert!(FileManager::file_exists(&path));
    assert!(FileManager::dir_exists(temp_dir.path().join("a").join("b")));
    assert_eq!(std::fs::read(&path)?, b"\x1a\x45\xdf\xa3");
    Ok(())
}

#[test]
fn test_write_and_read_withText_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("script.txt");

    FileManager::write_to_file(&path, "Érase una vez.")?;
    assert_eq!(FileManager::read_to_string(&path)?, "Érase una vez.");
    Ok(())
}

#[test]
fn test_read_to_string_withMissingFile_shouldFail() {
    assert!(FileManager::read_to_string("/definitely/not/here.txt").is_err());
}

#[test]
fn test_script_output_path_withTopic_shouldSlugify() {
    let path = FileManager::script_output_path("/tmp/out", "  The History of Lighthouses!  ");
    assert_eq!(path, std::path::PathBuf::from("/tmp/out/the-history-of-lighthouses.txt"));
}

#[test]
fn test_script_output_path_withSymbolsOnly_shouldUseTimestamp() {
    let path = FileManager::script_output_path("out", "?!");
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("script-"));
    assert!(name.ends_with(".txt"));
}
