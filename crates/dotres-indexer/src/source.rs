//! Source text access with encoding detection

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dotres_core::ExtractError;
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8, WINDOWS_1252};

/// Reads source files for parsing. Implementations must be shareable across parser tasks.
pub trait SourceReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<String, ExtractError>;

    fn exists(&self, path: &Path) -> bool;

    /// Canonical form of `path` used as the key for every file in a session.
    fn normalize(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Reads from disk, detecting BOMs, UTF-8, Shift_JIS and falling back to Windows-1252.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (text, encoding) = decode(&bytes);
        tracing::trace!("Read {} as {}", path.display(), encoding.name());
        Ok(text)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        canonicalize(path)
    }
}

fn canonicalize(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(canonical) => {
            // Strip the verbatim prefix Windows adds so paths stay comparable with user input.
            let text = canonical.to_string_lossy();
            match text.strip_prefix(r"\\?\") {
                Some(stripped) => PathBuf::from(stripped),
                None => canonical,
            }
        }
        Err(_) => path.to_path_buf(),
    }
}

/// Decode raw file bytes, returning the text and the encoding that was used.
pub fn decode(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return (text.into_owned(), encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), UTF_8);
    }
    if let Some(text) = SHIFT_JIS.decode_without_bom_handling_and_without_replacement(bytes) {
        return (text.into_owned(), SHIFT_JIS);
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    (text.into_owned(), WINDOWS_1252)
}

/// In-memory sources, keyed by the exact path they were added under.
#[derive(Debug, Default, Clone)]
pub struct MemorySourceReader {
    files: HashMap<PathBuf, String>,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }
}

impl SourceReader for MemorySourceReader {
    fn read(&self, path: &Path) -> Result<String, ExtractError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ExtractError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such in-memory file"),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("class Ä {}".as_bytes());
        let (text, encoding) = decode(&bytes);
        assert_eq!(text, "class Ä {}");
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn test_decode_shift_jis() {
        let (encoded, _, _) = SHIFT_JIS.encode("// 基底クラス\nclass Base {}");
        let (text, encoding) = decode(&encoded);
        assert_eq!(encoding, SHIFT_JIS);
        assert!(text.starts_with("// 基底クラス"));
    }

    #[test]
    fn test_fs_reader_normalizes_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("A.cs");
        std::fs::write(&file, "class A {}").unwrap();

        let reader = FsSourceReader;
        let dotted = dir.path().join(".").join("A.cs");
        assert_eq!(reader.normalize(&dotted), std::fs::canonicalize(&file).unwrap());
        let missing = dir.path().join("Missing.cs");
        assert_eq!(reader.normalize(&missing), missing);
    }

    #[test]
    fn test_memory_reader() {
        let reader = MemorySourceReader::new().with_file("A.cs", "class A {}");
        assert!(reader.exists(Path::new("A.cs")));
        assert_eq!(reader.read(Path::new("A.cs")).unwrap(), "class A {}");
        assert!(matches!(reader.read(Path::new("B.cs")), Err(ExtractError::Read { .. })));
    }
}
