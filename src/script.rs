use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::{Error, Result};

/// Read a script file, honouring a byte order mark if there is one.
///
/// Malformed UTF-8 is replaced rather than rejected so the grammar can point
/// at the damaged line.
pub fn read_script(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| Error::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_script(&bytes, path))
}

fn decode_script(bytes: &[u8], path: &Path) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if encoding != encoding_rs::UTF_8 {
        info!("{} decoded as {}", path.display(), encoding.name());
    }
    if had_errors {
        warn!(
            "{} contains malformed {} sequences; they were replaced",
            path.display(),
            encoding.name()
        );
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_utf8_bom() {
        let text = decode_script(b"\xEF\xBB\xBFend 0\nBye\n", Path::new("bom.txt"));
        assert_eq!(text, "end 0\nBye\n");
    }

    #[test]
    fn test_replaces_malformed_bytes() {
        let text = decode_script(b"end 0\nB\xFFye\n", Path::new("bad.txt"));
        assert_eq!(text, "end 0\nB\u{FFFD}ye\n");
    }

    #[test]
    fn test_missing_file() {
        let err = read_script(Path::new("definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, Error::MissingFile { .. }));
        assert!(err.to_string().contains("definitely/not/here.txt"));
    }

    #[test]
    fn test_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("winnow-sm-{}.txt", std::process::id()));
        fs::write(&path, "end 0\nBye\n").unwrap();
        let text = read_script(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(text, "end 0\nBye\n");
    }
}
