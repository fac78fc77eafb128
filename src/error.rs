use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a program image couldn't be loaded. Either way the interpreter is left
/// freshly reset with no game loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("can't read program image{}: {source}", display_path(.path))]
    SourceUnavailable {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
    #[error("program image is {len} bytes; at most {max} fit above 0x200")]
    ImageTooLarge { len: usize, max: usize },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = LoadError::ImageTooLarge { len: 4000, max: 3584 };
        assert_eq!(
            e.to_string(),
            "program image is 4000 bytes; at most 3584 fit above 0x200"
        );

        let e = LoadError::SourceUnavailable {
            path: Some(PathBuf::from("roms/pong.ch8")),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(e.to_string(), "can't read program image roms/pong.ch8: gone");
    }
}
