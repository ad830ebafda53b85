//! Input classification: plain text versus text carrying attachments.
//!
//! The terminal marks an attachment with a leading command token
//! (`/image <path> [text]`); the browser declares a media type per uploaded
//! file. Both paths produce a [`ClassifiedInput`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One-line help for the terminal attachment commands.
pub const COMMAND_USAGE: &str =
    "Commands: /image <path> [text], /audio <path> [text], /pdf <path> [text]";

const GENERIC_BINARY_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Pdf,
}

impl MediaKind {
    pub fn command(self) -> &'static str {
        match self {
            Self::Image => "/image",
            Self::Audio => "/audio",
            Self::Pdf => "/pdf",
        }
    }

    /// Matches a terminal command token, ignoring ASCII case.
    pub fn from_command(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "/image" => Some(Self::Image),
            "/audio" => Some(Self::Audio),
            "/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Maps a declared media type (`image/*`, `audio/*`, `application/pdf`).
    /// Parameters such as `; charset=..` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            Some(Self::Image)
        } else if essence.starts_with("audio/") {
            Some(Self::Audio)
        } else if essence == "application/pdf" {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

/// Raw attachment bytes plus what is known about them. Owned by the encoder
/// for one encode operation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: MediaKind,
    /// Base name of the source path or upload.
    pub filename: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A file received from the browser front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedInput {
    Plain(String),
    Attached {
        text: String,
        attachments: Vec<Attachment>,
    },
}

impl ClassifiedInput {
    /// The free text accompanying the turn.
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Attached { text, .. } => text,
        }
    }
}

/// Shape of a terminal line before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand<'a> {
    Plain,
    Attach {
        kind: MediaKind,
        path: &'a str,
        text: String,
    },
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Usage: {command} <path> [text]")]
    MissingPath { command: &'static str },
    #[error("File not found at {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("Could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unsupported file type for {filename}: {media_type}")]
    UnsupportedUpload { filename: String, media_type: String },
}

/// Splits a terminal line into command, path and trailing text.
///
/// The first two whitespace-separated tokens are the command and the path;
/// the remaining tokens are re-joined with single spaces.
pub fn parse_command_line(line: &str) -> Result<ParsedCommand<'_>, ClassifyError> {
    let mut parts = line.split_whitespace();
    let Some(kind) = parts.next().and_then(MediaKind::from_command) else {
        return Ok(ParsedCommand::Plain);
    };

    let Some(path) = parts.next() else {
        return Err(ClassifyError::MissingPath {
            command: kind.command(),
        });
    };

    Ok(ParsedCommand::Attach {
        kind,
        path,
        text: parts.collect::<Vec<_>>().join(" "),
    })
}

/// Classifies a terminal line, reading the referenced file from disk.
///
/// Errors leave the decision to fall back to plain text with the caller; no
/// remote service is involved here.
pub fn classify_command_line(line: &str) -> Result<ClassifiedInput, ClassifyError> {
    match parse_command_line(line)? {
        ParsedCommand::Plain => Ok(ClassifiedInput::Plain(line.to_string())),
        ParsedCommand::Attach { kind, path, text } => {
            let attachment = load_attachment(kind, Path::new(path))?;
            Ok(ClassifiedInput::Attached {
                text,
                attachments: vec![attachment],
            })
        }
    }
}

/// Classifies browser uploads by declared media type, falling back to the
/// file extension when the browser sent none. Unsupported uploads are skipped
/// and reported.
pub fn classify_uploads(uploads: Vec<Upload>) -> (Vec<Attachment>, Vec<ClassifyError>) {
    let mut attachments = Vec::with_capacity(uploads.len());
    let mut rejected = Vec::new();

    for upload in uploads {
        let filename = base_name(Path::new(&upload.filename));
        let media_type = upload
            .content_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && value != GENERIC_BINARY_MEDIA_TYPE)
            .or_else(|| {
                mime_guess::from_path(&filename)
                    .first_raw()
                    .map(ToString::to_string)
            });

        match media_type.as_deref().and_then(MediaKind::from_media_type) {
            Some(kind) => attachments.push(Attachment {
                kind,
                filename,
                media_type,
                bytes: upload.bytes,
            }),
            None => rejected.push(ClassifyError::UnsupportedUpload {
                filename,
                media_type: media_type.unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }

    (attachments, rejected)
}

/// Browser path: accompanying text plus zero or more uploads.
///
/// Text is kept as typed; whitespace-only text counts as no text.
pub fn classify_message(
    text: &str,
    uploads: Vec<Upload>,
) -> (ClassifiedInput, Vec<ClassifyError>) {
    let (attachments, rejected) = classify_uploads(uploads);
    let text = if text.trim().is_empty() {
        String::new()
    } else {
        text.to_string()
    };
    let input = if attachments.is_empty() {
        ClassifiedInput::Plain(text)
    } else {
        ClassifiedInput::Attached { text, attachments }
    };
    (input, rejected)
}

fn load_attachment(kind: MediaKind, path: &Path) -> Result<Attachment, ClassifyError> {
    if !path.exists() {
        return Err(ClassifyError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| ClassifyError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Attachment {
        kind,
        filename: base_name(path),
        media_type: None,
        bytes,
    })
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn upload(filename: &str, content_type: Option<&str>) -> Upload {
        Upload {
            filename: filename.to_string(),
            content_type: content_type.map(ToString::to_string),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn ordinary_text_is_plain() {
        assert_eq!(parse_command_line("hello there").ok(), Some(ParsedCommand::Plain));
        assert_eq!(parse_command_line("/help me").ok(), Some(ParsedCommand::Plain));
        assert!(matches!(
            classify_command_line("/imagine a cat"),
            Ok(ClassifiedInput::Plain(text)) if text == "/imagine a cat"
        ));
    }

    #[test]
    fn commands_match_case_insensitively_and_rejoin_trailing_text() {
        let parsed = parse_command_line("/PDF  report.pdf   please \t summarize")
            .expect("command should parse");

        assert_eq!(
            parsed,
            ParsedCommand::Attach {
                kind: MediaKind::Pdf,
                path: "report.pdf",
                text: "please summarize".to_string(),
            }
        );
    }

    #[test]
    fn command_without_path_is_an_arity_error() {
        let error = parse_command_line("/audio").expect_err("path is required");
        assert!(matches!(error, ClassifyError::MissingPath { command: "/audio" }));
        assert_eq!(error.to_string(), "Usage: /audio <path> [text]");
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let error = classify_command_line("/image missing-file-for-test.png hello")
            .expect_err("missing file should fail");

        assert!(matches!(error, ClassifyError::FileNotFound { .. }));
        assert_eq!(
            error.to_string(),
            "File not found at missing-file-for-test.png"
        );
    }

    #[test]
    fn existing_file_is_loaded_with_its_base_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("photo.jpg");
        fs::write(&path, b"\xff\xd8\xff\xe0").expect("write image");

        let line = format!("/image {} what is this?", path.display());
        let classified = classify_command_line(&line).expect("file should load");

        assert_eq!(
            classified,
            ClassifiedInput::Attached {
                text: "what is this?".to_string(),
                attachments: vec![Attachment {
                    kind: MediaKind::Image,
                    filename: "photo.jpg".to_string(),
                    media_type: None,
                    bytes: b"\xff\xd8\xff\xe0".to_vec(),
                }],
            }
        );
    }

    #[test]
    fn media_types_map_to_kinds() {
        assert_eq!(MediaKind::from_media_type("image/jpeg"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_media_type("audio/x-m4a"), Some(MediaKind::Audio));
        assert_eq!(
            MediaKind::from_media_type("Application/PDF; qs=1"),
            Some(MediaKind::Pdf)
        );
        assert_eq!(MediaKind::from_media_type("text/plain"), None);
    }

    #[test]
    fn uploads_keep_order_and_skip_unsupported_types() {
        let (attachments, rejected) = classify_uploads(vec![
            upload("a.png", Some("image/png")),
            upload("notes.txt", Some("text/plain")),
            upload("memo.wav", Some("audio/wav")),
            upload("/tmp/docs/report.pdf", Some("application/pdf")),
        ]);

        let kinds: Vec<MediaKind> = attachments.iter().map(|item| item.kind).collect();
        assert_eq!(kinds, vec![MediaKind::Image, MediaKind::Audio, MediaKind::Pdf]);
        assert_eq!(attachments[2].filename, "report.pdf");
        assert_eq!(rejected.len(), 1);
        assert_eq!(
            rejected[0].to_string(),
            "Unsupported file type for notes.txt: text/plain"
        );
    }

    #[test]
    fn uploads_without_declared_type_are_guessed_from_extension() {
        let (attachments, rejected) = classify_uploads(vec![
            upload("scan.pdf", None),
            upload("voice.mp3", Some("application/octet-stream")),
        ]);

        assert!(rejected.is_empty());
        assert_eq!(attachments[0].kind, MediaKind::Pdf);
        assert_eq!(attachments[1].kind, MediaKind::Audio);
    }

    #[test]
    fn message_without_supported_uploads_is_plain() {
        let (input, rejected) = classify_message("hi", vec![upload("x.bin", None)]);

        assert_eq!(input, ClassifiedInput::Plain("hi".to_string()));
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn message_text_is_kept_as_typed() {
        let (input, _) = classify_message("  two  spaces  ", Vec::new());
        assert_eq!(input, ClassifiedInput::Plain("  two  spaces  ".to_string()));

        let (input, _) = classify_message(" \t ", vec![upload("a.pdf", Some("application/pdf"))]);
        assert_eq!(input.text(), "");
    }
}
