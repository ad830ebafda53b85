//! Turn encoding: classified input to wire-ready [`TurnContent`].

use std::sync::Arc;

use chat_provider::{
    AudioClip, ContentBlock, ProviderError, Transcriber, TurnContent, DEFAULT_IMAGE_MIME_TYPE,
};
use thiserror::Error;
use tracing::debug;

use crate::classify::{Attachment, ClassifiedInput, MediaKind};

/// Marker placed in front of every audio transcript folded into a turn.
pub const AUDIO_TRANSCRIPT_PREFIX: &str = "[Audio Transcript]: ";

const SEGMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Audio file {filename} is empty")]
    EmptyAudio { filename: String },
    #[error("Transcription of {filename} failed: {source}")]
    Transcription {
        filename: String,
        #[source]
        source: ProviderError,
    },
}

/// Converts classified input into turn content. Never touches a conversation.
pub struct TurnEncoder {
    transcriber: Arc<dyn Transcriber>,
}

impl TurnEncoder {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Encodes one turn.
    ///
    /// Audio attachments are transcribed in order and appended to the text as
    /// `[Audio Transcript]: <t>` segments separated by a blank line. Image and
    /// PDF attachments become blocks in order; when there is any, the joined
    /// text (if non-empty) leads the block sequence. Without blocks the
    /// result is plain text. `on_transcribe` is called with the file name
    /// right before each transcription call.
    pub fn encode(
        &self,
        input: ClassifiedInput,
        on_transcribe: &mut dyn FnMut(&str),
    ) -> Result<TurnContent, EncodeError> {
        let (text, attachments) = match input {
            ClassifiedInput::Plain(text) => return Ok(TurnContent::PlainText(text)),
            ClassifiedInput::Attached { text, attachments } => (text, attachments),
        };

        let mut segments = Vec::new();
        if !text.is_empty() {
            segments.push(text);
        }

        let mut blocks = Vec::new();
        for attachment in attachments {
            match attachment.kind {
                MediaKind::Image => {
                    let mime_type = resolve_image_mime_type(
                        attachment.media_type.as_deref(),
                        &attachment.filename,
                    );
                    blocks.push(ContentBlock::image_from_bytes(mime_type, &attachment.bytes));
                }
                MediaKind::Pdf => {
                    blocks.push(ContentBlock::pdf_from_bytes(
                        attachment.filename,
                        &attachment.bytes,
                    ));
                }
                MediaKind::Audio => {
                    on_transcribe(&attachment.filename);
                    let transcript = self.transcribe(attachment)?;
                    segments.push(format!("{AUDIO_TRANSCRIPT_PREFIX}{transcript}"));
                }
            }
        }

        let joined = segments.join(SEGMENT_SEPARATOR);
        if blocks.is_empty() {
            return Ok(TurnContent::PlainText(joined));
        }

        let mut content = Vec::with_capacity(blocks.len() + 1);
        if !joined.is_empty() {
            content.push(ContentBlock::text(joined));
        }
        content.extend(blocks);
        Ok(TurnContent::StructuredBlocks(content))
    }

    fn transcribe(&self, attachment: Attachment) -> Result<String, EncodeError> {
        if attachment.bytes.is_empty() {
            return Err(EncodeError::EmptyAudio {
                filename: attachment.filename,
            });
        }

        let mime_type = attachment.media_type.or_else(|| {
            mime_guess::from_path(&attachment.filename)
                .first_raw()
                .map(ToString::to_string)
        });
        debug!(
            filename = %attachment.filename,
            bytes = attachment.bytes.len(),
            "transcribing audio attachment"
        );

        let filename = attachment.filename.clone();
        self.transcriber
            .transcribe(AudioClip {
                filename: attachment.filename,
                mime_type,
                bytes: attachment.bytes,
            })
            .map_err(|source| EncodeError::Transcription { filename, source })
    }
}

/// Declared `image/*` type first, then the type implied by the extension,
/// then `image/png`.
pub fn resolve_image_mime_type(declared: Option<&str>, filename: &str) -> String {
    if let Some(declared) = declared
        .map(str::trim)
        .filter(|value| value.to_ascii_lowercase().starts_with("image/"))
    {
        return declared.to_string();
    }

    mime_guess::from_path(filename)
        .first_raw()
        .filter(|guessed| guessed.starts_with("image/"))
        .unwrap_or(DEFAULT_IMAGE_MIME_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chat_provider::PDF_MIME_TYPE;

    use super::*;

    #[derive(Default)]
    struct RecordingTranscriber {
        calls: Mutex<Vec<AudioClip>>,
        fail: bool,
    }

    impl Transcriber for RecordingTranscriber {
        fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError> {
            let filename = clip.filename.clone();
            self.calls
                .lock()
                .expect("calls lock should not be poisoned")
                .push(clip);
            if self.fail {
                Err(ProviderError::new("HTTP 400 Bad Request"))
            } else {
                Ok(format!("words from {filename}"))
            }
        }
    }

    fn encoder_with(transcriber: Arc<RecordingTranscriber>) -> TurnEncoder {
        TurnEncoder::new(transcriber)
    }

    fn attachment(kind: MediaKind, filename: &str, bytes: &[u8]) -> Attachment {
        Attachment {
            kind,
            filename: filename.to_string(),
            media_type: None,
            bytes: bytes.to_vec(),
        }
    }

    fn attached(text: &str, attachments: Vec<Attachment>) -> ClassifiedInput {
        ClassifiedInput::Attached {
            text: text.to_string(),
            attachments,
        }
    }

    fn no_progress() -> impl FnMut(&str) {
        |_| {}
    }

    #[test]
    fn plain_text_is_unchanged() {
        let encoder = encoder_with(Arc::default());
        for text in ["hi", "  spaced  ", "/unknown command", "multi\nline"] {
            let content = encoder
                .encode(ClassifiedInput::Plain(text.to_string()), &mut no_progress())
                .expect("plain text encodes");
            assert_eq!(content, TurnContent::PlainText(text.to_string()));
        }
    }

    #[test]
    fn image_without_text_is_a_single_block_that_round_trips() {
        let bytes: Vec<u8> = (0..=255).rev().collect();
        let encoder = encoder_with(Arc::default());

        let content = encoder
            .encode(
                attached("", vec![attachment(MediaKind::Image, "cat.gif", &bytes)]),
                &mut no_progress(),
            )
            .expect("image encodes");

        let blocks = content.blocks().expect("image forces structured content");
        assert_eq!(blocks.len(), 1);
        assert!(
            matches!(&blocks[0], ContentBlock::Image { mime_type, .. } if mime_type == "image/gif")
        );
        let decoded = blocks[0]
            .decode_payload()
            .expect("image has payload")
            .expect("payload is valid base64");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn pdf_with_text_puts_text_first() {
        let encoder = encoder_with(Arc::default());

        let content = encoder
            .encode(
                attached(
                    "please summarize",
                    vec![attachment(MediaKind::Pdf, "report.pdf", b"%PDF-1.7")],
                ),
                &mut no_progress(),
            )
            .expect("pdf encodes");

        assert_eq!(
            content,
            TurnContent::StructuredBlocks(vec![
                ContentBlock::text("please summarize"),
                ContentBlock::File {
                    filename: "report.pdf".to_string(),
                    mime_type: PDF_MIME_TYPE.to_string(),
                    base64_data: "JVBERi0xLjc=".to_string(),
                },
            ])
        );
    }

    #[test]
    fn audio_collapses_to_plain_text_with_transcript_marker() {
        let transcriber = Arc::new(RecordingTranscriber::default());
        let encoder = encoder_with(Arc::clone(&transcriber));
        let mut announced = Vec::new();

        let content = encoder
            .encode(
                attached(
                    "what did I say?",
                    vec![attachment(MediaKind::Audio, "memo.mp3", b"audio")],
                ),
                &mut |filename: &str| announced.push(filename.to_string()),
            )
            .expect("audio encodes");

        assert_eq!(
            content,
            TurnContent::PlainText(
                "what did I say?\n\n[Audio Transcript]: words from memo.mp3".to_string()
            )
        );
        assert_eq!(announced, vec!["memo.mp3".to_string()]);
        let calls = transcriber.calls.lock().expect("calls lock").clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].bytes, b"audio");
        assert!(calls[0]
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("audio/")));
    }

    #[test]
    fn audio_without_text_is_only_the_transcript() {
        let encoder = encoder_with(Arc::default());

        let content = encoder
            .encode(
                attached("", vec![attachment(MediaKind::Audio, "memo.wav", b"RIFF")]),
                &mut no_progress(),
            )
            .expect("audio encodes");

        assert_eq!(
            content.as_plain_text(),
            Some("[Audio Transcript]: words from memo.wav")
        );
    }

    #[test]
    fn mixed_uploads_merge_every_transcript_into_leading_text_block() {
        let encoder = encoder_with(Arc::default());

        let content = encoder
            .encode(
                attached(
                    "compare",
                    vec![
                        attachment(MediaKind::Audio, "one.mp3", b"1"),
                        attachment(MediaKind::Image, "chart.png", b"png"),
                        attachment(MediaKind::Audio, "two.mp3", b"2"),
                    ],
                ),
                &mut no_progress(),
            )
            .expect("mixed input encodes");

        let blocks = content.blocks().expect("image forces structured content");
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            ContentBlock::text(
                "compare\n\n[Audio Transcript]: words from one.mp3\n\n[Audio Transcript]: words from two.mp3"
            )
        );
        assert!(matches!(blocks[1], ContentBlock::Image { .. }));
    }

    #[test]
    fn transcription_failure_is_reported_not_swallowed() {
        let transcriber = Arc::new(RecordingTranscriber {
            fail: true,
            ..RecordingTranscriber::default()
        });
        let encoder = encoder_with(transcriber);

        let error = encoder
            .encode(
                attached("", vec![attachment(MediaKind::Audio, "noise.wav", b"x")]),
                &mut no_progress(),
            )
            .expect_err("failed transcription should surface");

        assert_eq!(
            error.to_string(),
            "Transcription of noise.wav failed: HTTP 400 Bad Request"
        );
    }

    #[test]
    fn empty_audio_fails_before_the_remote_call() {
        let transcriber = Arc::new(RecordingTranscriber::default());
        let encoder = encoder_with(Arc::clone(&transcriber));

        let error = encoder
            .encode(
                attached("", vec![attachment(MediaKind::Audio, "blank.wav", b"")]),
                &mut no_progress(),
            )
            .expect_err("empty audio is rejected");

        assert!(matches!(error, EncodeError::EmptyAudio { .. }));
        assert!(transcriber.calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn image_mime_type_resolution_order() {
        assert_eq!(resolve_image_mime_type(Some("image/webp"), "a.png"), "image/webp");
        assert_eq!(resolve_image_mime_type(Some("text/plain"), "a.jpeg"), "image/jpeg");
        assert_eq!(resolve_image_mime_type(None, "a.pdf"), DEFAULT_IMAGE_MIME_TYPE);
        assert_eq!(resolve_image_mime_type(None, "no-extension"), DEFAULT_IMAGE_MIME_TYPE);
    }
}
