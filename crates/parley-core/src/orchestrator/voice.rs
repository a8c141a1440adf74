//! Voice note download and transcription.

use parley_types::error::{TransportError, VoiceError};
use parley_types::llm::AudioClip;
use parley_types::telegram::Voice;

use crate::llm::Transcriber;
use crate::transport::ChatTransport;

pub const VOICE_TOO_LARGE: &str = "The voice message is too large. Please send a smaller file.";
pub const TRANSCRIPTION_FAILED: &str = "Unable to transcribe voice message.";

fn check_size(size: u64, limit: u64) -> Result<(), VoiceError> {
    if size > limit {
        Err(VoiceError::TooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// Fetch a voice note and turn it into text.
///
/// The size limit is checked against every size we learn: the one in the
/// update, the one `getFile` reports, and the downloaded length.
pub async fn transcribe_voice<T, W>(
    transport: &T,
    transcriber: &W,
    voice: &Voice,
    max_bytes: u64,
) -> Result<String, VoiceError>
where
    T: ChatTransport,
    W: Transcriber,
{
    if let Some(size) = voice.file_size {
        check_size(size, max_bytes)?;
    }

    let file = transport.get_file(&voice.file_id).await?;
    if let Some(size) = file.file_size {
        check_size(size, max_bytes)?;
    }
    let path = file
        .file_path
        .ok_or_else(|| TransportError::FileUnavailable(voice.file_id.clone()))?;

    let bytes = transport.download_file(&path).await?;
    check_size(bytes.len() as u64, max_bytes)?;

    let text = transcriber.transcribe(&AudioClip::voice_note(bytes)).await?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, ScriptedTranscriber};

    fn voice(file_id: &str, file_size: Option<u64>) -> Voice {
        Voice {
            file_id: file_id.to_string(),
            duration: Some(2),
            file_size,
        }
    }

    #[tokio::test]
    async fn test_transcribes_downloaded_bytes() {
        let transport = RecordingTransport::new().with_file("v1", Some(4), vec![1, 2, 3, 4]);
        let transcriber = ScriptedTranscriber::hearing("hello there");

        let text = transcribe_voice(&transport, &transcriber, &voice("v1", Some(4)), 100)
            .await
            .unwrap();
        assert_eq!(text, "hello there");
        assert_eq!(transcriber.clip_sizes(), vec![4]);
    }

    #[tokio::test]
    async fn test_reported_size_rejected_before_download() {
        let transport = RecordingTransport::new();
        let transcriber = ScriptedTranscriber::hearing("unused");

        let err = transcribe_voice(&transport, &transcriber, &voice("v1", Some(500)), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::TooLarge { size: 500, limit: 100 }));
        assert!(transcriber.clip_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_downloaded_length_is_checked() {
        let transport = RecordingTransport::new().with_file("v1", None, vec![0; 200]);
        let transcriber = ScriptedTranscriber::hearing("unused");

        let err = transcribe_voice(&transport, &transcriber, &voice("v1", None), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::TooLarge { size: 200, .. }));
    }

    #[tokio::test]
    async fn test_unknown_file_is_transport_error() {
        let transport = RecordingTransport::new();
        let transcriber = ScriptedTranscriber::hearing("unused");

        let err = transcribe_voice(&transport, &transcriber, &voice("missing", None), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Transport(_)));
    }

    #[tokio::test]
    async fn test_transcriber_failure_propagates() {
        let transport = RecordingTransport::new().with_file("v1", Some(1), vec![1]);
        let transcriber = ScriptedTranscriber::failing();

        let err = transcribe_voice(&transport, &transcriber, &voice("v1", Some(1)), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Transcription(_)));
    }
}
