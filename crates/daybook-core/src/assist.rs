//! AI and speech helpers bound to an edit session
//!
//! History records need an owning entry. These helpers first drive the
//! session to a saved state (creating the entry if the day was never
//! written), then call the provider and record the result.

use thiserror::Error;

use crate::autosave::{EditSession, SessionError};
use crate::models::{AiOpKind, AiOperation, AudioRecord, NewAiOperation};
use crate::providers::{AiProvider, ProviderError, TtsProvider};
use crate::storage::StorageError;
use crate::store::StoreHandle;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Run an AI text operation for the active date and record it
pub async fn run_ai_operation(
    session: &EditSession,
    store: &StoreHandle,
    provider: &dyn AiProvider,
    kind: AiOpKind,
    text: &str,
) -> Result<AiOperation, AssistError> {
    let entry = session.ensure_saved().await?;
    let output = provider.process(text, &kind).await?;

    let op = NewAiOperation {
        kind,
        original_text: text.to_string(),
        result_text: output.result_text,
        provider: output.provider,
        model: output.model,
    };
    let entry_id = entry.id;
    Ok(store
        .run(move |store| store.add_ai_operation(entry_id, op))
        .await?)
}

/// Synthesize speech for the active date and store the clip
pub async fn synthesize_audio(
    session: &EditSession,
    store: &StoreHandle,
    provider: &dyn TtsProvider,
    text: &str,
    voice: Option<&str>,
    speed: Option<f32>,
) -> Result<AudioRecord, AssistError> {
    let entry = session.ensure_saved().await?;
    let audio = provider.synthesize(text, voice, speed).await?;

    let entry_id = entry.id;
    let text = text.to_string();
    let voice = voice.map(str::to_string);
    Ok(store
        .run(move |store| {
            store.add_audio_record(entry_id, &text, &audio, voice.as_deref(), speed)
        })
        .await?)
}
