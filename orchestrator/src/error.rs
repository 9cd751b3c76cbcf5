//! Pipeline-level error taxonomy (spec §7), converted into the shared
//! [`agent_core::ErrorKind`] only at the boundary that needs to decide what
//! to do about it — the orchestrator itself and the `agent-cli` binary that
//! renders the user-facing `{ error, message }` object. Internal stages keep
//! their own typed errors (`persistence::PersistenceError`, `tools::ToolError`)
//! and never serialize a kind directly, mirroring the teacher's
//! `DbotError` -> `HandlerError` layering.

use agent_core::{ErrorKind, Language};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid session")]
    InvalidSession,
    #[error("unsupported language")]
    UnsupportedLanguage,
    #[error("invalid location")]
    InvalidLocation,
    #[error("memory unavailable")]
    MemoryUnavailable,
    #[error("model error: {0}")]
    ModelError(String),
    #[error("request timed out")]
    Timeout,
    #[error("request cancelled")]
    Cancelled,
    #[error("overloaded")]
    Overloaded,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidSession => ErrorKind::InvalidSession,
            PipelineError::UnsupportedLanguage => ErrorKind::UnsupportedLanguage,
            PipelineError::InvalidLocation => ErrorKind::InvalidLocation,
            PipelineError::MemoryUnavailable => ErrorKind::MemoryUnavailable,
            PipelineError::ModelError(_) => ErrorKind::ModelError,
            PipelineError::Timeout => ErrorKind::Timeout,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Overloaded => ErrorKind::Overloaded,
        }
    }

    /// A short user-facing message (spec §7: "messages are localized via
    /// the i18n catalog and never leak internal identifiers or stack
    /// content"). The catalog itself is out of scope here (spec §1); this
    /// gives every supported language a plain, non-leaking sentence per
    /// kind rather than hard-coding English everywhere.
    pub fn message(&self, language: Language) -> String {
        let key = self.kind().as_code();
        localized_message(key, language).to_string()
    }
}

fn localized_message(code: &str, language: Language) -> &'static str {
    use Language::*;
    match (code, language) {
        ("INVALID_SESSION", Es) => "La sesion no es valida.",
        ("INVALID_SESSION", Ca) => "La sessio no es valida.",
        ("INVALID_SESSION", Gl) => "A sesion non e valida.",
        ("INVALID_SESSION", En) => "The session is not valid.",

        ("UNSUPPORTED_LANGUAGE", Es) => "Idioma no soportado.",
        ("UNSUPPORTED_LANGUAGE", Ca) => "Idioma no suportat.",
        ("UNSUPPORTED_LANGUAGE", Gl) => "Idioma non soportado.",
        ("UNSUPPORTED_LANGUAGE", En) => "That language is not supported.",

        ("INVALID_LOCATION", Es) => "La ubicacion no es valida.",
        ("INVALID_LOCATION", Ca) => "La ubicacio no es valida.",
        ("INVALID_LOCATION", Gl) => "A localizacion non e valida.",
        ("INVALID_LOCATION", En) => "The provided location is not valid.",

        ("MEMORY_UNAVAILABLE", Es) => "No se pudo recuperar el historial de la conversacion.",
        ("MEMORY_UNAVAILABLE", Ca) => "No s'ha pogut recuperar l'historial de la conversa.",
        ("MEMORY_UNAVAILABLE", Gl) => "Non se puido recuperar o historial da conversa.",
        ("MEMORY_UNAVAILABLE", En) => "Could not load the conversation history.",

        ("MODEL_ERROR", Es) => "Hubo un problema al generar la respuesta.",
        ("MODEL_ERROR", Ca) => "Hi ha hagut un problema en generar la resposta.",
        ("MODEL_ERROR", Gl) => "Houbo un problema ao xerar a resposta.",
        ("MODEL_ERROR", En) => "There was a problem generating a response.",

        ("TIMEOUT", Es) => "La solicitud tardo demasiado y fue cancelada.",
        ("TIMEOUT", Ca) => "La sollicitud ha trigat massa i s'ha cancellat.",
        ("TIMEOUT", Gl) => "A solicitude tardou demasiado e foi cancelada.",
        ("TIMEOUT", En) => "The request took too long and was cancelled.",

        ("CANCELLED", Es) => "La solicitud fue cancelada.",
        ("CANCELLED", Ca) => "La sollicitud s'ha cancellat.",
        ("CANCELLED", Gl) => "A solicitude foi cancelada.",
        ("CANCELLED", En) => "The request was cancelled.",

        ("OVERLOADED", Es) => "El servicio esta sobrecargado, intentalo de nuevo.",
        ("OVERLOADED", Ca) => "El servei esta sobrecarregat, torna-ho a provar.",
        ("OVERLOADED", Gl) => "O servizo esta sobrecargado, intentao de novo.",
        ("OVERLOADED", En) => "The service is overloaded, please try again.",

        _ => "An unexpected error occurred.",
    }
}
