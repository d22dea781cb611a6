//! Analysis method catalogue and prompt template resolution
//!
//! The set of methods is closed. Templates come either from the builtin
//! catalogue or from `<method>.txt` files in a prompt directory, and are
//! re-read on every request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

const NIELSEN_PROMPT: &str = "Analise este layout de interface com base nas heurísticas de Nielsen. \
Aponte no máximo 3 problemas críticos focando em: visibilidade, consistência e feedback. \
Sugira uma melhoria para cada ponto.";

const SHNEIDERMAN_PROMPT: &str = "Analise este layout de interface com base nas oito regras de ouro de Shneiderman. \
Aponte no máximo 3 problemas críticos e sugira uma melhoria para cada ponto.";

const WCAG_PROMPT: &str = "Analise este layout de interface quanto à acessibilidade segundo as diretrizes WCAG 2.1. \
Aponte no máximo 3 problemas críticos, por exemplo contraste insuficiente ou alvos de toque pequenos, \
e sugira uma melhoria para cada ponto.";

const GESTALT_PROMPT: &str = "Analise este layout de interface com base nos princípios da Gestalt \
(proximidade, similaridade, continuidade e fechamento). \
Aponte no máximo 3 problemas críticos e sugira uma melhoria para cada ponto.";

/// Supported heuristic analysis methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnalysisMethod {
    #[default]
    Nielsen,
    Shneiderman,
    Wcag,
    Gestalt,
}

impl AnalysisMethod {
    pub const ALL: [AnalysisMethod; 4] = [
        AnalysisMethod::Nielsen,
        AnalysisMethod::Shneiderman,
        AnalysisMethod::Wcag,
        AnalysisMethod::Gestalt,
    ];

    /// Request key, also the template file stem
    pub fn key(&self) -> &'static str {
        match self {
            AnalysisMethod::Nielsen => "nielsen",
            AnalysisMethod::Shneiderman => "shneiderman",
            AnalysisMethod::Wcag => "wcag",
            AnalysisMethod::Gestalt => "gestalt",
        }
    }

    pub fn builtin_prompt(&self) -> &'static str {
        match self {
            AnalysisMethod::Nielsen => NIELSEN_PROMPT,
            AnalysisMethod::Shneiderman => SHNEIDERMAN_PROMPT,
            AnalysisMethod::Wcag => WCAG_PROMPT,
            AnalysisMethod::Gestalt => GESTALT_PROMPT,
        }
    }

    /// Comma separated list of keys, for error details
    pub fn supported_keys() -> String {
        Self::ALL.iter().map(|m| m.key()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AnalysisMethod {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "nielsen" => Ok(AnalysisMethod::Nielsen),
            "shneiderman" => Ok(AnalysisMethod::Shneiderman),
            "wcag" | "acessibilidade" => Ok(AnalysisMethod::Wcag),
            "gestalt" => Ok(AnalysisMethod::Gestalt),
            _ => Err(PromptError::UnknownMethod(s.trim().to_string())),
        }
    }
}

/// What happens when the caller names a method outside the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodPolicy {
    /// Use the default method (`nielsen`)
    #[default]
    FallbackToDefault,
    /// Reject the request
    Strict,
}

/// Where templates are read from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptSource {
    #[default]
    Builtin,
    Directory(PathBuf),
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Unknown analysis method '{0}'")]
    UnknownMethod(String),

    #[error("Failed to read prompt template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Template chosen for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    /// Method whose template was used
    pub method: AnalysisMethod,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PromptResolver {
    source: PromptSource,
    policy: MethodPolicy,
}

impl PromptResolver {
    pub fn new(source: PromptSource, policy: MethodPolicy) -> Self {
        Self { source, policy }
    }

    /// Map the requested key to a method according to the policy.
    ///
    /// An absent or blank key always selects the default.
    pub fn select(&self, requested: Option<&str>) -> Result<AnalysisMethod, PromptError> {
        let requested = match requested.map(str::trim).filter(|r| !r.is_empty()) {
            Some(requested) => requested,
            None => return Ok(AnalysisMethod::default()),
        };

        match (requested.parse::<AnalysisMethod>(), self.policy) {
            (Ok(method), _) => Ok(method),
            (Err(err), MethodPolicy::Strict) => Err(err),
            (Err(_), MethodPolicy::FallbackToDefault) => {
                debug!("Unknown method '{}', using {}", requested, AnalysisMethod::default());
                Ok(AnalysisMethod::default())
            }
        }
    }

    /// Select the method and load its template
    pub async fn resolve(&self, requested: Option<&str>) -> Result<ResolvedPrompt, PromptError> {
        let method = self.select(requested)?;

        match &self.source {
            PromptSource::Builtin => Ok(ResolvedPrompt {
                method,
                text: method.builtin_prompt().to_string(),
            }),
            PromptSource::Directory(dir) => Self::read_from_dir(dir, method).await,
        }
    }

    async fn read_from_dir(dir: &Path, method: AnalysisMethod) -> Result<ResolvedPrompt, PromptError> {
        let path = template_path(dir, method);

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(ResolvedPrompt { method, text }),
            Err(err) if method != AnalysisMethod::default() => {
                let fallback = AnalysisMethod::default();
                let fallback_path = template_path(dir, fallback);
                warn!(
                    "Could not read {} ({}), falling back to {}",
                    path.display(),
                    err,
                    fallback_path.display()
                );

                match tokio::fs::read_to_string(&fallback_path).await {
                    Ok(text) => Ok(ResolvedPrompt { method: fallback, text }),
                    Err(source) => Err(PromptError::Io { path: fallback_path, source }),
                }
            }
            Err(source) => Err(PromptError::Io { path, source }),
        }
    }
}

fn template_path(dir: &Path, method: AnalysisMethod) -> PathBuf {
    dir.join(format!("{}.txt", method.key()))
}
