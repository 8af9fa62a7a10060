//! Built-in prompts compiled into the binary
//!
//! The shipped `templates/prompts/` tree is embedded at build time and served
//! under a virtual root by [`EmbeddedFs`], so the built-in tier keeps working
//! wherever the binary is installed. Every other path goes to the wrapped
//! filesystem.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

use super::fs::SourceFs;

/// Virtual directory the embedded files live under
pub const EMBEDDED_ROOT: &str = "<embedded>";

/// Embedded files, keyed by `/`-separated path relative to [`EMBEDDED_ROOT`]
pub const EMBEDDED_FILES: &[(&str, &str)] = &[
    ("prompts/onboard.yaml", include_str!("../../templates/prompts/onboard.yaml")),
    ("prompts/plan.yaml", include_str!("../../templates/prompts/plan.yaml")),
    ("prompts/review.yaml", include_str!("../../templates/prompts/review.yaml")),
    (
        "prompts/partials/constitution.hbs",
        include_str!("../../templates/prompts/partials/constitution.hbs"),
    ),
    (
        "prompts/partials/contexts.hbs",
        include_str!("../../templates/prompts/partials/contexts.hbs"),
    ),
    (
        "prompts/partials/project-header.hbs",
        include_str!("../../templates/prompts/partials/project-header.hbs"),
    ),
];

/// `<embedded>/prompts`
pub fn embedded_prompts_dir() -> PathBuf {
    Path::new(EMBEDDED_ROOT).join("prompts")
}

/// [`SourceFs`] serving [`EMBEDDED_FILES`] over another filesystem
///
/// Embedded files report a fixed modification time, so once cached they are
/// never re-read.
pub struct EmbeddedFs {
    inner: Arc<dyn SourceFs>,
}

impl std::fmt::Debug for EmbeddedFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFs")
            .field("files", &EMBEDDED_FILES.len())
            .finish_non_exhaustive()
    }
}

impl EmbeddedFs {
    pub fn new(inner: Arc<dyn SourceFs>) -> Self {
        Self { inner }
    }

    /// Path relative to the virtual root, `/`-joined; `None` for real paths
    fn relative(path: &Path) -> Option<String> {
        let rest = path.strip_prefix(EMBEDDED_ROOT).ok()?;
        let segments = rest
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }

    fn file(relative: &str) -> Option<&'static str> {
        EMBEDDED_FILES
            .iter()
            .find(|(path, _)| *path == relative)
            .map(|(_, content)| *content)
    }

    fn is_dir(relative: &str) -> bool {
        relative.is_empty()
            || EMBEDDED_FILES
                .iter()
                .any(|(path, _)| path.strip_prefix(relative).is_some_and(|rest| rest.starts_with('/')))
    }

    fn not_found(relative: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}/{} is not embedded", EMBEDDED_ROOT, relative),
        )
    }
}

#[async_trait]
impl SourceFs for EmbeddedFs {
    async fn exists(&self, path: &Path) -> bool {
        match Self::relative(path) {
            Some(relative) => Self::file(&relative).is_some() || Self::is_dir(&relative),
            None => self.inner.exists(path).await,
        }
    }

    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        match Self::relative(path) {
            Some(relative) => Self::file(&relative)
                .map(|_| SystemTime::UNIX_EPOCH)
                .ok_or_else(|| Self::not_found(&relative)),
            None => self.inner.modified(path).await,
        }
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match Self::relative(path) {
            Some(relative) => {
                debug!(%relative, "EmbeddedFs::read_to_string: serving embedded file");
                Self::file(&relative)
                    .map(str::to_string)
                    .ok_or_else(|| Self::not_found(&relative))
            }
            None => self.inner.read_to_string(path).await,
        }
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let Some(relative) = Self::relative(path) else {
            return self.inner.list_dir(path).await;
        };
        if !Self::is_dir(&relative) {
            return Err(Self::not_found(&relative));
        }

        let prefix = if relative.is_empty() {
            String::new()
        } else {
            format!("{}/", relative)
        };
        let mut names: Vec<String> = Vec::new();
        for (path, _) in EMBEDDED_FILES {
            if let Some(rest) = path.strip_prefix(prefix.as_str())
                && let Some(name) = rest.split('/').next()
                && !names.iter().any(|existing| existing == name)
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}
