//! Tiered template sources
//!
//! Prompts and partials are looked up in an ordered list of tiers: the
//! project directory first, then the on-disk built-in directory when one is
//! configured, then the prompts embedded in the binary. The first tier
//! holding an existing file wins, even if that file later fails to parse.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::embedded::embedded_prompts_dir;
use super::fs::SourceFs;
use crate::config::Layout;

/// Extensions accepted for prompt files, in lookup order
pub const PROMPT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Extension of partial files
pub const PARTIAL_EXTENSION: &str = "hbs";

/// Which tier a file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    /// Project-local override
    Project,
    /// On-disk built-in directory (`builtin-dir`)
    Builtin,
    /// Compiled into the binary
    Embedded,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Builtin => write!(f, "builtin"),
            Self::Embedded => write!(f, "embedded"),
        }
    }
}

/// One tier: a prompts directory and its partials directory
#[derive(Debug, Clone)]
pub struct Tier {
    pub kind: TierKind,
    pub prompts_dir: PathBuf,
    pub partials_dir: PathBuf,
}

/// A file located in one of the tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub kind: TierKind,
    pub path: PathBuf,
}

/// Ordered list of tiers, highest precedence first
#[derive(Debug, Clone)]
pub struct TierSet {
    tiers: Vec<Tier>,
}

impl TierSet {
    /// Project tier, then the on-disk built-in tier, then the embedded tier
    ///
    /// A layout whose built-in directory is the embedded root gets no
    /// separate on-disk built-in tier.
    pub fn from_layout(layout: &Layout) -> Self {
        debug!(?layout, "TierSet::from_layout: called");
        let mut tiers = vec![Tier {
            kind: TierKind::Project,
            prompts_dir: layout.project_prompts.clone(),
            partials_dir: layout.project_partials.clone(),
        }];

        let embedded = embedded_prompts_dir();
        if layout.builtin_prompts != embedded {
            tiers.push(Tier {
                kind: TierKind::Builtin,
                prompts_dir: layout.builtin_prompts.clone(),
                partials_dir: layout.builtin_partials.clone(),
            });
        }
        tiers.push(Tier {
            kind: TierKind::Embedded,
            partials_dir: embedded.join("partials"),
            prompts_dir: embedded,
        });
        Self { tiers }
    }

    /// Tiers in precedence order
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Locate the prompt file for `name`
    pub async fn locate_prompt(&self, fs: &dyn SourceFs, name: &str) -> Option<Located> {
        debug!(%name, "TierSet::locate_prompt: called");
        self.first_existing(fs, |tier| {
            PROMPT_EXTENSIONS
                .iter()
                .map(|ext| tier.prompts_dir.join(format!("{}.{}", name, ext)))
                .collect()
        })
        .await
    }

    /// Locate the partial file for `name`
    pub async fn locate_partial(&self, fs: &dyn SourceFs, name: &str) -> Option<Located> {
        debug!(%name, "TierSet::locate_partial: called");
        self.first_existing(fs, |tier| {
            vec![tier.partials_dir.join(format!("{}.{}", name, PARTIAL_EXTENSION))]
        })
        .await
    }

    /// Try each tier's candidates in order; the first existing path wins
    async fn first_existing<F>(&self, fs: &dyn SourceFs, candidates: F) -> Option<Located>
    where
        F: Fn(&Tier) -> Vec<PathBuf>,
    {
        for tier in &self.tiers {
            for path in candidates(tier) {
                if fs.exists(&path).await {
                    debug!(?path, kind = %tier.kind, "TierSet::first_existing: found");
                    return Some(Located { kind: tier.kind, path });
                }
            }
        }
        debug!("TierSet::first_existing: not found in any tier");
        None
    }
}

/// Names (file stems) of the files in `dir` with one of `extensions`, sorted
///
/// A missing or unreadable directory yields no names.
pub async fn stems_in(fs: &dyn SourceFs, dir: &Path, extensions: &[&str]) -> Vec<String> {
    let entries = match fs.list_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(?dir, error = %e, "stems_in: directory not readable");
            return Vec::new();
        }
    };

    let mut stems: Vec<String> = entries
        .iter()
        .filter_map(|entry| {
            let path = Path::new(entry);
            let ext = path.extension()?.to_str()?;
            if extensions.contains(&ext) {
                path.file_stem()?.to_str().map(str::to_string)
            } else {
                None
            }
        })
        .collect();
    stems.sort();
    stems.dedup();
    stems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::embedded::EmbeddedFs;
    use crate::templates::fs::LocalFs;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TierSet) {
        let dir = TempDir::new().unwrap();
        let layout = Layout::for_project(dir.path().join("project"), dir.path().join("builtin"));
        fs::create_dir_all(&layout.project_partials).unwrap();
        fs::create_dir_all(&layout.builtin_partials).unwrap();
        (dir, TierSet::from_layout(&layout))
    }

    #[tokio::test]
    async fn test_project_tier_wins() {
        let (_dir, tiers) = setup();
        let project = tiers.tiers()[0].prompts_dir.join("review.yaml");
        let builtin = tiers.tiers()[1].prompts_dir.join("review.yaml");
        fs::write(&project, "x").unwrap();
        fs::write(&builtin, "y").unwrap();

        let located = tiers.locate_prompt(&LocalFs, "review").await.unwrap();
        assert_eq!(located.kind, TierKind::Project);
        assert_eq!(located.path, project);
    }

    #[tokio::test]
    async fn test_builtin_fallback_and_yml() {
        let (_dir, tiers) = setup();
        let builtin = tiers.tiers()[1].prompts_dir.join("review.yml");
        fs::write(&builtin, "y").unwrap();

        let located = tiers.locate_prompt(&LocalFs, "review").await.unwrap();
        assert_eq!(located.kind, TierKind::Builtin);
        assert_eq!(located.path, builtin);
        assert!(tiers.locate_prompt(&LocalFs, "missing").await.is_none());
    }

    #[test]
    fn test_tier_order() {
        let (_dir, tiers) = setup();
        let kinds: Vec<TierKind> = tiers.tiers().iter().map(|tier| tier.kind).collect();
        assert_eq!(kinds, vec![TierKind::Project, TierKind::Builtin, TierKind::Embedded]);

        let layout = Layout::new("/work/app", ".simone", None);
        let kinds: Vec<TierKind> = TierSet::from_layout(&layout).tiers().iter().map(|tier| tier.kind).collect();
        assert_eq!(kinds, vec![TierKind::Project, TierKind::Embedded]);
    }

    #[tokio::test]
    async fn test_embedded_tier_is_last_resort() {
        let (_dir, tiers) = setup();
        let source = EmbeddedFs::new(Arc::new(LocalFs));
        let located = tiers.locate_prompt(&source, "review").await.unwrap();
        assert_eq!(located.kind, TierKind::Embedded);

        let builtin = tiers.tiers()[1].prompts_dir.join("review.yaml");
        fs::write(&builtin, "y").unwrap();
        let located = tiers.locate_prompt(&source, "review").await.unwrap();
        assert_eq!(located.kind, TierKind::Builtin);
    }

    #[tokio::test]
    async fn test_locate_partial() {
        let (_dir, tiers) = setup();
        let partial = tiers.tiers()[0].partials_dir.join("header.hbs");
        fs::write(&partial, "<header/>").unwrap();

        let located = tiers.locate_partial(&LocalFs, "header").await.unwrap();
        assert_eq!(located.path, partial);
        assert!(tiers.locate_partial(&LocalFs, "footer").await.is_none());
    }

    #[tokio::test]
    async fn test_stems_in_filters_extensions() {
        let (_dir, tiers) = setup();
        let prompts = &tiers.tiers()[0].prompts_dir;
        fs::write(prompts.join("b.yml"), "").unwrap();
        fs::write(prompts.join("a.yaml"), "").unwrap();
        fs::write(prompts.join("notes.txt"), "").unwrap();

        let stems = stems_in(&LocalFs, prompts, &PROMPT_EXTENSIONS).await;
        assert_eq!(stems, vec!["a".to_string(), "b".to_string()]);
        assert!(stems_in(&LocalFs, Path::new("/nonexistent"), &PROMPT_EXTENSIONS).await.is_empty());
    }
}
