use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use solti_model::ArtifactSpec;

use crate::error::HookError;

/// Downloads a single artifact into a directory.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(
        &self,
        ctx: &CancellationToken,
        artifact: &ArtifactSpec,
        dest_dir: &Path,
    ) -> Result<(), HookError>;
}

/// Fetcher for artifacts already present on the node (`/path` or `file:///path`).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsFetcher;

impl FsFetcher {
    fn source_path(source: &str) -> Result<PathBuf, HookError> {
        let path = source.strip_prefix("file://").unwrap_or(source);
        if path.contains("://") {
            return Err(HookError::Artifact {
                artifact: source.to_string(),
                reason: "unsupported scheme".into(),
            });
        }
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl ArtifactFetcher for FsFetcher {
    async fn fetch(
        &self,
        ctx: &CancellationToken,
        artifact: &ArtifactSpec,
        dest_dir: &Path,
    ) -> Result<(), HookError> {
        if ctx.is_cancelled() {
            return Err(HookError::Cancelled);
        }

        let src = Self::source_path(&artifact.source)?;
        let file_name = src.file_name().ok_or_else(|| HookError::Artifact {
            artifact: artifact.source.clone(),
            reason: "source has no file name".into(),
        })?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);
        trace!(src = %src.display(), dest = %dest.display(), "copying artifact");

        tokio::fs::copy(&src, &dest)
            .await
            .map_err(|e| HookError::Artifact {
                artifact: artifact.source.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_local_file_into_dest() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bundle.txt");
        tokio::fs::write(&src, b"payload").await.unwrap();

        let artifact = ArtifactSpec::new(format!("file://{}", src.display()));
        let dest = dir.path().join("out");
        FsFetcher
            .fetch(&CancellationToken::new(), &artifact, &dest)
            .await
            .unwrap();

        let copied = tokio::fs::read(dest.join("bundle.txt")).await.unwrap();
        assert_eq!(copied, b"payload");
    }

    #[tokio::test]
    async fn rejects_remote_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactSpec::new("https://example.com/app.tar.gz");

        let err = FsFetcher
            .fetch(&CancellationToken::new(), &artifact, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Artifact { .. }));
    }

    #[tokio::test]
    async fn honours_cancellation() {
        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = FsFetcher
            .fetch(&ctx, &ArtifactSpec::new("/tmp/x"), Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Cancelled));
    }
}
