//! Persists generated/scraped page output under `<PAGES_DIR>/<subdomain>/{a,b}/`
//! exactly as the edge process expects to find it — `index.html` plus
//! any `assets/…` the scrape handler pulled down.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::JobResult;
use crate::job::Variant;

pub fn variant_label(variant: Variant) -> &'static str {
    match variant {
        Variant::A => "a",
        Variant::B => "b",
    }
}

#[derive(Clone)]
pub struct PageWriter {
    root: PathBuf,
}

impl PageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn variant_dir(&self, subdomain: &str, variant: Variant) -> PathBuf {
        self.root.join(subdomain).join(variant_label(variant))
    }

    pub async fn write_index(&self, subdomain: &str, variant: Variant, html: &str) -> JobResult<()> {
        let dir = self.variant_dir(subdomain, variant);
        tokio::fs::create_dir_all(&dir).await?;
        write_file(&dir.join("index.html"), html.as_bytes()).await
    }

    /// `relative_path` is the asset's path as referenced from the
    /// rewritten HTML, e.g. `assets/logo.png` — joined directly under
    /// the variant directory so `…/assets/logo.png` resolves.
    pub async fn write_asset(
        &self,
        subdomain: &str,
        variant: Variant,
        relative_path: &str,
        bytes: &[u8],
    ) -> JobResult<()> {
        let target = self.variant_dir(subdomain, variant).join(relative_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_file(&target, bytes).await
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> JobResult<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_index_and_asset_under_the_expected_layout() {
        let dir = tempdir();
        let writer = PageWriter::new(&dir);
        writer.write_index("acme", Variant::A, "<html></html>").await.unwrap();
        writer
            .write_asset("acme", Variant::A, "assets/logo.png", b"fake-bytes")
            .await
            .unwrap();

        let index = tokio::fs::read_to_string(dir.join("acme/a/index.html")).await.unwrap();
        assert_eq!(index, "<html></html>");
        let asset = tokio::fs::read(dir.join("acme/a/assets/logo.png")).await.unwrap();
        assert_eq!(asset, b"fake-bytes");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("autoguard-jobs-test-{}", uuid::Uuid::new_v4()));
        dir
    }
}
