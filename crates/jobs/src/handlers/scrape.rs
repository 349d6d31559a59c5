//! Page-scrape handler (`variant=a, action=scrape`): fetch the offer's
//! source URL, rewrite relative asset references to the `/static/...`
//! layout the edge serves from, persist to disk, and record the result
//! on both the Page and Offer rows.

use std::sync::Arc;

use autoguard_store::models::ScrapeStatus;
use autoguard_store::Database;
use tracing::info;

use crate::collaborators::HttpScraper;
use crate::error::{JobError, JobResult};
use crate::filesystem::PageWriter;
use crate::job::{Action, PageGenerationJob, Variant};

pub async fn handle(
    job: &PageGenerationJob,
    store: &Database,
    scraper: &Arc<dyn HttpScraper>,
    writer: &PageWriter,
) -> JobResult<()> {
    if job.variant != Variant::A || job.action != Action::Scrape {
        return Err(JobError::Validation(
            "scrape handler invoked for a non-scrape job".into(),
        ));
    }
    let source_url = job
        .source_url
        .as_deref()
        .ok_or_else(|| JobError::Validation("scrape job missing sourceUrl".into()))?;

    let outcome = scraper.fetch_page(source_url).await;

    match outcome {
        Ok(scraped) => {
            let rewritten = rewrite_asset_paths(&scraped.html, &job.subdomain, &scraped.assets);
            writer.write_index(&job.subdomain, Variant::A, &rewritten).await?;
            for (path, bytes) in &scraped.assets {
                writer
                    .write_asset(&job.subdomain, Variant::A, &format!("assets/{path}"), bytes)
                    .await?;
            }

            store.pages().mark_generated(job.page_id, &rewritten).await?;
            store
                .offers()
                .record_scrape_result(
                    job.offer_id,
                    ScrapeStatus::Completed,
                    None,
                    scraped.title.as_deref(),
                    scraped.description.as_deref(),
                )
                .await?;
            info!(page_id = job.page_id, offer_id = job.offer_id, "page scrape completed");
            Ok(())
        }
        Err(error) => {
            let message = error.to_string();
            store.pages().mark_failed(job.page_id, &message).await?;
            store
                .offers()
                .record_scrape_result(job.offer_id, ScrapeStatus::Failed, Some(&message), None, None)
                .await?;
            Err(JobError::Transient(format!("scrape failed: {message}")))
        }
    }
}

/// Rewrites every occurrence of an asset's original relative path to
/// `/static/<subdomain>/a/assets/<path>` — a plain string replacement
/// rather than an HTML parser, since the scraper hands back the exact
/// literal path strings that appeared in the source markup.
fn rewrite_asset_paths(html: &str, subdomain: &str, assets: &[(String, Vec<u8>)]) -> String {
    let mut rewritten = html.to_string();
    for (path, _) in assets {
        let replacement = format!("/static/{subdomain}/a/assets/{path}");
        rewritten = rewritten.replace(path, &replacement);
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_replaces_every_asset_path_occurrence() {
        let html = r#"<img src="img/logo.png"><img src="img/logo.png" class="small">"#;
        let assets = vec![("img/logo.png".to_string(), vec![])];
        let rewritten = rewrite_asset_paths(html, "acme", &assets);
        assert_eq!(
            rewritten,
            r#"<img src="/static/acme/a/assets/img/logo.png"><img src="/static/acme/a/assets/img/logo.png" class="small">"#
        );
    }
}
