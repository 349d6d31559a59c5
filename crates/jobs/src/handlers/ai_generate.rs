//! AI safe-page generation handler (`variant=b, action=ai_generate`):
//! render the active prompt template (or an embedded default), call
//! the LLM collaborator, extract `<article>…</article>` from the
//! response, and wrap it in the fixed HTML shell before persisting.

use std::collections::HashMap;
use std::sync::Arc;

use autoguard_fast::FastStore;
use autoguard_store::Database;
use tracing::info;

use crate::collaborators::LlmClient;
use crate::error::{JobError, JobResult};
use crate::filesystem::PageWriter;
use crate::job::{Action, PageGenerationJob, Variant};
use crate::prompt_cache;
use crate::templates::render;

const DEFAULT_PROMPT_TEMPLATE: &str = "\
Write a short, genuinely useful {{safe_page_type}} article about {{product_name}}. \
Mention {{#competitors}}how it compares to {{competitors}}{{/competitors}}. \
Wrap the article body in <article></article> tags.";

const HTML_SHELL: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{product_name}}</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; line-height: 1.6; color: #222; }
.cta { display: inline-block; padding: 0.75rem 1.5rem; background: #1a73e8; color: #fff; border-radius: 6px; text-decoration: none; margin-top: 1.5rem; }
</style>
</head>
<body>
{{article}}
{{#cta_button}}<a class="cta" href="{{affiliate_link}}">{{cta_button}}</a>{{/cta_button}}
</body>
</html>"#;

pub async fn handle(
    job: &PageGenerationJob,
    store: &Database,
    fast: &FastStore,
    llm: &Arc<dyn LlmClient>,
    writer: &PageWriter,
) -> JobResult<()> {
    if job.variant != Variant::B || job.action != Action::AiGenerate {
        return Err(JobError::Validation(
            "ai_generate handler invoked for a non-ai_generate job".into(),
        ));
    }
    let safe_page_type = job
        .safe_page_type
        .as_deref()
        .ok_or_else(|| JobError::Validation("ai_generate job missing safePageType".into()))?;

    let offer = store.offers().find_by_id(job.offer_id).await?;

    let prompt_name = format!("safe-page-{safe_page_type}");
    let template = prompt_cache::active_content(store, fast, &prompt_name)
        .await?
        .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

    let mut vars = HashMap::new();
    vars.insert("product_name".to_string(), offer.brand_name.clone());
    vars.insert("product_url".to_string(), offer.brand_url.clone());
    vars.insert("safe_page_type".to_string(), safe_page_type.to_string());
    if let Some(competitors) = &job.competitors {
        vars.insert("competitors".to_string(), competitors.join(", "));
    }
    if let Some(affiliate_link) = &job.affiliate_link {
        vars.insert("affiliate_link".to_string(), affiliate_link.clone());
        vars.insert("cta_button".to_string(), "Learn more".to_string());
    }

    let prompt = render(&template, &vars);

    let response = llm
        .generate(&prompt)
        .await
        .map_err(|e| JobError::Transient(format!("llm generation failed: {e}")))?;

    let article = extract_article(&response)
        .ok_or_else(|| JobError::Transient("llm response missing <article> tags".into()))?;

    vars.insert("article".to_string(), article);
    let html = render(HTML_SHELL, &vars);

    writer.write_index(&job.subdomain, Variant::B, &html).await?;
    store.pages().mark_generated(job.page_id, &html).await?;

    info!(page_id = job.page_id, offer_id = job.offer_id, safe_page_type, "ai safe page generated");
    Ok(())
}

fn extract_article(response: &str) -> Option<String> {
    let start = response.find("<article>")? + "<article>".len();
    let end = response.find("</article>")?;
    if end < start {
        return None;
    }
    Some(response[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_article_body_between_tags() {
        let response = "preamble<article>Hello world</article>trailer";
        assert_eq!(extract_article(response).as_deref(), Some("Hello world"));
    }

    #[test]
    fn missing_article_tags_returns_none() {
        assert!(extract_article("no tags here").is_none());
    }
}
