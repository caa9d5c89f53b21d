//! Sitemap-index recursive expansion with cycle and depth guards (§4.7, §9).
//!
//! The open question of whether a cycle is a failure or a silent dedup is
//! resolved here as silent dedup: a repeated child URL is dropped from
//! expansion rather than aborting the whole source, so one malformed
//! sitemap (of dozens of third-party feeds, per §1) doesn't fail the run.
//! See DESIGN.md for the full rationale.

use std::collections::HashSet;

use crate::errors::PipelineError;
use crate::models::UrlRecord;
use crate::sitemap::parser::{select_parser, ParseOutcome};

/// Cap on sitemap-index recursion depth; a chain of nested indices deeper
/// than this is treated as a cycle even if every URL is technically novel.
const MAX_RECURSION_DEPTH: u32 = 10;

/// Fetch and recursively expand a sitemap source, returning the flattened
/// URL set. `fetch` is the caller-supplied body-fetching closure so this
/// module stays transport-agnostic and testable without real HTTP.
pub async fn expand_source<F, Fut>(
    root_url: &str,
    url_cap: usize,
    fetch: &F,
) -> Result<Vec<UrlRecord>, PipelineError>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<u8>, PipelineError>>,
{
    let mut visited = HashSet::new();
    let mut urls = Vec::new();
    expand_recursive(root_url, url_cap, fetch, &mut visited, &mut urls, 0).await?;
    Ok(urls)
}

fn expand_recursive<'a, F, Fut>(
    url: &'a str,
    url_cap: usize,
    fetch: &'a F,
    visited: &'a mut HashSet<String>,
    urls: &'a mut Vec<UrlRecord>,
    depth: u32,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), PipelineError>> + Send + 'a>>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<u8>, PipelineError>>,
{
    Box::pin(async move {
        if depth > MAX_RECURSION_DEPTH {
            log::warn!("sitemap index recursion depth exceeded at {url}, treating as cycle");
            return Ok(());
        }
        if !visited.insert(url.to_string()) {
            log::debug!("sitemap index cycle detected at {url}, skipping re-expansion");
            return Ok(());
        }
        if urls.len() >= url_cap {
            return Ok(());
        }

        let body = fetch(url.to_string()).await?;
        let parser = select_parser(url);
        match parser.parse(&body, url_cap - urls.len()).await {
            Ok(ParseOutcome::Urls(mut found)) => {
                urls.append(&mut found);
            }
            Ok(ParseOutcome::ChildSitemaps(children)) => {
                for child in children {
                    expand_recursive(&child, url_cap, fetch, visited, urls, depth + 1).await?;
                }
            }
            Err(err) => {
                log::warn!("failed to parse sitemap source {url}: {err}");
            }
        }
        Ok(())
    })
}
