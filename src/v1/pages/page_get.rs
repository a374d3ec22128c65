#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{ OpenApi, payload::Html, payload::Json, param::Path, ApiResponse };
use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use serde::Serialize;
use tera::{Context, Tera};
use log::error;

use crate::utils::errors::{Errors, HttpResult};
use crate::utils::wp_utils::{self, RequestDebug};

use crate::RUNTIME_CTX;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Page template compiled into the binary.
const PAGE_TEMPLATE: &str = include_str!("../../../resources/page.html");
const PAGE_TEMPLATE_NAME: &str = "page.html";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
lazy_static! {
    static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        tera.add_raw_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)
            .expect("FAILED to compile the page template.");
        tera
    };
}

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct GetPageApi;

#[derive(Debug)]
struct ReqGetPage
{
    slug: String,
}

/// One resolved slug segment as handed to the template.
#[derive(Debug, Serialize)]
struct PageEntry {
    word: String,
    index: usize,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqGetPage {
    type Req = ReqGetPage;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request body:");
        s.push_str("\n    slug: ");
        s.push_str(&self.slug);
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(ApiResponse)]
enum WpResponse {
    #[oai(status = 200)]
    Http200(Html<String>),
    #[oai(status = 400)]
    Http400(Json<HttpResult>),
    #[oai(status = 404)]
    Http404(Json<HttpResult>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_200(page: String) -> WpResponse {
    WpResponse::Http200(Html(page))
}
fn make_http_400(msg: String) -> WpResponse {
    WpResponse::Http400(Json(HttpResult::new(400.to_string(), msg)))
}
fn make_http_404(msg: String) -> WpResponse {
    WpResponse::Http404(Json(HttpResult::new(404.to_string(), msg)))
}
fn make_http_500(msg: String) -> WpResponse {
    WpResponse::Http500(Json(HttpResult::new(500.to_string(), msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl GetPageApi {
    #[oai(path = "/r/:slug", method = "get")]
    async fn get_page(&self, http_req: &Request, slug: Path<String>) -> WpResponse {
        // Package the request parameters.
        let req = ReqGetPage { slug: slug.0 };

        // -------------------- Process Request ----------------------
        match process(http_req, &req) {
            Ok(r) => r,
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(msg)
            }
        }
    }
}

// ***************************************************************************
//                          Request Processing
// ***************************************************************************
// ---------------------------------------------------------------------------
// process:
// ---------------------------------------------------------------------------
/** Validate the slug, resolve each word's assigned index, and render the
 * page.  Malformed slugs are a 400; a word missing from the dictionary is a
 * 404.  Neither is an internal error.
 */
fn process(http_req: &Request, req: &ReqGetPage) -> Result<WpResponse> {
    // Conditional logging depending on log level.
    wp_utils::debug_request(http_req, req);

    // A slug is exactly three hyphen-joined alphabetic words.
    let words = match parse_slug(&req.slug) {
        Ok(w) => w,
        Err(e) => return Ok(make_http_400(e.to_string())),
    };

    // Resolve every word or report the first miss.
    let mut entries: Vec<PageEntry> = Vec::with_capacity(words.len());
    for word in words {
        match RUNTIME_CTX.dictionary.get_index(&word) {
            Ok(index) => entries.push(PageEntry { word, index }),
            Err(e) => return Ok(make_http_404(e.to_string())),
        }
    }

    let next_slug = next_slug(&entries)?;
    let page = render_page(
        &RUNTIME_CTX.parms.config.title,
        &req.slug,
        &entries,
        RUNTIME_CTX.dictionary.size(),
        &next_slug,
    )?;
    Ok(make_http_200(page))
}

// ---------------------------------------------------------------------------
// parse_slug:
// ---------------------------------------------------------------------------
/** Split a slug into its three words.  Each segment must be one or more
 * ASCII letters; casing is irrelevant because dictionary lookups lowercase
 * their input.  Everything else is malformed.
 */
fn parse_slug(slug: &str) -> Result<Vec<String>, Errors> {
    let parts: Vec<&str> = slug.split('-').collect();
    if parts.len() != 3 {
        return Err(Errors::InvalidSlug(slug.to_string()));
    }
    for part in &parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Errors::InvalidSlug(slug.to_string()));
        }
    }
    Ok(parts.iter().map(|p| p.to_lowercase()).collect())
}

// ---------------------------------------------------------------------------
// next_slug:
// ---------------------------------------------------------------------------
/** Suggest another valid page by advancing each resolved index by one,
 * wrapping at the dictionary size.
 */
fn next_slug(entries: &[PageEntry]) -> Result<String> {
    let size = RUNTIME_CTX.dictionary.size();
    let mut words: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let word = RUNTIME_CTX.dictionary.get_word((entry.index + 1) % size)?;
        words.push(word.to_string());
    }
    Ok(words.join("-"))
}

// ---------------------------------------------------------------------------
// render_page:
// ---------------------------------------------------------------------------
/** Render the html page for a fully resolved slug. */
fn render_page(
    title: &str,
    slug: &str,
    entries: &[PageEntry],
    size: usize,
    next_slug: &str,
) -> Result<String> {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("slug", slug);
    context.insert("entries", entries);
    context.insert("size", &size);
    context.insert("next_slug", next_slug);
    TEMPLATES
        .render(PAGE_TEMPLATE_NAME, &context)
        .map_err(|e| anyhow!("Template rendering failed for slug {}: {}", slug, e))
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slug_accepts_three_words() {
        assert_eq!(parse_slug("foo-bar-baz").unwrap(), vec!["foo", "bar", "baz"]);
        // Mixed case is tolerated and lowercased.
        assert_eq!(parse_slug("Foo-BAR-baz").unwrap(), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_parse_slug_rejects_malformed() {
        assert!(parse_slug("").is_err());
        assert!(parse_slug("foo-bar").is_err());
        assert!(parse_slug("foo-bar-baz-qux").is_err());
        assert!(parse_slug("foo--baz").is_err());
        assert!(parse_slug("-bar-baz").is_err());
        assert!(parse_slug("foo-b4r-baz").is_err());
        assert!(parse_slug("foo-bar-b!z").is_err());
    }

    #[test]
    fn test_render_page() {
        let entries = vec![
            PageEntry { word: "foo".to_string(), index: 7 },
            PageEntry { word: "bar".to_string(), index: 0 },
            PageEntry { word: "baz".to_string(), index: 96 },
        ];
        let page = render_page("Wordpage Server", "foo-bar-baz", &entries, 97, "aaa-bbb-ccc")
            .expect("template should render");
        assert!(page.contains("Page: foo-bar-baz"));
        assert!(page.contains("word #7 of 97"));
        assert!(page.contains("href=\"/r/aaa-bbb-ccc\""));
    }
}
