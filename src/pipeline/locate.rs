//! Document Locator: submit an archive's search form and read the hits.
//!
//! Archive front-ends are old and their markup is frequently invalid (inputs
//! outside the `<form>`, unclosed tables, stray end tags). Parsing goes
//! through `lol_html`, which never builds a DOM and tolerates all of that.
//! The form is located with a structural CSS query rather than assumed to be
//! the document's only well-formed `<form>`.
//!
//! The flow is two requests:
//!
//! ```text
//! GET base_url ──▶ parse_search_form ──▶ GET/POST action ──▶ parse_results
//! ```

use crate::config::{LocatorConfig, SearchQuery};
use crate::error::AuditError;
use crate::output::SearchResult;
use lol_html::html_content::EndTag;
use lol_html::{element, rewrite_str, text, HandlerResult, RewriteStrSettings};
use reqwest::Url;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP method declared by the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMethod {
    #[default]
    Get,
    Post,
}

/// The search form as located on the archive's landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    /// Absolute submission URL.
    pub action: Url,
    pub method: FormMethod,
    /// Hidden inputs carried along with the user fields.
    pub hidden_fields: Vec<(String, String)>,
}

#[derive(Default)]
struct FormCandidate {
    action: Option<String>,
    method: Option<String>,
    hidden_fields: Vec<(String, String)>,
    has_keyword_input: bool,
}

/// Elements inside a snippet whose edges separate words. Inline markup
/// (`<b>`, `<em>`, highlight spans) is joined without a gap.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "td", "th", "tr", "table", "h1", "h2", "h3", "h4",
    "h5", "h6", "blockquote", "pre", "hr", "dd", "dt",
];

#[derive(Default)]
struct ResultDraft {
    href: Option<String>,
    context: String,
}

/// Search the archive and return every hit on the first results page.
///
/// Zero hits is `Ok(vec![])`. A results page without the configured results
/// container is treated as format drift and fails with
/// [`AuditError::Parse`].
pub async fn locate(
    query: &SearchQuery,
    config: &LocatorConfig,
) -> Result<Vec<SearchResult>, AuditError> {
    let client = build_client(config)?;
    let base = Url::parse(&query.base_url).map_err(|e| {
        AuditError::Configuration(format!("invalid base URL '{}': {e}", query.base_url))
    })?;

    info!("Loading search page: {}", base);
    let (landing_url, landing) = fetch_html(client.get(base.clone()), base.as_str()).await?;
    let form = parse_search_form(&landing, &landing_url, config)?;
    debug!("Search form: {:?} {}", form.method, form.action);

    let mut fields = form.hidden_fields.clone();
    fields.push((config.keyword_field.clone(), query.keywords.clone()));
    fields.push((config.scope_field.clone(), query.field.clone()));

    let request = match form.method {
        FormMethod::Get => client.get(form.action.clone()).query(&fields),
        FormMethod::Post => client.post(form.action.clone()).form(&fields),
    };

    info!("Submitting search for {:?} ({})", query.keywords, query.field);
    let (results_url, page) = fetch_html(request, form.action.as_str()).await?;
    let results = parse_results(&page, &results_url, config)?;
    info!("Search returned {} results", results.len());
    Ok(results)
}

/// HTTP client presenting the configured identity.
pub(crate) fn build_client(config: &LocatorConfig) -> Result<reqwest::Client, AuditError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| AuditError::Internal(format!("HTTP client: {e}")))
}

async fn fetch_html(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<(Url, String), AuditError> {
    let response = request
        .send()
        .await
        .map_err(|e| AuditError::network(url, e))?;

    if !response.status().is_success() {
        return Err(AuditError::Network {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| AuditError::network(url, e))?;
    Ok((final_url, body))
}

/// Locate the search form on a landing page.
///
/// Among the elements matching `form_selector`, the one containing the
/// keyword input wins. When the keyword input sits outside every form (broken
/// markup), the first matching form is used as long as the input exists
/// somewhere on the page.
pub fn parse_search_form(
    html: &str,
    page_url: &Url,
    config: &LocatorConfig,
) -> Result<SearchForm, AuditError> {
    let form_sel = config.form_selector.as_str();
    let keyword_sel = format!("input[name=\"{}\"]", config.keyword_field);
    let nested_keyword_sel = format!("{form_sel} {keyword_sel}");
    let hidden_sel = format!("{form_sel} input[type=\"hidden\"]");
    for sel in [
        form_sel,
        keyword_sel.as_str(),
        nested_keyword_sel.as_str(),
        hidden_sel.as_str(),
    ] {
        check_selector(sel, page_url)?;
    }

    let forms: RefCell<Vec<FormCandidate>> = RefCell::new(Vec::new());
    let keyword_seen = Cell::new(false);

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(form_sel, |el| {
                    forms.borrow_mut().push(FormCandidate {
                        action: el.get_attribute("action"),
                        method: el.get_attribute("method"),
                        ..FormCandidate::default()
                    });
                    Ok(())
                }),
                element!(hidden_sel, |el| {
                    if let (Some(name), Some(form)) =
                        (el.get_attribute("name"), forms.borrow_mut().last_mut())
                    {
                        let value = el.get_attribute("value").unwrap_or_default();
                        form.hidden_fields.push((decode(&name), decode(&value)));
                    }
                    Ok(())
                }),
                element!(nested_keyword_sel, |_el| {
                    if let Some(form) = forms.borrow_mut().last_mut() {
                        form.has_keyword_input = true;
                    }
                    Ok(())
                }),
                element!(keyword_sel, |_el| {
                    keyword_seen.set(true);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| parse_error(page_url, format!("HTML rewriting failed: {e}")))?;

    if !keyword_seen.get() {
        return Err(parse_error(
            page_url,
            format!("no input named '{}' on the page", config.keyword_field),
        ));
    }

    let mut forms = forms.into_inner();
    if forms.is_empty() {
        return Err(parse_error(
            page_url,
            format!("no element matches form selector '{form_sel}'"),
        ));
    }
    let chosen = match forms.iter().position(|f| f.has_keyword_input) {
        Some(idx) => forms.swap_remove(idx),
        None => {
            warn!("Keyword input is outside every form; using the first form match");
            forms.swap_remove(0)
        }
    };

    let action = match chosen.action.as_deref().map(decode) {
        Some(a) if !a.trim().is_empty() => page_url
            .join(a.trim())
            .map_err(|e| parse_error(page_url, format!("bad form action '{a}': {e}")))?,
        _ => page_url.clone(),
    };
    let method = match chosen.method.as_deref() {
        Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };

    Ok(SearchForm {
        action,
        method,
        hidden_fields: chosen.hidden_fields,
    })
}

/// Read the hits from a results page.
///
/// Each item contributes its first `a[href]` (resolved against `page_url`)
/// and the whitespace-collapsed text of its context element. Items without a
/// link are skipped.
pub fn parse_results(
    html: &str,
    page_url: &Url,
    config: &LocatorConfig,
) -> Result<Vec<SearchResult>, AuditError> {
    let container_sel = config.results_selector.as_str();
    let item_sel = format!("{container_sel} {}", config.item_selector);
    let link_sel = format!("{item_sel} a[href]");
    let context_sel = format!("{item_sel} {}", config.context_selector);
    let break_sel = BLOCK_TAGS
        .iter()
        .map(|tag| format!("{context_sel} {tag}"))
        .collect::<Vec<_>>()
        .join(", ");
    for sel in [
        container_sel,
        item_sel.as_str(),
        link_sel.as_str(),
        context_sel.as_str(),
        break_sel.as_str(),
    ] {
        check_selector(sel, page_url)?;
    }

    let container_seen = Cell::new(false);
    let drafts: RefCell<Vec<ResultDraft>> = RefCell::new(Vec::new());
    // Set at a block boundary, consumed by the next text chunk.
    let pending_break = Rc::new(Cell::new(false));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(container_sel, |_el| {
                    container_seen.set(true);
                    Ok(())
                }),
                element!(item_sel, |_el| {
                    drafts.borrow_mut().push(ResultDraft::default());
                    Ok(())
                }),
                element!(link_sel, |el| {
                    if let Some(draft) = drafts.borrow_mut().last_mut() {
                        if draft.href.is_none() {
                            draft.href = el.get_attribute("href");
                        }
                    }
                    Ok(())
                }),
                element!(break_sel, |el| {
                    pending_break.set(true);
                    if let Some(handlers) = el.end_tag_handlers() {
                        let pending = Rc::clone(&pending_break);
                        handlers.push(Box::new(move |_end: &mut EndTag<'_>| -> HandlerResult {
                            pending.set(true);
                            Ok(())
                        }) as _);
                    }
                    Ok(())
                }),
                text!(context_sel, |t| {
                    if let Some(draft) = drafts.borrow_mut().last_mut() {
                        if pending_break.replace(false) {
                            draft.context.push(' ');
                        }
                        draft.context.push_str(t.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| parse_error(page_url, format!("HTML rewriting failed: {e}")))?;

    if !container_seen.get() {
        return Err(parse_error(
            page_url,
            format!("results container '{container_sel}' not found; the page layout may have changed"),
        ));
    }

    let mut results = Vec::new();
    for draft in drafts.into_inner() {
        let Some(href) = draft.href else {
            debug!("Skipping result without a link");
            continue;
        };
        let href = decode(href.trim());
        match page_url.join(&href) {
            Ok(url) => results.push(SearchResult {
                url: url.to_string(),
                context: collapse_whitespace(&decode(&draft.context)),
            }),
            Err(e) => warn!("Skipping result with unusable link '{}': {}", href, e),
        }
    }
    Ok(results)
}

fn check_selector(selector: &str, page_url: &Url) -> Result<(), AuditError> {
    selector
        .parse::<lol_html::Selector>()
        .map(|_| ())
        .map_err(|e| parse_error(page_url, format!("invalid selector '{selector}': {e}")))
}

fn parse_error(url: &Url, detail: String) -> AuditError {
    AuditError::Parse {
        url: url.to_string(),
        detail,
    }
}

fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://archive.example.org/search/").unwrap()
    }

    #[test]
    fn finds_form_containing_keyword_input() {
        let html = r#"
            <form action="/login" method="post"><input name="user"></form>
            <form action="results?lang=en&amp;v=2" method="POST">
              <input type="hidden" name="collection" value="papers">
              <input name="q"><select name="field"><option>all</option></select>
            </form>"#;
        let form = parse_search_form(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(
            form.action.as_str(),
            "https://archive.example.org/search/results?lang=en&v=2"
        );
        assert_eq!(form.method, FormMethod::Post);
        assert_eq!(
            form.hidden_fields,
            vec![("collection".to_string(), "papers".to_string())]
        );
    }

    #[test]
    fn tolerates_keyword_input_outside_form() {
        // The form is closed before the table that holds its input.
        let html = r#"<form action="/cgi/search"></form>
            <table><tr><td><input name="q"></td></tr></table>"#;
        let form = parse_search_form(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(form.action.as_str(), "https://archive.example.org/cgi/search");
        assert_eq!(form.method, FormMethod::Get);
    }

    #[test]
    fn missing_keyword_input_is_parse_error() {
        let html = r#"<form action="/s"><input name="other"></form>"#;
        let err = parse_search_form(html, &url(), &LocatorConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn form_without_action_submits_to_page() {
        let html = r#"<form><input name="q"></form>"#;
        let form = parse_search_form(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(form.action, url());
    }

    #[test]
    fn parses_results_with_relative_links() {
        let html = r#"<div id="results">
            <div class="result"><a href="/pdf/1962-10-01.pdf">Oct 1</a>
              <p class="snippet">  ... enrolled   <b>James</b> Meredith at the ... </p></div>
            <div class="result"><p class="snippet">no link here</p></div>
            <div class="result"><a href="https://cdn.example.org/x.pdf?a=1&amp;b=2">x</a>
              <p class="snippet">Meredith &amp; Barnett</p></div>
        </div>"#;
        let results = parse_results(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].url,
            "https://archive.example.org/pdf/1962-10-01.pdf"
        );
        assert_eq!(results[0].context, "... enrolled James Meredith at the ...");
        assert_eq!(results[1].url, "https://cdn.example.org/x.pdf?a=1&b=2");
        assert_eq!(results[1].context, "Meredith & Barnett");
    }

    #[test]
    fn inline_highlighting_keeps_snippet_text_intact() {
        let html = r#"<ul id="results"><li class="result"><a href="a.pdf">a</a>
            <div class="snippet">enrolled <b>James Meredith</b>'s case, Mere<em>dith</em></div>
        </li></ul>"#;
        let results = parse_results(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(results[0].context, "enrolled James Meredith's case, Meredith");
    }

    #[test]
    fn block_boundaries_separate_words() {
        let html = r#"<ul id="results"><li class="result"><a href="a.pdf">a</a>
            <div class="snippet">first line<br>second<p>para</p>tail</div>
        </li></ul>"#;
        let results = parse_results(html, &url(), &LocatorConfig::default()).unwrap();
        assert_eq!(results[0].context, "first line second para tail");
    }

    #[test]
    fn empty_results_container_is_not_an_error() {
        let html = r#"<div id="results"><p>No items found.</p></div>"#;
        let results = parse_results(html, &url(), &LocatorConfig::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn missing_results_container_is_parse_error() {
        let html = r#"<div class="hits"><div class="result"></div></div>"#;
        let err = parse_results(html, &url(), &LocatorConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Parse { .. }));
    }

    #[test]
    fn invalid_selector_is_parse_error() {
        let config = LocatorConfig {
            results_selector: "div[".into(),
            ..LocatorConfig::default()
        };
        let err = parse_results("<div></div>", &url(), &config).unwrap_err();
        assert!(matches!(err, AuditError::Parse { .. }));
    }
}
