//! Generic web page extraction: fetch the page and strip it down to its
//! readable text.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::models::{DocMeta, TextUnit};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub async fn extract_web(
    config: &ExtractConfig,
    url: &str,
    meta: &DocMeta,
) -> Result<Vec<TextUnit>, ExtractError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.command_timeout_secs))
        .build()?;

    let html = client.get(url).send().await?.error_for_status()?.text().await?;
    let content = html_to_text(&html);

    debug!(url, chars = content.len(), "fetched page body");

    if content.len() < config.min_web_chars {
        return Err(ExtractError::InsufficientContent {
            got: content.len(),
            need: config.min_web_chars,
        });
    }

    Ok(vec![TextUnit {
        text: content,
        meta: meta.clone(),
    }])
}

/// Reduce an HTML document to its visible text: drop script/style blocks,
/// strip tags, decode the common entities, collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static STYLE: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    static SPACE: OnceLock<Regex> = OnceLock::new();

    let script = SCRIPT.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static pattern"));
    let style = STYLE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("static pattern"));
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"));
    let space = SPACE.get_or_init(|| Regex::new(r"[ \t\r\f]+").expect("static pattern"));

    let text = script.replace_all(html, " ");
    let text = style.replace_all(&text, " ");
    let text = tag.replace_all(&text, " ");

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    // Collapse runs of spaces but keep newlines so the chunker still sees
    // line boundaries.
    let collapsed = space.replace_all(&text, " ");
    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        let html = "<html><body><h1>Welcome</h1><p>Rapidly build modern websites.</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Welcome"));
        assert!(text.contains("Rapidly build modern websites."));
        assert!(!text.contains('<'));
    }

    #[test]
    fn drops_script_and_style_content() {
        let html = "<script>var secret = 1;</script><style>.a{color:red}</style><p>visible</p>";
        let text = html_to_text(html);
        assert_eq!(text, "visible");
    }

    #[test]
    fn decodes_basic_entities() {
        let text = html_to_text("<p>Fish &amp; Chips &lt;fresh&gt;</p>");
        assert_eq!(text, "Fish & Chips <fresh>");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let text = html_to_text("<div>  lots   \t of \r  space  </div>");
        assert_eq!(text, "lots of space");
    }
}
