//! Grounding-prompt composition.
//!
//! A deterministic, pure function of the retrieved documents, the recent
//! conversation turns, and the user's question. The only dispatch is the
//! response-policy table: an ordered list of `(keywords, instructions)`
//! pairs evaluated top to bottom, consulted only when the retrieved set
//! contains at least one `url`-typed document. The final entry has no
//! keywords and always matches, so the table is total.

use crate::models::{ChatTurn, RetrievedDoc, Role, SourceKind};

/// How many trailing conversation turns are included in the prompt.
const HISTORY_WINDOW: usize = 6;

/// One row of the policy table. Keywords are matched as lowercase
/// substrings of the query; an empty keyword list matches everything.
pub struct Policy {
    pub name: &'static str,
    keywords: &'static [&'static str],
    instructions: &'static str,
}

/// Priority-ordered response policies for web-derived content. First match
/// wins.
pub static POLICIES: &[Policy] = &[
    Policy {
        name: "lyrics",
        keywords: &["lyrics", "song"],
        instructions: "SONG/LYRICS QUERY:\n\
            The documents may contain copyrighted song lyrics from a video \
            transcription or description.\n\
            - Do NOT reproduce the complete lyrics, even if they appear in the documents.\n\
            - Short excerpts (2-3 lines) are fine; explain that full lyrics are \
            copyrighted and describe the song's themes instead.\n\
            - Always cite where the content came from (video description or audio \
            transcription) and note that transcription quality may vary.",
    },
    Policy {
        name: "code",
        keywords: &["install", "how to", "code", "example", "command"],
        instructions: "CODE/INSTALLATION QUERY:\n\
            The documents contain web content with commands and code buried in HTML \
            noise.\n\
            - IGNORE HTML tags, CSS class tokens (text-4xl, flex, bg-gray-900), and \
            navigation elements.\n\
            - EXTRACT installation commands, code examples, and step-by-step \
            instructions.\n\
            - Quote commands like \"npm install package-name\" EXACTLY as written and \
            preserve code-block formatting.",
    },
    Policy {
        name: "page_content",
        keywords: &[
            "what is written",
            "what is at the top",
            "what does the website say",
            "what does the page say",
            "content of",
            "text on the page",
        ],
        instructions: "WEBSITE CONTENT EXTRACTION:\n\
            You are reading raw web text. The content the user wants is buried in \
            markup noise.\n\
            - IGNORE CSS-class-like tokens (text-4xl, tracking-tighter, pt-4), \
            leftover tag fragments, and UI chrome (Quick search, menu items).\n\
            - EXTRACT multi-word phrases that form coherent sentences: headings, \
            descriptions, marketing copy, instructions.\n\
            - Example: from \"text-4xl text-white tracking-tighterRapidly build \
            modern websites\" extract \"Rapidly build modern websites\".",
    },
    Policy {
        name: "documentation",
        keywords: &["documentation", "tutorial", "guide", "how does", "explain"],
        instructions: "DOCUMENTATION/TUTORIAL CONTENT:\n\
            - Present main concepts first, then step-by-step instructions, then \
            code examples with their formatting preserved.\n\
            - Skip navigation menus, sidebars, footers, cookie notices, and ads.\n\
            - Keep steps in their original order and highlight key warnings.",
    },
    Policy {
        name: "api_reference",
        keywords: &["api", "package", "library", "module"],
        instructions: "API/PACKAGE DOCUMENTATION:\n\
            Extract, in order: package name and version, installation command, \
            basic usage example, key methods, configuration options.\n\
            Preserve exact function and method names, parameter types, and \
            import/require statements. Format code examples properly.",
    },
    Policy {
        name: "article",
        keywords: &["article", "blog", "post", "read"],
        instructions: "BLOG/ARTICLE CONTENT:\n\
            Extract the title, main paragraphs, subheadings, key points, and \
            conclusions. Skip author bios, related-article sidebars, comment \
            sections, and share buttons. Present clean paragraphs.",
    },
    Policy {
        name: "generic_web",
        keywords: &[],
        instructions: "GENERAL WEB CONTENT:\n\
            You are reading raw web text. Extract the actual readable content: \
            sentences, headings, descriptions, list items. Ignore CSS-class-like \
            tokens, tag fragments, and navigation chrome. Look for meaning, not \
            markup.",
    },
];

/// Pick the response policy for a query, or `None` when the retrieved set
/// has no `url`-typed document and no policy applies.
pub fn select_policy(query: &str, docs: &[RetrievedDoc]) -> Option<&'static Policy> {
    let has_url_docs = docs.iter().any(|d| d.meta.kind == SourceKind::Url);
    if !has_url_docs {
        return None;
    }

    let query = query.to_lowercase();
    POLICIES
        .iter()
        .find(|policy| policy.keywords.is_empty() || policy.keywords.iter().any(|k| query.contains(k)))
}

/// Assemble the grounding prompt: policy instructions, the last few
/// conversation turns, every retrieved document, and the literal question.
pub fn compose(docs: &[RetrievedDoc], history: &[ChatTurn], query: &str) -> String {
    let mut prompt = String::from("You are Carrel, an intelligent document analysis assistant.\n");

    if let Some(policy) = select_policy(query, docs) {
        prompt.push('\n');
        prompt.push_str(policy.instructions);
        prompt.push('\n');
    }

    if !history.is_empty() {
        let window_start = history.len().saturating_sub(HISTORY_WINDOW);
        prompt.push_str("\nCONVERSATION HISTORY:\n");
        for turn in &history[window_start..] {
            let role = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", role, turn.content));
        }
    }

    prompt.push_str("\nDOCUMENTS:\n");
    let blocks: Vec<String> = docs
        .iter()
        .map(|doc| {
            format!(
                "[{}: {}]\n{}",
                doc.meta.kind.as_str().to_uppercase(),
                doc.meta.source,
                doc.text
            )
        })
        .collect();
    prompt.push_str(&blocks.join("\n\n---\n\n"));

    prompt.push_str("\n\nUSER QUESTION:\n");
    prompt.push_str(query);
    prompt.push_str("\n\nYOUR ANSWER (follow the instructions above):");

    prompt
}
