//! YouTube extraction: captions first, audio transcription as the paid
//! fallback, with best-effort metadata on top.
//!
//! Strategy order, cheapest first:
//! 1. Official captions across a fixed language list (free, fast, exact).
//! 2. Audio download (`yt-dlp`) + speech-to-text (Whisper). Costly and
//!    audio-only: on-screen code or slides never make it into the text.
//!
//! Video metadata (title, channel, duration, description, chapters, tags)
//! comes from `yt-dlp --dump-json` with a lighter oEmbed fallback; both are
//! best-effort and never fail the extraction. A code-repository link found in
//! the description is recorded as a link-only addendum.
//!
//! The final text blob is assembled once from ordered named sections:
//! header, description, repository link, chapters, spoken body, tags.

use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::extract::run_command;
use crate::models::{DocMeta, TextUnit};

/// Largest audio file forwarded to transcription, in megabytes.
const MAX_AUDIO_MB: f64 = 25.0;
/// A transcript shorter than this is treated as a failed transcription.
const MIN_TRANSCRIPT_CHARS: usize = 50;

pub async fn extract_youtube(
    config: &ExtractConfig,
    url: &str,
    meta: &DocMeta,
) -> Result<Vec<TextUnit>, ExtractError> {
    let id = video_id(url)?;
    let video_url = format!("https://www.youtube.com/watch?v={id}");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.command_timeout_secs))
        .build()?;

    let metadata = fetch_metadata(config, &client, &id).await;
    info!(video = %id, title = %metadata.title, "resolved video");

    let repo_link = github_link(&metadata.description);

    let spoken = match fetch_captions(config, &client, &id).await {
        Some(captions) => {
            info!(video = %id, chars = captions.len(), "using captions");
            Spoken::Captions(captions)
        }
        None => {
            info!(video = %id, "no usable captions, transcribing audio");
            // Everything transient (downloaded audio, cookie file) lives in
            // this directory and is removed when it drops, on every exit path.
            let workdir = tempfile::tempdir()?;
            let cookies = write_cookies_file(workdir.path())?;
            let audio = download_audio(config, workdir.path(), &id, cookies.as_deref()).await?;
            let transcript = transcribe_audio(&audio).await?;
            Spoken::Transcript {
                text: transcript,
                has_repo: repo_link.is_some(),
            }
        }
    };

    let blob = assemble(&video_url, &metadata, repo_link.as_deref(), &spoken);

    if blob.len() < config.min_video_chars {
        return Err(ExtractError::InsufficientContent {
            got: blob.len(),
            need: config.min_video_chars,
        });
    }

    let mut unit_meta = meta.clone();
    unit_meta.video_id = Some(id);
    Ok(vec![TextUnit {
        text: blob,
        meta: unit_meta,
    }])
}

/// Resolve the canonical video id from any supported URL shape.
pub fn video_id(url: &str) -> Result<String, ExtractError> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)",
            r"youtube\.com/watch\?.*v=([^&\n?#]+)",
            r"youtube\.com/shorts/([^&\n?#]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(url) {
            if let Some(id) = caps.get(1) {
                let id = id.as_str();
                let id = id.split(['&', '?']).next().unwrap_or(id);
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
    }

    Err(ExtractError::InvalidUrl(url.to_string()))
}

// ============ Captions ============

/// Try official caption tracks in the configured language order; accept the
/// first transcript that clears the content floor.
async fn fetch_captions(
    config: &ExtractConfig,
    client: &reqwest::Client,
    video_id: &str,
) -> Option<String> {
    for lang in &config.caption_languages {
        let url = format!(
            "https://www.youtube.com/api/timedtext?lang={lang}&v={video_id}"
        );
        let xml = match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(xml) => xml,
                Err(_) => continue,
            },
            _ => continue,
        };
        if xml.trim().is_empty() {
            continue;
        }
        match parse_timedtext(&xml) {
            Ok(text) if text.len() > config.min_video_chars => {
                debug!(lang, chars = text.len(), "found caption track");
                return Some(text);
            }
            _ => continue,
        }
    }
    None
}

/// Pull the spoken lines out of a timedtext XML document.
pub fn parse_timedtext(xml: &str) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"text" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                let piece = t.unescape().unwrap_or_default();
                let piece = piece.trim();
                if !piece.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(piece);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"text" {
                    in_text = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::command(
                    "timedtext",
                    format!("caption XML parse error: {e}"),
                ))
            }
            _ => {}
        }
    }

    Ok(out)
}

// ============ Metadata ============

#[derive(Debug, Clone, Default)]
pub struct VideoMetadata {
    pub title: String,
    pub channel: String,
    pub description: String,
    pub duration_secs: u64,
    pub chapters: Vec<Chapter>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct DumpJson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    chapters: Option<Vec<Chapter>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OEmbed {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: String,
}

/// Fetch video metadata, best-effort: `yt-dlp --dump-json` first, the public
/// oEmbed endpoint as the lighter fallback, empty metadata as the floor.
async fn fetch_metadata(
    config: &ExtractConfig,
    client: &reqwest::Client,
    video_id: &str,
) -> VideoMetadata {
    let video_url = format!("https://www.youtube.com/watch?v={video_id}");
    let timeout = Duration::from_secs(config.command_timeout_secs);

    match run_command(
        "yt-dlp",
        &[
            OsStr::new("--dump-json"),
            OsStr::new("--no-warnings"),
            OsStr::new(&video_url),
        ],
        timeout,
    )
    .await
    {
        Ok(output) => {
            if let Ok(parsed) = serde_json::from_slice::<DumpJson>(&output.stdout) {
                return VideoMetadata {
                    title: parsed.title,
                    channel: parsed.uploader.or(parsed.channel).unwrap_or_default(),
                    description: parsed.description,
                    duration_secs: parsed.duration.unwrap_or(0.0) as u64,
                    chapters: parsed.chapters.unwrap_or_default(),
                    tags: parsed.tags.unwrap_or_default(),
                };
            }
            warn!(video = %video_id, "yt-dlp metadata output did not parse, using fallback");
        }
        Err(e) => {
            warn!(video = %video_id, error = %e, "yt-dlp metadata fetch failed, using fallback");
        }
    }

    let oembed_url = format!(
        "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={video_id}&format=json"
    );
    match client.get(&oembed_url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<OEmbed>().await {
            Ok(data) => VideoMetadata {
                title: data.title,
                channel: data.author_name,
                ..VideoMetadata::default()
            },
            Err(_) => VideoMetadata::default(),
        },
        _ => {
            warn!(video = %video_id, "oEmbed fallback failed, proceeding without metadata");
            VideoMetadata::default()
        }
    }
}

/// First recognizable GitHub repository link in a description, if any. The
/// repository contents are not fetched; only the link is recorded.
pub fn github_link(description: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?:https?://)?github\.com/[A-Za-z0-9_-]+/[A-Za-z0-9._-]+").expect("static pattern")
    });

    let m = pattern.find(description)?;
    let link = m.as_str();
    if link.starts_with("http") {
        Some(link.to_string())
    } else {
        Some(format!("https://{link}"))
    }
}

// ============ Audio fallback ============

/// Write the cookies from `YOUTUBE_COOKIES` into the work directory, when
/// the variable is set. The file dies with the directory.
fn write_cookies_file(dir: &Path) -> Result<Option<PathBuf>, ExtractError> {
    match std::env::var("YOUTUBE_COOKIES") {
        Ok(content) if !content.trim().is_empty() => {
            let path = dir.join("cookies.txt");
            std::fs::write(&path, content)?;
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}

/// Download the best available audio into the work directory.
async fn download_audio(
    config: &ExtractConfig,
    dir: &Path,
    video_id: &str,
    cookies: Option<&Path>,
) -> Result<PathBuf, ExtractError> {
    let output_path = dir.join(format!("{video_id}.mp3"));
    let video_url = format!("https://www.youtube.com/watch?v={video_id}");

    let mut args: Vec<&OsStr> = vec![
        OsStr::new("--no-warnings"),
        OsStr::new("--no-check-certificates"),
        OsStr::new("--extractor-args"),
        OsStr::new("youtube:player_client=android,music"),
    ];
    if let Some(cookies) = cookies {
        args.push(OsStr::new("--cookies"));
        args.push(cookies.as_os_str());
    }
    args.extend([
        OsStr::new("-f"),
        OsStr::new("bestaudio/best"),
        OsStr::new("-x"),
        OsStr::new("--audio-format"),
        OsStr::new("mp3"),
        OsStr::new("--audio-quality"),
        OsStr::new("5"),
        OsStr::new("--no-playlist"),
        OsStr::new("--max-filesize"),
        OsStr::new("26M"),
        OsStr::new("-o"),
        output_path.as_os_str(),
        OsStr::new(&video_url),
    ]);

    run_command(
        "yt-dlp",
        &args,
        Duration::from_secs(config.download_timeout_secs),
    )
    .await?;

    if !output_path.exists() {
        return Err(ExtractError::command(
            "yt-dlp",
            "audio download produced no file",
        ));
    }

    let size_mb = std::fs::metadata(&output_path)?.len() as f64 / 1024.0 / 1024.0;
    debug!(video = %video_id, size_mb, "audio downloaded");
    if size_mb > MAX_AUDIO_MB {
        return Err(ExtractError::command(
            "yt-dlp",
            format!(
                "audio file too large ({size_mb:.1} MB); try a shorter video or one with captions"
            ),
        ));
    }

    Ok(output_path)
}

/// Transcribe an audio file with the Whisper API.
async fn transcribe_audio(path: &Path) -> Result<String, ExtractError> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| ExtractError::Transcription("OPENAI_API_KEY not set".to_string()))?;

    let bytes = tokio::fs::read(path).await?;

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name("audio.mp3")
        .mime_str("audio/mpeg")
        .map_err(|e| ExtractError::Transcription(e.to_string()))?;
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("model", "whisper-1")
        .text("language", "en")
        .text("response_format", "text");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let resp = client
        .post("https://api.openai.com/v1/audio/transcriptions")
        .bearer_auth(api_key.trim())
        .multipart(form)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ExtractError::Transcription(format!(
            "Whisper API error ({status}): {body}"
        )));
    }

    let transcript = resp.text().await?;
    if transcript.len() < MIN_TRANSCRIPT_CHARS {
        return Err(ExtractError::Transcription(
            "transcription returned insufficient content".to_string(),
        ));
    }

    Ok(transcript)
}

// ============ Section assembly ============

/// The spoken-word body of the composed blob.
pub enum Spoken {
    Captions(String),
    Transcript { text: String, has_repo: bool },
}

/// Compose the final text blob from ordered named sections. Assembled once;
/// each section decides its own inclusion.
pub fn assemble(
    video_url: &str,
    meta: &VideoMetadata,
    repo_link: Option<&str>,
    spoken: &Spoken,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    let mut header = String::new();
    if !meta.title.is_empty() {
        header.push_str(&format!("Title: {}\n", meta.title));
    }
    if !meta.channel.is_empty() {
        header.push_str(&format!("Channel: {}\n", meta.channel));
    }
    if meta.duration_secs > 0 {
        header.push_str(&format!("Duration: {}\n", format_time(meta.duration_secs)));
    }
    header.push_str(&format!("URL: {video_url}"));
    sections.push(header);

    if meta.description.len() > 50 {
        sections.push(format!("[Video Description]\n{}", meta.description));
    }

    if let Some(repo) = repo_link {
        sections.push(format!(
            "[GitHub Repository]\nCode repository: {repo}\n(Visit the link to see the full code)"
        ));
    }

    if !meta.chapters.is_empty() {
        let lines: Vec<String> = meta
            .chapters
            .iter()
            .map(|c| {
                let title = if c.title.is_empty() { "Untitled" } else { &c.title };
                format!("{} - {}", format_time(c.start_time as u64), title)
            })
            .collect();
        sections.push(format!("[Video Chapters/Timestamps]\n{}", lines.join("\n")));
    }

    match spoken {
        Spoken::Captions(text) => {
            sections.push(format!("[Captions/Subtitles - Spoken Audio]\n{text}"));
        }
        Spoken::Transcript { text, has_repo } => {
            let mut body = String::from("[AI Transcription - Spoken Audio Only]\n");
            body.push_str(
                "Note: This transcription is from audio only. Visual content (code on screen, slides, diagrams) is not included.\n",
            );
            if *has_repo {
                body.push_str(
                    "However, the GitHub repository linked in the description is recorded above.\n",
                );
            } else {
                body.push_str(
                    "If code examples were shown on screen, they may not appear in this transcription. Check the video description for code repository links.\n",
                );
            }
            body.push('\n');
            body.push_str(text);
            sections.push(body);
        }
    }

    if !meta.tags.is_empty() {
        let tags: Vec<&str> = meta.tags.iter().take(10).map(String::as_str).collect();
        sections.push(format!("[Tags]\n{}", tags.join(", ")));
    }

    sections.join("\n\n")
}

/// Format seconds as `M:SS` or `H:MM:SS`.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
