//! Destination filename derivation.
//!
//! The album page carries four text fields the filename is built from:
//! album title (`h2`), artist and event (`.pageSpan2`), and the declared
//! format (the sibling of the `.pageSpan1` labelled `Format:`). The result
//! is `Artist — Album [Event] [Format]`, where the event segment is
//! present only when the event field contains a recognized event code.

use std::sync::LazyLock;

use chromiumoxide::page::Page;
use regex::Regex;

use super::ScrapeError;

/// Event codes: Comiket (`C` + digits) or M3 (`M` + digit, hyphen, digits).
static EVENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(C[0-9]+|M[0-9]-[0-9]+)$").expect("valid event regex"));

/// Derive the destination filename (without extension) from a loaded album
/// page. The event field is best-effort: a missing element or a field with
/// no recognized event code omits the bracketed event segment.
pub async fn derive(page: &Page) -> Result<String, ScrapeError> {
    let album = query_text(page, "document.querySelector('h2')?.innerText ?? ''")
        .await?
        .ok_or(ScrapeError::MissingField("album title (h2)"))?;

    let artist = query_text(
        page,
        "document.querySelectorAll('.pageSpan2')[0]?.innerText ?? ''",
    )
    .await?
    .ok_or(ScrapeError::MissingField("artist (.pageSpan2)"))?;

    let format = query_text(
        page,
        "Array.from(document.querySelectorAll('.pageSpan1'))\
         .find(el => el.innerText == 'Format:')?.nextElementSibling?.innerText ?? ''",
    )
    .await?
    .ok_or(ScrapeError::MissingField("format (.pageSpan1 sibling)"))?;

    let event_field = query_text(
        page,
        "document.querySelectorAll('.pageSpan2')[1]?.innerText ?? ''",
    )
    .await?;

    let event = event_field.as_deref().and_then(event_segment);

    Ok(compose(&artist, &album, event.as_deref(), &format))
}

/// Evaluate an expression yielding a string, with `''` standing in for a
/// missing element (CDP reports a JS `null` result as an absent value, so
/// the scripts use the empty string as their sentinel).
async fn query_text(page: &Page, expr: &str) -> Result<Option<String>, ScrapeError> {
    let text: String = page.evaluate(expr).await?.into_value()?;

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Pick the recognized event codes out of a comma-separated event field.
fn event_segment(field: &str) -> Option<String> {
    let matches: Vec<&str> = field
        .split(", ")
        .map(str::trim)
        .filter(|token| EVENT_RE.is_match(token))
        .collect();

    if matches.is_empty() {
        None
    } else {
        Some(matches.join(", "))
    }
}

fn compose(artist: &str, album: &str, event: Option<&str>, format: &str) -> String {
    let raw = match event {
        Some(event) => format!("{artist} — {album} [{event}] [{format}]"),
        None => format!("{artist} — {album} [{format}]"),
    };

    sanitize(&raw)
}

/// Replace characters that are illegal in destination paths with fullwidth
/// lookalikes, trim edge whitespace, and defuse a trailing dot.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        match c {
            '\\' => out.push('＼'),
            '/' => out.push('∕'),
            '*' => out.push('＊'),
            '>' => out.push('˃'),
            '<' => out.push('˂'),
            ':' => out.push('˸'),
            '|' => out.push('｜'),
            '"' => out.push('ˮ'),
            '?' => out.push('？'),
            c => out.push(c),
        }
    }

    let mut out = out.trim().to_string();

    if out.ends_with('.') {
        out.pop();
        out.push('ˌ');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_without_event() {
        assert_eq!(compose("Foo", "Bar", None, "MP3"), "Foo — Bar [MP3]");
    }

    #[test]
    fn composes_with_event() {
        assert_eq!(
            compose("Foo", "Bar", Some("C102"), "MP3"),
            "Foo — Bar [C102] [MP3]"
        );
    }

    #[test]
    fn event_segment_keeps_only_recognized_codes() {
        assert_eq!(event_segment("C102").as_deref(), Some("C102"));
        assert_eq!(event_segment("M3-52").as_deref(), Some("M3-52"));
        assert_eq!(
            event_segment("Comiket, C102, M3-52").as_deref(),
            Some("C102, M3-52")
        );
        assert_eq!(event_segment("Original, Touhou"), None);
        assert_eq!(event_segment(""), None);
    }

    #[test]
    fn event_codes_must_match_whole_token() {
        assert_eq!(event_segment("C102extra"), None);
        assert_eq!(event_segment("MC102"), None);
        assert_eq!(event_segment("M33-52"), None);
    }

    #[test]
    fn sanitize_replaces_path_illegal_characters() {
        assert_eq!(sanitize("a/b\\c:d"), "a∕b＼c˸d");
        assert_eq!(sanitize("what?"), "what？");
        assert_eq!(sanitize("a|b*c<d>e\"f"), "a｜b＊c˂d˃eˮf");
    }

    #[test]
    fn sanitize_trims_and_defuses_trailing_dot() {
        assert_eq!(sanitize("  name  "), "name");
        assert_eq!(sanitize("vol. 2."), "vol. 2ˌ");
    }
}
