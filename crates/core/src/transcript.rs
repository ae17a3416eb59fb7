//! Shared chat transcripts to coding prompts.

use std::sync::OnceLock;
use std::time::Duration;

use regex_lite::{Captures, Regex};
use tracing::{debug, error, instrument};

use crate::errors::TranscriptError;

struct Patterns {
    ordered_list: Regex,
    start_attr: Regex,
    list_item: Regex,
    li_open: Regex,
    li_close: Regex,
    block: Regex,
    tag: Regex,
    entity: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(p) => Some(p),
            Err(e) => {
                error!(error = %e, "invalid transcript pattern");
                None
            }
        })
        .as_ref()
}

impl Patterns {
    fn compile() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            ordered_list: Regex::new(r"(?is)<ol[^>]*>(.*?)</ol>")?,
            start_attr: Regex::new(r#"(?i)start=['"]?(\d+)['"]?"#)?,
            list_item: Regex::new(r"(?is)<li[^>]*>(.*?)</li[^>]*>")?,
            li_open: Regex::new(r"(?i)<li[^>]*>")?,
            li_close: Regex::new(r"(?i)</li[^>]*>")?,
            block: Regex::new(r"(?i)</?(?:br|p|div|h[1-6])[^>]*>")?,
            tag: Regex::new(r"<[^>]+>")?,
            entity: Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);")?,
        })
    }
}

/// Plain text from transcript HTML, keeping line breaks and list markers.
///
/// Ordered lists are renumbered from their `start` attribute, other list
/// items become `- ` bullets, line-level tags become newlines, remaining
/// tags are dropped and entities decoded. Lines are trimmed and blank lines
/// removed.
pub fn extract_text(html: &str) -> String {
    let Some(p) = patterns() else {
        return html.trim().to_string();
    };

    let text = p.ordered_list.replace_all(html, |caps: &Captures| {
        let outer = &caps[0];
        let start: usize = p
            .start_attr
            .captures(outer)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1);
        let items: Vec<String> = p
            .list_item
            .captures_iter(&caps[1])
            .enumerate()
            .map(|(i, item)| format!("{}. {}", start.saturating_add(i), &item[1]))
            .collect();
        format!("\n{}\n", items.join("\n"))
    });
    let text = p.li_open.replace_all(&text, "\n- ");
    let text = p.li_close.replace_all(&text, "\n");
    let text = p.block.replace_all(&text, "\n");
    let text = p.tag.replace_all(&text, "");
    let text = html_unescape(&text);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode the HTML entities transcripts use in practice; unknown entities
/// are left untouched.
pub fn html_unescape(text: &str) -> String {
    let Some(p) = patterns() else {
        return text.to_string();
    };
    p.entity
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Named references covering punctuation, typography, currency, arrows,
/// math and Latin-1 letters. HTML5's rarer names (Greek, box drawing,
/// multi-codepoint references) are not decoded.
fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        "zwnj" => '\u{200c}',
        "zwj" => '\u{200d}',
        "shy" => '\u{ad}',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "lsquo" => '‘',
        "rsquo" => '’',
        "sbquo" => '‚',
        "ldquo" => '“',
        "rdquo" => '”',
        "bdquo" => '„',
        "laquo" => '«',
        "raquo" => '»',
        "lsaquo" => '‹',
        "rsaquo" => '›',
        "bull" => '•',
        "middot" => '·',
        "dagger" => '†',
        "Dagger" => '‡',
        "prime" => '′',
        "Prime" => '″',
        "sect" => '§',
        "para" => '¶',
        "iexcl" => '¡',
        "iquest" => '¿',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "deg" => '°',
        "micro" => 'µ',
        "cent" => '¢',
        "pound" => '£',
        "yen" => '¥',
        "euro" => '€',
        "curren" => '¤',
        "times" => '×',
        "divide" => '÷',
        "plusmn" => '±',
        "minus" => '−',
        "ne" => '≠',
        "le" => '≤',
        "ge" => '≥',
        "asymp" => '≈',
        "infin" => '∞',
        "permil" => '‰',
        "frac14" => '¼',
        "frac12" => '½',
        "frac34" => '¾',
        "sup1" => '¹',
        "sup2" => '²',
        "sup3" => '³',
        "larr" => '←',
        "rarr" => '→',
        "uarr" => '↑',
        "darr" => '↓',
        "harr" => '↔',
        "lArr" => '⇐',
        "rArr" => '⇒',
        "hArr" => '⇔',
        "check" => '✓',
        "hearts" => '♥',
        "star" => '☆',
        "Agrave" => 'À',
        "Aacute" => 'Á',
        "Acirc" => 'Â',
        "Atilde" => 'Ã',
        "Auml" => 'Ä',
        "Aring" => 'Å',
        "AElig" => 'Æ',
        "Ccedil" => 'Ç',
        "Egrave" => 'È',
        "Eacute" => 'É',
        "Ecirc" => 'Ê',
        "Euml" => 'Ë',
        "Igrave" => 'Ì',
        "Iacute" => 'Í',
        "Icirc" => 'Î',
        "Iuml" => 'Ï',
        "Ntilde" => 'Ñ',
        "Ograve" => 'Ò',
        "Oacute" => 'Ó',
        "Ocirc" => 'Ô',
        "Otilde" => 'Õ',
        "Ouml" => 'Ö',
        "Oslash" => 'Ø',
        "Ugrave" => 'Ù',
        "Uacute" => 'Ú',
        "Ucirc" => 'Û',
        "Uuml" => 'Ü',
        "Yacute" => 'Ý',
        "szlig" => 'ß',
        "agrave" => 'à',
        "aacute" => 'á',
        "acirc" => 'â',
        "atilde" => 'ã',
        "auml" => 'ä',
        "aring" => 'å',
        "aelig" => 'æ',
        "ccedil" => 'ç',
        "egrave" => 'è',
        "eacute" => 'é',
        "ecirc" => 'ê',
        "euml" => 'ë',
        "igrave" => 'ì',
        "iacute" => 'í',
        "icirc" => 'î',
        "iuml" => 'ï',
        "ntilde" => 'ñ',
        "ograve" => 'ò',
        "oacute" => 'ó',
        "ocirc" => 'ô',
        "otilde" => 'õ',
        "ouml" => 'ö',
        "oslash" => 'ø',
        "ugrave" => 'ù',
        "uacute" => 'ú',
        "ucirc" => 'û',
        "uuml" => 'ü',
        "yacute" => 'ý',
        "yuml" => 'ÿ',
        _ => return None,
    };
    Some(c)
}

/// Wrap a transcript in the implementation request sent to a coding
/// assistant.
pub fn build_prompt(transcript: &str, platform: &str) -> String {
    format!(
        "You are given the following {} chat transcript. Read it and fully implement any \
         code or configuration changes discussed. Return the complete implementation.\n\n{}",
        platform, transcript
    )
}

/// Downloads shared transcript pages.
pub struct TranscriptFetcher {
    http: reqwest::Client,
}

impl TranscriptFetcher {
    /// `timeout_secs` must be positive.
    pub fn new(timeout_secs: f64) -> Result<Self, TranscriptError> {
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(TranscriptError::InvalidTimeout(timeout_secs));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { http })
    }

    /// Fetch `url` and return its text content.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, TranscriptError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TranscriptError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!(bytes = body.len(), "fetched transcript page");
        Ok(extract_text(&body))
    }
}
