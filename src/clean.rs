use chrono::{DateTime, Datelike, Utc};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::{FieldValue, value_text};
use crate::repair::TextRepair;

// --- Missing values ---

const MISSING_SENTINELS: [&str; 3] = ["missing value", "none", "null"];

/// Folds every flavour of "no value" into [`FieldValue::Missing`]. Text is
/// trimmed and otherwise left alone; integers pass through.
pub fn normalize_missing<T: Into<FieldValue>>(value: Option<T>) -> FieldValue {
    match value.map(Into::into) {
        None | Some(FieldValue::Missing) => FieldValue::Missing,
        Some(FieldValue::Text(text)) => {
            let trimmed = text.trim();
            let lower = trimmed.to_lowercase();
            if trimmed.is_empty() || MISSING_SENTINELS.contains(&lower.as_str()) {
                FieldValue::Missing
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        Some(other) => other,
    }
}

// --- Rewrite rules ---

/// One regex substitution. Lists of rules run in order; later rules see the
/// output of earlier ones.
pub struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("rewrite rule pattern must compile"),
            replacement,
        }
    }
}

pub fn apply_rules(text: &str, rules: &[Rule]) -> String {
    rules.iter().fold(text.to_string(), |acc, rule| {
        rule.pattern.replace_all(&acc, rule.replacement).into_owned()
    })
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// Named entities browsers accept without the closing semicolon.
static LEGACY_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"&(amp|AMP|lt|LT|gt|GT|quot|QUOT|nbsp|auml|ouml|uuml|Auml|Ouml|Uuml|szlig|eacute|Eacute|egrave|agrave|copy|reg)([A-Za-z0-9]*;)?",
    )
    .expect("valid regex")
});

static SLUG_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)$").expect("valid regex"));

pub static TITLE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"(?i)100%\s*REMOTE", "100% Remote"),
        Rule::new(r"(?i)homeoffice", "Home Office"),
    ]
});

/// Markup to plain text. Entity decoding happens before these run, so
/// escaped tags in the source are stripped as well.
pub static DESCRIPTION_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // stray bullet glyphs
        Rule::new(r"â€¢", "•"),
        Rule::new(r"·", "•"),
        // list items keep a visible bullet
        Rule::new(r"(?i)<li.*?>", "\n• "),
        Rule::new(r"(?i)</li>", ""),
        // block ends become line breaks
        Rule::new(r"(?i)</p>|</h\d>|</ul>|</ol>", "\n"),
        Rule::new(r"(?i)<br\s*/?>", "\n"),
        Rule::new(r"<.*?>", ""),
        // board footer, through end of text
        Rule::new(
            r"(?is)Find\s+(more\s+)?jobs?\s+in\s+Germany\s+on\s+Arbeitnow.*",
            "",
        ),
        // zero-width and bidi controls
        Rule::new(r"[\x{200B}-\x{200F}\x{202A}-\x{202E}]", ""),
        Rule::new(r"\n\s*\n+", "\n\n"),
        Rule::new(r"[ \t]+", " "),
    ]
});

fn legacy_entity(name: &str) -> &'static str {
    match name {
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "nbsp" => "\u{a0}",
        "auml" => "ä",
        "ouml" => "ö",
        "uuml" => "ü",
        "Auml" => "Ä",
        "Ouml" => "Ö",
        "Uuml" => "Ü",
        "szlig" => "ß",
        "eacute" => "é",
        "Eacute" => "É",
        "egrave" => "è",
        "agrave" => "à",
        "copy" => "©",
        "reg" => "®",
        _ => "",
    }
}

/// Decodes HTML entities, including the legacy names written without a
/// trailing semicolon (`&amp`, `&oumlchtest`). A name that runs on into a
/// complete `&name;` reference is left to the regular decoder.
pub fn decode_entities(text: &str) -> String {
    let legacy = LEGACY_ENTITY.replace_all(text, |caps: &Captures| match caps.get(2) {
        Some(_) => caps[0].to_string(),
        None => legacy_entity(&caps[1]).to_string(),
    });
    decode_html_entities(&legacy).into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// --- Field cleaners ---

/// Splits `backend-developer-berlin-12345` into the readable title and the
/// trailing numeric id.
pub fn clean_slug(value: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(value) = non_empty(value) else {
        return (None, None);
    };
    let value = value.trim();

    let job_id = SLUG_ID
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let without_id = SLUG_ID.replace(value, "");
    let slug_title = without_id.replace('-', " ");

    (Some(slug_title), job_id)
}

pub fn clean_company_name(repair: &dyn TextRepair, value: Option<&str>) -> Option<String> {
    let value = non_empty(value)?.trim();
    let value = repair.repair(value);
    Some(collapse_whitespace(&value))
}

pub fn clean_title(repair: &dyn TextRepair, value: Option<&str>) -> Option<String> {
    let value = non_empty(value)?.trim();
    let value = repair.repair(value);
    let value = decode_entities(&value);
    let value = collapse_whitespace(&value);
    let value = apply_rules(&value, &TITLE_RULES);
    Some(value.trim().to_string())
}

/// Job description HTML to readable text. Empty input gives an empty string.
pub fn clean_description(repair: &dyn TextRepair, value: Option<&str>) -> String {
    let Some(value) = non_empty(value) else {
        return String::new();
    };
    let text = repair.repair(value);
    let text = decode_entities(&text);
    let text = apply_rules(&text, &DESCRIPTION_RULES);
    text.trim().to_string()
}

/// Any truthy-looking value is 1, everything else 0.
pub fn clean_remote(value: Option<&Value>) -> u8 {
    let value = match value {
        None | Some(Value::Null) => return 0,
        Some(Value::Bool(b)) => return u8::from(*b),
        Some(v) => v,
    };

    let text = match value_text(Some(value)) {
        Some(text) => text.trim().to_lowercase(),
        None => value.to_string().to_lowercase(),
    };
    let text = if text == "fasle" { "false".to_string() } else { text };

    match text.as_str() {
        "true" | "1" | "yes" => 1,
        "false" | "0" | "no" => 0,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// "City, Region, Country" by position. Parts past the third are dropped.
pub fn clean_location(repair: &dyn TextRepair, value: Option<&str>) -> Location {
    let Some(value) = non_empty(value) else {
        return Location::default();
    };
    let value = repair.repair(value.trim());
    let value = collapse_whitespace(&value);

    let mut parts = value.split(',').map(|p| p.trim().to_string());
    Location {
        city: parts.next(),
        region: parts.next(),
        country: parts.next(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedAt {
    pub timestamp: Option<String>,
    pub date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Epoch seconds (UTC) to timestamp, date, year and month. Anything that
/// does not parse leaves all four empty.
pub fn clean_created_at(value: Option<&Value>) -> CreatedAt {
    let Some(dt) = value.and_then(parse_epoch).and_then(to_datetime) else {
        return CreatedAt::default();
    };

    CreatedAt {
        timestamp: Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        date: Some(dt.format("%Y-%m-%d").to_string()),
        year: Some(dt.year()),
        month: Some(dt.month()),
    }
}

fn parse_epoch(value: &Value) -> Option<i64> {
    let secs = match value {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if !f.is_finite() || f.abs() >= i64::MAX as f64 {
                    return None;
                }
                f.trunc() as i64
            }
        },
        _ => return None,
    };
    // a bare numeric zero reads as "not set"
    if secs == 0 && value.is_number() {
        return None;
    }
    Some(secs)
}

fn to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).filter(|dt| (1..=9999).contains(&dt.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::{MojibakeRepair, PassThrough};
    use serde_json::json;

    const FIX: MojibakeRepair = MojibakeRepair;

    #[test]
    fn test_normalize_missing_none() {
        assert_eq!(normalize_missing::<String>(None), FieldValue::Missing);
    }

    #[test]
    fn test_normalize_missing_blank_and_sentinels() {
        assert_eq!(normalize_missing(Some("   ")), FieldValue::Missing);
        assert_eq!(normalize_missing(Some("")), FieldValue::Missing);
        assert_eq!(normalize_missing(Some("NULL")), FieldValue::Missing);
        assert_eq!(normalize_missing(Some(" None ")), FieldValue::Missing);
        assert_eq!(normalize_missing(Some("Missing Value")), FieldValue::Missing);
    }

    #[test]
    fn test_normalize_missing_valid() {
        assert_eq!(normalize_missing(Some("Berlin")), FieldValue::from("Berlin"));
        assert_eq!(normalize_missing(Some("  a  b ")), FieldValue::from("a  b"));
        assert_eq!(normalize_missing(Some(2026_i64)), FieldValue::Integer(2026));
        assert_eq!(normalize_missing(Some("unknown")), FieldValue::from("unknown"));
    }

    #[test]
    fn test_normalize_missing_idempotent() {
        for input in ["", "  x ", "null", "Berlin", " none", "a\tb", "unknown"] {
            let once = normalize_missing(Some(input));
            let twice = normalize_missing(Some(once.clone()));
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn test_clean_slug_valid() {
        let (slug_title, job_id) = clean_slug(Some("backend-developer-berlin-12345"));
        assert_eq!(slug_title.as_deref(), Some("backend developer berlin"));
        assert_eq!(job_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_clean_slug_keeps_leading_zeros() {
        let (_, job_id) = clean_slug(Some("werkstudent-007"));
        assert_eq!(job_id.as_deref(), Some("007"));
    }

    #[test]
    fn test_clean_slug_without_id() {
        let (slug_title, job_id) = clean_slug(Some("  data-engineer-munich "));
        assert_eq!(slug_title.as_deref(), Some("data engineer munich"));
        assert_eq!(job_id, None);
    }

    #[test]
    fn test_clean_slug_none() {
        assert_eq!(clean_slug(None), (None, None));
        assert_eq!(clean_slug(Some("")), (None, None));
    }

    #[test]
    fn test_clean_company_encoding() {
        let result = clean_company_name(&FIX, Some("Rohrleitungsbau MÃ¼nster GmbH")).unwrap();
        assert!(result.contains("Münster"));
    }

    #[test]
    fn test_clean_company_whitespace() {
        let result = clean_company_name(&FIX, Some("  Acme \n  Software\tGmbH ")).unwrap();
        assert_eq!(result, "Acme Software GmbH");
        assert_eq!(clean_company_name(&FIX, None), None);
    }

    #[test]
    fn test_clean_title_encoding() {
        let result = clean_title(&FIX, Some("Java Entwickler fÃ¼r Backend")).unwrap();
        assert!(result.contains("für"));
    }

    #[test]
    fn test_clean_title_remote_standardization() {
        let result = clean_title(&FIX, Some("100% REMOTE Developer")).unwrap();
        assert_eq!(result, "100% Remote Developer");

        let result = clean_title(&FIX, Some("Dev (100%remote)")).unwrap();
        assert_eq!(result, "Dev (100% Remote)");
    }

    #[test]
    fn test_clean_title_entities_and_homeoffice() {
        let result = clean_title(&FIX, Some("Sales &amp; Marketing   -  HomeOffice")).unwrap();
        assert_eq!(result, "Sales & Marketing - Home Office");
    }

    #[test]
    fn test_clean_title_entities_without_semicolon() {
        let result = clean_title(&FIX, Some("Sales &amp Marketing")).unwrap();
        assert_eq!(result, "Sales & Marketing");

        let result = clean_title(&FIX, Some("Gr&ouml&szlige &lt 5")).unwrap();
        assert_eq!(result, "Größe < 5");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a&nbspb"), "a\u{a0}b");
        assert_eq!(decode_entities("&amp;amp;"), "&amp;");
        assert_eq!(decode_entities("&amp;ouml x"), "&ouml x");
        assert_eq!(decode_entities("&lt;b&gt; &amp&amp"), "<b> &&");
        assert_eq!(decode_entities("&ampx"), "&x");
    }

    #[test]
    fn test_clean_description_encoding() {
        let cleaned = clean_description(&FIX, Some("Du mÃ¶chtest Backend entwickeln"));
        assert!(cleaned.contains("möchtest"));
    }

    #[test]
    fn test_clean_description_html_removal() {
        let cleaned = clean_description(&FIX, Some("<p>Hello <strong>World</strong></p>"));
        assert!(cleaned.contains("Hello World"));
        assert!(!cleaned.contains('<'));
    }

    #[test]
    fn test_clean_description_lists_and_breaks() {
        let html = "<h2>Aufgaben</h2><ul><li class=\"x\">Code</li><li>Review</li></ul>Line<br/>Next";
        let cleaned = clean_description(&FIX, Some(html));
        assert_eq!(cleaned, "Aufgaben\n\n• Code\n• Review\nLine\nNext");
    }

    #[test]
    fn test_clean_description_bullets_and_controls() {
        let cleaned = clean_description(&PassThrough, Some("· eins\u{200b}\n\n\n\n· zwei  \t drei"));
        assert_eq!(cleaned, "• eins\n\n• zwei drei");

        let text = "\u{202a}Links\u{202c} \u{200f}rechts\u{202e}\u{200e} \u{202b}mitte\u{202d}";
        let cleaned = clean_description(&PassThrough, Some(text));
        assert_eq!(cleaned, "Links rechts mitte");
    }

    #[test]
    fn test_clean_description_footer_removed() {
        let text = "<p>Great job</p><p>Find more jobs in Germany on Arbeitnow: https://arbeitnow.com</p>";
        let cleaned = clean_description(&FIX, Some(text));
        assert_eq!(cleaned, "Great job");

        let cleaned = clean_description(&FIX, Some("Intro\nfind job in germany on arbeitnow\nmore"));
        assert_eq!(cleaned, "Intro");
    }

    #[test]
    fn test_clean_description_escaped_markup() {
        let cleaned = clean_description(&FIX, Some("&lt;b&gt;Bold&lt;/b&gt; &amp; more"));
        assert_eq!(cleaned, "Bold & more");

        let cleaned = clean_description(&FIX, Some("<p>Du m&oumlchtest &amp wir</p>"));
        assert_eq!(cleaned, "Du möchtest & wir");
    }

    #[test]
    fn test_clean_description_empty() {
        assert_eq!(clean_description(&FIX, None), "");
        assert_eq!(clean_description(&FIX, Some("")), "");
    }

    #[test]
    fn test_description_rules_order() {
        // entity decoding is done by the caller, the rules only see tags
        let text = apply_rules("<ul><li>a</li></ul>", &DESCRIPTION_RULES);
        assert_eq!(text.trim(), "• a");
    }

    #[test]
    fn test_clean_remote_true() {
        assert_eq!(clean_remote(Some(&json!("true"))), 1);
        assert_eq!(clean_remote(Some(&json!(true))), 1);
        assert_eq!(clean_remote(Some(&json!(" YES "))), 1);
        assert_eq!(clean_remote(Some(&json!(1))), 1);
    }

    #[test]
    fn test_clean_remote_false() {
        assert_eq!(clean_remote(Some(&json!("false"))), 0);
        assert_eq!(clean_remote(Some(&json!("FASLE"))), 0);
        assert_eq!(clean_remote(Some(&json!(false))), 0);
        assert_eq!(clean_remote(None), 0);
    }

    #[test]
    fn test_clean_remote_is_total() {
        let inputs = [
            json!(null),
            json!("maybe"),
            json!(1.0),
            json!(2),
            json!([true]),
            json!({"remote": true}),
            json!(""),
        ];
        for input in &inputs {
            let out = clean_remote(Some(input));
            assert!(out == 0 || out == 1, "input {}", input);
        }
        assert_eq!(clean_remote(Some(&json!(1.0))), 0);
    }

    #[test]
    fn test_clean_location_valid() {
        let loc = clean_location(&FIX, Some("Heidelberg, Baden-Württemberg, Germany"));
        assert_eq!(loc.city.as_deref(), Some("Heidelberg"));
        assert_eq!(loc.region.as_deref(), Some("Baden-Württemberg"));
        assert_eq!(loc.country.as_deref(), Some("Germany"));
    }

    #[test]
    fn test_clean_location_partial() {
        let loc = clean_location(&FIX, Some("  MÃ¼nchen  "));
        assert_eq!(loc.city.as_deref(), Some("München"));
        assert_eq!(loc.region, None);
        assert_eq!(loc.country, None);

        assert_eq!(clean_location(&FIX, None), Location::default());
    }

    #[test]
    fn test_clean_location_extra_parts() {
        let loc = clean_location(&FIX, Some("Berlin,Berlin,Germany,EU"));
        assert_eq!(loc.country.as_deref(), Some("Germany"));
    }

    #[test]
    fn test_clean_created_at_valid() {
        let created = clean_created_at(Some(&json!("1770827496")));
        assert!(created.timestamp.unwrap().starts_with("2026-02-11"));
        assert_eq!(created.date.as_deref(), Some("2026-02-11"));
        assert_eq!(created.year, Some(2026));
        assert_eq!(created.month, Some(2));
    }

    #[test]
    fn test_clean_created_at_numeric() {
        let created = clean_created_at(Some(&json!(1770827496)));
        assert_eq!(created.timestamp.as_deref(), Some("2026-02-11 16:31:36"));

        let created = clean_created_at(Some(&json!(1770827496.9)));
        assert_eq!(created.timestamp.as_deref(), Some("2026-02-11 16:31:36"));
    }

    #[test]
    fn test_clean_created_at_invalid() {
        assert_eq!(clean_created_at(None), CreatedAt::default());
        assert_eq!(clean_created_at(Some(&json!(""))), CreatedAt::default());
        assert_eq!(clean_created_at(Some(&json!("yesterday"))), CreatedAt::default());
        assert_eq!(clean_created_at(Some(&json!("12.5"))), CreatedAt::default());
        assert_eq!(clean_created_at(Some(&json!(0))), CreatedAt::default());
        assert_eq!(
            clean_created_at(Some(&json!("99999999999999"))),
            CreatedAt::default()
        );
    }
}
