//! profile.rs
//!
//! Field extraction from a resident page, and the JSON profile record built
//! from it.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::age::{self, AgeBreakdown, CalendarDate};

const RESIDENT_SINCE_LABEL: &str = "Resident Since:";
const UNKNOWN: &str = "Unknown";

/// Raw fields as found on the page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResidentPage {
    pub display_name: String,
    pub username: String,
    pub description: String,
    pub profile_image: String,
    pub resident_since: Option<ResidentSince>,
    pub links: Option<ProfileLinks>,
}

/// The "Resident Since:" line: the birth date token and the site's own
/// relative-age text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentSince {
    pub date: String,
    pub age_text: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLinks {
    pub web_profile: Option<String>,
    pub client_profile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub username: String,
    pub description: String,
    pub profile_image: String,
    pub uuid: String,
    pub birth_info: String,
    pub age_info: String,
    pub age_details: Option<AgeDetails>,
    pub links: Option<ProfileLinks>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeDetails {
    pub exact: AgeBreakdown,
    pub birth_date: String,
    pub current_date: String,
    pub original_text: String,
}

/// Single selector pass over the document. Missing elements leave the
/// corresponding field at its default.
pub fn extract(html: &str) -> ResidentPage {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut page = ResidentPage::default();

    if let Some(meta) = select_first(root, r#"meta[property="og:image"]"#) {
        if let Some(content) = meta.value().attr("content") {
            page.profile_image = content.to_string();
        }
    }

    if let Some(name) = select_first(root, ".details h1.resident span") {
        page.display_name = element_text(name);
        page.username = parenthesized(&page.display_name).unwrap_or_default().to_string();
    }

    if let Some(desc) = select_first(root, ".details p.desc") {
        page.description = element_text(desc);
    }

    if let Some(info) = select_first(root, ".details p.info") {
        page.resident_since = resident_since(info);
    }

    if let Some(details) = select_first(root, ".details #details") {
        let href = |css: &str| {
            select_first(details, css)
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        };
        page.links = Some(ProfileLinks {
            web_profile: href("a.web_link"),
            client_profile: href("a.client_link"),
        });
    }

    page
}

impl Profile {
    /// Builds the JSON record. An unusable birth date leaves `age_details`
    /// empty instead of failing the whole profile.
    pub fn from_page(page: ResidentPage, uuid: &str, reference: CalendarDate) -> Self {
        let mut birth_info = UNKNOWN.to_string();
        let mut age_info = UNKNOWN.to_string();
        let mut age_details = None;

        if let Some(since) = page.resident_since {
            age_info = since.age_text;

            match since.date.parse::<CalendarDate>() {
                Ok(birth) => {
                    birth_info = birth.to_dmy();
                    match age::compute_age_with_days(birth, reference) {
                        Ok(exact) => {
                            let original_text = format!("{} ({})", birth_info, exact.formatted);
                            age_details = Some(AgeDetails {
                                exact,
                                birth_date: birth_info.clone(),
                                current_date: reference.to_dmy(),
                                original_text,
                            });
                        }
                        Err(e) => tracing::warn!(%uuid, error = %e, "age unknown"),
                    }
                }
                Err(e) => {
                    tracing::warn!(%uuid, error = %e, "resident date not usable");
                    birth_info = since.date;
                }
            }
        }

        Self {
            display_name: page.display_name,
            username: page.username,
            description: page.description,
            profile_image: page.profile_image,
            uuid: uuid.to_string(),
            birth_info,
            age_info,
            age_details,
            links: page.links,
        }
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// `Foo Resident (foo.resident)` -> `foo.resident`
fn parenthesized(s: &str) -> Option<&str> {
    let open = s.find('(')?;
    let close = s[open + 1..].find(')')? + open + 1;
    let inner = &s[open + 1..close];
    (!inner.is_empty()).then_some(inner)
}

fn resident_since(info: ElementRef<'_>) -> Option<ResidentSince> {
    let label = select_first(info, "span.syscat")?;
    if element_text(label) != RESIDENT_SINCE_LABEL {
        return None;
    }

    // Only the paragraph's own text nodes; the label lives in the span
    let own_text: String = info
        .children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    let own_text = own_text.trim();

    let start = find_iso_date(own_text)?;
    let date = own_text[start..start + 10].to_string();

    let rest = format!("{}{}", &own_text[..start], &own_text[start + 10..]);
    let rest = rest.trim();
    let rest = rest.strip_prefix('(').unwrap_or(rest);
    let rest = rest
        .strip_suffix(')')
        .or_else(|| rest.strip_suffix("ago"))
        .unwrap_or(rest);

    Some(ResidentSince {
        date,
        age_text: rest.trim().to_string(),
    })
}

/// Byte offset of the first `dddd-dd-dd` token.
fn find_iso_date(s: &str) -> Option<usize> {
    const SHAPE: &[u8; 10] = b"0000-00-00";
    let bytes = s.as_bytes();
    bytes.windows(SHAPE.len()).position(|w| {
        w.iter().zip(SHAPE).all(|(b, shape)| match shape {
            b'-' => *b == b'-',
            _ => b.is_ascii_digit(),
        })
    })
}
