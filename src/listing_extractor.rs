//! Pulls typed fields out of one listing's rendered HTML.
//!
//! Each field has an ordered list of locators; the first one whose text parses
//! wins. Locator kinds are tried in the order they are listed, which is always
//! fragment attribute, then dedicated CSS selector, then labelled text pattern,
//! then unit-only text pattern.
//!
//! Text patterns run over the fragment's joined text. Any locator that produces
//! a value claims the text it came from, whether a pattern match or the text of
//! a selected element, and later patterns can't see it. Lot size is evaluated
//! before square footage, so "Lot 8,712 sq ft" is never read as living area.

use std::ops::Range;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, NavigationFailure, Result};
use crate::field_parsers::{Field, assign};
use crate::listing::ListingFields;
use crate::text_manipulators::extract_text;

/// One listing as handed over by the navigator.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFragment {
    /// Outer HTML of the listing card.
    pub html: String,
    /// Search-results page the card was found on, starting at 1.
    pub page: usize,
    /// MLS number read off the card markup, if any.
    pub listing_id: Option<String>,
    pub detail: DetailPage,
}

impl ListingFragment {
    pub fn card(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            page: 1,
            listing_id: None,
            detail: DetailPage::NotRequested,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailPage {
    NotRequested,
    Loaded(String),
    Failed(NavigationFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing usable in the fragment, e.g. an ad tile picked up as a listing.
    MalformedFragment,
    /// Nothing usable on the card and its detail page couldn't be loaded.
    NavigationError,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MalformedFragment => "malformed-fragment",
            SkipReason::NavigationError => "navigation-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(ListingFields),
    Skipped(SkipReason),
}

enum Locator {
    RootAttr(&'static str),
    Css(&'static str),
    /// Non-empty texts of several selectors joined with ", ".
    CssJoined(&'static [&'static str]),
    Pattern(&'static str),
}

struct Rule {
    field: Field,
    locators: &'static [Locator],
}

const LOT_LABELLED: &str =
    r"(?i)\blot(?:\s*size)?[^0-9]{0,20}(\d[\d.,]*\s*(?:acres?\b|ac\b|sq\.?\s*ft\b|sqft\b))";
const LOT_ACRES: &str = r"(?i)(\d[\d.,]*\s*(?:acres?|ac)\b)";
const YEAR_LABELLED: &str = r"(?i)year\s*built[^0-9]{0,20}(\d{4})";
const GARAGE_LABELLED: &str = r"(?i)garage[^0-9]{0,20}(\d+)";
const GARAGE_CARS: &str = r"(?i)(\d+)\s*car\s+garage";

/// Search-results card. Listed in evaluation order.
const CARD_RULES: &[Rule] = &[
    Rule {
        field: Field::MlsNumber,
        locators: &[
            Locator::RootAttr("listno"),
            Locator::RootAttr("data-listno"),
            Locator::Pattern(r"(?i)\bMLS\s*#?\s*:?\s*(\d{5,})"),
        ],
    },
    Rule {
        field: Field::Price,
        locators: &[
            Locator::Css(".property___price"),
            Locator::Css("[class*='price']"),
            Locator::Pattern(r"\$\s?\d[\d,]*(?:\.\d{2})?"),
        ],
    },
    Rule {
        field: Field::Address,
        locators: &[
            Locator::Css(".property___address"),
            Locator::Css("address"),
            Locator::Css("[class*='address']"),
        ],
    },
    Rule {
        field: Field::LotSize,
        locators: &[
            Locator::Css(".property___lot"),
            Locator::Pattern(LOT_LABELLED),
            Locator::Pattern(LOT_ACRES),
        ],
    },
    Rule {
        field: Field::SquareFootage,
        locators: &[
            Locator::Css(".property___sqft"),
            Locator::Pattern(r"(?i)(\d[\d,]*)\s*(?:sq\.?\s*ft|sqft|square\s+feet)\b"),
        ],
    },
    Rule {
        field: Field::Beds,
        locators: &[
            Locator::Css(".property___beds"),
            Locator::Pattern(r"(?i)(\d+)\s*(?:bd|beds?|bedrooms?)\b"),
        ],
    },
    Rule {
        field: Field::Baths,
        locators: &[
            Locator::Css(".property___baths"),
            Locator::Pattern(r"(?i)(\d+(?:\.\d+)?)\s*(?:ba|baths?|bathrooms?)\b"),
        ],
    },
    Rule {
        field: Field::YearBuilt,
        locators: &[
            Locator::Css(".property___year"),
            Locator::Pattern(YEAR_LABELLED),
        ],
    },
    Rule {
        field: Field::Garage,
        locators: &[
            Locator::Css(".property___garage"),
            Locator::Pattern(GARAGE_LABELLED),
            Locator::Pattern(GARAGE_CARS),
        ],
    },
    Rule {
        field: Field::ListingAgent,
        locators: &[Locator::Css(".agent-name"), Locator::Css("[class*='agent']")],
    },
];

/// A listing's own page.
const DETAIL_RULES: &[Rule] = &[
    Rule {
        field: Field::Address,
        locators: &[Locator::CssJoined(&[".prop___overview h2", "#location-data"])],
    },
    Rule {
        field: Field::Price,
        locators: &[Locator::Css(".prop-details-overview li span")],
    },
    Rule {
        field: Field::Beds,
        locators: &[Locator::Css(".prop-details-overview li:nth-of-type(2) span")],
    },
    Rule {
        field: Field::Baths,
        locators: &[Locator::Css(".prop-details-overview li:nth-of-type(3) span")],
    },
    Rule {
        field: Field::LotSize,
        locators: &[Locator::Pattern(LOT_LABELLED)],
    },
    Rule {
        field: Field::SquareFootage,
        locators: &[Locator::Css(".prop-details-overview li:nth-of-type(4) span")],
    },
    Rule {
        field: Field::YearBuilt,
        locators: &[Locator::Pattern(YEAR_LABELLED)],
    },
    Rule {
        field: Field::Garage,
        locators: &[
            Locator::Pattern(GARAGE_LABELLED),
            Locator::Pattern(GARAGE_CARS),
        ],
    },
    Rule {
        field: Field::ListingAgent,
        locators: &[Locator::Css(".agent-name"), Locator::Css("[class*='agent']")],
    },
];

enum CompiledLocator {
    RootAttr(&'static str),
    Css(Selector),
    CssJoined(Vec<Selector>),
    Pattern(Regex),
}

struct CompiledRule {
    field: Field,
    locators: Vec<CompiledLocator>,
}

pub struct ListingExtractor {
    card_rules: Vec<CompiledRule>,
    detail_rules: Vec<CompiledRule>,
}

impl ListingExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            card_rules: compile(CARD_RULES)?,
            detail_rules: compile(DETAIL_RULES)?,
        })
    }

    /// Never fails a listing for a missing field. Only a fragment with no
    /// extractable field at all is skipped.
    pub fn extract(&self, fragment: &ListingFragment) -> ExtractionOutcome {
        let mut fields = self.extract_card(&fragment.html);
        if let DetailPage::Loaded(html) = &fragment.detail {
            fields.fill_from(self.extract_detail(html));
        }

        if !fields.is_empty() {
            return ExtractionOutcome::Extracted(fields);
        }
        match fragment.detail {
            DetailPage::Failed(_) => ExtractionOutcome::Skipped(SkipReason::NavigationError),
            _ => ExtractionOutcome::Skipped(SkipReason::MalformedFragment),
        }
    }

    pub fn extract_card(&self, html: &str) -> ListingFields {
        let doc = Html::parse_fragment(html);
        // parse_fragment wraps everything in <html>; the card is its first element.
        let Some(root) = doc.root_element().children().find_map(ElementRef::wrap) else {
            return ListingFields::default();
        };
        apply_rules(&self.card_rules, root)
    }

    pub fn extract_detail(&self, html: &str) -> ListingFields {
        let doc = Html::parse_document(html);
        apply_rules(&self.detail_rules, doc.root_element())
    }
}

fn compile(rules: &[Rule]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| -> Result<CompiledRule> {
            let locators = rule
                .locators
                .iter()
                .map(|locator| -> Result<CompiledLocator> {
                    Ok(match locator {
                        Locator::RootAttr(name) => CompiledLocator::RootAttr(*name),
                        Locator::Css(sel) => CompiledLocator::Css(create_selector(sel)?),
                        Locator::CssJoined(sels) => CompiledLocator::CssJoined(
                            sels.iter()
                                .map(|s| create_selector(s))
                                .collect::<Result<Vec<_>>>()?,
                        ),
                        Locator::Pattern(re) => CompiledLocator::Pattern(
                            Regex::new(re).map_err(|e| Error::Selector(e.to_string()))?,
                        ),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(CompiledRule {
                field: rule.field,
                locators,
            })
        })
        .collect()
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::Selector(sel_str.into()))
}

fn apply_rules(rules: &[CompiledRule], root: ElementRef) -> ListingFields {
    let mut fields = ListingFields::default();
    let mut text = extract_text(root);

    for rule in rules {
        let parse = rule.field.parser();
        for locator in &rule.locators {
            let Some(found) = locate(locator, root, &text) else {
                continue;
            };
            if assign(&mut fields, rule.field, parse(&found.raw)) {
                for span in found.spans {
                    claim(&mut text, span);
                }
                break;
            }
        }
    }
    fields
}

/// Raw text a locator found, plus the stretches of the fragment's joined
/// text it came from.
struct Located {
    raw: String,
    spans: Vec<Range<usize>>,
}

fn locate(locator: &CompiledLocator, root: ElementRef, text: &str) -> Option<Located> {
    match locator {
        CompiledLocator::RootAttr(name) => root.value().attr(name).map(|raw| Located {
            raw: raw.to_string(),
            spans: Vec::new(),
        }),
        CompiledLocator::Css(sel) => {
            let raw = root.select(sel).next().map(extract_text)?;
            let spans = span_of(text, &raw).into_iter().collect();
            Some(Located { raw, spans })
        }
        CompiledLocator::CssJoined(sels) => {
            let parts: Vec<_> = sels
                .iter()
                .filter_map(|sel| root.select(sel).next().map(extract_text))
                .filter(|t| !t.is_empty())
                .collect();
            if parts.is_empty() {
                return None;
            }
            let spans = parts.iter().filter_map(|p| span_of(text, p)).collect();
            Some(Located {
                raw: parts.join(", "),
                spans,
            })
        }
        CompiledLocator::Pattern(re) => {
            let (raw, span) = find_capture(re, text)?;
            Some(Located {
                raw,
                spans: vec![span],
            })
        }
    }
}

/// Where an element's text sits in the fragment's joined text: the first
/// unclaimed occurrence that doesn't start or end inside a word or a
/// separated number such as `3,100`.
fn span_of(text: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let bounded = |c: Option<char>| !c.is_some_and(|c| c.is_alphanumeric() || c == ',' || c == '.');
    text.match_indices(needle)
        .map(|(start, _)| start..start + needle.len())
        .find(|span| {
            let before = text[..span.start].chars().next_back();
            let after = text[span.end..].chars().next();
            bounded(before) && bounded(after)
        })
}

/// First capture group if the pattern has one, otherwise the whole match.
/// The span is always that of the whole match.
fn find_capture(re: &Regex, text: &str) -> Option<(String, Range<usize>)> {
    let caps = re.captures(text)?;
    let whole = caps.get(0)?;
    let value = caps.get(1).unwrap_or(whole);
    Some((value.as_str().to_string(), whole.range()))
}

fn claim(text: &mut String, span: Range<usize>) {
    let blank = " ".repeat(span.len());
    text.replace_range(span, &blank);
}
