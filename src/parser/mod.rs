pub mod cards;

use scraper::Html;
use serde::Serialize;
use tracing::debug;

use crate::error::ExtractError;
use cards::{card_link, card_title, CompiledSelectors};

pub use cards::CardSelectors;

/// A title/link pair pulled out of one card, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub link: Option<String>,
}

/// A parsed document plus the selectors used to walk it.
pub struct Page {
    document: Html,
    selectors: CompiledSelectors,
}

/// Parse `markup` into a [`Page`]. Only an empty body or an invalid selector fails;
/// the HTML parser recovers from malformed markup.
pub fn parse(markup: &str, selectors: &CardSelectors) -> Result<Page, ExtractError> {
    if markup.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    let selectors = selectors.compile()?;
    let document = Html::parse_document(markup);
    if !document.errors.is_empty() {
        debug!("Recovered from {} markup errors", document.errors.len());
    }
    Ok(Page {
        document,
        selectors,
    })
}

impl Page {
    /// Candidates in document order. Each call starts a fresh pass over the document.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.document
            .select(&self.selectors.card)
            .map(move |card| Candidate {
                title: card_title(card, &self.selectors.title),
                link: card_link(card, &self.selectors.link),
            })
    }
}

/// Parse and collect in one step.
pub fn extract(markup: &str, selectors: &CardSelectors) -> Result<Vec<Candidate>, ExtractError> {
    Ok(parse(markup, selectors)?.candidates().collect())
}

// ── Tests ──
