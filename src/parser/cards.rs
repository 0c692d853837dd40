use scraper::{ElementRef, Selector};

use crate::error::ExtractError;

pub const DEFAULT_CARD_SELECTOR: &str = "div.content-card-text";
pub const DEFAULT_TITLE_SELECTOR: &str = "p";
pub const DEFAULT_LINK_SELECTOR: &str = "a";

/// CSS selectors describing one card and where its fields live inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSelectors {
    pub card: String,
    pub title: String,
    pub link: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card: DEFAULT_CARD_SELECTOR.to_string(),
            title: DEFAULT_TITLE_SELECTOR.to_string(),
            link: DEFAULT_LINK_SELECTOR.to_string(),
        }
    }
}

impl CardSelectors {
    pub(crate) fn compile(&self) -> Result<CompiledSelectors, ExtractError> {
        Ok(CompiledSelectors {
            card: compile_one("card", &self.card)?,
            title: compile_one("title", &self.title)?,
            link: compile_one("link", &self.link)?,
        })
    }
}

pub(crate) struct CompiledSelectors {
    pub card: Selector,
    pub title: Selector,
    pub link: Selector,
}

fn compile_one(role: &'static str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        role,
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// First descendant matching `title`, text concatenated and trimmed.
pub(crate) fn card_title(card: ElementRef<'_>, title: &Selector) -> String {
    card.select(title)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// `href` of the first descendant matching `link`.
pub(crate) fn card_link(card: ElementRef<'_>, link: &Selector) -> Option<String> {
    card.select(link)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        assert!(CardSelectors::default().compile().is_ok());
    }

    #[test]
    fn bad_selector_names_its_role() {
        let selectors = CardSelectors {
            title: "p[".to_string(),
            ..CardSelectors::default()
        };
        match selectors.compile() {
            Err(ExtractError::Selector { role, selector, .. }) => {
                assert_eq!(role, "title");
                assert_eq!(selector, "p[");
            }
            _ => panic!("expected selector error"),
        }
    }
}
