//! A [`Navigator`] over fetched HTML documents.
//!
//! Pages are kept as raw HTML in a history stack and parsed with `scraper`
//! whenever a locator is evaluated. Parsed documents never outlive the
//! synchronous call that built them, so the navigator stays `Send`.

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{NavError, NavResult};
use crate::navigator::{Element, Locator, Navigator, Readiness};
use crate::source::PageSource;

/// Tags whose click acts on the current page instead of navigating.
const IN_PAGE_CONTROLS: &[&str] = &["input", "button", "label", "summary"];

/// Attributes that hold link targets and are resolved to absolute URLs.
const LINK_ATTRIBUTES: &[&str] = &["href", "src", "action"];

#[derive(Debug)]
struct Page {
    url: Url,
    html: String,
}

/// Browsing session backed by a [`PageSource`].
#[derive(Debug)]
pub struct DomNavigator<S> {
    source: S,
    history: Vec<Page>,
}

impl<S: PageSource> DomNavigator<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of pages on the history stack, current page included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    fn current(&self) -> NavResult<&Page> {
        self.history.last().ok_or(NavError::NoPage)
    }

    async fn load(&self, url: Url) -> NavResult<Page> {
        match self.source.fetch(&url).await {
            Ok(html) => Ok(Page { url, html }),
            Err(source) => Err(NavError::Load {
                url: url.to_string(),
                source,
            }),
        }
    }

    fn select(&self, locator: &Locator, first_only: bool) -> NavResult<Vec<Element>> {
        let page = self.current()?;
        let selector = parse_selector(locator)?;
        let document = Html::parse_document(&page.html);

        let matches = document.select(&selector);
        let elements = if first_only {
            matches
                .take(1)
                .map(|el| snapshot(el, &page.url))
                .collect()
        } else {
            matches.map(|el| snapshot(el, &page.url)).collect()
        };
        Ok(elements)
    }
}

fn parse_selector(locator: &Locator) -> NavResult<Selector> {
    Selector::parse(locator.as_str()).map_err(|e| NavError::InvalidLocator {
        locator: locator.to_string(),
        message: format!("{e:?}"),
    })
}

fn parse_url(url: &str) -> NavResult<Url> {
    Url::parse(url).map_err(|e| NavError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn snapshot(el: ElementRef<'_>, base: &Url) -> Element {
    let value = el.value();
    let text = el.text().collect::<String>();

    let attributes: BTreeMap<String, String> = value
        .attrs()
        .map(|(name, raw)| {
            let resolved = if LINK_ATTRIBUTES.contains(&name) {
                base.join(raw).map_or_else(|_| raw.to_string(), String::from)
            } else {
                raw.to_string()
            };
            (name.to_string(), resolved)
        })
        .collect();

    Element::new(value.name(), text.trim(), attributes)
}

#[async_trait]
impl<S: PageSource> Navigator for DomNavigator<S> {
    async fn open(&mut self, url: &str) -> NavResult<()> {
        let url = parse_url(url)?;
        let page = self.load(url).await?;
        log::info!("Opened {}", page.url);
        self.history = vec![page];
        Ok(())
    }

    async fn close(&mut self) -> NavResult<()> {
        self.history.clear();
        Ok(())
    }

    fn find(&self, locator: &Locator) -> NavResult<Option<Element>> {
        Ok(self.select(locator, true)?.into_iter().next())
    }

    fn find_all(&self, locator: &Locator) -> NavResult<Vec<Element>> {
        self.select(locator, false)
    }

    async fn click(&mut self, element: &Element) -> NavResult<()> {
        if element.attribute("disabled").is_some() {
            return Err(NavError::ClickRejected {
                reason: format!("{element} is disabled"),
            });
        }

        if let Some(href) = element.href() {
            let url = parse_url(href)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(NavError::ClickRejected {
                    reason: format!("{element} does not lead to a page"),
                });
            }
            let page = self.load(url).await?;
            log::debug!("Navigated to {}", page.url);
            self.history.push(page);
            return Ok(());
        }

        if IN_PAGE_CONTROLS.contains(&element.tag()) {
            self.current()?;
            return Ok(());
        }

        Err(NavError::ClickRejected {
            reason: format!("{element} is not interactable"),
        })
    }

    /// Documents are complete once fetched, so this only checks that a page
    /// is open.
    async fn wait_ready(&mut self, _timeout: Duration) -> Readiness {
        if self.history.is_empty() {
            Readiness::TimedOut
        } else {
            Readiness::Ready
        }
    }

    async fn go_back(&mut self) -> NavResult<()> {
        if self.history.len() < 2 {
            return Err(NavError::NoHistory);
        }
        self.history.pop();
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.history.last().map(|page| page.url.to_string())
    }
}
