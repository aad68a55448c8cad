//! WebDriver engine for the interactive populate path
//!
//! Implements [`InteractiveSession`] over fantoccini. Selectors target the
//! destination platform's watch page and its "Save to playlist" dialog;
//! they are the fragile part of this path and are kept together here, on
//! the engine side of the capability boundary.

use super::browser::{InteractiveSession, SessionError};
use crate::clients::VideoId;
use crate::cookies::{CookieEntry, SameSitePolicy};
use async_trait::async_trait;
use cookie::SameSite;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use std::path::Path;
use std::time::Duration;

const HOME_URL: &str = "https://www.youtube.com";
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

const SIGN_IN_LINK: &str = "a[aria-label='Sign in']";
const AVATAR_BUTTON: &str = "button#avatar-btn";
const SAVE_BUTTON: &str = "button[aria-label='Save to playlist']";
const DIALOG_CLOSE_BUTTON: &str = "tp-yt-paper-dialog yt-icon-button#close-button button";

/// Default bound for element readiness waits
pub const DEFAULT_ELEMENT_WAIT: Duration = Duration::from_secs(10);

/// Authenticated browser session over a WebDriver endpoint
pub struct WebDriverSession {
    client: Client,
    element_wait: Duration,
}

impl WebDriverSession {
    /// Connect to a WebDriver endpoint and prime the browser with the
    /// serialized cookie set.
    ///
    /// Cookies can only be installed for the current document's origin, so
    /// the browser first navigates to the destination home page.
    pub async fn connect(
        webdriver_url: &str,
        cookies: &[CookieEntry],
        element_wait: Duration,
    ) -> Result<Self, SessionError> {
        let client = ClientBuilder::native()
            .connect(webdriver_url)
            .await
            .map_err(|e| SessionError::Session(format!("webdriver connect: {}", e)))?;

        let session = Self {
            client,
            element_wait,
        };

        session.goto(HOME_URL).await?;

        for entry in cookies {
            if let Err(err) = session.client.add_cookie(to_webdriver_cookie(entry)).await {
                tracing::warn!(name = %entry.name, error = %err, "Cookie rejected by browser");
            }
        }

        tracing::info!(count = cookies.len(), "Browser session primed with cookies");

        Ok(session)
    }

    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| SessionError::Interaction(format!("navigate to {}: {}", url, e)))
    }

    /// Wait for an element to become present, bounded by the element wait.
    async fn wait_for(&self, locator: Locator<'_>, what: &str) -> Result<Element, SessionError> {
        self.client
            .wait()
            .at_most(self.element_wait)
            .for_element(locator)
            .await
            .map_err(|_| SessionError::Timeout(what.to_string()))
    }

    async fn click(&self, element: &Element, what: &str) -> Result<(), SessionError> {
        element
            .click()
            .await
            .map_err(|e| SessionError::Interaction(format!("{}: {}", what, e)))
    }
}

#[async_trait]
impl InteractiveSession for WebDriverSession {
    async fn verify_authenticated(&mut self) -> Result<(), SessionError> {
        self.goto(HOME_URL).await?;

        // a sign-in affordance on the landing page means the cookies did
        // not take
        if self.client.find(Locator::Css(SIGN_IN_LINK)).await.is_ok() {
            return Err(SessionError::NotAuthenticated(
                "sign-in prompt on landing page".to_string(),
            ));
        }

        self.wait_for(Locator::Css(AVATAR_BUTTON), "account avatar")
            .await?;

        tracing::info!("Browser session is authenticated");
        Ok(())
    }

    async fn open_item(&mut self, video: &VideoId) -> Result<(), SessionError> {
        self.goto(&format!("{}{}", WATCH_URL_PREFIX, video)).await?;
        self.wait_for(Locator::Css(SAVE_BUTTON), "save button").await?;
        Ok(())
    }

    async fn save_to_playlist(&mut self, playlist_name: &str) -> Result<(), SessionError> {
        let save = self.wait_for(Locator::Css(SAVE_BUTTON), "save button").await?;
        self.click(&save, "save button").await?;

        // exact-name match inside the save dialog
        let option_xpath = format!(
            "//tp-yt-paper-dialog//yt-formatted-string[@id='label' and normalize-space(.)={}]",
            xpath_literal(playlist_name)
        );
        let option = self
            .wait_for(
                Locator::XPath(&option_xpath),
                &format!("playlist option '{}'", playlist_name),
            )
            .await?;
        self.click(&option, "playlist option").await?;

        let close = self
            .wait_for(Locator::Css(DIALOG_CLOSE_BUTTON), "dialog close button")
            .await?;
        self.click(&close, "dialog close button").await?;

        Ok(())
    }

    async fn capture_snapshot(&mut self, path: &Path) -> Result<(), SessionError> {
        let png = self
            .client
            .screenshot()
            .await
            .map_err(|e| SessionError::Session(format!("screenshot: {}", e)))?;

        std::fs::write(path, png)
            .map_err(|e| SessionError::Session(format!("write {}: {}", path.display(), e)))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| SessionError::Session(format!("close: {}", e)))
    }
}

fn to_webdriver_cookie(entry: &CookieEntry) -> Cookie<'static> {
    let mut cookie = Cookie::new(entry.name.clone(), entry.value.clone());
    cookie.set_domain(entry.domain.clone());
    cookie.set_path(entry.path.clone());
    cookie.set_secure(entry.secure);
    cookie.set_http_only(entry.http_only);
    cookie.set_same_site(match entry.same_site {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    });
    if let Some(epoch) = entry.expires {
        if let Ok(expires) = time::OffsetDateTime::from_unix_timestamp(epoch) {
            cookie.set_expires(expires);
        }
    }
    cookie
}

/// Quote a string as an XPath literal, using concat() when it contains
/// single quotes.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}
