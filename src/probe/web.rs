use crate::error::ProbeError;
use crate::probe::{Credential, Probe, ProbeValue, Prober, Target};
use log::debug;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use std::sync::OnceLock;
use std::time::Duration;

static CELL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static TAG_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn cell_pattern() -> Option<&'static Regex> {
    CELL_PATTERN
        .get_or_init(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").ok())
        .as_ref()
}

/// Cell content with tags and non-breaking spaces turned into plain spaces
fn visible_text(cell: &str) -> String {
    match TAG_PATTERN
        .get_or_init(|| Regex::new(r"<[^>]*>").ok())
        .as_ref()
    {
        Some(tags) => tags.replace_all(cell, " ").replace("&nbsp;", " "),
        None => cell.replace("&nbsp;", " "),
    }
}

/// Reads a labelled value from a web-managed appliance's status page
///
/// Each fetch logs in with a form POST, requires the appliance to hand back
/// a session cookie, then fetches the page with that session and extracts
/// the first token of the table cell following the labelled cell.
pub struct WebProber {
    client: Client,
}

impl WebProber {
    /// Create a web prober with the given request timeout
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::HttpError` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }

    /// Extract the first token of the cell that follows the cell containing `label`
    ///
    /// Cells are compared by their visible text, so a label wrapped in inline
    /// markup (`<td><b>Forward RF Level</b></td>`) still matches.
    ///
    /// # Arguments
    ///
    /// * `page` - HTML of the status page
    /// * `label` - Text to look for in the label cell
    ///
    /// # Returns
    ///
    /// The first whitespace-separated token of the next cell, or `None` if no
    /// cell contains `label` or the label cell is the last one on the page.
    pub fn extract_field(page: &str, label: &str) -> Option<String> {
        let mut cells = cell_pattern()?
            .captures_iter(page)
            .filter_map(|captures| captures.get(1))
            .map(|cell| visible_text(cell.as_str()));

        cells.find(|text| text.contains(label))?;
        cells
            .next()?
            .split_whitespace()
            .next()
            .map(str::to_string)
    }

    fn login(&self, url: &str, username: &str, password: &str) -> Result<(), ProbeError> {
        debug!("Attempting login as {} @ {}", username, url);
        let response = self
            .client
            .post(url)
            .header(USER_AGENT, "Mozilla")
            .form(&[("username", username), ("password", password), ("type", "10")])
            .send()?
            .error_for_status()?;

        if response.cookies().next().is_none() {
            return Err(ProbeError::Unreachable(format!(
                "login to {} returned no session cookie",
                url
            )));
        }

        Ok(())
    }
}

impl Prober for WebProber {
    fn fetch(&self, target: &Target, probe: &Probe) -> Result<ProbeValue, ProbeError> {
        let (path, label) = match probe {
            Probe::PageField { path, label } => (path, label),
            other => {
                return Err(ProbeError::Unsupported(format!(
                    "web prober cannot handle {:?}",
                    other
                )))
            }
        };

        let (username, password) = match &target.credential {
            Credential::Login { username, password } => (username, password),
            _ => {
                return Err(ProbeError::Unsupported(format!(
                    "web target {} has no login credentials",
                    target
                )))
            }
        };

        let url = format!("http://{}:{}{}", target.host, target.port, path);
        self.login(&url, username, password)?;

        debug!("Fetching {} using the session cookie", url);
        let page = self
            .client
            .get(&url)
            .header(USER_AGENT, "Mozilla")
            .send()?
            .error_for_status()?
            .text()?;

        let value = Self::extract_field(&page, label).ok_or_else(|| {
            ProbeError::Malformed(format!("field '{}' not found on {}", label, url))
        })?;

        debug!("Found {}: {}", label, value);
        Ok(ProbeValue::Text(value))
    }
}
