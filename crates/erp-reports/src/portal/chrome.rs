use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Browser::{
    SetDownloadBehavior, SetDownloadBehaviorBehaviorOption,
};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::config::{Config, PortalTimings};
use crate::error::PortalError;
use crate::portal::selectors;
use crate::portal::{PortalLauncher, ReportPortal};
use crate::sanitize;
use crate::target::{Period, ReportFamily, ReportType};

/// Chrome exits on its own after this long without CDP traffic.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Settle time after the generate click before the dialog check starts.
const AFTER_GENERATE: Duration = Duration::from_secs(2);

/// Checks a radio input and fires `change` so the page's listeners notice.
const CHECK_RADIO_JS: &str = r#"function() {
    if (!this.checked) {
        this.click();
        var evt = document.createEvent('HTMLEvents');
        evt.initEvent('change', true, true);
        this.dispatchEvent(evt);
    }
}"#;

/// Assigns a `<select>` value, marks the matching option and fires `change`.
const SET_SELECT_JS: &str = r#"function(value) {
    this.value = value;
    for (var i = 0; i < this.options.length; i++) {
        this.options[i].selected = this.options[i].value === value;
    }
    var evt = document.createEvent('HTMLEvents');
    evt.initEvent('change', true, true);
    this.dispatchEvent(evt);
}"#;

const JS_CLICK: &str = "function() { this.click(); }";

const IS_VISIBLE_JS: &str = r#"function() {
    var style = window.getComputedStyle(this);
    var rect = this.getBoundingClientRect();
    return style.visibility !== 'hidden' && style.display !== 'none'
        && rect.width > 0 && rect.height > 0;
}"#;

/// Launch parameters for Chrome sessions, captured from [`Config`].
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    login_url: String,
    reports_url: String,
    headless: bool,
    chrome_path: Option<PathBuf>,
    download_directory: PathBuf,
    timings: PortalTimings,
}

impl ChromeLauncher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.portal.login_url.clone(),
            reports_url: config.portal.reports_url.clone(),
            headless: config.browser.headless,
            chrome_path: config.browser.chrome_path.clone(),
            download_directory: config.download_directory.clone(),
            timings: config.browser.timings.clone(),
        }
    }
}

impl PortalLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn ReportPortal>, PortalError> {
        Ok(Box::new(ChromePortal::launch(self)?))
    }
}

/// [`ReportPortal`] backed by a Chrome process driven over CDP.
pub struct ChromePortal {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    login_url: String,
    reports_url: String,
    download_directory: PathBuf,
    timings: PortalTimings,
}

impl ChromePortal {
    pub fn launch(launcher: &ChromeLauncher) -> Result<Self, PortalError> {
        let options = LaunchOptions::default_builder()
            .headless(launcher.headless)
            .path(launcher.chrome_path.clone())
            .window_size(Some((1366, 900)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| {
                PortalError::Browser(format!("Failed to build Chrome launch options: {}", e))
            })?;

        let browser = Browser::new(options)
            .map_err(|e| PortalError::Browser(format!("Failed to launch Chrome: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| PortalError::Browser(format!("Failed to create tab: {}", e)))?;

        info!(
            "Launched Chrome (headless: {}, downloads: {})",
            launcher.headless,
            sanitize::redact_path(&launcher.download_directory)
        );

        let portal = Self {
            browser: Some(browser),
            tab: Some(tab),
            login_url: launcher.login_url.clone(),
            reports_url: launcher.reports_url.clone(),
            download_directory: launcher.download_directory.clone(),
            timings: launcher.timings.clone(),
        };
        portal.allow_downloads()?;
        Ok(portal)
    }

    fn tab(&self) -> Result<Arc<Tab>, PortalError> {
        self.tab
            .clone()
            .ok_or_else(|| PortalError::Browser("browser session already closed".to_string()))
    }

    /// Points downloads at the configured folder for every tab of the browser.
    fn allow_downloads(&self) -> Result<(), PortalError> {
        let tab = self.tab()?;
        tab.call_method(SetDownloadBehavior {
            behavior: SetDownloadBehaviorBehaviorOption::Allow,
            browser_context_id: None,
            download_path: Some(self.download_directory.to_string_lossy().into_owned()),
            events_enabled: None,
        })
        .map_err(|e| PortalError::Browser(format!("Failed to configure downloads: {}", e)))?;
        Ok(())
    }

    fn navigate(&self, tab: &Tab, url: &str) -> Result<(), PortalError> {
        debug!("Navigating to {}", sanitize::redact_url(url));
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| PortalError::Navigation {
                url: sanitize::redact_url(url),
                reason: e.to_string(),
            })?;
        std::thread::sleep(self.timings.page_load);
        Ok(())
    }

    fn settle(&self) {
        std::thread::sleep(self.timings.settle);
    }
}

fn wait_css<'a>(
    tab: &'a Tab,
    what: &'static str,
    selector: &str,
    timeout: Duration,
) -> Result<Element<'a>, PortalError> {
    tab.wait_for_element_with_custom_timeout(selector, timeout)
        .map_err(|e| PortalError::ElementNotFound {
            what,
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}

fn wait_xpath<'a>(
    tab: &'a Tab,
    what: &'static str,
    selector: &str,
    timeout: Duration,
) -> Result<Element<'a>, PortalError> {
    tab.wait_for_xpath_with_custom_timeout(selector, timeout)
        .map_err(|e| PortalError::ElementNotFound {
            what,
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}

fn find_xpath<'a>(
    tab: &'a Tab,
    what: &'static str,
    selector: &str,
) -> Result<Element<'a>, PortalError> {
    tab.find_element_by_xpath(selector)
        .map_err(|e| PortalError::ElementNotFound {
            what,
            selector: selector.to_string(),
            reason: e.to_string(),
        })
}

fn click(element: &Element<'_>, what: &'static str) -> Result<(), PortalError> {
    element.click().map_err(|e| PortalError::Script {
        what,
        reason: e.to_string(),
    })?;
    Ok(())
}

fn scroll_into_view(element: &Element<'_>, what: &'static str) -> Result<(), PortalError> {
    element.scroll_into_view().map_err(|e| PortalError::Script {
        what,
        reason: e.to_string(),
    })?;
    Ok(())
}

fn call_js(
    element: &Element<'_>,
    what: &'static str,
    function: &str,
    args: Vec<serde_json::Value>,
) -> Result<Option<serde_json::Value>, PortalError> {
    element
        .call_js_fn(function, args, false)
        .map(|remote| remote.value)
        .map_err(|e| PortalError::Script {
            what,
            reason: e.to_string(),
        })
}

fn is_visible(element: &Element<'_>, what: &'static str) -> Result<bool, PortalError> {
    let value = call_js(element, what, IS_VISIBLE_JS, vec![])?;
    Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
}

impl ReportPortal for ChromePortal {
    fn open_login(&mut self) -> Result<(), PortalError> {
        let tab = self.tab()?;
        self.navigate(&tab, &self.login_url)
    }

    fn enter_username(&mut self, username: &str) -> Result<(), PortalError> {
        let tab = self.tab()?;
        let input = wait_css(
            &tab,
            "username field",
            selectors::USERNAME_INPUT,
            self.timings.element_wait,
        )?;
        click(&input, "username field")?;
        input
            .type_into(username)
            .map_err(|e| PortalError::Script {
                what: "username field",
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn enter_password(&mut self, password: &SecretString) -> Result<(), PortalError> {
        const WHAT: &str = "password field";
        let tab = self.tab()?;
        let started = Instant::now();
        let input = wait_css(
            &tab,
            WHAT,
            selectors::PASSWORD_INPUT,
            self.timings.password_wait,
        )?;

        // The field is rendered hidden until the username step animates away
        while !is_visible(&input, WHAT)? {
            if started.elapsed() >= self.timings.password_wait {
                return Err(PortalError::NotVisible { what: WHAT });
            }
            std::thread::sleep(Duration::from_millis(250));
        }

        click(&input, WHAT)?;
        input
            .type_into(password.expose_secret())
            .map_err(|e| PortalError::Script {
                what: WHAT,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn submit_login(&mut self) -> Result<(), PortalError> {
        let tab = self.tab()?;
        let button = wait_css(
            &tab,
            "login button",
            selectors::LOGIN_BUTTON,
            self.timings.element_wait,
        )?;
        click(&button, "login button")?;
        std::thread::sleep(self.timings.page_load);
        Ok(())
    }

    fn select_company(&mut self, company: &str) -> Result<(), PortalError> {
        let tab = self.tab()?;
        wait_css(
            &tab,
            "company modal",
            selectors::COMPANY_MODAL,
            self.timings.company_wait,
        )?;
        let option = wait_xpath(
            &tab,
            "company option",
            &selectors::company_option(company),
            self.timings.company_wait,
        )?;
        scroll_into_view(&option, "company option")?;
        click(&option, "company option")?;
        self.settle();
        Ok(())
    }

    fn confirm_company(&mut self) -> Result<(), PortalError> {
        let tab = self.tab()?;
        let confirm = wait_xpath(
            &tab,
            "company confirmation",
            selectors::COMPANY_CONFIRM,
            self.timings.company_wait,
        )?;
        click(&confirm, "company confirmation")?;
        std::thread::sleep(self.timings.page_load);
        Ok(())
    }

    fn open_generator(&mut self, family: ReportFamily) -> Result<(), PortalError> {
        let url = selectors::generator_url(&self.reports_url, family);

        if family.opens_new_tab() {
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| PortalError::Browser("browser session already closed".to_string()))?;
            let tab = browser
                .new_tab()
                .map_err(|e| PortalError::Browser(format!("Failed to open tab: {}", e)))?;
            tab.activate()
                .map_err(|e| PortalError::Browser(format!("Failed to focus tab: {}", e)))?;
            self.navigate(&tab, &url)?;
            self.tab = Some(tab);
        } else {
            let tab = self.tab()?;
            self.navigate(&tab, &url)?;
        }
        Ok(())
    }

    fn remove_oldest_queued(&mut self) -> Result<bool, PortalError> {
        let tab = self.tab()?;
        let Ok(remove) = wait_xpath(
            &tab,
            "remove link",
            selectors::REMOVE_LINK,
            self.timings.cleanup_wait,
        ) else {
            return Ok(false);
        };
        click(&remove, "remove link")?;
        self.settle();

        let confirm = wait_xpath(
            &tab,
            "remove confirmation",
            selectors::REMOVE_CONFIRM,
            self.timings.cleanup_wait,
        )?;
        click(&confirm, "remove confirmation")?;
        self.settle();
        Ok(true)
    }

    fn select_by_salesperson(&mut self) -> Result<(), PortalError> {
        const WHAT: &str = "salesperson radio";
        let tab = self.tab()?;
        let radio = wait_css(
            &tab,
            WHAT,
            selectors::SALESPERSON_RADIO,
            self.timings.element_wait,
        )?;
        scroll_into_view(&radio, WHAT)?;
        call_js(&radio, WHAT, CHECK_RADIO_JS, vec![])?;
        self.settle();
        Ok(())
    }

    fn select_report_type(&mut self, report_type: ReportType) -> Result<(), PortalError> {
        const WHAT: &str = "report type select";
        let tab = self.tab()?;
        let select = wait_xpath(
            &tab,
            WHAT,
            selectors::REPORT_TYPE_SELECT,
            self.timings.element_wait,
        )?;
        call_js(
            &select,
            WHAT,
            SET_SELECT_JS,
            vec![serde_json::Value::from(report_type.option_value())],
        )?;
        self.settle();
        Ok(())
    }

    fn select_period(&mut self, period: Period) -> Result<(), PortalError> {
        const WHAT: &str = "period select";
        let tab = self.tab()?;
        let select = wait_xpath(
            &tab,
            WHAT,
            selectors::PERIOD_SELECT,
            self.timings.element_wait,
        )?;
        call_js(
            &select,
            WHAT,
            SET_SELECT_JS,
            vec![serde_json::Value::from(period.option_value())],
        )?;
        self.settle();
        Ok(())
    }

    fn trigger_generation(&mut self) -> Result<(), PortalError> {
        const WHAT: &str = "generate button";
        let tab = self.tab()?;
        let button = wait_xpath(
            &tab,
            WHAT,
            selectors::GENERATE_BUTTON,
            self.timings.generate_wait,
        )?;
        scroll_into_view(&button, WHAT)?;
        self.settle();
        // clicked from script: the button can sit under the sticky header
        call_js(&button, WHAT, JS_CLICK, vec![])?;
        std::thread::sleep(AFTER_GENERATE);
        Ok(())
    }

    fn dismiss_acknowledgement(&mut self) -> Result<bool, PortalError> {
        let tab = self.tab()?;
        let Ok(button) = wait_xpath(
            &tab,
            "acknowledgement button",
            selectors::ACKNOWLEDGE_BUTTON,
            self.timings.acknowledge_wait,
        ) else {
            return Ok(false);
        };
        click(&button, "acknowledgement button")?;
        self.settle();
        Ok(true)
    }

    fn has_dated_report(&mut self, date: &str) -> Result<bool, PortalError> {
        let tab = self.tab()?;
        match tab.find_element_by_xpath(&selectors::dated_row(date)) {
            Ok(row) => is_visible(&row, "report row"),
            Err(_) => Ok(false),
        }
    }

    fn refresh_listing(&mut self) -> Result<(), PortalError> {
        let tab = self.tab()?;
        let icon = find_xpath(&tab, "refresh icon", selectors::REFRESH_ICON)?;
        click(&icon, "refresh icon")
    }

    fn download_dated_report(&mut self, date: &str) -> Result<(), PortalError> {
        let tab = self.tab()?;
        let link = find_xpath(
            &tab,
            "download link",
            &selectors::dated_download_link(date),
        )?;
        scroll_into_view(&link, "download link")?;
        click(&link, "download link")?;
        Ok(())
    }

    fn close(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        self.tab = None;

        if let Ok(tabs) = browser.get_tabs().lock() {
            for tab in tabs.iter() {
                if let Err(e) = tab.close(false) {
                    warn!("Failed to close tab: {}", e);
                }
            }
        }
        // dropping the handle terminates the Chrome process
        drop(browser);
        info!("Browser closed");
    }
}

impl Drop for ChromePortal {
    fn drop(&mut self) {
        self.close();
    }
}
