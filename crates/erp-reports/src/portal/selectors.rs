//! Locators for the ERP's current UI.
//!
//! CSS selectors are used for elements with stable ids; everything else is
//! XPath because the portal identifies buttons mostly by class and label.

use crate::target::ReportFamily;

pub const USERNAME_INPUT: &str = "#usuario";
pub const PASSWORD_INPUT: &str = "#senha";
pub const LOGIN_BUTTON: &str = "#continuar";

pub const COMPANY_MODAL: &str = "#ui-id-2";
pub const COMPANY_CONFIRM: &str = "//a[contains(@onclick, 'selecionarEmpresa')]";

pub const REMOVE_LINK: &str =
    "//a[contains(@class, 'upper') and contains(@class, '_mlxs') and text()='Remover']";
pub const REMOVE_CONFIRM: &str = "//button[contains(@class, 'btn orange') and text()='REMOVER']";

pub const SALESPERSON_RADIO: &str = "#vendedor";
pub const REPORT_TYPE_SELECT: &str = "//select[@id][@name='tipoRelatorio']";
pub const PERIOD_SELECT: &str =
    "//select[contains(@class, 'browser-default') and contains(@class, '_bglightGray')]";

pub const GENERATE_BUTTON: &str =
    "//a[contains(@class, '_c-btn--primary') and contains(text(), 'Gerar Relatório')]";
pub const ACKNOWLEDGE_BUTTON: &str =
    "//button[contains(@class, 'btn blue') and contains(text(), 'ENTENDI')]";
pub const REFRESH_ICON: &str = "//i[contains(@class, 'material-icons') and text()='refresh']";

/// Quotes a string as an XPath literal.
///
/// XPath 1.0 has no escape sequences, so a value containing both quote kinds
/// is assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

pub fn company_option(company: &str) -> String {
    format!(
        "//div[@id='ui-id-2' and contains(text(), {})]",
        xpath_literal(company)
    )
}

pub fn dated_row(date: &str) -> String {
    format!("//p[contains(text(), {})]", xpath_literal(date))
}

pub fn dated_download_link(date: &str) -> String {
    format!(
        "{}/following::a[contains(@href, 'blob.core.windows.net/relatorios')][1]",
        dated_row(date)
    )
}

/// Generator page URL for a family, e.g. `…/gerar/?tipo=venda`.
pub fn generator_url(reports_url: &str, family: ReportFamily) -> String {
    let separator = if reports_url.contains('?') { '&' } else { '?' };
    format!("{}{}tipo={}", reports_url, separator, family.query_value())
}
