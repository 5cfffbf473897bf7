use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::{Config, TemplateEngine};

/// The five artifacts a run keeps fresh, in the order they are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Stock,
    SummaryCurrentYear,
    DetailCurrentMonth,
    DetailPreviousMonth,
    SummaryPreviousYear,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Stock,
        ReportKind::SummaryCurrentYear,
        ReportKind::DetailCurrentMonth,
        ReportKind::DetailPreviousMonth,
        ReportKind::SummaryPreviousYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Stock => "stock",
            ReportKind::SummaryCurrentYear => "summary_current_year",
            ReportKind::DetailCurrentMonth => "detail_current_month",
            ReportKind::DetailPreviousMonth => "detail_previous_month",
            ReportKind::SummaryPreviousYear => "summary_previous_year",
        }
    }

    pub fn family(&self) -> ReportFamily {
        match self {
            ReportKind::Stock => ReportFamily::Stock,
            _ => ReportFamily::Sales,
        }
    }

    pub fn cadence(&self) -> Cadence {
        match self {
            ReportKind::DetailPreviousMonth => Cadence::Monthly,
            ReportKind::SummaryPreviousYear => Cadence::Yearly,
            _ => Cadence::Daily,
        }
    }

    /// Generator form settings the kind needs before "Generate" is clicked.
    pub fn controls(&self) -> ReportControls {
        match self {
            ReportKind::Stock => ReportControls::default(),
            ReportKind::SummaryCurrentYear => ReportControls {
                by_salesperson: true,
                ..ReportControls::default()
            },
            ReportKind::DetailCurrentMonth => ReportControls {
                report_type: Some(ReportType::Detail),
                period: Some(Period::ThisMonth),
                ..ReportControls::default()
            },
            ReportKind::DetailPreviousMonth => ReportControls {
                report_type: Some(ReportType::Detail),
                period: Some(Period::LastMonth),
                ..ReportControls::default()
            },
            ReportKind::SummaryPreviousYear => ReportControls {
                by_salesperson: true,
                period: Some(Period::LastYear),
                ..ReportControls::default()
            },
        }
    }

    /// Upper bound on queued reports removed before generating this kind.
    pub fn cleanup_limit(&self) -> u32 {
        match self {
            ReportKind::DetailCurrentMonth | ReportKind::DetailPreviousMonth => 2,
            _ => 5,
        }
    }

    /// Whether the generator page can be reused when the session is already on it.
    pub fn reuses_open_generator(&self) -> bool {
        matches!(self, ReportKind::DetailCurrentMonth)
    }

    /// The date whose year, month and day name this kind's file.
    pub fn period_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            ReportKind::DetailPreviousMonth => first_of_previous_month(today),
            ReportKind::SummaryPreviousYear => {
                NaiveDate::from_ymd_opt(today.year() - 1, 1, 1).unwrap_or(today)
            }
            _ => today,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn first_of_previous_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Which generator page a report comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFamily {
    Stock,
    Sales,
}

impl ReportFamily {
    /// Query string value selecting the family on the generator page.
    pub fn query_value(&self) -> &'static str {
        match self {
            ReportFamily::Stock => "estoque",
            ReportFamily::Sales => "venda",
        }
    }

    /// Stock reports open in their own tab; sales reports reuse the active one.
    pub fn opens_new_tab(&self) -> bool {
        matches!(self, ReportFamily::Stock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Monthly,
    Yearly,
}

impl Cadence {
    /// Suffix used in the "already generated" summary line.
    pub fn window_label(&self) -> &'static str {
        match self {
            Cadence::Daily => "today",
            Cadence::Monthly => "this month",
            Cadence::Yearly => "this year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Detail,
}

impl ReportType {
    pub fn option_value(&self) -> &'static str {
        match self {
            ReportType::Detail => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    ThisMonth,
    LastMonth,
    LastYear,
}

impl Period {
    pub fn option_value(&self) -> &'static str {
        match self {
            Period::ThisMonth => "este_mes",
            Period::LastMonth => "mes_passado",
            Period::LastYear => "ano_passado",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportControls {
    pub by_salesperson: bool,
    pub report_type: Option<ReportType>,
    pub period: Option<Period>,
}

/// A report kind resolved against configuration and a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTarget {
    pub kind: ReportKind,
    pub directory: PathBuf,
    pub filename: String,
    pub cadence: Cadence,
    pub period: NaiveDate,
}

impl ReportTarget {
    pub fn resolve(
        kind: ReportKind,
        config: &Config,
        engine: &TemplateEngine,
        today: NaiveDate,
    ) -> Self {
        let (directory, template) = match kind {
            ReportKind::Stock => (&config.destinations.inventory, &config.templates.stock),
            ReportKind::SummaryCurrentYear | ReportKind::SummaryPreviousYear => (
                &config.destinations.sales_summary,
                &config.templates.sales_summary,
            ),
            ReportKind::DetailCurrentMonth | ReportKind::DetailPreviousMonth => (
                &config.destinations.sales_detail,
                &config.templates.sales_detail,
            ),
        };
        let period = kind.period_date(today);

        Self {
            kind,
            directory: directory.clone(),
            filename: engine.render(template, period),
            cadence: kind.cadence(),
            period,
        }
    }

    /// All five targets in generation order.
    pub fn resolve_all(config: &Config, today: NaiveDate) -> Vec<ReportTarget> {
        let engine = TemplateEngine::new(&config.author);
        ReportKind::ALL
            .iter()
            .map(|kind| ReportTarget::resolve(*kind, config, &engine, today))
            .collect()
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
