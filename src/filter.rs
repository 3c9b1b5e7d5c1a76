use std::cmp::Ordering;

use crate::models::Application;
use crate::schema::Field;

/// Interview-process steps that can be required by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessTag {
    Email,
    OneSided,
    Behavioural,
    Portfolio,
    Recruiter,
    TakeHome,
    Private,
}

impl ProcessTag {
    /// Lenient match on a user-typed term. Unknown terms yield `None`.
    pub fn parse(term: &str) -> Option<Self> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        if term.contains("email") {
            Some(ProcessTag::Email)
        } else if term.contains("one-sided") || term.contains("one sided") {
            Some(ProcessTag::OneSided)
        } else if term.contains("behaviour") || term.contains("behavior") {
            Some(ProcessTag::Behavioural)
        } else if term.contains("portfolio") {
            Some(ProcessTag::Portfolio)
        } else if term.contains("recruiter") {
            Some(ProcessTag::Recruiter)
        } else if term.contains("design") || term.contains("take-home") || term.contains("take home") {
            Some(ProcessTag::TakeHome)
        } else if term.contains("private") {
            Some(ProcessTag::Private)
        } else {
            None
        }
    }

    /// Comma-separated list of terms; unknown terms are dropped.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',').filter_map(ProcessTag::parse).collect()
    }

    pub fn field(self) -> Field {
        match self {
            ProcessTag::Email => Field::EmailQuestions,
            ProcessTag::OneSided => Field::OneSidedInterview,
            ProcessTag::Behavioural => Field::BehaviourialInterview,
            ProcessTag::Portfolio => Field::PortfolioWalkthrough,
            ProcessTag::Recruiter => Field::RecruiterCall,
            ProcessTag::TakeHome => Field::TakeHomeChallenge,
            ProcessTag::Private => Field::PrivatePosting,
        }
    }
}

/// Criteria for the application list. Every set criterion must hold.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub connection: Option<String>,
    pub status: Option<String>,
    pub year: Option<i64>,
    pub design: bool,
    pub referred: bool,
    pub tailored: bool,
    pub process: Vec<ProcessTag>,
}

impl ApplicationFilter {
    pub fn is_active(&self) -> bool {
        given(&self.job_title).is_some()
            || given(&self.company).is_some()
            || given(&self.connection).is_some()
            || given(&self.status).is_some()
            || self.year.is_some()
            || self.design
            || self.referred
            || self.tailored
            || !self.process.is_empty()
    }

    pub fn matches(&self, app: &Application) -> bool {
        if !contains_ci(app.text(Field::JobTitle), given(&self.job_title))
            || !contains_ci(app.text(Field::Company), given(&self.company))
            || !contains_ci(app.text(Field::ConnectionToCompany), given(&self.connection))
        {
            return false;
        }

        if let Some(status) = given(&self.status) {
            let same = app
                .text(Field::Status)
                .is_some_and(|s| s.to_lowercase() == status.to_lowercase());
            if !same {
                return false;
            }
        }

        if self.year.is_some() && app.year != self.year {
            return false;
        }

        if (self.design && !app.flag(Field::DesignRelated))
            || (self.referred && !app.flag(Field::Referred))
            || (self.tailored && !app.flag(Field::TailoredApp))
        {
            return false;
        }

        self.process.iter().all(|tag| app.flag(tag.field()))
    }
}

/// A text criterion counts only when it is non-empty.
fn given(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|s| !s.is_empty())
}

/// Substring match ignoring case. A missing needle always matches; a missing haystack never does.
fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())),
    }
}

/// Display order: Year ascending (unknown year last), then id ascending.
pub fn sort_for_display(records: &mut [Application]) {
    records.sort_by(display_order);
}

fn display_order(a: &Application, b: &Application) -> Ordering {
    let year_order = match (a.year, b.year) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    year_order.then_with(|| {
        a.id.as_deref()
            .unwrap_or("")
            .cmp(b.id.as_deref().unwrap_or(""))
    })
}

/// Coarse outcome of an application, read from the free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Accepted,
    Offered,
    Rejected,
    Pending,
    Other,
}

impl StatusKind {
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return StatusKind::Other;
        };
        let status = status.to_lowercase();
        if status.contains("accepted") {
            StatusKind::Accepted
        } else if status.contains("offered") {
            StatusKind::Offered
        } else if status.contains("rejected") {
            StatusKind::Rejected
        } else if status.contains("no answer") || status.contains("ongoing") {
            StatusKind::Pending
        } else {
            StatusKind::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Accepted => "accepted",
            StatusKind::Offered => "offered",
            StatusKind::Rejected => "rejected",
            StatusKind::Pending => "pending",
            StatusKind::Other => "-",
        }
    }
}
