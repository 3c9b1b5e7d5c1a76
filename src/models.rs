use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::Field;

/// One job application. Known columns are typed; anything else lands in `extra`.
///
/// Serialized keys are the normalized field names (`Job_Title`, `Design_Related`, ...)
/// so the stored blob is interchangeable with the browser and API storage paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "Company", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "Job_Title", default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(rename = "Year", default, deserialize_with = "lenient_year")]
    pub year: Option<i64>, // null when unknown

    #[serde(rename = "Email_Questions", default, skip_serializing_if = "Option::is_none")]
    pub email_questions: Option<bool>,
    #[serde(rename = "One_Sided_Interview", default, skip_serializing_if = "Option::is_none")]
    pub one_sided_interview: Option<bool>,
    #[serde(rename = "Behaviourial_Interview", default, skip_serializing_if = "Option::is_none")]
    pub behaviourial_interview: Option<bool>,
    #[serde(rename = "Portfolio_Walkthrough", default, skip_serializing_if = "Option::is_none")]
    pub portfolio_walkthrough: Option<bool>,
    #[serde(rename = "Take_home_Challenge", default, skip_serializing_if = "Option::is_none")]
    pub take_home_challenge: Option<bool>,
    #[serde(rename = "Recruiter_Call", default, skip_serializing_if = "Option::is_none")]
    pub recruiter_call: Option<bool>,
    #[serde(rename = "Design_Related", default, skip_serializing_if = "Option::is_none")]
    pub design_related: Option<bool>,
    #[serde(rename = "Referred", default, skip_serializing_if = "Option::is_none")]
    pub referred: Option<bool>,

    #[serde(rename = "Applied_On", default, skip_serializing_if = "Option::is_none")]
    pub applied_on: Option<String>, // "LinkedIn", "company site", etc.
    #[serde(rename = "Connection_to_Company", default, skip_serializing_if = "Option::is_none")]
    pub connection_to_company: Option<String>,
    #[serde(rename = "Tailored_App", default, skip_serializing_if = "Option::is_none")]
    pub tailored_app: Option<bool>,
    #[serde(rename = "Private_Posting", default, skip_serializing_if = "Option::is_none")]
    pub private_posting: Option<bool>,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>, // free text, e.g. "Rejected", "No Answer/Ongoing"

    /// Columns outside the known schema, kept verbatim. Never holds `id` or a field name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The full ordered collection held by the store.
pub type RecordSet = Vec<Application>;

pub const ID_KEY: &str = "id";

/// Stored years may be numbers, numeric strings, or `""` from the browser form.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let year = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(year)
}

impl Application {
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Company => self.company.as_deref(),
            Field::JobTitle => self.job_title.as_deref(),
            Field::AppliedOn => self.applied_on.as_deref(),
            Field::ConnectionToCompany => self.connection_to_company.as_deref(),
            Field::Status => self.status.as_deref(),
            _ => None,
        }
    }

    /// Flag value, treating an absent flag as `false`.
    pub fn flag(&self, field: Field) -> bool {
        let value = match field {
            Field::EmailQuestions => self.email_questions,
            Field::OneSidedInterview => self.one_sided_interview,
            Field::BehaviourialInterview => self.behaviourial_interview,
            Field::PortfolioWalkthrough => self.portfolio_walkthrough,
            Field::TakeHomeChallenge => self.take_home_challenge,
            Field::RecruiterCall => self.recruiter_call,
            Field::DesignRelated => self.design_related,
            Field::Referred => self.referred,
            Field::TailoredApp => self.tailored_app,
            Field::PrivatePosting => self.private_posting,
            _ => None,
        };
        value.unwrap_or(false)
    }

    pub fn set_text(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Company => &mut self.company,
            Field::JobTitle => &mut self.job_title,
            Field::AppliedOn => &mut self.applied_on,
            Field::ConnectionToCompany => &mut self.connection_to_company,
            Field::Status => &mut self.status,
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn set_flag(&mut self, field: Field, value: bool) {
        let slot = match field {
            Field::EmailQuestions => &mut self.email_questions,
            Field::OneSidedInterview => &mut self.one_sided_interview,
            Field::BehaviourialInterview => &mut self.behaviourial_interview,
            Field::PortfolioWalkthrough => &mut self.portfolio_walkthrough,
            Field::TakeHomeChallenge => &mut self.take_home_challenge,
            Field::RecruiterCall => &mut self.recruiter_call,
            Field::DesignRelated => &mut self.design_related,
            Field::Referred => &mut self.referred,
            Field::TailoredApp => &mut self.tailored_app,
            Field::PrivatePosting => &mut self.private_posting,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Keep an unknown column. Names the struct serializes itself are ignored.
    pub fn set_extra(&mut self, name: &str, value: String) {
        if is_reserved_key(name) {
            return;
        }
        self.extra.insert(name.to_string(), Value::String(value));
    }

    /// True when the record carries a usable (non-empty) identifier.
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Keys written by the typed fields of [`Application`].
pub fn is_reserved_key(name: &str) -> bool {
    name == ID_KEY || Field::from_name(name).is_some()
}
