/// How a CSV cell is coerced for a known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Year,
    Flag,
}

/// The fixed set of application fields, in template column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Company,
    JobTitle,
    Year,
    EmailQuestions,
    OneSidedInterview,
    BehaviourialInterview,
    PortfolioWalkthrough,
    TakeHomeChallenge,
    RecruiterCall,
    DesignRelated,
    Referred,
    AppliedOn,
    ConnectionToCompany,
    TailoredApp,
    PrivatePosting,
    Status,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Company,
        Field::JobTitle,
        Field::Year,
        Field::EmailQuestions,
        Field::OneSidedInterview,
        Field::BehaviourialInterview,
        Field::PortfolioWalkthrough,
        Field::TakeHomeChallenge,
        Field::RecruiterCall,
        Field::DesignRelated,
        Field::Referred,
        Field::AppliedOn,
        Field::ConnectionToCompany,
        Field::TailoredApp,
        Field::PrivatePosting,
        Field::Status,
    ];

    /// Column header as it appears in the CSV template.
    pub fn header(self) -> &'static str {
        match self {
            Field::Company => "Company",
            Field::JobTitle => "Job Title",
            Field::Year => "Year",
            Field::EmailQuestions => "Email Questions",
            Field::OneSidedInterview => "One-Sided Interview",
            Field::BehaviourialInterview => "Behaviourial Interview",
            Field::PortfolioWalkthrough => "Portfolio Walkthrough",
            Field::TakeHomeChallenge => "Take-home Challenge",
            Field::RecruiterCall => "Recruiter Call",
            Field::DesignRelated => "Design Related",
            Field::Referred => "Referred",
            Field::AppliedOn => "Applied On",
            Field::ConnectionToCompany => "Connection to Company",
            Field::TailoredApp => "Tailored App",
            Field::PrivatePosting => "Private Posting",
            Field::Status => "Status",
        }
    }

    /// Normalized field name. Must stay identical to the API/storage keys.
    pub fn name(self) -> &'static str {
        match self {
            Field::Company => "Company",
            Field::JobTitle => "Job_Title",
            Field::Year => "Year",
            Field::EmailQuestions => "Email_Questions",
            Field::OneSidedInterview => "One_Sided_Interview",
            Field::BehaviourialInterview => "Behaviourial_Interview",
            Field::PortfolioWalkthrough => "Portfolio_Walkthrough",
            Field::TakeHomeChallenge => "Take_home_Challenge",
            Field::RecruiterCall => "Recruiter_Call",
            Field::DesignRelated => "Design_Related",
            Field::Referred => "Referred",
            Field::AppliedOn => "Applied_On",
            Field::ConnectionToCompany => "Connection_to_Company",
            Field::TailoredApp => "Tailored_App",
            Field::PrivatePosting => "Private_Posting",
            Field::Status => "Status",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Year => FieldKind::Year,
            Field::Company
            | Field::JobTitle
            | Field::AppliedOn
            | Field::ConnectionToCompany
            | Field::Status => FieldKind::Text,
            _ => FieldKind::Flag,
        }
    }

    /// Look up a field by its display header (exact match, as in the template).
    pub fn from_header(header: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.header() == header)
    }

    /// Look up a field by its normalized (storage) name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Header row of the CSV template, in authoritative order.
pub fn template_header() -> String {
    Field::ALL
        .iter()
        .map(|f| f.header())
        .collect::<Vec<_>>()
        .join(",")
}

/// CSV template: the header row plus one example application.
pub fn template_csv() -> String {
    let example = Field::ALL
        .iter()
        .map(|f| match f {
            Field::Company => "Example Studio",
            Field::JobTitle => "Product Designer",
            Field::Year => "1",
            Field::DesignRelated => "TRUE",
            Field::AppliedOn => "LinkedIn",
            Field::ConnectionToCompany => "None",
            Field::Status => "No Answer/Ongoing",
            _ => "FALSE",
        })
        .collect::<Vec<_>>()
        .join(",");

    format!("{}\n{}\n", template_header(), example)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_header_order() {
        assert_eq!(
            template_header(),
            "Company,Job Title,Year,Email Questions,One-Sided Interview,Behaviourial Interview,\
             Portfolio Walkthrough,Take-home Challenge,Recruiter Call,Design Related,Referred,\
             Applied On,Connection to Company,Tailored App,Private Posting,Status"
        );
    }

    #[test]
    fn test_from_header_maps_display_names() {
        assert_eq!(Field::from_header("Job Title"), Some(Field::JobTitle));
        assert_eq!(Field::from_header("Take-home Challenge"), Some(Field::TakeHomeChallenge));
        assert_eq!(Field::from_header("Take_home_Challenge"), None);
        assert_eq!(Field::from_header("job title"), None);
        assert_eq!(Field::from_header("Salary"), None);
    }

    #[test]
    fn test_from_name_maps_storage_keys() {
        assert_eq!(Field::from_name("Job_Title"), Some(Field::JobTitle));
        assert_eq!(Field::from_name("Take_home_Challenge"), Some(Field::TakeHomeChallenge));
        assert_eq!(Field::from_name("Job Title"), None);
        assert_eq!(Field::from_name("id"), None);
    }

    #[test]
    fn test_field_kinds() {
        let flags = Field::ALL.iter().filter(|f| f.kind() == FieldKind::Flag).count();
        let texts = Field::ALL.iter().filter(|f| f.kind() == FieldKind::Text).count();
        assert_eq!(flags, 10);
        assert_eq!(texts, 5);
        assert_eq!(Field::Year.kind(), FieldKind::Year);
    }

    #[test]
    fn test_field_names_use_api_spelling() {
        assert_eq!(Field::BehaviourialInterview.name(), "Behaviourial_Interview");
        assert_eq!(Field::ConnectionToCompany.name(), "Connection_to_Company");
        assert_eq!(Field::OneSidedInterview.name(), "One_Sided_Interview");
    }
}
