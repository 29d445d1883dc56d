// Contacts service: search and status filtering for the contacts table.

use serde::{Deserialize, Serialize};

use crate::error::CrmError;
use crate::labels::{status_badge, BadgeVariant};
use crate::types::{Contact, ContactStatus};

/// Status filter from the table header. `All` disables filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ContactStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            return Ok(StatusFilter::All);
        }
        s.parse::<ContactStatus>()
            .map(StatusFilter::Only)
            .map_err(CrmError::Validation)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    #[serde(default)]
    pub search: String,
    /// "All" or a status label; missing means "All".
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRow {
    #[serde(flatten)]
    pub contact: Contact,
    pub badge: BadgeVariant,
}

/// Case-insensitive substring match on name, email and company.
/// An empty term matches everything.
pub fn matches_search(contact: &Contact, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    [&contact.name, &contact.email, &contact.company]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn filter_contacts(contacts: Vec<Contact>, term: &str, status: StatusFilter) -> Vec<Contact> {
    contacts
        .into_iter()
        .filter(|c| matches_search(c, term))
        .filter(|c| match status {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => c.status == wanted,
        })
        .collect()
}

/// Apply a query from the frontend. An unknown status label is rejected.
pub fn apply_query(contacts: Vec<Contact>, query: &ContactQuery) -> Result<Vec<Contact>, CrmError> {
    let status = match query.status.as_deref() {
        Some(label) => label.parse::<StatusFilter>()?,
        None => StatusFilter::All,
    };
    Ok(filter_contacts(contacts, query.search.trim(), status))
}

pub fn to_rows(contacts: Vec<Contact>) -> Vec<ContactRow> {
    contacts
        .into_iter()
        .map(|contact| ContactRow {
            badge: status_badge(contact.status),
            contact,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contact(id: u64, name: &str, email: &str, company: &str, status: ContactStatus) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            company: company.to_string(),
            email: email.to_string(),
            status,
            assigned_rep: String::new(),
            last_activity: Utc::now(),
            created_at: None,
        }
    }

    fn sample() -> Vec<Contact> {
        vec![
            contact(1, "Maria Lopez", "maria@brightpath.io", "BrightPath", ContactStatus::Qualified),
            contact(2, "Tom Reyes", "tom@orbit.dev", "Orbit Labs", ContactStatus::New),
            contact(3, "Ana Brightwell", "ana@kestrel.co", "Kestrel", ContactStatus::New),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let ids: Vec<u64> = filter_contacts(sample(), "BRIGHT", StatusFilter::All)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let ids: Vec<u64> = filter_contacts(sample(), "orbit.dev", StatusFilter::All)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_status_filter_combines_with_search() {
        let found = filter_contacts(sample(), "bright", StatusFilter::Only(ContactStatus::New));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let found = apply_query(sample(), &ContactQuery::default()).expect("query");
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_unknown_status_label_is_rejected() {
        let query = ContactQuery {
            search: String::new(),
            status: Some("Hot".to_string()),
        };
        assert!(matches!(
            apply_query(sample(), &query),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn test_rows_carry_status_badge() {
        let rows = to_rows(sample());
        assert_eq!(rows[0].badge, BadgeVariant::Success);
        assert_eq!(rows[1].badge, BadgeVariant::Info);
    }
}
