use chrono::{DateTime, Duration, DurationRound, Utc};

use super::Record;
use crate::entity::EntityKind;
use crate::error::CrmError;
use crate::types::{Contact, ContactPatch, Deal, DealPatch, NewContact, NewDeal};

/// Timestamp for a deal entering a new stage.
///
/// Never earlier than, nor equal to, the previous stamp: if the clock has
/// not advanced past it the stamp is bumped by one millisecond. Stamps are
/// kept at millisecond precision, the precision the database stores.
pub fn next_stage_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now);
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

fn validate_value(value: f64) -> Result<(), CrmError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CrmError::Validation(format!(
            "Deal value must be a non-negative amount, got {}",
            value
        )));
    }
    Ok(())
}

fn validate_probability(probability: u8) -> Result<(), CrmError> {
    if probability > 100 {
        return Err(CrmError::Validation(format!(
            "Probability must be between 0 and 100, got {}",
            probability
        )));
    }
    Ok(())
}

impl Record for Contact {
    type Draft = NewContact;
    type Patch = ContactPatch;

    const KIND: EntityKind = EntityKind::Contact;

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: NewContact, now: DateTime<Utc>) -> Result<Self, CrmError> {
        Ok(Contact {
            id,
            name: draft.name,
            company: draft.company,
            email: draft.email,
            status: draft.status,
            assigned_rep: draft.assigned_rep,
            last_activity: now,
            created_at: Some(now),
        })
    }

    fn apply_patch(&mut self, patch: ContactPatch, _now: DateTime<Utc>) -> Result<(), CrmError> {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(rep) = patch.assigned_rep {
            self.assigned_rep = rep;
        }
        if let Some(at) = patch.last_activity {
            self.last_activity = at;
        }
        Ok(())
    }
}

impl Record for Deal {
    type Draft = NewDeal;
    type Patch = DealPatch;

    const KIND: EntityKind = EntityKind::Deal;

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: NewDeal, now: DateTime<Utc>) -> Result<Self, CrmError> {
        validate_value(draft.value)?;
        validate_probability(draft.probability)?;
        Ok(Deal {
            id,
            contact_id: draft.contact_id,
            value: draft.value,
            stage: draft.stage,
            stage_entered_at: now,
            expected_close_date: draft.expected_close_date,
            probability: draft.probability,
            assigned_rep: draft.assigned_rep,
            notes: draft.notes,
        })
    }

    fn apply_patch(&mut self, patch: DealPatch, now: DateTime<Utc>) -> Result<(), CrmError> {
        // Validate everything up front so a rejected patch leaves no trace.
        if let Some(value) = patch.value {
            validate_value(value)?;
        }
        if let Some(probability) = patch.probability {
            validate_probability(probability)?;
        }

        if let Some(stage) = patch.stage {
            if stage != self.stage {
                self.stage = stage;
                self.stage_entered_at = next_stage_stamp(self.stage_entered_at, now);
            }
        }
        if let Some(contact_id) = patch.contact_id {
            self.contact_id = contact_id;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(date) = patch.expected_close_date {
            self.expected_close_date = date;
        }
        if let Some(probability) = patch.probability {
            self.probability = probability;
        }
        if let Some(rep) = patch.assigned_rep {
            self.assigned_rep = rep;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}
