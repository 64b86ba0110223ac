//! Student records and the partial shapes used to write them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Descriptive fields of a student. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub student_id: Option<String>,
    pub education: Option<String>,
    pub major: Option<String>,
    pub degree_start: Option<String>,
    pub degree_end: Option<String>,
    pub gender: Option<String>,
}

impl Profile {
    /// Shallow merge: fields present in `patch` overwrite, absent fields stay.
    pub fn merge(&mut self, patch: &Profile) {
        merge_field(&mut self.first_name, &patch.first_name);
        merge_field(&mut self.last_name, &patch.last_name);
        merge_field(&mut self.email, &patch.email);
        merge_field(&mut self.student_id, &patch.student_id);
        merge_field(&mut self.education, &patch.education);
        merge_field(&mut self.major, &patch.major);
        merge_field(&mut self.degree_start, &patch.degree_start);
        merge_field(&mut self.degree_end, &patch.degree_end);
        merge_field(&mut self.gender, &patch.gender);
    }
}

fn merge_field(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

/// The persisted entity.
///
/// `id` and `revision` are managed by the store; callers never supply them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: Uuid,
    pub revision: i64,
    pub identifier: String,
    pub credential: Option<String>,
    pub profile: Profile,
}

/// A record about to be inserted for the first time.
#[derive(Clone, Debug)]
pub struct NewStudent {
    pub identifier: String,
    pub credential: Option<String>,
    pub profile: Profile,
}

/// Set-if-present write: `None` means "leave unchanged".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub credential: Option<String>,
    pub profile: Profile,
}

impl StudentPatch {
    #[must_use]
    pub fn credential(credential: String) -> Self {
        Self {
            credential: Some(credential),
            profile: Profile::default(),
        }
    }

    #[must_use]
    pub fn profile(profile: Profile) -> Self {
        Self {
            credential: None,
            profile,
        }
    }
}

impl StudentRecord {
    /// Apply a patch in place and bump the revision.
    pub fn apply(&mut self, patch: &StudentPatch) {
        if let Some(credential) = &patch.credential {
            self.credential = Some(credential.clone());
        }
        self.profile.merge(&patch.profile);
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            revision: 1,
            identifier: "ada@students.example.edu".to_string(),
            credential: None,
            profile: Profile {
                first_name: Some("Ada".to_string()),
                ..Profile::default()
            },
        }
    }

    #[test]
    fn merge_leaves_absent_fields_untouched() {
        let mut profile = Profile {
            first_name: Some("Ada".to_string()),
            major: Some("Math".to_string()),
            ..Profile::default()
        };
        profile.merge(&Profile {
            major: Some("CS".to_string()),
            ..Profile::default()
        });

        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.major.as_deref(), Some("CS"));
        assert_eq!(profile.gender, None);
    }

    #[test]
    fn apply_bumps_revision_and_keeps_credential_when_absent() {
        let mut record = record();
        record.credential = Some("$2b$04$existing".to_string());
        record.apply(&StudentPatch::profile(Profile {
            gender: Some("female".to_string()),
            ..Profile::default()
        }));

        assert_eq!(record.revision, 2);
        assert_eq!(record.credential.as_deref(), Some("$2b$04$existing"));
        assert_eq!(record.profile.gender.as_deref(), Some("female"));
        assert_eq!(record.profile.first_name.as_deref(), Some("Ada"));
    }
}
