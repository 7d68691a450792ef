use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// UserRole
///
/// The closed set of role tags a profile can carry. The tag is assigned at
/// registration (volunteer or organization) or by an admin, and drives the
/// route-access gate's area containment rules.
///
/// A profile that has not finished registration carries no tag at all; that
/// state is modelled as `Option<UserRole>::None` everywhere, and every
/// consumer is forced to handle it explicitly rather than coercing it to
/// "denied".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserRole {
    Volunteer,
    Organization,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Volunteer => "volunteer",
            UserRole::Organization => "organization",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ();

    /// Parses the lowercase tag stored in `profiles.role`. Anything else is
    /// rejected so an unknown database value degrades to the unset state
    /// instead of granting a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(UserRole::Volunteer),
            "organization" => Ok(UserRole::Organization),
            "admin" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

/// Profile
///
/// The user's canonical identity record stored in the `public.profiles`
/// table, mirroring the id issued by the external auth provider. The role
/// column is nullable: a row exists from the moment the provider account is
/// created, while the tag arrives when registration completes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Profile {
    // Primary key, equal to the external auth provider's user id.
    pub id: Uuid,
    pub email: String,
    // None until the user finishes registration.
    pub role: Option<UserRole>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /auth/register. Credentials are forwarded to the
/// external auth provider; only the mirrored profile (id, email, role) is
/// stored locally.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// UpdateProfileRequest
///
/// Partial update for the caller's own profile (PUT /me). Absent fields keep
/// their current values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
}

/// SetRoleRequest
///
/// Admin console payload for reassigning a user's role
/// (PUT /admin/users/{id}/role).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

// --- Volunteer Directory Schemas ---

/// VolunteerStatus
///
/// Lifecycle of a volunteer directory entry: new entries start `pending`,
/// admins activate them, and `inactive` keeps the record without listing the
/// volunteer as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum VolunteerStatus {
    Active,
    Inactive,
    Pending,
}

impl Default for VolunteerStatus {
    fn default() -> Self {
        VolunteerStatus::Pending
    }
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolunteerStatus::Active => "active",
            VolunteerStatus::Inactive => "inactive",
            VolunteerStatus::Pending => "pending",
        }
    }
}

impl FromStr for VolunteerStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(VolunteerStatus::Active),
            "inactive" => Ok(VolunteerStatus::Inactive),
            "pending" => Ok(VolunteerStatus::Pending),
            _ => Err(()),
        }
    }
}

/// Availability
///
/// The weekly time slots a volunteer can serve in. Stored as a JSONB object
/// so the directory filter can test individual slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Availability {
    pub weekdays: bool,
    pub weekends: bool,
    pub mornings: bool,
    pub afternoons: bool,
    pub evenings: bool,
}

impl Availability {
    /// The slot names accepted by the directory filter.
    pub const SLOTS: [&'static str; 5] =
        ["weekdays", "weekends", "mornings", "afternoons", "evenings"];

    /// Slot lookup by filter name. Unknown names read as unavailable.
    pub fn slot(&self, name: &str) -> bool {
        match name {
            "weekdays" => self.weekdays,
            "weekends" => self.weekends,
            "mornings" => self.mornings,
            "afternoons" => self.afternoons,
            "evenings" => self.evenings,
            _ => false,
        }
    }
}

/// Certification
///
/// A credential attached to a volunteer's record (e.g. first aid), entered by
/// the volunteer with an optional verification link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub issued_date: String,
    pub expiry_date: Option<String>,
    pub verification_url: Option<String>,
}

/// BackgroundCheckStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BackgroundCheckStatus {
    Pending,
    Approved,
    Expired,
}

/// BackgroundCheck
///
/// A screening record on a volunteer (e.g. working-with-children check),
/// referenced by the number the issuing authority assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BackgroundCheck {
    #[serde(rename = "type")]
    pub check_type: String,
    pub status: BackgroundCheckStatus,
    pub issued_date: String,
    pub expiry_date: Option<String>,
    pub reference_number: Option<String>,
}

/// NotificationPreferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
}

/// PrivacyPreferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PrivacyPreferences {
    pub show_email: bool,
    pub show_phone: bool,
}

/// Preferences
///
/// The volunteer's notification and privacy settings, carried on the
/// directory record as one JSONB document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Preferences {
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
}

/// Volunteer
///
/// A volunteer directory entry from the `public.volunteers` table: the
/// listable record organizations browse, distinct from the `Profile` identity
/// row. Owned by the user who created it (`user_id`); skills, availability,
/// certifications, background checks and preferences all live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Volunteer {
    pub id: Uuid,
    // FK to public.profiles.id (the owning user).
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub availability: Availability,
    pub status: VolunteerStatus,
    pub certifications: Vec<Certification>,
    pub background_checks: Vec<BackgroundCheck>,
    pub preferences: Preferences,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// VolunteerFilter
///
/// Accepted query parameters for the directory listing
/// (GET /api/volunteers). `skills` and `availability` arrive comma-separated;
/// skills must all be present on a record, availability matches when any
/// requested slot is open.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct VolunteerFilter {
    /// Case-insensitive match against first name, last name, or email.
    pub search: Option<String>,
    /// Comma-separated skill list; records must carry every one.
    pub skills: Option<String>,
    /// Comma-separated slot names; records must have at least one open.
    pub availability: Option<String>,
    pub status: Option<VolunteerStatus>,
}

impl VolunteerFilter {
    pub fn skill_list(&self) -> Vec<String> {
        split_csv(self.skills.as_deref())
    }

    /// Requested slots, restricted to the known slot names.
    pub fn availability_list(&self) -> Vec<String> {
        split_csv(self.availability.as_deref())
            .into_iter()
            .filter(|slot| Availability::SLOTS.contains(&slot.as_str()))
            .collect()
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// CreateVolunteerRequest
///
/// Input payload for creating one's own directory entry
/// (POST /api/volunteers). The owning `user_id` comes from the session, never
/// from the payload. Status defaults to `pending`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateVolunteerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub status: VolunteerStatus,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub background_checks: Vec<BackgroundCheck>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// UpdateVolunteerRequest
///
/// Owner-only partial update of a directory entry (PUT /api/volunteers/{id}):
/// personal info, skills, availability, certifications, background checks and
/// preferences. Absent fields keep their stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateVolunteerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub availability: Option<Availability>,
    pub certifications: Option<Vec<Certification>>,
    pub background_checks: Option<Vec<BackgroundCheck>>,
    pub preferences: Option<Preferences>,
}

// --- Response Schemas ---

/// DashboardView
///
/// Landing payload for the role-area dashboards. The `area` field echoes
/// which area served the response so the frontend can assert it landed where
/// the gate sent it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub area: String,
    pub profile: Profile,
}

/// AdminStats
///
/// Role tallies for the admin dashboard (GET /admin/stats).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub volunteers: i64,
    pub organizations: i64,
    pub admins: i64,
}

/// SignInInfo
///
/// Served at the canonical sign-in entry (GET /auth/signin). Sign-in itself
/// happens against the external auth provider; this payload tells the
/// frontend where.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInInfo {
    pub auth_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_tag() {
        for role in [UserRole::Volunteer, UserRole::Organization, UserRole::Admin] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
    }

    #[test]
    fn unknown_role_tags_are_rejected() {
        assert!("member".parse::<UserRole>().is_err());
        assert!("".parse::<UserRole>().is_err());
        assert!("Volunteer".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Organization).unwrap(),
            "\"organization\""
        );
    }

    #[test]
    fn new_directory_entries_default_to_pending() {
        assert_eq!(VolunteerStatus::default(), VolunteerStatus::Pending);
        assert_eq!("pending".parse::<VolunteerStatus>(), Ok(VolunteerStatus::Pending));
        assert!("retired".parse::<VolunteerStatus>().is_err());
    }

    #[test]
    fn filter_splits_comma_separated_skills() {
        let filter = VolunteerFilter {
            skills: Some("first-aid, logistics,,driving ".to_string()),
            ..VolunteerFilter::default()
        };
        assert_eq!(filter.skill_list(), vec!["first-aid", "logistics", "driving"]);
        assert!(VolunteerFilter::default().skill_list().is_empty());
    }

    #[test]
    fn filter_drops_unknown_availability_slots() {
        let filter = VolunteerFilter {
            availability: Some("weekends,midnights,evenings".to_string()),
            ..VolunteerFilter::default()
        };
        assert_eq!(filter.availability_list(), vec!["weekends", "evenings"]);
    }

    #[test]
    fn availability_slot_lookup_matches_fields() {
        let availability = Availability {
            weekends: true,
            evenings: true,
            ..Availability::default()
        };
        assert!(availability.slot("weekends"));
        assert!(!availability.slot("weekdays"));
        assert!(!availability.slot("midnights"));
    }

    #[test]
    fn background_check_uses_the_wire_field_name() {
        let check = BackgroundCheck {
            check_type: "police".to_string(),
            status: BackgroundCheckStatus::Approved,
            issued_date: "2026-01-15".to_string(),
            expiry_date: None,
            reference_number: Some("PC-42".to_string()),
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["type"], "police");
        assert_eq!(json["status"], "approved");
    }
}
