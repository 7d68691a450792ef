use crate::models::{
    AdminStats, Availability, BackgroundCheck, Certification, CreateVolunteerRequest, Preferences,
    Profile, UpdateProfileRequest, UpdateVolunteerRequest, UserRole, Volunteer, VolunteerFilter,
    VolunteerStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder, types::Json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations against the
/// profiles mirror. Handlers and the session extractor interact with the data
/// layer through this trait without knowing the concrete implementation
/// (Postgres in deployment, the in-memory mock in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    // Resolves a profile by its id. This is on the hot path: the session
    // extractor calls it once per authenticated request.
    async fn get_user(&self, id: Uuid) -> Option<Profile>;
    // Creates the mirrored profile row after external auth signup.
    async fn create_user(&self, profile: Profile) -> Profile;

    // --- Self-service ---
    // Partial update of the caller's own profile. COALESCE semantics: absent
    // fields keep their current values.
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<Profile>;

    // --- Admin console ---
    async fn list_users(&self) -> Vec<Profile>;
    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Option<Profile>;
    async fn delete_user(&self, id: Uuid) -> bool;
    async fn get_stats(&self) -> AdminStats;

    // --- Volunteer directory ---
    // Filtered listing: search across names/email, all-of skills, any-of
    // availability slots, exact status.
    async fn list_volunteers(&self, filter: &VolunteerFilter) -> Vec<Volunteer>;
    async fn get_volunteer(&self, id: Uuid) -> Option<Volunteer>;
    // Creates the caller's directory entry; the owner is the session user.
    async fn create_volunteer(&self, user_id: Uuid, req: CreateVolunteerRequest) -> Volunteer;
    // Owner-only: updates only if user_id matches the entry's owner. Uses
    // COALESCE for partial updates.
    async fn update_volunteer(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateVolunteerRequest,
    ) -> Option<Volunteer>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// ProfileRow
///
/// Raw row shape for `public.profiles`. The role column is TEXT in the
/// database; the conversion into the closed `UserRole` enum happens in
/// `From<ProfileRow>`, so an unknown tag degrades to the unset state instead
/// of failing the query.
#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    role: Option<String>,
    display_name: Option<String>,
    phone: Option<String>,
    emergency_contact: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let role = match row.role.as_deref() {
            None => None,
            Some(tag) => match tag.parse::<UserRole>() {
                Ok(role) => Some(role),
                Err(()) => {
                    tracing::warn!(profile = %row.id, tag, "unknown role tag in profiles; treating as unset");
                    None
                }
            },
        };
        Profile {
            id: row.id,
            email: row.email,
            role,
            display_name: row.display_name,
            phone: row.phone,
            emergency_contact: row.emergency_contact,
            created_at: row.created_at,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, email, role, display_name, phone, emergency_contact, created_at";

/// VolunteerRow
///
/// Raw row shape for `public.volunteers`. The structured fields
/// (availability, certifications, background checks, preferences) are JSONB
/// columns decoded through `sqlx::types::Json`; status is TEXT and converted
/// the same way as the role tag, degrading unknown values to `pending`.
#[derive(Debug, FromRow)]
struct VolunteerRow {
    id: Uuid,
    user_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    skills: Vec<String>,
    availability: Json<Availability>,
    status: String,
    certifications: Json<Vec<Certification>>,
    background_checks: Json<Vec<BackgroundCheck>>,
    preferences: Json<Preferences>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VolunteerRow> for Volunteer {
    fn from(row: VolunteerRow) -> Self {
        let status = match row.status.parse::<VolunteerStatus>() {
            Ok(status) => status,
            Err(()) => {
                tracing::warn!(volunteer = %row.id, tag = row.status, "unknown volunteer status; treating as pending");
                VolunteerStatus::Pending
            }
        };
        Volunteer {
            id: row.id,
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            skills: row.skills,
            availability: row.availability.0,
            status,
            certifications: row.certifications.0,
            background_checks: row.background_checks.0,
            preferences: row.preferences.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const VOLUNTEER_COLUMNS: &str = "id, user_id, first_name, last_name, email, phone, skills, \
     availability, status, certifications, background_checks, preferences, \
     created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database that mirrors the auth provider's user ids.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        match sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(Profile::from),
            Err(e) => {
                tracing::error!("get_user error: {:?}", e);
                None
            }
        }
    }

    /// create_user
    ///
    /// Creates the mirroring profile record in `public.profiles` after
    /// external auth success. The id is the provider's, never generated here.
    async fn create_user(&self, profile: Profile) -> Profile {
        let sql = format!(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(profile.id)
            .bind(&profile.email)
            .bind(profile.role.map(|r| r.as_str()))
            .fetch_one(&self.pool)
            .await
            .map(Profile::from)
            .expect("Failed to create profile")
    }

    /// update_profile
    ///
    /// Partial update using COALESCE so absent fields keep their stored
    /// values. Returns None when the profile does not exist.
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<Profile> {
        let sql = format!(
            "UPDATE profiles SET \
                display_name = COALESCE($2, display_name), \
                phone = COALESCE($3, phone), \
                emergency_contact = COALESCE($4, emergency_contact) \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        match sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .bind(req.display_name)
            .bind(req.phone)
            .bind(req.emergency_contact)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(Profile::from),
            Err(e) => {
                tracing::error!("update_profile error: {:?}", e);
                None
            }
        }
    }

    async fn list_users(&self) -> Vec<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC");
        match sqlx::query_as::<_, ProfileRow>(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows.into_iter().map(Profile::from).collect(),
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Option<Profile> {
        let sql =
            format!("UPDATE profiles SET role = $2 WHERE id = $1 RETURNING {PROFILE_COLUMNS}");
        match sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(Profile::from),
            Err(e) => {
                tracing::error!("set_user_role error: {:?}", e);
                None
            }
        }
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    /// get_stats
    ///
    /// Compiles the role tallies for the admin dashboard in a single query.
    async fn get_stats(&self) -> AdminStats {
        let sql = "SELECT \
                COUNT(*), \
                COUNT(*) FILTER (WHERE role = 'volunteer'), \
                COUNT(*) FILTER (WHERE role = 'organization'), \
                COUNT(*) FILTER (WHERE role = 'admin') \
             FROM profiles";
        match sqlx::query_as::<_, (i64, i64, i64, i64)>(sql)
            .fetch_one(&self.pool)
            .await
        {
            Ok((total_users, volunteers, organizations, admins)) => AdminStats {
                total_users,
                volunteers,
                organizations,
                admins,
            },
            Err(e) => {
                tracing::error!("get_stats error: {:?}", e);
                AdminStats::default()
            }
        }
    }

    /// list_volunteers
    ///
    /// Implements the directory filters using QueryBuilder for safe
    /// parameterization: ILIKE search over names and email, array-contains
    /// for skills (all requested must be present), JSONB slot checks for
    /// availability (any requested slot open), exact status match.
    async fn list_volunteers(&self, filter: &VolunteerFilter) -> Vec<Volunteer> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE 1 = 1"
        ));

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            builder.push(" AND (first_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR last_name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        let skills = filter.skill_list();
        if !skills.is_empty() {
            builder.push(" AND skills @> ");
            builder.push_bind(skills);
        }

        let slots = filter.availability_list();
        if !slots.is_empty() {
            builder.push(" AND (");
            for (i, slot) in slots.into_iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push("availability->>");
                builder.push_bind(slot);
                builder.push(" = 'true'");
            }
            builder.push(")");
        }

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }

        builder.push(" ORDER BY created_at DESC");

        let query = builder.build_query_as::<VolunteerRow>();
        match query.fetch_all(&self.pool).await {
            Ok(rows) => rows.into_iter().map(Volunteer::from).collect(),
            Err(e) => {
                tracing::error!("list_volunteers error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_volunteer(&self, id: Uuid) -> Option<Volunteer> {
        let sql = format!("SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE id = $1");
        match sqlx::query_as::<_, VolunteerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(Volunteer::from),
            Err(e) => {
                tracing::error!("get_volunteer error: {:?}", e);
                None
            }
        }
    }

    /// create_volunteer
    ///
    /// Inserts the caller's directory entry. The owning user id comes from
    /// the session; the row id is generated by the database.
    async fn create_volunteer(&self, user_id: Uuid, req: CreateVolunteerRequest) -> Volunteer {
        let sql = format!(
            "INSERT INTO volunteers (user_id, first_name, last_name, email, phone, skills, \
                availability, status, certifications, background_checks, preferences) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {VOLUNTEER_COLUMNS}"
        );
        sqlx::query_as::<_, VolunteerRow>(&sql)
            .bind(user_id)
            .bind(&req.first_name)
            .bind(&req.last_name)
            .bind(&req.email)
            .bind(&req.phone)
            .bind(&req.skills)
            .bind(Json(&req.availability))
            .bind(req.status.as_str())
            .bind(Json(&req.certifications))
            .bind(Json(&req.background_checks))
            .bind(Json(&req.preferences))
            .fetch_one(&self.pool)
            .await
            .map(Volunteer::from)
            .expect("Failed to create volunteer entry")
    }

    /// update_volunteer
    ///
    /// Owner-only partial update: the WHERE clause carries both the entry id
    /// and the owning user id, so a non-owner gets None (404), never a write.
    async fn update_volunteer(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateVolunteerRequest,
    ) -> Option<Volunteer> {
        let sql = format!(
            "UPDATE volunteers SET \
                first_name = COALESCE($3, first_name), \
                last_name = COALESCE($4, last_name), \
                phone = COALESCE($5, phone), \
                skills = COALESCE($6, skills), \
                availability = COALESCE($7, availability), \
                certifications = COALESCE($8, certifications), \
                background_checks = COALESCE($9, background_checks), \
                preferences = COALESCE($10, preferences), \
                updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {VOLUNTEER_COLUMNS}"
        );
        match sqlx::query_as::<_, VolunteerRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(req.first_name)
            .bind(req.last_name)
            .bind(req.phone)
            .bind(req.skills)
            .bind(req.availability.map(Json))
            .bind(req.certifications.map(Json))
            .bind(req.background_checks.map(Json))
            .bind(req.preferences.map(Json))
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(Volunteer::from),
            Err(e) => {
                tracing::error!("update_volunteer error: {:?}", e);
                None
            }
        }
    }
}

/// MockRepository
///
/// In-memory implementation used by the integration tests so the full router
/// (gate included) can be exercised without a Postgres instance. Profiles are
/// held in a plain HashMap behind a Mutex; the lock is never held across an
/// await point.
#[derive(Default)]
pub struct MockRepository {
    profiles: Mutex<HashMap<Uuid, Profile>>,
    volunteers: Mutex<HashMap<Uuid, Volunteer>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile directly, bypassing the registration flow.
    pub fn seed(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("mock repository poisoned")
            .insert(profile.id, profile);
    }

    /// Seeds a directory entry directly, bypassing the onboarding flow.
    pub fn seed_volunteer(&self, volunteer: Volunteer) {
        self.volunteers
            .lock()
            .expect("mock repository poisoned")
            .insert(volunteer.id, volunteer);
    }
}

/// Mirrors the Postgres filter semantics on the in-memory map.
fn matches_filter(volunteer: &Volunteer, filter: &VolunteerFilter) -> bool {
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let haystack = [
            volunteer.first_name.to_lowercase(),
            volunteer.last_name.to_lowercase(),
            volunteer.email.to_lowercase(),
        ];
        if !haystack.iter().any(|field| field.contains(&needle)) {
            return false;
        }
    }
    let skills = filter.skill_list();
    if !skills.is_empty() && !skills.iter().all(|s| volunteer.skills.contains(s)) {
        return false;
    }
    let slots = filter.availability_list();
    if !slots.is_empty() && !slots.iter().any(|slot| volunteer.availability.slot(slot)) {
        return false;
    }
    if let Some(status) = filter.status {
        if volunteer.status != status {
            return false;
        }
    }
    true
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_user(&self, id: Uuid) -> Option<Profile> {
        self.profiles.lock().expect("mock repository poisoned").get(&id).cloned()
    }

    async fn create_user(&self, profile: Profile) -> Profile {
        let mut guard = self.profiles.lock().expect("mock repository poisoned");
        guard.insert(profile.id, profile.clone());
        profile
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<Profile> {
        let mut guard = self.profiles.lock().expect("mock repository poisoned");
        let profile = guard.get_mut(&id)?;
        if let Some(display_name) = req.display_name {
            profile.display_name = Some(display_name);
        }
        if let Some(phone) = req.phone {
            profile.phone = Some(phone);
        }
        if let Some(emergency_contact) = req.emergency_contact {
            profile.emergency_contact = Some(emergency_contact);
        }
        Some(profile.clone())
    }

    async fn list_users(&self) -> Vec<Profile> {
        let mut users: Vec<Profile> = self
            .profiles
            .lock()
            .expect("mock repository poisoned")
            .values()
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Option<Profile> {
        let mut guard = self.profiles.lock().expect("mock repository poisoned");
        let profile = guard.get_mut(&id)?;
        profile.role = Some(role);
        Some(profile.clone())
    }

    async fn delete_user(&self, id: Uuid) -> bool {
        self.profiles
            .lock()
            .expect("mock repository poisoned")
            .remove(&id)
            .is_some()
    }

    async fn get_stats(&self) -> AdminStats {
        let guard = self.profiles.lock().expect("mock repository poisoned");
        AdminStats {
            total_users: guard.len() as i64,
            volunteers: guard.values().filter(|p| p.role == Some(UserRole::Volunteer)).count()
                as i64,
            organizations: guard
                .values()
                .filter(|p| p.role == Some(UserRole::Organization))
                .count() as i64,
            admins: guard.values().filter(|p| p.role == Some(UserRole::Admin)).count() as i64,
        }
    }

    async fn list_volunteers(&self, filter: &VolunteerFilter) -> Vec<Volunteer> {
        let mut entries: Vec<Volunteer> = self
            .volunteers
            .lock()
            .expect("mock repository poisoned")
            .values()
            .filter(|v| matches_filter(v, filter))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    async fn get_volunteer(&self, id: Uuid) -> Option<Volunteer> {
        self.volunteers
            .lock()
            .expect("mock repository poisoned")
            .get(&id)
            .cloned()
    }

    async fn create_volunteer(&self, user_id: Uuid, req: CreateVolunteerRequest) -> Volunteer {
        let volunteer = Volunteer {
            id: Uuid::new_v4(),
            user_id,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            skills: req.skills,
            availability: req.availability,
            status: req.status,
            certifications: req.certifications,
            background_checks: req.background_checks,
            preferences: req.preferences,
            ..Volunteer::default()
        };
        self.volunteers
            .lock()
            .expect("mock repository poisoned")
            .insert(volunteer.id, volunteer.clone());
        volunteer
    }

    async fn update_volunteer(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateVolunteerRequest,
    ) -> Option<Volunteer> {
        let mut guard = self.volunteers.lock().expect("mock repository poisoned");
        let volunteer = guard.get_mut(&id).filter(|v| v.user_id == user_id)?;
        if let Some(first_name) = req.first_name {
            volunteer.first_name = first_name;
        }
        if let Some(last_name) = req.last_name {
            volunteer.last_name = last_name;
        }
        if let Some(phone) = req.phone {
            volunteer.phone = Some(phone);
        }
        if let Some(skills) = req.skills {
            volunteer.skills = skills;
        }
        if let Some(availability) = req.availability {
            volunteer.availability = availability;
        }
        if let Some(certifications) = req.certifications {
            volunteer.certifications = certifications;
        }
        if let Some(background_checks) = req.background_checks {
            volunteer.background_checks = background_checks;
        }
        if let Some(preferences) = req.preferences {
            volunteer.preferences = preferences;
        }
        Some(volunteer.clone())
    }
}
