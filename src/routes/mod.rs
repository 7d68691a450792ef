/// Router Module Index
///
/// Organizes the application's routing into the same areas the route-access
/// gate classifies paths into. The modules contain no access-control code of
/// their own: the gate middleware has already evaluated its decision table
/// before routing dispatch, so by the time a handler runs the session is
/// known to belong in the area.

/// The public area: sign-in entry and registration under `/auth`.
pub mod public;

/// Unclassified-protected paths (`/me`, `/api/volunteers`): any signed-in
/// session, no particular role.
pub mod authenticated;

/// The volunteer area under `/volunteer-dashboard`.
pub mod volunteer;

/// The organization area under `/dashboard` (and the `/org-dashboard` alias).
pub mod organization;

/// The admin area under `/admin`: the user-management console.
pub mod admin;
