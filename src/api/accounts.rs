use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::rules::Rules;
use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult, is_duplicate_key};
use crate::model::role::Role;
use crate::model::user::{USER_COLUMNS, User};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::{badge_cache, badge_filter};

/// Columns an admin may change through `PUT /accounts/{id}`.
const UPDATABLE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "badge_number",
    "division",
    "role",
    "email",
    "password",
    "is_active",
];

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 100, message = "The first name field is required."))]
    #[schema(example = "Maria")]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "The last name field is required."))]
    #[schema(example = "Santos")]
    pub last_name: String,
    #[validate(length(min = 1, max = 32, message = "The badge number field is required."))]
    #[schema(example = "PD-1042")]
    pub badge_number: String,
    #[validate(length(max = 100))]
    #[schema(example = "Patrol")]
    pub division: Option<String>,
    #[serde(default = "default_role")]
    #[schema(example = "employee")]
    pub role: Role,
    #[validate(email(message = "The email must be a valid email address."))]
    #[schema(example = "m.santos@precinct.gov", format = "email")]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    #[schema(example = "change-me-now", format = "password")]
    pub password: String,
}

fn default_role() -> Role {
    Role::Employee
}

/// Typed view of a partial update, checked with the same rules as
/// `CreateAccount`. Absent keys are skipped and `is_active` only needs its
/// JSON shape checked.
#[derive(Debug, Deserialize, Validate)]
struct AccountChanges {
    #[validate(length(min = 1, max = 100, message = "The first name field is required."))]
    first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "The last name field is required."))]
    last_name: Option<String>,
    #[validate(length(min = 1, max = 32, message = "The badge number field is required."))]
    badge_number: Option<String>,
    #[validate(length(max = 100))]
    division: Option<String>,
    role: Option<String>,
    #[validate(email(message = "The email must be a valid email address."))]
    email: Option<String>,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    password: Option<String>,
}

/// JSON shape each updatable column accepts. Only `division` may be cleared.
fn accepts(column: &str, value: &Value) -> bool {
    match column {
        "division" => value.is_null() || value.is_string(),
        "is_active" => value.is_boolean(),
        _ => value.is_string(),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccountQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub division: Option<String>,
    #[param(example = "employee")]
    pub role: Option<Role>,
    /// Matches name, badge number or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DivisionCount {
    #[schema(example = "Patrol")]
    pub division: String,
    #[schema(example = 31)]
    pub total: i64,
}

/// true  => badge AVAILABLE
/// false => badge TAKEN
pub async fn is_badge_available(badge_number: &str, pool: &MySqlPool) -> AppResult<bool> {
    // Cuckoo filter: a miss is definitive.
    if !badge_filter::might_exist(badge_number) {
        return Ok(true);
    }

    // Moka cache: a hit is definitive.
    if badge_cache::is_taken(badge_number).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE badge_number = ? LIMIT 1)",
    )
    .bind(badge_filter::normalize(badge_number))
    .fetch_one(pool)
    .await?
        > 0;

    if exists {
        badge_cache::mark_taken(badge_number).await;
    }
    Ok(!exists)
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))
}

/// Normalize and check an update payload in place. Passwords are replaced by
/// their hash, badge numbers are normalized and roles must parse. Unknown
/// keys are left for `build_update_sql` to refuse.
fn prepare_update(payload: &mut Map<String, Value>) -> AppResult<()> {
    let mut rules = Rules::new();

    for (column, value) in payload.iter() {
        if UPDATABLE_COLUMNS.contains(&column.as_str()) && !accepts(column, value) {
            rules.fail(
                column,
                format!("The {} field has an invalid value.", column.replace('_', " ")),
            );
        }
    }
    rules.finish()?;

    let changes: AccountChanges = serde_json::from_value(Value::Object(payload.clone()))
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    for (field, value) in [("first_name", &changes.first_name), ("last_name", &changes.last_name)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            rules.fail(field, format!("The {} field is required.", field.replace('_', " ")));
        }
    }
    if changes.badge_number.as_deref().is_some_and(|b| b.trim().is_empty()) {
        rules.fail("badge_number", "The badge number field is required.");
    }
    if let Some(role) = &changes.role {
        if role.parse::<Role>().is_err() {
            rules.fail("role", "The selected role is invalid.");
        }
    }
    rules.check(&changes)?;

    if let Some(badge) = &changes.badge_number {
        payload.insert("badge_number".into(), Value::String(badge_filter::normalize(badge)));
    }
    if let Some(email) = &changes.email {
        payload.insert("email".into(), Value::String(email.trim().to_lowercase()));
    }
    if let Some(password) = &changes.password {
        payload.insert("password".into(), Value::String(hash_password(password)?));
    }
    Ok(())
}

/* =========================
Create account
========================= */
#[utoipa::path(
    post,
    path = "/api/accounts",
    request_body = CreateAccount,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Badge number already taken"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
#[instrument(name = "account_create", skip(pool, payload), fields(admin_id = auth.user_id))]
pub async fn create_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAccount>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    Rules::new().check(&*payload)?;

    let badge = badge_filter::normalize(&payload.badge_number);
    if !is_badge_available(&badge, pool.get_ref()).await? {
        return Err(AppError::conflict("Badge number already taken"));
    }

    let hashed = hash_password(&payload.password)?;
    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, badge_number, division, role, email, password)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&badge)
    .bind(&payload.division)
    .bind(payload.role.as_ref())
    .bind(payload.email.trim().to_lowercase())
    .bind(hashed)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::conflict("Badge number or email already taken")
        } else {
            AppError::from(e)
        }
    })?;

    badge_filter::insert(&badge);
    badge_cache::mark_taken(&badge).await;

    let user = fetch_user(pool.get_ref(), result.last_insert_id()).await?;
    info!(user_id = user.id, badge = %user.badge_number, "Account created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Account created successfully",
        "data": user,
    })))
}

/* =========================
List accounts
========================= */
#[utoipa::path(
    get,
    path = "/api/accounts",
    params(AccountQuery),
    responses((status = 200, description = "Paginated account list", body = AccountListResponse)),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AccountQuery>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(division) = &query.division {
        conditions.push("division = ?");
        bindings.push(division.clone());
    }

    if let Some(role) = query.role {
        conditions.push("role = ?");
        bindings.push(role.to_string());
    }

    if let Some(search) = &query.search {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR badge_number LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search.trim());
        bindings.extend(std::iter::repeat_n(like, 4));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting accounts");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM users {} ORDER BY last_name, first_name LIMIT ? OFFSET ?",
        USER_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching accounts");

    let mut data_query = sqlx::query_as::<_, User>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    let users = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AccountListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/accounts/me",
    responses((status = 200, description = "The caller's account", body = User)),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn my_account(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let user = fetch_user(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/accounts/{user_id}",
    params(("user_id" = u64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account found", body = User),
        (status = 403, description = "Other officer's account"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;
    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Partial update. Only whitelisted columns are accepted.
#[utoipa::path(
    put,
    path = "/api/accounts/{user_id}",
    params(("user_id" = u64, Path, description = "Account id")),
    request_body(content = Object, description = "Any subset of first_name, last_name, badge_number, division, role, email, password, is_active", example = json!({
        "division": "Traffic",
        "is_active": true
    })),
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 404, description = "Account not found"),
        (status = 422, description = "Unknown or invalid field")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
#[instrument(name = "account_update", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn update_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Map<String, Value>>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();
    let existing = fetch_user(pool.get_ref(), user_id).await?;

    let mut payload = body.into_inner();
    prepare_update(&mut payload)?;

    let new_badge = payload
        .get("badge_number")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|badge| *badge != badge_filter::normalize(&existing.badge_number));
    if let Some(badge) = &new_badge {
        if !is_badge_available(badge, pool.get_ref()).await? {
            return Err(AppError::conflict("Badge number already taken"));
        }
    }

    let update = build_update_sql("users", &payload, UPDATABLE_COLUMNS, "id", user_id)?;
    execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::conflict("Badge number or email already taken")
        } else {
            AppError::from(e)
        }
    })?;

    if let Some(badge) = &new_badge {
        badge_filter::remove(&existing.badge_number);
        badge_cache::forget(&existing.badge_number).await;
        badge_filter::insert(badge);
        badge_cache::mark_taken(badge).await;
    }

    let user = fetch_user(pool.get_ref(), user_id).await?;
    info!(user_id, "Account updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Account updated successfully",
        "data": user,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/accounts/{user_id}",
    params(("user_id" = u64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Account deleted successfully"
        })),
        (status = 403, description = "Admin only, and never the caller's own account"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
#[instrument(name = "account_delete", skip(pool), fields(admin_id = auth.user_id))]
pub async fn delete_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();
    if user_id == auth.user_id {
        return Err(AppError::forbidden("You cannot delete your own account"));
    }

    let existing = fetch_user(pool.get_ref(), user_id).await?;
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        warn!(user_id, "Account vanished before delete");
        return Err(AppError::not_found("Account not found"));
    }

    badge_filter::remove(&existing.badge_number);
    badge_cache::forget(&existing.badge_number).await;
    info!(user_id, badge = %existing.badge_number, "Account deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Account deleted successfully" })))
}

/// Headcount per division. Accounts without a division are grouped as
/// `Unassigned`.
#[utoipa::path(
    get,
    path = "/api/accounts/divisions",
    responses((status = 200, description = "Headcount per division", body = [DivisionCount])),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn division_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let counts = sqlx::query_as::<_, DivisionCount>(
        r#"
        SELECT COALESCE(division, 'Unassigned') AS division, COUNT(*) AS total
        FROM users
        GROUP BY COALESCE(division, 'Unassigned')
        ORDER BY division
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "data": counts })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn create_payload_checks_email_and_password() {
        let payload: CreateAccount = serde_json::from_value(json!({
            "first_name": "Maria",
            "last_name": "Santos",
            "badge_number": "PD-1042",
            "email": "not-an-email",
            "password": "short"
        }))
        .unwrap();
        assert_eq!(payload.role, Role::Employee);

        let Err(AppError::Validation(fields)) = Rules::new().check(&payload) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("badge_number"));
    }

    #[test]
    fn update_hashes_password_and_normalizes_badge() {
        let mut payload = object(json!({
            "password": "a-long-enough-secret",
            "badge_number": " pd-77 "
        }));
        prepare_update(&mut payload).unwrap();

        assert_eq!(payload["badge_number"], "PD-77");
        let hashed = payload["password"].as_str().unwrap();
        assert!(hashed.starts_with("$argon2"));
    }

    #[test]
    fn update_rejects_bad_role_email_and_short_password() {
        let mut payload = object(json!({
            "role": "captain",
            "email": "nope",
            "password": "123"
        }));
        let Err(AppError::Validation(fields)) = prepare_update(&mut payload) else {
            panic!("expected validation failure");
        };
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn update_applies_the_create_rules() {
        let mut payload = object(json!({
            "first_name": "",
            "last_name": "x".repeat(101),
            "division": "d".repeat(101)
        }));
        let Err(AppError::Validation(fields)) = prepare_update(&mut payload) else {
            panic!("expected validation failure");
        };
        for field in ["first_name", "last_name", "division"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn update_refuses_nulls_and_wrong_types() {
        let mut payload = object(json!({
            "first_name": null,
            "is_active": "yes",
            "badge_number": 42
        }));
        let Err(AppError::Validation(fields)) = prepare_update(&mut payload) else {
            panic!("expected validation failure");
        };
        assert_eq!(fields.len(), 3);

        let mut cleared = object(json!({ "division": null, "is_active": false }));
        assert!(prepare_update(&mut cleared).is_ok());
    }

    #[test]
    fn unknown_update_columns_are_refused() {
        let payload = object(json!({ "created_at": "2020-01-01" }));
        assert!(build_update_sql("users", &payload, UPDATABLE_COLUMNS, "id", 1).is_err());
    }
}
