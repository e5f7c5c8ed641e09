use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::db::models::Diary;
use crate::diary::domain::{self, DiaryError, DiaryStats, Direction};
use crate::diary::repository::{DiaryRepository, NewDiary, SqliteDiaryRepository};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiaryRequest {
    pub pair: String,
    pub direction: String,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub pips: Option<f64>,
    pub notes: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiaryRequest {
    pub pair: Option<String>,
    pub direction: Option<String>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub pips: Option<f64>,
    pub notes: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub pair: Option<String>,
}

impl From<DiaryError> for AppError {
    fn from(err: DiaryError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn resolve_pips(
    pair: &str,
    direction: Direction,
    entry: Option<f64>,
    exit: Option<f64>,
    pips: Option<f64>,
) -> Option<f64> {
    match (pips, entry, exit) {
        (Some(p), _, _) => Some(p),
        (None, Some(entry), Some(exit)) => Some(domain::compute_pips(pair, direction, entry, exit)),
        _ => None,
    }
}

fn repo(state: &AppState) -> SqliteDiaryRepository {
    SqliteDiaryRepository::new(state.db.clone())
}

// -- Handlers --

/// POST /diary
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateDiaryRequest>,
) -> AppResult<Response> {
    let pair = domain::normalize_pair(&req.pair)?;
    let direction: Direction = req.direction.parse()?;
    let entry_price = domain::validate_price(req.entry_price, "Entry price")?;
    let exit_price = domain::validate_price(req.exit_price, "Exit price")?;
    let pips = domain::validate_pips(req.pips)?;
    let date = match non_blank(req.date) {
        Some(raw) => domain::parse_trade_date(&raw)?,
        None => domain::today(),
    };

    let entry = NewDiary {
        pips: resolve_pips(&pair, direction, entry_price, exit_price, pips),
        pair,
        direction: direction.to_string(),
        entry_price,
        exit_price,
        notes: non_blank(req.notes),
        image: non_blank(req.image),
        date: date.format("%Y-%m-%d").to_string(),
    };

    let diary = repo(&state).create(&user.id, entry).await?;
    tracing::info!("Created diary entry {} for user {}", diary.id, user.id);

    Ok((StatusCode::CREATED, Json(diary)).into_response())
}

/// GET /diary
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Diary>>> {
    let pair = non_blank(query.pair).map(|p| p.to_ascii_uppercase());
    let entries = repo(&state).list(&user.id, pair.as_deref()).await?;
    Ok(Json(entries))
}

/// GET /diary/{id}
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Diary>> {
    let diary = repo(&state)
        .get(&user.id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(diary))
}

/// PUT /diary/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateDiaryRequest>,
) -> AppResult<Json<Diary>> {
    let repo = repo(&state);
    let mut diary = repo.get(&user.id, &id).await?.ok_or(AppError::NotFound)?;

    let prices_changed = req.entry_price.is_some() || req.exit_price.is_some();
    let direction_changed = req.direction.is_some();

    if let Some(pair) = req.pair {
        diary.pair = domain::normalize_pair(&pair)?;
    }
    let direction: Direction = match req.direction {
        Some(raw) => raw.parse()?,
        None => diary.direction.parse()?,
    };
    diary.direction = direction.to_string();

    if req.entry_price.is_some() {
        diary.entry_price = domain::validate_price(req.entry_price, "Entry price")?;
    }
    if req.exit_price.is_some() {
        diary.exit_price = domain::validate_price(req.exit_price, "Exit price")?;
    }

    let explicit_pips = domain::validate_pips(req.pips)?;
    if explicit_pips.is_some() {
        diary.pips = explicit_pips;
    } else if prices_changed || direction_changed {
        diary.pips = resolve_pips(
            &diary.pair,
            direction,
            diary.entry_price,
            diary.exit_price,
            None,
        )
        .or(diary.pips);
    }

    if let Some(notes) = req.notes {
        diary.notes = non_blank(Some(notes));
    }
    if let Some(image) = req.image {
        diary.image = non_blank(Some(image));
    }
    // Blank means "not given", as on create; the stored date stays
    if let Some(raw) = non_blank(req.date) {
        diary.date = domain::parse_trade_date(&raw)?
            .format("%Y-%m-%d")
            .to_string();
    }

    let updated = repo.update(&diary).await?.ok_or(AppError::NotFound)?;
    Ok(Json(updated))
}

/// DELETE /diary/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if !repo(&state).delete(&user.id, &id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /diary/stats
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<DiaryStats>> {
    let entries = repo(&state).list(&user.id, None).await?;
    Ok(Json(domain::compute_stats(&entries)))
}
