use actix_multipart::Multipart;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

use crate::assign;
use crate::error::RosterError;
use crate::model::{DutyAssignment, ExamConfig, SlotRequirement, UnavailabilityMap};
use crate::reconcile;
use crate::report;
use crate::store::Store;
use crate::table::{Table, Upload};

pub struct AppState {
    pub store: Store,
}

fn error_response(err: &RosterError) -> HttpResponse {
    let body = json!({"success": false, "error": err.to_string()});
    if err.is_client_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

fn ok_status() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

/// Rows of a stored table as JSON records keyed by the original headers.
fn table_records(table: &Table) -> Vec<serde_json::Value> {
    (0..table.row_count())
        .map(|row| {
            let mut record = serde_json::Map::new();
            for (col, header) in table.headers().iter().enumerate() {
                record.insert(
                    header.clone(),
                    serde_json::Value::String(table.cell(row, col).to_string()),
                );
            }
            serde_json::Value::Object(record)
        })
        .collect()
}

struct UploadField {
    field: String,
    upload: Upload,
}

/// Buffers every file field of a multipart payload into memory, so nothing
/// touches disk before validation.
async fn read_uploads(mut payload: Multipart) -> Result<Vec<UploadField>> {
    let mut uploads = Vec::new();
    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or("")
            .to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }
        uploads.push(UploadField {
            field: name,
            upload: Upload::new(filename, bytes),
        });
    }
    Ok(uploads)
}

async fn ping() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({"message": "pong"})))
}

async fn get_faculty(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_roster_table() {
        Ok(table) => Ok(HttpResponse::Ok().json(table_records(&table))),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn upload_faculty(payload: Multipart, state: web::Data<AppState>) -> Result<HttpResponse> {
    let uploads = read_uploads(payload).await?;
    let Some(upload) = uploads.into_iter().find(|u| u.field == "file") else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({"success": false, "error": "no file uploaded"})));
    };
    let saved = upload
        .upload
        .roster_table()
        .and_then(|table| state.store.save_roster_table(&table));
    match saved {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_exam_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_schedule() {
        Ok(schedule) => Ok(HttpResponse::Ok().json(schedule)),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn add_exam_schedule(
    item: web::Json<SlotRequirement>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let result = state.store.load_schedule().and_then(|mut schedule| {
        schedule.push(item.into_inner());
        state.store.save_schedule(&schedule)
    });
    match result {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn delete_exam_schedule(
    date: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.store.delete_schedule_date(&date) {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    faculty: Vec<serde_json::Value>,
    #[serde(default)]
    schedule: Vec<serde_json::Value>,
}

async fn generate_assignments(
    req: web::Json<GenerateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let names = assign::faculty_names_from_json(&req.faculty);
    let schedule = match assign::slot_requirements_from_json(&req.schedule) {
        Ok(schedule) => schedule,
        Err(err) => return Ok(error_response(&err)),
    };
    let assignments = assign::generate_assignments(&names, &schedule);
    if let Err(err) = state.store.save_assignments(&assignments) {
        return Ok(error_response(&err));
    }
    Ok(HttpResponse::Ok().json(assignments))
}

async fn get_assignments(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_assignments() {
        Ok(assignments) => Ok(HttpResponse::Ok().json(assignments)),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn save_assignments(
    assignments: web::Json<Vec<DutyAssignment>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.store.save_assignments(&assignments) {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_faculty_groups(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_groups() {
        Ok(groups) => Ok(HttpResponse::Ok().json(groups)),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn save_faculty_groups(
    groups: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.store.save_groups(&groups) {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_faculty_unavailability(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_unavailability() {
        Ok(map) => Ok(HttpResponse::Ok().json(map)),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn save_faculty_unavailability(
    map: web::Json<UnavailabilityMap>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.store.save_unavailability(&map) {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_exam_config(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_config() {
        Ok(config) => Ok(HttpResponse::Ok().json(config)),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn save_exam_config(
    config: web::Json<ExamConfig>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    match state.store.save_config(&config) {
        Ok(()) => Ok(ok_status()),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Rebuilds assignments (and, when derivable, schedule and unavailability)
/// from an edited summary spreadsheet. Artifacts are written only after the
/// whole outcome has been reconstructed in memory.
async fn regenerate_from_summary(
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut summary = None;
    let mut schedule = None;
    let mut unavailability = None;
    for entry in read_uploads(payload).await? {
        match entry.field.as_str() {
            "summary_file" => summary = Some(entry.upload),
            "schedule_file" => schedule = Some(entry.upload),
            "unavailability_file" => unavailability = Some(entry.upload),
            _ => {}
        }
    }
    let Some(summary) = summary else {
        return Ok(HttpResponse::BadRequest()
            .json(json!({"success": false, "error": "no summary_file uploaded"})));
    };

    let outcome =
        match reconcile::reconcile_uploads(&summary, schedule.as_ref(), unavailability.as_ref()) {
            Ok(outcome) => outcome,
            Err(err) => return Ok(error_response(&err)),
        };

    if let Err(err) = state.store.save_assignments(&outcome.assignments) {
        return Ok(error_response(&err));
    }
    let mut message = format!(
        "Regenerated {} assignments from summary",
        outcome.assignments.len()
    );
    if !outcome.schedule.is_empty() {
        if let Err(err) = state.store.save_schedule(&outcome.schedule) {
            return Ok(error_response(&err));
        }
        message.push_str(&format!(
            " and updated exam schedule with {} dates",
            outcome.schedule.len()
        ));
    }
    if !outcome.unavailability.is_empty() {
        if let Err(err) = state.store.save_unavailability(&outcome.unavailability) {
            return Ok(error_response(&err));
        }
        message.push_str(&format!(
            " and updated unavailability for {} faculty",
            outcome.unavailability.len()
        ));
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": message,
        "warnings": outcome.warnings,
    })))
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(rename = "type")]
    kind: String,
}

async fn download_report(
    query: web::Query<ReportQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let assignments = match state.store.load_assignments() {
        Ok(assignments) => assignments,
        Err(err) => return Ok(error_response(&err)),
    };
    if assignments.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({"error": "No assignments found"})));
    }
    let roster = match state.store.load_faculty() {
        Ok(roster) => report::roster_or_assigned(roster, &assignments),
        Err(err) => return Ok(error_response(&err)),
    };

    match query.kind.as_str() {
        "summary" => {
            let unavailability = match state.store.load_unavailability() {
                Ok(map) => map,
                Err(err) => return Ok(error_response(&err)),
            };
            let rows = report::faculty_summary_rows(&roster, &assignments, &unavailability);
            let bytes = match report::summary_csv(&rows) {
                Ok(bytes) => bytes,
                Err(err) => return Ok(error_response(&err)),
            };
            Ok(HttpResponse::Ok()
                .content_type("text/csv")
                .insert_header((
                    "Content-Disposition",
                    "attachment; filename=faculty_summary.csv",
                ))
                .body(bytes))
        }
        "chart" => {
            let config = match state.store.load_config() {
                Ok(config) => config,
                Err(err) => return Ok(error_response(&err)),
            };
            let chart = report::duty_chart(&assignments, &roster, &config);
            Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .insert_header(("Content-Disposition", "attachment; filename=duty_chart.txt"))
                .body(chart))
        }
        _ => Ok(HttpResponse::BadRequest().json(json!({"error": "Invalid report type"}))),
    }
}

pub async fn start_server(port: u16, data_dir: PathBuf) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        store: Store::new(data_dir),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .route("/ping", web::get().to(ping))
            .route("/faculty", web::get().to(get_faculty))
            .route("/upload-faculty", web::post().to(upload_faculty))
            .route("/exam-schedule", web::get().to(get_exam_schedule))
            .route("/exam-schedule", web::post().to(add_exam_schedule))
            .service(
                web::resource("/exam-schedule/{date}")
                    .route(web::delete().to(delete_exam_schedule)),
            )
            .route("/generate-assignments", web::post().to(generate_assignments))
            .route("/assignments", web::get().to(get_assignments))
            .route("/assignments", web::post().to(save_assignments))
            .route("/faculty-groups", web::get().to(get_faculty_groups))
            .route("/faculty-groups", web::post().to(save_faculty_groups))
            .route(
                "/faculty-unavailability",
                web::get().to(get_faculty_unavailability),
            )
            .route(
                "/faculty-unavailability",
                web::post().to(save_faculty_unavailability),
            )
            .route("/exam-config", web::get().to(get_exam_config))
            .route("/exam-config", web::post().to(save_exam_config))
            .route(
                "/regenerate-from-summary",
                web::post().to(regenerate_from_summary),
            )
            .route("/download-report", web::get().to(download_report))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
