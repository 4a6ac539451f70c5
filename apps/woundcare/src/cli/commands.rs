//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the registry, performs one operation and prints
//! either a text report or, with `--json-mode`, the same JSON bodies the
//! HTTP API returns.

use super::RegisterArgs;
use crate::api::{
    self, DeleteResponse, EvaluateResponse, SummaryResponse, TreatmentListResponse,
    TreatmentResponse, WoundJson, WoundListResponse, WoundResponse,
};
use crate::config::AppConfig;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use woundcare_core::{
    ClinicalStage, EvaluationReport, PatientId, RawField, RawTreatment, RawWound, Registry,
    WoundId, WoundcareError,
};

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub config: PathBuf,
    pub json_mode: bool,
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the registry for the configured backend and thresholds.
pub fn open_registry(ctx: &Context) -> Result<Registry, WoundcareError> {
    let config = AppConfig::load_or_default(&ctx.config)?;
    open_registry_with(ctx, &config)
}

fn open_registry_with(ctx: &Context, config: &AppConfig) -> Result<Registry, WoundcareError> {
    let thresholds = config.thresholds.resolve()?;
    let registry = match ctx.backend.as_str() {
        "redb" => Registry::with_redb(&ctx.database)?,
        "memory" => Registry::new(),
        other => {
            return Err(WoundcareError::ConfigError(format!(
                "Unknown backend '{}' (expected 'redb' or 'memory')",
                other
            )));
        }
    };
    Ok(registry.with_thresholds(thresholds))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_wound(w: &WoundJson) {
    let dash = || "-".to_string();
    println!("Wound #{} (patient {})", w.id, w.patient_id);
    println!("  Stage:      {} ({})", w.stage_label, w.clinical_stage);
    println!("  Registered: {}", w.created_at.to_rfc3339());
    println!("  Updated:    {}", w.updated_at.to_rfc3339());
    println!(
        "  Infection:  {}",
        w.infection_signs.clone().unwrap_or_else(dash)
    );
    println!(
        "  Pain:       {}",
        w.pain_scale.map(|p| p.to_string()).unwrap_or_else(dash)
    );
    println!(
        "  Exudate:    {}",
        w.exudate_amount.clone().unwrap_or_else(dash)
    );
    println!(
        "  Size (cm):  {} x {}",
        w.length_cm.as_ref().map(|n| n.to_string()).unwrap_or_else(dash),
        w.width_cm.as_ref().map(|n| n.to_string()).unwrap_or_else(dash)
    );
    if let Some(location) = &w.location {
        println!("  Location:   {}", location);
    }
    if let Some(kind) = &w.wound_type {
        println!("  Type:       {}", kind);
    }
    if let Some(description) = &w.description {
        println!("  Notes:      {}", description);
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: &Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), WoundcareError> {
    let config = AppConfig::load_or_default(&ctx.config)?;
    let registry = open_registry_with(ctx, &config)?;
    let host = config.host(host);
    let port = config.port(port);

    println!("woundcare server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", ctx.backend);
    println!("  Database: {:?}", ctx.database);
    println!();
    println!("Endpoints:");
    println!("  GET    /health                  - Health check");
    println!("  GET    /summary                 - Counts per stage");
    println!("  POST   /wounds                  - Register a wound");
    println!("  GET    /wounds                  - List wounds");
    println!("  GET    /wounds/{{id}}             - Show a wound");
    println!("  PATCH  /wounds/{{id}}             - Edit attributes");
    println!("  DELETE /wounds/{{id}}             - Delete a wound");
    println!("  GET    /wounds/{{id}}/treatments  - List treatments");
    println!("  POST   /wounds/{{id}}/treatments  - Record a treatment");
    println!("  POST   /wounds/{{id}}/evaluate    - Re-evaluate stage");
    println!("  PUT    /wounds/{{id}}/stage       - Override stage");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, registry).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), WoundcareError> {
    if ctx.backend != "redb" {
        return Err(WoundcareError::ConfigError(
            "init only applies to the redb backend".to_string(),
        ));
    }
    if ctx.database.exists() {
        if !force {
            return Err(WoundcareError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| WoundcareError::IoError(format!("Remove old database: {}", e)))?;
    }

    let _registry = Registry::with_redb(&ctx.database)?;
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "success": true,
            "database": ctx.database.to_string_lossy(),
        }));
    } else {
        println!("Initialized new redb database at {:?}", ctx.database);
    }
    Ok(())
}

// =============================================================================
// WOUND COMMANDS
// =============================================================================

/// Register a wound.
pub fn cmd_register(ctx: &Context, args: &RegisterArgs) -> Result<(), WoundcareError> {
    let field = |v: &Option<String>| v.as_deref().map(RawField::from);
    let raw = RawWound {
        patient_id: args.patient,
        infection_signs: field(&args.infection),
        pain_scale: field(&args.pain),
        exudate_amount: field(&args.exudate),
        length_cm: field(&args.length),
        width_cm: field(&args.width),
        location: args.location.clone(),
        wound_type: args.wound_type.clone(),
        description: args.description.clone(),
    };
    let new = raw.normalize()?;

    let mut registry = open_registry(ctx)?;
    let wound = registry.register_wound(new, Utc::now())?;
    tracing::info!(wound_id = wound.id.0, "Wound registered");

    let response = WoundResponse::success(&wound);
    if ctx.json_mode {
        print_json(&response);
    } else if let Some(w) = &response.wound {
        println!("Registered wound #{}", w.id);
        print_wound(w);
    }
    Ok(())
}

/// Show a wound and its treatments.
pub fn cmd_show(ctx: &Context, wound: u64) -> Result<(), WoundcareError> {
    let registry = open_registry(ctx)?;
    let id = WoundId(wound);
    let record = registry
        .wound(id)?
        .ok_or(WoundcareError::WoundNotFound(id))?;
    let treatments = registry.treatments(id)?;

    let wound_response = WoundResponse::success(&record);
    let treatment_response = TreatmentListResponse::success(&treatments);
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "wound": wound_response.wound,
            "treatments": treatment_response.treatments,
        }));
        return Ok(());
    }

    if let Some(w) = &wound_response.wound {
        print_wound(w);
    }
    println!();
    println!("Treatments ({}):", treatment_response.treatments.len());
    for t in &treatment_response.treatments {
        println!(
            "  #{} {} {}{}",
            t.id,
            t.created_at.to_rfc3339(),
            t.performed_by.as_deref().unwrap_or("-"),
            t.notes
                .as_deref()
                .map(|n| format!(" | {}", n))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// List wounds.
pub fn cmd_list(ctx: &Context, patient: Option<u64>) -> Result<(), WoundcareError> {
    let registry = open_registry(ctx)?;
    let wounds = match patient {
        Some(p) => registry.wounds_for_patient(PatientId(p))?,
        None => registry.list_wounds()?,
    };

    let response = WoundListResponse::success(&wounds);
    if ctx.json_mode {
        print_json(&response);
        return Ok(());
    }

    println!("{:>6}  {:>8}  {:<22}  {}", "ID", "PATIENT", "STAGE", "LOCATION");
    for w in &response.wounds {
        println!(
            "{:>6}  {:>8}  {:<22}  {}",
            w.id,
            w.patient_id,
            w.clinical_stage.as_str(),
            w.location.as_deref().unwrap_or("-")
        );
    }
    println!("{} wound(s)", response.wounds.len());
    Ok(())
}

/// Delete a wound and its treatments.
pub fn cmd_delete(ctx: &Context, wound: u64) -> Result<(), WoundcareError> {
    let mut registry = open_registry(ctx)?;
    let deleted = registry.delete_wound(WoundId(wound))?;

    if ctx.json_mode {
        print_json(&DeleteResponse::deleted(deleted));
    } else if deleted {
        println!("Deleted wound #{} and its treatments", wound);
    } else {
        println!("Wound #{} not found", wound);
    }
    Ok(())
}

// =============================================================================
// TREATMENT AND STAGE COMMANDS
// =============================================================================

/// Record a treatment and report the evaluation it triggered.
pub fn cmd_treat(
    ctx: &Context,
    wound: u64,
    notes: Option<String>,
    performed_by: Option<String>,
) -> Result<(), WoundcareError> {
    let new = RawTreatment {
        notes,
        performed_by,
    }
    .normalize()?;

    let mut registry = open_registry(ctx)?;
    let id = WoundId(wound);
    let recorded = registry.record_treatment(id, new, Utc::now())?;
    api::log_evaluation(id, &recorded.evaluation);

    let evaluation_error = match &recorded.evaluation {
        EvaluationReport::Completed { .. } => None,
        EvaluationReport::WoundMissing => Some("wound not found".to_string()),
        EvaluationReport::Failed { reason } => Some(reason.clone()),
    };
    let response = TreatmentResponse::success(
        &recorded.treatment,
        recorded.evaluation.evaluation(),
        evaluation_error,
    );

    if ctx.json_mode {
        print_json(&response);
        return Ok(());
    }

    println!(
        "Recorded treatment #{} for wound #{}",
        recorded.treatment.id, wound
    );
    match (&response.evaluation, &response.evaluation_error) {
        (Some(e), _) if e.previous_stage != e.stage => println!(
            "Stage: {} -> {} ({})",
            e.previous_stage, e.stage, e.write
        ),
        (Some(e), _) => println!("Stage: {} (unchanged)", e.stage),
        (None, Some(err)) => println!("Stage evaluation failed: {}", err),
        (None, None) => {}
    }
    Ok(())
}

/// Re-run the stage rules.
pub fn cmd_evaluate(ctx: &Context, wound: u64) -> Result<(), WoundcareError> {
    let mut registry = open_registry(ctx)?;
    let id = WoundId(wound);
    let Some(evaluation) = registry.evaluate(id, Utc::now())? else {
        if ctx.json_mode {
            print_json(&EvaluateResponse::not_found());
            return Ok(());
        }
        return Err(WoundcareError::WoundNotFound(id));
    };
    api::log_evaluation(
        id,
        &EvaluationReport::Completed {
            evaluation: evaluation.clone(),
        },
    );

    let response = EvaluateResponse::success(&evaluation);
    if ctx.json_mode {
        print_json(&response);
        return Ok(());
    }

    if let Some(e) = &response.evaluation {
        println!("Wound #{}", e.wound_id);
        println!("  Stage:     {} ({})", e.stage_label, e.stage);
        println!("  Previous:  {}", e.previous_stage);
        println!("  Rule:      {}", e.rule.as_deref().unwrap_or("none matched"));
        println!("  Treatments: {}", e.treatment_count);
        println!("  Age (days): {}", e.days_since_creation);
        match e.last_treatment_at {
            Some(at) => println!("  Last treatment: {}", at.format("%Y-%m-%d %H:%M")),
            None => println!("  Last treatment: none"),
        }
        println!("  Write:     {}", e.write);
    }
    Ok(())
}

/// Manual stage override.
pub fn cmd_override(ctx: &Context, wound: u64, stage: &str) -> Result<(), WoundcareError> {
    let stage: ClinicalStage = stage.parse()?;
    let mut registry = open_registry(ctx)?;
    let updated = registry.override_stage(WoundId(wound), stage, Utc::now())?;
    tracing::info!(
        event = "stage_override",
        wound_id = wound,
        stage = %stage,
        "Clinical stage set manually"
    );

    if ctx.json_mode {
        print_json(&WoundResponse::success(&updated));
    } else {
        println!("Wound #{} set to {} ({})", wound, stage.label(), stage);
    }
    Ok(())
}

// =============================================================================
// SUMMARY COMMAND
// =============================================================================

/// Wound counts per stage.
pub fn cmd_summary(ctx: &Context) -> Result<(), WoundcareError> {
    let registry = open_registry(ctx)?;
    let summary = registry.summary()?;

    if ctx.json_mode {
        print_json(&SummaryResponse::from(&summary));
        return Ok(());
    }

    println!("woundcare Summary");
    println!("=================");
    println!("Database: {:?}", ctx.database);
    println!("Backend:  {}", ctx.backend);
    println!();
    for stage in ClinicalStage::ALL {
        println!("{:<22} {:>6}", stage.label(), summary.count(stage));
    }
    println!("{:<22} {:>6}", "Total", summary.total);
    Ok(())
}
