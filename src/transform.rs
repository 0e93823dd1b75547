use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::clean::{
    clean_company_name, clean_created_at, clean_description, clean_location, clean_remote,
    clean_slug, clean_title, normalize_missing,
};
use crate::models::{CleanedJob, RawJob, value_text};
use crate::repair::{MojibakeRepair, TextRepair};
use crate::silver::write_silver;

/// Turns raw listings into silver rows. The repair strategy is shared by
/// every text field that goes through it.
pub struct RecordTransformer {
    repair: Box<dyn TextRepair>,
}

impl Default for RecordTransformer {
    fn default() -> Self {
        Self::new(Box::new(MojibakeRepair))
    }
}

impl RecordTransformer {
    pub fn new(repair: Box<dyn TextRepair>) -> Self {
        Self { repair }
    }

    pub fn repair_name(&self) -> &str {
        self.repair.name()
    }

    pub fn transform(&self, raw: &RawJob) -> CleanedJob {
        let repair = self.repair.as_ref();
        let text = |v: &Option<Value>| value_text(v.as_ref()).map(|t| t.into_owned());

        let (slug_title, job_id) = clean_slug(text(&raw.slug).as_deref());
        let company_name = clean_company_name(repair, text(&raw.company_name).as_deref());
        let title = clean_title(repair, text(&raw.title).as_deref());

        let description = clean_description(repair, text(&raw.description).as_deref());
        let description_length = description.chars().count();

        let location = clean_location(repair, text(&raw.location).as_deref());
        let created = clean_created_at(raw.created_at.as_ref());

        CleanedJob {
            slug_title: normalize_missing(slug_title),
            job_id: normalize_missing(job_id),
            company_name: normalize_missing(company_name),
            title: normalize_missing(title),
            description: normalize_missing(Some(description)),
            description_length,
            remote: clean_remote(raw.remote.as_ref()),
            url: normalize_missing(text(&raw.url)),
            city: normalize_missing(location.city),
            region: normalize_missing(location.region),
            country: normalize_missing(location.country),
            created_at: normalize_missing(created.timestamp),
            created_date: normalize_missing(created.date),
            created_year: normalize_missing(created.year),
            created_month: normalize_missing(created.month),
        }
    }

    /// Cleans every record, keeping input order.
    pub fn transform_all(&self, jobs: &[Value]) -> Vec<CleanedJob> {
        jobs.iter()
            .map(|job| self.transform(&RawJob::from_value(job)))
            .collect()
    }
}

/// Pulls the `data` array out of a bronze envelope. A missing or null
/// array reads as no jobs.
pub fn jobs_from_envelope(payload: Value) -> Vec<Value> {
    match payload {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(jobs)) => jobs,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub fn read_bronze(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bronze file: {}", path.display()))?;
    let payload: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Bronze file is not valid JSON: {}", path.display()))?;
    Ok(jobs_from_envelope(payload))
}

/// Bronze JSON to silver CSV. Returns the number of records written; an
/// empty batch writes nothing and returns 0.
pub fn transform_bronze_to_silver(
    transformer: &RecordTransformer,
    input: &Path,
    output: &Path,
) -> Result<usize> {
    let jobs = read_bronze(input)?;
    if jobs.is_empty() {
        warn!(input = %input.display(), "no jobs found in payload");
        return Ok(0);
    }

    debug!(repair = transformer.repair_name(), count = jobs.len(), "cleaning records");
    let cleaned = transformer.transform_all(&jobs);
    let without_id = cleaned.iter().filter(|job| job.job_id.is_missing()).count();
    if without_id > 0 {
        warn!(without_id, "records without a job id cannot be deduplicated on load");
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(output)
        .with_context(|| format!("Failed to create silver file: {}", output.display()))?;
    write_silver(file, &cleaned)
        .with_context(|| format!("Failed to write silver file: {}", output.display()))?;

    info!(output = %output.display(), records = cleaned.len(), "silver CSV written");
    Ok(cleaned.len())
}
