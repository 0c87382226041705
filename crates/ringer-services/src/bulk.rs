//! Bulk trunk export and import validation
//!
//! Exports render a set of trunks as a JSON document or a CSV sheet. Imports
//! are checked row by row before anything is submitted; every problem is
//! reported with the row it came from so the operator can fix the file.

use crate::constants::MIN_NAME_LEN;
use crate::validation::validate_trunk;
use chrono::{DateTime, Utc};
use ringer_core::models::{SipTrunk, TrunkStatus, TrunkType};
use ringer_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Version stamped on JSON exports
pub const EXPORT_VERSION: &str = "1.0";

/// Stands in for secrets left out of an export
pub const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// What goes into an export besides the trunk identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub include_rates: bool,
    pub include_stats: bool,
    /// Passwords are replaced with a marker unless set
    pub include_secrets: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_rates: true,
            include_stats: true,
            include_secrets: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportDocument {
    export_date: DateTime<Utc>,
    version: &'static str,
    trunks: Vec<Value>,
}

fn redact(trunk: &mut SipTrunk) {
    if let Some(credentials) = trunk.authentication.credentials.as_mut() {
        credentials.password = REDACTED.to_string();
    }
    if let Some(credentials) = trunk
        .connection
        .as_mut()
        .and_then(|c| c.credentials.as_mut())
    {
        credentials.password = REDACTED.to_string();
    }
}

/// Render trunks in the requested format
pub fn export_trunks(
    trunks: &[SipTrunk],
    format: ExportFormat,
    options: &ExportOptions,
) -> AppResult<String> {
    match format {
        ExportFormat::Csv => export_csv(trunks, options),
        ExportFormat::Json => export_json(trunks, options, Utc::now()),
    }
}

/// JSON export document
///
/// `{ "export_date", "version", "trunks": [...] }`. Rates (with overrides)
/// and stats are dropped from each trunk unless asked for.
#[instrument(skip(trunks, options), fields(count = trunks.len()))]
pub fn export_json(
    trunks: &[SipTrunk],
    options: &ExportOptions,
    exported_at: DateTime<Utc>,
) -> AppResult<String> {
    let mut rendered = Vec::with_capacity(trunks.len());
    for trunk in trunks {
        let mut trunk = trunk.clone();
        if !options.include_secrets {
            redact(&mut trunk);
        }

        let mut value = serde_json::to_value(&trunk)
            .map_err(|e| AppError::Serialization(format!("Export failed: {}", e)))?;
        if let Some(fields) = value.as_object_mut() {
            if !options.include_rates {
                fields.remove("rates");
                fields.remove("overrides");
            }
            if !options.include_stats {
                fields.remove("stats");
            }
        }
        rendered.push(value);
    }

    let document = ExportDocument {
        export_date: exported_at,
        version: EXPORT_VERSION,
        trunks: rendered,
    };
    serde_json::to_string_pretty(&document)
        .map_err(|e| AppError::Serialization(format!("Export failed: {}", e)))
}

const CSV_HEADERS: [&str; 8] = [
    "Name",
    "Type",
    "Status",
    "Description",
    "IP Addresses",
    "SIP Port",
    "Auth Method",
    "Partition",
];

const CSV_RATE_HEADERS: [&str; 2] = ["Rate Zones", "Default Rate"];

const CSV_STATS_HEADERS: [&str; 4] = ["Active Calls", "Today Minutes", "ASR", "ACD"];

fn csv_row(trunk: &SipTrunk, options: &ExportOptions) -> Vec<String> {
    let basic = &trunk.basic;
    let mut row = vec![
        basic.name.clone(),
        basic.trunk_type.to_string().to_lowercase(),
        basic.status.to_string(),
        basic.description.clone().unwrap_or_default(),
        trunk
            .authentication
            .ip_whitelist
            .iter()
            .map(|entry| entry.ip.trim())
            .collect::<Vec<_>>()
            .join(";"),
        trunk
            .connection
            .as_ref()
            .map(|c| c.effective_port().to_string())
            .unwrap_or_default(),
        trunk.authentication.auth_type.to_string(),
        trunk
            .routing
            .ordered_partitions()
            .iter()
            .map(|p| p.machine_id.as_str())
            .collect::<Vec<_>>()
            .join(";"),
    ];

    if options.include_rates {
        row.push(trunk.rates.zones.len().to_string());
        row.push(
            trunk
                .rates
                .zones
                .values()
                .next()
                .map(|z| z.rate.to_string())
                .unwrap_or_default(),
        );
    }

    if options.include_stats {
        let stats = trunk.stats.clone().unwrap_or_default();
        row.push(stats.active_calls.to_string());
        row.push(stats.today_minutes.to_string());
        row.push(stats.asr.to_string());
        row.push(stats.acd.to_string());
    }

    row
}

/// CSV sheet, one trunk per line
///
/// Addresses and partitions are `;`-joined. Secrets never appear in CSV.
#[instrument(skip(trunks, options), fields(count = trunks.len()))]
pub fn export_csv(trunks: &[SipTrunk], options: &ExportOptions) -> AppResult<String> {
    let mut headers: Vec<&str> = CSV_HEADERS.to_vec();
    if options.include_rates {
        headers.extend(CSV_RATE_HEADERS);
    }
    if options.include_stats {
        headers.extend(CSV_STATS_HEADERS);
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&headers)
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    for trunk in trunks {
        wtr.write_record(csv_row(trunk, options))
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

/// A problem found in one row of an import
///
/// Row 0 refers to the document as a whole. CSV rows count the header as
/// row 1; JSON rows are 1-based positions in the `trunks` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ImportIssue {
    fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of checking an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// No errors anywhere in the document
    pub success: bool,
    /// Rows that passed every check
    pub imported: usize,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
}

impl ImportResult {
    fn fail(field: &str, message: impl Into<String>, row: usize) -> Self {
        Self {
            success: false,
            imported: 0,
            errors: vec![ImportIssue::new(row, field, message)],
            warnings: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self
    }
}

/// Check an import document without submitting anything
///
/// A document starting with `{` is read as a JSON export; anything else as
/// CSV with at least `Name` and `Type` columns.
#[instrument(skip(data), fields(bytes = data.len()))]
pub fn validate_import(data: &str) -> ImportResult {
    let data = data.trim();
    if data.is_empty() {
        return ImportResult::fail("data", "Import data is empty", 0);
    }

    let result = if data.starts_with('{') {
        validate_json_import(data)
    } else {
        validate_csv_import(data)
    };
    debug!(
        imported = result.imported,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Import checked"
    );
    result
}

fn validate_json_import(data: &str) -> ImportResult {
    let document: Value = match serde_json::from_str(data) {
        Ok(document) => document,
        Err(e) => return ImportResult::fail("parsing", format!("Failed to parse JSON: {}", e), 0),
    };
    let Some(rows) = document.get("trunks").and_then(Value::as_array) else {
        return ImportResult::fail("structure", "A 'trunks' array is required", 0);
    };

    let mut result = ImportResult::default();
    for (i, raw) in rows.iter().enumerate() {
        let row = i + 1;
        let errors_before = result.errors.len();

        let basic = raw.get("basic");
        let name = basic.and_then(|b| b.get("name")).and_then(Value::as_str);
        if name.map_or(true, |n| n.trim().is_empty()) {
            result.errors.push(ImportIssue::new(row, "basic.name", "Trunk name is required"));
        }
        if basic.and_then(|b| b.get("type")).is_none() {
            result.errors.push(ImportIssue::new(row, "basic.type", "Trunk type is required"));
        }

        if result.errors.len() == errors_before {
            match serde_json::from_value::<SipTrunk>(raw.clone()) {
                Ok(trunk) => check_trunk(row, &trunk, &mut result),
                Err(e) => result
                    .errors
                    .push(ImportIssue::new(row, "trunk", format!("Not a valid trunk: {}", e))),
            }
        }

        if result.errors.len() == errors_before {
            result.imported += 1;
        }
    }
    result.finish()
}

fn check_trunk(row: usize, trunk: &SipTrunk, result: &mut ImportResult) {
    let validation = validate_trunk(trunk);
    result.errors.extend(
        validation
            .errors()
            .map(|issue| ImportIssue::new(row, issue.field.clone(), issue.message.clone())),
    );
    result.warnings.extend(
        validation
            .warnings()
            .map(|issue| ImportIssue::new(row, issue.field.clone(), issue.message.clone())),
    );

    let redacted = trunk
        .authentication
        .credentials
        .as_ref()
        .is_some_and(|c| c.password == REDACTED);
    if redacted {
        result.warnings.push(ImportIssue::new(
            row,
            "authentication.credentials.password",
            "Password was redacted on export and must be set again",
        ));
    }
    let carrier_redacted = trunk
        .connection
        .as_ref()
        .and_then(|c| c.credentials.as_ref())
        .is_some_and(|c| c.password == REDACTED);
    if carrier_redacted {
        result.warnings.push(ImportIssue::new(
            row,
            "connection.credentials.password",
            "Password was redacted on export and must be set again",
        ));
    }
}

fn validate_csv_import(data: &str) -> ImportResult {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return ImportResult::fail("parsing", format!("Failed to parse CSV: {}", e), 0),
    };
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(name_col), Some(type_col)) = (column("Name"), column("Type")) else {
        return ImportResult::fail("headers", "Required columns 'Name' and 'Type' not found", 1);
    };
    let status_col = column("Status");

    let mut result = ImportResult::default();
    for (i, record) in reader.records().enumerate() {
        let row = i + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                result
                    .errors
                    .push(ImportIssue::new(row, "parsing", format!("Unreadable row: {}", e)));
                continue;
            }
        };
        let errors_before = result.errors.len();

        let name = record.get(name_col).unwrap_or("");
        if name.chars().count() < MIN_NAME_LEN {
            result.errors.push(ImportIssue::new(
                row,
                "Name",
                format!("Name is required and must be at least {} characters", MIN_NAME_LEN),
            ));
        }

        let trunk_type = record.get(type_col).unwrap_or("");
        if TrunkType::from_str(trunk_type).is_none() {
            result.errors.push(ImportIssue::new(
                row,
                "Type",
                "Type must be 'customer' or 'vendor'",
            ));
        }

        if let Some(status) = status_col.and_then(|col| record.get(col)) {
            if !status.is_empty() && TrunkStatus::from_str(status).is_none() {
                result.warnings.push(ImportIssue::new(
                    row,
                    "Status",
                    format!("Unknown status '{}' will be ignored", status),
                ));
            }
        }

        if result.errors.len() == errors_before {
            result.imported += 1;
        }
    }
    result.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ringer_core::models::CarrierCredentials;
    use ringer_core::samples;

    fn fixed_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_trunks() -> Vec<SipTrunk> {
        vec![samples::acme_hq_customer(), samples::att_interstate_vendor()]
    }

    #[test]
    fn test_json_export_redacts_secrets() {
        let mut trunks = sample_trunks();
        if let Some(connection) = trunks[1].connection.as_mut() {
            connection.credentials = Some(CarrierCredentials {
                username: "ringer".to_string(),
                password: "carrier-secret".to_string(),
            });
        }
        let customer_password = trunks[0]
            .authentication
            .credentials
            .as_ref()
            .map(|c| c.password.clone())
            .unwrap();

        let json = export_json(&trunks, &ExportOptions::default(), fixed_date()).unwrap();
        assert!(!json.contains(&customer_password));
        assert!(!json.contains("carrier-secret"));

        let document: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(document["version"], "1.0");
        assert_eq!(document["trunks"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            document["trunks"][0]["authentication"]["credentials"]["password"],
            REDACTED
        );

        let options = ExportOptions {
            include_secrets: true,
            ..Default::default()
        };
        let json = export_json(&trunks, &options, fixed_date()).unwrap();
        assert!(json.contains("carrier-secret"));
    }

    #[test]
    fn test_json_export_drops_rates_when_asked() {
        let options = ExportOptions {
            include_rates: false,
            include_stats: false,
            include_secrets: false,
        };
        let json = export_json(&sample_trunks(), &options, fixed_date()).unwrap();
        let document: Value = serde_json::from_str(&json).unwrap();
        let first = &document["trunks"][0];
        assert!(first.get("rates").is_none());
        assert!(first.get("overrides").is_none());
        assert!(first.get("stats").is_none());
        assert!(first.get("basic").is_some());
    }

    #[test]
    fn test_csv_export_columns() {
        let csv = export_csv(&sample_trunks(), &ExportOptions::default()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "Name,Type,Status,Description,IP Addresses,SIP Port,Auth Method,Partition,\
                 Rate Zones,Default Rate,Active Calls,Today Minutes,ASR,ACD"
            )
        );

        let customer = lines.next().unwrap();
        assert!(customer.contains("192.168.1.100;192.168.1.101"));
        assert!(customer.contains(",customer,"));
        assert_eq!(lines.count(), 1);

        let options = ExportOptions {
            include_rates: false,
            include_stats: false,
            include_secrets: true,
        };
        let csv = export_csv(&sample_trunks(), &options).unwrap();
        assert!(csv.starts_with("Name,Type,Status,Description,IP Addresses,SIP Port,Auth Method,Partition\n"));
    }

    #[test]
    fn test_exports_reimport_cleanly() {
        let trunks = sample_trunks();

        let csv = export_csv(&trunks, &ExportOptions::default()).unwrap();
        let result = validate_import(&csv);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.imported, 2);

        let options = ExportOptions {
            include_secrets: true,
            ..Default::default()
        };
        let json = export_json(&trunks, &options, fixed_date()).unwrap();
        let result = validate_import(&json);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.imported, 2);
    }

    #[test]
    fn test_redacted_json_import_warns() {
        let json = export_json(
            &[samples::acme_hq_customer()],
            &ExportOptions::default(),
            fixed_date(),
        )
        .unwrap();
        let result = validate_import(&json);
        assert!(result.success);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.row == 1 && w.field == "authentication.credentials.password"));
    }

    #[test]
    fn test_csv_import_row_errors() {
        let data = "Name,Type,Status\n\
                    Acme Backup,customer,active\n\
                    ab,carrier,active\n\
                    Telnyx Intl,VENDOR,paused\n";
        let result = validate_import(data);

        assert!(!result.success);
        assert_eq!(result.imported, 2);
        assert_eq!(
            result.errors,
            vec![
                ImportIssue::new(3, "Name", "Name is required and must be at least 3 characters"),
                ImportIssue::new(3, "Type", "Type must be 'customer' or 'vendor'"),
            ]
        );
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].row, 4);
        assert_eq!(result.warnings[0].field, "Status");
    }

    #[test]
    fn test_csv_import_requires_headers() {
        let result = validate_import("Title,Kind\nAcme,customer\n");
        assert!(!result.success);
        assert_eq!(result.errors[0].row, 1);
        assert_eq!(result.errors[0].field, "headers");
    }

    #[test]
    fn test_json_import_structure_and_rows() {
        let result = validate_import("{\"items\": []}");
        assert_eq!(result.errors[0].field, "structure");

        let result = validate_import("{ not json");
        assert_eq!(result.errors[0].field, "parsing");
        assert_eq!(result.errors[0].row, 0);

        let mut vendor = serde_json::to_value(samples::att_interstate_vendor()).unwrap();
        vendor["basic"]["ban"] = Value::String("BAN-9".to_string());
        let document = serde_json::json!({
            "trunks": [
                { "basic": { "type": "customer" } },
                vendor,
                serde_json::to_value(samples::acme_hq_customer()).unwrap(),
            ]
        });
        let result = validate_import(&document.to_string());

        assert!(!result.success);
        assert_eq!(result.imported, 1);
        assert!(result.errors.iter().any(|e| e.row == 1 && e.field == "basic.name"));
        assert!(result.errors.iter().any(|e| e.row == 2 && e.field == "basic.ban"));
        assert!(result.errors.iter().all(|e| e.row != 3));
    }

    #[test]
    fn test_empty_import() {
        let result = validate_import("   ");
        assert!(!result.success);
        assert_eq!(result.errors[0].field, "data");
    }
}
