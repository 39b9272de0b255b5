use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde_json::{json, Value};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinSchema {
    Immigration,
    Legal,
    Client,
}

/// A named JSON schema plus the document type hint sent with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    pub id: String,
    pub document_type: Option<String>,
    pub schema: Value,
}

impl ExtractionSchema {
    pub fn builtin(kind: BuiltinSchema) -> Self {
        match kind {
            BuiltinSchema::Immigration => Self {
                id: "immigration".into(),
                document_type: Some("immigration".into()),
                schema: immigration_schema(),
            },
            BuiltinSchema::Legal => Self {
                id: "legal".into(),
                document_type: Some("legal memo".into()),
                schema: legal_memo_schema(),
            },
            BuiltinSchema::Client => Self {
                id: "client".into(),
                document_type: Some("client case".into()),
                schema: client_case_schema(),
            },
        }
    }

    /// Loads a custom schema; it must be a JSON object with `"type": "object"`.
    pub fn from_file(path: &Path, document_type: Option<String>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading schema: {}", path.display()))?;
        let schema: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing schema JSON: {}", path.display()))?;
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(anyhow!(
                "schema {} must be a JSON object schema (\"type\": \"object\")",
                path.display()
            ));
        }
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".into());
        Ok(Self {
            id,
            document_type,
            schema,
        })
    }
}

fn date(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn string_list() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn immigration_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "document_type": {
                "type": "string",
                "description": "Type of immigration document (e.g., I-130, I-589)"
            },
            "personal_info": {
                "type": "object",
                "properties": {
                    "full_name": {"type": "string"},
                    "dob": date("Date of birth (YYYY-MM-DD)"),
                    "country_of_birth": {"type": "string"},
                    "nationality": {"type": "string"},
                    "gender": {"type": "string"},
                    "a_number": {"type": "string", "description": "Alien registration number"},
                    "ssn": {"type": "string", "description": "Social Security Number if present"}
                }
            },
            "contact_info": {
                "type": "object",
                "properties": {
                    "address": {"type": "string"},
                    "phone": {"type": "string"},
                    "email": {"type": "string"}
                }
            },
            "application_info": {
                "type": "object",
                "properties": {
                    "receipt_number": {"type": "string"},
                    "filing_date": date("Date filed (YYYY-MM-DD)"),
                    "status": {"type": "string", "description": "Current application status"},
                    "priority_date": date("Priority date if applicable (YYYY-MM-DD)")
                }
            },
            "family_members": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "full_name": {"type": "string"},
                        "relationship": {"type": "string"},
                        "dob": date("Date of birth (YYYY-MM-DD)"),
                        "a_number": {"type": "string", "description": "Alien registration number if available"}
                    }
                }
            }
        }
    })
}

fn legal_memo_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "date": date("Date of memo (YYYY-MM-DD)"),
            "author": {"type": "string"},
            "recipients": string_list(),
            "subject": {"type": "string"},
            "case_identifier": {"type": "string"},
            "summary": {"type": "string", "description": "Brief summary of the memo content"},
            "key_facts": string_list(),
            "legal_issues": string_list(),
            "analysis": {"type": "string"},
            "conclusion": {"type": "string"},
            "recommendations": string_list(),
            "cited_sources": string_list()
        }
    })
}

fn client_case_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "client_info": {
                "type": "object",
                "properties": {
                    "full_name": {"type": "string"},
                    "dob": date("Date of birth (YYYY-MM-DD)"),
                    "country_of_origin": {"type": "string"},
                    "immigration_status": {"type": "string"},
                    "a_number": {"type": "string"},
                    "date_of_entry": date("Date entered US (YYYY-MM-DD)")
                }
            },
            "case_details": {
                "type": "object",
                "properties": {
                    "case_type": {"type": "string", "description": "Type of case (e.g., asylum, removal, PD request)"},
                    "case_number": {"type": "string"},
                    "filing_date": date("Date case filed (YYYY-MM-DD)"),
                    "court_or_agency": {"type": "string"},
                    "next_hearing_date": date("Next scheduled hearing (YYYY-MM-DD)")
                }
            },
            "pd_factors": {
                "type": "object",
                "properties": {
                    "presence_duration": {"type": "string", "description": "Length of time in the US"},
                    "family_ties": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "relationship": {"type": "string"},
                                "status": {"type": "string", "description": "Immigration/citizenship status"},
                                "living_together": {"type": "boolean"}
                            }
                        }
                    },
                    "medical_conditions": string_list(),
                    "primary_caregiver": {"type": "boolean"},
                    "cooperation_with_law_enforcement": {"type": "string"},
                    "criminal_history": {"type": "string"},
                    "military_service": {"type": "string"}
                }
            },
            "legal_representatives": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "firm": {"type": "string"},
                        "contact_info": {"type": "string"}
                    }
                }
            }
        }
    })
}
