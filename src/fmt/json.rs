#[cfg(feature = "json")]
use serde::Serialize;

use crate::domain::ntp::PollReport;
use crate::error::NtpmanError;
use crate::stats::Stats;

#[cfg(feature = "json")]
#[derive(Serialize)]
pub struct JsonReport {
    pub schema_version: u8,
    pub pass: u32,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stratum: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

#[cfg(feature = "json")]
#[derive(Serialize)]
pub struct JsonStats<'a> {
    pub schema_version: u8,
    pub target: &'a str,
    #[serde(flatten)]
    pub stats: &'a Stats,
}

#[cfg(feature = "json")]
fn report_to_json_value(r: &PollReport) -> JsonReport {
    let mut out = JsonReport {
        schema_version: 1,
        pass: r.pass,
        target: r.target.clone(),
        responder: r.responder.map(|a| a.to_string()),
        names: r.names.clone(),
        version: None,
        stratum: None,
        ref_id: None,
        leap: None,
        rtt_ms: None,
        offset_ms: None,
        utc: None,
        error: None,
        error_kind: None,
    };
    match &r.outcome {
        Ok(res) => {
            out.version = Some(res.header.version);
            out.stratum = Some(res.header.stratum);
            out.ref_id = Some(res.header.reference_id_string());
            out.leap = Some(res.header.leap.to_string());
            out.rtt_ms = Some(res.rtt_ms());
            out.offset_ms = Some(res.offset_ms());
            out.utc = Some(res.received_at.to_rfc3339());
        }
        Err(e) => {
            out.error = Some(e.to_string());
            out.error_kind = Some(e.kind());
        }
    }
    out
}

/// Serialize one report as a JSON object.
#[allow(unused_variables)]
pub fn report_to_json(r: &PollReport, pretty: bool) -> Result<String, NtpmanError> {
    #[cfg(feature = "json")]
    {
        let value = report_to_json_value(r);
        let text = if pretty {
            serde_json::to_string_pretty(&value).map_err(|e| NtpmanError::Other(e.to_string()))?
        } else {
            serde_json::to_string(&value).map_err(|e| NtpmanError::Other(e.to_string()))?
        };
        Ok(text)
    }
    #[cfg(not(feature = "json"))]
    {
        Err(NtpmanError::Other("json feature disabled".into()))
    }
}

/// Serialize a per-target summary as a JSON array.
#[allow(unused_variables)]
pub fn stats_list_to_json(list: &[(String, Stats)], pretty: bool) -> Result<String, NtpmanError> {
    #[cfg(feature = "json")]
    {
        let values: Vec<JsonStats<'_>> = list
            .iter()
            .map(|(name, stats)| JsonStats {
                schema_version: 1,
                target: name,
                stats,
            })
            .collect();
        let text = if pretty {
            serde_json::to_string_pretty(&values).map_err(|e| NtpmanError::Other(e.to_string()))?
        } else {
            serde_json::to_string(&values).map_err(|e| NtpmanError::Other(e.to_string()))?
        };
        Ok(text)
    }
    #[cfg(not(feature = "json"))]
    {
        Err(NtpmanError::Other("json feature disabled".into()))
    }
}
