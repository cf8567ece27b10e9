use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::{Finding, ScanOutcome, ScanReport, SoaInfo};
use crate::error::ScanError;
use crate::input::OutputFormat;
use crate::nearby::NearbyResult;
use crate::zone_transfer::{group_by_name, ZoneRecord};

const FAILURE: &str = "failure";

pub fn format_ns(nameservers: Option<&[String]>) -> String {
    match nameservers {
        Some(names) if !names.is_empty() => format!("NS: {}", names.join(" ")),
        _ => format!("NS: {}", FAILURE),
    }
}

pub fn format_soa(soa: Option<&SoaInfo>) -> String {
    match soa {
        Some(soa) => {
            let master = soa
                .master
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| FAILURE.to_string());
            format!("SOA: {} ({})", soa.mname, master)
        }
        None => format!("SOA: {}", FAILURE),
    }
}

/// 区域传送成功时按名称列出全部记录
pub fn format_zone(zone: Option<&[ZoneRecord]>) -> String {
    let Some(records) = zone else {
        return format!("Zone: {}", FAILURE);
    };

    let mut text = String::from("Zone: success");
    for (name, values) in group_by_name(records) {
        let _ = write!(text, "\n{}", name);
        for value in values {
            let _ = write!(text, "\n    {}", value);
        }
    }
    text
}

pub fn format_wildcard(wildcard: &BTreeSet<Ipv4Addr>) -> String {
    if wildcard.is_empty() {
        return format!("Wildcard: {}", FAILURE);
    }
    let ips: Vec<String> = wildcard.iter().map(|ip| ip.to_string()).collect();
    format!("Wildcard: {}", ips.join(", "))
}

pub fn format_nearby(nearby: &NearbyResult) -> String {
    let mut text = String::from("Nearby:");
    for (ip, name) in nearby {
        let _ = write!(text, "\n    {}: {}", ip, name);
    }
    text
}

/// 一个子域名发现的完整输出
pub fn format_finding(finding: &Finding) -> String {
    let mut text = format!("Found: {} ({})", finding.name, finding.ip);

    if let Some(headers) = finding.http_headers.as_ref().filter(|h| !h.is_empty()) {
        text.push_str("\nHTTP connected:");
        for (name, value) in headers {
            let _ = write!(text, "\n    {}: {}", name, value);
        }
    }

    if !finding.nearby.is_empty() {
        text.push('\n');
        text.push_str(&format_nearby(&finding.nearby));
    }
    text
}

/// 可序列化的 SOA 信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableSoa {
    pub mname: String,
    pub master: Option<String>,
}

/// 可序列化的发现
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableFinding {
    pub name: String,
    pub ip: String,
    pub http_headers: Option<BTreeMap<String, String>>,
    pub nearby: BTreeMap<String, String>,
}

/// 完整的导出数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub domain: Option<String>,
    pub nameservers: Option<Vec<String>>,
    pub soa: Option<SerializableSoa>,
    pub zone: Option<Vec<ZoneRecord>>,
    pub wildcard: Vec<String>,
    pub range_nearby: Option<BTreeMap<String, String>>,
    pub findings: Vec<SerializableFinding>,
    pub outcome: String,
    pub export_time: String,
}

fn serializable_nearby(nearby: &NearbyResult) -> BTreeMap<String, String> {
    nearby
        .iter()
        .map(|(ip, name)| (ip.to_string(), name.clone()))
        .collect()
}

impl From<&SoaInfo> for SerializableSoa {
    fn from(soa: &SoaInfo) -> Self {
        SerializableSoa {
            mname: soa.mname.clone(),
            master: soa.master.map(|ip| ip.to_string()),
        }
    }
}

impl From<&Finding> for SerializableFinding {
    fn from(finding: &Finding) -> Self {
        SerializableFinding {
            name: finding.name.clone(),
            ip: finding.ip.to_string(),
            http_headers: finding
                .http_headers
                .as_ref()
                .map(|headers| headers.iter().cloned().collect()),
            nearby: serializable_nearby(&finding.nearby),
        }
    }
}

impl From<&ScanReport> for ExportData {
    fn from(report: &ScanReport) -> Self {
        let outcome = match report.outcome {
            ScanOutcome::Completed => "completed",
            ScanOutcome::ZoneDisclosed => "zone_disclosed",
        };

        ExportData {
            domain: report.domain.clone(),
            nameservers: report.nameservers.clone(),
            soa: report.soa.as_ref().map(SerializableSoa::from),
            zone: report.zone.clone(),
            wildcard: report.wildcard.iter().map(|ip| ip.to_string()).collect(),
            range_nearby: report.range_nearby.as_ref().map(serializable_nearby),
            findings: report.findings.iter().map(SerializableFinding::from).collect(),
            outcome: outcome.to_string(),
            export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// 导出扫描结果到文件
pub fn export_report(report: &ScanReport, output_path: &Path, format: OutputFormat) -> Result<(), ScanError> {
    let data = ExportData::from(report);
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&data).map_err(|e| ScanError::Export(e.to_string()))?,
        OutputFormat::Csv => export_to_csv(&data),
        OutputFormat::Txt => export_to_txt(&data),
    };

    fs::write(output_path, content)
        .map_err(|e| ScanError::Export(format!("{}: {}", output_path.display(), e)))
}

/// 导出为CSV格式
fn export_to_csv(data: &ExportData) -> String {
    let mut csv = String::new();

    csv.push_str("# findings\n");
    csv.push_str("Name,IP,HTTPHeaders,NearbyCount\n");
    for finding in &data.findings {
        let _ = writeln!(
            csv,
            "{},{},{},{}",
            escape_csv(&finding.name),
            escape_csv(&finding.ip),
            finding.http_headers.as_ref().map_or(0, |h| h.len()),
            finding.nearby.len()
        );
    }

    csv.push_str("\n# nearby\n");
    csv.push_str("Source,IP,ReverseName\n");
    if let Some(range) = &data.range_nearby {
        for (ip, name) in range {
            let _ = writeln!(csv, "range,{},{}", escape_csv(ip), escape_csv(name));
        }
    }
    for finding in &data.findings {
        for (ip, name) in &finding.nearby {
            let _ = writeln!(csv, "{},{},{}", escape_csv(&finding.name), escape_csv(ip), escape_csv(name));
        }
    }

    if let Some(zone) = &data.zone {
        csv.push_str("\n# zone\n");
        csv.push_str("Name,Type,Value\n");
        for record in zone {
            let _ = writeln!(
                csv,
                "{},{},{}",
                escape_csv(&record.name),
                escape_csv(&record.record_type),
                escape_csv(&record.value)
            );
        }
    }

    csv
}

/// 导出为TXT格式
fn export_to_txt(data: &ExportData) -> String {
    let mut txt = String::new();

    txt.push_str("rfierce scan report\n");
    let _ = writeln!(txt, "Export time: {}", data.export_time);
    let _ = writeln!(txt, "{}\n", "=".repeat(60));

    if let Some(domain) = &data.domain {
        let _ = writeln!(txt, "Domain: {}", domain);
        let _ = writeln!(
            txt,
            "NS: {}",
            data.nameservers
                .as_ref()
                .filter(|ns| !ns.is_empty())
                .map_or_else(|| FAILURE.to_string(), |ns| ns.join(" "))
        );
        match &data.soa {
            Some(soa) => {
                let _ = writeln!(txt, "SOA: {} ({})", soa.mname, soa.master.as_deref().unwrap_or(FAILURE));
            }
            None => {
                let _ = writeln!(txt, "SOA: {}", FAILURE);
            }
        }
        let _ = writeln!(txt, "Zone: {}", if data.zone.is_some() { "success" } else { FAILURE });
        let _ = writeln!(
            txt,
            "Wildcard: {}",
            if data.wildcard.is_empty() {
                FAILURE.to_string()
            } else {
                data.wildcard.join(", ")
            }
        );
        txt.push('\n');
    }

    if let Some(range) = &data.range_nearby {
        txt.push_str("Range:\n");
        for (ip, name) in range {
            let _ = writeln!(txt, "  {:<15} {}", ip, name);
        }
        txt.push('\n');
    }

    if let Some(zone) = &data.zone {
        txt.push_str("Zone records:\n");
        for record in zone {
            let _ = writeln!(txt, "  {:<30} {:<6} {}", record.name, record.record_type, record.value);
        }
        txt.push('\n');
    }

    let _ = writeln!(txt, "Findings ({}):", data.findings.len());
    let _ = writeln!(txt, "{:<40} {:<15} {}", "Name", "IP", "Nearby");
    let _ = writeln!(txt, "{}", "-".repeat(70));
    for finding in &data.findings {
        let _ = writeln!(txt, "{:<40} {:<15} {}", finding.name, finding.ip, finding.nearby.len());
        for (ip, name) in &finding.nearby {
            let _ = writeln!(txt, "    {:<15} {}", ip, name);
        }
    }

    txt
}

/// CSV转义
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
