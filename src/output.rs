// src/output.rs
use crate::engine::{LookupMatch, LookupResult};
use crate::types::{ExecuteDetails, McQueryError, OutputConfig, OutputFormat, ServerStatus};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct QueryReport<'a> {
    ok: bool,
    status: Option<&'a ServerStatus>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a ExecuteDetails>,
}

#[derive(Serialize)]
struct LookupReport<'a> {
    cancelled: bool,
    attempts: usize,
    completed: usize,
    matches: Vec<&'a LookupMatch>,
}

fn io_err(e: std::io::Error) -> McQueryError {
    McQueryError::OutputError(e.to_string())
}

pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn write_query(
        &self,
        result: &Result<ServerStatus, McQueryError>,
        details: &ExecuteDetails,
    ) -> Result<(), McQueryError> {
        self.emit(|writer| self.render_query(writer, result, details))
    }

    pub fn write_lookup(&self, result: &LookupResult, cancelled: bool) -> Result<(), McQueryError> {
        self.emit(|writer| self.render_lookup(writer, result, cancelled))
    }

    fn emit<F>(&self, render: F) -> Result<(), McQueryError>
    where
        F: Fn(&mut dyn Write) -> Result<(), McQueryError>,
    {
        match &self.config.file {
            Some(file_path) => {
                if let Some(parent) = Path::new(file_path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| McQueryError::OutputError(format!("Failed to create directory: {}", e)))?;
                    }
                }
                let mut file = File::create(file_path)
                    .map_err(|e| McQueryError::OutputError(format!("Failed to create file: {}", e)))?;
                render(&mut file)?;
                eprintln!("Results written to: {}", file_path);
                Ok(())
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                render(&mut handle)
            }
        }
    }

    pub fn render_query(
        &self,
        writer: &mut dyn Write,
        result: &Result<ServerStatus, McQueryError>,
        details: &ExecuteDetails,
    ) -> Result<(), McQueryError> {
        match self.config.format {
            OutputFormat::Json => {
                let report = QueryReport {
                    ok: result.is_ok(),
                    status: result.as_ref().ok(),
                    error: result.as_ref().err().map(|e| e.to_string()),
                    details: self.config.verbose.then_some(details),
                };
                write_json(writer, &report)
            }
            OutputFormat::Text => {
                match result {
                    Ok(status) => writeln!(writer, "{}", status.render()).map_err(io_err)?,
                    Err(e) => writeln!(writer, "[!] Query failed: {}", e).map_err(io_err)?,
                }
                if self.config.verbose {
                    writeln!(writer).map_err(io_err)?;
                    write_details(writer, details)?;
                }
                Ok(())
            }
        }
    }

    pub fn render_lookup(
        &self,
        writer: &mut dyn Write,
        result: &LookupResult,
        cancelled: bool,
    ) -> Result<(), McQueryError> {
        let mut matches: Vec<&LookupMatch> = result.matches.iter().collect();
        matches.sort_by(|a, b| a.host.cmp(&b.host));

        match self.config.format {
            OutputFormat::Json => write_json(
                writer,
                &LookupReport {
                    cancelled,
                    attempts: result.attempts,
                    completed: result.completed,
                    matches,
                },
            ),
            OutputFormat::Text => {
                if cancelled {
                    writeln!(writer, "[!] Lookup cancelled, showing partial results").map_err(io_err)?;
                }
                writeln!(
                    writer,
                    "[*] Checked {}/{} candidates, {} responded",
                    result.completed,
                    result.attempts,
                    matches.len()
                )
                .map_err(io_err)?;

                for m in matches {
                    writeln!(writer, "\n[+] {}", m.host).map_err(io_err)?;
                    for line in m.status.render().lines() {
                        writeln!(writer, "    {}", line).map_err(io_err)?;
                    }
                    if self.config.verbose {
                        if let Some(ip) = m.details.selected_ip {
                            writeln!(writer, "    Selected IP: {}", ip).map_err(io_err)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), McQueryError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McQueryError::OutputError(format!("Failed to serialize JSON: {}", e)))?;
    writeln!(writer, "{}", json).map_err(io_err)
}

fn write_details(writer: &mut dyn Write, details: &ExecuteDetails) -> Result<(), McQueryError> {
    let mut lines = vec![format!("Requested: {}:{}", details.requested_host, details.requested_port)];

    if let (Some(host), Some(port)) = (&details.dial_host, details.dial_port) {
        lines.push(format!("Dial: {}:{}", host, port));
    }
    if let Some(ip) = details.selected_ip {
        lines.push(format!("Selected IP: {}", ip));
    }
    if !details.resolved_ips.is_empty() {
        let ips: Vec<String> = details.resolved_ips.iter().map(|ip| ip.to_string()).collect();
        lines.push(format!("Resolved IPs: {}", ips.join(", ")));
    }
    if details.srv_used {
        if let (Some(host), Some(port)) = (&details.srv_host, details.srv_port) {
            lines.push(format!("SRV: {}:{}", host, port));
        }
    } else if let Some(err) = &details.srv_error {
        lines.push(format!("SRV error: {}", err));
    }
    lines.push(format!("Attempts: {}", details.attempts));
    if let Some(err) = &details.last_error {
        lines.push(format!("Last error: {}", err));
    }

    for line in lines {
        writeln!(writer, "{}", line).map_err(io_err)?;
    }
    Ok(())
}
