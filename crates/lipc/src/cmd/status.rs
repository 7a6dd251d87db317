use serde::Serialize;

use lipc_client::{StatusCode, STATUS_TABLE};

use crate::cmd::StatusArgs;
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_json, print_pretty, print_rows, OutputFormat};

#[derive(Serialize)]
struct StatusOutput {
    code: u32,
    hex: String,
    name: &'static str,
    known: bool,
}

impl StatusOutput {
    fn new(code: u32) -> Self {
        let status = StatusCode(code);
        Self {
            code,
            hex: format!("{code:#x}"),
            name: status.name(),
            known: STATUS_TABLE.iter().any(|(c, _)| *c == code),
        }
    }

    fn row(&self) -> Vec<String> {
        vec![self.code.to_string(), self.hex.clone(), self.name.to_string()]
    }
}

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let entries: Vec<StatusOutput> = match args.code.as_deref() {
        Some(raw) => vec![StatusOutput::new(parse_code(raw)?)],
        None => STATUS_TABLE
            .iter()
            .map(|(code, _)| StatusOutput::new(*code))
            .collect(),
    };

    match format {
        OutputFormat::Json => match (args.code.is_some(), entries.first()) {
            (true, Some(entry)) => print_json(entry),
            _ => print_json(&entries),
        },
        OutputFormat::Table => {
            print_rows(&["CODE", "HEX", "NAME"], entries.iter().map(StatusOutput::row).collect())
        }
        OutputFormat::Pretty => {
            let lines: Vec<(&str, String)> = entries
                .iter()
                .map(|e| (e.name, e.hex.clone()))
                .collect();
            print_pretty(&lines);
        }
        OutputFormat::Raw => {
            for entry in &entries {
                println!("{}", entry.name);
            }
        }
    }
    Ok(SUCCESS)
}

/// Decimal, or hex with a `0x`/`0X` prefix.
fn parse_code(raw: &str) -> CliResult<u32> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => raw.parse::<u32>(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid status code '{raw}'")))
}
