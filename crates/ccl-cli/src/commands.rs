use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use ccl_ledger::{CreditConverter, CreditLedger, Reading};
use ccl_server::{AppState, CclServer};
use ccl_types::LedgerEntry;

use crate::cli::*;
use crate::config::AppConfig;

/// How a successful command ended. `Findings` means the command ran but
/// found a problem (failed verification, unknown entry) and the process
/// should exit non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    Findings,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ExitCode::SUCCESS,
            Status::Findings => ExitCode::FAILURE,
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<Status> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.ledger.data_dir = dir;
    }
    let out = Output { format: cli.format };

    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Add(args) => cmd_add(&config, &out, args),
        Command::Record(args) => cmd_record(&config, &out, args),
        Command::List(args) => cmd_list(&config, &out, args),
        Command::Show(args) => cmd_show(&config, &out, args),
        Command::Device(args) => cmd_device(&config, &out, args),
        Command::Verify => cmd_verify(&config, &out),
        Command::Stats => cmd_stats(&config, &out),
        Command::Export(args) => cmd_export(&config, args),
        Command::Checkpoint => cmd_checkpoint(&config),
    }
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn open_ledger(config: &AppConfig) -> anyhow::Result<CreditLedger> {
    config
        .ledger
        .open()
        .with_context(|| format!("opening ledger in {}", config.ledger.data_dir.display()))
}

fn converter(config: &AppConfig) -> anyhow::Result<CreditConverter> {
    Ok(config.converter.converter()?)
}

fn cmd_serve(config: AppConfig, args: ServeArgs) -> anyhow::Result<Status> {
    let ledger = Arc::new(open_ledger(&config)?);
    let state = AppState::new(ledger, converter(&config)?);
    let mut server_config = config.server;
    if let Some(bind) = args.bind {
        server_config.bind_addr = bind;
    }
    println!(
        "{} CCL server on {} (data: {})",
        "✓".green().bold(),
        server_config.bind_addr.to_string().bold(),
        config.ledger.data_dir.display()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(CclServer::new(server_config, state).serve())?;
    Ok(Status::Ok)
}

fn cmd_add(config: &AppConfig, out: &Output, args: AddArgs) -> anyhow::Result<Status> {
    let payload: serde_json::Value =
        serde_json::from_str(&args.payload).context("payload is not valid JSON")?;
    let ledger = open_ledger(config)?;
    let entry = ledger.add_entry(payload)?;
    if out.json() {
        out.print_json(&entry)?;
    } else {
        println!("{} Recorded {}", "✓".green().bold(), entry.id.to_string().yellow());
        print_entry(&entry);
    }
    Ok(Status::Ok)
}

fn cmd_record(config: &AppConfig, out: &Output, args: RecordArgs) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let converter = converter(config)?;
    let mut reading = Reading::new(args.device_id, args.kwh);
    reading.profile_type = args.profile;
    reading.location = args.location;

    let entry = converter.process_reading(&ledger, &reading)?;
    if out.json() {
        out.print_json(&entry)?;
    } else {
        println!(
            "{} {} kWh from {} → {} kg CO₂",
            "✓".green().bold(),
            reading.kwh,
            reading.device_id.cyan(),
            entry.credits().to_string().bold()
        );
        println!("  Entry: {}", entry.id.to_string().yellow());
    }
    Ok(Status::Ok)
}

fn cmd_list(config: &AppConfig, out: &Output, args: ListArgs) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let mut entries = ledger.entries();
    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    if out.json() {
        out.print_json(&serde_json::json!({ "count": entries.len(), "entries": entries }))?;
    } else if entries.is_empty() {
        println!("Ledger is empty.");
    } else {
        for entry in &entries {
            print_entry_line(entry);
        }
    }
    Ok(Status::Ok)
}

fn cmd_show(config: &AppConfig, out: &Output, args: ShowArgs) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let Some(entry) = ledger.entry(&args.id) else {
        eprintln!("{} entry not found: {}", "✗".red().bold(), args.id);
        return Ok(Status::Findings);
    };
    if out.json() {
        out.print_json(&entry)?;
    } else {
        let status = if ledger.signer().verify(&entry) {
            "valid".green()
        } else {
            "INVALID".red().bold()
        };
        println!("Entry {} (signature {})", entry.id.to_string().yellow().bold(), status);
        print_entry(&entry);
    }
    Ok(Status::Ok)
}

fn cmd_device(config: &AppConfig, out: &Output, args: DeviceArgs) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let entries = ledger.entries_by_device(&args.device_id);
    let total = converter(config)?.credits_by_device(&ledger, &args.device_id);
    if out.json() {
        out.print_json(&serde_json::json!({
            "deviceId": args.device_id,
            "count": entries.len(),
            "totalCredits": total,
            "entries": entries,
        }))?;
    } else {
        println!(
            "Device {}: {} entries, {} kg CO₂",
            args.device_id.cyan().bold(),
            entries.len(),
            total.to_string().bold()
        );
        for entry in &entries {
            print_entry_line(entry);
        }
    }
    Ok(Status::Ok)
}

fn cmd_verify(config: &AppConfig, out: &Output) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let report = ledger.verify_integrity();
    if out.json() {
        out.print_json(&report)?;
    } else if report.is_intact() {
        println!("{} Ledger integrity verified", "✓".green().bold());
        println!("  Entries: {}", report.total_entries.to_string().bold());
        println!("  Algorithm: {}", ledger.signer().algorithm().as_str().cyan());
    } else {
        println!(
            "{} {} of {} entries failed verification",
            "✗".red().bold(),
            report.invalid_entries.to_string().red().bold(),
            report.total_entries
        );
        for id in &report.invalid_ids {
            println!("  {}", id.to_string().red());
        }
    }
    Ok(if report.is_intact() {
        Status::Ok
    } else {
        Status::Findings
    })
}

fn cmd_stats(config: &AppConfig, out: &Output) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let stats = ledger.stats();
    let conversion = converter(config)?.conversion_stats(&ledger);
    if out.json() {
        out.print_json(&serde_json::json!({ "ledger": stats, "conversion": conversion }))?;
        return Ok(Status::Ok);
    }

    let metadata = ledger.metadata();
    println!("{} ({})", metadata.name.bold(), metadata.version.dimmed());
    println!("  Entries: {}", stats.total_entries.to_string().bold());
    println!("  Devices: {}", stats.total_devices);
    println!("  Credits: {} kg CO₂", stats.total_credits.to_string().green());
    println!("  Energy: {} kWh", conversion.total_kwh);
    println!("  Avg. emission factor: {}", conversion.average_emission_factor);
    if let (Some(first), Some(last)) = (stats.first_entry_date, stats.last_entry_date) {
        println!("  First entry: {}", first);
        println!("  Last entry: {}", last);
    }
    Ok(Status::Ok)
}

fn cmd_export(config: &AppConfig, args: ExportArgs) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    let document = ledger.export()?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, document)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} Exported {} entries to {}",
                "✓".green().bold(),
                ledger.len(),
                path.display()
            );
        }
        None => println!("{document}"),
    }
    Ok(Status::Ok)
}

fn cmd_checkpoint(config: &AppConfig) -> anyhow::Result<Status> {
    let ledger = open_ledger(config)?;
    ledger.checkpoint()?;
    println!("{} Checkpoint written ({} entries)", "✓".green().bold(), ledger.len());
    Ok(Status::Ok)
}

fn print_entry_line(entry: &LedgerEntry) {
    println!(
        "{}  {}  {:<16} {}",
        entry.id.to_string().yellow(),
        entry.timestamp.to_string().dimmed(),
        entry.device_id().unwrap_or("-").cyan(),
        entry.credits()
    );
}

fn print_entry(entry: &LedgerEntry) {
    println!("  Timestamp: {}", entry.timestamp);
    if let Some(device) = entry.device_id() {
        println!("  Device: {}", device.cyan());
    }
    println!("  Credits: {}", entry.credits());
    println!("  Signature: {}", entry.signature.dimmed());
    match serde_json::to_string_pretty(&entry.data) {
        Ok(data) => println!("  Data: {data}"),
        Err(_) => println!("  Data: <unprintable>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccl_ledger::LedgerConfig;

    fn config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            ledger: LedgerConfig {
                data_dir: dir.to_path_buf(),
                secret_key: Some("cli-key".parse().unwrap()),
                ..LedgerConfig::default()
            },
            ..AppConfig::default()
        }
    }

    fn text() -> Output {
        Output { format: OutputFormat::Text }
    }

    #[test]
    fn add_record_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let add = AddArgs { payload: r#"{"deviceId":"sim-1","carbonCredits":5}"#.into() };
        assert_eq!(cmd_add(&config, &text(), add).unwrap(), Status::Ok);
        let record = RecordArgs {
            device_id: "sim-1".into(),
            kwh: 2.0,
            profile: None,
            location: Some("Recife".into()),
        };
        assert_eq!(cmd_record(&config, &text(), record).unwrap(), Status::Ok);

        let ledger = open_ledger(&config).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.stats().total_credits, 7.0);
        drop(ledger);
        assert_eq!(cmd_verify(&config, &text()).unwrap(), Status::Ok);
    }

    #[test]
    fn invalid_payload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        assert!(cmd_add(&config, &text(), AddArgs { payload: "{oops".into() }).is_err());
        assert!(cmd_add(&config, &text(), AddArgs { payload: "[1]".into() }).is_err());
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let add = AddArgs { payload: r#"{"deviceId":"sim-1"}"#.into() };
        cmd_add(&config, &text(), add).unwrap();

        let mut other = config.clone();
        other.ledger.secret_key = Some("different".parse().unwrap());
        assert_eq!(cmd_verify(&other, &text()).unwrap(), Status::Findings);
    }

    #[test]
    fn missing_entry_exits_non_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let show = ShowArgs { id: "ccl-0-deadbeef".into() };
        assert_eq!(cmd_show(&config, &text(), show).unwrap(), Status::Findings);
    }

    #[test]
    fn export_writes_the_snapshot_document() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir.path().join("data"));
        let add = AddArgs { payload: r#"{"deviceId":"sim-1"}"#.into() };
        cmd_add(&config, &text(), add).unwrap();

        let output = dir.path().join("export.json");
        cmd_export(&config, ExportArgs { output: Some(output.clone()) }).unwrap();
        let exported = ccl_types::Ledger::from_json(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(exported.entries.len(), 1);
        assert!(exported.metadata.is_some());
    }

    #[test]
    fn missing_secret_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.ledger.secret_key = None;
        assert!(cmd_stats(&config, &text()).is_err());
    }
}
