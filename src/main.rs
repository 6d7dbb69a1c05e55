use anyhow::Context;
use clap::Parser;
use ptr_scale_lint::AnalysisEngine;
use ptr_scale_lint::cli::{Args, CheckArgs, Command, OutputFormat};
use ptr_scale_lint::config;
use ptr_scale_lint::diagnostics::Diagnostic;
use ptr_scale_lint::level::LintLevel;
use ptr_scale_lint::lint::{self, CheckerRegistry, LintSettings};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    ptr_scale_lint::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Check(check)) => check_command(check),
        None => check_command(args.check),
    }
}

fn list_rules() {
    let mut rules: Vec<_> = lint::builtin_checkers()
        .iter()
        .map(|c| c.descriptor())
        .collect();
    rules.sort_by_key(|d| d.name);

    for d in rules {
        println!(
            "{}\t{}\t{}\t{}",
            d.name,
            d.category.as_str(),
            d.group.as_str(),
            d.description
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let Some(d) = lint::find_descriptor(rule) else {
        anyhow::bail!("unknown lint: {rule}");
    };

    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("group: {}", d.group.as_str());
    println!("bug type: {} ({})", d.bug_type.name, d.bug_type.category);
    println!("description: {}", d.description);
    println!();
    println!("{}", d.explanation);
    Ok(())
}

fn check_command(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let start_dir = infer_start_dir(&args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;

    let (disabled, settings, preview, options) = match loaded_cfg.as_ref() {
        Some((path, cfg)) => {
            #[cfg(feature = "telemetry")]
            tracing::debug!(config = %path.display(), "loaded config");
            #[cfg(not(feature = "telemetry"))]
            let _ = path;

            (
                cfg.lints.disabled.clone(),
                LintSettings::default()
                    .with_config_levels(cfg.lints.levels.clone())
                    .disable(cfg.lints.disabled.clone()),
                // CLI flag takes precedence over config
                args.preview || cfg.lints.preview,
                cfg.engine_options(),
            )
        }
        None => (
            Vec::new(),
            LintSettings::default(),
            args.preview,
            Default::default(),
        ),
    };

    if let Some((path, cfg)) = loaded_cfg.as_ref() {
        let known = lint::all_known_lints();
        if let Some(unknown) = cfg.lints.levels.keys().find(|k| !known.contains(k.as_str())) {
            anyhow::bail!("unknown lint in {}: {unknown}", path.display());
        }
    }

    let registry = CheckerRegistry::default_checkers_filtered(
        &args.only,
        &args.skip,
        &disabled,
        preview,
        &settings,
    )
    .map_err(|e| e.into_anyhow())?;
    let engine = AnalysisEngine::new_with_settings(registry, settings).with_options(options);

    let mut diagnostics = Vec::new();
    if args.paths.is_empty() {
        diagnostics.extend(check_stdin(&engine)?);
    } else {
        for path in collect_json_files(&args.paths)? {
            diagnostics.extend(check_file(&engine, &path)?);
        }
    }

    let has_error = diagnostics.iter().any(|d| d.level == LintLevel::Error);

    match args.format {
        OutputFormat::Json => print_json(&diagnostics)?,
        OutputFormat::Pretty => print_pretty(&diagnostics),
        OutputFormat::Github => print_github(&diagnostics, args.deny_warnings),
    }

    if has_error || (args.deny_warnings && !diagnostics.is_empty()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check_file(engine: &AnalysisEngine, path: &Path) -> anyhow::Result<Vec<Diagnostic>> {
    engine
        .analyze_path(path)
        .map_err(|e| e.into_anyhow())
        .with_context(|| format!("failed to analyze {}", path.display()))
}

fn check_stdin(engine: &AnalysisEngine) -> anyhow::Result<Vec<Diagnostic>> {
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("failed to read stdin")?;
    engine
        .analyze_json(&source)
        .map_err(|e| e.into_anyhow())
        .context("failed to analyze stdin")
}

fn display_file(diag: &Diagnostic) -> String {
    diag.file.clone().unwrap_or_else(|| "stdin".to_string())
}

fn print_pretty(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let function = diag
            .function
            .as_deref()
            .map(|f| format!(" (in `{f}`)"))
            .unwrap_or_default();
        println!(
            "{}:{}:{}: {}: {}: {}{}",
            display_file(diag),
            diag.span.start.row,
            diag.span.start.column,
            diag.level.as_str(),
            diag.lint.name,
            diag.message,
            function
        );
    }
    println!("{} diagnostics", diagnostics.len());
}

fn print_github(diagnostics: &[Diagnostic], deny_warnings: bool) {
    for diag in diagnostics {
        let kind = if diag.level.is_failure(deny_warnings) {
            "error"
        } else {
            "warning"
        };
        println!(
            "::{} file={},line={},col={},title={}::{}",
            kind,
            github_escape(&display_file(diag)),
            diag.span.start.row,
            diag.span.start.column,
            diag.lint.bug_type.name,
            github_escape(&diag.message)
        );
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    function: Option<String>,
    row: usize,
    column: usize,
    level: String,
    lint: String,
    category: String,
    message: String,
    path: u32,
}

fn print_json(diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    let mut out: Vec<JsonDiagnostic> = diagnostics
        .iter()
        .map(|d| JsonDiagnostic {
            file: display_file(d),
            function: d.function.clone(),
            row: d.span.start.row,
            column: d.span.start.column,
            level: d.level.as_str().to_string(),
            lint: d.lint.name.to_string(),
            category: d.lint.bug_type.category.to_string(),
            message: d.message.clone(),
            path: d.path,
        })
        .collect();

    out.sort_by(|a, b| {
        (a.file.as_str(), a.row, a.column, a.lint.as_str())
            .cmp(&(b.file.as_str(), b.row, b.column, b.lint.as_str()))
    });

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collect_json_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        collect_from_path(path, &mut out)?;
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn collect_from_path(path: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    if meta.is_dir() {
        collect_from_dir(path, out)
    } else {
        out.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_from_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            collect_from_dir(&path, out)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }

    Ok(())
}

fn should_skip_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n == "target")
}

fn infer_start_dir(args: &CheckArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
