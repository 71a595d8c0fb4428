//! `detour validate`: check a rule file without starting.
//!
//! Hard errors fail the command. Lint warnings (bad patterns, unresolvable
//! upstreams) are reported but the file still counts as valid, matching
//! what the running dispatcher would tolerate.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::sources::parse_rules_str;
use crate::config::validation;
use crate::error::{DetourError, ValidationError};

pub fn execute(args: &ValidateArgs) -> Result<(), DetourError> {
    let path = &args.rules;

    if !path.exists() {
        return Err(DetourError::RuleFileNotFound { path: path.clone() });
    }

    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let rules = parse_rules_str(ext, &content, &path.display().to_string())?;

    if let Err(errors) = validation::validate(&rules) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": to_json(&errors),
                    })
                );
            }
        }
        return Err(DetourError::RuleValidation { errors });
    }

    let warnings = validation::lint(&rules);

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &rules)
            );
            if !warnings.is_empty() {
                println!("\n  {} warnings:", warnings.len());
                for warning in &warnings {
                    println!("{warning}");
                }
            }
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "rules": rules.rules.len(),
                    "available": rules.available(),
                    "warnings": to_json(&warnings),
                })
            );
        }
    }

    Ok(())
}

fn to_json(problems: &[ValidationError]) -> Vec<serde_json::Value> {
    problems
        .iter()
        .map(|e| {
            serde_json::json!({
                "rule": e.rule,
                "field": e.field,
                "message": e.message,
                "suggestion": e.suggestion,
            })
        })
        .collect()
}
