//! `fdwctl apply` - converge the database to the configured desired state

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary, ProgressCallback};
use fdwkit::{DryRunSession, ReconcileOptions, Reconciler};
use serde::Serialize;

use super::{Db, close, load_config};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::ui;

/// Prints each applied object as the reconciler reports it.
struct UiProgress {
    /// Also print unchanged objects and stage names
    verbose: bool,
    /// Print nothing
    silent: bool,
}

impl ProgressCallback for UiProgress {
    fn on_stage(&mut self, stage: &str) {
        if self.verbose && !self.silent {
            ui::section(stage);
        }
    }

    fn on_applied(&mut self, kind: &str, id: &str, result: &ApplyResult) {
        if self.silent {
            return;
        }
        let line = format!("{kind} {id} {}", result.verb());
        match result {
            ApplyResult::Removed => ui::warn(&line),
            ApplyResult::Skipped { reason } => ui::dim(&format!("{line}: {reason}")),
            r if r.is_change() => ui::success(&line),
            _ if self.verbose => ui::dim(&line),
            _ => {}
        }
    }
}

#[derive(Serialize)]
struct ApplyReport<'a> {
    dry_run: bool,
    summary: &'a ExecuteSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    statements: Option<&'a [String]>,
}

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let config = load_config(ctx)?;
    let desired = config.desired_state()?;
    let options = ReconcileOptions {
        cascade_drop: !args.no_cascade,
        recreate_schemas: args.recreate_schemas,
        drop_local_users: args.drop_local_users,
    };

    if !args.json && !ctx.quiet {
        ui::header("Applying desired state");
        if args.dry_run {
            ui::warn("Dry run - no changes will be made");
        }
    }

    let db = Db::open(ctx, &config)?;
    let mut progress = UiProgress {
        verbose: ctx.verbose > 0,
        silent: args.json || ctx.quiet,
    };

    let (result, statements) = if args.dry_run {
        let mut session = DryRunSession::new(Box::new(db.session));
        let result = Reconciler::new(&mut session, &db.connector, &db.secrets, options, &mut progress)
            .apply(&desired);
        let statements = session.statements().to_vec();
        close(Box::new(session));
        (result, Some(statements))
    } else {
        let mut session = db.session;
        let result = Reconciler::new(&mut session, &db.connector, &db.secrets, options, &mut progress)
            .apply(&desired);
        close(Box::new(session));
        (result, None)
    };
    let summary = result?;

    if args.json {
        let report = ApplyReport {
            dry_run: args.dry_run,
            summary: &summary,
            statements: statements.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if ctx.quiet {
        return Ok(());
    }

    if let Some(statements) = &statements {
        ui::section("Statements that would run");
        if statements.is_empty() {
            ui::dim("(none)");
        }
        for sql in statements {
            println!("  {sql};");
        }
    }

    print_summary(&summary, args.dry_run);
    Ok(())
}

fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if summary.total_changes() == 0 {
        ui::success(&format!(
            "Already converged - {} objects checked, nothing to do",
            summary.total()
        ));
        return;
    }

    let counts = summary_counts(summary);
    if dry_run {
        ui::info(&format!("{} {counts}", "Would apply:".bold()));
    } else {
        ui::success(&format!("{} {counts}", "Applied:".bold()));
    }
}

fn summary_counts(summary: &ExecuteSummary) -> String {
    format!(
        "{} created, {} updated, {} recreated, {} dropped, {} skipped, {} unchanged ({} total)",
        summary.created,
        summary.modified,
        summary.recreated,
        summary.removed,
        summary.skipped,
        summary.no_change,
        summary.total()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_omits_statements_outside_dry_run() {
        let summary = ExecuteSummary {
            created: 2,
            ..ExecuteSummary::default()
        };
        let report = ApplyReport {
            dry_run: false,
            summary: &summary,
            statements: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["created"], 2);
        assert!(json.get("statements").is_none());
    }

    #[test]
    fn test_summary_counts_include_total() {
        let summary = ExecuteSummary {
            created: 1,
            modified: 2,
            no_change: 3,
            ..ExecuteSummary::default()
        };
        assert_eq!(
            summary_counts(&summary),
            "1 created, 2 updated, 0 recreated, 0 dropped, 0 skipped, 3 unchanged (6 total)"
        );
    }

    #[test]
    fn test_report_includes_dry_run_statements() {
        let summary = ExecuteSummary::default();
        let statements = vec!["CREATE SERVER \"films\"".to_string()];
        let report = ApplyReport {
            dry_run: true,
            summary: &summary,
            statements: Some(statements.as_slice()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["statements"][0], "CREATE SERVER \"films\"");
    }
}
