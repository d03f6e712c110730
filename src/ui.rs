//! Interface de terminal do captura: spinner e saída colorida.
//!
//! Usa `indicatif` para o spinner de progresso e `console` para cores.
//! O [`JobProgress`] acompanha visualmente a execução de um job de captura.

use std::collections::BTreeSet;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::{JobStatus, JobSummary};
use crate::planner::CapturePlan;
use crate::response::ApiResponse;

/// Indicador visual de progresso para um job de captura no terminal.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner com a descrição do job.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(description.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resultado do job.
    ///
    /// `completed` sem erros em verde, `completed` com erros em amarelo,
    /// `failed` em vermelho.
    pub fn complete(&self, summary: &JobSummary) {
        self.pb.finish_and_clear();
        let failed: BTreeSet<i64> = summary.errors.iter().map(|e| e.item_id).collect();
        let line = format!(
            "Job {} {}: {}/{} items captured, {} error(s) in {} ms",
            summary.job_id,
            summary.status,
            summary.total_items.saturating_sub(failed.len()),
            summary.total_items,
            summary.error_count,
            summary.duration_ms,
        );
        match (summary.status, summary.error_count) {
            (JobStatus::Completed, 0) => println!("  {} {line}", self.green.apply_to("✓")),
            (JobStatus::Completed, _) => println!("  {} {line}", self.yellow.apply_to("!")),
            _ => println!("  {} {line}", self.red.apply_to("✗")),
        }
        for error in &summary.errors {
            println!(
                "    {} {}: {}",
                self.red.apply_to("-"),
                error.process_number,
                error.message
            );
        }
        for warning in &summary.warnings {
            println!("    {} {warning}", self.yellow.apply_to("warning:"));
        }
    }

    /// Finaliza o spinner após uma falha que abortou a invocação.
    pub fn abort(&self, response: &ApiResponse) {
        self.pb.finish_and_clear();
        let message = response.body["error"].as_str().unwrap_or("unknown error");
        println!(
            "  {} Capture aborted ({}): {message}",
            self.red.apply_to("✗"),
            response.status
        );
    }
}

/// Imprime o agrupamento por tribunal/grau de um plano de captura.
pub fn print_plan(plan: &CapturePlan) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    println!(
        "{} groups, {} items",
        plan.groups.len(),
        plan.item_count()
    );
    for group in &plan.groups {
        let credential = match group.credential_id() {
            Some(id) => format!("credential {id}"),
            None => "no credential".to_string(),
        };
        println!("  {} ({})", bold.apply_to(group.key), dim.apply_to(credential));
        for item in &group.items {
            println!("    {} {}", dim.apply_to(item.id), item.process_number);
        }
    }
}

/// Imprime a resposta completa em JSON.
pub fn print_response(response: &ApiResponse) {
    let style = if response.is_success() {
        Style::new().green()
    } else {
        Style::new().red()
    };
    println!();
    println!("{}", style.apply_to(format!("─── Response {} ───", response.status)));
    println!(
        "{}",
        serde_json::to_string_pretty(&response.body).unwrap_or_default()
    );
}
