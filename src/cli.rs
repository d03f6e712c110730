//! Interface de linha de comando do captura baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (plan, demo)
//! e flags globais (--verbose, --no-lock, --lock-ttl).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CapturaConfig;

/// captura: orquestrador de captura em lote de partes de processos trabalhistas.
#[derive(Debug, Parser)]
#[command(name = "captura", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Desliga o lock distribuído nesta execução.
    #[arg(long, global = true, default_value_t = false)]
    pub no_lock: bool,

    /// TTL do lock em segundos, sobrescrevendo o arquivo de configuração.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub lock_ttl: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a requisição da fixture e mostra o agrupamento por tribunal/grau.
    Plan {
        /// Arquivo JSON com a fixture.
        #[arg(long)]
        file: PathBuf,
    },

    /// Executa um job de captura completo contra o portal simulado.
    Demo {
        /// Arquivo JSON com a fixture; sem ele usa a fixture embutida.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

impl Cli {
    /// Aplica as flags globais sobre a configuração carregada.
    pub fn apply_overrides(&self, config: &mut CapturaConfig) {
        if self.no_lock {
            config.enable_distributed_lock = false;
        }
        if let Some(ttl) = self.lock_ttl {
            config.lock_ttl_seconds = ttl;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_plan_subcommand() {
        let cli = Cli::parse_from(["captura", "plan", "--file", "fixture.json"]);
        match cli.command {
            Command::Plan { file } => assert_eq!(file, PathBuf::from("fixture.json")),
            _ => panic!("expected Plan command"),
        }
    }

    #[test]
    fn cli_parses_demo_without_file() {
        let cli = Cli::parse_from(["captura", "demo"]);
        assert!(matches!(cli.command, Command::Demo { file: None }));
        assert!(!cli.verbose);
        assert!(!cli.no_lock);
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "captura",
            "--no-lock",
            "--lock-ttl",
            "60",
            "--verbose",
            "demo",
        ]);
        assert!(cli.verbose);
        assert!(cli.no_lock);
        assert_eq!(cli.lock_ttl, Some(60));
    }

    #[test]
    fn zero_lock_ttl_is_rejected() {
        let result = Cli::try_parse_from(["captura", "--lock-ttl", "0", "demo"]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::parse_from(["captura", "demo", "--no-lock", "--lock-ttl", "30"]);
        let mut config = CapturaConfig::default();
        cli.apply_overrides(&mut config);
        assert!(!config.enable_distributed_lock);
        assert_eq!(config.lock_ttl_seconds, 30);

        let cli = Cli::parse_from(["captura", "demo"]);
        let mut config = CapturaConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.enable_distributed_lock);
        assert_eq!(config.lock_ttl_seconds, 300);
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
