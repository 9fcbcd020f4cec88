/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::terminal
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Present notifications, consent prompts and progress on the
    controlling terminal for standalone update runs.

  Security / Safety Notes:
    Prompts are answered interactively only; a missing TTY or
    an escaped prompt counts as a dismissal.

  Dependencies:
    dialoguer for interactive selection.

  Operational Scope:
    Backs `HostUi` for the driver binary.

  Revision History:
    2026-10-16 COD  Added terminal host UI.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Dismissal is never mistaken for consent
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use crate::host::HostUi;
use crate::logger::Logger;

/// Terminal-backed host UI.
pub struct TerminalUi {
    logger: Arc<Logger>,
}

impl TerminalUi {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl HostUi for TerminalUi {
    async fn show_information(&self, message: &str) {
        eprintln!("→ {message}");
    }

    async fn show_warning(&self, message: &str, actions: &[&str]) -> Option<String> {
        let prompt = message.to_string();
        let items: Vec<String> = actions.iter().map(|a| a.to_string()).collect();

        let choice = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_opt()
                .map(|picked| picked.and_then(|index| items.get(index).cloned()))
        })
        .await;

        match choice {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => {
                self.logger.warn("PROMPT", format!("Prompt unavailable: {err}"));
                None
            }
            Err(err) => {
                self.logger.error("PROMPT", format!("Prompt task failed: {err}"));
                None
            }
        }
    }

    fn progress_begin(&self, title: &str) {
        eprintln!("… {title}");
    }

    fn progress_end(&self, title: &str) {
        self.logger.debug("PROGRESS", format!("finished: {title}"));
    }
}
