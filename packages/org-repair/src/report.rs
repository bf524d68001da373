//! Console report printed while the routines run.
//!
//! Output is French with an emoji marker per status line, matching what the
//! operators of the project are used to reading.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Stdout, Write};
use supabase_client::error::{
    CHECK_VIOLATION, FOREIGN_KEY_VIOLATION, INSUFFICIENT_PRIVILEGE, NO_ROWS, UNDEFINED_TABLE,
    UNIQUE_VIOLATION, UNKNOWN_RELATION,
};
use supabase_client::{ErrorKind, SupabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Success,
    Failure,
    Warning,
    Info,
}

impl Marker {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Failure => "❌",
            Self::Warning => "⚠️",
            Self::Info => "📋",
        }
    }
}

pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<Stdout> {
    /// Console on standard output, with colored headers.
    pub fn stdout() -> Self {
        Self {
            out: io::stdout(),
            color: true,
        }
    }
}

impl<W: Write> Console<W> {
    /// Plain console over any writer.
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: impl Display) {
        // A closed stdout leaves nobody to report to
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn banner(&mut self, title: &str) {
        let title = format!("🔍 {}", title);
        if self.color {
            self.line(title.as_str().bright_cyan().bold());
        } else {
            self.line(title);
        }
        self.rule();
    }

    /// Heading printed above a group of steps, e.g. `🛠️ Création de données de test`.
    pub fn heading(&mut self, title: &str) {
        self.blank();
        self.rule();
        if self.color {
            self.line(title.bright_cyan().bold());
        } else {
            self.line(title);
        }
        self.rule();
    }

    pub fn rule(&mut self) {
        self.line("=".repeat(50));
    }

    /// `=== title ===`, preceded by a blank line.
    pub fn section(&mut self, title: &str) {
        let header = format!("=== {} ===", title);
        self.blank();
        if self.color {
            self.line(header.as_str().bold());
        } else {
            self.line(header);
        }
    }

    pub fn marked(&mut self, marker: Marker, text: impl Display) {
        self.line(format!("{} {}", marker.emoji(), text));
    }

    pub fn success(&mut self, text: impl Display) {
        self.marked(Marker::Success, text);
    }

    pub fn failure(&mut self, text: impl Display) {
        self.marked(Marker::Failure, text);
    }

    pub fn warning(&mut self, text: impl Display) {
        self.marked(Marker::Warning, text);
    }

    pub fn info(&mut self, text: impl Display) {
        self.marked(Marker::Info, text);
    }

    /// `label: [rows as JSON]`
    pub fn rows<T: Serialize>(&mut self, label: &str, rows: &[T]) {
        let json = serde_json::to_string(rows).unwrap_or_else(|e| format!("<{}>", e));
        self.line(format!("{}: {}", label, json));
    }

    /// Indented French explanation under a failure line, when one exists.
    pub fn explain(&mut self, err: &SupabaseError) {
        if let Some(text) = describe_error(err) {
            self.line(format!("   → {}", text));
        }
    }
}

/// French description of a Supabase failure, for the codes operators hit.
pub fn describe_error(err: &SupabaseError) -> Option<&'static str> {
    let by_code = match err {
        SupabaseError::Api {
            code: Some(code),
            message,
            ..
        } => match code.as_str() {
            UNIQUE_VIOLATION if message.contains("organizations_slug_key") => Some(
                "Une organisation avec cet identifiant existe déjà. Veuillez choisir un autre nom.",
            ),
            UNIQUE_VIOLATION => {
                Some("Une contrainte unique a été violée. Veuillez vérifier vos données.")
            }
            FOREIGN_KEY_VIOLATION => Some("Référence invalide. Veuillez vérifier vos données."),
            CHECK_VIOLATION => {
                Some("Contrainte de validation violée. Veuillez vérifier vos données.")
            }
            UNDEFINED_TABLE | UNKNOWN_RELATION => {
                Some("Table non trouvée. Erreur de configuration.")
            }
            INSUFFICIENT_PRIVILEGE => {
                Some("Permission refusée. Vous n'avez pas les droits nécessaires.")
            }
            NO_ROWS => Some("Aucune donnée trouvée."),
            _ => None,
        },
        _ => None,
    };

    by_code.or(match err.kind() {
        ErrorKind::Conflict => Some("Cet enregistrement existe déjà."),
        ErrorKind::Unauthorized => Some("Clé API refusée ou droits insuffisants."),
        ErrorKind::Transport => Some("Le serveur Supabase est injoignable."),
        _ => None,
    })
}
