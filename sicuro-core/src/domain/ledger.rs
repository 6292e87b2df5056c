//! Commit ledger
//!
//! Per-project record of the last build status of every reference, stored as
//! `reference=status` lines. It backs revert builds: the first reference in
//! stored order whose status is `success` is the last known-good one.
//!
//! Lines that do not parse are kept verbatim so a hand-edited ledger survives
//! a rewrite.

use crate::domain::job::BuildStatus;

/// One `reference=status` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub reference: String,
    pub status: BuildStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LedgerLine {
    Entry(LedgerEntry),
    Unparsed(String),
}

/// Ordered reference -> status mapping, loaded from and rendered back to text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    lines: Vec<LedgerLine>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses ledger content; blank lines are dropped
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(parse_line)
            .collect();
        Self { lines }
    }

    /// Reference of the first `success` entry in stored order
    pub fn last_known_good(&self) -> Option<&str> {
        self.entries()
            .find(|entry| entry.status == BuildStatus::Success)
            .map(|entry| entry.reference.as_str())
    }

    /// Records `status` for `reference`
    ///
    /// An existing entry is updated in place; a new reference is prepended.
    /// Every other line keeps its relative order.
    pub fn upsert(&mut self, reference: &str, status: BuildStatus) {
        let existing = self.lines.iter_mut().find_map(|line| match line {
            LedgerLine::Entry(entry) if entry.reference == reference => Some(entry),
            _ => None,
        });

        match existing {
            Some(entry) => entry.status = status,
            None => self.lines.insert(
                0,
                LedgerLine::Entry(LedgerEntry {
                    reference: reference.to_string(),
                    status,
                }),
            ),
        }
    }

    pub fn status_of(&self, reference: &str) -> Option<BuildStatus> {
        self.entries()
            .find(|entry| entry.reference == reference)
            .map(|entry| entry.status)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.lines.iter().filter_map(|line| match line {
            LedgerLine::Entry(entry) => Some(entry),
            LedgerLine::Unparsed(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders one line per entry, newline terminated
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                LedgerLine::Entry(entry) => {
                    out.push_str(&entry.reference);
                    out.push('=');
                    out.push_str(entry.status.as_str());
                }
                LedgerLine::Unparsed(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn parse_line(line: &str) -> LedgerLine {
    // Statuses never contain '=', references might.
    line.rsplit_once('=')
        .and_then(|(reference, status)| {
            let status = status.trim().parse::<BuildStatus>().ok()?;
            let reference = reference.trim();
            (!reference.is_empty()).then(|| LedgerEntry {
                reference: reference.to_string(),
                status,
            })
        })
        .map(LedgerLine::Entry)
        .unwrap_or_else(|| LedgerLine::Unparsed(line.to_string()))
}

/// Last known-good reference in raw ledger content
pub fn resolve(content: &str) -> Option<String> {
    Ledger::parse(content).last_known_good().map(str::to_string)
}

/// Raw-content form of [`Ledger::upsert`]
pub fn upsert(content: &str, reference: &str, status: BuildStatus) -> String {
    let mut ledger = Ledger::parse(content);
    ledger.upsert(reference, status);
    ledger.render()
}
