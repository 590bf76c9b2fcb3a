//! Record-kind commands, independent of the storage backend.
//!
//! # Invariants
//! - Each mutating command saves exactly the one manager it changed, so the
//!   document backend never writes a stale copy of another partition.
//! - References are checked before writes: a group needs its period, a qube
//!   needs its group, and referenced records cannot be deleted.

use crate::CliError;
use clap::Subcommand;
use qbackup_core::table::dump_records;
use qbackup_core::{Group, Manager, Period, Predicate, Qube};
use std::io::Write;

#[derive(Debug, Subcommand)]
pub enum PeriodAction {
    /// Register a backup period.
    Add { name: String },
    /// Remove a period no group uses.
    Del { name: String },
    /// List periods.
    List,
}

#[derive(Debug, Subcommand)]
pub enum GroupAction {
    /// Create a group backed up on an existing period.
    Add { name: String, period: String },
    /// Remove a group that has no qubes.
    Del { name: String },
    /// List groups.
    List,
}

#[derive(Debug, Subcommand)]
pub enum QubeAction {
    /// Enroll a qube into an existing group; prints the generated id.
    Add { name: String, group: String },
    /// Remove a qube by id.
    Del { id: String },
    /// List qubes.
    List,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage backup periods.
    Period {
        #[command(subcommand)]
        action: PeriodAction,
    },
    /// Manage backup groups.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Manage enrolled qubes.
    Qube {
        #[command(subcommand)]
        action: QubeAction,
    },
}

/// Managers for every record kind, over whichever backend was opened.
pub struct Stores<P, G, Q> {
    pub periods: P,
    pub groups: G,
    pub qubes: Q,
}

impl<P, G, Q> Stores<P, G, Q>
where
    P: Manager<Period>,
    G: Manager<Group>,
    Q: Manager<Qube>,
{
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), CliError> {
        match command {
            Command::Period { action } => self.period(action, out),
            Command::Group { action } => self.group(action, out),
            Command::Qube { action } => self.qube(action, out),
        }
    }

    fn period<W: Write>(&mut self, action: PeriodAction, out: &mut W) -> Result<(), CliError> {
        match action {
            PeriodAction::Add { name } => {
                self.periods.create(&Period::new(name))?;
                self.periods.save()?;
            }
            PeriodAction::Del { name } => {
                if let Some(group) = self.groups.find_where("period", name.as_str())? {
                    return Err(CliError::InUse {
                        kind: "period",
                        name,
                        user: format!("group {}", group.name),
                    });
                }
                self.periods.delete(&name)?;
                self.periods.save()?;
            }
            PeriodAction::List => dump_records(out, &self.periods.list()?)?,
        }
        Ok(())
    }

    fn group<W: Write>(&mut self, action: GroupAction, out: &mut W) -> Result<(), CliError> {
        match action {
            GroupAction::Add { name, period } => {
                if self.periods.get(&period)?.is_none() {
                    return Err(CliError::Missing {
                        kind: "period",
                        name: period,
                    });
                }
                self.groups.create(&Group::new(name, period))?;
                self.groups.save()?;
            }
            GroupAction::Del { name } => {
                let members = Predicate::new().eq("group_name", name.as_str());
                if let Some(qube) = self.qubes.slow_find_one(&members)? {
                    return Err(CliError::InUse {
                        kind: "group",
                        name,
                        user: format!("qube {}", qube.name),
                    });
                }
                self.groups.delete(&name)?;
                self.groups.save()?;
            }
            GroupAction::List => dump_records(out, &self.groups.list()?)?,
        }
        Ok(())
    }

    fn qube<W: Write>(&mut self, action: QubeAction, out: &mut W) -> Result<(), CliError> {
        match action {
            QubeAction::Add { name, group } => {
                if self.groups.get(&group)?.is_none() {
                    return Err(CliError::Missing {
                        kind: "group",
                        name: group,
                    });
                }
                let id = self.qubes.create(&Qube::new(name, group))?;
                self.qubes.save()?;
                writeln!(out, "{id}")?;
            }
            QubeAction::Del { id } => {
                self.qubes.delete(&id)?;
                self.qubes.save()?;
            }
            QubeAction::List => dump_records(out, &self.qubes.list()?)?,
        }
        Ok(())
    }
}
