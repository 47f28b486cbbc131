use std::fmt;

use anyhow::Error;
use console::style;

pub trait DisplayCausesExt {
    /// Display the error followed by the chain of errors that caused it.
    fn display_causes(&self) -> DisplayCauses<'_>;
}

impl DisplayCausesExt for Error {
    fn display_causes(&self) -> DisplayCauses<'_> {
        DisplayCauses { err: self }
    }
}

pub struct DisplayCauses<'a> {
    err: &'a Error,
}

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", style("ERROR:").red(), self.err)?;
        for cause in self.err.chain().skip(1) {
            writeln!(f, "  caused by: {cause}")?;
        }
        Ok(())
    }
}
