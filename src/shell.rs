//! Operator console: prompts, candidate listing and schedule output.
use chrono::{DateTime, Local, Utc};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::catalog::{
    parse_selection, resolve, CatalogEntry, CatalogStore, Candidates, Resolution, ResolveError,
};
use crate::credentials::Credentials;
use crate::pipeline::{PassReport, RunError};
use crate::predict::{PassEvent, PassSchedule};
use crate::spacetrack::ElementSource;

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label` and read one line; end of input reads as empty.
    pub fn prompt(&mut self, label: &str) -> io::Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Use `given` when present, otherwise ask.
    pub fn value_or_prompt(&mut self, given: Option<String>, label: &str) -> io::Result<String> {
        match given {
            Some(value) => Ok(value),
            None => self.prompt(label),
        }
    }

    pub fn print_candidates(&mut self, candidates: &Candidates<'_>) -> io::Result<()> {
        for (index, entry) in candidates.listing() {
            writeln!(self.output, "{} : {}", index, entry.name)?;
        }
        Ok(())
    }

    pub fn println(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    #[cfg(test)]
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("console IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Resolve `query`, asking the operator to pick when several entries match.
///
/// `selection` answers the question up front; it is only consulted when the
/// match is ambiguous.
pub fn choose_satellite<'a, R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalog: &'a [CatalogEntry],
    query: &str,
    selection: Option<usize>,
) -> Result<&'a CatalogEntry, ShellError> {
    let entry = match resolve(query, catalog) {
        Resolution::NotFound => {
            return Err(RunError::from(ResolveError::NotFound(query.to_string())).into());
        }
        Resolution::Found(entry) => entry,
        Resolution::Ambiguous(candidates) => {
            console.print_candidates(&candidates)?;
            let index = match selection {
                Some(index) => index,
                None => {
                    let answer = console.prompt("Number: ")?;
                    parse_selection(&answer).map_err(RunError::from)?
                }
            };
            candidates.select(index).map_err(RunError::from)?
        }
    };
    console.println(&format!("Satellite: {}", entry.name))?;
    Ok(entry)
}

/// Open the catalog snapshot, telling the operator on `notices` when it has
/// to be downloaded first.
pub fn open_catalog<S: ElementSource + ?Sized, W: Write>(
    path: &Path,
    source: &S,
    notices: &mut W,
) -> Result<CatalogStore, ShellError> {
    let downloading = !path.is_file();
    if downloading {
        writeln!(notices, "Downloading satellite list. Please wait ...")?;
    }
    let store = CatalogStore::open_or_fetch(path, source).map_err(RunError::from)?;
    if downloading {
        writeln!(notices, "Download finished.")?;
    }
    Ok(store)
}

/// Ask for the Space-Track identity on the console and for the password
/// through `read_secret`, which must not echo.
pub fn prompt_credentials<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    read_secret: impl FnOnce(&str) -> io::Result<String>,
) -> io::Result<Credentials> {
    let identity = console.prompt("Space-Track identity: ")?;
    let password = read_secret("Space-Track password: ")?;
    let credentials = Credentials::new(identity, password);
    if credentials.identity.is_empty() || credentials.password.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "identity and password are both required",
        ));
    }
    Ok(credentials)
}

/// Output time zone for rendered timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDisplay {
    Utc,
    Local,
}

impl TimeDisplay {
    fn format(&self, t: DateTime<Utc>) -> String {
        match self {
            TimeDisplay::Utc => t.format("%Y/%m/%d %H:%M:%S UTC").to_string(),
            TimeDisplay::Local => t
                .with_timezone(&Local)
                .format("%Y/%m/%d %H:%M:%S %:z")
                .to_string(),
        }
    }
}

fn render_pass(pass: &PassEvent, display: TimeDisplay) -> String {
    format!(
        "Rise    {}\nTransit {}\nSet     {}\n\n",
        display.format(pass.rise),
        display.format(pass.transit),
        display.format(pass.set)
    )
}

pub fn render_schedule(schedule: &PassSchedule, display: TimeDisplay) -> String {
    schedule
        .as_slice()
        .iter()
        .map(|pass| render_pass(pass, display))
        .collect()
}

pub fn render_report(report: &PassReport, display: TimeDisplay) -> String {
    let mut out = format!(
        "{} ({}), elements epoch {}\n{}\n\n",
        report.satellite.name,
        report.satellite.norad_id,
        display.format(report.epoch),
        report.observer.display_name
    );
    if report.passes.is_empty() {
        out.push_str(&format!(
            "No passes in the {} hours from {}\n",
            report.horizon_hours,
            display.format(report.start)
        ));
    } else {
        out.push_str(&render_schedule(&report.passes, display));
    }
    out
}
