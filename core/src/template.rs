//! Parameterized SQL scripts.
//!
//! Placeholders use `$`-substitution syntax:
//!
//! - `$name` and `${name}` are replaced by the value of `name`,
//! - `$$` is an escaped literal `$`,
//! - any other `$` is malformed.
//!
//! Identifiers start with a letter or underscore followed by letters,
//! digits or underscores (ASCII, case-insensitive).
//!
//! When no variables are supplied the script is executed verbatim and never
//! scanned, so scripts containing bare `$` characters still run.
//!
//! # Examples
//!
//! ```
//! use extload_core::{TemplateContext, TemplateError, render};
//!
//! let mut vars = TemplateContext::new();
//! vars.insert("name".to_string(), "Sam".to_string());
//! assert_eq!(render("SELECT '${name}'", &vars).unwrap(), "SELECT 'Sam'");
//! assert_eq!(render("SELECT '$$5'", &vars).unwrap(), "SELECT '$5'");
//!
//! let err = render("SELECT '${missing}'", &vars).unwrap_err();
//! assert_eq!(err, TemplateError::MissingKey("missing".to_string()));
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{QueryError, TemplateError};
use crate::host::ExtensionHost;

/// Variable name to value mapping for one script execution.
pub type TemplateContext = BTreeMap<String, String>;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i-u)\$(?:(?P<escaped>\$)|(?P<named>[_a-z][_a-z0-9]*)|\{(?P<braced>[_a-z][_a-z0-9]*)\}|(?P<invalid>))",
    )
    .expect("static regex must compile")
});

/// Substitutes every placeholder in `script` from `vars`.
///
/// # Errors
///
/// - [`TemplateError::MissingKey`] when a placeholder has no value,
/// - [`TemplateError::Malformed`] with the 1-based line and column of the
///   offending `$`.
pub fn render(script: &str, vars: &TemplateContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(script.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(script) {
        let whole = caps
            .get(0)
            .ok_or_else(|| TemplateError::Unknown("empty placeholder match".to_string()))?;
        out.push_str(&script[last..whole.start()]);
        last = whole.end();

        if caps.name("escaped").is_some() {
            out.push('$');
        } else if let Some(key) = caps.name("named").or_else(|| caps.name("braced")) {
            let value = vars
                .get(key.as_str())
                .ok_or_else(|| TemplateError::MissingKey(key.as_str().to_string()))?;
            out.push_str(value);
        } else if caps.name("invalid").is_some() {
            let (line, column) = position(script, whole.start());
            return Err(TemplateError::Malformed { line, column });
        } else {
            return Err(TemplateError::Unknown(format!(
                "unrecognized placeholder '{}'",
                whole.as_str()
            )));
        }
    }

    out.push_str(&script[last..]);
    Ok(out)
}

/// Runs `script` against `host` once.
///
/// With an empty `vars` the script is passed through unmodified; otherwise it
/// is rendered first and nothing is executed if rendering fails.
///
/// # Errors
///
/// Returns [`QueryError::Template`] for substitution failures and
/// [`QueryError::Execution`] carrying the engine's own error when execution
/// fails.
pub fn run<H: ExtensionHost>(
    host: &mut H,
    script: &str,
    vars: &TemplateContext,
) -> Result<H::Output, QueryError> {
    let sql: Cow<'_, str> = if vars.is_empty() {
        Cow::Borrowed(script)
    } else {
        Cow::Owned(render(script, vars)?)
    };
    tracing::debug!(bytes = sql.len(), vars = vars.len(), "executing query");
    host.execute(&sql).map_err(QueryError::Execution)
}

/// Reads a UTF-8 script from `path` and [`run`]s it.
///
/// # Errors
///
/// Returns [`QueryError::ReadScript`] if the file cannot be read, otherwise
/// the errors of [`run`].
pub fn run_file<H: ExtensionHost>(
    host: &mut H,
    path: impl AsRef<Path>,
    vars: &TemplateContext,
) -> Result<H::Output, QueryError> {
    let path = path.as_ref();
    let script = std::fs::read_to_string(path).map_err(|source| QueryError::ReadScript {
        path: path.to_path_buf(),
        source,
    })?;
    run(host, &script, vars)
}

fn position(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
