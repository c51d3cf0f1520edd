//! Formatted output helpers for CLI commands.

use composure_project::types::ServiceConfig;

const NONE: &str = "-";

/// Joins `items` with commas, or returns `-` when there are none.
#[must_use]
pub fn join_or_dash<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = items
        .into_iter()
        .map(|item| item.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        NONE.to_owned()
    } else {
        joined
    }
}

/// Formats one tab-separated `ls` row.
#[must_use]
pub fn service_row(name: &str, service: &ServiceConfig) -> String {
    let image = if service.image.is_empty() {
        service
            .build
            .as_ref()
            .map_or_else(|| NONE.to_owned(), |build| format!("(build {})", build.context))
    } else {
        service.image.clone()
    };
    let dependencies = service.depends_on.iter().map(|(dependency, edge)| {
        if edge.required {
            dependency.clone()
        } else {
            format!("{dependency}?")
        }
    });
    format!(
        "{name}\t{image}\t{}\t{}",
        join_or_dash(dependencies),
        join_or_dash(&service.profiles)
    )
}
