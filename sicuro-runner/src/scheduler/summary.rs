//! Outcome summary appended to a finished job's log
//!
//! The log is rendered as HTML by viewers, so the summary is an HTML fragment
//! with links back to the manual trigger endpoint.

use sicuro_core::domain::job::{BuildStatus, Job};
use url::form_urlencoded;

/// Path of the manual trigger endpoint the links point to
pub const RUN_PATH: &str = "/run";

/// Link that rebuilds the same target
pub fn rebuild_link(job: &Job) -> String {
    run_link(job, false)
}

/// Link that starts a revert build of the same target
pub fn revert_link(job: &Job) -> String {
    run_link(job, true)
}

fn run_link(job: &Job, revert: bool) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("repo", &job.log_name())
        .append_pair("language", &job.language)
        .append_pair("url", &job.repository_url);
    if revert {
        query.append_pair("revert", "1");
    }
    format!("{}?{}", RUN_PATH, query.finish())
}

/// HTML fragment describing how the job ended
///
/// `detail` explains the outcome (exit code, timeout, or invocation error).
pub fn render(job: &Job, status: BuildStatus, detail: &str) -> String {
    let detail = escape_html(detail);
    let mut html = String::from("\n");

    match status {
        BuildStatus::Success => {
            html.push_str("<h4>Build completed successfully</h4>");
        }
        BuildStatus::Failure => {
            html.push_str(&format!("<h4>Build failed with {}.</h4>", detail));
            html.push_str(&format!(
                "<p>You may revert changes: <a href='{}'>Revert commit</a></p>",
                revert_link(job)
            ));
        }
        BuildStatus::Error | BuildStatus::Pending => {
            html.push_str(&format!("<h4>Build could not be run: {}</h4>", detail));
        }
    }

    html.push_str(&format!(
        "<p><a href='{}'>Rebuild</a></p>\n",
        rebuild_link(job)
    ));
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
